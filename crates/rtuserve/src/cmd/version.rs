use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rtuserve {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rtuserve");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("RTUSERVE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "defaults: baud={} read_timeout={:?} queue={} buffer={}",
        rtuserve::transport::DEFAULT_BAUD_RATE,
        rtuserve::transport::DEFAULT_READ_TIMEOUT,
        rtuserve::listener::DEFAULT_DISPATCH_CAPACITY,
        rtuserve::listener::DEFAULT_BUFFER_SIZE
    );

    Ok(SUCCESS)
}
