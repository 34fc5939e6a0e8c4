#![cfg(feature = "cli")]

use std::process::Command;

fn rtuserve() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rtuserve"))
}

#[test]
fn version_prints_package_version() {
    let output = rtuserve().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("rtuserve {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_lists_defaults() {
    let output = rtuserve()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: rtuserve"));
    assert!(stdout.contains("defaults: baud=19200"));
}

#[test]
fn listen_without_ports_is_usage_error() {
    let output = rtuserve()
        .arg("listen")
        .env_remove("RTUSERVE_CONFIG")
        .output()
        .expect("listen should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no serial ports given"));
}

#[test]
fn listen_on_missing_device_fails_at_startup() {
    let output = rtuserve()
        .args(["--log-level", "off", "listen", "/dev/rtuserve-no-such-device"])
        .env_remove("RTUSERVE_CONFIG")
        .output()
        .expect("listen should run");

    assert_eq!(output.status.code(), Some(69));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("listen on /dev/rtuserve-no-such-device failed"));
}

#[test]
fn listen_rejects_bad_read_timeout() {
    let output = rtuserve()
        .args(["listen", "/dev/ttyS0", "--read-timeout", "0ms"])
        .env_remove("RTUSERVE_CONFIG")
        .output()
        .expect("listen should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn ports_emits_json_array() {
    let output = rtuserve()
        .args(["--format", "json", "ports"])
        .output()
        .expect("ports should run");

    if !output.status.success() {
        // Enumeration can be unavailable in minimal containers.
        assert_eq!(output.status.code(), Some(3));
        return;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("ports should emit json");
    assert!(payload.is_array());
}
