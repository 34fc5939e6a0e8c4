//! Public function and exception code constants.

/// Read coils.
pub const READ_COILS: u8 = 0x01;
/// Read discrete inputs.
pub const READ_DISCRETE_INPUTS: u8 = 0x02;
/// Read holding registers.
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
/// Read input registers.
pub const READ_INPUT_REGISTERS: u8 = 0x04;
/// Write single coil.
pub const WRITE_SINGLE_COIL: u8 = 0x05;
/// Write single register.
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
/// Serial line diagnostics.
pub const DIAGNOSTICS: u8 = 0x08;
/// Write multiple coils.
pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
/// Write multiple registers.
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set on the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

pub const ILLEGAL_FUNCTION: u8 = 0x01;
pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
pub const SLAVE_DEVICE_FAILURE: u8 = 0x04;
pub const ACKNOWLEDGE: u8 = 0x05;
pub const SLAVE_DEVICE_BUSY: u8 = 0x06;
pub const MEMORY_PARITY_ERROR: u8 = 0x08;
pub const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
pub const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;

/// Human-readable name for a function code, ignoring the exception flag.
pub fn function_name(function: u8) -> &'static str {
    match function & !EXCEPTION_FLAG {
        READ_COILS => "READ_COILS",
        READ_DISCRETE_INPUTS => "READ_DISCRETE_INPUTS",
        READ_HOLDING_REGISTERS => "READ_HOLDING_REGISTERS",
        READ_INPUT_REGISTERS => "READ_INPUT_REGISTERS",
        WRITE_SINGLE_COIL => "WRITE_SINGLE_COIL",
        WRITE_SINGLE_REGISTER => "WRITE_SINGLE_REGISTER",
        DIAGNOSTICS => "DIAGNOSTICS",
        WRITE_MULTIPLE_COILS => "WRITE_MULTIPLE_COILS",
        WRITE_MULTIPLE_REGISTERS => "WRITE_MULTIPLE_REGISTERS",
        _ => "OTHER",
    }
}
