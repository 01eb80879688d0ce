// VENDOR_ID is the USB vendor ID the SARK-110 enumerates with.
pub const VENDOR_ID: u16 = 0x0483;

// PRODUCT_ID is the USB product ID the SARK-110 enumerates with.
pub const PRODUCT_ID: u16 = 0x5750;

// REPORT_LEN is the size of an outbound report, including the report ID at index 0.
pub const REPORT_LEN: usize = 19;

// REPORT_ID is the placeholder report ID carried in byte 0 of every outbound report.
pub const REPORT_ID: u8 = 0x00;

// STATUS_OK is the status byte ('O') the instrument replies with when a command succeeds.
pub const STATUS_OK: u8 = 79;

// DEFAULT_TIMEOUT_MS is how long a command waits for its response report.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

// BUZZER_DEFAULT_SETTLE_MS is the grace period after a buzzer command sent with a zero duration.
pub const BUZZER_DEFAULT_SETTLE_MS: u64 = 200;

/// Command codes understood by the instrument, carried in byte 1 of an outbound report.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    GetVersion = 1,
    Measure = 2,
    MeasureExtended = 12,
    Buzzer = 20,
    Reset = 50,
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}
