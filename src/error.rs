use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no SARK-110 found (vendor {vendor_id:#06x}, product {product_id:#06x})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("device is not connected")]
    NotConnected,

    #[error("no response within {timeout:?}")]
    ResponseTimeout { timeout: Duration },

    #[error("device rejected the command (status {status})")]
    DeviceNack { status: u8 },

    #[error("malformed response: expected {expected} bytes, got {actual}")]
    MalformedResponse { expected: usize, actual: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(feature = "hidapi")]
impl From<::hidapi::HidError> for Error {
    fn from(err: ::hidapi::HidError) -> Self {
        Error::Transport(err.to_string())
    }
}
