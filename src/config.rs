use std::time::Duration;

use crate::constants::{DEFAULT_TIMEOUT_MS, PRODUCT_ID, VENDOR_ID};

/// Configuration settings for a SARK-110 connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// USB vendor ID used to locate the instrument.
    pub vendor_id: u16,
    /// USB product ID used to locate the instrument.
    pub product_id: u16,
    /// How long a command waits for its response report.
    pub timeout: Duration,
    /// Whether `buzzer` sleeps for the pulse length before returning.
    pub buzzer_grace: bool,
}

impl Config {
    /// Creates a new `Config` for the given USB identity, with the default
    /// timeout and buzzer grace period enabled.
    pub fn new(vendor_id: u16, product_id: u16) -> Config {
        Config {
            vendor_id,
            product_id,
            ..Config::default()
        }
    }

    /// Sets the response timeout.
    ///
    /// # Arguments
    ///
    /// * `timeout` - How long each command waits for its response.
    ///
    /// # Returns
    ///
    /// The updated `Config` instance.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables the grace period after a buzzer command.
    pub fn buzzer_grace(mut self, enabled: bool) -> Self {
        self.buzzer_grace = enabled;
        self
    }
}

/// Provides the reference values for the SARK-110.
impl Default for Config {
    /// Returns the default configuration.
    ///
    /// Vendor `0x0483`, product `0x5750`, a one second timeout and the buzzer
    /// grace period enabled.
    fn default() -> Config {
        Config {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            buzzer_grace: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_identity() {
        let config = Config::default();
        assert_eq!(config.vendor_id, 0x0483);
        assert_eq!(config.product_id, 0x5750);
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert!(config.buzzer_grace);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = Config::new(0x1234, 0x5678)
            .timeout(Duration::from_millis(50))
            .buzzer_grace(false);
        assert_eq!(config.vendor_id, 0x1234);
        assert_eq!(config.product_id, 0x5678);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert!(!config.buzzer_grace);
    }
}
