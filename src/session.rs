use std::time::Duration;

use log::{debug, warn};

use crate::channel::ReportChannel;
use crate::codec::{self, Report};
use crate::constants::{Opcode, REPORT_LEN};
use crate::error::{Error, Result};
use crate::{ExtendedMeasurement, Measurement, VersionInfo};

/// One command at a time over an owned [`ReportChannel`].
///
/// Every command is a single write followed by a single read bounded by the
/// session timeout. Methods take `&mut self`, so a session shared between
/// threads has to sit behind a mutex held for the whole round trip.
pub struct Session<C> {
    channel: C,
    timeout: Duration,
}

impl<C> Session<C>
where
    C: ReportChannel,
{
    pub fn new(channel: C, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Gives the channel back, e.g. to close it.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Queries the protocol number and firmware version string.
    pub fn get_version(&mut self) -> Result<VersionInfo> {
        debug!("Getting version (CMD {})", Opcode::GetVersion as u8);
        let request = codec::build_request(Opcode::GetVersion, &[])?;
        let (buffer, len) = self.transact(&request)?;
        codec::decode_version_response(&buffer[..len], self.channel.status_offset())
    }

    /// Takes one impedance sample at `freq_hz`.
    ///
    /// A frequency of 0 turns the generator off instead of measuring.
    pub fn measure(&mut self, freq_hz: u32, calibrated: bool, samples: u8) -> Result<Measurement> {
        debug!(
            "Measuring at {} Hz (CMD {}), calibrated: {}, samples: {}",
            freq_hz,
            Opcode::Measure as u8,
            calibrated,
            samples
        );
        let request = codec::measure_request(freq_hz, calibrated, samples);
        let (buffer, len) = self.transact(&request)?;
        codec::decode_measure_response(&buffer[..len], self.channel.status_offset())
    }

    /// Takes four samples at `freq_hz + i * step_hz`, i in 0..4, in one round trip.
    ///
    /// Values travel as half floats and are less precise than [`Session::measure`].
    pub fn measure_extended(
        &mut self,
        freq_hz: u32,
        step_hz: u32,
        calibrated: bool,
        samples: u8,
    ) -> Result<ExtendedMeasurement> {
        debug!(
            "Measuring 4 points from {} Hz step {} Hz (CMD {})",
            freq_hz,
            step_hz,
            Opcode::MeasureExtended as u8
        );
        let request = codec::measure_extended_request(freq_hz, step_hz, calibrated, samples);
        let (buffer, len) = self.transact(&request)?;
        codec::decode_extended_response(&buffer[..len], self.channel.status_offset())
    }

    /// Sounds the buzzer. Fails with `Error::DeviceNack` if the instrument refuses.
    pub fn buzzer(&mut self, freq_hz: u16, duration_ms: u16) -> Result<()> {
        debug!(
            "Buzzer {} Hz for {} ms (CMD {})",
            freq_hz,
            duration_ms,
            Opcode::Buzzer as u8
        );
        let request = codec::buzzer_request(freq_hz, duration_ms);
        let (buffer, len) = self.transact(&request)?;
        codec::check_status(&buffer[..len], self.channel.status_offset()).map(|_| ())
    }

    /// Resets the instrument.
    pub fn reset(&mut self) -> Result<()> {
        debug!("Resetting (CMD {})", Opcode::Reset as u8);
        let request = codec::build_request(Opcode::Reset, &[])?;
        let (buffer, len) = self.transact(&request)?;
        codec::check_status(&buffer[..len], self.channel.status_offset()).map(|_| ())
    }

    // Flushes stale input, sends `request` and waits for exactly one report.
    fn transact(&mut self, request: &Report) -> Result<([u8; REPORT_LEN], usize)> {
        let stale = self.channel.discard_pending()?;
        if stale > 0 {
            warn!("Dropped {} stale report(s) before sending", stale);
        }

        debug!("Sending report: {:02X?}", request);
        self.channel.write_report(request)?;

        let mut buffer = [0u8; REPORT_LEN];
        match self.channel.read_report(&mut buffer, self.timeout)? {
            Some(len) => {
                debug!("Received report: {:02X?}", &buffer[..len]);
                Ok((buffer, len))
            }
            None => {
                warn!(
                    "No reply to opcode {} within {:?}",
                    request[1], self.timeout
                );
                Err(Error::ResponseTimeout {
                    timeout: self.timeout,
                })
            }
        }
    }
}
