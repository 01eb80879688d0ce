use std::thread;
use std::time::Duration;

use log::{debug, info};

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

pub mod channel;
pub use channel::{Backend, ReportChannel, ReportSink, SlotChannel};

pub mod codec;
pub use codec::{half_to_f32, Report};

pub mod impedance;

pub mod session;
pub use session::Session;

#[cfg(feature = "hidapi")]
mod hidapi_backend;
#[cfg(feature = "hidapi")]
pub use hidapi_backend::{HidapiBackend, HidapiChannel, HIDAPI_STATUS_OFFSET};

/// Length of the raw firmware version field.
pub const VERSION_LEN: usize = 15;

/// A single impedance sample, Z = rs + j·xs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Series resistance in ohms.
    pub rs: f32,
    /// Series reactance in ohms.
    pub xs: f32,
}

/// Four impedance samples taken by one extended measure command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtendedMeasurement {
    points: [Measurement; 4],
}

impl ExtendedMeasurement {
    pub fn new(points: [Measurement; 4]) -> Self {
        Self { points }
    }

    /// Samples in request order: `freq`, `freq + step`, `freq + 2·step`, `freq + 3·step`.
    pub fn points(&self) -> &[Measurement; 4] {
        &self.points
    }

    /// The frequency each point was taken at, for the `freq`/`step` the request used.
    pub fn frequencies(freq_hz: u32, step_hz: u32) -> [u32; 4] {
        let mut freqs = [freq_hz; 4];
        for (i, f) in (0u32..).zip(freqs.iter_mut()) {
            *f = freq_hz.saturating_add(step_hz.saturating_mul(i));
        }
        freqs
    }
}

/// Protocol number and firmware version reported by the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub protocol: u16,
    /// Raw version field as sent by the firmware.
    pub version: [u8; VERSION_LEN],
}

impl VersionInfo {
    /// The version field as text, without trailing NUL padding.
    pub fn version_string(&self) -> String {
        let end = self
            .version
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.version[..end]).into_owned()
    }
}

enum Link<C> {
    Closed,
    Open(Session<C>),
    Connected {
        session: Session<C>,
        version: VersionInfo,
    },
}

/// Represents a SARK-110 antenna analyzer.
///
/// The connection goes `Closed → Open → Connected → Closed`: [`Sark110::open`]
/// acquires the HID device, [`Sark110::connect`] confirms the instrument
/// answers and reads its version. Measurement, buzzer and reset are only
/// available once connected.
///
/// Commands take `&mut self`. To share one analyzer between threads, wrap it
/// in a mutex so every request/response cycle runs under the lock.
///
/// # Type Parameters
///
/// * `B`: The HID backend used to open the device. It must implement [`Backend`].
pub struct Sark110<B: Backend> {
    backend: B,
    config: Config,
    link: Link<B::Channel>,
}

#[cfg(feature = "hidapi")]
impl Sark110<HidapiBackend> {
    /// Creates an analyzer backed by hidapi with the default configuration.
    pub fn with_hidapi() -> Result<Self> {
        Ok(Self::new(HidapiBackend::new()?, Config::default()))
    }
}

impl<B> Sark110<B>
where
    B: Backend,
{
    /// Creates a new, closed `Sark110` instance.
    ///
    /// # Arguments
    ///
    /// * `backend`: The HID backend used to find and open the instrument.
    /// * `config`: USB identity, timeout and buzzer behaviour.
    pub fn new(backend: B, config: Config) -> Self {
        Self {
            backend,
            config,
            link: Link::Closed,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens the instrument. Does nothing if it is already open.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the device is open.
    /// * `Err(Error::DeviceNotFound)` if no matching instrument is plugged in.
    pub fn open(&mut self) -> Result<()> {
        if !matches!(self.link, Link::Closed) {
            debug!("open: device already open");
            return Ok(());
        }
        let channel = self
            .backend
            .open(self.config.vendor_id, self.config.product_id)
            .map_err(|e| {
                log::error!(
                    "Failed to open {:04x}:{:04x}: {:?}",
                    self.config.vendor_id,
                    self.config.product_id,
                    e
                );
                e
            })?;
        self.link = Link::Open(Session::new(channel, self.config.timeout));
        debug!("SARK-110 open");
        Ok(())
    }

    /// Reads the version to confirm the instrument answers.
    ///
    /// On failure the device stays open and `connect` may be retried.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once connected; [`Sark110::fw_protocol`] and
    ///   [`Sark110::fw_version`] are then available.
    /// * `Err(Error::NotConnected)` if the device was never opened.
    /// * Any error from the version command.
    pub fn connect(&mut self) -> Result<()> {
        let mut session = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Closed => return Err(Error::NotConnected),
            Link::Open(session) | Link::Connected { session, .. } => session,
        };
        match session.get_version() {
            Ok(version) => {
                info!(
                    "SARK-110 connected, protocol {} firmware {}",
                    version.protocol,
                    version.version_string()
                );
                self.link = Link::Connected { session, version };
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to read version during connect: {:?}", e);
                self.link = Link::Open(session);
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.link, Link::Closed)
    }

    /// Releases the device. Safe to call in any state and more than once.
    pub fn close(&mut self) -> Result<()> {
        let session = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Closed => return Ok(()),
            Link::Open(session) | Link::Connected { session, .. } => session,
        };
        debug!("Closing SARK-110");
        session.into_channel().close()
    }

    /// Version read by the last successful [`Sark110::connect`].
    pub fn version(&self) -> Option<&VersionInfo> {
        match &self.link {
            Link::Connected { version, .. } => Some(version),
            _ => None,
        }
    }

    pub fn fw_protocol(&self) -> Option<u16> {
        self.version().map(|v| v.protocol)
    }

    pub fn fw_version(&self) -> Option<String> {
        self.version().map(VersionInfo::version_string)
    }

    /// Takes one impedance sample.
    ///
    /// # Arguments
    ///
    /// * `freq_hz`: Measurement frequency in hertz.
    /// * `calibrated`: `true` for OSL calibrated data, `false` for raw data.
    /// * `samples`: Number of samples the instrument averages.
    ///
    /// # Returns
    ///
    /// * `Ok(Measurement)` with resistance and reactance in ohms.
    /// * `Err(Error::DeviceNack)` if the instrument rejected the request.
    /// * `Err(Error::ResponseTimeout)` if it did not answer in time.
    pub fn measure(&mut self, freq_hz: u32, calibrated: bool, samples: u8) -> Result<Measurement> {
        self.session()?
            .measure(freq_hz, calibrated, samples)
            .map_err(|e| {
                log::error!("Measure at {} Hz failed: {:?}", freq_hz, e);
                e
            })
    }

    /// Takes four samples from `freq_hz` in `step_hz` increments in one round trip.
    ///
    /// Values are carried as half floats, so they are less precise than
    /// [`Sark110::measure`]. See [`ExtendedMeasurement::frequencies`] for the
    /// frequency of each point.
    pub fn measure_ext(
        &mut self,
        freq_hz: u32,
        step_hz: u32,
        calibrated: bool,
        samples: u8,
    ) -> Result<ExtendedMeasurement> {
        self.session()?
            .measure_extended(freq_hz, step_hz, calibrated, samples)
            .map_err(|e| {
                log::error!(
                    "Extended measure from {} Hz step {} Hz failed: {:?}",
                    freq_hz,
                    step_hz,
                    e
                );
                e
            })
    }

    /// Turns the signal generator off.
    pub fn generator_off(&mut self) -> Result<()> {
        debug!("Turning generator off");
        self.measure(0, false, 1).map(|_| ())
    }

    /// Sounds the buzzer.
    ///
    /// With the buzzer grace period enabled this blocks until the tone is
    /// over: `duration_ms`, or 200 ms when `duration_ms` is 0.
    pub fn buzzer(&mut self, freq_hz: u16, duration_ms: u16) -> Result<()> {
        self.session()?.buzzer(freq_hz, duration_ms).map_err(|e| {
            log::error!("Buzzer failed: {:?}", e);
            e
        })?;
        if self.config.buzzer_grace {
            let settle = match duration_ms {
                0 => BUZZER_DEFAULT_SETTLE_MS,
                ms => u64::from(ms),
            };
            thread::sleep(Duration::from_millis(settle));
        }
        Ok(())
    }

    /// Resets the instrument.
    pub fn reset(&mut self) -> Result<()> {
        self.session()?.reset().map_err(|e| {
            log::error!("Reset failed: {:?}", e);
            e
        })
    }

    fn session(&mut self) -> Result<&mut Session<B::Channel>> {
        match &mut self.link {
            Link::Connected { session, .. } => Ok(session),
            _ => Err(Error::NotConnected),
        }
    }
}
