//! [`Backend`] for hidapi, which strips the report ID from inbound reports.

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use log::{debug, info};

use crate::channel::{Backend, ReportChannel};
use crate::codec::Report;
use crate::constants::REPORT_LEN;
use crate::error::{Error, Result};

/// Status byte index in reports read through hidapi.
pub const HIDAPI_STATUS_OFFSET: usize = 0;

pub struct HidapiBackend {
    api: HidApi,
}

impl HidapiBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            api: HidApi::new()?,
        })
    }

    /// Wraps an already initialised `HidApi` context.
    pub fn with_api(api: HidApi) -> Self {
        Self { api }
    }
}

impl Backend for HidapiBackend {
    type Channel = HidapiChannel;

    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<HidapiChannel> {
        self.api.refresh_devices()?;
        let present = self
            .api
            .device_list()
            .any(|d| d.vendor_id() == vendor_id && d.product_id() == product_id);
        if !present {
            return Err(Error::DeviceNotFound {
                vendor_id,
                product_id,
            });
        }

        let device = self.api.open(vendor_id, product_id)?;
        device.set_blocking_mode(true)?;
        info!(
            "Opened HID device {:04x}:{:04x}",
            vendor_id, product_id
        );
        Ok(HidapiChannel { device })
    }
}

pub struct HidapiChannel {
    device: HidDevice,
}

impl HidapiChannel {
    pub fn new(device: HidDevice) -> Self {
        Self { device }
    }
}

fn timeout_ms(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}

impl ReportChannel for HidapiChannel {
    fn write_report(&mut self, report: &Report) -> Result<()> {
        let written = self.device.write(report)?;
        if written < REPORT_LEN {
            return Err(Error::Transport(format!(
                "short write: {} of {} bytes",
                written, REPORT_LEN
            )));
        }
        Ok(())
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        match self.device.read_timeout(buf, timeout_ms(timeout))? {
            0 => Ok(None),
            len => Ok(Some(len)),
        }
    }

    fn status_offset(&self) -> usize {
        HIDAPI_STATUS_OFFSET
    }

    fn discard_pending(&mut self) -> Result<usize> {
        let mut scratch = [0u8; REPORT_LEN];
        let mut dropped = 0;
        while self.device.read_timeout(&mut scratch, 0)? > 0 {
            debug!("Discarding stale report {:02X?}", scratch);
            dropped += 1;
        }
        Ok(dropped)
    }

    fn close(&mut self) -> Result<()> {
        debug!("Closing HID device");
        Ok(())
    }
}
