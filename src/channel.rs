//! The report channel seam between the command session and a host HID stack.
//!
//! Stacks that hand out reports through a blocking read (hidapi) implement
//! [`ReportChannel`] directly. Stacks that deliver reports through a callback
//! on their own thread go through [`SlotChannel`], which turns the callback
//! into a single-slot buffer the session can wait on.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::codec::Report;
use crate::error::Result;

/// A fixed-length report pipe to one open instrument.
pub trait ReportChannel {
    /// Sends one outbound report, report ID included.
    fn write_report(&mut self, report: &Report) -> Result<()>;

    /// Waits up to `timeout` for one inbound report and copies it into `buf`.
    ///
    /// Returns the number of bytes received, or `None` if nothing arrived in time.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>>;

    /// Index of the status byte in received reports: 0 when the stack strips
    /// the report ID, 1 when it keeps it.
    fn status_offset(&self) -> usize;

    /// Drops any report that arrived without being asked for. Called right
    /// before every request is sent.
    fn discard_pending(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Releases the underlying device.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discovers and opens instruments, producing a [`ReportChannel`] for each.
pub trait Backend {
    type Channel: ReportChannel;

    /// Opens the first device matching the USB identity, failing with
    /// `Error::DeviceNotFound` if there is none.
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Self::Channel>;
}

#[derive(Default)]
struct Slot {
    report: Option<Vec<u8>>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    arrived: Condvar,
}

/// Producer half of a [`SlotChannel`], handed to the stack's report callback.
#[derive(Clone)]
pub struct ReportSink {
    shared: Arc<Shared>,
}

impl ReportSink {
    /// Stores `report` in the slot, replacing anything unread, and wakes the waiter.
    pub fn deliver(&self, report: &[u8]) {
        let mut slot = self.shared.slot.lock();
        if slot.report.is_some() {
            debug!("Overwriting unread report");
        }
        slot.report = Some(report.to_vec());
        self.shared.arrived.notify_one();
    }
}

type Writer = Box<dyn FnMut(&Report) -> Result<()> + Send>;

/// A [`ReportChannel`] fed by a callback-driven HID stack.
///
/// Outbound reports go through the `writer` closure. Inbound reports are
/// pushed by the stack through the paired [`ReportSink`] and held in a
/// single slot owned by this channel, so separate instruments never share
/// a receive buffer.
pub struct SlotChannel {
    shared: Arc<Shared>,
    writer: Writer,
    status_offset: usize,
}

impl SlotChannel {
    /// Creates a channel and the sink its report callback should feed.
    pub fn new<W>(writer: W, status_offset: usize) -> (Self, ReportSink)
    where
        W: FnMut(&Report) -> Result<()> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let sink = ReportSink {
            shared: Arc::clone(&shared),
        };
        let channel = Self {
            shared,
            writer: Box::new(writer),
            status_offset,
        };
        (channel, sink)
    }
}

impl ReportChannel for SlotChannel {
    fn write_report(&mut self, report: &Report) -> Result<()> {
        (self.writer)(report)
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        let mut slot = self.shared.slot.lock();
        self.shared
            .arrived
            .wait_while_for(&mut slot, |slot| slot.report.is_none(), timeout);
        Ok(slot.report.take().map(|report| {
            let len = report.len().min(buf.len());
            buf[..len].copy_from_slice(&report[..len]);
            len
        }))
    }

    fn status_offset(&self) -> usize {
        self.status_offset
    }

    fn discard_pending(&mut self) -> Result<usize> {
        let mut slot = self.shared.slot.lock();
        Ok(match slot.report.take() {
            Some(stale) => {
                warn!("Discarding stale report {:02X?}", stale);
                1
            }
            None => 0,
        })
    }
}
