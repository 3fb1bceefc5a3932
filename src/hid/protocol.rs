//! Request/response engine for OTP slot commands

use super::{
    frame::{self, RESP_PENDING_FLAG, RESP_TIMEOUT_WAIT_FLAG, SEQUENCE_MASK, SLOT_WRITE_FLAG},
    Channel, Report,
};
use crate::{Buffer, Error, Result, TimeoutKind, Version};
use log::{debug, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread,
    time::Duration,
};
use zeroize::Zeroizing;

/// Well-known OTP command slots
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slot(pub u8);

impl Slot {
    /// Write configuration to slot 1
    pub const CONFIG_1: Slot = Slot(0x01);
    /// Write configuration to slot 2
    pub const CONFIG_2: Slot = Slot(0x03);
    /// Read the device serial number
    pub const DEVICE_SERIAL: Slot = Slot(0x10);
    /// Write the keyboard scan map
    pub const SCAN_MAP: Slot = Slot(0x12);
    /// HMAC-SHA1 challenge-response using slot 1
    pub const CHAL_HMAC1: Slot = Slot(0x30);
    /// HMAC-SHA1 challenge-response using slot 2
    pub const CHAL_HMAC2: Slot = Slot(0x38);
}

impl From<u8> for Slot {
    fn from(slot: u8) -> Slot {
        Slot(slot)
    }
}

/// Progress signalled while the device works on a command
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Keepalive {
    /// Device is processing the command
    Processing,

    /// Device is waiting for the user to touch it
    AwaitingTouch,
}

impl Keepalive {
    /// Numeric status code of this keepalive
    pub fn code(self) -> u8 {
        match self {
            Keepalive::Processing => 1,
            Keepalive::AwaitingTouch => 2,
        }
    }
}

/// Cooperative cancellation of a pending command.
///
/// Clones share state, so a token can be handed to another thread which
/// cancels while the command is waiting on the device.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Polling intervals used while talking to a device
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// Interval between checks that the device is ready for the next report
    pub ready_poll_interval: Duration,

    /// Checks before giving up on the device becoming ready
    pub ready_poll_attempts: usize,

    /// Interval between reads while the device waits for touch
    pub touch_poll_interval: Duration,

    /// Interval between reads while the device is processing
    pub processing_poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            ready_poll_interval: Duration::from_millis(50),
            ready_poll_attempts: 20,
            touch_poll_interval: Duration::from_millis(100),
            processing_poll_interval: Duration::from_millis(20),
        }
    }
}

/// OTP protocol session over a [`Channel`].
///
/// One command is in flight at a time; concurrent callers are serialized.
pub struct OtpProtocol<C: Channel> {
    channel: Mutex<C>,
    version: Version,
    timing: Timing,
}

impl<C: Channel> OtpProtocol<C> {
    /// Open a session, reading the firmware version from the device
    pub fn negotiate(channel: C) -> Result<Self> {
        Self::with_timing(channel, Timing::default())
    }

    /// Open a session with custom polling intervals
    pub fn with_timing(mut channel: C, timing: Timing) -> Result<Self> {
        let status = Transfer::new(&mut channel, &timing).receive()?;
        let version = Version::from_bytes(&status[1..4])?;
        debug!("OTP application version {}", version);

        let protocol = Self {
            channel: Mutex::new(channel),
            version,
            timing,
        };

        // NEO firmware only refreshes the programming sequence after it
        // has seen a command, so send an invalid scan map
        if version.major == 3 {
            match protocol.call(Slot::SCAN_MAP, &[b'c'; 51]) {
                Ok(_) | Err(Error::CommandRejected) => (),
                Err(e) => return Err(e),
            }
        }

        Ok(protocol)
    }

    /// Firmware version read during negotiation
    pub fn version(&self) -> Version {
        self.version
    }

    /// Polling intervals of this session
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Send a command to a slot and wait for the response.
    ///
    /// Returns the response data (including the device's CRC) or, for
    /// commands without response data, the six updated status bytes.
    /// `on_keepalive` is invoked every time the device reports that it is
    /// still working. `cancel` is checked at every poll: while waiting for
    /// the device to accept a report and before each response read.
    pub fn send_and_receive(
        &self,
        slot: impl Into<Slot>,
        payload: &[u8],
        mut on_keepalive: impl FnMut(Keepalive),
        cancel: &CancellationToken,
    ) -> Result<Buffer> {
        let slot = slot.into();
        let frame = Zeroizing::new(frame::format_frame(slot.0, payload)?);

        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        let mut transfer = Transfer::new(&mut *channel, &self.timing);

        trace!("sending {} byte command to slot {:#04x}", payload.len(), slot.0);
        let prog_seq = transfer.send_frame(&frame, cancel)?;
        transfer.read_frame(prog_seq, &mut on_keepalive, cancel)
    }

    /// Send a command without keepalive reporting or cancellation
    pub fn call(&self, slot: impl Into<Slot>, payload: &[u8]) -> Result<Buffer> {
        self.send_and_receive(slot, payload, |_| (), &CancellationToken::new())
    }

    /// Read the six status bytes: firmware version, programming sequence,
    /// touch level and a reserved byte
    pub fn read_status(&self) -> Result<[u8; 6]> {
        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        let report = Transfer::new(&mut *channel, &self.timing).receive()?;
        Ok(status_bytes(&report))
    }

    /// Read the device serial number
    pub fn read_serial(&self) -> Result<u32> {
        let response = self.call(Slot::DEVICE_SERIAL, &[])?;
        let response = response.get(..6).ok_or(Error::SizeError)?;

        if !frame::check_crc(response) {
            return Err(Error::CrcMismatch);
        }

        let mut serial = [0u8; 4];
        serial.copy_from_slice(&response[..4]);
        Ok(u32::from_be_bytes(serial))
    }

    /// Close the underlying channel
    pub fn close(self) -> Result<()> {
        self.channel
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .close()
    }
}

/// Status bytes of a status report
fn status_bytes(report: &Report) -> [u8; 6] {
    let mut status = [0u8; 6];
    status.copy_from_slice(&report[1..7]);
    status
}

/// A single command exchange on a locked channel
struct Transfer<'a, C: Channel + ?Sized> {
    channel: &'a mut C,
    timing: &'a Timing,
}

impl<'a, C: Channel + ?Sized> Transfer<'a, C> {
    fn new(channel: &'a mut C, timing: &'a Timing) -> Self {
        Self { channel, timing }
    }

    fn receive(&mut self) -> Result<Report> {
        let report = self.channel.receive()?;
        trace!("<<< {}", hex::lower::encode_string(&report));

        report
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidReport { len: report.len() })
    }

    fn send(&mut self, report: &Report) -> Result<()> {
        trace!(">>> {}", hex::lower::encode_string(report));
        self.channel.send(report)
    }

    /// Wait for the device to clear its write flag
    fn await_ready_to_write(&mut self, cancel: &CancellationToken) -> Result<()> {
        for _ in 0..self.timing.ready_poll_attempts {
            if self.receive()?[frame::STATUS_OFFSET] & SLOT_WRITE_FLAG == 0 {
                return Ok(());
            }

            self.wait(self.timing.ready_poll_interval, cancel)?;
        }

        Err(Error::Timeout(TimeoutKind::NotReady))
    }

    /// Write a frame, returning the programming sequence seen beforehand
    fn send_frame(
        &mut self,
        frame: &[u8; frame::FRAME_SIZE],
        cancel: &CancellationToken,
    ) -> Result<u8> {
        let prog_seq = self.receive()?[frame::STATUS_OFFSET_PROG_SEQ];

        for report in frame::frame_reports(frame) {
            self.await_ready_to_write(cancel)?;
            self.send(&report)?;
        }

        Ok(prog_seq)
    }

    fn read_frame(
        &mut self,
        prog_seq: u8,
        on_keepalive: &mut dyn FnMut(Keepalive),
        cancel: &CancellationToken,
    ) -> Result<Buffer> {
        let mut response = Zeroizing::new(Vec::new());
        let mut seq = 0u8;
        let mut needs_touch = false;

        loop {
            self.check_cancelled(cancel)?;

            let report = self.receive()?;
            let status = report[frame::STATUS_OFFSET];

            if status & RESP_PENDING_FLAG != 0 {
                if status & SEQUENCE_MASK == seq {
                    response.extend_from_slice(&report[..frame::REPORT_DATA_SIZE]);
                    seq += 1;
                } else if status & SEQUENCE_MASK == 0 {
                    // sequence wrapped back to zero: end of response
                    self.reset_state();
                    return Ok(response);
                }
            } else if status == 0 {
                if !response.is_empty() {
                    return Err(Error::IncompleteTransfer);
                }

                if frame::is_sequence_updated(&report, prog_seq) {
                    return Ok(Zeroizing::new(status_bytes(&report).to_vec()));
                }

                if needs_touch {
                    return Err(Error::Timeout(TimeoutKind::Touch));
                }

                return Err(Error::CommandRejected);
            } else {
                let interval = if status & RESP_TIMEOUT_WAIT_FLAG != 0 {
                    on_keepalive(Keepalive::AwaitingTouch);
                    needs_touch = true;
                    self.timing.touch_poll_interval
                } else {
                    on_keepalive(Keepalive::Processing);
                    self.timing.processing_poll_interval
                };

                self.wait(interval, cancel)?;
            }
        }
    }

    /// Sleep for one poll interval, checking for cancellation on both ends
    fn wait(&mut self, interval: Duration, cancel: &CancellationToken) -> Result<()> {
        if !cancel.is_cancelled() {
            thread::sleep(interval);
        }

        self.check_cancelled(cancel)
    }

    /// Abort with a reset of the device if cancellation has been requested
    fn check_cancelled(&mut self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            debug!("command cancelled");
            self.reset_state();
            return Err(Error::Timeout(TimeoutKind::Cancelled));
        }

        Ok(())
    }

    /// Reset the device's read state.
    ///
    /// The outcome of the command is already known at this point, so a
    /// failure here is only logged.
    fn reset_state(&mut self) {
        if let Err(e) = self.send(&frame::DUMMY_REPORT) {
            warn!("failed to reset read state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing() {
        let timing = Timing::default();
        assert_eq!(timing.ready_poll_interval, Duration::from_millis(50));
        assert_eq!(timing.ready_poll_attempts, 20);
        assert_eq!(timing.touch_poll_interval, Duration::from_millis(100));
        assert_eq!(timing.processing_poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn keepalive_codes() {
        assert_eq!(Keepalive::Processing.code(), 1);
        assert_eq!(Keepalive::AwaitingTouch.code(), 2);
    }
}
