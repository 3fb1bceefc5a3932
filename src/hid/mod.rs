//! OTP application over 8-byte HID feature reports.
//!
//! Devices are reached through a [`Channel`] which exchanges fixed-size
//! feature reports. The [`OtpProtocol`] engine turns such a channel into a
//! request/response transport for slot commands, handling framing,
//! sequencing, keepalives and cancellation.
//!
//! Discovering and opening devices is left to a [`DeviceProvider`]. With the
//! `hidapi` feature enabled, [`hidapi::HidApiProvider`] provides one backed by
//! the system HID library.

pub mod frame;
#[cfg(feature = "hidapi")]
#[cfg_attr(docsrs, doc(cfg(feature = "hidapi")))]
pub mod hidapi;
pub mod protocol;

pub use self::protocol::{CancellationToken, Keepalive, OtpProtocol, Slot, Timing};

use crate::Result;

/// Size of a feature report, excluding the report ID
pub const REPORT_SIZE: usize = 8;

/// A single feature report
pub type Report = [u8; REPORT_SIZE];

/// USB vendor ID of Yubico
pub const YUBICO_VENDOR_ID: u16 = 0x1050;

/// Byte-level transport exchanging feature reports with a device.
///
/// Reports are the [`REPORT_SIZE`] data bytes of a feature report; the
/// (constant zero) report ID is added and stripped by the implementation.
pub trait Channel {
    /// Write a feature report
    fn send(&mut self, report: &Report) -> Result<()>;

    /// Read a feature report.
    ///
    /// Implementations return whatever the device produced; reports of the
    /// wrong size are rejected by the caller.
    fn receive(&mut self) -> Result<Vec<u8>>;

    /// Close the underlying device
    fn close(&mut self) -> Result<()>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn send(&mut self, report: &Report) -> Result<()> {
        (**self).send(report)
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        (**self).receive()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// HID device record as reported by the platform
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    /// Platform-specific device path
    pub path: String,

    /// Vendor ID
    pub vendor_id: u16,

    /// Product ID
    pub product_id: u16,

    /// Serial number string
    pub serial_number: Option<String>,

    /// Device release number
    pub release_number: u16,

    /// Manufacturer string
    pub manufacturer: Option<String>,

    /// Product string
    pub product: Option<String>,

    /// Usage page of the interface
    pub usage_page: u16,

    /// Usage of the interface
    pub usage: u16,

    /// USB interface number
    pub interface_number: i32,
}

impl DeviceInfo {
    /// Is this the keyboard interface through which the OTP application
    /// is reached?
    pub fn is_otp_interface(&self) -> bool {
        self.vendor_id == YUBICO_VENDOR_ID && self.usage_page == 0x0001 && self.usage == 0x0006
    }
}

/// Platform capability for discovering and opening HID devices
pub trait DeviceProvider {
    /// Channel type produced by [`DeviceProvider::open`]
    type Channel: Channel;

    /// List the HID interfaces currently attached
    fn enumerate(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a channel to a device
    fn open(&self, device: &DeviceInfo) -> Result<Self::Channel>;

    /// List the attached OTP interfaces
    fn otp_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self
            .enumerate()?
            .into_iter()
            .filter(DeviceInfo::is_otp_interface)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(Vec<DeviceInfo>);

    impl DeviceProvider for FixedProvider {
        type Channel = Box<dyn Channel>;

        fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
            Ok(self.0.clone())
        }

        fn open(&self, _device: &DeviceInfo) -> Result<Self::Channel> {
            Err(crate::Error::NotFound)
        }
    }

    #[test]
    fn otp_interface_filter() {
        let keyboard = DeviceInfo {
            path: "/dev/hidraw3".into(),
            vendor_id: YUBICO_VENDOR_ID,
            product_id: 0x0407,
            usage_page: 0x0001,
            usage: 0x0006,
            ..Default::default()
        };

        let fido = DeviceInfo {
            path: "/dev/hidraw4".into(),
            usage_page: 0xf1d0,
            usage: 0x0001,
            ..keyboard.clone()
        };

        let other = DeviceInfo {
            vendor_id: 0x046d,
            ..keyboard.clone()
        };

        let provider = FixedProvider(vec![keyboard.clone(), fido, other]);
        assert_eq!(provider.otp_devices().unwrap(), [keyboard]);
    }
}
