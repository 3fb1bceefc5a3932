//! [`Channel`] and [`DeviceProvider`] backed by the system HID library

use super::{Channel, DeviceInfo, DeviceProvider, Report, REPORT_SIZE};
use crate::{Error, Result};
use ::hidapi::{HidApi, HidDevice, HidError};
use log::{debug, error};
use std::{
    ffi::CString,
    io,
    sync::{Mutex, PoisonError},
};

/// Report ID used by the OTP interface
const REPORT_ID: u8 = 0;

/// Enumerates and opens devices through `hidapi`
pub struct HidApiProvider {
    api: Mutex<HidApi>,
}

impl HidApiProvider {
    /// Initialize the HID library
    pub fn new() -> Result<Self> {
        let api = HidApi::new().map_err(channel_error)?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl DeviceProvider for HidApiProvider {
    type Channel = HidChannel;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let mut api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
        api.refresh_devices().map_err(channel_error)?;

        Ok(api
            .device_list()
            .map(|device| DeviceInfo {
                path: device.path().to_string_lossy().into_owned(),
                vendor_id: device.vendor_id(),
                product_id: device.product_id(),
                serial_number: device.serial_number().map(str::to_owned),
                release_number: device.release_number(),
                manufacturer: device.manufacturer_string().map(str::to_owned),
                product: device.product_string().map(str::to_owned),
                usage_page: device.usage_page(),
                usage: device.usage(),
                interface_number: device.interface_number(),
            })
            .collect())
    }

    fn open(&self, device: &DeviceInfo) -> Result<HidChannel> {
        let path = CString::new(device.path.as_str()).map_err(|_| Error::NotFound)?;
        let api = self.api.lock().unwrap_or_else(PoisonError::into_inner);
        let device = api.open_path(&path).map_err(channel_error)?;
        debug!("opened HID device {}", path.to_string_lossy());

        Ok(HidChannel {
            device: Some(device),
        })
    }
}

/// Feature report channel to an open HID device
pub struct HidChannel {
    device: Option<HidDevice>,
}

impl HidChannel {
    fn device(&self) -> Result<&HidDevice> {
        self.device.as_ref().ok_or(Error::ChannelClosed)
    }
}

impl Channel for HidChannel {
    fn send(&mut self, report: &Report) -> Result<()> {
        let mut buf = [0u8; REPORT_SIZE + 1];
        buf[0] = REPORT_ID;
        buf[1..].copy_from_slice(report);
        self.device()?
            .send_feature_report(&buf)
            .map_err(channel_error)
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; REPORT_SIZE + 1];
        buf[0] = REPORT_ID;
        let len = self
            .device()?
            .get_feature_report(&mut buf)
            .map_err(channel_error)?;

        // skip the report ID
        Ok(buf.get(1..len).unwrap_or_default().to_vec())
    }

    fn close(&mut self) -> Result<()> {
        self.device.take();
        Ok(())
    }
}

fn channel_error(err: HidError) -> Error {
    error!("HID error: {}", err);
    Error::from(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
