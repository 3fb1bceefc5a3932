//! Device information reported by the management application

use crate::{tlv, Error, Result, Version};
use bitflags::bitflags;
use std::time::Duration;

const TAG_CAPS_SUPPORTED_USB: u8 = 0x01;
const TAG_SERIAL_NUMBER: u8 = 0x02;
const TAG_CAPS_ENABLED_USB: u8 = 0x03;
const TAG_FORM_FACTOR: u8 = 0x04;
const TAG_FIRMWARE_VERSION: u8 = 0x05;
const TAG_AUTO_EJECT_TIMEOUT: u8 = 0x06;
const TAG_CHAL_RESP_TIMEOUT: u8 = 0x07;
const TAG_DEVICE_FLAGS: u8 = 0x08;
const TAG_CONFIG_LOCK: u8 = 0x0a;
const TAG_CAPS_SUPPORTED_NFC: u8 = 0x0d;
const TAG_CAPS_ENABLED_NFC: u8 = 0x0e;

bitflags! {
    /// Applications which can be supported or enabled on an interface
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct Capability: u16 {
        /// Yubico OTP
        const OTP = 0x01;
        /// FIDO U2F
        const U2F = 0x02;
        /// OpenPGP card
        const OPENPGP = 0x08;
        /// PIV
        const PIV = 0x10;
        /// OATH
        const OATH = 0x20;
        /// YubiHSM Auth
        const HSMAUTH = 0x100;
        /// FIDO2
        const FIDO2 = 0x200;
    }
}

bitflags! {
    /// Device behaviour flags
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct DeviceFlags: u8 {
        /// Device can wake the host
        const REMOTE_WAKEUP = 0x40;
        /// CCID interface ejects the card when touched
        const EJECT = 0x80;
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for DeviceFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Physical form factor of a device
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum FormFactor {
    /// Unknown or unreported
    #[default]
    Unknown,
    /// USB-A keychain
    UsbAKeychain,
    /// USB-A nano
    UsbANano,
    /// USB-C keychain
    UsbCKeychain,
    /// USB-C nano
    UsbCNano,
    /// USB-C and Lightning
    UsbCLightning,
    /// USB-A with biometric sensor
    UsbABio,
    /// USB-C with biometric sensor
    UsbCBio,
}

impl From<u8> for FormFactor {
    fn from(byte: u8) -> Self {
        match byte & 0x0f {
            0x01 => FormFactor::UsbAKeychain,
            0x02 => FormFactor::UsbANano,
            0x03 => FormFactor::UsbCKeychain,
            0x04 => FormFactor::UsbCNano,
            0x05 => FormFactor::UsbCLightning,
            0x06 => FormFactor::UsbABio,
            0x07 => FormFactor::UsbCBio,
            _ => FormFactor::Unknown,
        }
    }
}

/// Device configuration as returned by the management READ CONFIG command
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    /// Device flags
    pub flags: DeviceFlags,

    /// Applications available over USB
    pub caps_supported_usb: Capability,

    /// Applications enabled over USB
    pub caps_enabled_usb: Capability,

    /// Applications available over NFC
    pub caps_supported_nfc: Capability,

    /// Applications enabled over NFC
    pub caps_enabled_nfc: Capability,

    /// Serial number, if the device discloses it
    pub serial: Option<u32>,

    /// Firmware version
    pub firmware_version: Version,

    /// Form factor
    pub form_factor: FormFactor,

    /// Time after which the CCID card is ejected
    pub auto_eject_timeout: Duration,

    /// Time the OTP application waits for touch during challenge-response
    pub challenge_response_timeout: Duration,

    /// Configuration is protected by a lock code
    pub is_locked: bool,

    /// Security Key series device
    pub is_sky: bool,

    /// FIPS series device
    pub is_fips: bool,
}

impl DeviceInfo {
    /// Parse a READ CONFIG response body.
    ///
    /// The first byte is the length of the simple TLV data that follows.
    /// Unknown tags are ignored; known tags with an unexpected width fail
    /// with [`Error::ParseError`].
    pub fn parse(response: &[u8]) -> Result<Self> {
        let (_, body) = response.split_first().ok_or(Error::ParseError)?;
        let mut info = DeviceInfo::default();

        for entry in tlv::decode_simple(body)? {
            let value = entry.value;

            match entry.tag {
                TAG_CAPS_SUPPORTED_USB => info.caps_supported_usb = usb_capability(value)?,
                TAG_CAPS_ENABLED_USB => info.caps_enabled_usb = usb_capability(value)?,
                TAG_CAPS_SUPPORTED_NFC => {
                    info.caps_supported_nfc = Capability::from_bits_retain(be_u16(value)?)
                }
                TAG_CAPS_ENABLED_NFC => {
                    info.caps_enabled_nfc = Capability::from_bits_retain(be_u16(value)?)
                }
                TAG_SERIAL_NUMBER => {
                    let bytes: [u8; 4] = value.try_into().map_err(|_| Error::ParseError)?;
                    info.serial = Some(u32::from_be_bytes(bytes));
                }
                TAG_FORM_FACTOR => {
                    let byte = single(value)?;
                    info.form_factor = FormFactor::from(byte);
                    info.is_fips = byte & 0x80 != 0;
                    info.is_sky = byte & 0x40 != 0;
                }
                TAG_FIRMWARE_VERSION => {
                    if value.len() != 3 {
                        return Err(Error::ParseError);
                    }
                    info.firmware_version = Version::from_bytes(value)?;
                }
                TAG_AUTO_EJECT_TIMEOUT => {
                    info.auto_eject_timeout = Duration::from_secs(be_u16(value)?.into())
                }
                TAG_CHAL_RESP_TIMEOUT => {
                    info.challenge_response_timeout = Duration::from_secs(single(value)?.into())
                }
                TAG_DEVICE_FLAGS => info.flags = DeviceFlags::from_bits_retain(single(value)?),
                TAG_CONFIG_LOCK => info.is_locked = single(value)? != 0,
                _ => (),
            }
        }

        Ok(info)
    }
}

/// USB capabilities are a single byte on older firmware
fn usb_capability(value: &[u8]) -> Result<Capability> {
    let bits = match value {
        [byte] => u16::from(*byte),
        _ => be_u16(value)?,
    };

    Ok(Capability::from_bits_retain(bits))
}

fn be_u16(value: &[u8]) -> Result<u16> {
    let bytes: [u8; 2] = value.try_into().map_err(|_| Error::ParseError)?;
    Ok(u16::from_be_bytes(bytes))
}

fn single(value: &[u8]) -> Result<u8> {
    match value {
        [byte] => Ok(*byte),
        _ => Err(Error::ParseError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn parse_yubikey5() {
        let response = hex!(
            "2b"
            "01 02 02 3b"
            "03 02 02 39"
            "02 04 00 bc 61 4e"
            "04 01 41"
            "05 03 05 04 03"
            "06 02 00 00"
            "07 01 0f"
            "08 01 80"
            "0a 01 00"
            "0d 02 02 3b"
            "0e 02 02 33"
        );

        let info = DeviceInfo::parse(&response).unwrap();
        assert_eq!(
            info.caps_supported_usb,
            Capability::OTP
                | Capability::U2F
                | Capability::OPENPGP
                | Capability::PIV
                | Capability::OATH
                | Capability::FIDO2
        );
        assert!(!info.caps_enabled_usb.contains(Capability::U2F));
        assert_eq!(info.caps_supported_nfc, info.caps_supported_usb);
        assert!(!info.caps_enabled_nfc.contains(Capability::OPENPGP));
        assert_eq!(info.serial, Some(12_345_678));
        assert_eq!(info.form_factor, FormFactor::UsbAKeychain);
        assert!(info.is_sky);
        assert!(!info.is_fips);
        assert_eq!(info.firmware_version, Version::new(5, 4, 3));
        assert_eq!(info.auto_eject_timeout, Duration::ZERO);
        assert_eq!(info.challenge_response_timeout, Duration::from_secs(15));
        assert_eq!(info.flags, DeviceFlags::EJECT);
        assert!(!info.is_locked);
    }

    #[test]
    fn single_byte_usb_capabilities() {
        let info = DeviceInfo::parse(&hex!("06 01 01 3f 0c 01 99")).unwrap();
        assert_eq!(info.caps_supported_usb.bits(), 0x3f);
        assert_eq!(info.caps_enabled_usb, Capability::empty());
    }

    #[test]
    fn invalid_widths() {
        assert_eq!(DeviceInfo::parse(&hex!("03 0d 01 3f")), Err(Error::ParseError));
        assert_eq!(DeviceInfo::parse(&hex!("04 02 02 00 01")), Err(Error::ParseError));
        assert_eq!(DeviceInfo::parse(&hex!("04 04 02 01 02")), Err(Error::ParseError));
        assert_eq!(DeviceInfo::parse(&hex!("04 05 02 05 04")), Err(Error::ParseError));
        assert_eq!(DeviceInfo::parse(&hex!("03 07 02 0f")), Err(Error::ParseError));
        assert_eq!(DeviceInfo::parse(&[]), Err(Error::ParseError));
    }
}
