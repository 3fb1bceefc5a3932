//! Firmware versions

use crate::{Error, Result};
use std::{fmt, str::FromStr};

/// Firmware version reported by a device
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Version {
    /// Major version component
    pub major: u8,

    /// Minor version component
    pub minor: u8,

    /// Patch version component
    pub patch: u8,
}

impl Version {
    /// Create a new version
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version from the first three bytes of a buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [major, minor, patch, ..] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(Error::SizeError),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parse `major[.minor[.patch]]`; omitted components are zero.
    fn from_str(s: &str) -> Result<Self> {
        let mut components = [0u8; 3];
        let mut count = 0;

        for part in s.split('.') {
            let component = components.get_mut(count).ok_or(Error::ParseError)?;
            *component = part.parse().map_err(|_| Error::ParseError)?;
            count += 1;
        }

        let [major, minor, patch] = components;
        Ok(Self::new(major, minor, patch))
    }
}

#[cfg(test)]
mod tests {
    use super::Version;
    use crate::Error;

    #[test]
    fn parse() {
        assert_eq!("5.4.3".parse(), Ok(Version::new(5, 4, 3)));
        assert_eq!("3.1".parse(), Ok(Version::new(3, 1, 0)));
        assert_eq!("4".parse(), Ok(Version::new(4, 0, 0)));
        assert_eq!("1.2.3.4".parse::<Version>(), Err(Error::ParseError));
        assert_eq!("".parse::<Version>(), Err(Error::ParseError));
        assert_eq!("1.x".parse::<Version>(), Err(Error::ParseError));
        assert_eq!("-1".parse::<Version>(), Err(Error::ParseError));
    }

    #[test]
    fn from_bytes() {
        assert_eq!(Version::from_bytes(&[5, 2, 7, 9]), Ok(Version::new(5, 2, 7)));
        assert_eq!(Version::from_bytes(&[5, 2]), Err(Error::SizeError));
    }

    #[test]
    fn ordering() {
        assert!(Version::new(5, 2, 7) > Version::new(4, 3, 9));
        assert!(Version::new(3, 4, 0) < Version::new(3, 4, 1));
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
    }
}
