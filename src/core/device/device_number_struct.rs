// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

/// A device's major:minor identification number, as used by mountinfo field 3
/// and the prober's whole-disk/loop-device resolution helpers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeviceNumber {
    major: u32,
    minor: u32,
}

impl DeviceNumber {
    /// Builds a `DeviceNumber` from its major/minor components.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Packs this `DeviceNumber` into the kernel's `dev_t` encoding.
    pub fn to_dev_t(self) -> u64 {
        libc::makedev(self.major, self.minor)
    }
}

impl From<u64> for DeviceNumber {
    fn from(dev: u64) -> Self {
        Self {
            major: unsafe { libc::major(dev) },
            minor: unsafe { libc::minor(dev) },
        }
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

impl TryFrom<&[u8]> for DeviceNumber {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        std::str::from_utf8(bytes)
            .map_err(|e| {
                ConversionError::DeviceNumber(format!(
                    "bytes to UTF-8 string slice conversion error: {e:?}"
                ))
            })
            .and_then(|s| {
                Self::from_str(s).map_err(|e| ConversionError::DeviceNumber(e.to_string()))
            })
    }
}

impl FromStr for DeviceNumber {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major_s, minor_s) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ParserError::DeviceNumber(format!("missing ':' separator in {s:?}")))?;

        let major = major_s
            .parse::<u32>()
            .map_err(|e| ParserError::DeviceNumber(format!("invalid major number: {e}")))?;
        let minor = minor_s
            .parse::<u32>()
            .map_err(|e| ParserError::DeviceNumber(format!("invalid minor number: {e}")))?;

        Ok(Self { major, minor })
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn device_number_parses_major_minor_pair() {
        let dn: DeviceNumber = "8:3".parse().unwrap();
        assert_eq!(dn.major(), 8);
        assert_eq!(dn.minor(), 3);
        assert_eq!(dn.to_string(), "8:3");
    }

    #[test]
    fn device_number_rejects_missing_separator() {
        assert!("83".parse::<DeviceNumber>().is_err());
    }
}
