// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

/// Coarse classification of what a matched superblock is used for.
///
/// Reported as the `USAGE` value and consulted by
/// [`Filter`](crate::prober::Filter) when a caller restricts superblock scanning to, or away
/// from, particular usage classes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[non_exhaustive]
pub enum Usage {
    FileSystem,
    Raid,
    Crypto,
    Other,
    Unknown,
}

impl Usage {
    /// View this `Usage` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FileSystem => "filesystem",
            Self::Raid => "raid",
            Self::Crypto => "crypto",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

impl AsRef<Usage> for Usage {
    #[inline]
    fn as_ref(&self) -> &Usage {
        self
    }
}

impl AsRef<str> for Usage {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&[u8]> for Usage {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        std::str::from_utf8(bytes)
            .map_err(|e| {
                ConversionError::Usage(format!(
                    "bytes to UTF-8 string slice conversion error. {:?}",
                    e
                ))
            })
            .and_then(|s| Self::from_str(s).map_err(|e| ConversionError::Usage(e.to_string())))
    }
}

impl FromStr for Usage {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "filesystem" => Ok(Self::FileSystem),
            "raid" => Ok(Self::Raid),
            "crypto" => Ok(Self::Crypto),
            "other" => Ok(Self::Other),
            "unknown" => Ok(Self::Unknown),
            _unsupported => {
                let err_msg = format!("unsupported device usage: {:?}", s);
                Err(ParserError::Tag(err_msg))
            }
        }
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn usage_can_parse_a_valid_device_usage() {
        assert_eq!("filesystem".parse::<Usage>().unwrap(), Usage::FileSystem);
        assert_eq!("RAID".parse::<Usage>().unwrap(), Usage::Raid);
        assert_eq!("crypto".parse::<Usage>().unwrap(), Usage::Crypto);
    }

    #[test]
    fn usage_rejects_an_invalid_device_usage() {
        assert!("nonsense".parse::<Usage>().is_err());
    }
}
