// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ParserError;

/// The name half of a [`Tag`](crate::core::device::Tag).
///
/// A tag name is a non-empty uppercase ASCII identifier. Unlike a
/// closed set of well-known tags, any identifier meeting that grammar is accepted — the value
/// list produced by a probe carries dozens of names (`TYPE`, `PTTYPE`, `PART_ENTRY_UUID`, ...)
/// that a device-spec tag such as `LABEL=` or `UUID=` never needs to enumerate.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TagName(String);

impl TagName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TagName {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParserError::TagName(format!(
                "tag name must be a non-empty uppercase ASCII identifier, got {s:?}"
            )))
        }
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tag_name_accepts_uppercase_identifiers() {
        assert!("LABEL".parse::<TagName>().is_ok());
        assert!("PART_ENTRY_UUID".parse::<TagName>().is_ok());
    }

    #[test]
    fn tag_name_rejects_lowercase_and_empty() {
        assert!("label".parse::<TagName>().is_err());
        assert!("".parse::<TagName>().is_err());
        assert!("1ABEL".parse::<TagName>().is_err());
    }
}
