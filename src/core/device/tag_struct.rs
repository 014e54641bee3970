// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::device::TagName;
use crate::core::errors::ParserError;

/// A `NAME=VALUE` pair, either produced as a probe result or
/// consumed as a device spec string such as `LABEL=swap` or `UUID="ac4f36bf-..."`.
///
/// # Grammar
///
/// - `name` is a non-empty uppercase ASCII identifier ([`TagName`]).
/// - `value` may be bare, or wrapped in double quotes. Backslash-escapes (`\"`, `\\`) are only
///   recognized inside a quoted value; a bare value is taken literally.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Tag {
    name: TagName,
    value: String,
}

impl Tag {
    pub fn new(name: TagName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &TagName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.name, self.value)
    }
}

fn unquote_value(raw: &str) -> Result<String, ParserError> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('"') {
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => {
                        return Err(ParserError::Tag(format!(
                            "dangling escape in tag value: {raw:?}"
                        )))
                    }
                },
                '"' => {
                    closed = true;
                    break;
                }
                c => out.push(c),
            }
        }
        if !closed {
            return Err(ParserError::Tag(format!(
                "missing closing double-quote in tag value: {raw:?}"
            )));
        }
        Ok(out)
    } else {
        Ok(trimmed.to_string())
    }
}

impl FromStr for Tag {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| ParserError::Tag(format!("missing '=' in tag spec: {s:?}")))?;

        let name = name
            .trim()
            .parse::<TagName>()
            .map_err(|e| ParserError::Tag(e.to_string()))?;
        let value = unquote_value(value)?;

        Ok(Self { name, value })
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tag_parses_a_bare_value() {
        let tag: Tag = "LABEL=swap".parse().unwrap();
        assert_eq!(tag.name().as_str(), "LABEL");
        assert_eq!(tag.value(), "swap");
    }

    #[test]
    fn tag_parses_a_quoted_value_with_escapes() {
        let tag: Tag = r#"UUID="ac4f36bf-191b-4fb0-b808-6d7fc9fc88be""#.parse().unwrap();
        assert_eq!(tag.value(), "ac4f36bf-191b-4fb0-b808-6d7fc9fc88be");

        let tag: Tag = r#"LABEL="my \"disk\"""#.parse().unwrap();
        assert_eq!(tag.value(), "my \"disk\"");
    }

    #[test]
    fn tag_rejects_an_unclosed_quote() {
        assert!(r#"LABEL="swap"#.parse::<Tag>().is_err());
    }

    #[test]
    fn tag_rejects_a_lowercase_name() {
        assert!("label=swap".parse::<Tag>().is_err());
    }

    #[test]
    fn tag_rejects_missing_separator() {
        assert!("LABELswap".parse::<Tag>().is_err());
    }
}
