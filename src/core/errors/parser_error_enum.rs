// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library

/// String parser runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParserError {
    /// Error while parsing a string into a [`Tag`](crate::core::device::Tag).
    #[error("{0}")]
    Tag(String),

    /// Error while parsing a string into a [`TagName`](crate::core::device::TagName).
    #[error("{0}")]
    TagName(String),

    /// Error while parsing a string into a [`DeviceNumber`](crate::core::device::DeviceNumber).
    #[error("{0}")]
    DeviceNumber(String),

    /// Error while parsing a line of a mount-table file.
    #[error("{0}")]
    MountLine(String),

    /// Error while parsing a magic-offset tag value produced by the prober.
    #[error("{0}")]
    MagicOffset(String),
}
