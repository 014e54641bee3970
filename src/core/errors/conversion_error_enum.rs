// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library

/// Type conversion runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// Error while converting bytes into a [`DeviceNumber`](crate::core::device::DeviceNumber).
    #[error("{0}")]
    DeviceNumber(String),

    /// Error while converting bytes into a [`Tag`](crate::core::device::Tag).
    #[error("{0}")]
    Tag(String),

    /// Error while converting bytes into a [`TagName`](crate::core::device::TagName).
    #[error("{0}")]
    TagName(String),

    /// Error while converting bytes into a [`Usage`](crate::core::device::Usage).
    #[error("{0}")]
    Usage(String),

    /// Error while converting bytes into a [`Uuid`](crate::core::device::Uuid).
    #[error("{0}")]
    Uuid(String),
}
