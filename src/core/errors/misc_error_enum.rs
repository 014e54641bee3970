// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Miscellaneous kernel-interface helper errors.

// From dependency library
use thiserror::Error;

// From standard library
use std::io;

// From this library

/// `utils::kernel` module runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MiscError {
    /// I/O runtime error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error while resolving a device number to a device name.
    #[error("{0}")]
    Devno(String),

    /// Error sending a udev event for a block device.
    #[error("{0}")]
    SendUEvent(String),
}
