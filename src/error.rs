// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Library-level error module.

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::EncodeError;
use crate::core::errors::MiscError;
use crate::core::errors::ParserError;

use crate::config::ConfigError;

use crate::mount::MountError;

use crate::prober::ProbeBuilderError;
use crate::prober::ProbeError;

/// A specialized [`Result`](std::result::Result) type for `diskid`.
///
/// This typedef is generally used at the program-level to avoid writing out [`DiskIdError`]
/// directly, and is, otherwise, a direct mapping to [`Result`](std::result::Result).
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, DiskIdError>;

/// Library-level runtime errors.
///
/// This enum includes all variants of error types susceptible to occur in the library. Other,
/// more granular error types are automatically converted to `DiskIdError` when needed.
///
/// # Examples
///
/// ```
/// use diskid::prober::Prober;
///
/// fn main() -> diskid::Result<()> {
///     let mut prober = Prober::builder()
///         .scan_device("/dev/null")
///         .build()?; // <- might throw a `ProbeBuilderError`
///
///     let _ = prober.do_safeprobe(); // <- might throw a `ProbeError`
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiskIdError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Misc(#[from] MiscError),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    ProbeBuilder(#[from] ProbeBuilderError),
}
