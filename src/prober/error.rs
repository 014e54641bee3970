// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

/// [`Prober`](crate::prober::Prober) runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeError {
    /// A buffer-cache request had a zero length or escaped the probing window.
    #[error("buffer request out of range")]
    OutOfRange,

    /// Error while performing Input/Output operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error while converting a value to a new type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Error while parsing a value.
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// `safeprobe` found two or more intolerant matches on one chain.
    #[error("ambivalent: chain {0} produced more than one intolerant match")]
    Ambivalent(String),

    /// Error while configuring a [`Prober`](crate::prober::Prober).
    #[error("{0}")]
    Config(String),

    /// Error while wiping a signature.
    #[error("{0}")]
    Wipe(String),
}

/// [`ProbeBuilder`](crate::prober::ProbeBuilder) runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeBuilderError {
    /// Error while creating a new [`Prober`](crate::prober::Prober) instance.
    #[error(transparent)]
    ProbeBuild(#[from] ProbeError),

    /// Error if two mutually exclusive setter functions are called.
    #[error("{0}")]
    MutuallyExclusive(String),

    /// Error if a mandatory setter function was never called.
    #[error("{0}")]
    Required(String),
}
