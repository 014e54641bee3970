// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::core::errors::ParserError;

/// [`MountTable`](crate::mount::MountTable) / [`TableLookup`](crate::mount::TableLookup) runtime
/// errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MountError {
    /// Error while performing Input/Output operations (reading a table file, resolving a path).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error while parsing a line of a mount-table file.
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// Error while configuring a lookup or table operation.
    #[error("{0}")]
    Config(String),
}
