// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Low-level, from-scratch block-device signature prober.
//!
//! A [`Prober`] binds a device (or device segment) to a fixed set of three chains —
//! `superblocks`, `partitions`, `topology` — each a sequence of signature descriptors tried in
//! order. [`Prober::do_probe`] advances one descriptor at a time; [`Prober::do_safeprobe`] and
//! [`Prober::do_fullprobe`] examine a chain in full in one call.
//!
//! ```
//! use diskid::prober::Prober;
//!
//! fn main() -> diskid::Result<()> {
//!     let mut prober = Prober::builder().scan_device("/dev/null").build()?;
//!     let _ = prober.do_safeprobe();
//!     Ok(())
//! }
//! ```

mod buffer;
mod builder;
mod chain;
mod descriptor;
mod error;
mod filter;
mod generic_chain;
mod probe_struct;
mod value;
mod wipe;

pub use builder::ProberBuilder as ProbeBuilder;
pub use chain::{ChainDriver, ChainId, ChainState, ProbeOutcome, SafeProbeOutcome};
pub use descriptor::{Idinfo, Magic, MagicMatch, MagicResult, ProbeFn};
pub use error::{ProbeBuilderError, ProbeError};
pub use filter::{Filter, FilterCriterion};
pub use probe_struct::{ProberFlags, Prober, ProbeResult};
pub use value::{Value, ValueData, ValueList};
pub use wipe::{use_wiper, WipeArea};

pub(crate) use buffer::BufferCache;
