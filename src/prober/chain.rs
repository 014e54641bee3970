// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chain-driver contract and per-chain state.
//!
//! The core chain set is fixed: a chain's integer ID must equal its position in the chain array,
//! an invariant [`ChainId::index_order`] exists to enforce mechanically.

// From dependency library
use enum_iterator::Sequence;
use num_enum::IntoPrimitive;

// From standard library
use std::fmt;

// From this library
use crate::prober::buffer::BufferCache;
use crate::prober::descriptor::Idinfo;
use crate::prober::error::ProbeError;
use crate::prober::filter::Filter;
use crate::prober::value::ValueList;

/// Identifies one of the three fixed chains. A chain's integer ID is bound to its position in
/// the chain array; `ChainId::index_order()` walks variants in declaration order (via
/// `enum_iterator`), and every piece of code that iterates chains in order does so through it,
/// rather than re-deriving an ordering independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Sequence, IntoPrimitive)]
#[repr(usize)]
pub enum ChainId {
    Superblocks = 0,
    Partitions = 1,
    Topology = 2,
}

impl ChainId {
    /// The chain order `do_probe`'s chain-advance logic relies on. Position in this sequence and
    /// `ChainId`'s primitive value must agree;
    /// [`crate::prober::probe_struct::Prober::default_chains`] asserts this mechanically at
    /// construction.
    pub fn index_order() -> Vec<ChainId> {
        enum_iterator::all::<ChainId>().collect()
    }

    pub fn index(self) -> usize {
        self.into()
    }

    pub fn next(self) -> Option<ChainId> {
        enum_iterator::next(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChainId::Superblocks => "superblocks",
            ChainId::Partitions => "partitions",
            ChainId::Topology => "topology",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single-descriptor probe attempt.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// A descriptor matched; its index in the chain's descriptor array.
    Ok(usize),
    /// No descriptor matched before the end of the chain.
    None,
}

/// Outcome of a whole-chain safeprobe pass.
#[derive(Debug)]
pub enum SafeProbeOutcome {
    /// Exactly one intolerant descriptor matched (or only tolerant descriptors matched alongside
    /// it); its index.
    Ok(usize),
    /// No descriptor matched.
    None,
    /// Two or more intolerant descriptors matched.
    Ambivalent,
}

/// Per-chain state: filter bitmap, current index, enabled flag, mode flags.
#[derive(Clone, Debug)]
pub struct ChainState {
    id: ChainId,
    enabled: bool,
    /// `-1` (`None` here) means "before first".
    idx: Option<usize>,
    filter: Option<Filter>,
    binary_mode: bool,
}

impl ChainState {
    pub fn new(id: ChainId, enabled_by_default: bool) -> Self {
        Self {
            id,
            enabled: enabled_by_default,
            idx: None,
            filter: None,
            binary_mode: false,
        }
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        log::debug!("ChainState::set_enabled chain {} enabled={enabled}", self.id);
        self.enabled = enabled;
    }

    /// `None` is the pre-start sentinel.
    pub fn idx(&self) -> Option<usize> {
        self.idx
    }

    pub fn set_idx(&mut self, idx: Option<usize>) {
        self.idx = idx;
    }

    pub fn reset_idx(&mut self) {
        self.idx = None;
    }

    pub fn binary_mode(&self) -> bool {
        self.binary_mode
    }

    pub fn set_binary_mode(&mut self, binary: bool) {
        self.binary_mode = binary;
    }

    /// Returns the chain's filter, creating an empty one (sized to `nidinfos`) if absent.
    /// Touching the filter via this path always resets `idx` to the pre-start sentinel
    ///.
    pub fn filter_mut(&mut self, nidinfos: usize) -> &mut Filter {
        self.idx = None;
        self.filter
            .get_or_insert_with(|| Filter::new(nidinfos))
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn clear_filter(&mut self) {
        self.idx = None;
        self.filter = None;
    }
}

/// Every chain implements this contract. The core chain set is sealed to the
/// three [`ChainId`] variants; this trait is not meant to be implemented outside this crate.
pub trait ChainDriver {
    fn id(&self) -> ChainId;

    /// The chain's ordered descriptor array.
    fn descriptors(&self) -> &[Idinfo];

    /// Whether this chain is enabled by default when a fresh prober is built.
    fn enabled_by_default(&self) -> bool;

    /// Advances one descriptor forward from `state.idx`, attempting matches; on success records
    /// values on `values` tagged with this chain and returns `ProbeOutcome::Ok(index)`.
    fn probe(
        &self,
        buffers: &mut BufferCache,
        state: &mut ChainState,
        values: &mut ValueList,
    ) -> Result<ProbeOutcome, ProbeError>;

    /// Examines every descriptor in the chain and aggregates the result: a single intolerant
    /// match (alongside any number of tolerant ones) succeeds; two or more intolerant matches
    /// are ambivalent.
    fn safeprobe(
        &self,
        buffers: &mut BufferCache,
        state: &mut ChainState,
        values: &mut ValueList,
    ) -> Result<SafeProbeOutcome, ProbeError>;
}
