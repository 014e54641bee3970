// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generic [`ChainDriver`] implementation shared by the superblocks, partitions, and topology
//! chains.
//!
//! The chain interface pattern is a driver vtable over a sealed, fixed chain set, not a
//! user-extensible one: the matching algorithm (advance through descriptors, try magics, call
//! the descriptor's own probe callback) is identical for every chain, so it lives here once and
//! `catalogue` only ever supplies data.

// From this library
use crate::prober::buffer::BufferCache;
use crate::prober::chain::{ChainDriver, ChainId, ChainState, ProbeOutcome, SafeProbeOutcome};
use crate::prober::descriptor::{match_magics, Idinfo, MagicMatch, MagicResult};
use crate::prober::error::ProbeError;
use crate::prober::value::ValueList;

/// One fixed chain (superblocks, partitions, or topology), generalized over its descriptor
/// table. The catalogue module only ever produces `&'static [Idinfo]`; this type owns the
/// iteration and magic-matching behavior common to every chain.
pub struct DescriptorChain {
    id: ChainId,
    descriptors: Vec<Idinfo>,
    enabled_by_default: bool,
}

impl DescriptorChain {
    pub fn new(id: ChainId, descriptors: Vec<Idinfo>, enabled_by_default: bool) -> Self {
        Self {
            id,
            descriptors,
            enabled_by_default,
        }
    }

    /// Recovers the 1024-byte slot a magic matched against, from its `effective_off` alone: a
    /// magic's slot is always 1024-byte aligned, so masking off the low 10
    /// bits of the effective offset recovers `slot_off` regardless of which magic fired.
    fn fetch_slot<'b>(
        &self,
        buffers: &'b mut BufferCache,
        matched: MagicMatch,
    ) -> Result<(&'b [u8], u64), ProbeError> {
        let slot_off = matched.effective_off - (matched.effective_off % 1024);
        let slot = buffers.get(slot_off, 1024)?;
        Ok((slot, slot_off))
    }

    fn invoke(
        &self,
        descriptor: &Idinfo,
        matched: Option<MagicMatch>,
        buffers: &mut BufferCache,
        values: &mut ValueList,
    ) -> Result<(), ProbeError> {
        let Some(probe_fn) = descriptor.probe_fn else {
            return Ok(());
        };

        match matched {
            Some(m) => {
                let (slot, slot_off) = self.fetch_slot(buffers, m)?;
                probe_fn(slot, slot_off, Some(m), buffers, values, self.id)
            }
            None => probe_fn(&[], 0, None, buffers, values, self.id),
        }
    }

    /// Attempts descriptor `idx` against the device, honoring its minimum-size requirement
    /// before touching the magic matcher.
    fn try_descriptor(
        &self,
        idx: usize,
        buffers: &mut BufferCache,
        values: &mut ValueList,
    ) -> Result<bool, ProbeError> {
        let descriptor = &self.descriptors[idx];

        if let Some(min_size) = descriptor.min_size {
            if buffers.window_size() < min_size {
                return Ok(false);
            }
        }

        match match_magics(descriptor, 0, buffers)? {
            MagicResult::NoMagicMatch => Ok(false),
            MagicResult::Matched(m) => {
                self.invoke(descriptor, Some(m), buffers, values)?;
                Ok(true)
            }
            MagicResult::NoMagics => {
                self.invoke(descriptor, None, buffers, values)?;
                Ok(true)
            }
        }
    }
}

impl ChainDriver for DescriptorChain {
    fn id(&self) -> ChainId {
        self.id
    }

    fn descriptors(&self) -> &[Idinfo] {
        &self.descriptors
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    /// Advances one descriptor forward from `state.idx`.
    fn probe(
        &self,
        buffers: &mut BufferCache,
        state: &mut ChainState,
        values: &mut ValueList,
    ) -> Result<ProbeOutcome, ProbeError> {
        let start = state.idx().map_or(0, |idx| idx + 1);

        for idx in start..self.descriptors.len() {
            if state.filter().is_some_and(|f| f.is_skipped(idx)) {
                continue;
            }

            if self.try_descriptor(idx, buffers, values)? {
                log::debug!(
                    "DescriptorChain::probe chain {} matched descriptor {:?} at index {idx}",
                    self.id,
                    self.descriptors[idx].name
                );
                state.set_idx(Some(idx));
                return Ok(ProbeOutcome::Ok(idx));
            }
        }

        Ok(ProbeOutcome::None)
    }

    /// Examines every descriptor and aggregates the result. Exactly
    /// one intolerant match (alongside any number of tolerant ones) succeeds; two or more
    /// intolerant matches are ambivalent.
    fn safeprobe(
        &self,
        buffers: &mut BufferCache,
        state: &mut ChainState,
        values: &mut ValueList,
    ) -> Result<SafeProbeOutcome, ProbeError> {
        let mut matches: Vec<(usize, bool)> = Vec::new();

        for (idx, descriptor) in self.descriptors.iter().enumerate() {
            if state.filter().is_some_and(|f| f.is_skipped(idx)) {
                continue;
            }
            if let Some(min_size) = descriptor.min_size {
                if buffers.window_size() < min_size {
                    continue;
                }
            }
            match match_magics(descriptor, 0, buffers)? {
                MagicResult::Matched(_) | MagicResult::NoMagics => {
                    matches.push((idx, descriptor.tolerant));
                }
                MagicResult::NoMagicMatch => {}
            }
        }

        let intolerant = matches.iter().filter(|(_, tolerant)| !tolerant).count();
        if intolerant >= 2 {
            log::debug!(
                "DescriptorChain::safeprobe chain {} found {intolerant} intolerant matches: ambivalent",
                self.id
            );
            return Ok(SafeProbeOutcome::Ambivalent);
        }

        let winner = matches
            .iter()
            .find(|(_, tolerant)| !tolerant)
            .or_else(|| matches.first());

        match winner {
            Some(&(idx, _)) => {
                self.try_descriptor(idx, buffers, values)?;
                state.set_idx(Some(idx));
                Ok(SafeProbeOutcome::Ok(idx))
            }
            None => Ok(SafeProbeOutcome::None),
        }
    }
}
