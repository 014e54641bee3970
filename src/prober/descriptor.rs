// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signature descriptor ("idinfo") and the magic matcher.
//!
//! The catalogue module seeds the built-in descriptor tables; this module owns the generic
//! matching arithmetic every chain shares.

// From standard library

// From this library
use crate::core::device::Usage;
use crate::prober::buffer::BufferCache;
use crate::prober::chain::ChainId;
use crate::prober::error::ProbeError;
use crate::prober::value::ValueList;

/// One `{bytes, length, kibibyte-offset, sector-relative-offset}` magic pattern.
#[derive(Clone, Copy, Debug)]
pub struct Magic {
    pub bytes: &'static [u8],
    pub kboff: u64,
    pub sboff: u64,
}

impl Magic {
    /// `slot_off`: the 1024-byte-aligned device offset the matcher reads to look for this magic
    ///.
    pub fn slot_off(&self) -> u64 {
        (self.kboff + (self.sboff >> 10)) << 10
    }

    /// The offset of this magic's bytes within its 1024-byte slot.
    pub fn offset_in_slot(&self) -> u64 {
        self.sboff & 0x3FF
    }

    /// The effective device offset of this magic's first byte.
    pub fn effective_offset(&self) -> u64 {
        self.slot_off() + self.offset_in_slot()
    }
}

/// A successful magic match: which pattern matched and at what device offset.
#[derive(Clone, Copy, Debug)]
pub struct MagicMatch {
    pub effective_off: u64,
    pub len: usize,
}

/// Callback a descriptor uses to harvest values once its magic (or, for magic-less descriptors,
/// its own logic) has matched. Receives the 1024-byte slot buffer the magic was matched against,
/// the slot's device offset, the magic match (if any), a read-through [`BufferCache`] for
/// descriptors that need bytes outside the matched slot, the result list, and the owning chain.
pub type ProbeFn = fn(
    slot: &[u8],
    slot_off: u64,
    matched: Option<MagicMatch>,
    buffers: &mut BufferCache,
    values: &mut ValueList,
    chain: ChainId,
) -> Result<(), ProbeError>;

/// One recognizer within a chain.
#[derive(Clone, Copy)]
pub struct Idinfo {
    pub name: &'static str,
    pub usage: Usage,
    pub magics: &'static [Magic],
    /// Declares that this signature can legitimately coexist with another on the same device
    ///.
    pub tolerant: bool,
    pub min_size: Option<u64>,
    pub probe_fn: Option<ProbeFn>,
}

impl std::fmt::Debug for Idinfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Idinfo")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("tolerant", &self.tolerant)
            .finish()
    }
}

/// Result of attempting to match one descriptor's magics against the device:
/// `Matched` if any magic matched, `NoMagicMatch` if the descriptor declares magics but none
/// match, `NoMagics` if the descriptor has no magics at all (the probe callback alone decides).
#[derive(Debug)]
pub enum MagicResult {
    Matched(MagicMatch),
    NoMagicMatch,
    NoMagics,
}

/// Attempts every magic pattern of `descriptor` in order against `buffers`, returning on the
/// first match.
pub fn match_magics(
    descriptor: &Idinfo,
    device_offset_base: u64,
    buffers: &mut BufferCache,
) -> Result<MagicResult, ProbeError> {
    if descriptor.magics.is_empty() {
        return Ok(MagicResult::NoMagics);
    }

    for magic in descriptor.magics {
        let slot_off = device_offset_base + magic.slot_off();
        let slot = match buffers.get(slot_off, 1024) {
            Ok(slot) => slot,
            Err(ProbeError::OutOfRange) => continue,
            Err(e) => return Err(e),
        };

        let start = magic.offset_in_slot() as usize;
        let end = start + magic.bytes.len();
        if end > slot.len() {
            continue;
        }

        if &slot[start..end] == magic.bytes {
            log::debug!(
                "descriptor::match_magics descriptor {:?} matched at offset {}",
                descriptor.name,
                device_offset_base + magic.effective_offset()
            );
            return Ok(MagicResult::Matched(MagicMatch {
                effective_off: device_offset_base + magic.effective_offset(),
                len: magic.bytes.len(),
            }));
        }
    }

    Ok(MagicResult::NoMagicMatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_computes_ext4_offsets() {
        // ext4 superblock magic `\x53\xef` at byte offset 56 of the 1024-byte superblock that
        // itself starts at device offset 1024 (kboff=1, sboff=56).
        let magic = Magic {
            bytes: b"\x53\xef",
            kboff: 1,
            sboff: 56,
        };
        assert_eq!(magic.slot_off(), 1024);
        assert_eq!(magic.effective_offset(), 1080);
    }

    #[test]
    fn magic_wraps_sboff_past_1024() {
        let magic = Magic {
            bytes: b"X",
            kboff: 0,
            sboff: 1025,
        };
        assert_eq!(magic.slot_off(), 1024);
        assert_eq!(magic.offset_in_slot(), 1);
        assert_eq!(magic.effective_offset(), 1025);
    }
}
