// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wiper-area tracking and containment policy.
//!
//! When a chain registers a region it has zeroed (e.g. an LVM physical-volume header), a later
//! chain whose match falls wholly inside that region must lose: `use_wiper` detects the
//! containment and tells the caller to discard the earlier chain's values.

// From this library
use crate::prober::chain::ChainId;

/// A region a chain has declared zeroed, to suppress false positives from signatures that fall
/// inside it.
#[derive(Clone, Copy, Debug)]
pub struct WipeArea {
    pub offset: u64,
    pub size: u64,
    pub producing_chain: ChainId,
}

impl WipeArea {
    pub fn contains(&self, offset: u64, size: u64) -> bool {
        offset >= self.offset && offset + size <= self.offset + self.size
    }
}

/// Checks whether `candidate_offset..+candidate_size` (a later chain's match) falls wholly
/// within `area`. Returns the chain whose values must now be discarded, if so.
pub fn use_wiper(
    area: Option<&WipeArea>,
    candidate_offset: u64,
    candidate_size: u64,
) -> Option<ChainId> {
    area.filter(|area| area.contains(candidate_offset, candidate_size))
        .map(|area| area.producing_chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_wiper_detects_containment() {
        let area = WipeArea {
            offset: 0,
            size: 8192,
            producing_chain: ChainId::Superblocks,
        };
        assert_eq!(
            use_wiper(Some(&area), 446, 2),
            Some(ChainId::Superblocks)
        );
    }

    #[test]
    fn use_wiper_ignores_matches_outside_the_area() {
        let area = WipeArea {
            offset: 0,
            size: 8192,
            producing_chain: ChainId::Superblocks,
        };
        assert_eq!(use_wiper(Some(&area), 8192, 2), None);
    }

    #[test]
    fn use_wiper_with_no_area_never_discards() {
        assert_eq!(use_wiper(None, 0, 2), None);
    }
}
