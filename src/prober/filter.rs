// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-chain descriptor filter bitmap.

/// Which side of `filter_types`' name set is kept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterCriterion {
    /// Keep only descriptors whose name is in the set.
    OnlyIn,
    /// Keep every descriptor whose name is **not** in the set.
    NotIn,
}

/// A bitmap with one bit per descriptor in a chain; a set bit means "skipped".
#[derive(Clone, Debug)]
pub struct Filter {
    skip: Vec<bool>,
}

impl Filter {
    pub fn new(nidinfos: usize) -> Self {
        Self {
            skip: vec![false; nidinfos],
        }
    }

    pub fn is_skipped(&self, idx: usize) -> bool {
        self.skip.get(idx).copied().unwrap_or(false)
    }

    /// Marks descriptors whose name is/is-not in `names`, per `criterion`.
    pub fn filter_types<'a>(
        &mut self,
        criterion: FilterCriterion,
        names: impl IntoIterator<Item = &'a str>,
        descriptor_names: &[&str],
    ) {
        let names: Vec<&str> = names.into_iter().collect();
        for (idx, skip) in self.skip.iter_mut().enumerate() {
            let name = descriptor_names.get(idx).copied().unwrap_or("");
            let in_set = names.contains(&name);
            *skip = match criterion {
                FilterCriterion::OnlyIn => !in_set,
                FilterCriterion::NotIn => in_set,
            };
        }
    }

    /// Complements every bit.
    pub fn invert(&mut self) {
        for skip in self.skip.iter_mut() {
            *skip = !*skip;
        }
    }

    /// Zeroes every bit.
    pub fn reset(&mut self) {
        for skip in self.skip.iter_mut() {
            *skip = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 3] = ["ext4", "xfs", "vfat"];

    #[test]
    fn filter_types_only_in_keeps_named_descriptors() {
        let mut filter = Filter::new(3);
        filter.filter_types(FilterCriterion::OnlyIn, ["xfs"], &NAMES);
        assert!(filter.is_skipped(0));
        assert!(!filter.is_skipped(1));
        assert!(filter.is_skipped(2));
    }

    #[test]
    fn filter_types_not_in_skips_named_descriptors() {
        let mut filter = Filter::new(3);
        filter.filter_types(FilterCriterion::NotIn, ["xfs"], &NAMES);
        assert!(!filter.is_skipped(0));
        assert!(filter.is_skipped(1));
        assert!(!filter.is_skipped(2));
    }

    #[test]
    fn filter_invert_complements_every_bit() {
        let mut filter = Filter::new(2);
        filter.filter_types(FilterCriterion::OnlyIn, ["xfs"], &NAMES);
        filter.invert();
        assert!(!filter.is_skipped(0));
        assert!(filter.is_skipped(1));
    }

    #[test]
    fn filter_reset_clears_every_bit() {
        let mut filter = Filter::new(2);
        filter.filter_types(FilterCriterion::OnlyIn, ["xfs"], &NAMES);
        filter.reset();
        assert!(!filter.is_skipped(0));
        assert!(!filter.is_skipped(1));
    }
}
