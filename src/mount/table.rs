// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered list of [`MountEntry`] values.

// From dependency library

// From standard library
use std::slice;

// From this library
use crate::mount::entry::MountEntry;

/// An ordered, insertion-order-preserving list of mount entries.
///
/// `MountTable` is a single unified type: one entry type, one list type, shared by the
/// fstab/mtab dialect and the mountinfo dialect (see DESIGN.md for the reasoning behind this
/// choice).
#[derive(Clone, Debug, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
    comment_intro: Option<String>,
    comment_tail: Option<String>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry` to the table` ... appends to the table's
    /// ordered list, and increments `nents`").
    pub fn add(&mut self, entry: MountEntry) {
        log::debug!("MountTable::add appending entry for target {:?}", entry.target());
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forward (insertion-order) iterator ...").
    pub fn iter(&self) -> slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    /// Reverse (most-recently-added-first) iterator").
    pub fn iter_rev(&self) -> std::iter::Rev<slice::Iter<'_, MountEntry>> {
        self.entries.iter().rev()
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn comment_intro(&self) -> Option<&str> {
        self.comment_intro.as_deref()
    }

    pub fn comment_tail(&self) -> Option<&str> {
        self.comment_tail.as_deref()
    }

    pub fn set_comment_intro(&mut self, comment: impl Into<String>) {
        self.comment_intro = Some(comment.into());
    }

    pub fn set_comment_tail(&mut self, comment: impl Into<String>) {
        self.comment_tail = Some(comment.into());
    }
}

impl<'a> IntoIterator for &'a MountTable {
    type Item = &'a MountEntry;
    type IntoIter = slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<MountEntry> for MountTable {
    fn from_iter<I: IntoIterator<Item = MountEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            comment_intro: None,
            comment_tail: None,
        }
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mount_table_preserves_insertion_order_both_ways() {
        let mut table = MountTable::new();
        table.add(MountEntry::new(Some("/dev/sda1"), "/", "ext4", "rw"));
        table.add(MountEntry::new(Some("/dev/sda2"), "/home", "ext4", "rw"));

        let forward: Vec<_> = table.iter().map(|e| e.target().to_path_buf()).collect();
        assert_eq!(forward, vec!["/".into(), "/home".into()]);

        let backward: Vec<_> = table.iter_rev().map(|e| e.target().to_path_buf()).collect();
        assert_eq!(backward, vec!["/home".into(), "/".into()]);
    }

    #[test]
    fn mount_table_len_tracks_entry_count() {
        let mut table = MountTable::new();
        assert!(table.is_empty());
        table.add(MountEntry::new(Some("/dev/sda1"), "/", "ext4", "rw"));
        assert_eq!(table.len(), 1);
    }
}
