// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-pass lookup algorithms over a [`MountTable`]: target/source/tag/pair/devno search,
//! mountpoint ascent, bind-mount and btrfs fs-root derivation, and "is this fstab entry already
//! mounted".

// From standard library
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

// From this library
use crate::core::device::{DeviceNumber, Tag};
use crate::core::utils::kernel;
use crate::mount::cache::Cache;
use crate::mount::entry::MountEntry;
use crate::mount::table::MountTable;

/// Search direction. For a `mountinfo`-backed table, [`Direction::Backward`] yields the
/// most-recently-mounted entry first, which is the usual correct answer to "where is X mounted
/// now?".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Backward,
}

fn iter_dir<'a>(
    table: &'a MountTable,
    direction: Direction,
) -> Box<dyn Iterator<Item = &'a MountEntry> + 'a> {
    match direction {
        Direction::Forward => Box::new(table.iter()),
        Direction::Backward => Box::new(table.iter_rev()),
    }
}

/// Binds a [`MountTable`] reference to an optional shared [`Cache`] and runs the lookup
/// algorithms against it. Constructed fresh (it's a thin borrow) each time a caller wants to
/// search a table.
pub struct TableLookup<'a> {
    table: &'a MountTable,
    cache: Option<Rc<Cache>>,
}

impl<'a> TableLookup<'a> {
    pub fn new(table: &'a MountTable) -> Self {
        Self { table, cache: None }
    }

    pub fn with_cache(table: &'a MountTable, cache: Rc<Cache>) -> Self {
        Self { table, cache: Some(cache) }
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        self.cache.as_ref().and_then(|c| c.canonicalize(path))
    }

    /// Pass 1: byte-compare native `entry.target` to `path`. Pass 2 (only with a cache):
    /// canonicalize `path`, compare to native entries. Pass 3: canonicalize `entry.target` too,
    /// skipping swaps, pseudo FS, and "/" (which always matches and would short-circuit every
    /// other search).
    pub fn find_target(&self, path: impl AsRef<Path>, direction: Direction) -> Option<&'a MountEntry> {
        let path = path.as_ref();

        for entry in iter_dir(self.table, direction) {
            if entry.is_exact_target(path) {
                return Some(entry);
            }
        }

        let canon_path = self.canonicalize(path);
        if let Some(ref canon_path) = canon_path {
            for entry in iter_dir(self.table, direction) {
                if entry.target() == canon_path.as_path() {
                    return Some(entry);
                }
            }

            for entry in iter_dir(self.table, direction) {
                if entry.is_swap() || entry.is_pseudo_fs() || entry.target() == Path::new("/") {
                    continue;
                }
                if let Some(canon_target) = self.canonicalize(entry.target()) {
                    if &canon_target == canon_path {
                        return Some(entry);
                    }
                }
            }
        }

        None
    }

    /// Four passes: native source equality, canonicalized caller vs native entries, tag
    /// resolution through the device the caller points at (or, failing that, every table tag
    /// resolved through udev), then canonicalized caller vs canonicalized entry source
    /// (skipping network and pseudo file systems).
    pub fn find_srcpath(&self, path: impl AsRef<Path>, direction: Direction) -> Option<&'a MountEntry> {
        let path = path.as_ref();

        for entry in iter_dir(self.table, direction) {
            if entry.is_exact_source(path) {
                return Some(entry);
            }
        }

        let canon_path = self.canonicalize(path);
        if let Some(ref canon_path) = canon_path {
            for entry in iter_dir(self.table, direction) {
                if entry.source_path() == Some(canon_path.as_path()) {
                    return Some(entry);
                }
            }
        }

        if self.table.entries().iter().any(|e| e.tag().is_some()) {
            if let Some(cache) = &self.cache {
                if let Ok(target_devno) = kernel::stat_devno(path) {
                    for entry in iter_dir(self.table, direction) {
                        if let Some(tag) = entry.tag() {
                            if let Some(resolved) = cache.eval_tag(&tag) {
                                if let Ok(devno) = kernel::stat_devno(&resolved) {
                                    if devno == target_devno {
                                        return Some(entry);
                                    }
                                }
                            }
                        }
                    }
                } else {
                    for entry in iter_dir(self.table, direction) {
                        if let Some(tag) = entry.tag() {
                            if let Some(resolved) = cache.eval_tag(&tag) {
                                if resolved.as_path() == path {
                                    return Some(entry);
                                }
                            }
                        }
                    }
                }
            }
        }

        if let Some(ref canon_path) = canon_path {
            for entry in iter_dir(self.table, direction) {
                if entry.is_net_fs() || entry.is_pseudo_fs() {
                    continue;
                }
                if let Some(source) = entry.source_path() {
                    if let Some(canon_source) = self.canonicalize(source) {
                        if &canon_source == canon_path {
                            return Some(entry);
                        }
                    }
                }
            }
        }

        None
    }

    /// First pass compares literal `(tag, value)` pairs; second pass (only with a cache)
    /// resolves the tag to a device name via udev and delegates to [`Self::find_srcpath`].
    pub fn find_tag(&self, tag_name: &str, value: &str, direction: Direction) -> Option<&'a MountEntry> {
        for entry in iter_dir(self.table, direction) {
            if let Some(tag) = entry.tag() {
                if tag.name().as_str() == tag_name && tag.value() == value {
                    return Some(entry);
                }
            }
        }

        if let Some(cache) = &self.cache {
            if let Ok(name) = tag_name.parse() {
                let tag = Tag::new(name, value);
                if let Some(resolved) = cache.eval_tag(&tag) {
                    return self.find_srcpath(resolved, direction);
                }
            }
        }

        None
    }

    /// Dispatches to [`Self::find_tag`] if `spec` parses as `TAG=VALUE`, otherwise to
    /// [`Self::find_srcpath`].
    pub fn find_source(&self, spec: &str, direction: Direction) -> Option<&'a MountEntry> {
        match Tag::from_str(spec) {
            Ok(tag) => self.find_tag(tag.name().as_str(), tag.value(), direction),
            Err(_) => self.find_srcpath(spec, direction),
        }
    }

    /// Peels trailing path components off `path`, retrying [`Self::find_target`] at each
    /// ancestor, falling back to the root `/`.
    pub fn find_mountpoint(&self, path: impl AsRef<Path>, direction: Direction) -> Option<&'a MountEntry> {
        let mut current = path.as_ref().to_path_buf();

        loop {
            if let Some(entry) = self.find_target(&current, direction) {
                return Some(entry);
            }
            if !current.pop() || current.as_os_str().is_empty() {
                break;
            }
        }

        self.find_target("/", direction)
    }

    /// Single pass matching both `source` and `target` against one entry.
    pub fn find_pair(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        direction: Direction,
    ) -> Option<&'a MountEntry> {
        let (source, target) = (source.as_ref(), target.as_ref());
        iter_dir(self.table, direction)
            .find(|entry| entry.source_path() == Some(source) && entry.target() == target)
    }

    /// Single pass by device number.
    pub fn find_devno(&self, devno: DeviceNumber, direction: Direction) -> Option<&'a MountEntry> {
        iter_dir(self.table, direction).find(|entry| entry.devno() == Some(devno))
    }

    /// Derives the fs-root the kernel will report after mounting `entry` (bind mounts and btrfs
    /// subvolumes; `/` otherwise). Needs this table to carry mountinfo-shaped entries (the bind
    /// mount's own already-mounted source, or a sibling subvolume entry).
    pub fn derive_fs_root(&self, entry: &MountEntry) -> Option<String> {
        if entry.is_bind() {
            let source = entry.source_path()?;
            let mount_of_source = self.find_mountpoint(source, Direction::Backward)?;
            let relative = source.strip_prefix(mount_of_source.target()).ok()?;

            let mut root = if relative.as_os_str().is_empty() {
                "/".to_string()
            } else {
                format!("/{}", relative.display())
            };

            if let Some(parent_root) = mount_of_source.fs_root() {
                if parent_root != "/" {
                    root = format!("{parent_root}{root}");
                }
            }

            return Some(root);
        }

        if entry.fs_type() == "btrfs" {
            if let Some(subvolid) = entry.option_value("subvolid") {
                for candidate in self.table.iter() {
                    if candidate.target() == entry.target() {
                        if candidate.option_value("subvolid").as_deref() == Some(subvolid.as_str()) {
                            if let Some(subvol) = candidate.option_value("subvol") {
                                return Some(subvol);
                            }
                        }
                    }
                }
                return None;
            }
        }

        Some("/".to_string())
    }

    /// Is `entry` (an fstab-style entry) already mounted, per this mountinfo-style table?
    ///
    /// Skips swaps and pseudo file systems. Derives the expected source device and fs-root, then
    /// looks for a table entry matching on source path (literal, canonicalized, device number, or
    /// loop-device backing file) AND matching fs-root (when the caller's entry declares one) AND
    /// matching target.
    ///
    /// A bind mount's fstab source is a directory, not a device; the device behind it is found by
    /// walking up this table rather than `stat`-ing the live filesystem, which may not even be the
    /// one the table text describes.
    pub fn is_fs_mounted(&self, entry: &MountEntry) -> bool {
        if entry.is_swap() || entry.is_pseudo_fs() {
            return false;
        }

        let expected_root = self.derive_fs_root(entry);

        let entry_source = match entry.source_path() {
            Some(p) => p,
            None => return false,
        };

        let expected_source = if entry.is_bind() {
            match self
                .find_mountpoint(entry_source, Direction::Backward)
                .and_then(|mount_of_source| mount_of_source.source_path())
            {
                Some(p) => p,
                None => return false,
            }
        } else {
            entry_source
        };

        let canon_source = self.canonicalize(expected_source);
        let expected_devno = kernel::stat_devno(expected_source).ok();

        for candidate in self.table.iter() {
            let source_matches = candidate.source_path() == Some(expected_source)
                || (canon_source.is_some()
                    && candidate.source_path().and_then(|p| self.canonicalize(p))
                        == canon_source)
                || (expected_devno.is_some() && candidate.devno() == expected_devno)
                || candidate
                    .source_path()
                    .and_then(|p| kernel::loop_backing_file(p))
                    .map(|backing| backing.as_path() == expected_source)
                    .unwrap_or(false);

            if !source_matches {
                continue;
            }

            if let Some(ref expected_root) = expected_root {
                if candidate.fs_root() != Some(expected_root.as_str()) {
                    continue;
                }
            }

            let target_matches = candidate.is_exact_target(entry.target())
                || self
                    .canonicalize(entry.target())
                    .map(|p| candidate.target() == p.as_path())
                    .unwrap_or(false);

            if target_matches {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mountinfo_entry(
        id: u32,
        parent: u32,
        devno: (u32, u32),
        fs_root: &str,
        target: &str,
        fs_type: &str,
        source: &str,
    ) -> MountEntry {
        let mut entry = MountEntry::new(Some(source), target, fs_type, "rw");
        entry.set_mountinfo_fields(id, parent, DeviceNumber::new(devno.0, devno.1), fs_root, None);
        entry
    }

    #[test]
    fn find_target_matches_a_native_path_exactly() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(23, 17, (0, 21), "/", "/home", "ext4", "/dev/sda2"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_target("/home", Direction::Backward).unwrap();
        assert_eq!(found.mount_id(), Some(23));
    }

    #[test]
    fn find_mountpoint_ascends_to_the_nearest_ancestor() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(1, 0, (8, 1), "/", "/", "ext4", "/dev/sda1"));
        table.add(mountinfo_entry(23, 1, (0, 21), "/", "/home", "ext4", "/dev/sda2"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_mountpoint("/home/alice/project", Direction::Backward).unwrap();
        assert_eq!(found.mount_id(), Some(23));
    }

    #[test]
    fn find_mountpoint_falls_back_to_root() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(1, 0, (8, 1), "/", "/", "ext4", "/dev/sda1"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_mountpoint("/no/such/deep/path", Direction::Backward).unwrap();
        assert_eq!(found.mount_id(), Some(1));
    }

    #[test]
    fn find_devno_matches_by_major_minor() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(23, 17, (0, 21), "/", "/home", "ext4", "/dev/sda2"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_devno(DeviceNumber::new(0, 21), Direction::Forward).unwrap();
        assert_eq!(found.target().to_str(), Some("/home"));
    }

    #[test]
    fn find_tag_matches_a_literal_pair() {
        let mut table = MountTable::new();
        table.add(MountEntry::new(Some("LABEL=swap"), "none", "swap", "sw"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_tag("LABEL", "swap", Direction::Forward).unwrap();
        assert_eq!(found.fs_type(), "swap");
    }

    #[test]
    fn find_source_dispatches_tag_specs_to_find_tag() {
        let mut table = MountTable::new();
        table.add(MountEntry::new(Some("UUID=abc-123"), "/data", "ext4", "rw"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_source("UUID=abc-123", Direction::Forward).unwrap();
        assert_eq!(found.target().to_str(), Some("/data"));
    }

    #[test]
    fn find_source_dispatches_plain_paths_to_find_srcpath() {
        let mut table = MountTable::new();
        table.add(MountEntry::new(Some("/dev/sda1"), "/", "ext4", "rw"));

        let lookup = TableLookup::new(&table);
        let found = lookup.find_source("/dev/sda1", Direction::Forward).unwrap();
        assert_eq!(found.target().to_str(), Some("/"));
    }

    #[test]
    fn derive_fs_root_is_root_for_an_ordinary_mount() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(1, 0, (8, 1), "/", "/", "ext4", "/dev/sda1"));

        let lookup = TableLookup::new(&table);
        let entry = MountEntry::new(Some("/dev/sda1"), "/", "ext4", "rw");
        assert_eq!(lookup.derive_fs_root(&entry), Some("/".to_string()));
    }

    #[test]
    fn derive_fs_root_strips_the_mountpoint_prefix_for_a_bind_mount() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(1, 0, (8, 1), "/", "/srcparent", "ext4", "/dev/sda1"));

        let lookup = TableLookup::new(&table);
        let bind_entry = MountEntry::new(Some("/srcparent/sub"), "/dst", "none", "bind");
        assert_eq!(lookup.derive_fs_root(&bind_entry), Some("/sub".to_string()));
    }

    #[test]
    fn is_fs_mounted_matches_a_bind_mount_by_fs_root() {
        let mut table = MountTable::new();
        table.add(mountinfo_entry(1, 0, (8, 1), "/", "/srcparent", "ext4", "/dev/sda1"));
        table.add(mountinfo_entry(2, 1, (8, 1), "/src", "/dst", "ext4", "/dev/sda1"));

        let lookup = TableLookup::new(&table);
        let fstab_entry = MountEntry::new(Some("/srcparent/src"), "/dst", "none", "bind");
        assert!(lookup.is_fs_mounted(&fstab_entry));
    }

    #[test]
    fn is_fs_mounted_skips_swap_entries() {
        let table = MountTable::new();
        let lookup = TableLookup::new(&table);
        let swap_entry = MountEntry::new(Some("/dev/sda5"), "none", "swap", "sw");
        assert!(!lookup.is_fs_mounted(&swap_entry));
    }
}
