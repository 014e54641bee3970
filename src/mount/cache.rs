// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared path/tag-resolution cache.
//!
//! Canonicalizing a path or resolving a `LABEL=`/`UUID=` tag to a device node is comparatively
//! expensive (a `stat`, or a `/dev/disk/by-*` symlink read); [`Cache`] memoizes both so that
//! repeated lookups against the same table don't repeat the work.

// From dependency library

// From standard library
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// From this library
use crate::core::device::{Tag, TagName};

/// Directories udev populates with by-tag symlinks to the real device node.
fn udev_dir_for(tag: &TagName) -> Option<&'static str> {
    match tag.as_str() {
        "UUID" => Some("/dev/disk/by-uuid"),
        "LABEL" => Some("/dev/disk/by-label"),
        "PARTUUID" => Some("/dev/disk/by-partuuid"),
        "PARTLABEL" => Some("/dev/disk/by-partlabel"),
        "ID" => Some("/dev/disk/by-id"),
        _ => None,
    }
}

/// A reference-counted path/tag cache shared between tables. The caller wraps it in an
/// [`std::rc::Rc`] to share one instance across tables/lookups; this type performs no internal
/// locking of its own, leaving synchronization to the caller.
#[derive(Debug, Default)]
pub struct Cache {
    canonical: RefCell<HashMap<PathBuf, PathBuf>>,
    tags: RefCell<HashMap<Tag, Option<PathBuf>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalizes `path`, memoizing the result (including lookup failures, which are not
    /// cached since the filesystem may change between calls).
    pub fn canonicalize<P: AsRef<Path>>(&self, path: P) -> Option<PathBuf> {
        let path = path.as_ref();
        if let Some(hit) = self.canonical.borrow().get(path) {
            return Some(hit.clone());
        }
        let canon = fs::canonicalize(path).ok()?;
        self.canonical.borrow_mut().insert(path.to_path_buf(), canon.clone());
        Some(canon)
    }

    /// Resolves a `TAG=VALUE` device spec to a device path via udev's `/dev/disk/by-*`
    /// symlinks. Returns `None` for tag names udev does not publish a directory for, or an
    /// unresolvable value.
    pub fn eval_tag(&self, tag: &Tag) -> Option<PathBuf> {
        if let Some(hit) = self.tags.borrow().get(tag) {
            return hit.clone();
        }

        let resolved = udev_dir_for(tag.name()).and_then(|dir| {
            let link = Path::new(dir).join(tag.value());
            fs::canonicalize(&link).ok()
        });

        self.tags.borrow_mut().insert(tag.clone(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;

    #[test]
    fn cache_canonicalizes_and_memoizes_a_path() {
        let cache = Cache::new();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let first = cache.canonicalize(tmp.path()).unwrap();
        let second = cache.canonicalize(tmp.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cache_returns_none_for_an_unresolvable_tag() {
        let cache = Cache::new();
        let tag = Tag::new("UUID".parse().unwrap(), "00000000-0000-0000-0000-000000000000");
        assert!(cache.eval_tag(&tag).is_none());
    }
}
