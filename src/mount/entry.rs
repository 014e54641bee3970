// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One line of a mount table.

// From dependency library

// From standard library
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// From this library
use crate::core::device::{DeviceNumber, Tag};

/// Pseudo file systems: kernel-internal views with no backing device, never a sensible answer to "what device is
/// this".
const PSEUDO_FS: &[&str] = &[
    "proc",
    "sysfs",
    "cgroup",
    "cgroup2",
    "devtmpfs",
    "devpts",
    "securityfs",
    "debugfs",
    "tracefs",
    "pstore",
    "bpf",
    "autofs",
    "mqueue",
    "hugetlbfs",
    "rpc_pipefs",
    "configfs",
    "binfmt_misc",
    "tmpfs",
];

/// Network file systems.
const NET_FS: &[&str] = &["nfs", "nfs4", "cifs", "smbfs", "smb3", "sshfs", "9p", "afs", "ncpfs"];

/// One entry in a [`MountTable`](crate::mount::MountTable): an fstab/mtab line, a
/// `/proc/self/mountinfo` line, or both at once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountEntry {
    source: Option<String>,
    target: PathBuf,
    fs_type: String,
    vfs_options: String,
    fs_options: String,
    freq: u32,
    passno: u32,
    comment: Option<String>,

    // mountinfo-only fields")
    mount_id: Option<u32>,
    parent_id: Option<u32>,
    devno: Option<DeviceNumber>,
    fs_root: Option<String>,
    optional_fields: Option<String>,
}

impl MountEntry {
    /// Builds a bare fstab/mtab-style entry.
    pub fn new<S, T, F, O>(source: Option<S>, target: T, fs_type: F, options: O) -> Self
    where
        S: Into<String>,
        T: AsRef<Path>,
        F: Into<String>,
        O: Into<String>,
    {
        Self {
            source: source.map(Into::into),
            target: target.as_ref().to_path_buf(),
            fs_type: fs_type.into(),
            vfs_options: options.into(),
            fs_options: String::new(),
            freq: 0,
            passno: 0,
            comment: None,
            mount_id: None,
            parent_id: None,
            devno: None,
            fs_root: None,
            optional_fields: None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref().map(Path::new)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn fs_type(&self) -> &str {
        &self.fs_type
    }

    /// `fstab`/`mtab`'s fourth column, or mountinfo's fs-independent (`VFS`) options field.
    pub fn vfs_options(&self) -> &str {
        &self.vfs_options
    }

    /// mountinfo's per-filesystem ("super") options field; empty for plain fstab/mtab entries.
    pub fn fs_options(&self) -> &str {
        &self.fs_options
    }

    /// Combination of [`Self::vfs_options`] and [`Self::fs_options`], comma-separated.
    pub fn options(&self) -> String {
        match (self.vfs_options.is_empty(), self.fs_options.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.vfs_options.clone(),
            (true, false) => self.fs_options.clone(),
            (false, false) => format!("{},{}", self.vfs_options, self.fs_options),
        }
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    pub fn passno(&self) -> u32 {
        self.passno
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn mount_id(&self) -> Option<u32> {
        self.mount_id
    }

    pub fn parent_id(&self) -> Option<u32> {
        self.parent_id
    }

    pub fn devno(&self) -> Option<DeviceNumber> {
        self.devno
    }

    /// The subtree of the source file system visible at [`Self::target`] (mountinfo field 4);
    /// `/` for ordinary mounts, a non-root path for bind mounts and btrfs subvolumes.
    pub fn fs_root(&self) -> Option<&str> {
        self.fs_root.as_deref()
    }

    pub fn optional_fields(&self) -> Option<&str> {
        self.optional_fields.as_deref()
    }

    pub fn set_freq(&mut self, freq: u32) {
        self.freq = freq;
    }

    pub fn set_passno(&mut self, passno: u32) {
        self.passno = passno;
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn set_fs_options(&mut self, fs_options: impl Into<String>) {
        self.fs_options = fs_options.into();
    }

    pub fn set_fs_root(&mut self, fs_root: impl Into<String>) {
        self.fs_root = Some(fs_root.into());
    }

    pub(crate) fn set_mountinfo_fields(
        &mut self,
        mount_id: u32,
        parent_id: u32,
        devno: DeviceNumber,
        fs_root: impl Into<String>,
        optional_fields: Option<String>,
    ) {
        self.mount_id = Some(mount_id);
        self.parent_id = Some(parent_id);
        self.devno = Some(devno);
        self.fs_root = Some(fs_root.into());
        self.optional_fields = optional_fields;
    }

    /// Parses [`Self::source`] as a `TAG=VALUE` device spec. Returns
    /// `None` for a plain device path, an already-mounted filesystem with no source, or a
    /// malformed tag spec.
    pub fn tag(&self) -> Option<Tag> {
        self.source.as_deref().and_then(|s| Tag::from_str(s).ok())
    }

    /// `true` if a `vfs_options`/`fs_options` token matches `name` exactly (bare flag or
    /// `name=value`).
    pub fn has_option(&self, name: &str) -> bool {
        self.vfs_options.split(',').chain(self.fs_options.split(',')).any(|opt| {
            opt.split('=').next().map(|flag| flag == name).unwrap_or(false)
        })
    }

    /// The value half of a `name=value` option token, such as `subvol` or `subvolid`.
    pub fn option_value(&self, name: &str) -> Option<String> {
        self.vfs_options.split(',').chain(self.fs_options.split(',')).find_map(|opt| {
            let (flag, value) = opt.split_once('=')?;
            (flag == name).then(|| value.to_string())
        })
    }

    /// `true` for a bind mount: `fs_type == "none"` (or "bind") and a `bind` option, the fstab
    /// convention fs-root derivation keys off of.
    pub fn is_bind(&self) -> bool {
        (self.fs_type == "none" || self.fs_type == "bind") && self.has_option("bind")
    }

    pub fn is_swap(&self) -> bool {
        self.fs_type == "swap"
    }

    pub fn is_pseudo_fs(&self) -> bool {
        PSEUDO_FS.contains(&self.fs_type.as_str())
    }

    pub fn is_net_fs(&self) -> bool {
        NET_FS.contains(&self.fs_type.as_str())
    }

    /// `true` if [`Self::target`] matches `path` exactly, byte-for-byte.
    pub fn is_exact_target<P: AsRef<Path>>(&self, path: P) -> bool {
        self.target == path.as_ref()
    }

    /// `true` if [`Self::source_path`] matches `path` exactly.
    pub fn is_exact_source<P: AsRef<Path>>(&self, path: P) -> bool {
        self.source_path() == Some(path.as_ref())
    }
}

impl fmt::Display for MountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.source.as_deref().unwrap_or("none"),
            self.target.display(),
            self.fs_type,
            if self.options().is_empty() { "defaults".to_string() } else { self.options() },
            self.freq,
            self.passno,
        )
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mount_entry_parses_its_source_as_a_tag() {
        let entry = MountEntry::new(Some("LABEL=swap"), "none", "swap", "sw");
        let tag = entry.tag().unwrap();
        assert_eq!(tag.name().as_str(), "LABEL");
        assert_eq!(tag.value(), "swap");
    }

    #[test]
    fn mount_entry_detects_a_bind_mount() {
        let entry = MountEntry::new(Some("/src"), "/dst", "none", "bind");
        assert!(entry.is_bind());
    }

    #[test]
    fn mount_entry_recognizes_pseudo_and_net_file_systems() {
        let proc_entry = MountEntry::new::<&str, _, _, _>(None, "/proc", "proc", "rw");
        assert!(proc_entry.is_pseudo_fs());

        let nfs_entry = MountEntry::new(Some("host:/share"), "/mnt", "nfs", "rw");
        assert!(nfs_entry.is_net_fs());
    }

    #[test]
    fn mount_entry_combines_vfs_and_fs_options() {
        let mut entry = MountEntry::new(Some("/dev/sda1"), "/", "ext4", "rw,relatime");
        entry.set_fs_options("errors=remount-ro");
        assert_eq!(entry.options(), "rw,relatime,errors=remount-ro");
    }
}
