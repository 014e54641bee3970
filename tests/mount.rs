// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios over parsed `mountinfo`/`fstab` text.

use std::sync::Once;

use diskid::mount::{parse_str, Dialect, Direction, MountTable, TableLookup};

static INIT: Once = Once::new();

/// Installs `env_logger` once per test binary, so a single test run with `RUST_LOG=debug` (and
/// optionally `DISKID_DEBUG`) surfaces this crate's `log::debug!` output.
fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::try_init();
        diskid::debug::init_default_debug();
    });
}

#[test]
fn locates_a_mountpoint_from_a_parsed_mountinfo_table() {
    init_logging();
    let mountinfo = "\
15 20 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw,errors=remount-ro
23 15 0:21 / /home rw,relatime shared:2 - ext4 /dev/sda2 rw
36 15 0:22 / /proc rw,nosuid - proc proc rw
";

    let mut table = MountTable::new();
    parse_str(mountinfo, Dialect::MountInfo, &mut table, None).unwrap();
    assert_eq!(table.len(), 3);

    let lookup = TableLookup::new(&table);

    let root = lookup.find_target("/", Direction::Backward).unwrap();
    assert_eq!(root.source(), Some("/dev/sda1"));

    let home = lookup.find_devno(diskid::core::device::DeviceNumber::new(0, 21), Direction::Backward).unwrap();
    assert_eq!(home.target().to_str(), Some("/home"));

    let descendant = lookup.find_mountpoint("/home/alice/src", Direction::Backward).unwrap();
    assert_eq!(descendant.target().to_str(), Some("/home"));

    let proc_entry = lookup.find_target("/proc", Direction::Backward).unwrap();
    assert!(proc_entry.is_pseudo_fs());
}

#[test]
fn recognizes_a_bind_mounted_fstab_entry_as_already_mounted() {
    init_logging();
    let mountinfo = "\
15 20 8:1 / / rw,relatime - ext4 /dev/sda1 rw
40 15 8:1 /srv/www /var/www rw,relatime - ext4 /dev/sda1 rw
";
    let mut live = MountTable::new();
    parse_str(mountinfo, Dialect::MountInfo, &mut live, None).unwrap();

    let fstab = "/srv/www /var/www none bind,rw 0 0\n";
    let mut intended = MountTable::new();
    parse_str(fstab, Dialect::FsTab, &mut intended, None).unwrap();
    assert_eq!(intended.len(), 1);

    let lookup = TableLookup::new(&live);
    assert!(lookup.is_fs_mounted(&intended.entries()[0]));
}

#[test]
fn an_unmounted_fstab_entry_is_reported_as_not_mounted() {
    init_logging();
    let live = MountTable::new();
    let lookup = TableLookup::new(&live);

    let mut intended = MountTable::new();
    parse_str("/dev/sda3 /mnt/data ext4 defaults 0 2\n", Dialect::FsTab, &mut intended, None).unwrap();

    assert!(!lookup.is_fs_mounted(&intended.entries()[0]));
}

#[test]
fn fstab_parsing_tolerates_and_reports_a_malformed_line() {
    init_logging();
    let mut table = MountTable::new();
    let result = parse_str(
        "UUID=deadbeef /data ext4 defaults 0 2\ngarbage\n/dev/sda1 / ext4 rw 0 1\n",
        Dialect::FsTab,
        &mut table,
        None,
    );

    assert!(result.is_ok());
    assert_eq!(table.len(), 2);

    let lookup = TableLookup::new(&table);
    let by_tag = lookup.find_source("UUID=deadbeef", Direction::Forward).unwrap();
    assert_eq!(by_tag.target().to_str(), Some("/data"));
}
