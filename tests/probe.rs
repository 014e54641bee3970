// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios exercising a [`Prober`] against small in-memory disk images.

use std::io::Write;
use std::sync::Once;

use diskid::prober::{FilterCriterion, ProbeResult, Prober};

static INIT: Once = Once::new();

/// Installs `env_logger` once per test binary, so a single test run with `RUST_LOG=debug` (and
/// optionally `DISKID_DEBUG`) surfaces this crate's `log::debug!` output.
fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::try_init();
        diskid::debug::init_default_debug();
    });
}

fn file_with(bytes: &[u8]) -> std::fs::File {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    tmp.flush().unwrap();
    tmp.reopen().unwrap()
}

/// Like [`file_with`], but guarantees a read/write handle regardless of how `reopen` behaves,
/// for the wipe test below.
fn rw_file_with(bytes: &[u8]) -> std::fs::File {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    tmp.flush().unwrap();
    std::fs::File::options().read(true).write(true).open(tmp.path()).unwrap()
}

#[test]
fn finds_an_ext4_superblock_through_the_builder() {
    init_logging();
    let mut image = vec![0u8; 4096];
    image[1080] = 0x53;
    image[1081] = 0xef;
    let uuid = [0x11u8; 16];
    image[1024 + 104..1024 + 120].copy_from_slice(&uuid);
    image[1024 + 120..1024 + 125].copy_from_slice(b"boot\0");

    let mut prober = Prober::builder()
        .scan_file(file_with(&image))
        .build()
        .unwrap();

    assert_eq!(prober.do_probe().unwrap(), ProbeResult::Ok);
    assert_eq!(prober.values().get("TYPE").unwrap().data().as_str(), Some("ext4"));
    assert_eq!(prober.values().get("LABEL").unwrap().data().as_str(), Some("boot"));
}

#[test]
fn a_dos_partition_table_wipes_an_lvm2_label_it_shares_a_header_with() {
    init_logging();
    // An LVM2 physical-volume label at sector 1 and a DOS/MBR boot signature two bytes before
    // it, both inside the 8 KiB region LVM2 zeroes ahead of its own header: the partition table
    // match, found second, must discard the superblock match the wiper area now covers.
    let mut image = vec![0u8; 8192];
    image[510] = 0x55;
    image[511] = 0xaa;
    image[512..520].copy_from_slice(b"LABELONE");

    let mut prober = Prober::builder()
        .scan_file(file_with(&image))
        .scan_superblocks_for_file_systems(FilterCriterion::OnlyIn, vec!["LVM2_member"])
        .scan_device_partitions(true)
        .build()
        .unwrap();

    assert_eq!(prober.do_probe().unwrap(), ProbeResult::Ok);
    assert_eq!(
        prober.values().get("TYPE").unwrap().data().as_str(),
        Some("LVM2_member")
    );

    assert_eq!(prober.do_probe().unwrap(), ProbeResult::Ok);
    assert_eq!(prober.values().get("PTTYPE").unwrap().data().as_str(), Some("dos"));
    assert!(
        prober.values().get("TYPE").is_none(),
        "the LVM2_member match should have been discarded by wiper containment"
    );
}

#[test]
fn ext4_and_xfs_magics_on_the_same_device_are_reported_as_ambivalent() {
    init_logging();
    let mut image = vec![0u8; 4096];
    image[0..4].copy_from_slice(b"XFSB");
    image[1080] = 0x53;
    image[1081] = 0xef;

    let mut prober = Prober::builder().scan_file(file_with(&image)).build().unwrap();

    assert_eq!(prober.do_safeprobe().unwrap(), ProbeResult::Ambivalent);
    assert!(prober.values().is_empty());
}

#[test]
fn a_real_wipe_steps_back_and_exposes_a_backup_signature() {
    init_logging();
    // ext4 at its primary offset, with a stale swap signature further into the device standing
    // in for the backup superblock a wipe of the primary one would uncover.
    let mut image = vec![0u8; 4096];
    image[1080] = 0x53;
    image[1081] = 0xef;
    image[3 * 1024 + 1014..3 * 1024 + 1024].copy_from_slice(b"SWAPSPACE2");

    let mut prober = Prober::builder()
        .scan_file(rw_file_with(&image))
        .allow_writes()
        .build()
        .unwrap();

    assert_eq!(prober.do_probe().unwrap(), ProbeResult::Ok);
    assert_eq!(prober.values().get("TYPE").unwrap().data().as_str(), Some("ext4"));

    let (dry_offset, dry_len) = prober.do_wipe(true).unwrap();
    assert_eq!((dry_offset, dry_len), (1080, 2));
    assert_eq!(
        prober.values().get("TYPE").unwrap().data().as_str(),
        Some("ext4"),
        "a dry run must not disturb the device or the current match"
    );

    let (offset, len) = prober.do_wipe(false).unwrap();
    assert_eq!((offset, len), (1080, 2));

    assert_eq!(prober.do_probe().unwrap(), ProbeResult::Ok);
    assert_eq!(prober.values().get("TYPE").unwrap().data().as_str(), Some("swap"));
}

#[test]
fn a_device_with_no_recognizable_signature_probes_clean() {
    init_logging();
    let prober_result = Prober::builder().scan_file(file_with(&[0u8; 4096])).build();
    let mut prober = prober_result.unwrap();

    assert_eq!(prober.do_safeprobe().unwrap(), ProbeResult::Done);
    assert!(prober.values().is_empty());
}
