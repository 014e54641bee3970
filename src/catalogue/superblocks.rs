// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Superblocks chain catalogue: a representative built-in set of filesystem and volume-manager
//! signature descriptors.
//!
//! This is a pure data catalogue: the engine's matching logic is generic over any descriptor
//! table. This file supplies enough real descriptors (ext4, xfs, vfat, swap, LVM2 physical
//! volume) to exercise every rule the engine implements; it carries none of the matching logic
//! itself.

// From this library
use crate::core::device::Usage;
use crate::prober::chain::ChainId;
use crate::prober::descriptor::{Idinfo, Magic};
use crate::prober::value::{Value, ValueData};

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

fn ext4() -> Idinfo {
    Idinfo {
        name: "ext4",
        usage: Usage::FileSystem,
        // kboff=1 (1 KiB), sboff=56: byte offset 1024+56 = 1080.
        magics: &[Magic {
            bytes: &[0x53, 0xef],
            kboff: 1,
            sboff: 56,
        }],
        tolerant: false,
        min_size: Some(1080 + 2),
        probe_fn: Some(|slot, slot_off, matched, _buffers, values, chain| {
            if slot.len() < 120 + 16 {
                return Ok(());
            }
            let uuid = &slot[104..120];
            let label = trim_nul(&slot[120..136]);

            values.set(Value::new(
                "TYPE",
                ValueData::string("ext4"),
                chain,
            ));
            values.set(Value::new("USAGE", ValueData::string("filesystem"), chain));
            values.set(Value::new("UUID", ValueData::binary(uuid), chain));
            if !label.is_empty() {
                values.set(Value::new(
                    "LABEL",
                    ValueData::string(String::from_utf8_lossy(label).into_owned()),
                    chain,
                ));
            }
            if let Some(m) = matched {
                values.set(Value::new(
                    "SBMAGIC",
                    ValueData::binary(&slot[56..58]),
                    chain,
                ));
                values.set(Value::new(
                    "SBMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            let _ = slot_off;
            Ok(())
        }),
    }
}

fn xfs() -> Idinfo {
    Idinfo {
        name: "xfs",
        usage: Usage::FileSystem,
        magics: &[Magic {
            bytes: b"XFSB",
            kboff: 0,
            sboff: 0,
        }],
        tolerant: false,
        min_size: Some(512),
        probe_fn: Some(|slot, _slot_off, matched, _buffers, values, chain| {
            if slot.len() < 108 + 12 {
                return Ok(());
            }
            let uuid = &slot[32..48];
            let label = trim_nul(&slot[108..120]);

            values.set(Value::new("TYPE", ValueData::string("xfs"), chain));
            values.set(Value::new("USAGE", ValueData::string("filesystem"), chain));
            values.set(Value::new("UUID", ValueData::binary(uuid), chain));
            if !label.is_empty() {
                values.set(Value::new(
                    "LABEL",
                    ValueData::string(String::from_utf8_lossy(label).into_owned()),
                    chain,
                ));
            }
            if let Some(m) = matched {
                values.set(Value::new("SBMAGIC", ValueData::binary(b"XFSB"), chain));
                values.set(Value::new(
                    "SBMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

fn vfat() -> Idinfo {
    Idinfo {
        name: "vfat",
        usage: Usage::FileSystem,
        // Boot-sector signature, common to FAT12/16/32 (sboff=510, 2 bytes).
        magics: &[Magic {
            bytes: &[0x55, 0xaa],
            kboff: 0,
            sboff: 510,
        }],
        tolerant: true,
        min_size: Some(512),
        probe_fn: Some(|slot, _slot_off, matched, _buffers, values, chain| {
            if slot.len() < 512 {
                return Ok(());
            }
            // Distinguish FAT12/16 (label at 0x2b) from FAT32 (label at 0x47) by their
            // respective filesystem-type strings.
            let fat32 = &slot[82..90];
            let fat16 = &slot[54..62];
            let sec_type = if fat32.starts_with(b"FAT32") {
                "fat32"
            } else if fat16.starts_with(b"FAT16") {
                "fat16"
            } else if fat16.starts_with(b"FAT12") {
                "fat12"
            } else {
                "vfat"
            };

            values.set(Value::new("TYPE", ValueData::string("vfat"), chain));
            values.set(Value::new("SEC_TYPE", ValueData::string(sec_type), chain));
            values.set(Value::new("USAGE", ValueData::string("filesystem"), chain));
            if let Some(m) = matched {
                values.set(Value::new(
                    "SBMAGIC",
                    ValueData::binary(&slot[510..512]),
                    chain,
                ));
                values.set(Value::new(
                    "SBMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

fn swap() -> Idinfo {
    Idinfo {
        name: "swap",
        usage: Usage::Other,
        // `SWAPSPACE2` 10 bytes, 10 bytes before the end of a 4 KiB page (kboff=3, sboff=1014 ->
        // effective offset 4086).
        magics: &[Magic {
            bytes: b"SWAPSPACE2",
            kboff: 3,
            sboff: 1014,
        }],
        tolerant: false,
        min_size: Some(4096),
        probe_fn: Some(|_slot, _slot_off, matched, _buffers, values, chain| {
            values.set(Value::new("TYPE", ValueData::string("swap"), chain));
            values.set(Value::new("USAGE", ValueData::string("other"), chain));
            if let Some(m) = matched {
                values.set(Value::new(
                    "SBMAGIC",
                    ValueData::binary(b"SWAPSPACE2"),
                    chain,
                ));
                values.set(Value::new(
                    "SBMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

fn lvm2_pv() -> Idinfo {
    Idinfo {
        name: "LVM2_member",
        usage: Usage::Raid,
        // `LABELONE` at sector 1 (kboff=0, sboff=512).
        magics: &[Magic {
            bytes: b"LABELONE",
            kboff: 0,
            sboff: 512,
        }],
        tolerant: false,
        min_size: Some(8192),
        probe_fn: Some(|_slot, _slot_off, matched, _buffers, values, chain| {
            values.set(Value::new(
                "TYPE",
                ValueData::string("LVM2_member"),
                chain,
            ));
            values.set(Value::new("USAGE", ValueData::string("raid"), chain));
            if let Some(m) = matched {
                values.set(Value::new(
                    "SBMAGIC",
                    ValueData::binary(b"LABELONE"),
                    chain,
                ));
                values.set(Value::new(
                    "SBMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

/// Built-in superblocks chain descriptor table. Callers wanting a custom catalogue build their
/// own `&[Idinfo]`; the engine itself is generic over any table.
pub fn descriptors() -> Vec<Idinfo> {
    vec![lvm2_pv(), ext4(), xfs(), vfat(), swap()]
}

/// The byte region an LVM2 physical-volume label zeroes ahead of its own header, registered as a
/// wiper area when this descriptor matches.
pub const LVM2_WIPE_SIZE: u64 = 8192;

/// Chain placeholder so [`crate::prober::chain::ChainId::Superblocks`] always has its producing
/// id available to callers that only know a descriptor's name.
pub const CHAIN_ID: ChainId = ChainId::Superblocks;
