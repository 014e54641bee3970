// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partitions chain catalogue: DOS/MBR and GPT descriptors.

// From this library
use crate::core::device::Usage;
use crate::prober::descriptor::{Idinfo, Magic};
use crate::prober::value::{Value, ValueData};

fn dos() -> Idinfo {
    Idinfo {
        name: "dos",
        usage: Usage::Other,
        magics: &[Magic {
            bytes: &[0x55, 0xaa],
            kboff: 0,
            sboff: 510,
        }],
        tolerant: false,
        min_size: Some(512),
        probe_fn: Some(|slot, _slot_off, matched, _buffers, values, chain| {
            if slot.len() < 512 {
                return Ok(());
            }
            values.set(Value::new("PTTYPE", ValueData::string("dos"), chain));
            if let Some(m) = matched {
                values.set(Value::new(
                    "PTMAGIC",
                    ValueData::binary(&slot[510..512]),
                    chain,
                ));
                values.set(Value::new(
                    "PTMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }

            // First non-empty partition-table entry (offset 446, 16 bytes each); a fuller
            // implementation would enumerate all four and feed a partition iterator.
            let entry = &slot[446..462];
            let part_type = entry[4];
            if part_type != 0 {
                let lba_start = u32::from_le_bytes(entry[8..12].try_into().unwrap());
                let num_sectors = u32::from_le_bytes(entry[12..16].try_into().unwrap());
                values.set(Value::new("PART_ENTRY_NUMBER", ValueData::string("1"), chain));
                values.set(Value::new(
                    "PART_ENTRY_TYPE",
                    ValueData::string(format!("0x{part_type:02x}")),
                    chain,
                ));
                values.set(Value::new(
                    "PART_ENTRY_OFFSET",
                    ValueData::string((lba_start as u64 * 512).to_string()),
                    chain,
                ));
                values.set(Value::new(
                    "PART_ENTRY_SIZE",
                    ValueData::string((num_sectors as u64 * 512).to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

fn gpt() -> Idinfo {
    Idinfo {
        name: "gpt",
        usage: Usage::Other,
        // GPT header's "EFI PART" signature at LBA1 (device offset 512).
        magics: &[Magic {
            bytes: b"EFI PART",
            kboff: 0,
            sboff: 512,
        }],
        tolerant: false,
        min_size: Some(1024),
        probe_fn: Some(|_slot, _slot_off, matched, _buffers, values, chain| {
            values.set(Value::new("PTTYPE", ValueData::string("gpt"), chain));
            if let Some(m) = matched {
                values.set(Value::new(
                    "PTMAGIC",
                    ValueData::binary(b"EFI PART"),
                    chain,
                ));
                values.set(Value::new(
                    "PTMAGIC_OFFSET",
                    ValueData::string(m.effective_off.to_string()),
                    chain,
                ));
            }
            Ok(())
        }),
    }
}

/// Built-in partitions chain descriptor table.
pub fn descriptors() -> Vec<Idinfo> {
    vec![gpt(), dos()]
}
