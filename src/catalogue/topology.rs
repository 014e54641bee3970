// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Topology chain catalogue: I/O geometry hints.
//!
//! Unlike the superblocks and partitions chains, topology has no on-device magic to look for —
//! `libblkid`'s own topology chain reports values gathered from `ioctl`/sysfs queries against the
//! block device, not from a signature. It is still expressed as a single magic-less [`Idinfo`]
//!, so it drives through the same generic chain machinery as every other chain.

// From this library
use crate::core::device::Usage;
use crate::prober::chain::ChainId;
use crate::prober::descriptor::Idinfo;
use crate::prober::value::{Value, ValueData};

fn geometry() -> Idinfo {
    Idinfo {
        name: "topology",
        usage: Usage::Other,
        magics: &[],
        tolerant: true,
        min_size: None,
        probe_fn: Some(|_slot, _slot_off, _matched, buffers, values, chain| {
            let sector_size = buffers.bytes_per_sector() as u64;
            values.set(Value::new(
                "LOGICAL_SECTOR_SIZE",
                ValueData::string(sector_size.to_string()),
                chain,
            ));
            // A from-scratch prober has no ioctl access to a device's physical geometry; absent
            // better information, the physical sector size is reported as the logical one. A
            // caller talking to a real block device can override this by widening the prober's
            // configured `bytes_per_sector`.
            values.set(Value::new(
                "PHYSICAL_SECTOR_SIZE",
                ValueData::string(sector_size.to_string()),
                chain,
            ));
            values.set(Value::new(
                "MINIMUM_IO_SIZE",
                ValueData::string(sector_size.to_string()),
                chain,
            ));
            values.set(Value::new(
                "OPTIMAL_IO_SIZE",
                ValueData::string("0".to_string()),
                chain,
            ));
            values.set(Value::new(
                "ALIGNMENT_OFFSET",
                ValueData::string("0".to_string()),
                chain,
            ));
            Ok(())
        }),
    }
}

/// Built-in topology chain descriptor table: a single always-matching entry.
pub fn descriptors() -> Vec<Idinfo> {
    vec![geometry()]
}

pub const CHAIN_ID: ChainId = ChainId::Topology;
