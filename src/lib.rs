// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Table of Contents
//! 1. [Description](#description)
//! 2. [API structure](#api-structure)
//!     1. [Low-level probing](#low-level-probing)
//!     2. [Mount tables](#mount-tables)
//!     3. [Configuration and logging](#configuration-and-logging)
//!     4. [Common utils](#common-utils)
//!
//! ## Description
//!
//! `diskid` identifies block devices: the file systems, partition tables, and RAID/LVM
//! signatures they carry, and extracts properties such as labels, UUIDs, and usage. It also reads
//! and queries the Linux mount table in its `fstab`/`mtab`/`mountinfo` dialects.
//!
//! Unlike a wrapper crate, `diskid` does not call out to `libblkid`: every signature descriptor,
//! magic-matching rule, and mount-table lookup algorithm is implemented directly against device
//! bytes and `/proc`/`/sys` text, in Rust.
//!
//! ## API structure
//!
//! ### Low-level probing
//!
//! [`prober::Prober`] is the entry point for device identification. A `Prober` is bound to a
//! device (or a byte-range segment of one) and drives three independent chains of signature
//! descriptors in order:
//! - `superblocks`: file system and volume-manager signatures (`ext4`, `xfs`, `vfat`, `swap`,
//!   `LVM2_member`, ...),
//! - `partitions`: partition-table signatures (`dos`, `gpt`),
//! - `topology`: sector-size and I/O-geometry hints.
//!
//! ```
//! use diskid::prober::Prober;
//!
//! fn main() -> diskid::Result<()> {
//!     let mut prober = Prober::builder()
//!         .scan_device("/dev/null")
//!         .build()?;
//!
//!     let _ = prober.do_safeprobe();
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Mount tables
//!
//! [`mount::MountTable`] parses `fstab`, `mtab`, and `/proc/self/mountinfo`-style text into an
//! ordered list of [`mount::MountEntry`] values, and [`mount::TableLookup`] implements the
//! multi-pass lookup algorithms (`find_target`, `find_source`, `find_pair`, ...) a mount-aware
//! tool needs.
//!
//! ### Configuration and logging
//!
//! [`config::Config`] reads `diskid`'s configuration file (`/etc/diskid.conf` by default), and
//! [`debug`] gates `log`-facade output behind the `DISKID_DEBUG` environment variable, the way
//! `libblkid` gates its own debug output behind `LIBBLKID_DEBUG`.
//!
//! ### Common utils
//!
//! [`core`] holds the value types ([`core::device::Tag`], [`core::device::Uuid`],
//! [`core::device::Label`], [`core::device::DeviceNumber`], ...) and kernel-interface helpers
//! shared by the prober and mount-table subsystems.

pub use error::*;

pub mod catalogue;
pub mod config;
pub mod core;
pub mod debug;
pub mod mount;
pub mod prober;

mod error;
