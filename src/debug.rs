// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Activate debug message output.
//!
//! `diskid` logs through the [log](https://crates.io/crates/log) facade. In order to produce log
//! output, executables have to install a logger implementation compatible with the facade
//! (`env_logger`, `pretty_env_logger`, etc.) early in the program's runtime.
//!
//! In addition to the facade's own level filtering (`RUST_LOG`), `diskid` supports subsystem-scoped
//! filtering through a `DISKID_DEBUG` environment-variable override.
//!
//! ```text
//! # Only log messages from the low-level prober and its buffer cache.
//! DISKID_DEBUG="lowprobe,buffer" RUST_LOG=debug ./main
//! ```
//!
//! Recognized subsystem names: `all`, `lowprobe`, `buffer`, `cache`, `read`, `save`, `tag`,
//! `evaluate`, `devno`. An unset or empty `DISKID_DEBUG` enables every subsystem, matching
//! `init_default_debug`'s historical "best effort, log everything you can" behavior.

// From dependency library
use once_cell::sync::OnceCell;

// From standard library
use std::collections::HashSet;
use std::env;

/// One of the logging subsystems a caller can select independently via `DISKID_DEBUG`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Subsystem {
    LowProbe,
    Buffer,
    Cache,
    Read,
    Save,
    Tag,
    Evaluate,
    Devno,
}

impl Subsystem {
    fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lowprobe" => Some(Self::LowProbe),
            "buffer" => Some(Self::Buffer),
            "cache" => Some(Self::Cache),
            "read" => Some(Self::Read),
            "save" => Some(Self::Save),
            "tag" => Some(Self::Tag),
            "evaluate" => Some(Self::Evaluate),
            "devno" => Some(Self::Devno),
            _ => None,
        }
    }
}

static ENABLED: OnceCell<HashSet<Subsystem>> = OnceCell::new();

fn all_subsystems() -> HashSet<Subsystem> {
    use Subsystem::*;
    HashSet::from([LowProbe, Buffer, Cache, Read, Save, Tag, Evaluate, Devno])
}

fn init_from_env() -> HashSet<Subsystem> {
    match env::var("DISKID_DEBUG") {
        Ok(value) if !value.trim().is_empty() => {
            if value.trim().eq_ignore_ascii_case("all") {
                all_subsystems()
            } else {
                value.split(',').filter_map(Subsystem::from_name).collect()
            }
        }
        _ => all_subsystems(),
    }
}

/// Initializes program debugging messages, reading the `DISKID_DEBUG` environment variable to
/// select which subsystems log at `debug`/`trace` level. The first call wins: debugging modes
/// can not be changed once set, for the lifetime of the program.
pub fn init_default_debug() {
    let _ = ENABLED.set(init_from_env());
}

/// Enables debug output for every subsystem, regardless of `DISKID_DEBUG`.
pub fn init_full_debug() {
    let _ = ENABLED.set(all_subsystems());
}

/// Returns `true` if `subsystem` is currently enabled for debug output.
///
/// Before [`init_default_debug`] or [`init_full_debug`] has run, every subsystem is considered
/// enabled, so that a caller who skips explicit initialization still sees messages gated only
/// by the `log` facade's own level filter.
pub fn is_enabled(subsystem: Subsystem) -> bool {
    ENABLED
        .get()
        .map_or(true, |set| set.contains(&subsystem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_parses_known_names() {
        assert_eq!(Subsystem::from_name("Buffer"), Some(Subsystem::Buffer));
        assert_eq!(Subsystem::from_name("bogus"), None);
    }
}
