// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Result value, and the ordered list of values a probe produces.
//!
//! A value is a named, chain-tagged, length-plus-bytes triple; stored bytes are always
//! zero-terminated for string safety, and the recorded length reflects the caller's declared
//! length. At most one value may exist per (chain, name) pair.

// From standard library
use std::fmt;

// From this library
use crate::prober::chain::ChainId;

/// The payload of a [`Value`]: a declared-length byte sequence, stored with a trailing NUL for
/// string safety but reporting only the caller-declared length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueData {
    bytes: Vec<u8>,
    declared_len: usize,
}

impl ValueData {
    /// Builds a string-flavored value: `bytes` is stored NUL-terminated, `declared_len` includes
    /// the terminator, matching `libblkid`'s string convention.
    pub fn string<T: Into<Vec<u8>>>(bytes: T) -> Self {
        let mut bytes = bytes.into();
        bytes.push(0);
        let declared_len = bytes.len();
        Self { bytes, declared_len }
    }

    /// Builds a binary-flavored value: `declared_len` excludes any terminator.
    pub fn binary<T: Into<Vec<u8>>>(bytes: T) -> Self {
        let bytes = bytes.into();
        let declared_len = bytes.len();
        Self { bytes, declared_len }
    }

    /// The stored bytes, always NUL-terminated.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The caller-declared length (may be shorter than `as_bytes().len()` for string values).
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    /// Interprets this value as a UTF-8 string, trimming the trailing NUL(s) added by
    /// [`Self::string`].
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes[..self.declared_len])
            .ok()
            .map(|s| s.trim_end_matches('\0'))
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "{:02x?}", &self.bytes[..self.declared_len]),
        }
    }
}

/// One entry in a prober's result [`ValueList`]: a name, the data, and the chain that produced
/// it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Value {
    name: String,
    data: ValueData,
    chain: ChainId,
}

impl Value {
    pub fn new(name: impl Into<String>, data: ValueData, chain: ChainId) -> Self {
        Self {
            name: name.into(),
            data,
            chain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }
}

/// Ordered, named, chain-tagged result bag produced during a probe.
///
/// Enforces the "at most one value per (chain, name)" invariant at insertion.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    values: Vec<Value>,
}

impl ValueList {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Inserts `value`, replacing any previous entry sharing its name. `libblkid` allows a chain
    /// to overwrite its own partial results mid-probe; uniqueness is only a hard invariant once a
    /// probe completes.
    pub fn set(&mut self, value: Value) {
        log::debug!(
            "ValueList::set setting value {:?}=\"{}\" (chain {:?})",
            value.name(),
            value.data(),
            value.chain()
        );
        if let Some(existing) = self.values.iter_mut().find(|v| v.name == value.name) {
            *existing = value;
        } else {
            self.values.push(value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Removes every value produced by `chain`. Used by [`crate::prober::wipe`]'s containment
    /// logic to discard an earlier chain's match that a wiper area has invalidated.
    pub fn discard_chain(&mut self, chain: ChainId) {
        log::debug!("ValueList::discard_chain discarding values from chain {chain:?}");
        self.values.retain(|v| v.chain != chain);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_list_enforces_name_uniqueness() {
        let mut list = ValueList::new();
        list.set(Value::new(
            "TYPE",
            ValueData::string("ext4"),
            ChainId::Superblocks,
        ));
        list.set(Value::new(
            "TYPE",
            ValueData::string("xfs"),
            ChainId::Superblocks,
        ));

        assert_eq!(list.len(), 1);
        assert_eq!(list.get("TYPE").unwrap().data().as_str(), Some("xfs"));
    }

    #[test]
    fn value_list_discard_chain_removes_only_that_chains_values() {
        let mut list = ValueList::new();
        list.set(Value::new(
            "TYPE",
            ValueData::string("lvm2_member"),
            ChainId::Superblocks,
        ));
        list.set(Value::new(
            "PTTYPE",
            ValueData::string("dos"),
            ChainId::Partitions,
        ));

        list.discard_chain(ChainId::Superblocks);

        assert!(list.get("TYPE").is_none());
        assert!(list.get("PTTYPE").is_some());
    }

    #[test]
    fn value_data_string_reports_declared_length_including_terminator() {
        let data = ValueData::string("ext4");
        assert_eq!(data.declared_len(), 5);
        assert_eq!(data.as_str(), Some("ext4"));
    }
}
