// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Prober`]: top-level object binding a device handle, probing window, buffer cache,
//! chains, and result list.

// From standard library
use std::cell::RefCell;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

// From this library
use crate::catalogue;
use crate::config::Config;
use crate::core::device::DeviceNumber;
use crate::core::utils::kernel;
use crate::prober::buffer::BufferCache;
use crate::prober::chain::{ChainDriver, ChainId, ChainState, ProbeOutcome, SafeProbeOutcome};
use crate::prober::error::ProbeError;
use crate::prober::filter::{Filter, FilterCriterion};
use crate::prober::generic_chain::DescriptorChain;
use crate::prober::value::ValueList;
use crate::prober::wipe::{use_wiper, WipeArea};

/// Outcome of a whole-prober probing step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeResult {
    /// A descriptor matched somewhere; new values are available on [`Prober::values`].
    Ok,
    /// Probing is exhausted: no more descriptors to try.
    Done,
    /// [`Prober::do_safeprobe`] found two or more intolerant matches on one chain.
    Ambivalent,
}

/// Device/probe flag bits a [`Prober`] tracks for itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProberFlags {
    /// Set when the [`Prober`] opened its own file descriptor (as opposed to receiving an
    /// already-open [`File`] from the caller). Rust's ownership model means the descriptor is
    /// closed on drop either way; this flag is kept purely for API-surface fidelity with the
    /// lifecycle model (documented as a simplification in `DESIGN.md`).
    pub private_fd: bool,
    pub tiny_dev: bool,
    pub cdrom_dev: bool,
    pub no_scan_dev: bool,
}

/// Returns the byte size of the device or file backing `file`, via `fstat` (regular files,
/// character devices) or `BLKGETSIZE64` (block devices).
pub(crate) fn device_size(file: &File) -> std::io::Result<u64> {
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(file.as_raw_fd(), &mut stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    if stat.st_mode & libc::S_IFMT == libc::S_IFBLK {
        const BLKGETSIZE64: libc::c_ulong = 0x80081272;
        let mut size: u64 = 0;
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size as *mut u64) };
        if rc == 0 {
            return Ok(size);
        }
        // Fall through to fstat's st_size for devices that don't support the ioctl (e.g. when
        // probing a test harness's regular-file stand-in for a block device).
    }

    Ok(stat.st_size as u64)
}

/// Returns `file`'s device number, if it is a block device. Regular files (including the
/// in-memory test images this crate's own tests probe) have no device number of their own.
fn block_devno(file: &File) -> std::io::Result<Option<DeviceNumber>> {
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(file.as_raw_fd(), &mut stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    if stat.st_mode & libc::S_IFMT == libc::S_IFBLK {
        Ok(Some(DeviceNumber::from(stat.st_rdev as u64)))
    } else {
        Ok(None)
    }
}

/// Top-level object binding a device handle, probing area, buffer cache, chains, and result list
///.
pub struct Prober {
    file: Rc<File>,
    flags: ProberFlags,
    devno: Option<DeviceNumber>,
    whole_disk_devno: Option<DeviceNumber>,
    write_mode: bool,
    window_off: u64,
    window_size: u64,
    config: Arc<Config>,
    buffers: Rc<RefCell<BufferCache>>,
    chains: Vec<Box<dyn ChainDriver>>,
    states: Vec<ChainState>,
    values: ValueList,
    cur_chain_idx: Option<usize>,
    wipe_area: Option<WipeArea>,
    whole_disk: RefCell<Option<Rc<RefCell<Prober>>>>,
}

impl Prober {
    /// Builds the fixed, three-chain set in `ChainId::index_order()`, seeded from the built-in
    /// `catalogue`. A chain's integer ID must equal its position in the chain array; asserted
    /// here mechanically rather than assumed.
    fn default_chains() -> Vec<Box<dyn ChainDriver>> {
        let chains: Vec<Box<dyn ChainDriver>> = vec![
            Box::new(DescriptorChain::new(
                ChainId::Superblocks,
                catalogue::superblocks::descriptors(),
                true,
            )),
            Box::new(DescriptorChain::new(
                ChainId::Partitions,
                catalogue::partitions::descriptors(),
                false,
            )),
            Box::new(DescriptorChain::new(
                ChainId::Topology,
                catalogue::topology::descriptors(),
                false,
            )),
        ];

        for (idx, id) in ChainId::index_order().iter().enumerate() {
            assert_eq!(
                chains[idx].id(),
                *id,
                "chain array position must equal ChainId index"
            );
        }

        chains
    }

    fn from_parts(
        file: File,
        flags: ProberFlags,
        write_mode: bool,
        window_off: u64,
        window_size: u64,
        sector_size: u32,
        config: Arc<Config>,
    ) -> Result<Self, ProbeError> {
        if window_size == 0 {
            return Err(ProbeError::OutOfRange);
        }

        let size = device_size(&file)?;
        if size != 0 {
            let end = window_off.checked_add(window_size);
            if !matches!(end, Some(end) if end <= size) {
                return Err(ProbeError::OutOfRange);
            }
        }

        let devno = block_devno(&file)?;
        let whole_disk_devno = devno.and_then(kernel::devno_to_wholedisk);

        let file = Rc::new(file);
        let buffers = Rc::new(RefCell::new(BufferCache::new(
            Rc::clone(&file),
            window_off,
            window_size,
            sector_size,
        )?));

        let chains = Self::default_chains();
        let states = chains
            .iter()
            .map(|c| ChainState::new(c.id(), c.enabled_by_default()))
            .collect();

        Ok(Self {
            file,
            flags,
            devno,
            whole_disk_devno,
            write_mode,
            window_off,
            window_size,
            config,
            buffers,
            chains,
            states,
            values: ValueList::new(),
            cur_chain_idx: None,
            wipe_area: None,
            whole_disk: RefCell::new(None),
        })
    }

    /// Opens `path` read-only and builds a [`Prober`] scanning the whole device.
    pub fn open<P: AsRef<Path>>(path: P, config: Arc<Config>) -> Result<Self, ProbeError> {
        let file = File::open(path.as_ref())?;
        let size = device_size(&file)?;
        Self::from_parts(
            file,
            ProberFlags {
                private_fd: true,
                ..Default::default()
            },
            false,
            0,
            size.max(1),
            512,
            config,
        )
    }

    /// Builds a [`Prober`] from an already-open [`File`]. `write_mode`
    /// must be `true` for [`Self::do_wipe`] to be usable non-dry-run.
    pub fn from_file(
        file: File,
        write_mode: bool,
        window_off: u64,
        window_size: u64,
        sector_size: u32,
        config: Arc<Config>,
    ) -> Result<Self, ProbeError> {
        Self::from_parts(
            file,
            ProberFlags::default(),
            write_mode,
            window_off,
            window_size,
            sector_size,
            config,
        )
    }

    pub fn window(&self) -> (u64, u64) {
        (self.window_off, self.window_size)
    }

    pub fn devno(&self) -> Option<DeviceNumber> {
        self.devno
    }

    pub fn whole_disk_devno(&self) -> Option<DeviceNumber> {
        self.whole_disk_devno
    }

    pub fn flags(&self) -> ProberFlags {
        self.flags
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn values(&self) -> &ValueList {
        &self.values
    }

    /// Replaces the device this prober scans, closing any owned descriptor and resetting every
    /// piece of probing state.
    pub fn set_device(
        &mut self,
        file: File,
        write_mode: bool,
        window_off: u64,
        window_size: u64,
    ) -> Result<(), ProbeError> {
        log::debug!("Prober::set_device replacing device, window ({window_off}, {window_size})");
        let sector_size = self.buffers.borrow().bytes_per_sector();
        let rebuilt = Self::from_parts(
            file,
            ProberFlags {
                private_fd: true,
                ..Default::default()
            },
            write_mode,
            window_off,
            window_size,
            sector_size,
            Arc::clone(&self.config),
        )?;
        *self = rebuilt;
        Ok(())
    }

    /// Enables or disables `chain`.
    pub fn set_chain_enabled(&mut self, chain: ChainId, enabled: bool) {
        self.states[chain.index()].set_enabled(enabled);
    }

    pub fn is_chain_enabled(&self, chain: ChainId) -> bool {
        self.states[chain.index()].is_enabled()
    }

    /// Restricts `chain` to, or away from, the named descriptors.
    /// Touching the filter always resets the chain's position to the pre-start sentinel.
    pub fn filter_types(&mut self, chain: ChainId, criterion: FilterCriterion, names: &[&str]) {
        let descriptor_names: Vec<&str> =
            self.chains[chain.index()].descriptors().iter().map(|d| d.name).collect();
        let nidinfos = descriptor_names.len();
        let state = &mut self.states[chain.index()];
        let filter: &mut Filter = state.filter_mut(nidinfos);
        filter.filter_types(criterion, names.iter().copied(), &descriptor_names);
        self.cur_chain_idx = None;
    }

    pub fn invert_filter(&mut self, chain: ChainId) {
        let nidinfos = self.chains[chain.index()].descriptors().len();
        self.states[chain.index()].filter_mut(nidinfos).invert();
        self.cur_chain_idx = None;
    }

    pub fn reset_filter(&mut self, chain: ChainId) {
        self.states[chain.index()].clear_filter();
        self.cur_chain_idx = None;
    }

    /// Resets probing to the pre-start state, without touching filters or enabled flags
    ///.
    pub fn reset_probe(&mut self) {
        log::debug!("Prober::reset_probe resetting iteration state");
        for state in &mut self.states {
            state.reset_idx();
        }
        self.cur_chain_idx = None;
        self.wipe_area = None;
        self.values.clear();
        self.buffers.borrow_mut().reset();
    }

    fn apply_wiper_policy(&mut self, chain_idx: usize, descriptor_idx: usize) -> Result<(), ProbeError> {
        let chain_id = self.chains[chain_idx].id();
        let descriptor_name = self.chains[chain_idx].descriptors()[descriptor_idx].name;

        match chain_id {
            ChainId::Superblocks if descriptor_name == "LVM2_member" => {
                log::debug!("Prober::apply_wiper_policy registering wipe area for LVM2_member");
                self.wipe_area = Some(WipeArea {
                    offset: 0,
                    size: catalogue::superblocks::LVM2_WIPE_SIZE,
                    producing_chain: ChainId::Superblocks,
                });
            }
            ChainId::Partitions => {
                let offset = self
                    .values
                    .get("PTMAGIC_OFFSET")
                    .and_then(|v| v.data().as_str())
                    .and_then(|s| s.parse::<u64>().ok());
                let len = self.values.get("PTMAGIC").map(|v| v.data().declared_len() as u64);

                if let (Some(offset), Some(len)) = (offset, len) {
                    if let Some(discarded) = use_wiper(self.wipe_area.as_ref(), offset, len) {
                        log::debug!(
                            "Prober::apply_wiper_policy discarding values from chain {discarded} (wiper containment)"
                        );
                        self.values.discard_chain(discarded);
                        self.wipe_area = None;
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Advances one descriptor at a time, across chains in
    /// `ChainId::index_order()`, returning as soon as one matches.
    pub fn do_probe(&mut self) -> Result<ProbeResult, ProbeError> {
        if self.cur_chain_idx.is_none() {
            self.cur_chain_idx = Some(0);
        }

        loop {
            let ci = match self.cur_chain_idx {
                Some(ci) if ci < self.chains.len() => ci,
                _ => return Ok(ProbeResult::Done),
            };

            if !self.states[ci].is_enabled() {
                self.cur_chain_idx = Some(ci + 1);
                continue;
            }

            let outcome = {
                let mut buffers = self.buffers.borrow_mut();
                self.chains[ci].probe(&mut buffers, &mut self.states[ci], &mut self.values)?
            };

            match outcome {
                ProbeOutcome::Ok(idx) => {
                    self.apply_wiper_policy(ci, idx)?;
                    return Ok(ProbeResult::Ok);
                }
                ProbeOutcome::None => {
                    self.cur_chain_idx = Some(ci + 1);
                }
            }
        }
    }

    /// Walks every chain independently in safeprobe mode.
    pub fn do_safeprobe(&mut self) -> Result<ProbeResult, ProbeError> {
        self.reset_probe();
        let mut any_match = false;

        for ci in 0..self.chains.len() {
            if !self.states[ci].is_enabled() {
                continue;
            }

            let outcome = {
                let mut buffers = self.buffers.borrow_mut();
                self.chains[ci].safeprobe(&mut buffers, &mut self.states[ci], &mut self.values)?
            };

            match outcome {
                SafeProbeOutcome::Ambivalent => {
                    self.values.discard_chain(self.chains[ci].id());
                    return Ok(ProbeResult::Ambivalent);
                }
                SafeProbeOutcome::Ok(idx) => {
                    any_match = true;
                    self.apply_wiper_policy(ci, idx)?;
                }
                SafeProbeOutcome::None => {}
            }
        }

        Ok(if any_match { ProbeResult::Ok } else { ProbeResult::Done })
    }

    /// Identical to [`Self::do_safeprobe`] but never reports ambivalence, gathering every
    /// unique match per chain instead.
    pub fn do_fullprobe(&mut self) -> Result<ProbeResult, ProbeError> {
        self.reset_probe();
        let mut any_match = false;

        for ci in 0..self.chains.len() {
            if !self.states[ci].is_enabled() {
                continue;
            }

            loop {
                let outcome = {
                    let mut buffers = self.buffers.borrow_mut();
                    self.chains[ci].probe(&mut buffers, &mut self.states[ci], &mut self.values)?
                };
                match outcome {
                    ProbeOutcome::Ok(idx) => {
                        any_match = true;
                        self.apply_wiper_policy(ci, idx)?;
                    }
                    ProbeOutcome::None => break,
                }
            }
        }

        Ok(if any_match { ProbeResult::Ok } else { ProbeResult::Done })
    }

    /// Decrements the current chain's index, rewinding to the previous
    /// chain at the pre-start sentinel. Always invalidates the buffer cache.
    pub fn step_back(&mut self) {
        log::debug!("Prober::step_back rewinding one descriptor");
        self.buffers.borrow_mut().reset();
        self.wipe_area = None;

        if let Some(ci) = self.cur_chain_idx {
            if ci >= self.chains.len() {
                self.cur_chain_idx = Some(self.chains.len().saturating_sub(1));
                return;
            }

            match self.states[ci].idx() {
                None => {
                    self.cur_chain_idx = if ci == 0 { None } else { Some(ci - 1) };
                }
                Some(0) => {
                    self.states[ci].reset_idx();
                    self.cur_chain_idx = if ci == 0 { None } else { Some(ci - 1) };
                }
                Some(idx) => {
                    self.states[ci].set_idx(Some(idx - 1));
                }
            }
        }
    }

    /// Zeroes the magic bytes of the descriptor that produced the most
    /// recent match, so a subsequent probe exposes a backup signature underneath. A `dry_run`
    /// only reports what would be wiped, without touching the device.
    pub fn do_wipe(&mut self, dry_run: bool) -> Result<(u64, usize), ProbeError> {
        let ci = self
            .cur_chain_idx
            .filter(|ci| *ci < self.chains.len())
            .ok_or_else(|| ProbeError::Wipe("no active chain match to wipe".to_string()))?;

        let (offset_name, magic_name) = match self.chains[ci].id() {
            ChainId::Superblocks => ("SBMAGIC_OFFSET", "SBMAGIC"),
            ChainId::Partitions => ("PTMAGIC_OFFSET", "PTMAGIC"),
            ChainId::Topology => {
                return Err(ProbeError::Wipe("topology chain has no magic to wipe".to_string()))
            }
        };

        let offset: u64 = self
            .values
            .get(offset_name)
            .and_then(|v| v.data().as_str())
            .ok_or_else(|| ProbeError::Wipe(format!("no {offset_name} value to wipe")))?
            .parse()
            .map_err(|e| ProbeError::Wipe(format!("invalid {offset_name} value: {e}")))?;

        let len = self
            .values
            .get(magic_name)
            .map(|v| v.data().declared_len())
            .ok_or_else(|| ProbeError::Wipe(format!("no {magic_name} value to wipe")))?;

        const MAX_WIPE_LEN: usize = 4096;
        let len = len.min(MAX_WIPE_LEN);

        if !dry_run {
            if !self.write_mode {
                return Err(ProbeError::Wipe(
                    "prober was not opened in write mode".to_string(),
                ));
            }
            let real_off = self.window_off + offset;
            let zeros = vec![0u8; len];
            self.file.write_all_at(&zeros, real_off)?;
            self.file.sync_data()?;
            log::debug!("Prober::do_wipe wiped {len} bytes at offset {real_off}");
            self.step_back();
        }

        Ok((offset, len))
    }

    /// Builds a clone covering `(window_off, window_size)` that forwards every buffer read to
    /// this prober's cache rather than allocating its own.
    pub fn clone_with_window(&self, window_off: u64, window_size: u64) -> Result<Prober, ProbeError> {
        if window_size == 0 {
            return Err(ProbeError::OutOfRange);
        }

        let buffers = Rc::new(RefCell::new(BufferCache::forwarding(
            Rc::clone(&self.buffers),
            window_off,
            window_size,
        )));

        let chains = Self::default_chains();
        let states = chains
            .iter()
            .map(|c| ChainState::new(c.id(), c.enabled_by_default()))
            .collect();

        Ok(Prober {
            file: Rc::clone(&self.file),
            flags: ProberFlags::default(),
            devno: self.devno,
            whole_disk_devno: self.whole_disk_devno,
            write_mode: false,
            window_off,
            window_size,
            config: Arc::clone(&self.config),
            buffers,
            chains,
            states,
            values: ValueList::new(),
            cur_chain_idx: None,
            wipe_area: None,
            whole_disk: RefCell::new(None),
        })
    }

    /// Lazily opens and caches the whole-disk prober for a partition device").
    pub fn whole_disk_prober(&self) -> Result<Rc<RefCell<Prober>>, ProbeError> {
        if let Some(existing) = self.whole_disk.borrow().as_ref() {
            return Ok(Rc::clone(existing));
        }

        let whole_devno = self
            .whole_disk_devno
            .ok_or_else(|| ProbeError::Config("no whole-disk device number available".to_string()))?;
        let path: PathBuf = kernel::devno_to_devname(whole_devno)
            .ok_or_else(|| ProbeError::Config(format!("could not resolve devno {whole_devno} to a device name")))?;

        let prober = Prober::open(&path, Arc::clone(&self.config))?;
        let rc = Rc::new(RefCell::new(prober));
        *self.whole_disk.borrow_mut() = Some(Rc::clone(&rc));
        Ok(rc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file_with(bytes: &[u8]) -> File {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(bytes).unwrap();
        tmp.flush().unwrap();
        tmp.reopen().unwrap()
    }

    fn ext4_image() -> Vec<u8> {
        let mut data = vec![0u8; 4 * 1024 * 1024];
        data[1080] = 0x53;
        data[1081] = 0xef;
        let uuid = [0xAAu8; 16];
        data[1024 + 104..1024 + 120].copy_from_slice(&uuid);
        data
    }

    #[test]
    fn do_probe_finds_an_ext4_superblock() {
        let file = temp_file_with(&ext4_image());
        let config = Config::read_from(Path::new("/nonexistent")).unwrap();
        let mut prober = Prober::from_file(file, false, 0, 4 * 1024 * 1024, 512, config).unwrap();

        let result = prober.do_probe().unwrap();
        assert_eq!(result, ProbeResult::Ok);
        assert_eq!(prober.values().get("TYPE").unwrap().data().as_str(), Some("ext4"));
        assert_eq!(
            prober.values().get("SBMAGIC_OFFSET").unwrap().data().as_str(),
            Some("1080")
        );
    }

    #[test]
    fn do_probe_on_a_device_with_no_signatures_returns_done_on_first_call() {
        let file = temp_file_with(&vec![0u8; 4096]);
        let config = Config::read_from(Path::new("/nonexistent")).unwrap();
        let mut prober = Prober::from_file(file, false, 0, 4096, 512, config).unwrap();

        assert_eq!(prober.do_probe().unwrap(), ProbeResult::Done);
        assert!(prober.values().is_empty());
    }

    #[test]
    fn reset_probe_is_idempotent() {
        let file = temp_file_with(&ext4_image());
        let config = Config::read_from(Path::new("/nonexistent")).unwrap();
        let mut prober = Prober::from_file(file, false, 0, 4 * 1024 * 1024, 512, config).unwrap();
        prober.do_probe().unwrap();

        prober.reset_probe();
        let after_one = (prober.cur_chain_idx, prober.values.len());
        prober.reset_probe();
        let after_two = (prober.cur_chain_idx, prober.values.len());
        assert_eq!(after_one, after_two);
    }

    #[test]
    fn zero_length_window_is_rejected() {
        let file = temp_file_with(&[0u8; 4096]);
        let config = Config::read_from(Path::new("/nonexistent")).unwrap();
        assert!(matches!(
            Prober::from_file(file, false, 0, 0, 512, config),
            Err(ProbeError::OutOfRange)
        ));
    }
}
