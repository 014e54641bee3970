// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer cache: read-only views into device byte ranges, serviced by `read` or memory-mapping.
//!
//! Ranges are never split or merged; a read request is satisfied by the first cached range that
//! fully contains it, otherwise a fresh entry is allocated.

// From dependency library
use memmap2::{Mmap, MmapOptions};

// From standard library
use std::cell::RefCell;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::rc::Rc;

// From this library
use crate::prober::error::ProbeError;

const MMAP_HEAD_TAIL_SIZE: u64 = 2 * 1024 * 1024;
const MMAP_MIN_WINDOW: u64 = 1024 * 1024;
const PAGE_SIZE: u64 = 4096;

enum CachedData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl CachedData {
    fn as_slice(&self) -> &[u8] {
        match self {
            CachedData::Mapped(mmap) => mmap,
            CachedData::Owned(bytes) => bytes,
        }
    }
}

/// A byte range (offset, length) plus its backing storage.
struct CachedRange {
    off: u64,
    data: CachedData,
}

impl CachedRange {
    fn len(&self) -> u64 {
        self.data.as_slice().len() as u64
    }

    fn contains(&self, real_off: u64, length: u64) -> bool {
        real_off >= self.off
            && real_off + length <= self.off + self.len()
    }

    fn slice(&self, real_off: u64, length: u64) -> &[u8] {
        let start = (real_off - self.off) as usize;
        let end = start + length as usize;
        &self.data.as_slice()[start..end]
    }
}

/// Whether the backing device supports memory-mapping.
fn is_mmappable(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(file.as_raw_fd(), &mut stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let file_type = stat.st_mode & libc::S_IFMT;
    Ok(file_type == libc::S_IFREG || file_type == libc::S_IFBLK)
}

/// Supplies read-only views into a device's byte ranges, relative to a prober's probing window
///. A clone whose parent covers the same region forwards every read to the
/// parent instead of allocating its own ranges.
pub struct BufferCache {
    file: Rc<File>,
    window_off: u64,
    window_size: u64,
    mmappable: bool,
    bytes_per_sector: u32,
    ranges: Vec<CachedRange>,
    parent: Option<Rc<RefCell<BufferCache>>>,
}

impl BufferCache {
    pub fn new(
        file: Rc<File>,
        window_off: u64,
        window_size: u64,
        bytes_per_sector: u32,
    ) -> std::io::Result<Self> {
        let mmappable = is_mmappable(&file)?;
        Ok(Self {
            file,
            window_off,
            window_size,
            mmappable,
            bytes_per_sector,
            ranges: Vec::new(),
            parent: None,
        })
    }

    /// Builds a clone's cache, forwarding reads to `parent`.
    pub fn forwarding(parent: Rc<RefCell<BufferCache>>, window_off: u64, window_size: u64) -> Self {
        let (file, mmappable, bytes_per_sector) = {
            let p = parent.borrow();
            (Rc::clone(&p.file), p.mmappable, p.bytes_per_sector)
        };
        Self {
            file,
            window_off,
            window_size,
            mmappable,
            bytes_per_sector,
            ranges: Vec::new(),
            parent: Some(parent),
        }
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    pub fn window_off(&self) -> u64 {
        self.window_off
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Discards every cached range.
    pub fn reset(&mut self) {
        self.ranges.clear();
    }

    /// Returns a read-only view of `length` bytes starting at `offset_within_window`. Offsets are
    /// relative to the prober's window; the real device offset is `window_off + offset`
    ///.
    pub fn get(&mut self, offset_within_window: u64, length: u64) -> Result<&[u8], ProbeError> {
        if length == 0 || offset_within_window + length > self.window_size {
            return Err(ProbeError::OutOfRange);
        }

        let real_off = self.window_off + offset_within_window;

        if let Some(parent) = self.parent.clone() {
            let mut parent = parent.borrow_mut();
            if real_off + length <= parent.window_off + parent.window_size {
                // SAFETY-by-construction: `get_owned` below copies out so we don't hold a
                // borrow across the call boundary.
                let bytes = parent.get_owned(real_off, length)?;
                return Ok(self.store_owned(real_off, bytes));
            }
        }

        if let Some(idx) = self
            .ranges
            .iter()
            .position(|r| r.contains(real_off, length))
        {
            return Ok(self.ranges[idx].slice(real_off, length));
        }

        self.allocate(real_off, length)?;
        let idx = self.ranges.len() - 1;
        Ok(self.ranges[idx].slice(real_off, length))
    }

    /// Like [`Self::get`] but returns owned bytes, used when forwarding a parent's range into a
    /// clone's own (separately indexed) range list.
    fn get_owned(&mut self, real_off: u64, length: u64) -> Result<Vec<u8>, ProbeError> {
        if let Some(idx) = self
            .ranges
            .iter()
            .position(|r| r.contains(real_off, length))
        {
            return Ok(self.ranges[idx].slice(real_off, length).to_vec());
        }
        self.allocate(real_off, length)?;
        let idx = self.ranges.len() - 1;
        Ok(self.ranges[idx].slice(real_off, length).to_vec())
    }

    fn store_owned(&mut self, real_off: u64, bytes: Vec<u8>) -> &[u8] {
        self.ranges.push(CachedRange {
            off: real_off,
            data: CachedData::Owned(bytes),
        });
        let idx = self.ranges.len() - 1;
        self.ranges[idx].slice(real_off, self.ranges[idx].len())
    }

    fn allocate(&mut self, real_off: u64, length: u64) -> Result<(), ProbeError> {
        if self.mmappable {
            self.allocate_mmap(real_off, length)
        } else {
            self.allocate_read(real_off, length)
        }
    }

    /// Allocation policy: map the first 2 MiB if the request starts there, the last
    /// 2 MiB if the request is within the tail, otherwise a ≥1 MiB page-aligned window extended
    /// to cover the request.
    fn allocate_mmap(&mut self, real_off: u64, length: u64) -> Result<(), ProbeError> {
        log::debug!("BufferCache::allocate_mmap mapping around offset {real_off} len {length}");

        let device_end = self.window_off + self.window_size;

        let (map_off, map_len) = if real_off < MMAP_HEAD_TAIL_SIZE {
            (0, MMAP_HEAD_TAIL_SIZE.max(real_off + length))
        } else if device_end > MMAP_HEAD_TAIL_SIZE && real_off + length > device_end - MMAP_HEAD_TAIL_SIZE
        {
            let tail_start = (device_end - MMAP_HEAD_TAIL_SIZE) / PAGE_SIZE * PAGE_SIZE;
            (tail_start, device_end - tail_start)
        } else {
            let aligned = real_off / PAGE_SIZE * PAGE_SIZE;
            let min_len = MMAP_MIN_WINDOW.max(real_off + length - aligned);
            (aligned, min_len)
        };

        let mmap = unsafe {
            MmapOptions::new()
                .offset(map_off)
                .len(map_len as usize)
                .map(self.file.as_ref())
                .map_err(ProbeError::Io)?
        };

        self.ranges.push(CachedRange {
            off: map_off,
            data: CachedData::Mapped(mmap),
        });
        Ok(())
    }

    fn allocate_read(&mut self, real_off: u64, length: u64) -> Result<(), ProbeError> {
        log::debug!("BufferCache::allocate_read reading offset {real_off} len {length}");
        let mut buf = vec![0u8; length as usize];
        self.file.read_exact_at(&mut buf, real_off)?;
        self.ranges.push(CachedRange {
            off: real_off,
            data: CachedData::Owned(buf),
        });
        Ok(())
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

    #[test]
    fn get_rejects_zero_length_requests() {
        let file = temp_file_with(&[0u8; 4096]);
        let mut cache = BufferCache::new(Rc::new(file), 0, 4096, 512).unwrap();
        assert!(matches!(cache.get(0, 0), Err(ProbeError::OutOfRange)));
    }

    #[test]
    fn get_rejects_requests_escaping_the_window() {
        let file = temp_file_with(&[0u8; 4096]);
        let mut cache = BufferCache::new(Rc::new(file), 0, 100, 512).unwrap();
        assert!(matches!(cache.get(50, 100), Err(ProbeError::OutOfRange)));
    }

    #[test]
    fn get_returns_requested_bytes() {
        let mut data = vec![0u8; 4096];
        data[1080] = 0x53;
        data[1081] = 0xef;
        let file = temp_file_with(&data);
        let mut cache = BufferCache::new(Rc::new(file), 0, 4096, 512).unwrap();
        let slice = cache.get(1080, 2).unwrap();
        assert_eq!(slice, &[0x53, 0xef]);
    }

    #[test]
    fn a_second_overlapping_request_hits_the_cached_range() {
        let file = temp_file_with(&[1u8; 4096]);
        let mut cache = BufferCache::new(Rc::new(file), 0, 4096, 512).unwrap();
        let _ = cache.get(0, 16).unwrap();
        let ranges_after_first = cache.ranges.len();
        let _ = cache.get(4, 8).unwrap();
        assert_eq!(cache.ranges.len(), ranges_after_first);
    }
}
