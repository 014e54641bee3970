// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kernel-interface helpers: device-number resolution, whole-disk lookup, and loop-device
//! backing-file discovery.
//!
//! These are kernel-interface helpers for device numbers, sysfs lookups, and loop-device
//! discovery, treated as a narrow, well-defined interface. They are implemented here in minimal
//! form so the prober and mount-table engine have something real to call; none of the
//! probing/lookup algorithms themselves live in this module.

// From dependency library

// From standard library
use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

// From this library
use crate::core::device::DeviceNumber;
use crate::core::errors::MiscError;

/// Returns the [`DeviceNumber`] of the device or regular file at `path`, following symlinks.
pub fn stat_devno<P: AsRef<Path>>(path: P) -> Result<DeviceNumber, MiscError> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| MiscError::Devno(e.to_string()))?;

    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::stat(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(MiscError::Io(std::io::Error::last_os_error()));
    }

    Ok(DeviceNumber::from(stat.st_rdev.max(stat.st_dev) as u64))
}

/// Resolves a device number to its `/dev/<name>` path by scanning `/sys/dev/block/<maj>:<min>`,
/// as `blkid_devno_to_devname` does.
pub fn devno_to_devname(devno: DeviceNumber) -> Option<PathBuf> {
    let sys_link = format!("/sys/dev/block/{devno}");
    let target = fs::read_link(&sys_link).ok()?;
    let name = target.file_name()?.to_owned();
    Some(Path::new("/dev").join(name))
}

/// Returns the device number of the whole-disk device backing a partition's device number, by
/// resolving `/sys/dev/block/<maj>:<min>/../dev` (the parent directory entry in sysfs is the
/// whole-disk device for a partition, and the device itself for a whole disk).
pub fn devno_to_wholedisk(devno: DeviceNumber) -> Option<DeviceNumber> {
    let sys_link = format!("/sys/dev/block/{devno}");
    let canon = fs::canonicalize(&sys_link).ok()?;
    let parent_dev_file = canon.parent()?.join("dev");
    let content = fs::read_to_string(parent_dev_file).ok()?;
    content.trim().parse().ok()
}

/// Returns the backing file path of a loop device, read from `/sys/block/<name>/loop/backing_file`.
pub fn loop_backing_file<P: AsRef<Path>>(loop_device: P) -> Option<PathBuf> {
    let name = loop_device.as_ref().file_name()?.to_str()?;
    let backing = format!("/sys/block/{name}/loop/backing_file");
    let content = fs::read_to_string(backing).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Sends a `change` uevent for the device at `path`, by writing to its sysfs `uevent` attribute.
/// Mirrors `blkid_send_uevent`, gated by the `SEND_UEVENT` configuration key.
pub fn send_uevent<P: AsRef<Path>>(path: P) -> Result<(), MiscError> {
    let devno = stat_devno(&path)?;
    let sys_link = format!("/sys/dev/block/{devno}/uevent");
    fs::write(&sys_link, b"change")
        .map_err(|e| MiscError::SendUEvent(format!("failed to write to {sys_link}: {e}")))
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;

    #[test]
    fn stat_devno_resolves_a_regular_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let devno = stat_devno(tmp.path());
        assert!(devno.is_ok());
    }
}
