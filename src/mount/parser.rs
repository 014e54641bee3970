// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text parsers for the two mount-table dialects: fstab/mtab's 6-column format, and
//! `/proc/self/mountinfo`'s space-separated, `-`-delimited format.

// From standard library
use std::fs;
use std::path::Path;
use std::rc::Rc;

// From this library
use crate::core::device::DeviceNumber;
use crate::core::errors::ParserError;
use crate::mount::entry::MountEntry;
use crate::mount::error::MountError;
use crate::mount::table::MountTable;

/// Which of the two text dialects a parse call targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    /// The 6-whitespace-separated-column `fstab`/`mtab` format.
    FsTab,
    /// The `/proc/self/mountinfo` format.
    MountInfo,
}

/// A caller-installed callback invoked once per unparsable line, instead of aborting the whole
/// parse. The default policy (no callback installed) is to skip the line and continue.
pub type ParseErrorCallback = Rc<dyn Fn(usize, &str, &ParserError)>;

/// Decodes octal escapes (`\040`, `\011`, `\012`, `\\`) in a single whitespace-delimited field,
/// the convention `fstab`/`mtab` use to embed spaces, tabs, newlines, and backslashes in a
/// source, target, or options column.
fn decode_octal_escapes(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1..i + 4].iter().all(u8::is_ascii_digit) {
            let octal = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap();
            if let Ok(value) = u8::from_str_radix(octal, 8) {
                out.push(value as char);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn report(
    on_error: Option<&ParseErrorCallback>,
    line_no: usize,
    line: &str,
    err: ParserError,
) {
    log::debug!("mount::parser skipping unparsable line {line_no}: {line:?} ({err})");
    if let Some(cb) = on_error {
        cb(line_no, line, &err);
    }
}

/// Parses `content` according to `dialect`, appending every entry it recognizes to `table`.
/// Unparsable lines are reported through `on_error` (if installed) and otherwise skipped, per
/// the default "record and continue" policy.
pub fn parse_str(
    content: &str,
    dialect: Dialect,
    table: &mut MountTable,
    on_error: Option<&ParseErrorCallback>,
) -> Result<(), MountError> {
    let mut intro = String::new();
    let mut seen_entry = false;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if !seen_entry {
                if !intro.is_empty() {
                    intro.push('\n');
                }
                intro.push_str(comment.trim());
            } else if let Some(tail) = table.comment_tail() {
                let mut updated = tail.to_string();
                updated.push('\n');
                updated.push_str(comment.trim());
                table.set_comment_tail(updated);
            } else {
                table.set_comment_tail(comment.trim());
            }
            continue;
        }

        let result = match dialect {
            Dialect::FsTab => parse_fstab_line(trimmed),
            Dialect::MountInfo => parse_mountinfo_line(trimmed),
        };

        match result {
            Ok(entry) => {
                table.add(entry);
                seen_entry = true;
            }
            Err(e) => report(on_error, line_no, raw_line, e),
        }
    }

    if !intro.is_empty() {
        table.set_comment_intro(intro);
    }

    Ok(())
}

/// Reads `path` and parses it per [`parse_str`].
pub fn parse_file(
    path: impl AsRef<Path>,
    dialect: Dialect,
    table: &mut MountTable,
    on_error: Option<&ParseErrorCallback>,
) -> Result<(), MountError> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_str(&content, dialect, table, on_error)
}

fn parse_fstab_line(line: &str) -> Result<MountEntry, ParserError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ParserError::MountLine(format!(
            "expected at least 4 columns (source target fstype options), got {}: {line:?}",
            fields.len()
        )));
    }

    let source = decode_octal_escapes(fields[0]);
    let target = decode_octal_escapes(fields[1]);
    let fs_type = fields[2].to_string();
    let options = decode_octal_escapes(fields[3]);

    let source = if source == "none" { None } else { Some(source) };
    let mut entry = MountEntry::new(source, &target, fs_type, options);

    if let Some(freq) = fields.get(4) {
        if let Ok(freq) = freq.parse() {
            entry.set_freq(freq);
        }
    }
    if let Some(passno) = fields.get(5) {
        if let Ok(passno) = passno.parse() {
            entry.set_passno(passno);
        }
    }

    Ok(entry)
}

fn parse_mountinfo_line(line: &str) -> Result<MountEntry, ParserError> {
    let (left, right) = line.split_once(" - ").ok_or_else(|| {
        ParserError::MountLine(format!("missing '-' separator in mountinfo line: {line:?}"))
    })?;

    let left_fields: Vec<&str> = left.split_whitespace().collect();
    if left_fields.len() < 6 {
        return Err(ParserError::MountLine(format!(
            "expected at least 6 fields before the '-' separator, got {}: {line:?}",
            left_fields.len()
        )));
    }

    let mount_id: u32 = left_fields[0]
        .parse()
        .map_err(|_| ParserError::MountLine(format!("invalid mount id: {line:?}")))?;
    let parent_id: u32 = left_fields[1]
        .parse()
        .map_err(|_| ParserError::MountLine(format!("invalid parent id: {line:?}")))?;
    let devno: DeviceNumber = left_fields[2]
        .parse()
        .map_err(|e: ParserError| ParserError::MountLine(e.to_string()))?;
    let fs_root = decode_octal_escapes(left_fields[3]);
    let target = decode_octal_escapes(left_fields[4]);
    let vfs_options = left_fields[5].to_string();

    let optional_fields = if left_fields.len() > 6 {
        Some(left_fields[6..].join(" "))
    } else {
        None
    };

    let right_fields: Vec<&str> = right.split_whitespace().collect();
    if right_fields.len() < 3 {
        return Err(ParserError::MountLine(format!(
            "expected fstype, source, super-opts after '-', got {}: {line:?}",
            right_fields.len()
        )));
    }

    let fs_type = right_fields[0].to_string();
    let source = decode_octal_escapes(right_fields[1]);
    let source = if source == "none" { None } else { Some(source) };
    let super_opts = right_fields[2].to_string();

    let mut entry = MountEntry::new(source, &target, fs_type, vfs_options);
    entry.set_fs_options(super_opts);
    entry.set_mountinfo_fields(mount_id, parent_id, devno, fs_root, optional_fields);

    Ok(entry)
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fstab_parser_reads_a_basic_line() {
        let mut table = MountTable::new();
        parse_str(
            "/dev/sda1 / ext4 rw,relatime 0 1\n",
            Dialect::FsTab,
            &mut table,
            None,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        let entry = &table.entries()[0];
        assert_eq!(entry.source(), Some("/dev/sda1"));
        assert_eq!(entry.target().to_str(), Some("/"));
        assert_eq!(entry.fs_type(), "ext4");
        assert_eq!(entry.passno(), 1);
    }

    #[test]
    fn fstab_parser_decodes_octal_escapes_in_target() {
        let mut table = MountTable::new();
        parse_str(
            r"/dev/sda1 /mnt/my\040disk ext4 rw 0 0" ,
            Dialect::FsTab,
            &mut table,
            None,
        )
        .unwrap();

        assert_eq!(table.entries()[0].target().to_str(), Some("/mnt/my disk"));
    }

    #[test]
    fn fstab_parser_captures_leading_comments_as_intro() {
        let mut table = MountTable::new();
        parse_str(
            "# first comment\n# second comment\n/dev/sda1 / ext4 rw 0 1\n",
            Dialect::FsTab,
            &mut table,
            None,
        )
        .unwrap();

        assert_eq!(table.comment_intro(), Some("first comment\nsecond comment"));
    }

    #[test]
    fn fstab_parser_reports_unparsable_lines_through_callback() {
        use std::cell::RefCell;

        let errors = Rc::new(RefCell::new(Vec::new()));
        let errors_clone = errors.clone();
        let cb: ParseErrorCallback = Rc::new(move |line_no, line, _err| {
            errors_clone.borrow_mut().push((line_no, line.to_string()));
        });

        let mut table = MountTable::new();
        parse_str(
            "garbage line\n/dev/sda1 / ext4 rw 0 1\n",
            Dialect::FsTab,
            &mut table,
            Some(&cb),
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].0, 1);
    }

    #[test]
    fn mountinfo_parser_reads_a_line_with_no_optional_fields() {
        let mut table = MountTable::new();
        parse_str(
            "23 17 0:21 / /home rw,relatime - ext4 /dev/sda2 rw\n",
            Dialect::MountInfo,
            &mut table,
            None,
        )
        .unwrap();

        let entry = &table.entries()[0];
        assert_eq!(entry.mount_id(), Some(23));
        assert_eq!(entry.parent_id(), Some(17));
        assert_eq!(entry.devno(), Some(DeviceNumber::new(0, 21)));
        assert_eq!(entry.fs_root(), Some("/"));
        assert_eq!(entry.target().to_str(), Some("/home"));
        assert_eq!(entry.fs_type(), "ext4");
        assert_eq!(entry.source(), Some("/dev/sda2"));
        assert_eq!(entry.fs_options(), "rw");
    }

    #[test]
    fn mountinfo_parser_reads_optional_fields() {
        let mut table = MountTable::new();
        parse_str(
            "36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue\n",
            Dialect::MountInfo,
            &mut table,
            None,
        )
        .unwrap();

        let entry = &table.entries()[0];
        assert_eq!(entry.optional_fields(), Some("master:1"));
        assert_eq!(entry.target().to_str(), Some("/mnt2"));
    }

    #[test]
    fn mountinfo_parser_rejects_a_line_with_no_separator() {
        assert!(parse_mountinfo_line("23 17 0:21 / /home rw,relatime ext4 /dev/sda2 rw").is_err());
    }
}
