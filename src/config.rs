// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration-file reader.
//!
//! Parses the trivial `key=value` configuration file recognized keys and environment overrides
//! into an immutable snapshot, re-read on demand and shared by reference between probers and
//! tables.

// From dependency library
use thiserror::Error;

// From standard library
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default config file path, mirroring `libblkid`'s own `/etc/blkid.conf`.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/diskid.conf";
/// Default cache file path.
pub const DEFAULT_CACHE_FILE: &str = "/run/diskid/diskid.tab";

/// Environment variable naming an alternative config file.
pub const ENV_CONFIG_FILE: &str = "DISKID_CONF";
/// Environment variable naming an alternative cache file.
pub const ENV_CACHE_FILE: &str = "DISKID_CACHE";

/// Methods by which a tagged device spec (`LABEL=`, `UUID=`) may be evaluated, per the
/// `EVALUATE=` configuration key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvaluationMethod {
    /// Resolve tags by reading `/dev/disk/by-*` udev symlinks.
    Udev,
    /// Resolve tags by scanning devices directly.
    Scan,
}

/// `config`-module runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed configuration line {line_no}: {line:?}")]
    MalformedLine { line_no: usize, line: String },
}

/// An immutable snapshot of `diskid`'s configuration.
/// Probers and tables hold a reference-counted [`Arc`] to one of these; re-reading the file
/// produces a brand new snapshot rather than mutating an existing one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    cache_file: Option<PathBuf>,
    evaluate: Vec<EvaluationMethod>,
    send_uevent: bool,
    probe_off: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: Some(PathBuf::from(DEFAULT_CACHE_FILE)),
            evaluate: vec![EvaluationMethod::Udev, EvaluationMethod::Scan],
            send_uevent: true,
            probe_off: Vec::new(),
        }
    }
}

impl Config {
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    pub fn evaluation_methods(&self) -> &[EvaluationMethod] {
        &self.evaluate
    }

    pub fn send_uevent(&self) -> bool {
        self.send_uevent
    }

    /// Names of descriptors disabled by the `PROBE_OFF` configuration key.
    pub fn probe_off(&self) -> &[String] {
        &self.probe_off
    }

    /// Reads the configuration file named by the `DISKID_CONF` environment variable, falling
    /// back to [`DEFAULT_CONFIG_FILE`]. Returns the default configuration, unmodified, if no
    /// config file exists at the resolved path — matching `libblkid`'s "missing config file is
    /// not an error" behavior.
    pub fn read() -> Result<Arc<Config>, ConfigError> {
        let path = env::var_os(ENV_CONFIG_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::read_from(&path)
    }

    /// Reads the configuration file at `path`. Returns the default configuration if `path` does
    /// not exist.
    pub fn read_from(path: &Path) -> Result<Arc<Config>, ConfigError> {
        log::debug!("Config::read_from reading configuration file {:?}", path);

        let mut config = Config::default();

        if let Some(cache_env) = env::var_os(ENV_CACHE_FILE) {
            config.cache_file = Some(PathBuf::from(cache_env));
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "Config::read_from no configuration file at {:?}, using defaults",
                    path
                );
                return Ok(Arc::new(config));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        for (line_no, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or(ConfigError::MalformedLine {
                line_no: line_no + 1,
                line: line.to_string(),
            })?;
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            match key {
                "CACHE_FILE" => {
                    config.cache_file = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(PathBuf::from(value))
                    };
                }
                "EVALUATE" => {
                    config.evaluate = value
                        .split(',')
                        .filter_map(|m| match m.trim() {
                            "udev" => Some(EvaluationMethod::Udev),
                            "scan" => Some(EvaluationMethod::Scan),
                            _ => None,
                        })
                        .collect();
                }
                "SEND_UEVENT" => {
                    config.send_uevent = value.eq_ignore_ascii_case("yes");
                }
                "PROBE_OFF" => {
                    config.probe_off = value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                _unknown => {
                    log::debug!(
                        "Config::read_from ignoring unknown configuration key {:?}",
                        key
                    );
                }
            }
        }

        // `DISKID_CACHE` always takes precedence over the config file's `CACHE_FILE`.
        if let Some(cache_env) = env::var_os(ENV_CACHE_FILE) {
            config.cache_file = Some(PathBuf::from(cache_env));
        }

        Ok(Arc::new(config))
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn config_defaults_when_file_is_missing() {
        let config = Config::read_from(Path::new("/nonexistent/diskid.conf")).unwrap();
        assert_eq!(config.cache_file(), Some(Path::new(DEFAULT_CACHE_FILE)));
        assert!(config.send_uevent());
    }

    #[test]
    fn config_parses_recognized_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "CACHE_FILE=/var/cache/diskid.tab").unwrap();
        writeln!(file, "EVALUATE=udev").unwrap();
        writeln!(file, "SEND_UEVENT=no").unwrap();
        writeln!(file, "PROBE_OFF=ext2,ext3").unwrap();
        file.flush().unwrap();

        let config = Config::read_from(file.path()).unwrap();
        assert_eq!(
            config.cache_file(),
            Some(Path::new("/var/cache/diskid.tab"))
        );
        assert_eq!(config.evaluation_methods(), &[EvaluationMethod::Udev]);
        assert!(!config.send_uevent());
        assert_eq!(config.probe_off(), &["ext2".to_string(), "ext3".to_string()]);
    }

    #[test]
    fn config_rejects_a_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not-a-key-value-line").unwrap();
        file.flush().unwrap();

        assert!(Config::read_from(file.path()).is_err());
    }
}
