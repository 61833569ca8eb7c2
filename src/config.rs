// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Dumper configuration: where the register lives and where captures go.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::capture::kmsg::KMSG_CAPACITY;
use crate::register::REGISTER_WIDTH;

/// CMOS offset used when nothing else is configured.
pub const DEFAULT_CMOS_OFFSET: u8 = 0x70;
/// Capture directory used when nothing else is configured.
pub const DEFAULT_ARTIFACT_DIR: &str = "/var/log/rebootlog";

/// Errors produced while loading or validating a [`DumperConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("register width {0} unsupported; the reboot register is {REGISTER_WIDTH} bytes")]
    UnsupportedRegisterWidth(u8),
    #[error("capture buffer must hold at least one byte")]
    EmptyCaptureBuffer,
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialisation parameters for the reboot dumper.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumperConfig {
    /// Byte offset of the reason register in the CMOS bank.
    pub register_offset: u8,
    /// Register width in bytes. Only 2 is accepted.
    pub register_len: u8,
    /// Directory receiving `oops` / `panic` captures.
    pub artifact_dir: PathBuf,
    /// Size of the preallocated capture buffer.
    pub capture_capacity: usize,
    /// Whether an OOM ends the boot. Without it OOM notifications are ignored.
    pub panic_on_oom: bool,
}

impl Default for DumperConfig {
    fn default() -> Self {
        Self {
            register_offset: std::env::var("REBOOTLOG_CMOS_OFFSET")
                .ok()
                .and_then(|v| parse_offset(&v))
                .unwrap_or(DEFAULT_CMOS_OFFSET),
            register_len: REGISTER_WIDTH,
            artifact_dir: std::env::var("REBOOTLOG_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
            capture_capacity: KMSG_CAPACITY,
            panic_on_oom: true,
        }
    }
}

impl DumperConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.register_len != REGISTER_WIDTH {
            return Err(ConfigError::UnsupportedRegisterWidth(self.register_len));
        }
        if self.capture_capacity == 0 {
            return Err(ConfigError::EmptyCaptureBuffer);
        }
        Ok(())
    }
}

/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_offset(text: &str) -> Option<u8> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = DumperConfig::from_toml_str(
            r#"
            register_offset = 0x40
            artifact_dir = "/mnt/mtd/kmsg"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.register_offset, 0x40);
        assert_eq!(cfg.artifact_dir, PathBuf::from("/mnt/mtd/kmsg"));
        assert_eq!(cfg.register_len, REGISTER_WIDTH);
        assert_eq!(cfg.capture_capacity, KMSG_CAPACITY);
        assert!(cfg.panic_on_oom);
    }

    #[test]
    fn wrong_register_width_is_rejected() {
        let err = DumperConfig::from_toml_str("register_len = 4").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedRegisterWidth(4)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            DumperConfig::from_toml_str("register_offset = \"seventy\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn offsets_accept_hex_and_decimal() {
        assert_eq!(parse_offset("0x70"), Some(0x70));
        assert_eq!(parse_offset(" 112 "), Some(112));
        assert_eq!(parse_offset("0x100"), None);
        assert_eq!(parse_offset("cmos"), None);
    }
}
