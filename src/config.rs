//! Configuration
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`STREAM_DEBUG_ENABLED`, `STREAM_DEBUG_MAX_MESSAGE_LENGTH`,
//!    `STREAM_DEBUG_MAX_TAG_LENGTH`)
//! 2. Config file (YAML, see [`DebugConfig::load`])
//! 3. Defaults

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DebugError, Result};

/// Maximum message length accepted by the default sink
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;

/// Tag length cap of legacy log sinks
pub const LEGACY_MAX_TAG_LENGTH: usize = 23;

pub const ENV_ENABLED: &str = "STREAM_DEBUG_ENABLED";
pub const ENV_MAX_MESSAGE_LENGTH: &str = "STREAM_DEBUG_MAX_MESSAGE_LENGTH";
pub const ENV_MAX_TAG_LENGTH: &str = "STREAM_DEBUG_MAX_TAG_LENGTH";

/// Instrumentation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    /// Initial state of the logging switch
    pub enabled: bool,

    /// Longest message (title + body) a single sink write may carry
    pub max_message_length: usize,

    /// Base tag cap; `None` when the sink has no tag length limit
    pub max_tag_length: Option<usize>,

    /// Frame selected from the call stack when an explicit tag is given
    pub frame_depth_with_tag: usize,

    /// Frame selected from the call stack when no explicit tag is given
    pub frame_depth_without_tag: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_tag_length: None,
            frame_depth_with_tag: 0,
            frame_depth_without_tag: 0,
        }
    }
}

impl DebugConfig {
    /// Defaults plus the 23 character tag cap of legacy sinks
    pub fn legacy() -> Self {
        Self {
            max_tag_length: Some(LEGACY_MAX_TAG_LENGTH),
            ..Self::default()
        }
    }

    /// Parse a YAML document and validate it
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error if the file exists but is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Apply `STREAM_DEBUG_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_ENABLED) {
            self.enabled = parse_bool(ENV_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_MESSAGE_LENGTH) {
            self.max_message_length = parse_usize(ENV_MAX_MESSAGE_LENGTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_TAG_LENGTH) {
            let raw = raw.trim();
            self.max_tag_length = if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_usize(ENV_MAX_TAG_LENGTH, raw)?)
            };
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the chunker cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_message_length == 0 {
            return Err(DebugError::Config {
                reason: "max_message_length must be greater than 0".into(),
            });
        }
        if self.max_tag_length == Some(0) {
            return Err(DebugError::Config {
                reason: "max_tag_length must be greater than 0 (omit it to disable truncation)"
                    .into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DebugError::Config {
            reason: format!("{key}: expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|e| DebugError::Config {
        reason: format!("{key}: {e}"),
    })
}
