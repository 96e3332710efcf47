//! Coordinator configuration.
//!
//! A plain struct with defaults, optionally loaded from TOML. Every field may be omitted.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Lower bound for the snapshot interval.
pub const MIN_SNAPSHOT_INTERVAL_SECS: u64 = 1;

/// Periodic backup ("snapshot mode") settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Whether snapshot backups are taken at all.
    pub enabled: bool,
    /// Interval between snapshot ticks, in seconds. Clamped to [`MIN_SNAPSHOT_INTERVAL_SECS`].
    pub interval_secs: u64,
    /// Directory receiving backup files. `None` disables writing even when enabled.
    pub backup_dir: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 7,
            backup_dir: None,
        }
    }
}

impl SnapshotConfig {
    /// The effective tick interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_SNAPSHOT_INTERVAL_SECS))
    }
}

/// Policy for reacting to files changed outside the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileDetection {
    /// Check file states at all.
    pub enabled: bool,
    /// Reload clean buffers without prompting.
    pub auto_update: bool,
    /// Move the caret to the end of the document after a reload.
    pub go_to_end: bool,
}

impl Default for FileDetection {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_update: false,
            go_to_end: false,
        }
    }
}

/// Top-level configuration handed to the coordinator at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Tab width in columns.
    pub tab_width: usize,
    /// Indent with tab characters instead of spaces.
    pub use_tabs: bool,
    /// Snapshot backups.
    pub snapshot: SnapshotConfig,
    /// External change detection.
    pub file_detection: FileDetection,
    /// Largest input (in bytes) handed to the statistical encoding detector.
    pub encoding_detection_cap: usize,
    /// Documents at least this large use the parallel character count.
    pub parallel_count_threshold: usize,
    /// Encoding label used when detection is skipped.
    pub fallback_encoding: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            use_tabs: true,
            snapshot: SnapshotConfig::default(),
            file_detection: FileDetection::default(),
            encoding_detection_cap: 64 * 1024,
            parallel_count_threshold: 1024 * 1024,
            fallback_encoding: "windows-1252".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        Ok(config)
    }

    /// The fallback encoding, resolving unknown labels to windows-1252.
    pub fn fallback_encoding(&self) -> &'static encoding_rs::Encoding {
        encoding_rs::Encoding::for_label(self.fallback_encoding.as_bytes())
            .unwrap_or(encoding_rs::WINDOWS_1252)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CoordinatorConfig::from_toml_str(
            r#"
            tab_width = 8

            [snapshot]
            enabled = true
            interval_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.tab_width, 8);
        assert!(config.use_tabs);
        assert!(config.snapshot.enabled);
        assert_eq!(config.snapshot.interval(), Duration::from_secs(1));
        assert_eq!(config.encoding_detection_cap, 64 * 1024);
    }

    #[test]
    fn bad_toml_is_reported() {
        assert!(CoordinatorConfig::from_toml_str("tab_width = \"wide\"").is_err());
    }

    #[test]
    fn unknown_fallback_label() {
        let config = CoordinatorConfig {
            fallback_encoding: "klingon".into(),
            ..Default::default()
        };
        assert_eq!(config.fallback_encoding(), encoding_rs::WINDOWS_1252);
    }
}
