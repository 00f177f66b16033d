use crate::core::matcher::Threshold;
use crate::core::runs::{EndConvention, SnapshotPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 参考图默认按 1/8 尺寸加载
pub const DEFAULT_REFERENCE_REDUCTION: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// 扫描配置，扫描开始前确定，之后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub threshold: Threshold,
    pub end_convention: EndConvention,
    pub snapshot_policy: SnapshotPolicy,
    /// Frames scored in parallel per batch; 1 scans strictly sequentially.
    pub batch_size: usize,
    pub reference_reduction: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            end_convention: EndConvention::default(),
            snapshot_policy: SnapshotPolicy::default(),
            batch_size: num_cpus::get().max(1),
            reference_reduction: DEFAULT_REFERENCE_REDUCTION,
        }
    }
}

impl ScanConfig {
    pub fn strict() -> Self {
        Self {
            threshold: Threshold::new(0.8).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn lenient() -> Self {
        Self {
            threshold: Threshold::new(0.45).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: ScanConfig = serde_json::from_str(text)?;
        config.batch_size = config.batch_size.max(1);
        config.reference_reduction = config.reference_reduction.max(1);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.threshold.value(), 0.6);
        assert_eq!(config.end_convention, EndConvention::FirstNonMatching);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::Start);
        assert!(config.batch_size >= 1);
        assert_eq!(config.reference_reduction, 8);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ScanConfig::strict().threshold.value(), 0.8);
        assert_eq!(ScanConfig::lenient().threshold.value(), 0.45);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = ScanConfig::from_json(
            r#"{"threshold": 0.7, "end_convention": "last-matching", "batch_size": 0}"#,
        )
        .unwrap();

        assert_eq!(config.threshold.value(), 0.7);
        assert_eq!(config.end_convention, EndConvention::LastMatching);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::Start);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.reference_reduction, 8);
    }

    #[test]
    fn test_json_rejects_out_of_range_threshold() {
        assert!(matches!(
            ScanConfig::from_json(r#"{"threshold": 1.2}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{"snapshot_policy": "start-and-end"}"#).unwrap();

        let config = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.snapshot_policy, SnapshotPolicy::StartAndEnd);

        assert!(matches!(
            ScanConfig::from_json_file(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
