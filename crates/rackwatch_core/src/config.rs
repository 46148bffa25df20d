//! Threshold Configuration
//!
//! Per-metric threshold bounds, the hardware-type whitelist and the severity
//! banding policy. Loaded once at startup from a JSON document and read-only
//! for the process lifetime.
//!
//! Document schema:
//! ```json
//! {
//!   "hardware_types": ["Server", "Switch", "Storage", "Disk"],
//!   "thresholds": {
//!     "temperature":  { "max": 40.0 },
//!     "cpu_usage":    { "max": 90.0 },
//!     "memory_usage": { "max": 85.0, "min": 5.0 }
//!   },
//!   "severity": { "critical_over_pct": 20.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Default configuration path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "rackwatch.json";

/// The metrics every diagnostic reading carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    CpuUsage,
    MemoryUsage,
}

impl Metric {
    /// All metrics, in canonical order.
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::CpuUsage, Metric::MemoryUsage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::CpuUsage => "cpu_usage",
            Metric::MemoryUsage => "memory_usage",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold bound for one metric. `max` is always required; `min` is
/// optional (e.g. a floor on fan-cooled intake temperature).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bound {
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

/// Severity banding policy.
///
/// A breach whose deviation is within `critical_over_pct` percent of the
/// breached bound classifies as Warning; anything beyond is Critical. The
/// boundary itself is still Warning. E.g. with the default 20.0, a reading of
/// 96 against a max of 80 is exactly 20% over and stays a Warning, while 97
/// is Critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub critical_over_pct: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self { critical_over_pct: 20.0 }
    }
}

/// Loaded, validated threshold configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Hardware types the registry accepts.
    pub hardware_types: Vec<String>,

    /// Per-metric bounds. Validation guarantees every [`Metric`] has an entry.
    pub thresholds: BTreeMap<Metric, Bound>,

    /// Severity banding policy.
    #[serde(default)]
    pub severity: SeverityPolicy,
}

impl ThresholdConfig {
    /// Load and validate configuration from a JSON file.
    ///
    /// Fails with [`Error::Config`] if the file is unreadable, malformed,
    /// missing a required metric, or carries bounds that are negative,
    /// non-finite, or have `min >= max`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: ThresholdConfig = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        info!(path = %path.display(), "loaded threshold configuration");
        Ok(config)
    }

    /// Load configuration, writing the default document first if the file
    /// does not exist yet. A malformed existing file is still fatal.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let default = Self::default();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, serde_json::to_string_pretty(&default)?)?;
            info!(path = %path.display(), "wrote default threshold configuration");
            return Ok(default);
        }
        Self::load(path)
    }

    /// Whether `hardware_type` is accepted by the registry.
    pub fn is_valid_type(&self, hardware_type: &str) -> bool {
        self.hardware_types.iter().any(|t| t == hardware_type)
    }

    /// Bound for one metric. Validation guarantees `Some` for every metric
    /// once a config has loaded; the `Option` exists for callers probing a
    /// partially built config in tests.
    pub fn threshold_for(&self, metric: Metric) -> Option<&Bound> {
        self.thresholds.get(&metric)
    }

    fn validate(&self) -> Result<()> {
        if self.hardware_types.is_empty() {
            return Err(Error::Config("hardware_types must not be empty".into()));
        }
        for metric in Metric::ALL {
            let bound = self
                .thresholds
                .get(&metric)
                .ok_or_else(|| Error::Config(format!("missing threshold for {metric}")))?;
            if !bound.max.is_finite() || bound.max < 0.0 {
                return Err(Error::Config(format!(
                    "threshold {metric}.max must be a non-negative number, got {}",
                    bound.max
                )));
            }
            if let Some(min) = bound.min {
                if !min.is_finite() || min < 0.0 {
                    return Err(Error::Config(format!(
                        "threshold {metric}.min must be a non-negative number, got {min}"
                    )));
                }
                if min >= bound.max {
                    return Err(Error::Config(format!(
                        "threshold {metric}.min ({min}) must be below max ({})",
                        bound.max
                    )));
                }
            }
        }
        if !self.severity.critical_over_pct.is_finite() || self.severity.critical_over_pct < 0.0 {
            return Err(Error::Config(format!(
                "severity.critical_over_pct must be a non-negative number, got {}",
                self.severity.critical_over_pct
            )));
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    /// The stock data-center profile: generic rack hardware with the usual
    /// temperature/CPU/memory ceilings.
    fn default() -> Self {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(Metric::Temperature, Bound { max: 40.0, min: None });
        thresholds.insert(Metric::CpuUsage, Bound { max: 90.0, min: None });
        thresholds.insert(Metric::MemoryUsage, Bound { max: 85.0, min: None });
        Self {
            hardware_types: vec![
                "Server".to_string(),
                "Switch".to_string(),
                "Storage".to_string(),
                "Disk".to_string(),
            ],
            thresholds,
            severity: SeverityPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ThresholdConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_valid_type("Server"));
        assert!(!config.is_valid_type("Toaster"));
        assert_eq!(config.threshold_for(Metric::Temperature).unwrap().max, 40.0);
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "hardware_types": ["Server"],
                "thresholds": {
                    "temperature": { "max": 80.0 },
                    "cpu_usage": { "max": 90.0 },
                    "memory_usage": { "max": 85.0, "min": 5.0 }
                }
            }"#,
        )
        .unwrap();

        let config = ThresholdConfig::load(&path).unwrap();
        assert_eq!(config.hardware_types, vec!["Server"]);
        assert_eq!(config.threshold_for(Metric::MemoryUsage).unwrap().min, Some(5.0));
        // Severity policy falls back to the default when absent.
        assert_eq!(config.severity.critical_over_pct, 20.0);
    }

    #[test]
    fn test_load_rejects_missing_metric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "hardware_types": ["Server"],
                "thresholds": { "temperature": { "max": 80.0 } }
            }"#,
        )
        .unwrap();

        let err = ThresholdConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
        assert!(err.to_string().contains("cpu_usage"));
    }

    #[test]
    fn test_load_rejects_negative_threshold() {
        let mut config = ThresholdConfig::default();
        config
            .thresholds
            .insert(Metric::CpuUsage, Bound { max: -1.0, min: None });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_min_above_max() {
        let mut config = ThresholdConfig::default();
        config
            .thresholds
            .insert(Metric::Temperature, Bound { max: 40.0, min: Some(50.0) });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ThresholdConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(ThresholdConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ThresholdConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.hardware_types.len(), 4);

        // Second call reads the file it wrote.
        let reloaded = ThresholdConfig::load_or_init(&path).unwrap();
        assert_eq!(reloaded.hardware_types, config.hardware_types);
    }
}
