//! `lockorder.toml` loading.
//!
//! ```toml
//! [scan]
//! extensions = ["java"]
//!
//! [trace]
//! detectors = ["synchronized"]
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! tracer = "debug"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracer::TraceConfig;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "lockorder.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub trace: TraceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions parsed when scanning a directory.
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            extensions: vec!["java".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for every target without an entry in `modules`.
    pub default: String,
    /// Per-target overrides, e.g. `tracer = "trace"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            default: "warn".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `explicit` if given, else `lockorder.toml` when present, else
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Config::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Config::parse(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracer::DetectorKind;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.scan.extensions, vec!["java"]);
        assert_eq!(config.trace.detectors, vec![DetectorKind::Synchronized]);
        assert_eq!(config.logging.default, "warn");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
[scan]
extensions = ["java", "jav"]

[trace]
detectors = []

[logging]
default = "info"

[logging.modules]
tracer = "trace"
"#,
        )
        .unwrap();
        assert_eq!(config.scan.extensions, vec!["java", "jav"]);
        assert!(config.trace.detectors.is_empty());
        assert_eq!(config.logging.default, "info");
        assert_eq!(config.logging.modules["tracer"], "trace");
    }

    #[test]
    fn unknown_detector_is_rejected() {
        assert!(Config::parse("[trace]\ndetectors = [\"semaphore\"]\n").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scan]\nextensions = 3\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }
}
