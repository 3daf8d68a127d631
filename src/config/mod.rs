//! Wrapper configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! the `DUPLICITY_PATH` and `DUPLICITY_TIMEOUT` environment variables.
//!
//! ```toml
//! executable = "/usr/local/bin/duplicity"
//! timeout = "2h 30m"
//! archive_dir = "/var/cache/duplicity"
//! verbosity = "info"
//! ```

use directories::ProjectDirs;
use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::duplicity::DEFAULT_EXECUTABLE;
use crate::error::{DuplicityError, ErrorCode, Result};
use crate::options::{CommonOptions, Verbosity};

pub const ENV_EXECUTABLE: &str = "DUPLICITY_PATH";
pub const ENV_TIMEOUT: &str = "DUPLICITY_TIMEOUT";

/// Location of the per-user config file, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "duplicity-wrapper", "dupwrap")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WrapperConfig {
    /// Path of the duplicity executable.
    pub executable: String,
    /// Default per-call timeout. Absent means calls may run forever.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub archive_dir: Option<PathBuf>,
    pub verbosity: Option<Verbosity>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            timeout: None,
            archive_dir: None,
            verbosity: None,
        }
    }
}

impl WrapperConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            DuplicityError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                format!("Invalid configuration: {}", e.message()),
            )
            .with_source(e)
        })
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        config.with_env_overrides(&std::env::vars().collect())
    }

    fn read(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            DuplicityError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Cannot read {}: {}", path.display(), e),
            )
            .with_source(e)
        })?;
        Self::from_toml_str(&content)
    }

    /// `DUPLICITY_TIMEOUT` accepts whole seconds or a humantime string.
    pub fn with_env_overrides(mut self, env: &HashMap<String, String>) -> Result<Self> {
        if let Some(path) = env.get(ENV_EXECUTABLE).filter(|v| !v.is_empty()) {
            self.executable = path.clone();
        }

        if let Some(raw) = env.get(ENV_TIMEOUT).filter(|v| !v.trim().is_empty()) {
            let raw = raw.trim();
            let timeout = match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => humantime::parse_duration(raw).map_err(|e| {
                    DuplicityError::config_with_code(
                        ErrorCode::CONFIG_PARSE_ERROR,
                        format!("Invalid {} '{}': {}", ENV_TIMEOUT, raw, e),
                    )
                })?,
            };
            self.timeout = (!timeout.is_zero()).then_some(timeout);
        }

        Ok(self)
    }

    /// Fill unset request fields from the configured defaults.
    pub fn apply_defaults(&self, common: &mut CommonOptions) {
        if common.timeout.is_none() {
            common.timeout = self.timeout;
        }
        if common.archive_dir.is_none() {
            common.archive_dir = self.archive_dir.clone();
        }
        if common.verbosity.is_none() {
            common.verbosity = self.verbosity.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = WrapperConfig::default();
        assert_eq!(config.executable, "/usr/bin/duplicity");
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_parse_toml() {
        let config = WrapperConfig::from_toml_str(
            r#"
executable = "/opt/duplicity/bin/duplicity"
timeout = "1h 30m"
archive_dir = "/var/cache/duplicity"
verbosity = 5
"#,
        )
        .unwrap();

        assert_eq!(config.executable, "/opt/duplicity/bin/duplicity");
        assert_eq!(config.timeout, Some(Duration::from_secs(5400)));
        assert_eq!(config.archive_dir, Some(PathBuf::from("/var/cache/duplicity")));
        assert_eq!(config.verbosity, Some(Verbosity::Level(5)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WrapperConfig::from_toml_str("verbosity = \"info\"\n").unwrap();
        assert_eq!(config.executable, DEFAULT_EXECUTABLE);
        assert_eq!(config.verbosity, Some(Verbosity::Word("info".into())));
    }

    #[test]
    fn test_invalid_toml() {
        let err = WrapperConfig::from_toml_str("timeout = \"soon\"\n").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);

        let err = WrapperConfig::from_toml_str("unknown = 1\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            (ENV_EXECUTABLE.to_string(), "/tmp/fake-duplicity".to_string()),
            (ENV_TIMEOUT.to_string(), "90".to_string()),
        ]);
        let config = WrapperConfig::default().with_env_overrides(&env).unwrap();
        assert_eq!(config.executable, "/tmp/fake-duplicity");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));

        let env = HashMap::from([(ENV_TIMEOUT.to_string(), "2m".to_string())]);
        let config = WrapperConfig::default().with_env_overrides(&env).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));

        let env = HashMap::from([(ENV_TIMEOUT.to_string(), "later".to_string())]);
        assert!(WrapperConfig::default().with_env_overrides(&env).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout = \"10s\"").unwrap();

        let config = WrapperConfig::read(file.path()).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = WrapperConfig::load(Some(Path::new("/no/such/dupwrap.toml"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let config = WrapperConfig {
            timeout: Some(Duration::from_secs(60)),
            verbosity: Some(Verbosity::Level(4)),
            ..Default::default()
        };
        let mut common = CommonOptions::new("file://out");
        common.verbosity = Some(Verbosity::Level(9));
        config.apply_defaults(&mut common);

        assert_eq!(common.timeout, Some(Duration::from_secs(60)));
        assert_eq!(common.verbosity, Some(Verbosity::Level(9)));
        assert_eq!(common.archive_dir, None);
    }
}
