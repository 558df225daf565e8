use std::env;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::probe_config::ProbeSettings;

const DEFAULT_CONFIG_FILE: &str = "probe.yml";
const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
const TIMEOUT_ENV: &str = "PROBE_TIMEOUT_SECONDS";
const INSECURE_ENV: &str = "PROBE_INSECURE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid YAML in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

pub struct AppConfig {
    pub settings: ProbeSettings,
    /// The file the settings were read from, if any.
    pub config_file: Option<PathBuf>,
}

/// Load the probe settings from a YAML file and environment variables.
///
/// The file is `explicit` if given, else `CONFIG_FILE`, else `probe.yml` in the
/// working directory. Only the implicit default may be missing. A `.env` file is
/// honoured, and `PROBE_TIMEOUT_SECONDS` / `PROBE_INSECURE` override the file.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match env::var(CONFIG_FILE_ENV) {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        },
    };

    let (settings, config_file) = match std::fs::read_to_string(&path) {
        Ok(contents) => (parse_settings(&path, &contents)?, Some(path)),
        Err(e) if !required && e.kind() == io::ErrorKind::NotFound => {
            (ProbeSettings::default(), None)
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let settings = apply_env_overrides(settings, |key| env::var(key).ok())?;
    Ok(AppConfig {
        settings,
        config_file,
    })
}

fn parse_settings(path: &Path, contents: &str) -> Result<ProbeSettings, ConfigError> {
    // An empty file deserializes to unit, not to an empty mapping.
    if contents.trim().is_empty() {
        return Ok(ProbeSettings::default());
    }
    serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(
    mut settings: ProbeSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ProbeSettings, ConfigError> {
    if let Some(value) = lookup(TIMEOUT_ENV) {
        settings.timeout_seconds = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: TIMEOUT_ENV,
            value: value.clone(),
        })?;
    }

    if let Some(value) = lookup(INSECURE_ENV) {
        settings.accept_invalid_certs = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: INSECURE_ENV,
                    value,
                });
            }
        };
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let settings = ProbeSettings {
            timeout_seconds: 30,
            ..ProbeSettings::default()
        };
        let settings = apply_env_overrides(
            settings,
            lookup(&[(TIMEOUT_ENV, "4"), (INSECURE_ENV, "TRUE")]),
        )
        .unwrap();
        assert_eq!(settings.timeout_seconds, 4);
        assert!(settings.accept_invalid_certs);
    }

    #[test]
    fn test_no_env_keeps_settings() {
        let settings = apply_env_overrides(ProbeSettings::default(), lookup(&[])).unwrap();
        assert_eq!(settings, ProbeSettings::default());
    }

    #[test]
    fn test_invalid_env_value() {
        let err = apply_env_overrides(ProbeSettings::default(), lookup(&[(TIMEOUT_ENV, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: TIMEOUT_ENV, .. }));
    }

    #[test]
    fn test_empty_file_is_default() {
        let settings = parse_settings(Path::new("probe.yml"), "\n").unwrap();
        assert_eq!(settings, ProbeSettings::default());
    }

    #[test]
    fn test_bad_yaml_names_the_file() {
        let err = parse_settings(Path::new("broken.yml"), "timeout_seconds: [").unwrap_err();
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/alpnprobe.yml"))).err().unwrap();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
