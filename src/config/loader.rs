//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::DaemonConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// True when the policy path was never given, which is a usage mistake.
    pub fn is_missing_policy(&self) -> bool {
        matches!(
            self,
            ConfigError::Validation(errors) if errors.contains(&ValidationError::MissingPolicyPath)
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub policy_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_file: Option<PathBuf>,
    pub detach: bool,
}

impl Overrides {
    /// Apply these overrides on top of `config`.
    pub fn apply(self, config: &mut DaemonConfig) {
        if let Some(path) = self.policy_path {
            config.policy.path = Some(path);
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(log_file) = self.log_file {
            config.observability.log_file = Some(log_file);
        }
        if self.detach {
            config.daemon.detach = true;
        }
    }
}

/// Parse a TOML document. No semantic validation.
pub fn parse_config(content: &str) -> Result<DaemonConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read and parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Build the effective configuration: file (or defaults), then overrides,
/// then validation.
pub fn resolve_config(
    file: Option<&Path>,
    overrides: Overrides,
) -> Result<DaemonConfig, ConfigError> {
    let mut config = match file {
        Some(path) => load_config(path)?,
        None => DaemonConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_partial_file_with_defaults() {
        let config = parse_config(
            r#"
            [policy]
            path = "/srv/crossdomain.xml"

            [listener]
            port = 8430
            "#,
        )
        .unwrap();

        assert_eq!(config.policy.path.as_deref(), Some(Path::new("/srv/crossdomain.xml")));
        assert_eq!(config.listener.port, 8430);
        assert_eq!(config.listener.backlog, 5);
        assert_eq!(config.listener.address, "0.0.0.0");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_config("[listener\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = parse_config("[listener]\nport = \"eight\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [policy]
            path = "/from/file.xml"

            [listener]
            port = 1000

            [observability]
            log_file = "/var/log/a.log"
            "#
        )
        .unwrap();

        let config = resolve_config(
            Some(file.path()),
            Overrides {
                policy_path: Some("/from/cli.xml".into()),
                port: Some(2000),
                log_file: None,
                detach: false,
            },
        )
        .unwrap();

        assert_eq!(config.policy.path.as_deref(), Some(Path::new("/from/cli.xml")));
        assert_eq!(config.listener.port, 2000);
        assert_eq!(config.observability.log_file.as_deref(), Some(Path::new("/var/log/a.log")));
        assert!(!config.daemon.detach);
    }

    #[test]
    fn log_file_does_not_imply_detach() {
        let config = resolve_config(
            None,
            Overrides {
                policy_path: Some("/p.xml".into()),
                log_file: Some("/tmp/policyd.log".into()),
                ..Overrides::default()
            },
        )
        .unwrap();

        assert!(config.observability.log_file.is_some());
        assert!(!config.daemon.detach);
    }

    #[test]
    fn missing_policy_is_a_usage_error() {
        let err = resolve_config(None, Overrides::default()).unwrap_err();
        assert!(err.is_missing_policy());
        assert_eq!(err.to_string(), "missing required policy file argument -f");
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let err = resolve_config(Some(absent.as_path()), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(!err.is_missing_policy());
    }
}
