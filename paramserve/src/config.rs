use resolver::config::{Config as ResolverConfig, Mode, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            sentry_dsn: None,
        }
    }
}

fn default_level() -> String {
    "info".into()
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Problems found while loading that did not stop startup. Logged once
    /// logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid boolean {value:?} for {name}")]
    InvalidFlag { name: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Reads the optional config file, applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.resolver.validate()?;
        Ok(config)
    }

    /// `AWS_REGION` sets the store region. `DEBUG` is lenient and only
    /// warns about a bad value, `SINGLE_KEY_MODE` is strict. Empty variables
    /// count as unset.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(region) = lookup("AWS_REGION") {
            self.resolver.parameter_store.region = region;
        }

        if let Some(value) = lookup("DEBUG") {
            match parse_bool(&value) {
                Some(debug) => self.resolver.debug = debug,
                None => {
                    self.resolver.debug = false;
                    self.warnings
                        .push(format!("ignoring invalid boolean {value:?} for DEBUG"));
                }
            }
        }

        if let Some(value) = lookup("SINGLE_KEY_MODE") {
            match parse_bool(&value) {
                Some(true) => self.resolver.mode = Mode::SingleKey,
                Some(false) => self.resolver.mode = Mode::MultiKey,
                None => {
                    return Err(ConfigError::InvalidFlag {
                        name: "SINGLE_KEY_MODE",
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                level: warn
                sentry_dsn: https://key@sentry.example.com/1
            resolver:
                listener:
                    host: 127.0.0.1
                    port: 9000
                parameter_store:
                    region: eu-west-1
                    timeout_ms: 3000
                mode: single_key
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level, "warn");
        assert_eq!(
            logging.sentry_dsn.as_deref(),
            Some("https://key@sentry.example.com/1")
        );
        assert_eq!(config.resolver.listener.port, 9000);
        assert_eq!(config.resolver.parameter_store.region, "eu-west-1");
        assert_eq!(config.resolver.parameter_store.timeout_ms, Some(3000));
        assert_eq!(config.resolver.mode, Mode::SingleKey);
        assert!(!config.resolver.debug);
    }

    #[test]
    fn logging_level_defaults_to_info() {
        let tmp = write_tmp_file("logging:\n    sentry_dsn: https://key@sentry.example.com/1\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert_eq!(config.common.logging.expect("logging config").level, "info");
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/paramserve.yaml"));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn invalid_yaml() {
        let tmp = write_tmp_file("resolver:\n    mode: both\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("AWS_REGION", "us-east-1"),
                ("DEBUG", "T"),
                ("SINGLE_KEY_MODE", "1"),
            ]))
            .expect("apply env");

        assert_eq!(config.resolver.parameter_store.region, "us-east-1");
        assert!(config.resolver.debug);
        assert_eq!(config.resolver.mode, Mode::SingleKey);
        assert!(config.warnings.is_empty());
        assert!(config.resolver.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let tmp = write_tmp_file("resolver:\n    mode: single_key\n    debug: true\n");
        let mut config = Config::from_file(tmp.path()).expect("load config");
        config
            .apply_env(env(&[("SINGLE_KEY_MODE", "false"), ("DEBUG", "0")]))
            .expect("apply env");

        assert_eq!(config.resolver.mode, Mode::MultiKey);
        assert!(!config.resolver.debug);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let tmp = write_tmp_file(
            "resolver:\n    mode: single_key\n    debug: true\n    parameter_store:\n        region: eu-west-1\n",
        );
        let mut config = Config::from_file(tmp.path()).expect("load config");
        config
            .apply_env(env(&[("AWS_REGION", ""), ("DEBUG", ""), ("SINGLE_KEY_MODE", "")]))
            .expect("apply env");

        assert_eq!(config.resolver.parameter_store.region, "eu-west-1");
        assert!(config.resolver.debug);
        assert_eq!(config.resolver.mode, Mode::SingleKey);
        assert!(config.warnings.is_empty());
        assert!(config.resolver.validate().is_ok());
    }

    #[test]
    fn invalid_debug_is_a_warning() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("DEBUG", "yes")]))
            .expect("apply env");

        assert!(!config.resolver.debug);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn invalid_single_key_mode_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("SINGLE_KEY_MODE", "on")]));

        match result {
            Err(ConfigError::InvalidFlag { name, value }) => {
                assert_eq!(name, "SINGLE_KEY_MODE");
                assert_eq!(value, "on");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_bool_spellings() {
        for value in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(value), Some(true), "{value}");
        }
        for value in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(value), Some(false), "{value}");
        }
        for value in ["", "yes", "tRuE", " true"] {
            assert_eq!(parse_bool(value), None, "{value}");
        }
    }
}
