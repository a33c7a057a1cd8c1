use serde::Deserialize;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Parameter store region is not set")]
    MissingRegion,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct ParameterStoreConfig {
    #[serde(default)]
    pub region: String,
    /// Overrides the store endpoint, e.g. for a local stack.
    pub endpoint: Option<String>,
    /// Deadline for each individual store call.
    pub timeout_ms: Option<u64>,
}

/// How documents are laid out in the parameter store.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One parameter per key, versions kept in the parameter history.
    #[default]
    MultiKey,
    /// One compressed blob per version holding the whole document.
    SingleKey,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub parameter_store: ParameterStoreConfig,
    #[serde(default)]
    pub mode: Mode,
    /// Disables caching and logs in more detail.
    #[serde(default)]
    pub debug: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.parameter_store.region.trim().is_empty() {
            return Err(ValidationError::MissingRegion);
        }
        Ok(())
    }
}
