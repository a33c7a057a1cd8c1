use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Version that is never cached and always resolved against the store.
pub const LATEST_VERSION: &str = "latest";

/// Flat document returned to callers: short key to value.
pub type ResolvedDocument = BTreeMap<String, String>;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Bad request, expected: {}, got: {}", RequestKey::expected_shape(), .0.shape())]
    MissingFields(RequestKey),
}

/// The application/environment/version/landscape tuple identifying a document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RequestKey {
    #[serde(rename = "Application", alias = "application", default)]
    pub application: String,
    #[serde(rename = "Environment", alias = "environment", default)]
    pub environment: String,
    #[serde(rename = "Version", alias = "version", default)]
    pub version: String,
    #[serde(rename = "Landscape", alias = "landscape", default)]
    pub landscape: String,
}

impl RequestKey {
    pub fn new<A, E, V, L>(application: A, environment: E, version: V, landscape: L) -> Self
    where
        A: Into<String>,
        E: Into<String>,
        V: Into<String>,
        L: Into<String>,
    {
        RequestKey {
            application: application.into(),
            environment: environment.into(),
            version: version.into(),
            landscape: landscape.into(),
        }
    }

    /// Rejects the key when any of the four fields is empty.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.application.is_empty()
            || self.environment.is_empty()
            || self.version.is_empty()
            || self.landscape.is_empty()
        {
            return Err(ValidationError::MissingFields(self));
        }
        Ok(self)
    }

    /// `Landscape.Environment.Application`
    pub fn scope_prefix(&self) -> String {
        format!("{}.{}.{}", self.landscape, self.environment, self.application)
    }

    /// `Landscape.Environment.Application@Version`
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.scope_prefix(), self.version)
    }

    /// Name of the composite blob holding the whole document in single-key mode.
    pub fn composite_name(&self) -> String {
        format!("{}.{}", self.scope_prefix(), self.version)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.identifier())
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    fn expected_shape() -> &'static str {
        "{application:string environment:string version:string landscape:string}"
    }

    fn shape(&self) -> String {
        format!(
            "{{application:{} environment:{} version:{} landscape:{}}}",
            self.application, self.environment, self.version, self.landscape
        )
        .to_lowercase()
    }
}

/// Hex encoded SHA-256 of a request identifier, used as the response cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(identifier: &str) -> Self {
        Fingerprint(hex::encode(Sha256::digest(identifier.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One value of a parameter together with the label the store keeps in its description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterVersion {
    pub value: String,
    pub version_label: String,
}

impl ParameterVersion {
    pub fn new<V, L>(value: V, version_label: L) -> Self
    where
        V: Into<String>,
        L: Into<String>,
    {
        ParameterVersion {
            value: value.into(),
            version_label: version_label.into(),
        }
    }
}

/// A discrete parameter found under a scope prefix. `versions` holds the
/// current value first, followed by the history in store order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub versions: Vec<ParameterVersion>,
}

impl Parameter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Parameter {
            name: name.into(),
            versions: Vec::new(),
        }
    }

    /// Final dot separated segment of the name.
    pub fn short_key(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// First version whose label equals `version` exactly.
    pub fn find_version(&self, version: &str) -> Option<&ParameterVersion> {
        self.versions.iter().find(|v| v.version_label == version)
    }
}
