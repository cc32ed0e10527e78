use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Proxy configuration.
///
/// `directory` is the path of the data file itself (the name is kept for
/// compatibility with existing config files). A bare path converts into a
/// keyless configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub directory: PathBuf,

    /// Obfuscation key. When set, the file is stored encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl ProxyConfig {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            encryption_key: None,
        }
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Load a JSON config file such as `{"directory": "./db.json", "encryptionKey": "s3cr3t"}`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ProxyError::fs(path, e))?;
        let config: ProxyConfig = serde_json::from_str(&content).map_err(|e| {
            ProxyError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    /// Reject a missing path; an empty key means no key.
    pub fn validate(mut self) -> Result<Self> {
        if self.directory.as_os_str().is_empty() {
            return Err(ProxyError::Configuration(
                "No database configuration detected.".to_string(),
            ));
        }
        if self.encryption_key.as_deref() == Some("") {
            self.encryption_key = None;
        }
        Ok(self)
    }
}

impl From<&str> for ProxyConfig {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ProxyConfig {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for ProxyConfig {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for ProxyConfig {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&PathBuf> for ProxyConfig {
    fn from(path: &PathBuf) -> Self {
        Self::new(path.clone())
    }
}
