use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Relative to the home directory.
const CONFIG_PATH: &str = ".pytorch-operator/config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OperatorConfig {
    /// Namespace to watch. All namespaces when unset.
    pub namespace: Option<String>,
    /// Apply the PyTorchJob CRD before watching.
    pub install_crds: bool,
    /// How long to wait for the CRD to be established, e.g. "10s" or "1m".
    pub crd_establish_timeout: String,
    pub field_manager: String,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        OperatorConfig {
            namespace: None,
            install_crds: true,
            crd_establish_timeout: "10s".to_string(),
            field_manager: "pytorch-operator".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl OperatorConfig {
    /// Reads `path` if given; otherwise the default location if it exists,
    /// falling back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: OperatorConfig = toml::from_str(&content)?;
        config.establish_timeout()?;
        Ok(config)
    }

    pub fn establish_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.crd_establish_timeout).map_err(|e| {
            Error::Config(format!(
                "crd-establish-timeout {:?}: {}",
                self.crd_establish_timeout, e
            ))
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_PATH))
}
