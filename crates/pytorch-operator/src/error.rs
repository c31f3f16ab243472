use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),

    #[error("wait error: {0}")]
    Wait(#[from] kube::runtime::wait::Error),

    #[error("failed to merge CRD versions: {0}")]
    MergeCrd(#[from] kube::core::crd::MergeError),

    #[error("CRD {name} was not established within {timeout:?}")]
    CrdNotEstablished { name: String, timeout: Duration },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("document {index}: unsupported manifest {api_version}/{kind}")]
    UnsupportedManifest {
        index: usize,
        api_version: String,
        kind: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
