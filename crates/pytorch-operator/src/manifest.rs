//! Offline validation of PyTorchJob manifests.

use kube::ResourceExt;
use pytorch_job::{JobRevision, KIND, ValidationError, v1, v1beta1, v1beta2};
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Outcome for one document of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub name: String,
    pub api_version: String,
    pub outcome: std::result::Result<(), ValidationError>,
}

impl Verdict {
    pub fn accepted(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Validates every document in a (possibly multi-document) YAML string.
/// Empty documents are skipped; anything that is not a known PyTorchJob
/// revision is an error.
pub fn validate_manifests(source: &str) -> Result<Vec<Verdict>> {
    let mut verdicts = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(source).enumerate() {
        let value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        verdicts.push(judge(index, value)?);
    }
    Ok(verdicts)
}

fn judge(index: usize, value: Value) -> Result<Verdict> {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let api_version = field("apiVersion");
    let kind = field("kind");
    if kind != KIND {
        return Err(Error::UnsupportedManifest {
            index,
            api_version,
            kind,
        });
    }

    let (name, outcome) = if api_version == v1beta1::PyTorchJobSpec::API_VERSION {
        let job: v1beta1::PyTorchJob = serde_yaml::from_value(value)?;
        (job.name_any(), job.spec.validate())
    } else if api_version == v1beta2::PyTorchJobSpec::API_VERSION {
        let job: v1beta2::PyTorchJob = serde_yaml::from_value(value)?;
        (job.name_any(), job.spec.validate())
    } else if api_version == v1::PyTorchJobSpec::API_VERSION {
        let job: v1::PyTorchJob = serde_yaml::from_value(value)?;
        (job.name_any(), job.spec.validate())
    } else {
        return Err(Error::UnsupportedManifest {
            index,
            api_version,
            kind,
        });
    };

    Ok(Verdict {
        name,
        api_version,
        outcome,
    })
}
