use std::time::Duration;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Client, CustomResourceExt,
    api::{Api, Patch, PatchParams},
    core::crd::merge_crds,
    runtime::wait::{await_condition, conditions},
};
use pytorch_job::{v1, v1beta1, v1beta2};

use crate::error::{Error, Result};

pub const CRD_NAME: &str = "pytorchjobs.kubeflow.org";

/// Revision objects are persisted in.
pub const STORAGE_VERSION: &str = "v1";

/// One CRD serving every revision.
pub fn merged_crd() -> Result<CustomResourceDefinition> {
    let crds = vec![
        v1beta1::PyTorchJob::crd(),
        v1beta2::PyTorchJob::crd(),
        v1::PyTorchJob::crd(),
    ];
    Ok(merge_crds(crds, STORAGE_VERSION)?)
}

pub fn to_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&merged_crd()?)?)
}

/// Server-side applies the CRD and waits until the API server serves it.
pub async fn install(client: Client, field_manager: &str, timeout: Duration) -> Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client);

    crds.patch(
        CRD_NAME,
        &PatchParams::apply(field_manager),
        &Patch::Apply(merged_crd()?),
    )
    .await?;

    tokio::time::timeout(
        timeout,
        await_condition(crds, CRD_NAME, conditions::is_crd_established()),
    )
    .await
    .map_err(|_| Error::CrdNotEstablished {
        name: CRD_NAME.to_string(),
        timeout,
    })??;

    tracing::info!(crd = CRD_NAME, "CRD established");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_crd_serves_all_revisions() {
        let crd = merged_crd().unwrap();
        assert_eq!(crd.metadata.name.as_deref(), Some(CRD_NAME));
        assert_eq!(crd.spec.group, "kubeflow.org");

        let served: Vec<&str> = crd
            .spec
            .versions
            .iter()
            .filter(|version| version.served)
            .map(|version| version.name.as_str())
            .collect();
        assert_eq!(served.len(), 3);
        for name in ["v1beta1", "v1beta2", "v1"] {
            assert!(served.contains(&name), "{name} is not served");
        }

        let stored: Vec<&str> = crd
            .spec
            .versions
            .iter()
            .filter(|version| version.storage)
            .map(|version| version.name.as_str())
            .collect();
        assert_eq!(stored, [STORAGE_VERSION]);
    }

    #[test]
    fn yaml_names_the_resource() {
        let yaml = to_yaml().unwrap();
        assert!(yaml.contains("name: pytorchjobs.kubeflow.org"));
        assert!(yaml.contains("pytorchReplicaSpecs"));
    }
}
