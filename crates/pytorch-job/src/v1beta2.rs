//! `kubeflow.org/v1beta2`: adds `activeDeadlineSeconds` and `backoffLimit`.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{CleanPodPolicy, JobStatus, ReplicaSpec, ReplicaType};
use crate::isolation::DeepCopy;
use crate::revision::JobRevision;
use crate::v1beta1;

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeflow.org",
    version = "v1beta2",
    kind = "PyTorchJob",
    plural = "pytorchjobs",
    namespaced,
    status = "JobStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PyTorchJobSpec {
    /// Wall-clock limit in seconds, counted from the job's start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,

    /// Retries before the job is marked failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_pod_policy: Option<CleanPodPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pytorch_replica_specs: Option<BTreeMap<ReplicaType, ReplicaSpec>>,
}

impl JobRevision for PyTorchJobSpec {
    const API_VERSION: &'static str = "kubeflow.org/v1beta2";

    fn replica_specs(&self) -> Option<&BTreeMap<ReplicaType, ReplicaSpec>> {
        self.pytorch_replica_specs.as_ref()
    }

    fn replica_specs_mut(&mut self) -> &mut Option<BTreeMap<ReplicaType, ReplicaSpec>> {
        &mut self.pytorch_replica_specs
    }

    fn clean_pod_policy_mut(&mut self) -> &mut Option<CleanPodPolicy> {
        &mut self.clean_pod_policy
    }
}

impl DeepCopy for PyTorchJobSpec {}

impl DeepCopy for PyTorchJob {}

impl From<v1beta1::PyTorchJobSpec> for PyTorchJobSpec {
    fn from(spec: v1beta1::PyTorchJobSpec) -> Self {
        PyTorchJobSpec {
            active_deadline_seconds: None,
            backoff_limit: None,
            clean_pod_policy: spec.clean_pod_policy,
            ttl_seconds_after_finished: spec.ttl_seconds_after_finished,
            pytorch_replica_specs: spec.pytorch_replica_specs,
        }
    }
}

impl From<v1beta1::PyTorchJob> for PyTorchJob {
    fn from(job: v1beta1::PyTorchJob) -> Self {
        PyTorchJob {
            metadata: job.metadata,
            spec: job.spec.into(),
            status: job.status,
        }
    }
}
