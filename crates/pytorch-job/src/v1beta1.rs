//! `kubeflow.org/v1beta1`: the first served revision. It has no run-time
//! deadline and no restart budget.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{CleanPodPolicy, JobStatus, ReplicaSpec, ReplicaType};
use crate::isolation::DeepCopy;
use crate::revision::JobRevision;

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeflow.org",
    version = "v1beta1",
    kind = "PyTorchJob",
    plural = "pytorchjobs",
    namespaced,
    status = "JobStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PyTorchJobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_pod_policy: Option<CleanPodPolicy>,

    /// Seconds to keep a finished job before it is garbage collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pytorch_replica_specs: Option<BTreeMap<ReplicaType, ReplicaSpec>>,
}

impl JobRevision for PyTorchJobSpec {
    const API_VERSION: &'static str = "kubeflow.org/v1beta1";

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
