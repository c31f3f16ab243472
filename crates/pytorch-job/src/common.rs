use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, Time};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};

/// Role a group of replicas plays in a distributed run.
///
/// Role names the model does not know are kept verbatim in `Other` so a
/// spec survives a read/write cycle unchanged. Rejecting them is up to
/// validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReplicaType {
    /// Rank-0 process that coordinates the run.
    Master,
    Worker,
    Other(String),
}

impl ReplicaType {
    pub fn as_str(&self) -> &str {
        match self {
            ReplicaType::Master => "Master",
            ReplicaType::Worker => "Worker",
            ReplicaType::Other(name) => name,
        }
    }

    /// Maps case variants of known role names (`master`, `WORKER`) onto the
    /// canonical role.
    pub fn normalized(self) -> Self {
        match self {
            ReplicaType::Other(name) if name.eq_ignore_ascii_case("master") => ReplicaType::Master,
            ReplicaType::Other(name) if name.eq_ignore_ascii_case("worker") => ReplicaType::Worker,
            other => other,
        }
    }
}

impl From<String> for ReplicaType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Master" => ReplicaType::Master,
            "Worker" => ReplicaType::Worker,
            _ => ReplicaType::Other(name),
        }
    }
}

impl From<&str> for ReplicaType {
    fn from(name: &str) -> Self {
        ReplicaType::from(name.to_string())
    }
}

impl From<ReplicaType> for String {
    fn from(replica_type: ReplicaType) -> Self {
        match replica_type {
            ReplicaType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReplicaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Open string: the CRD must accept role names it does not know.
impl JsonSchema for ReplicaType {
    fn schema_name() -> Cow<'static, str> {
        "ReplicaType".into()
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        json_schema!({ "type": "string" })
    }
}

/// What happens to a replica's pod when one of its containers exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
    /// Restart only on retryable exit codes.
    ExitCode,
}

/// Which pods are deleted once the job reaches a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CleanPodPolicy {
    All,
    Running,
    None,
}

/// Desired state of one replica role.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSpec {
    /// Number of process instances. Treated as 1 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Pod launched for every instance of this role.
    #[serde(default)]
    pub template: PodTemplateSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
}

impl ReplicaSpec {
    pub fn containers(&self) -> &[Container] {
        self.template
            .spec
            .as_ref()
            .map(|spec| spec.containers.as_slice())
            .unwrap_or_default()
    }

    pub fn containers_mut(&mut self) -> Option<&mut Vec<Container>> {
        self.template.spec.as_mut().map(|spec| &mut spec.containers)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum JobConditionType {
    Created,
    Running,
    Restarting,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub type_: JobConditionType,

    /// One of `True`, `False` or `Unknown`.
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

/// Pod counts of one replica role as last observed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReplicaStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<i32>,
}

/// Observed state of a job.
///
/// Written by the status aggregator. Validation never looks at it, it is only
/// carried along when a job is copied or converted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<JobCondition>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replica_statuses: BTreeMap<ReplicaType, ReplicaStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<Time>,
}

/// Ordered collection of jobs, as returned by a list call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList<K> {
    #[serde(default)]
    pub metadata: ListMeta,

    #[serde(default = "Vec::new")]
    pub items: Vec<K>,
}

impl<K> JobList<K> {
    pub fn new(items: Vec<K>) -> Self {
        JobList {
            metadata: ListMeta::default(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
