use std::collections::BTreeMap;

use crate::common::{CleanPodPolicy, ReplicaSpec, ReplicaType};
use crate::validation::{self, ValidationError};

/// Adapter each schema revision implements for its spec type.
///
/// Validation and defaulting only go through this trait, so a rule change
/// lands in every revision at once.
pub trait JobRevision {
    /// Full `apiVersion`, e.g. `kubeflow.org/v1`.
    const API_VERSION: &'static str;

    fn replica_specs(&self) -> Option<&BTreeMap<ReplicaType, ReplicaSpec>>;

    fn replica_specs_mut(&mut self) -> &mut Option<BTreeMap<ReplicaType, ReplicaSpec>>;

    fn clean_pod_policy_mut(&mut self) -> &mut Option<CleanPodPolicy>;

    /// Roles this revision knows how to launch.
    fn supports_replica_type(replica_type: &ReplicaType) -> bool {
        matches!(replica_type, ReplicaType::Master | ReplicaType::Worker)
    }

    fn validate(&self) -> Result<(), ValidationError>
    where
        Self: Sized,
    {
        validation::validate_spec(self)
    }
}
