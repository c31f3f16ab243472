//! Fills in the fields a submitter may leave out.
//!
//! Callers run this on their own copy of a job, never on a shared one.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ContainerPort;

use crate::common::{CleanPodPolicy, ReplicaSpec, ReplicaType, RestartPolicy};
use crate::revision::JobRevision;
use crate::{DEFAULT_CONTAINER_NAME, DEFAULT_PORT, DEFAULT_PORT_NAME};

/// Defaults `spec` in place.
///
/// Role names are folded to their canonical case (`master` becomes
/// `Master`). When a spec carries both the canonical role and a case
/// variant of it, the canonical entry is kept and the variant is dropped
/// with a warning. Among several variants with no canonical entry, the first
/// in key order is kept.
pub fn set_defaults<S: JobRevision>(spec: &mut S) {
    spec.clean_pod_policy_mut().get_or_insert(CleanPodPolicy::None);

    let Some(replica_specs) = spec.replica_specs_mut().as_mut() else {
        return;
    };
    normalize_replica_types(replica_specs);

    for replica_spec in replica_specs.values_mut() {
        replica_spec.replicas.get_or_insert(1);
        replica_spec
            .restart_policy
            .get_or_insert(RestartPolicy::OnFailure);
        set_default_port(replica_spec);
    }
}

fn normalize_replica_types(replica_specs: &mut BTreeMap<ReplicaType, ReplicaSpec>) {
    let variants: Vec<ReplicaType> = replica_specs
        .keys()
        .filter(|replica_type| (**replica_type).clone().normalized() != **replica_type)
        .cloned()
        .collect();
    for variant in variants {
        let Some(replica_spec) = replica_specs.remove(&variant) else {
            continue;
        };
        let canonical = variant.clone().normalized();
        if replica_specs.contains_key(&canonical) {
            tracing::warn!(role = %variant, kept = %canonical, "dropping shadowed replica spec");
        } else {
            replica_specs.insert(canonical, replica_spec);
        }
    }
}

fn set_default_port(replica_spec: &mut ReplicaSpec) {
    let Some(containers) = replica_spec.containers_mut() else {
        return;
    };
    for container in containers
        .iter_mut()
        .filter(|container| container.name == DEFAULT_CONTAINER_NAME)
    {
        let ports = container.ports.get_or_insert_with(Vec::new);
        if !ports
            .iter()
            .any(|port| port.name.as_deref() == Some(DEFAULT_PORT_NAME))
        {
            ports.push(ContainerPort {
                name: Some(DEFAULT_PORT_NAME.to_string()),
                container_port: DEFAULT_PORT,
                ..Default::default()
            });
        }
    }
}
