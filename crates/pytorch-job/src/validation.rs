//! Admission rules for PyTorchJob specs.
//!
//! A spec is either accepted as a whole or rejected as a whole. The rule that
//! fired is logged and kept on the error for diagnostics, but the message a
//! submitter sees is always the same.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::DEFAULT_CONTAINER_NAME;
use crate::common::{ReplicaSpec, ReplicaType};
use crate::revision::JobRevision;

const SPEC_KIND: &str = "PyTorchJobSpec";

/// Whole-spec rejection.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} is not valid")]
pub struct ValidationError {
    kind: &'static str,
    violation: Violation,
}

impl ValidationError {
    fn new(violation: Violation) -> Self {
        ValidationError {
            kind: SPEC_KIND,
            violation,
        }
    }

    /// The first rule the spec broke.
    pub fn violation(&self) -> &Violation {
        &self.violation
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("pytorchReplicaSpecs is missing or empty")]
    MissingReplicaSpecs,

    #[error("replica type {0} is not supported")]
    UnsupportedReplicaType(ReplicaType),

    #[error("{0} pod template has no containers")]
    NoContainers(ReplicaType),

    #[error("container {container:?} of {replica_type} has no image")]
    MissingImage {
        replica_type: ReplicaType,
        container: String,
    },

    #[error("there is no container named pytorch in {0}")]
    MissingDefaultContainer(ReplicaType),

    #[error("{0} has more than one container named pytorch")]
    DuplicateDefaultContainer(ReplicaType),

    #[error("there must be only 1 master replica, got {0}")]
    MasterReplicas(i32),

    #[error("Master replica spec must be present")]
    MissingMaster,
}

/// Accepts or rejects `spec`.
pub fn validate_spec<S: JobRevision>(spec: &S) -> Result<(), ValidationError> {
    check_replica_specs::<S>(spec.replica_specs()).map_err(|violation| {
        tracing::warn!(api_version = S::API_VERSION, %violation, "rejecting PyTorchJob spec");
        ValidationError::new(violation)
    })
}

fn check_replica_specs<S: JobRevision>(
    specs: Option<&BTreeMap<ReplicaType, ReplicaSpec>>,
) -> Result<(), Violation> {
    let specs = specs
        .filter(|specs| !specs.is_empty())
        .ok_or(Violation::MissingReplicaSpecs)?;

    for (replica_type, spec) in specs {
        if !S::supports_replica_type(replica_type) {
            return Err(Violation::UnsupportedReplicaType(replica_type.clone()));
        }
        check_containers(replica_type, spec)?;

        if *replica_type == ReplicaType::Master {
            if let Some(replicas) = spec.replicas.filter(|&replicas| replicas != 1) {
                return Err(Violation::MasterReplicas(replicas));
            }
        }
    }

    if !specs.contains_key(&ReplicaType::Master) {
        return Err(Violation::MissingMaster);
    }
    Ok(())
}

fn check_containers(replica_type: &ReplicaType, spec: &ReplicaSpec) -> Result<(), Violation> {
    let containers = spec.containers();
    if containers.is_empty() {
        return Err(Violation::NoContainers(replica_type.clone()));
    }

    if let Some(container) = containers
        .iter()
        .find(|container| container.image.as_deref().is_none_or(str::is_empty))
    {
        return Err(Violation::MissingImage {
            replica_type: replica_type.clone(),
            container: container.name.clone(),
        });
    }

    match containers
        .iter()
        .filter(|container| container.name == DEFAULT_CONTAINER_NAME)
        .count()
    {
        0 => Err(Violation::MissingDefaultContainer(replica_type.clone())),
        1 => Ok(()),
        _ => Err(Violation::DuplicateDefaultContainer(replica_type.clone())),
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};

    use super::*;
    use crate::v1::PyTorchJobSpec;

    fn replica(replicas: Option<i32>, containers: &[(&str, &str)]) -> ReplicaSpec {
        ReplicaSpec {
            replicas,
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: containers
                        .iter()
                        .map(|(name, image)| Container {
                            name: name.to_string(),
                            image: Some(image.to_string()),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                }),
            },
            restart_policy: None,
        }
    }

    fn spec(replicas: Vec<(ReplicaType, ReplicaSpec)>) -> PyTorchJobSpec {
        PyTorchJobSpec {
            pytorch_replica_specs: Some(replicas.into_iter().collect()),
            ..Default::default()
        }
    }

    fn violation_of(spec: &PyTorchJobSpec) -> Violation {
        validate_spec(spec).unwrap_err().violation().clone()
    }

    #[test]
    fn message_is_fixed() {
        let err = validate_spec(&PyTorchJobSpec::default()).unwrap_err();
        assert_eq!(err.to_string(), "PyTorchJobSpec is not valid");
        assert_eq!(err.violation(), &Violation::MissingReplicaSpecs);
    }

    #[test]
    fn empty_map_is_missing() {
        assert_eq!(violation_of(&spec(vec![])), Violation::MissingReplicaSpecs);
    }

    #[test]
    fn image_is_checked_on_every_container() {
        let spec = spec(vec![(
            ReplicaType::Master,
            replica(None, &[("pytorch", "img:1.0"), ("sidecar", "")]),
        )]);
        assert_eq!(
            violation_of(&spec),
            Violation::MissingImage {
                replica_type: ReplicaType::Master,
                container: "sidecar".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_default_container() {
        let spec = spec(vec![(
            ReplicaType::Master,
            replica(None, &[("pytorch", "a:1"), ("pytorch", "b:1")]),
        )]);
        assert_eq!(
            violation_of(&spec),
            Violation::DuplicateDefaultContainer(ReplicaType::Master)
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let spec = spec(vec![
            (ReplicaType::Master, replica(None, &[("pytorch", "img:1.0")])),
            (
                ReplicaType::from("Launcher"),
                replica(None, &[("pytorch", "img:1.0")]),
            ),
        ]);
        assert_eq!(
            violation_of(&spec),
            Violation::UnsupportedReplicaType(ReplicaType::from("Launcher"))
        );
    }

    #[test]
    fn master_and_workers_are_accepted() {
        let spec = spec(vec![
            (ReplicaType::Master, replica(Some(1), &[("pytorch", "img:1.0")])),
            (
                ReplicaType::Worker,
                replica(Some(4), &[("pytorch", "img:1.0"), ("logger", "fluent:2")]),
            ),
        ]);
        assert_eq!(validate_spec(&spec), Ok(()));
    }

    #[test]
    fn master_replicas_defaults_to_one() {
        let spec = spec(vec![(ReplicaType::Master, replica(None, &[("pytorch", "img:1.0")]))]);
        assert!(spec.validate().is_ok());
    }
}
