mod support;

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use pytorch_job::{JobRevision, ReplicaSpec, ReplicaType, Violation, v1, v1beta1, v1beta2};

use support::{IMAGE, container, master_worker, replica, roles};

type ReplicaSpecs = Option<BTreeMap<ReplicaType, ReplicaSpec>>;

/// Specs every revision must turn away.
fn rejected_cases() -> Vec<ReplicaSpecs> {
    vec![
        None,
        roles(vec![(ReplicaType::Worker, replica(None, vec![]))]),
        roles(vec![(ReplicaType::Worker, replica(None, vec![container("", "")]))]),
        roles(vec![(ReplicaType::Worker, replica(None, vec![container("", IMAGE)]))]),
        roles(vec![(
            ReplicaType::Master,
            replica(Some(2), vec![container("pytorch", IMAGE)]),
        )]),
        roles(vec![(
            ReplicaType::Worker,
            replica(Some(1), vec![container("pytorch", IMAGE)]),
        )]),
    ]
}

fn assert_rejected<S: JobRevision>(spec: &S) {
    let err = spec.validate().expect_err("spec should be rejected");
    assert_eq!(err.to_string(), "PyTorchJobSpec is not valid");
}

#[test]
fn v1beta1_rejects_malformed_specs() {
    for specs in rejected_cases() {
        assert_rejected(&v1beta1::PyTorchJobSpec {
            pytorch_replica_specs: specs,
            ..Default::default()
        });
    }
}

#[test]
fn v1beta2_rejects_malformed_specs() {
    for specs in rejected_cases() {
        assert_rejected(&v1beta2::PyTorchJobSpec {
            pytorch_replica_specs: specs,
            ..Default::default()
        });
    }
}

#[test]
fn v1_rejects_malformed_specs() {
    for specs in rejected_cases() {
        assert_rejected(&v1::PyTorchJobSpec {
            pytorch_replica_specs: specs,
            ..Default::default()
        });
    }
}

fn v1_violation(specs: ReplicaSpecs) -> Violation {
    let spec = v1::PyTorchJobSpec {
        pytorch_replica_specs: specs,
        ..Default::default()
    };
    spec.validate().unwrap_err().violation().clone()
}

#[test]
fn each_case_fails_for_its_own_reason() {
    let violations: Vec<Violation> = rejected_cases().into_iter().map(v1_violation).collect();
    assert_eq!(
        violations,
        vec![
            Violation::MissingReplicaSpecs,
            Violation::NoContainers(ReplicaType::Worker),
            Violation::MissingImage {
                replica_type: ReplicaType::Worker,
                container: String::new(),
            },
            Violation::MissingDefaultContainer(ReplicaType::Worker),
            Violation::MasterReplicas(2),
            Violation::MissingMaster,
        ]
    );
}

#[test]
fn empty_role_map_is_rejected() {
    assert_eq!(v1_violation(roles(vec![])), Violation::MissingReplicaSpecs);
}

#[test]
fn template_without_pod_spec_has_no_containers() {
    let specs = roles(vec![(
        ReplicaType::Master,
        ReplicaSpec {
            template: PodTemplateSpec::default(),
            ..Default::default()
        },
    )]);
    assert_eq!(v1_violation(specs), Violation::NoContainers(ReplicaType::Master));
}

#[test]
fn unset_image_counts_as_empty() {
    let mut pytorch = container("pytorch", IMAGE);
    pytorch.image = None;
    let specs = roles(vec![(ReplicaType::Master, replica(None, vec![pytorch]))]);
    assert!(matches!(v1_violation(specs), Violation::MissingImage { .. }));
}

#[test]
fn single_master_is_accepted() {
    for replicas in [None, Some(1)] {
        let spec = v1::PyTorchJobSpec {
            pytorch_replica_specs: roles(vec![(
                ReplicaType::Master,
                replica(replicas, vec![container("pytorch", IMAGE)]),
            )]),
            ..Default::default()
        };
        assert_eq!(spec.validate(), Ok(()));
    }
}

#[test]
fn master_with_workers_is_accepted_by_every_revision() {
    let v1beta1 = v1beta1::PyTorchJobSpec {
        pytorch_replica_specs: master_worker(3),
        ..Default::default()
    };
    let v1beta2 = v1beta2::PyTorchJobSpec {
        active_deadline_seconds: Some(3600),
        backoff_limit: Some(3),
        pytorch_replica_specs: master_worker(3),
        ..Default::default()
    };
    let v1 = v1::PyTorchJobSpec {
        pytorch_replica_specs: master_worker(3),
        ..Default::default()
    };
    assert!(v1beta1.validate().is_ok());
    assert!(v1beta2.validate().is_ok());
    assert!(v1.validate().is_ok());
}

#[test]
fn sidecars_may_sit_next_to_the_default_container() {
    let specs = roles(vec![(
        ReplicaType::Master,
        replica(
            None,
            vec![container("log-shipper", "fluent-bit:2.2"), container("pytorch", IMAGE)],
        ),
    )]);
    let spec = v1::PyTorchJobSpec {
        pytorch_replica_specs: specs,
        ..Default::default()
    };
    assert!(spec.validate().is_ok());
}

#[test]
fn lowercase_role_names_are_not_known_roles() {
    let specs = roles(vec![(
        ReplicaType::from("master"),
        replica(None, vec![container("pytorch", IMAGE)]),
    )]);
    assert_eq!(
        v1_violation(specs),
        Violation::UnsupportedReplicaType(ReplicaType::from("master"))
    );
}
