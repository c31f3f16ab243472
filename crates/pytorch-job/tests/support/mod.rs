#![allow(dead_code)]

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use pytorch_job::{ReplicaSpec, ReplicaType, v1};

pub const IMAGE: &str = "gcr.io/kubeflow-ci/pytorch-dist-mnist_test:1.0";

pub fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ..Default::default()
    }
}

pub fn replica(replicas: Option<i32>, containers: Vec<Container>) -> ReplicaSpec {
    ReplicaSpec {
        replicas,
        template: PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers,
                ..Default::default()
            }),
        },
        restart_policy: None,
    }
}

pub fn roles(
    entries: Vec<(ReplicaType, ReplicaSpec)>,
) -> Option<BTreeMap<ReplicaType, ReplicaSpec>> {
    Some(entries.into_iter().collect())
}

/// One master and `workers` workers, all running the default container.
pub fn master_worker(workers: i32) -> Option<BTreeMap<ReplicaType, ReplicaSpec>> {
    roles(vec![
        (
            ReplicaType::Master,
            replica(Some(1), vec![container("pytorch", IMAGE)]),
        ),
        (
            ReplicaType::Worker,
            replica(Some(workers), vec![container("pytorch", IMAGE)]),
        ),
    ])
}

pub fn v1_job(name: &str, labels: &[(&str, &str)]) -> v1::PyTorchJob {
    let mut job = v1::PyTorchJob::new(
        name,
        v1::PyTorchJobSpec {
            pytorch_replica_specs: master_worker(2),
            ..Default::default()
        },
    );
    job.metadata.labels = Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    job
}
