use std::collections::BTreeSet;

use futures::StreamExt;
use kube::{
    Client,
    api::Api,
    runtime::{WatchStreamExt, watcher},
};
use pytorch_job::defaults::set_defaults;
use pytorch_job::{DeepCopy, JobCache, JobRevision, ValidationError, v1::PyTorchJob};

use crate::config::OperatorConfig;
use crate::error::Result;

/// What happened to an observed job.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Valid; a defaulted copy was published to the cache.
    Accepted,
    /// Invalid; any earlier cached copy was dropped.
    Rejected(ValidationError),
    /// Same generation as the cached copy.
    Unchanged,
}

/// Admits observed jobs into a cache that downstream consumers read from.
#[derive(Default)]
pub struct JobAdmitter {
    cache: JobCache<PyTorchJob>,
}

impl JobAdmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &JobCache<PyTorchJob> {
        &self.cache
    }

    /// Handles an added or modified job.
    pub fn observe(&self, job: &PyTorchJob) -> Admission {
        let key = JobCache::key_for(job);

        if let Some(cached) = self.cache.snapshot(&key) {
            let same_object = cached.metadata.uid == job.metadata.uid;
            let same_generation = cached.metadata.generation.is_some()
                && cached.metadata.generation == job.metadata.generation;
            if same_object && same_generation {
                return Admission::Unchanged;
            }
        }

        match job.spec.validate() {
            Ok(()) => {
                let mut admitted = job.deep_copy();
                set_defaults(&mut admitted.spec);
                self.cache.publish(admitted);
                tracing::info!(
                    job = %key,
                    generation = ?job.metadata.generation,
                    "admitted PyTorchJob"
                );
                Admission::Accepted
            }
            Err(err) => {
                self.cache.evict(&key);
                tracing::warn!(job = %key, reason = %err.violation(), "{err}");
                Admission::Rejected(err)
            }
        }
    }

    /// Handles a deleted job. Returns whether it was cached.
    pub fn forget(&self, job: &PyTorchJob) -> bool {
        let key = JobCache::key_for(job);
        let evicted = self.cache.evict(&key).is_some();
        if evicted {
            tracing::info!(job = %key, "forgot deleted PyTorchJob");
        }
        evicted
    }

    /// Drops every cached job not in `seen`, after a relist.
    pub fn retain(&self, seen: &BTreeSet<String>) -> usize {
        let stale: Vec<String> = self
            .cache
            .keys()
            .into_iter()
            .filter(|key| !seen.contains(key))
            .collect();
        for key in &stale {
            self.cache.evict(key);
            tracing::debug!(job = %key, "dropped job missing from relist");
        }
        stale.len()
    }
}

/// Feeds watcher events into a [`JobAdmitter`], tracking relists.
#[derive(Default)]
pub struct WatchLoop {
    admitter: JobAdmitter,
    // Keys seen since the last (re)list started.
    relisted: Option<BTreeSet<String>>,
}

impl WatchLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admitter(&self) -> &JobAdmitter {
        &self.admitter
    }

    /// Handles one item of the watch stream. Errors are logged and skipped;
    /// the watcher retries on its own.
    pub fn handle(&mut self, event: Result<watcher::Event<PyTorchJob>, watcher::Error>) {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "watch failed, retrying");
                return;
            }
        };
        match event {
            watcher::Event::Init => {
                self.relisted = Some(BTreeSet::new());
            }
            watcher::Event::InitApply(job) => {
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(JobCache::key_for(&job));
                }
                self.admitter.observe(&job);
            }
            watcher::Event::InitDone => {
                if let Some(seen) = self.relisted.take() {
                    let dropped = self.admitter.retain(&seen);
                    tracing::info!(
                        cached = self.admitter.cache().len(),
                        dropped,
                        "job list synced"
                    );
                }
            }
            watcher::Event::Apply(job) => {
                self.admitter.observe(&job);
            }
            watcher::Event::Delete(job) => {
                self.admitter.forget(&job);
            }
        }
    }
}

/// Watches PyTorchJobs. Watch errors are retried with backoff, so this only
/// returns if the stream ends.
pub async fn run(client: Client, config: &OperatorConfig) -> Result<()> {
    let jobs: Api<PyTorchJob> = match &config.namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };
    let mut watch_loop = WatchLoop::new();

    tracing::info!(
        namespace = config.namespace.as_deref().unwrap_or("*"),
        "watching PyTorchJobs"
    );
    let mut events = watcher(jobs, watcher::Config::default())
        .default_backoff()
        .boxed();

    while let Some(event) = events.next().await {
        watch_loop.handle(event);
    }

    tracing::warn!("PyTorchJob watch stream ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use pretty_assertions::assert_eq;
    use pytorch_job::v1::PyTorchJobSpec;
    use pytorch_job::{ReplicaSpec, ReplicaType, RestartPolicy, Violation};

    use super::*;

    fn job(name: &str, master_replicas: i32, generation: i64) -> PyTorchJob {
        let master = ReplicaSpec {
            replicas: Some(master_replicas),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "pytorch".to_string(),
                        image: Some("pytorch/pytorch:2.1".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            restart_policy: None,
        };
        let mut job = PyTorchJob::new(
            name,
            PyTorchJobSpec {
                pytorch_replica_specs: Some(BTreeMap::from([(ReplicaType::Master, master)])),
                ..Default::default()
            },
        );
        job.metadata.namespace = Some("training".to_string());
        job.metadata.uid = Some(format!("uid-{name}"));
        job.metadata.generation = Some(generation);
        job
    }

    #[test]
    fn accepted_jobs_are_cached_defaulted() {
        let admitter = JobAdmitter::new();
        let observed = job("mnist", 1, 1);

        assert_eq!(admitter.observe(&observed), Admission::Accepted);

        let cached = admitter.cache().snapshot("training/mnist").unwrap();
        let master = &cached.spec.pytorch_replica_specs.as_ref().unwrap()[&ReplicaType::Master];
        assert_eq!(master.restart_policy, Some(RestartPolicy::OnFailure));
        // the observed object itself is not defaulted
        let observed_master =
            &observed.spec.pytorch_replica_specs.as_ref().unwrap()[&ReplicaType::Master];
        assert_eq!(observed_master.restart_policy, None);
    }

    #[test]
    fn same_generation_is_unchanged() {
        let admitter = JobAdmitter::new();
        admitter.observe(&job("mnist", 1, 1));
        assert_eq!(admitter.observe(&job("mnist", 1, 1)), Admission::Unchanged);
        assert_eq!(admitter.observe(&job("mnist", 1, 2)), Admission::Accepted);
    }

    #[test]
    fn rejected_update_evicts_the_cached_job() {
        let admitter = JobAdmitter::new();
        admitter.observe(&job("mnist", 1, 1));

        let admission = admitter.observe(&job("mnist", 3, 2));
        let Admission::Rejected(err) = admission else {
            panic!("expected rejection, got {admission:?}");
        };
        assert_eq!(err.violation(), &Violation::MasterReplicas(3));
        assert!(admitter.cache().is_empty());
    }

    #[test]
    fn forget_and_retain() {
        let admitter = JobAdmitter::new();
        admitter.observe(&job("a", 1, 1));
        admitter.observe(&job("b", 1, 1));
        admitter.observe(&job("c", 1, 1));

        assert!(admitter.forget(&job("a", 1, 1)));
        assert!(!admitter.forget(&job("a", 1, 1)));

        let seen = BTreeSet::from(["training/c".to_string()]);
        assert_eq!(admitter.retain(&seen), 1);
        assert_eq!(admitter.cache().keys(), vec!["training/c".to_string()]);
    }

    #[test]
    fn watch_errors_do_not_stop_the_loop() {
        let mut watch_loop = WatchLoop::new();

        watch_loop.handle(Err(watcher::Error::NoResourceVersion));
        watch_loop.handle(Ok(watcher::Event::Apply(job("mnist", 1, 1))));

        assert!(
            watch_loop
                .admitter()
                .cache()
                .snapshot("training/mnist")
                .is_some()
        );
    }

    #[test]
    fn relist_drops_jobs_that_disappeared() {
        let mut watch_loop = WatchLoop::new();
        watch_loop.handle(Ok(watcher::Event::Apply(job("gone", 1, 1))));
        watch_loop.handle(Ok(watcher::Event::Apply(job("kept", 1, 1))));

        watch_loop.handle(Ok(watcher::Event::Init));
        watch_loop.handle(Ok(watcher::Event::InitApply(job("kept", 1, 1))));
        watch_loop.handle(Ok(watcher::Event::InitDone));

        assert_eq!(
            watch_loop.admitter().cache().keys(),
            vec!["training/kept".to_string()]
        );

        watch_loop.handle(Ok(watcher::Event::Delete(job("kept", 1, 1))));
        assert!(watch_loop.admitter().cache().is_empty());
    }
}
