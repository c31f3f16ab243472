//! In-memory stand-in for the PyTorchJob API of one namespace.
//!
//! Lets controller code be exercised without a cluster. Objects are copied
//! on the way in and on the way out, so nothing a caller holds aliases what
//! the fake has stored. Every call is recorded as an [`Action`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::stream::BoxStream;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use kube::api::{ListParams, Patch};
use kube::core::{Selector, SelectorExt};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::common::JobList;
use crate::error::{Error, Result};
use crate::isolation::DeepCopy;
use crate::labels::parse_selector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Update,
    Delete,
    DeleteCollection,
    Patch,
}

/// One recorded call against the fake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub namespace: String,
    pub name: Option<String>,
    pub subresource: Option<String>,
}

/// Change notification delivered to watchers.
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
}

struct State<K> {
    objects: BTreeMap<String, K>,
    resource_version: u64,
    actions: Vec<Action>,
    watchers: Vec<mpsc::UnboundedSender<JobEvent<K>>>,
}

impl<K: Clone> State<K> {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn record(&mut self, action: Action) {
        tracing::debug!(
            verb = ?action.verb,
            namespace = %action.namespace,
            name = action.name.as_deref().unwrap_or_default(),
            subresource = action.subresource.as_deref().unwrap_or_default(),
            "fake api call"
        );
        self.actions.push(action);
    }

    // Watchers whose stream was dropped are pruned here.
    fn notify(&mut self, event: JobEvent<K>) {
        self.watchers.retain(|watcher| watcher.send(event.clone()).is_ok());
    }
}

pub struct FakeJobs<K> {
    namespace: String,
    state: Mutex<State<K>>,
}

impl<K> FakeJobs<K>
where
    K: Resource<DynamicType = ()> + DeepCopy + Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(namespace: impl Into<String>) -> Self {
        FakeJobs {
            namespace: namespace.into(),
            state: Mutex::new(State {
                objects: BTreeMap::new(),
                resource_version: 0,
                actions: Vec::new(),
                watchers: Vec::new(),
            }),
        }
    }

    /// Starts from `objects` as if they had been created, without recording
    /// actions or emitting events.
    pub fn with_objects(
        namespace: impl Into<String>,
        objects: impl IntoIterator<Item = K>,
    ) -> Result<Self> {
        let fake = Self::new(namespace);
        {
            let mut state = fake.lock();
            for obj in objects {
                let name = fake.admit_new(&state, &obj)?;
                let mut stored = obj.deep_copy();
                let meta = stored.meta_mut();
                meta.namespace = Some(fake.namespace.clone());
                meta.resource_version = Some(state.next_resource_version());
                meta.generation = Some(1);
                state.objects.insert(name, stored);
            }
        }
        Ok(fake)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.lock().actions.clear();
    }

    pub fn get(&self, name: &str) -> Result<K> {
        let mut state = self.lock();
        state.record(self.action(Verb::Get, Some(name), None));
        state
            .objects
            .get(name)
            .map(K::deep_copy)
            .ok_or_else(|| not_found::<K>(name))
    }

    /// Objects whose labels match `params.label_selector`, in name order.
    pub fn list(&self, params: &ListParams) -> Result<JobList<K>> {
        let mut state = self.lock();
        state.record(self.action(Verb::List, None, None));
        let selector = selector_for(params)?;
        let items = state
            .objects
            .values()
            .filter(|obj| selector.matches(obj.labels()))
            .map(K::deep_copy)
            .collect();
        Ok(JobList {
            metadata: ListMeta {
                resource_version: Some(state.resource_version.to_string()),
                ..Default::default()
            },
            items,
        })
    }

    /// Events for every change made after this call returns. The stream is
    /// unbounded, so a slow reader sees every event, and it ends once the
    /// fake is dropped.
    pub fn watch(&self) -> BoxStream<'static, JobEvent<K>> {
        let mut state = self.lock();
        state.record(self.action(Verb::Watch, None, None));
        let (sender, receiver) = mpsc::unbounded_channel();
        state.watchers.push(sender);

        UnboundedReceiverStream::new(receiver).boxed()
    }

    pub fn create(&self, obj: &K) -> Result<K> {
        let mut state = self.lock();
        state.record(self.action(Verb::Create, obj.meta().name.as_deref(), None));
        self.admit_new(&state, obj)?;
        Ok(self.store(&mut state, obj.deep_copy(), Some(1), JobEvent::Added))
    }

    /// Replaces everything but the status. A set resource version must match
    /// the stored one.
    pub fn update(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        let mut state = self.lock();
        state.record(self.action(Verb::Update, Some(&name), None));
        self.check_namespace(obj)?;

        let current = state.objects.get(&name).ok_or_else(|| not_found::<K>(&name))?;
        check_resource_version(current, obj)?;
        let updated = with_field_from(obj, current, "status")?;
        let generation = next_generation(current, &updated)?;
        Ok(self.store(&mut state, updated, generation, JobEvent::Modified))
    }

    /// Replaces only the status.
    pub fn update_status(&self, obj: &K) -> Result<K> {
        let name = obj.name_any();
        let mut state = self.lock();
        state.record(self.action(Verb::Update, Some(&name), Some("status")));
        self.check_namespace(obj)?;

        let current = state.objects.get(&name).ok_or_else(|| not_found::<K>(&name))?;
        check_resource_version(current, obj)?;
        let updated = with_field_from(current, obj, "status")?;
        let generation = current.meta().generation;
        Ok(self.store(&mut state, updated, generation, JobEvent::Modified))
    }

    pub fn delete(&self, name: &str) -> Result<K> {
        let mut state = self.lock();
        state.record(self.action(Verb::Delete, Some(name), None));
        let removed = state
            .objects
            .remove(name)
            .ok_or_else(|| not_found::<K>(name))?;
        state.next_resource_version();
        state.notify(JobEvent::Deleted(removed.deep_copy()));
        Ok(removed)
    }

    /// Deletes every object matching `params.label_selector` and returns them.
    pub fn delete_collection(&self, params: &ListParams) -> Result<JobList<K>> {
        let mut state = self.lock();
        state.record(self.action(Verb::DeleteCollection, None, None));
        let selector = selector_for(params)?;

        let names: Vec<String> = state
            .objects
            .iter()
            .filter(|(_, obj)| selector.matches(obj.labels()))
            .map(|(name, _)| name.clone())
            .collect();
        let mut removed = Vec::with_capacity(names.len());
        for name in names {
            if let Some(obj) = state.objects.remove(&name) {
                state.next_resource_version();
                state.notify(JobEvent::Deleted(obj.deep_copy()));
                removed.push(obj);
            }
        }
        Ok(JobList::new(removed))
    }

    /// Applies a JSON merge patch. Server-side apply is treated as a merge;
    /// other patch types are refused. The status is left untouched.
    pub fn patch<P: Serialize>(&self, name: &str, patch: &Patch<P>) -> Result<K> {
        let mut state = self.lock();
        state.record(self.action(Verb::Patch, Some(name), None));

        let patch = match patch {
            Patch::Merge(patch) | Patch::Apply(patch) => serde_json::to_value(patch)?,
            Patch::Strategic(_) => {
                return Err(Error::UnsupportedPatch("strategic merge patch".to_string()));
            }
            _ => return Err(Error::UnsupportedPatch("json patch".to_string())),
        };

        let current = state.objects.get(name).ok_or_else(|| not_found::<K>(name))?;
        let mut value = serde_json::to_value(current)?;
        merge_patch(&mut value, &patch);
        let mut patched: K = serde_json::from_value(value)?;
        patched.meta_mut().name = Some(name.to_string());
        let patched = with_field_from(&patched, current, "status")?;
        let generation = next_generation(current, &patched)?;
        Ok(self.store(&mut state, patched, generation, JobEvent::Modified))
    }

    fn store(
        &self,
        state: &mut State<K>,
        mut obj: K,
        generation: Option<i64>,
        event: fn(K) -> JobEvent<K>,
    ) -> K {
        let meta = obj.meta_mut();
        meta.namespace = Some(self.namespace.clone());
        meta.resource_version = Some(state.next_resource_version());
        meta.generation = generation;

        state.objects.insert(obj.name_any(), obj.deep_copy());
        state.notify(event(obj.deep_copy()));
        obj
    }

    fn admit_new(&self, state: &State<K>, obj: &K) -> Result<String> {
        let name = obj.meta().name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::BadRequest("metadata.name is required".to_string()));
        }
        self.check_namespace(obj)?;
        if state.objects.contains_key(&name) {
            return Err(Error::AlreadyExists {
                kind: K::kind(&()).into_owned(),
                name,
            });
        }
        Ok(name)
    }

    fn check_namespace(&self, obj: &K) -> Result<()> {
        match obj.meta().namespace.as_deref() {
            Some(namespace) if namespace != self.namespace => Err(Error::BadRequest(format!(
                "namespace {namespace:?} does not match {:?}",
                self.namespace
            ))),
            _ => Ok(()),
        }
    }

    fn action(&self, verb: Verb, name: Option<&str>, subresource: Option<&str>) -> Action {
        Action {
            verb,
            namespace: self.namespace.clone(),
            name: name.map(str::to_string),
            subresource: subresource.map(str::to_string),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found<K: Resource<DynamicType = ()>>(name: &str) -> Error {
    Error::NotFound {
        kind: K::kind(&()).into_owned(),
        name: name.to_string(),
    }
}

fn selector_for(params: &ListParams) -> Result<Selector> {
    match params.label_selector.as_deref() {
        Some(selector) => parse_selector(selector),
        None => Ok(Selector::default()),
    }
}

fn check_resource_version<K: Resource<DynamicType = ()>>(current: &K, incoming: &K) -> Result<()> {
    match (
        incoming.meta().resource_version.as_deref(),
        current.meta().resource_version.as_deref(),
    ) {
        (Some(given), Some(stored)) if given != stored => Err(Error::Conflict {
            kind: K::kind(&()).into_owned(),
            name: current.name_any(),
            given: given.to_string(),
            current: stored.to_string(),
        }),
        _ => Ok(()),
    }
}

/// `target` with its top-level `field` taken from `source`.
fn with_field_from<K: Serialize + DeserializeOwned>(
    target: &K,
    source: &K,
    field: &str,
) -> Result<K> {
    let mut value = serde_json::to_value(target)?;
    let replacement = serde_json::to_value(source)?
        .get_mut(field)
        .map(Value::take)
        .filter(|v| !v.is_null());
    if let Value::Object(map) = &mut value {
        match replacement {
            Some(v) => map.insert(field.to_string(), v),
            None => map.remove(field),
        };
    }
    Ok(serde_json::from_value(value)?)
}

// Generation moves only when the spec changes.
fn next_generation<K: Resource + Serialize>(current: &K, updated: &K) -> Result<Option<i64>> {
    let generation = current.meta().generation.unwrap_or(1);
    let spec_of = |obj: &K| -> Result<Value> {
        Ok(serde_json::to_value(obj)?
            .get_mut("spec")
            .map(Value::take)
            .unwrap_or_default())
    };
    if spec_of(current)? == spec_of(updated)? {
        Ok(Some(generation))
    } else {
        Ok(Some(generation + 1))
    }
}

/// RFC 7386 JSON merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn merge_patch_rfc_examples() {
        let mut doc = json!({"a": "b", "c": {"d": "e", "f": "g"}});
        merge_patch(&mut doc, &json!({"a": "z", "c": {"f": null}}));
        assert_eq!(doc, json!({"a": "z", "c": {"d": "e"}}));

        let mut doc = json!({"a": [1, 2]});
        merge_patch(&mut doc, &json!({"a": [3]}));
        assert_eq!(doc, json!({"a": [3]}));

        let mut doc = json!({"a": "b"});
        merge_patch(&mut doc, &json!({"a": {"bb": {"ccc": null}}}));
        assert_eq!(doc, json!({"a": {"bb": {}}}));
    }
}
