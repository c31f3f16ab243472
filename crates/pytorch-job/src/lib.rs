//! Declarative model of the `kubeflow.org` PyTorchJob resource.
//!
//! Three schema revisions (`v1beta1`, `v1beta2`, `v1`) share one set of
//! replica and status types from [`common`]. Validation and defaulting are
//! written once against [`JobRevision`] and apply to every revision.

pub mod cache;
pub mod common;
pub mod defaults;
pub mod error;
pub mod fake;
pub mod isolation;
pub mod labels;
pub mod revision;
pub mod v1;
pub mod v1beta1;
pub mod v1beta2;
pub mod validation;

pub use cache::JobCache;
pub use common::{
    CleanPodPolicy, JobCondition, JobConditionType, JobList, JobStatus, ReplicaSpec,
    ReplicaStatus, ReplicaType, RestartPolicy,
};
pub use error::{Error, Result};
pub use isolation::{DeepCopy, deep_copy_opt};
pub use revision::JobRevision;
pub use validation::{ValidationError, Violation, validate_spec};

/// API group every revision is served under.
pub const GROUP: &str = "kubeflow.org";

pub const KIND: &str = "PyTorchJob";

pub const PLURAL: &str = "pytorchjobs";

/// Name of the container that runs the training process in every replica.
pub const DEFAULT_CONTAINER_NAME: &str = "pytorch";

pub const DEFAULT_PORT_NAME: &str = "pytorchjob-port";

pub const DEFAULT_PORT: i32 = 23456;
