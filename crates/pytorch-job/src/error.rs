use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: String, name: String },

    #[error(
        "operation cannot be fulfilled on {kind} \"{name}\": resource version {given} does not match {current}"
    )]
    Conflict {
        kind: String,
        name: String,
        given: String,
        current: String,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid label selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("unsupported patch type: {0}")]
    UnsupportedPatch(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
