//! Error types for deferack.

use thiserror::Error;

use crate::model::TaskId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("clickup api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Discovery of tasks in `status` failed. Treated as an empty poll.
    #[error("failed to list tasks in status {status:?}: {source}")]
    Fetch {
        status: String,
        #[source]
        source: Box<Error>,
    },

    /// Re-checking a due task's status failed. The task is dropped unacted.
    #[error("failed to verify status of task {id}: {source}")]
    Verify {
        id: TaskId,
        #[source]
        source: Box<Error>,
    },

    /// Committing the final status failed. Not retried.
    #[error("failed to set task {id} to {status:?}: {source}")]
    Update {
        id: TaskId,
        status: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn is_verify(&self) -> bool {
        matches!(self, Self::Verify { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
