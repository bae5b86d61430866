//! Error types for devtime.

use std::path::PathBuf;

use thiserror::Error;

/// Stage of a rename cascade, used to report how far a failed cascade got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RenameStage {
    #[display("validating")]
    Validating,
    #[display("moving")]
    Moving,
    #[display("updating descriptor")]
    UpdatingDescriptor,
    #[display("migrating secret")]
    SecretMigration,
    #[display("undeploying old identity")]
    Undeploying,
    #[display("redeploying new identity")]
    Redeploying,
    #[display("done")]
    Done,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("name collision: {} already exists", .0.display())]
    NameCollision(PathBuf),

    #[error("move conflict: {} was created concurrently", .0.display())]
    MoveConflict(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing secret for {0}; re-enter the password and test the data source again")]
    MissingSecret(String),

    #[error("{uri} is invalid: {reason}")]
    RemoteValidationFailure { uri: String, reason: String },

    #[error("connectivity: {0}")]
    Connectivity(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("remote call failed ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage} failed: {source}")]
    Cascade {
        stage: RenameStage,
        #[source]
        source: Box<Error>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap this error as a failure of the given cascade stage.
    pub fn at_stage(self, stage: RenameStage) -> Self {
        Error::Cascade {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through cascade wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Cascade { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
