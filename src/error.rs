use std::fmt;

/// The kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Sprint,
    Assignment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => write!(f, "task"),
            EntityKind::Sprint => write!(f, "sprint"),
            EntityKind::Assignment => write!(f, "assignment"),
        }
    }
}

/// Failures reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be reached or the read/write failed.
    Unavailable(String),
    /// A durable table lacks an expected column, or holds a cell that
    /// cannot be read as its column's type.
    SchemaMismatch { table: String, detail: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            StorageError::SchemaMismatch { table, detail } => {
                write!(f, "schema mismatch in table {}: {}", table, detail)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Errors surfaced by tracker operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Bad input shape or range. Never touches stored state.
    Validation { field: &'static str, reason: String },
    /// A task, sprint or assignment referenced by name does not exist.
    NotFound { kind: EntityKind, name: String },
    /// The storage backend failed; in-memory state may be ahead of it.
    StorageUnavailable(String),
    /// The durable tables do not have the expected shape.
    SchemaMismatch { table: String, detail: String },
}

impl TrackerError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        TrackerError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: EntityKind, name: &str) -> Self {
        TrackerError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Validation { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            TrackerError::NotFound { kind, name } => write!(f, "no {} named '{}'", kind, name),
            TrackerError::StorageUnavailable(msg) => write!(f, "storage unavailable: {}", msg),
            TrackerError::SchemaMismatch { table, detail } => {
                write!(f, "schema mismatch in table {}: {}", table, detail)
            }
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<StorageError> for TrackerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => TrackerError::StorageUnavailable(msg),
            StorageError::SchemaMismatch { table, detail } => {
                TrackerError::SchemaMismatch { table, detail }
            }
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
