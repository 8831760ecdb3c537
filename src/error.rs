//! Error types for EAV store operations.
//!
//! Every public API in this crate returns [`EavResult<T>`], an alias for
//! `Result<T, EavError>`. Storage errors from `redb` and encoding errors from
//! `bincode` convert automatically through `From`, so they propagate with `?`.
//!
//! # Error Handling Example
//!
//! ```
//! use eav_store::error::{EavError, EavResult};
//!
//! fn lookup() -> EavResult<()> {
//!     Err(EavError::RequiredAttribute { code: "name".into() })
//! }
//!
//! match lookup() {
//!     Ok(()) => {}
//!     Err(EavError::RequiredAttribute { code }) => assert_eq!(code, "name"),
//!     Err(other) => panic!("unexpected error: {other}"),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::model::{AttributeGroupId, AttributeSetId, BackendType, EntityId, EntityTypeId};

/// Result type alias for EAV store operations.
pub type EavResult<T> = Result<T, EavError>;

/// Kinds of metadata and entity records, used to label `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RecordKind {
    #[strum(to_string = "entity")]
    Entity,
    #[strum(to_string = "attribute")]
    Attribute,
    #[strum(to_string = "attribute set")]
    AttributeSet,
    #[strum(to_string = "attribute group")]
    AttributeGroup,
}

/// The main error type for EAV store operations.
#[derive(Error, Debug)]
pub enum EavError {
    /// Wraps errors from the redb database
    #[error(transparent)]
    RedbError(#[from] RedbError),

    /// Wraps deserialization errors from bincode
    #[error(transparent)]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Wraps serialization errors from bincode
    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    /// I/O error while preparing the database file
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// A record addressed by id (or natural key) does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    /// No attribute with this code exists for the entity type.
    #[error("attribute `{code}` not found for entity type {entity_type_id}")]
    AttributeNotFound {
        entity_type_id: EntityTypeId,
        code: String,
    },

    #[error("attribute code `{code}` already exists for entity type {entity_type_id}")]
    DuplicateCode {
        entity_type_id: EntityTypeId,
        code: String,
    },

    /// The natural key (SKU) is already taken by another entity.
    #[error("an entity with key `{key}` already exists")]
    DuplicateKey { key: String },

    #[error("{kind} named `{name}` already exists")]
    DuplicateName { kind: RecordKind, name: String },

    /// A unique attribute already holds this value on another entity.
    #[error("value for unique attribute `{code}` is already used by entity {entity_id}")]
    DuplicateValue { code: String, entity_id: EntityId },

    /// The caller asked for a Rust type the attribute's backend cannot produce.
    #[error("attribute `{code}` is stored as {backend}; it cannot be read as {requested}")]
    TypeMismatch {
        code: String,
        backend: BackendType,
        requested: &'static str,
    },

    /// A value could not be coerced into the attribute's backend type.
    #[error("cannot convert value for attribute `{code}` to {backend}: {reason}")]
    ValueConversion {
        code: String,
        backend: BackendType,
        reason: String,
    },

    #[error("attribute `{code}` is required; its global value cannot be cleared")]
    RequiredAttribute { code: String },

    #[error("attribute `{code}` is stored as {current}; it cannot be changed to {requested}")]
    BackendTypeImmutable {
        code: String,
        current: BackendType,
        requested: BackendType,
    },

    #[error("attribute set {0} does not exist")]
    InvalidAttributeSet(AttributeSetId),

    #[error("attribute group {group_id} belongs to a set of another entity type than {entity_type_id}")]
    GroupEntityTypeMismatch {
        group_id: AttributeGroupId,
        entity_type_id: EntityTypeId,
    },

    #[error("attribute set {set_id} is still referenced by {entities} entities")]
    AttributeSetInUse {
        set_id: AttributeSetId,
        entities: usize,
    },

    #[error("invalid attribute code `{0}`")]
    InvalidAttributeCode(String),

    #[error("invalid natural key `{0}`")]
    InvalidNaturalKey(String),

    /// A write kept failing with transient storage errors.
    #[error("write abandoned after {attempts} attempts")]
    ConcurrentWrite { attempts: u32 },

    /// The operation's cancellation token fired; nothing was committed.
    #[error("operation cancelled")]
    Cancelled,

    /// Maintenance needs exclusive access but other clones of the store are alive.
    #[error("cannot {operation}: the database is shared by other store handles")]
    StoreShared { operation: &'static str },

    #[error("corrupt record in `{table}`: {reason}")]
    CorruptRecord { table: &'static str, reason: String },
}

impl EavError {
    pub(crate) fn not_found(kind: RecordKind, key: impl ToString) -> Self {
        EavError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Whether a failed write transaction may succeed if attempted again.
    ///
    /// Only interrupted, would-block and timed-out I/O failures from the storage
    /// engine qualify. Everything else is a definitive answer.
    pub fn is_retryable(&self) -> bool {
        let storage = match self {
            EavError::RedbError(RedbError::StorageError(e)) => e,
            EavError::RedbError(RedbError::TransactionError(redb::TransactionError::Storage(e))) => e,
            EavError::RedbError(RedbError::CommitError(redb::CommitError::Storage(e))) => e,
            EavError::RedbError(RedbError::TableError(redb::TableError::Storage(e))) => e,
            _ => return false,
        };
        match storage {
            redb::StorageError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Errors that can occur when interacting with the redb database.
#[derive(Error, Debug)]
pub enum RedbError {
    /// Errors from database creation or opening
    #[error(transparent)]
    DatabaseError(#[from] redb::DatabaseError),

    /// Errors from transaction operations
    #[error(transparent)]
    TransactionError(#[from] redb::TransactionError),

    /// Errors from table operations
    #[error(transparent)]
    TableError(#[from] redb::TableError),

    /// Errors from committing transactions
    #[error(transparent)]
    CommitError(#[from] redb::CommitError),

    /// Errors from storage operations
    #[error(transparent)]
    StorageError(#[from] redb::StorageError),

    /// Errors from database compaction
    #[error(transparent)]
    CompactionError(#[from] redb::CompactionError),
}

macro_rules! impl_from_redb {
    ($($err:ty => $variant:ident),*) => {
        $(
            impl From<$err> for EavError {
                fn from(err: $err) -> Self {
                    EavError::RedbError(RedbError::$variant(err))
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError => DatabaseError,
    redb::TransactionError => TransactionError,
    redb::TableError => TableError,
    redb::CommitError => CommitError,
    redb::StorageError => StorageError,
    redb::CompactionError => CompactionError
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_io_is_retryable() {
        let err = EavError::from(redb::StorageError::Io(io::Error::new(
            io::ErrorKind::Interrupted,
            "interrupted",
        )));
        assert!(err.is_retryable());

        let commit = EavError::from(redb::CommitError::Storage(redb::StorageError::Io(
            io::Error::new(io::ErrorKind::WouldBlock, "busy"),
        )));
        assert!(commit.is_retryable());
    }

    #[test]
    fn domain_errors_are_final() {
        let err = EavError::RequiredAttribute { code: "name".into() };
        assert!(!err.is_retryable());

        let corrupted = EavError::from(redb::StorageError::Corrupted("bad page".into()));
        assert!(!corrupted.is_retryable());

        let io = EavError::from(io::Error::new(io::ErrorKind::Interrupted, "plain io"));
        assert!(!io.is_retryable());
    }

    #[test]
    fn not_found_display_names_the_record() {
        let err = EavError::not_found(RecordKind::AttributeSet, 7);
        assert_eq!(err.to_string(), "attribute set not found: 7");
    }
}
