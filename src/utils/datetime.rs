//! DateTime utilities shared by entity timestamps and datetime attribute values.
//!
//! Datetime values are persisted as microseconds since the Unix epoch, which
//! keeps their on-disk form fixed-width and independent of serde.

use chrono::{DateTime, Utc};

/// Type alias for `DateTime<Utc>` used throughout eav_store
pub type EavDateTime = DateTime<Utc>;

/// Helper trait for creating and persisting EavDateTime instances
pub trait EavDateTimeExt: Sized {
    /// Current UTC time truncated to microsecond precision, so that a value read
    /// back from storage compares equal to the one written.
    fn eav_now() -> Self;

    /// Drops sub-microsecond precision, which storage does not keep.
    fn to_storage_precision(&self) -> Self;

    fn to_storage_micros(&self) -> i64;

    fn from_storage_micros(micros: i64) -> Option<Self>;
}

impl EavDateTimeExt for DateTime<Utc> {
    fn eav_now() -> Self {
        Utc::now().to_storage_precision()
    }

    fn to_storage_precision(&self) -> Self {
        DateTime::from_timestamp_micros(self.timestamp_micros()).unwrap_or(*self)
    }

    fn to_storage_micros(&self) -> i64 {
        self.timestamp_micros()
    }

    fn from_storage_micros(micros: i64) -> Option<Self> {
        DateTime::from_timestamp_micros(micros)
    }
}

// Re-export chrono for convenience
pub use chrono;
