//! Prelude module for convenient imports.
//!
//! ```
//! use eav_store::prelude::*;
//! ```
//!
//! # What's Included
//!
//! - [`EavStore`] and its transactions, [`EavReadTxn`] and [`EavWriteTxn`]
//! - [`StoreConfig`]
//! - the record and id types from [`crate::model`]
//! - [`AttributeType`] for typed reads, [`EavRead`] for lookups inside
//!   transactions
//! - [`EavError`] and [`EavResult`]
//!
//! Table definitions and the value table plumbing stay in their modules.

// Store and transactions
pub use crate::databases::redb_store::{EavReadTxn, EavStore, EavWriteTxn, RowChange};

// Configuration
pub use crate::config::StoreConfig;

// Model
pub use crate::model::{
    Attribute, AttributeFlags, AttributeGroup, AttributeGroupId, AttributeId, AttributeSet,
    AttributeSetId, AttributeUpdate, AttributeValue, BackendType, CategoryId, Entity, EntityId,
    EntityKind, EntityTypeId, FrontendInput, InputValue, NewAttribute, ResolvedValue, StoreId,
    TypedValue, ValueSource,
};

// Traits
pub use crate::traits::{AttributeType, EavRead};

// Error handling
pub use crate::error::{EavError, EavResult};

// Value types used by attribute values
pub use crate::utils::EavDateTime;
pub use rust_decimal::Decimal;
