//! Catalog operations on [`EavStore`](crate::databases::redb_store::EavStore).
//!
//! Each module adds methods to the store handle:
//!
//! - [`metadata`]: attribute sets, groups and attribute definitions
//! - [`resolver`]: typed reads with store, global and default fallback
//! - [`writer`]: validated value writes
//! - [`lifecycle`]: entities and their category links
//! - [`bootstrap`]: default catalog metadata seeded on open

pub mod bootstrap;
pub mod lifecycle;
pub mod metadata;
pub mod resolver;
pub mod writer;

pub use bootstrap::DEFAULT_SET_NAME;
