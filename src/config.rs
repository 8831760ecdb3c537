//! Store configuration.
//!
//! Built with `typed-builder`, so only the path is mandatory.

use std::path::PathBuf;
use typed_builder::TypedBuilder;

use crate::model::EntityTypeId;

/// Configuration for an [`EavStore`](crate::databases::redb_store::EavStore).
///
/// # Examples
///
/// ```
/// use eav_store::config::StoreConfig;
///
/// // Create with defaults
/// let config = StoreConfig::builder()
///     .path("catalog.redb")
///     .build();
/// assert_eq!(config.write_retries, 3);
///
/// // Customize options
/// let config = StoreConfig::builder()
///     .path("/data/catalog.redb")
///     .cache_size_mb(512)
///     .bootstrap_defaults(false)
///     .build();
/// assert!(!config.bootstrap_defaults);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct StoreConfig {
    /// Path to the database file
    #[builder(setter(into))]
    pub path: PathBuf,

    /// Page cache size in megabytes
    #[builder(default = 64)]
    pub cache_size_mb: usize,

    /// Whether to create the database if it doesn't exist
    #[builder(default = true)]
    pub create_if_missing: bool,

    /// Whether to delete an existing database file before opening
    #[builder(default = false)]
    pub truncate: bool,

    /// Delete the database file once the last store handle is dropped
    #[builder(default = false)]
    pub remove_on_drop: bool,

    /// Attempts made for a write transaction that fails with a transient
    /// storage error before giving up with `ConcurrentWrite`
    #[builder(default = 3)]
    pub write_retries: u32,

    /// Seed the default product attribute set, groups and attributes on open
    #[builder(default = true)]
    pub bootstrap_defaults: bool,

    /// Entity type the bootstrap seeds metadata for
    #[builder(default = EntityTypeId::PRODUCT)]
    pub product_entity_type: EntityTypeId,
}

impl StoreConfig {
    /// Create a basic configuration with just a path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::builder().path(path).build()
    }

    /// Create configuration for a temporary database, removed when the last
    /// handle on it is dropped
    pub fn temp() -> Self {
        let temp_path =
            std::env::temp_dir().join(format!("eav_store_{}.redb", uuid::Uuid::new_v4()));
        Self::builder()
            .path(temp_path)
            .truncate(true)
            .remove_on_drop(true)
            .build()
    }

    pub(crate) fn cache_size_bytes(&self) -> usize {
        self.cache_size_mb.saturating_mul(1024 * 1024)
    }
}
