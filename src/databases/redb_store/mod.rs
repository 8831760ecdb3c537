//! redb backed EAV store.
//!
//! [`EavStore`] owns the database handle. Reads run inside [`EavStore::read`],
//! writes inside [`EavStore::write`], which commits when the closure returns
//! `Ok` and aborts otherwise. The metadata, resolution, write and lifecycle
//! services in [`crate::services`] are methods on `EavStore` built on these two
//! entry points.
//!
//! # Example
//!
//! ```
//! use eav_store::prelude::*;
//!
//! let store = EavStore::temp()?;
//! let set = store.default_attribute_set()?;
//! let tee = store.create_entity("TEE-001", set.id, EntityKind::Simple)?;
//!
//! store.set_value(tee, "name", "Basic tee", StoreId::GLOBAL)?;
//! store.set_value(tee, "name", "T-shirt basique", StoreId(2))?;
//!
//! let fr: Option<String> = store.get_value(tee, "name", StoreId(2))?;
//! let en: Option<String> = store.get_value(tee, "name", StoreId(1))?;
//! assert_eq!(fr.as_deref(), Some("T-shirt basique"));
//! assert_eq!(en.as_deref(), Some("Basic tee"));
//! # Ok::<(), eav_store::error::EavError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

pub mod codec;
pub mod tables;
pub mod transaction;
pub mod values;

pub use transaction::{EavReadTxn, EavWriteTxn};
pub use values::RowChange;

use crate::config::StoreConfig;
use crate::error::{EavError, EavResult};
use crate::services::bootstrap;

/// Handle to an open EAV database.
///
/// Cloning is cheap and clones share the database. Each handle carries a
/// cancellation token; see [`EavStore::with_cancellation`].
#[derive(Clone)]
pub struct EavStore {
    db: Arc<redb::Database>,
    config: Arc<StoreConfig>,
    cancel: CancellationToken,
    // Declared after `db` so the database closes before its file is removed.
    temp_file: Option<Arc<TempFile>>,
}

/// Removes the database file of a [`StoreConfig::remove_on_drop`] store.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!("EavStore: Removed temporary database {}", self.0.display()),
            Err(e) => warn!("EavStore: Failed to remove {}: {e}", self.0.display()),
        }
    }
}

impl EavStore {
    /// Opens (or creates) the database described by `config`, creates missing
    /// tables and seeds the default catalog metadata when configured to.
    pub fn open(config: StoreConfig) -> EavResult<Self> {
        let start = Instant::now();
        debug!("EavStore: Opening database at {}", config.path.display());

        if config.truncate && config.path.exists() {
            std::fs::remove_file(&config.path)?;
        }

        let mut builder = redb::Builder::new();
        builder.set_cache_size(config.cache_size_bytes());
        let db = if config.create_if_missing {
            builder.create(&config.path)?
        } else {
            builder.open(&config.path)?
        };
        debug!("EavStore: Opened in {:?}", start.elapsed());

        let temp_file = config
            .remove_on_drop
            .then(|| Arc::new(TempFile(config.path.clone())));
        let store = Self {
            db: Arc::new(db),
            config: Arc::new(config),
            cancel: CancellationToken::new(),
            temp_file,
        };
        store.write(|txn| {
            txn.create_tables()?;
            if store.config.bootstrap_defaults {
                bootstrap::ensure_defaults(txn, store.config.product_entity_type)?;
            }
            Ok(())
        })?;
        Ok(store)
    }

    /// Opens the database at `path` with default settings.
    pub fn new<P: AsRef<Path>>(path: P) -> EavResult<Self> {
        Self::open(StoreConfig::new(path.as_ref()))
    }

    /// Creates a fresh database in the system temp directory. The file is
    /// deleted when the last clone of the handle is dropped.
    pub fn temp() -> EavResult<Self> {
        debug!("EavStore: Creating temporary database");
        Self::open(StoreConfig::temp())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// A handle on the same database whose writes stop at their next
    /// checkpoint once `token` is cancelled. Nothing is committed for a
    /// cancelled write.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            db: Arc::clone(&self.db),
            config: Arc::clone(&self.config),
            cancel: token,
            temp_file: self.temp_file.clone(),
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs `f` in a read transaction over a consistent snapshot.
    pub fn read<F, R>(&self, f: F) -> EavResult<R>
    where
        F: FnOnce(&EavReadTxn) -> EavResult<R>,
    {
        let txn = EavReadTxn::begin(&self.db)?;
        f(&txn)
    }

    /// Runs `f` in a write transaction and commits it if `f` succeeds.
    ///
    /// Transient storage failures restart the whole transaction, up to
    /// [`StoreConfig::write_retries`] attempts, so `f` may run more than once.
    /// Writers are serialized by redb; a second writer blocks until the first
    /// commits or aborts.
    pub fn write<F, R>(&self, mut f: F) -> EavResult<R>
    where
        F: FnMut(&EavWriteTxn<'_>) -> EavResult<R>,
    {
        transaction::with_retries(self.config.write_retries, |attempt| {
            let txn = EavWriteTxn::begin(&self.db, &self.cancel)?;
            let result = f(&txn)?;
            txn.commit()?;
            if attempt > 1 {
                debug!("EavStore: Write committed on attempt {attempt}");
            }
            Ok(result)
        })
    }

    /// Verifies the database file. Requires that no other clone is alive.
    pub fn check_integrity(&mut self) -> EavResult<bool> {
        let db = Arc::get_mut(&mut self.db).ok_or(EavError::StoreShared {
            operation: "check integrity",
        })?;
        Ok(db.check_integrity()?)
    }

    /// Compacts the database file. Requires that no other clone is alive.
    pub fn compact(&mut self) -> EavResult<bool> {
        let db = Arc::get_mut(&mut self.db).ok_or(EavError::StoreShared {
            operation: "compact",
        })?;
        let start = Instant::now();
        let compacted = db.compact()?;
        debug!("EavStore: Compacted in {:?}", start.elapsed());
        Ok(compacted)
    }
}

impl std::fmt::Debug for EavStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EavStore")
            .field("path", &self.config.path)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
