//! Read and write transactions over the EAV tables.
//!
//! A write transaction is all-or-nothing: [`EavWriteTxn`] is committed only by
//! the store after the caller's closure returns `Ok`, and dropping it without
//! committing aborts every change. Cancellation is checked through
//! [`EavWriteTxn::checkpoint`], which long running operations call between
//! steps.

use std::time::Instant;

use log::{debug, warn};
use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableTable, TableDefinition, Value,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::codec;
use super::tables::{self, SEQUENCES};
use crate::error::{EavError, EavResult};
use crate::traits::table_source::TableSource;
use crate::traits::value_table::{
    DatetimeTable, DecimalTable, IntTable, TextTable, ValueTable, VarcharTable,
};

pub struct EavReadTxn {
    txn: redb::ReadTransaction,
}

impl EavReadTxn {
    pub(crate) fn begin(db: &Database) -> EavResult<Self> {
        Ok(Self {
            txn: db.begin_read()?,
        })
    }
}

impl TableSource for EavReadTxn {
    type Table<'t, K: redb::Key + 'static, V: Value + 'static> = redb::ReadOnlyTable<K, V>;
    type Multimap<'t, K: redb::Key + 'static, V: redb::Key + 'static> =
        redb::ReadOnlyMultimapTable<K, V>;

    fn table<K: redb::Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> EavResult<Self::Table<'_, K, V>> {
        Ok(self.txn.open_table(definition)?)
    }

    fn multimap<K: redb::Key + 'static, V: redb::Key + 'static>(
        &self,
        definition: MultimapTableDefinition<'_, K, V>,
    ) -> EavResult<Self::Multimap<'_, K, V>> {
        Ok(self.txn.open_multimap_table(definition)?)
    }
}

pub struct EavWriteTxn<'s> {
    txn: redb::WriteTransaction,
    cancel: &'s CancellationToken,
}

impl<'s> EavWriteTxn<'s> {
    pub(crate) fn begin(db: &Database, cancel: &'s CancellationToken) -> EavResult<Self> {
        if cancel.is_cancelled() {
            return Err(EavError::Cancelled);
        }
        Ok(Self {
            txn: db.begin_write()?,
            cancel,
        })
    }

    /// Fails with [`EavError::Cancelled`] once the store's token has fired.
    ///
    /// Returning the error from the write closure aborts the transaction.
    pub fn checkpoint(&self) -> EavResult<()> {
        if self.cancel.is_cancelled() {
            debug!("EavWriteTxn: Cancelled before commit");
            return Err(EavError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn commit(self) -> EavResult<()> {
        self.checkpoint()?;
        let start = Instant::now();
        self.txn.commit()?;
        debug!("EavWriteTxn: Committed in {:?}", start.elapsed());
        Ok(())
    }

    /// Allocates the next id from `sequence`. Ids start at 1.
    pub(crate) fn next_id(&self, sequence: &str) -> EavResult<u64> {
        let mut table = self.txn.open_table(SEQUENCES)?;
        let current = table.get(sequence)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(sequence, next)?;
        Ok(next)
    }

    /// Encodes and stores a record under `id`, replacing any previous one.
    pub(crate) fn put_record<T: Serialize>(
        &self,
        definition: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
        record: &T,
    ) -> EavResult<()> {
        let bytes = codec::encode(record)?;
        let mut table = self.txn.open_table(definition)?;
        table.insert(id, bytes.as_slice())?;
        Ok(())
    }

    pub(crate) fn remove_record(
        &self,
        definition: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
    ) -> EavResult<bool> {
        let mut table = self.txn.open_table(definition)?;
        let removed = table.remove(id)?.is_some();
        Ok(removed)
    }

    /// Opens every table once so that read transactions never meet a missing one.
    pub(crate) fn create_tables(&self) -> EavResult<()> {
        self.txn.open_table(tables::SEQUENCES)?;
        self.txn.open_table(tables::SEEDED)?;
        self.txn.open_table(tables::ATTRIBUTE_SETS)?;
        self.txn.open_table(tables::ATTRIBUTE_SET_NAMES)?;
        self.txn.open_table(tables::ATTRIBUTE_GROUPS)?;
        self.txn.open_table(tables::ATTRIBUTE_GROUP_NAMES)?;
        self.txn.open_multimap_table(tables::GROUPS_BY_SET)?;
        self.txn.open_table(tables::ATTRIBUTES)?;
        self.txn.open_table(tables::ATTRIBUTE_CODES)?;
        self.txn.open_multimap_table(tables::ATTRIBUTES_BY_GROUP)?;
        self.txn.open_table(tables::ENTITIES)?;
        self.txn.open_table(tables::ENTITY_SKUS)?;
        self.txn.open_multimap_table(tables::ENTITIES_BY_SET)?;
        self.txn.open_multimap_table(tables::ENTITY_CATEGORIES)?;
        self.txn.open_multimap_table(tables::CATEGORY_ENTITIES)?;
        self.create_value_table::<VarcharTable>()?;
        self.create_value_table::<TextTable>()?;
        self.create_value_table::<IntTable>()?;
        self.create_value_table::<DecimalTable>()?;
        self.create_value_table::<DatetimeTable>()?;
        Ok(())
    }

    fn create_value_table<T: ValueTable>(&self) -> EavResult<()> {
        self.txn.open_table(T::VALUES)?;
        self.txn.open_multimap_table(T::BY_ATTRIBUTE)?;
        Ok(())
    }
}

impl TableSource for EavWriteTxn<'_> {
    type Table<'t, K: redb::Key + 'static, V: Value + 'static>
        = redb::Table<'t, K, V>
    where
        Self: 't;
    type Multimap<'t, K: redb::Key + 'static, V: redb::Key + 'static>
        = redb::MultimapTable<'t, K, V>
    where
        Self: 't;

    fn table<K: redb::Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> EavResult<Self::Table<'_, K, V>> {
        Ok(self.txn.open_table(definition)?)
    }

    fn multimap<K: redb::Key + 'static, V: redb::Key + 'static>(
        &self,
        definition: MultimapTableDefinition<'_, K, V>,
    ) -> EavResult<Self::Multimap<'_, K, V>> {
        Ok(self.txn.open_multimap_table(definition)?)
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error or
/// `budget` attempts have failed. The attempt number starts at 1.
pub(crate) fn with_retries<R>(
    budget: u32,
    mut attempt: impl FnMut(u32) -> EavResult<R>,
) -> EavResult<R> {
    let budget = budget.max(1);
    for n in 1..=budget {
        match attempt(n) {
            Err(e) if e.is_retryable() => {
                warn!("EavStore: Write attempt {n}/{budget} failed: {e}");
            }
            result => return result,
        }
    }
    Err(EavError::ConcurrentWrite { attempts: budget })
}
