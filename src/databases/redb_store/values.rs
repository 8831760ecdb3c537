//! Row level access to the typed value tables.
//!
//! Every function is generic over [`ValueTable`]; callers pick the table with
//! `with_value_table!` from the attribute's backend type. Value rows and their
//! attribute index entries are always written and removed together.

use redb::{ReadableMultimapTable, ReadableTable};

use super::tables::{ValueKey, sequence};
use super::transaction::EavWriteTxn;
use crate::error::{EavError, EavResult};
use crate::model::{AttributeId, AttributeValue, EntityId, StoreId, TypedValue};
use crate::traits::table_source::TableSource;
use crate::traits::value_table::ValueTable;

/// What a write did to the targeted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Inserted,
    Updated,
    /// The row already held this value.
    Unchanged,
    Removed,
    /// A clear found no row to remove.
    Absent,
}

impl RowChange {
    pub fn is_change(self) -> bool {
        matches!(
            self,
            RowChange::Inserted | RowChange::Updated | RowChange::Removed
        )
    }
}

pub(crate) fn value_key(entity_id: EntityId, attribute_id: AttributeId, store_id: StoreId) -> ValueKey {
    (entity_id.get(), attribute_id.get(), store_id.get())
}

fn typed_row<T: ValueTable>(key: ValueKey, value_id: u64, payload: &[u8]) -> EavResult<TypedValue> {
    let (entity_id, attribute_id, store_id) = key;
    Ok(TypedValue {
        value_id,
        entity_id: EntityId(entity_id),
        attribute_id: AttributeId(attribute_id),
        store_id: StoreId(store_id),
        value: T::decode(payload)?,
    })
}

/// The row stored for exactly this scope, without fallback.
pub(crate) fn fetch<T: ValueTable, S: TableSource>(
    source: &S,
    key: ValueKey,
) -> EavResult<Option<TypedValue>> {
    let table = source.table(T::VALUES)?;
    let guard = table.get(key)?;
    let row = match guard {
        Some(row) => {
            let (value_id, payload) = row.value();
            Some(typed_row::<T>(key, value_id, payload)?)
        }
        None => None,
    };
    Ok(row)
}

/// Inserts or replaces the row for `key`.
///
/// An existing row keeps its value id. Writing the stored payload again leaves
/// the table untouched.
pub(crate) fn upsert<T: ValueTable>(
    txn: &EavWriteTxn<'_>,
    code: &str,
    key: ValueKey,
    value: &AttributeValue,
) -> EavResult<RowChange> {
    let payload = T::encode(value).ok_or_else(|| EavError::ValueConversion {
        code: code.to_string(),
        backend: T::BACKEND,
        reason: format!("{} value cannot be stored here", value.backend_type()),
    })?;

    let existing = {
        let table = txn.table(T::VALUES)?;
        let guard = table.get(key)?;
        guard.map(|row| {
            let (value_id, stored) = row.value();
            (value_id, stored == payload.as_slice())
        })
    };

    match existing {
        Some((_, true)) => Ok(RowChange::Unchanged),
        Some((value_id, false)) => {
            let mut table = txn.table(T::VALUES)?;
            table.insert(key, (value_id, payload.as_slice()))?;
            Ok(RowChange::Updated)
        }
        None => {
            let value_id = txn.next_id(sequence::VALUE)?;
            {
                let mut table = txn.table(T::VALUES)?;
                table.insert(key, (value_id, payload.as_slice()))?;
            }
            let mut index = txn.multimap(T::BY_ATTRIBUTE)?;
            index.insert(key.1, (key.0, key.2))?;
            Ok(RowChange::Inserted)
        }
    }
}

/// Deletes the row for `key` if there is one.
pub(crate) fn remove<T: ValueTable>(txn: &EavWriteTxn<'_>, key: ValueKey) -> EavResult<RowChange> {
    let removed = txn.table(T::VALUES)?.remove(key)?.is_some();
    if !removed {
        return Ok(RowChange::Absent);
    }
    let mut index = txn.multimap(T::BY_ATTRIBUTE)?;
    index.remove(key.1, (key.0, key.2))?;
    Ok(RowChange::Removed)
}

/// Every row of `entity_id` in this table, ordered by attribute then store.
pub(crate) fn rows_for_entity<T: ValueTable, S: TableSource>(
    source: &S,
    entity_id: EntityId,
) -> EavResult<Vec<TypedValue>> {
    let table = source.table(T::VALUES)?;
    let id = entity_id.get();
    let mut rows = Vec::new();
    for entry in table.range((id, 0u64, 0u32)..=(id, u64::MAX, u32::MAX))? {
        let (key, row) = entry?;
        let (value_id, payload) = row.value();
        rows.push(typed_row::<T>(key.value(), value_id, payload)?);
    }
    Ok(rows)
}

/// `(entity_id, store_id)` pairs holding a row for the attribute.
pub(crate) fn scopes_for_attribute<T: ValueTable, S: TableSource>(
    source: &S,
    attribute_id: AttributeId,
) -> EavResult<Vec<(EntityId, StoreId)>> {
    let index = source.multimap(T::BY_ATTRIBUTE)?;
    let mut scopes = Vec::new();
    for entry in index.get(attribute_id.get())? {
        let (entity_id, store_id) = entry?.value();
        scopes.push((EntityId(entity_id), StoreId(store_id)));
    }
    Ok(scopes)
}

/// Every row of the attribute in this table, across entities and stores.
pub(crate) fn rows_for_attribute<T: ValueTable, S: TableSource>(
    source: &S,
    attribute_id: AttributeId,
) -> EavResult<Vec<TypedValue>> {
    let scopes = scopes_for_attribute::<T, S>(source, attribute_id)?;
    let mut rows = Vec::with_capacity(scopes.len());
    for (entity_id, store_id) in scopes {
        if let Some(row) = fetch::<T, S>(source, value_key(entity_id, attribute_id, store_id))? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Removes every row of the entity from this table. Returns the number removed.
pub(crate) fn purge_entity<T: ValueTable>(
    txn: &EavWriteTxn<'_>,
    entity_id: EntityId,
) -> EavResult<usize> {
    let id = entity_id.get();
    let keys: Vec<ValueKey> = {
        let table = txn.table(T::VALUES)?;
        let mut keys = Vec::new();
        for entry in table.range((id, 0u64, 0u32)..=(id, u64::MAX, u32::MAX))? {
            keys.push(entry?.0.value());
        }
        keys
    };
    if keys.is_empty() {
        return Ok(0);
    }

    let mut table = txn.table(T::VALUES)?;
    let mut index = txn.multimap(T::BY_ATTRIBUTE)?;
    for key in &keys {
        table.remove(*key)?;
        index.remove(key.1, (key.0, key.2))?;
    }
    Ok(keys.len())
}

/// Removes every row of the attribute from this table. Returns the number removed.
pub(crate) fn purge_attribute<T: ValueTable>(
    txn: &EavWriteTxn<'_>,
    attribute_id: AttributeId,
) -> EavResult<usize> {
    let scopes = scopes_for_attribute::<T, _>(txn, attribute_id)?;
    if scopes.is_empty() {
        return Ok(0);
    }

    let mut table = txn.table(T::VALUES)?;
    for (entity_id, store_id) in &scopes {
        table.remove(value_key(*entity_id, attribute_id, *store_id))?;
    }
    let mut index = txn.multimap(T::BY_ATTRIBUTE)?;
    index.remove_all(attribute_id.get())?;
    Ok(scopes.len())
}
