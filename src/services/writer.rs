//! Validated value writes.
//!
//! Inputs are coerced to the attribute's backend type before anything is
//! written. A null input clears the row of the targeted store, which makes that
//! store inherit again; clearing the global row of a required attribute is
//! refused.

use std::collections::HashMap;

use log::debug;

use crate::databases::redb_store::tables::ENTITIES;
use crate::databases::redb_store::values::{self, RowChange, value_key};
use crate::databases::redb_store::{EavStore, EavWriteTxn};
use crate::error::{EavError, EavResult};
use crate::model::{Attribute, AttributeValue, Entity, EntityId, InputValue, StoreId};
use crate::traits::table_source::EavRead;
use crate::traits::value_table::{ValueTable, with_value_table};
use crate::utils::datetime::EavDateTimeExt;
use crate::utils::EavDateTime;

impl EavStore {
    /// Writes one value.
    ///
    /// Writing the value already stored changes nothing, not even the entity's
    /// `updated_at`.
    pub fn set_value(
        &self,
        entity_id: EntityId,
        code: &str,
        value: impl Into<InputValue>,
        store_id: StoreId,
    ) -> EavResult<RowChange> {
        let value = value.into();
        self.write(|txn| {
            let (mut entity, attribute) = txn.entity_attribute(entity_id, code)?;
            let change = write_value_in(txn, &entity, &attribute, &value, store_id)?;
            if change.is_change() {
                touch(txn, &mut entity)?;
            }
            Ok(change)
        })
    }

    /// Writes several values of one entity atomically. If any entry fails,
    /// none is persisted.
    ///
    /// Entries apply in the given order; a repeated code keeps its last value.
    pub fn set_values<I, C, V>(&self, entity_id: EntityId, entries: I, store_id: StoreId) -> EavResult<()>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<InputValue>,
    {
        let entries: Vec<(String, InputValue)> = entries
            .into_iter()
            .map(|(code, value)| (code.into(), value.into()))
            .collect();
        self.write(|txn| {
            let mut entity = txn.entity(entity_id)?;
            let entity_type_id = txn.entity_type_of(&entity)?;
            let mut changed = false;
            for (code, value) in &entries {
                txn.checkpoint()?;
                let attribute = txn.attribute_by_code(entity_type_id, code)?;
                changed |= write_value_in(txn, &entity, &attribute, value, store_id)?.is_change();
            }
            if changed {
                touch(txn, &mut entity)?;
            }
            debug!(
                "EavStore: Wrote {} values for entity {} in store {}",
                entries.len(),
                entity_id,
                store_id
            );
            Ok(())
        })
    }

    /// Removes the value of `code` in `store_id`. Equivalent to writing null.
    pub fn clear_value(&self, entity_id: EntityId, code: &str, store_id: StoreId) -> EavResult<RowChange> {
        self.set_value(entity_id, code, InputValue::Null, store_id)
    }
}

/// Applies one write to an already loaded entity and attribute.
pub(crate) fn write_value_in(
    txn: &EavWriteTxn<'_>,
    entity: &Entity,
    attribute: &Attribute,
    value: &InputValue,
    store_id: StoreId,
) -> EavResult<RowChange> {
    let key = value_key(entity.id, attribute.id, store_id);

    if value.is_null() {
        if store_id.is_global() && attribute.flags.required {
            return Err(EavError::RequiredAttribute {
                code: attribute.code.clone(),
            });
        }
        return with_value_table!(attribute.backend_type, T => values::remove::<T>(txn, key));
    }

    let coerced = value
        .coerce(attribute.backend_type)
        .map_err(|reason| EavError::ValueConversion {
            code: attribute.code.clone(),
            backend: attribute.backend_type,
            reason,
        })?;

    with_value_table!(attribute.backend_type, T => {
        if attribute.flags.unique {
            ensure_unique::<T>(txn, entity.id, attribute, store_id, &coerced)?;
        }
        values::upsert::<T>(txn, &attribute.code, key, &coerced)
    })
}

/// Fails with `DuplicateValue` if another entity holds `value` for the
/// attribute in the same store.
///
/// Payloads are compared in their stored form, so values that encode alike
/// (`1.5` and `1.50`) collide.
fn ensure_unique<T: ValueTable>(
    txn: &EavWriteTxn<'_>,
    entity_id: EntityId,
    attribute: &Attribute,
    store_id: StoreId,
    value: &AttributeValue,
) -> EavResult<()> {
    let payload = T::encode(value);
    for (other, scope) in values::scopes_for_attribute::<T, _>(txn, attribute.id)? {
        if other == entity_id || scope != store_id {
            continue;
        }
        let existing = values::fetch::<T, _>(txn, value_key(other, attribute.id, scope))?;
        if existing.is_some_and(|row| T::encode(&row.value) == payload) {
            return Err(EavError::DuplicateValue {
                code: attribute.code.clone(),
                entity_id: other,
            });
        }
    }
    Ok(())
}

/// Fails with `DuplicateValue` if two entities already share a value of the
/// attribute within one store. Run before an attribute becomes unique.
pub(crate) fn ensure_no_duplicates<T: ValueTable>(
    txn: &EavWriteTxn<'_>,
    attribute: &Attribute,
) -> EavResult<()> {
    let mut seen: HashMap<(StoreId, Option<Vec<u8>>), EntityId> = HashMap::new();
    for row in values::rows_for_attribute::<T, _>(txn, attribute.id)? {
        let payload = T::encode(&row.value);
        if let Some(first) = seen.insert((row.store_id, payload), row.entity_id) {
            return Err(EavError::DuplicateValue {
                code: attribute.code.clone(),
                entity_id: first,
            });
        }
    }
    Ok(())
}

fn touch(txn: &EavWriteTxn<'_>, entity: &mut Entity) -> EavResult<()> {
    entity.updated_at = EavDateTime::eav_now();
    txn.put_record(ENTITIES, entity.id.get(), &*entity)
}
