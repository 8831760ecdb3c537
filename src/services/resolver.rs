//! Store-scoped value resolution.
//!
//! A value is looked up in the requested store, then in the global store, then
//! taken from the attribute's default. Only the table matching the attribute's
//! backend type is consulted.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use strum::IntoEnumIterator;

use super::metadata::attributes_for_type;
use crate::databases::redb_store::values::{self, value_key};
use crate::databases::redb_store::EavStore;
use crate::error::{EavError, EavResult};
use crate::model::{
    Attribute, AttributeId, AttributeValue, BackendType, EntityId, EntityTypeId, InputValue,
    ResolvedValue, StoreId, TypedValue, ValueSource,
};
use crate::traits::attribute_type::AttributeType;
use crate::traits::table_source::{EavRead, TableSource};
use crate::traits::value_table::{ValueTable, with_value_table};

impl EavStore {
    /// Reads the effective value of `code` for the entity in `store_id`.
    ///
    /// Returns `Ok(None)` when no store, global or default value exists. Fails
    /// with `TypeMismatch` when `T` cannot represent the attribute's backend
    /// type; that check happens before any value is read.
    ///
    /// ```
    /// use eav_store::prelude::*;
    /// use rust_decimal::Decimal;
    ///
    /// let store = EavStore::temp()?;
    /// let set = store.default_attribute_set()?;
    /// let id = store.create_entity("MUG-01", set.id, EntityKind::Simple)?;
    /// store.set_value(id, "price", "12.50", StoreId::GLOBAL)?;
    ///
    /// let price: Option<Decimal> = store.get_value(id, "price", StoreId(4))?;
    /// assert_eq!(price, Some(Decimal::new(1250, 2)));
    ///
    /// let wrong: EavResult<Option<String>> = store.get_value(id, "price", StoreId(4));
    /// assert!(matches!(wrong, Err(EavError::TypeMismatch { .. })));
    /// # Ok::<(), EavError>(())
    /// ```
    pub fn get_value<T: AttributeType>(
        &self,
        entity_id: EntityId,
        code: &str,
        store_id: StoreId,
    ) -> EavResult<Option<T>> {
        self.read(|txn| {
            let (_, attribute) = txn.entity_attribute(entity_id, code)?;
            if !T::accepts(attribute.backend_type) {
                return Err(EavError::TypeMismatch {
                    code: attribute.code,
                    backend: attribute.backend_type,
                    requested: T::TYPE_NAME,
                });
            }
            match resolve_in(txn, entity_id, &attribute, store_id)? {
                Some(resolved) => T::from_value(resolved.value)
                    .map(Some)
                    .map_err(|reason| EavError::ValueConversion {
                        code: attribute.code.clone(),
                        backend: attribute.backend_type,
                        reason,
                    }),
                None => Ok(None),
            }
        })
    }

    /// Like [`EavStore::get_value`] but untyped, reporting which tier answered.
    pub fn resolve(
        &self,
        entity_id: EntityId,
        code: &str,
        store_id: StoreId,
    ) -> EavResult<Option<ResolvedValue>> {
        self.read(|txn| {
            let (_, attribute) = txn.entity_attribute(entity_id, code)?;
            resolve_in(txn, entity_id, &attribute, store_id)
        })
    }

    /// Effective values of every attribute of the entity's type in one snapshot.
    /// Attributes without any value are left out.
    pub fn get_values(
        &self,
        entity_id: EntityId,
        store_id: StoreId,
    ) -> EavResult<BTreeMap<String, AttributeValue>> {
        self.read(|txn| {
            let entity = txn.entity(entity_id)?;
            let entity_type_id = txn.entity_type_of(&entity)?;
            let mut resolved = BTreeMap::new();
            for attribute in attributes_for_type(txn, entity_type_id)? {
                if let Some(value) = resolve_in(txn, entity_id, &attribute, store_id)? {
                    resolved.insert(attribute.code, value.value);
                }
            }
            Ok(resolved)
        })
    }

    /// Entities holding a row for the attribute in `store_id` or globally.
    /// Attribute defaults are not considered.
    pub fn entities_with_attribute(
        &self,
        entity_type_id: EntityTypeId,
        code: &str,
        store_id: StoreId,
    ) -> EavResult<Vec<EntityId>> {
        self.read(|txn| {
            let attribute = txn.attribute_by_code(entity_type_id, code)?;
            let scopes = with_value_table!(attribute.backend_type, T => {
                values::scopes_for_attribute::<T, _>(txn, attribute.id)
            })?;
            let entities: BTreeSet<EntityId> = scopes
                .into_iter()
                .filter(|(_, scope)| scope.is_global() || *scope == store_id)
                .map(|(entity_id, _)| entity_id)
                .collect();
            Ok(entities.into_iter().collect())
        })
    }

    /// Raw rows of the entity across all five value tables, without fallback.
    pub fn value_rows_for_entity(&self, entity_id: EntityId) -> EavResult<Vec<TypedValue>> {
        self.read(|txn| {
            let mut rows = Vec::new();
            for backend in BackendType::iter() {
                rows.extend(with_value_table!(backend, T => {
                    values::rows_for_entity::<T, _>(txn, entity_id)
                })?);
            }
            Ok(rows)
        })
    }

    /// Raw rows of the attribute across all five value tables.
    ///
    /// Every table is scanned, so this also finds rows left behind by a
    /// deleted attribute.
    pub fn value_rows_for_attribute(&self, attribute_id: AttributeId) -> EavResult<Vec<TypedValue>> {
        self.read(|txn| {
            let mut rows = Vec::new();
            for backend in BackendType::iter() {
                rows.extend(with_value_table!(backend, T => {
                    values::rows_for_attribute::<T, _>(txn, attribute_id)
                })?);
            }
            Ok(rows)
        })
    }
}

/// Resolves one attribute inside an open transaction.
pub(crate) fn resolve_in<S: TableSource>(
    txn: &S,
    entity_id: EntityId,
    attribute: &Attribute,
    store_id: StoreId,
) -> EavResult<Option<ResolvedValue>> {
    let stored = with_value_table!(attribute.backend_type, T => {
        resolve_stored::<T, S>(txn, entity_id, attribute, store_id)
    })?;
    if stored.is_some() {
        return Ok(stored);
    }

    let Some(raw) = attribute.default_value.as_deref() else {
        trace!("resolve: {} has no value for entity {}", attribute.code, entity_id);
        return Ok(None);
    };
    let value = InputValue::from(raw)
        .coerce(attribute.backend_type)
        .map_err(|reason| EavError::ValueConversion {
            code: attribute.code.clone(),
            backend: attribute.backend_type,
            reason: format!("default value: {reason}"),
        })?;
    trace!("resolve: {} for entity {} from default", attribute.code, entity_id);
    Ok(Some(ResolvedValue {
        value,
        source: ValueSource::AttributeDefault,
    }))
}

fn resolve_stored<T: ValueTable, S: TableSource>(
    txn: &S,
    entity_id: EntityId,
    attribute: &Attribute,
    store_id: StoreId,
) -> EavResult<Option<ResolvedValue>> {
    for scope in store_id.fallback_chain() {
        let Some(row) = values::fetch::<T, S>(txn, value_key(entity_id, attribute.id, scope))? else {
            continue;
        };
        let source = if scope.is_global() {
            ValueSource::Global
        } else {
            ValueSource::Store(scope)
        };
        trace!(
            "resolve: {} for entity {} from {:?} in {}",
            attribute.code,
            entity_id,
            source,
            T::BACKEND
        );
        return Ok(Some(ResolvedValue {
            value: row.value,
            source,
        }));
    }
    Ok(None)
}
