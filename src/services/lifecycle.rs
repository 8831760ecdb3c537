//! Entity creation, deletion and category links.

use log::debug;
use redb::ReadableTableMetadata;
use strum::IntoEnumIterator;

use crate::databases::redb_store::tables::{
    CATEGORY_ENTITIES, ENTITIES, ENTITIES_BY_SET, ENTITY_CATEGORIES, ENTITY_SKUS, sequence,
};
use crate::databases::redb_store::{EavStore, values};
use crate::error::{EavError, EavResult};
use crate::model::{AttributeSetId, BackendType, CategoryId, Entity, EntityId, EntityKind};
use crate::traits::table_source::{EavRead, TableSource};
use crate::traits::value_table::with_value_table;
use crate::utils::datetime::EavDateTimeExt;
use crate::utils::EavDateTime;

impl EavStore {
    /// Creates an entity in an attribute set. The SKU is trimmed and must be
    /// unique across all entities.
    pub fn create_entity(
        &self,
        sku: &str,
        attribute_set_id: AttributeSetId,
        kind: EntityKind,
    ) -> EavResult<EntityId> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(EavError::InvalidNaturalKey(sku.to_string()));
        }
        self.write(|txn| {
            if txn.find_attribute_set(attribute_set_id)?.is_none() {
                return Err(EavError::InvalidAttributeSet(attribute_set_id));
            }
            if txn.entity_id_by_sku(sku)?.is_some() {
                return Err(EavError::DuplicateKey {
                    key: sku.to_string(),
                });
            }

            let now = EavDateTime::eav_now();
            let entity = Entity {
                id: EntityId(txn.next_id(sequence::ENTITY)?),
                sku: sku.to_string(),
                kind,
                attribute_set_id,
                created_at: now,
                updated_at: now,
            };
            txn.put_record(ENTITIES, entity.id.get(), &entity)?;
            txn.table(ENTITY_SKUS)?
                .insert(entity.sku.as_str(), entity.id.get())?;
            txn.multimap(ENTITIES_BY_SET)?
                .insert(attribute_set_id.get(), entity.id.get())?;
            debug!("EavStore: Created entity {} ({})", entity.sku, entity.id);
            Ok(entity.id)
        })
    }

    pub fn get_entity(&self, id: EntityId) -> EavResult<Entity> {
        self.read(|txn| txn.entity(id))
    }

    pub fn get_entity_by_sku(&self, sku: &str) -> EavResult<Option<Entity>> {
        self.read(|txn| match txn.entity_id_by_sku(sku.trim())? {
            Some(id) => txn.find_entity(id),
            None => Ok(None),
        })
    }

    pub fn entities_in_set(&self, attribute_set_id: AttributeSetId) -> EavResult<Vec<EntityId>> {
        self.read(|txn| {
            txn.attribute_set(attribute_set_id)?;
            let ids = txn.linked_ids(ENTITIES_BY_SET, attribute_set_id.get())?;
            Ok(ids.into_iter().map(EntityId).collect())
        })
    }

    /// Number of entities, for diagnostics.
    pub fn entity_count(&self) -> EavResult<u64> {
        self.read(|txn| Ok(txn.table(ENTITIES)?.len()?))
    }

    /// Deletes an entity with all of its values and category links.
    pub fn delete_entity(&self, id: EntityId) -> EavResult<()> {
        self.write(|txn| {
            let entity = txn.entity(id)?;

            let mut purged = 0;
            for backend in BackendType::iter() {
                txn.checkpoint()?;
                purged += with_value_table!(backend, T => values::purge_entity::<T>(txn, id))?;
            }

            txn.checkpoint()?;
            let categories = txn.linked_ids(ENTITY_CATEGORIES, id.get())?;
            {
                let mut members = txn.multimap(CATEGORY_ENTITIES)?;
                for category in &categories {
                    members.remove(*category, id.get())?;
                }
            }
            txn.multimap(ENTITY_CATEGORIES)?.remove_all(id.get())?;

            txn.table(ENTITY_SKUS)?.remove(entity.sku.as_str())?;
            txn.multimap(ENTITIES_BY_SET)?
                .remove(entity.attribute_set_id.get(), id.get())?;
            txn.remove_record(ENTITIES, id.get())?;
            debug!(
                "EavStore: Deleted entity {} ({}) with {} value rows and {} category links",
                entity.sku,
                id,
                purged,
                categories.len()
            );
            Ok(())
        })
    }

    /// Links the entity to a category. Returns `false` if it already was.
    pub fn assign_category(&self, entity_id: EntityId, category_id: CategoryId) -> EavResult<bool> {
        self.write(|txn| {
            txn.entity(entity_id)?;
            let existed = txn
                .multimap(ENTITY_CATEGORIES)?
                .insert(entity_id.get(), category_id.get())?;
            txn.multimap(CATEGORY_ENTITIES)?
                .insert(category_id.get(), entity_id.get())?;
            Ok(!existed)
        })
    }

    /// Removes a category link. Returns `false` if there was none.
    pub fn unassign_category(
        &self,
        entity_id: EntityId,
        category_id: CategoryId,
    ) -> EavResult<bool> {
        self.write(|txn| {
            let removed = txn
                .multimap(ENTITY_CATEGORIES)?
                .remove(entity_id.get(), category_id.get())?;
            txn.multimap(CATEGORY_ENTITIES)?
                .remove(category_id.get(), entity_id.get())?;
            Ok(removed)
        })
    }

    pub fn categories_of(&self, entity_id: EntityId) -> EavResult<Vec<CategoryId>> {
        self.read(|txn| {
            txn.entity(entity_id)?;
            let ids = txn.linked_ids(ENTITY_CATEGORIES, entity_id.get())?;
            Ok(ids.into_iter().map(CategoryId).collect())
        })
    }

    pub fn entities_in_category(&self, category_id: CategoryId) -> EavResult<Vec<EntityId>> {
        self.read(|txn| {
            let ids = txn.linked_ids(CATEGORY_ENTITIES, category_id.get())?;
            Ok(ids.into_iter().map(EntityId).collect())
        })
    }
}
