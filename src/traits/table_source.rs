//! Read access shared by read and write transactions.
//!
//! redb hands out different table types from read transactions
//! (`ReadOnlyTable`) and write transactions (`Table`). [`TableSource`] hides
//! that difference behind a generic associated type so lookups are written
//! once and run in either kind of transaction. Inside a write transaction they
//! observe the transaction's own uncommitted writes.
//!
//! redb refuses to open a table that is already open in the same write
//! transaction, so every helper here drops its table handle before returning.

use redb::{
    Key, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition, Value,
};
use serde::de::DeserializeOwned;

use crate::databases::redb_store::codec;
use crate::databases::redb_store::tables::{
    ATTRIBUTE_CODES, ATTRIBUTE_GROUP_NAMES, ATTRIBUTE_GROUPS, ATTRIBUTE_SET_NAMES, ATTRIBUTE_SETS,
    ATTRIBUTES, ENTITIES, ENTITY_SKUS,
};
use crate::error::{EavError, EavResult, RecordKind};
use crate::model::{
    Attribute, AttributeGroup, AttributeGroupId, AttributeId, AttributeSet, AttributeSetId, Entity,
    EntityId, EntityTypeId,
};

/// Anything that can open redb tables for reading.
pub trait TableSource {
    type Table<'t, K: Key + 'static, V: Value + 'static>: ReadableTable<K, V>
    where
        Self: 't;

    type Multimap<'t, K: Key + 'static, V: Key + 'static>: ReadableMultimapTable<K, V>
    where
        Self: 't;

    fn table<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> EavResult<Self::Table<'_, K, V>>;

    fn multimap<K: Key + 'static, V: Key + 'static>(
        &self,
        definition: MultimapTableDefinition<'_, K, V>,
    ) -> EavResult<Self::Multimap<'_, K, V>>;
}

/// Record lookups available on every [`TableSource`].
pub trait EavRead: TableSource {
    /// Decodes the record stored under `id`, if any.
    fn record<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
    ) -> EavResult<Option<T>> {
        let table = self.table(definition)?;
        let guard = table.get(id)?;
        let record = match guard {
            Some(bytes) => Some(codec::decode(bytes.value())?),
            None => None,
        };
        Ok(record)
    }

    /// All values linked to `key` in a `u64 -> u64` multimap, in key order.
    fn linked_ids(
        &self,
        definition: MultimapTableDefinition<'static, u64, u64>,
        key: u64,
    ) -> EavResult<Vec<u64>> {
        let table = self.multimap(definition)?;
        let mut ids = Vec::new();
        for entry in table.get(key)? {
            ids.push(entry?.value());
        }
        Ok(ids)
    }

    fn find_entity(&self, id: EntityId) -> EavResult<Option<Entity>> {
        self.record(ENTITIES, id.get())
    }

    fn entity(&self, id: EntityId) -> EavResult<Entity> {
        self.find_entity(id)?
            .ok_or_else(|| EavError::not_found(RecordKind::Entity, id))
    }

    fn entity_id_by_sku(&self, sku: &str) -> EavResult<Option<EntityId>> {
        let table = self.table(ENTITY_SKUS)?;
        let id = table.get(sku)?.map(|guard| EntityId(guard.value()));
        Ok(id)
    }

    fn find_attribute(&self, id: AttributeId) -> EavResult<Option<Attribute>> {
        self.record(ATTRIBUTES, id.get())
    }

    fn attribute(&self, id: AttributeId) -> EavResult<Attribute> {
        self.find_attribute(id)?
            .ok_or_else(|| EavError::not_found(RecordKind::Attribute, id))
    }

    fn attribute_id_by_code(
        &self,
        entity_type_id: EntityTypeId,
        code: &str,
    ) -> EavResult<Option<AttributeId>> {
        let table = self.table(ATTRIBUTE_CODES)?;
        let id = table
            .get((entity_type_id.get(), code))?
            .map(|guard| AttributeId(guard.value()));
        Ok(id)
    }

    fn attribute_by_code(&self, entity_type_id: EntityTypeId, code: &str) -> EavResult<Attribute> {
        match self.attribute_id_by_code(entity_type_id, code)? {
            Some(id) => self.attribute(id),
            None => Err(EavError::AttributeNotFound {
                entity_type_id,
                code: code.to_string(),
            }),
        }
    }

    /// Ids of every attribute defined for the entity type, ordered by code.
    fn attribute_ids_for_type(&self, entity_type_id: EntityTypeId) -> EavResult<Vec<AttributeId>> {
        let table = self.table(ATTRIBUTE_CODES)?;
        let mut ids = Vec::new();
        for entry in table.range((entity_type_id.get(), "")..)? {
            let (key, id) = entry?;
            if key.value().0 != entity_type_id.get() {
                break;
            }
            ids.push(AttributeId(id.value()));
        }
        Ok(ids)
    }

    fn find_attribute_set(&self, id: AttributeSetId) -> EavResult<Option<AttributeSet>> {
        self.record(ATTRIBUTE_SETS, id.get())
    }

    fn attribute_set(&self, id: AttributeSetId) -> EavResult<AttributeSet> {
        self.find_attribute_set(id)?
            .ok_or_else(|| EavError::not_found(RecordKind::AttributeSet, id))
    }

    fn attribute_set_id_by_name(
        &self,
        entity_type_id: EntityTypeId,
        name: &str,
    ) -> EavResult<Option<AttributeSetId>> {
        let table = self.table(ATTRIBUTE_SET_NAMES)?;
        let id = table
            .get((entity_type_id.get(), name))?
            .map(|guard| AttributeSetId(guard.value()));
        Ok(id)
    }

    fn find_attribute_group(&self, id: AttributeGroupId) -> EavResult<Option<AttributeGroup>> {
        self.record(ATTRIBUTE_GROUPS, id.get())
    }

    fn attribute_group(&self, id: AttributeGroupId) -> EavResult<AttributeGroup> {
        self.find_attribute_group(id)?
            .ok_or_else(|| EavError::not_found(RecordKind::AttributeGroup, id))
    }

    fn attribute_group_id_by_name(
        &self,
        set_id: AttributeSetId,
        name: &str,
    ) -> EavResult<Option<AttributeGroupId>> {
        let table = self.table(ATTRIBUTE_GROUP_NAMES)?;
        let id = table
            .get((set_id.get(), name))?
            .map(|guard| AttributeGroupId(guard.value()));
        Ok(id)
    }

    /// Entity type of an entity, taken from its attribute set.
    fn entity_type_of(&self, entity: &Entity) -> EavResult<EntityTypeId> {
        let set = self
            .find_attribute_set(entity.attribute_set_id)?
            .ok_or(EavError::InvalidAttributeSet(entity.attribute_set_id))?;
        Ok(set.entity_type_id)
    }

    /// Loads an entity together with the attribute `code` of its entity type.
    fn entity_attribute(&self, entity_id: EntityId, code: &str) -> EavResult<(Entity, Attribute)> {
        let entity = self.entity(entity_id)?;
        let entity_type_id = self.entity_type_of(&entity)?;
        let attribute = self.attribute_by_code(entity_type_id, code)?;
        Ok((entity, attribute))
    }
}

impl<S: TableSource> EavRead for S {}
