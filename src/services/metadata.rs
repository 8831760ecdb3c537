//! Attribute sets, groups and attribute definitions.
//!
//! Each public method runs in its own transaction. The `*_in` functions take
//! an open write transaction so bootstrap and other services can compose them.

use log::debug;

use crate::databases::redb_store::tables::{
    ATTRIBUTE_CODES, ATTRIBUTE_GROUP_NAMES, ATTRIBUTE_GROUPS, ATTRIBUTE_SET_NAMES, ATTRIBUTE_SETS,
    ATTRIBUTES, ATTRIBUTES_BY_GROUP, ENTITIES_BY_SET, GROUPS_BY_SET, sequence,
};
use crate::databases::redb_store::{EavStore, EavWriteTxn, values};
use crate::error::{EavError, EavResult, RecordKind};
use crate::model::attribute::validate_code;
use crate::model::{
    Attribute, AttributeGroup, AttributeGroupId, AttributeId, AttributeSet, AttributeSetId,
    AttributeUpdate, BackendType, EntityTypeId, InputValue, NewAttribute,
};
use crate::traits::table_source::{EavRead, TableSource};
use crate::services::writer::ensure_no_duplicates;
use crate::traits::value_table::with_value_table;

impl EavStore {
    pub fn create_attribute_set(
        &self,
        entity_type_id: EntityTypeId,
        name: &str,
        sort_order: u32,
    ) -> EavResult<AttributeSet> {
        self.write(|txn| create_attribute_set_in(txn, entity_type_id, name, sort_order))
    }

    pub fn get_attribute_set(&self, id: AttributeSetId) -> EavResult<AttributeSet> {
        self.read(|txn| txn.attribute_set(id))
    }

    pub fn get_attribute_set_by_name(
        &self,
        entity_type_id: EntityTypeId,
        name: &str,
    ) -> EavResult<Option<AttributeSet>> {
        self.read(|txn| match txn.attribute_set_id_by_name(entity_type_id, name)? {
            Some(id) => txn.find_attribute_set(id),
            None => Ok(None),
        })
    }

    /// Sets of the entity type, ordered by sort order then name.
    pub fn list_attribute_sets(&self, entity_type_id: EntityTypeId) -> EavResult<Vec<AttributeSet>> {
        self.read(|txn| {
            let ids = {
                let names = txn.table(ATTRIBUTE_SET_NAMES)?;
                let mut ids = Vec::new();
                for entry in names.range((entity_type_id.get(), "")..)? {
                    let (key, id) = entry?;
                    if key.value().0 != entity_type_id.get() {
                        break;
                    }
                    ids.push(AttributeSetId(id.value()));
                }
                ids
            };
            let mut sets = ids
                .into_iter()
                .map(|id| txn.attribute_set(id))
                .collect::<EavResult<Vec<_>>>()?;
            sets.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
            Ok(sets)
        })
    }

    /// Deletes a set that no entity references. Its groups go with it and
    /// their attributes become ungrouped.
    pub fn delete_attribute_set(&self, id: AttributeSetId) -> EavResult<()> {
        self.write(|txn| {
            let set = txn.attribute_set(id)?;
            let entities = txn.linked_ids(ENTITIES_BY_SET, id.get())?.len();
            if entities > 0 {
                return Err(EavError::AttributeSetInUse {
                    set_id: id,
                    entities,
                });
            }
            for group_id in txn.linked_ids(GROUPS_BY_SET, id.get())? {
                txn.checkpoint()?;
                delete_attribute_group_in(txn, AttributeGroupId(group_id))?;
            }
            txn.table(ATTRIBUTE_SET_NAMES)?
                .remove((set.entity_type_id.get(), set.name.as_str()))?;
            txn.remove_record(ATTRIBUTE_SETS, id.get())?;
            debug!("EavStore: Deleted attribute set {} ({})", set.name, id);
            Ok(())
        })
    }

    pub fn create_attribute_group(
        &self,
        set_id: AttributeSetId,
        name: &str,
        sort_order: u32,
    ) -> EavResult<AttributeGroup> {
        self.write(|txn| create_attribute_group_in(txn, set_id, name, sort_order))
    }

    pub fn get_attribute_group(&self, id: AttributeGroupId) -> EavResult<AttributeGroup> {
        self.read(|txn| txn.attribute_group(id))
    }

    /// Groups of a set, ordered by sort order then name.
    pub fn list_attribute_groups(&self, set_id: AttributeSetId) -> EavResult<Vec<AttributeGroup>> {
        self.read(|txn| {
            txn.attribute_set(set_id)?;
            let mut groups = txn
                .linked_ids(GROUPS_BY_SET, set_id.get())?
                .into_iter()
                .map(|id| txn.attribute_group(AttributeGroupId(id)))
                .collect::<EavResult<Vec<_>>>()?;
            groups.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
            Ok(groups)
        })
    }

    /// Deletes a group. Its attributes stay defined, without a group.
    pub fn delete_attribute_group(&self, id: AttributeGroupId) -> EavResult<()> {
        self.write(|txn| delete_attribute_group_in(txn, id))
    }

    pub fn create_attribute(&self, new: NewAttribute) -> EavResult<Attribute> {
        self.write(|txn| create_attribute_in(txn, &new))
    }

    pub fn get_attribute(&self, id: AttributeId) -> EavResult<Attribute> {
        self.read(|txn| txn.attribute(id))
    }

    pub fn get_attribute_by_code(
        &self,
        entity_type_id: EntityTypeId,
        code: &str,
    ) -> EavResult<Attribute> {
        self.read(|txn| txn.attribute_by_code(entity_type_id, code))
    }

    /// Applies a partial update. The code and backend type never change.
    pub fn update_attribute(&self, id: AttributeId, update: AttributeUpdate) -> EavResult<Attribute> {
        self.write(|txn| {
            let mut attribute = txn.attribute(id)?;
            if let Some(requested) = update.backend_type
                && requested != attribute.backend_type
            {
                return Err(EavError::BackendTypeImmutable {
                    code: attribute.code.clone(),
                    current: attribute.backend_type,
                    requested,
                });
            }

            if let Some(input) = update.frontend_input {
                attribute.frontend_input = input;
            }
            if let Some(label) = &update.label {
                attribute.label = label.clone();
            }
            if let Some(flags) = update.flags {
                if flags.unique && !attribute.flags.unique {
                    with_value_table!(attribute.backend_type, T => {
                        ensure_no_duplicates::<T>(txn, &attribute)
                    })?;
                }
                attribute.flags = flags;
            }
            if let Some(default_value) = &update.default_value {
                if let Some(raw) = default_value {
                    check_default(&attribute.code, attribute.backend_type, raw)?;
                }
                attribute.default_value = default_value.clone();
            }
            if let Some(position) = update.position {
                attribute.position = position;
            }
            if let Some(group_id) = update.group_id
                && group_id != attribute.group_id
            {
                if let Some(group_id) = group_id {
                    check_group(txn, group_id, attribute.entity_type_id)?;
                }
                move_to_group(txn, &attribute, group_id)?;
                attribute.group_id = group_id;
            }

            txn.put_record(ATTRIBUTES, id.get(), &attribute)?;
            Ok(attribute)
        })
    }

    /// Deletes an attribute together with every value stored for it.
    pub fn delete_attribute(&self, id: AttributeId) -> EavResult<()> {
        self.write(|txn| {
            let attribute = txn.attribute(id)?;
            let purged = with_value_table!(attribute.backend_type, T => {
                values::purge_attribute::<T>(txn, id)
            })?;
            txn.checkpoint()?;
            txn.table(ATTRIBUTE_CODES)?
                .remove((attribute.entity_type_id.get(), attribute.code.as_str()))?;
            move_to_group(txn, &attribute, None)?;
            txn.remove_record(ATTRIBUTES, id.get())?;
            debug!(
                "EavStore: Deleted attribute {} with {} value rows",
                attribute.code, purged
            );
            Ok(())
        })
    }

    /// Attributes of the entity type, ordered by position then code.
    pub fn list_attributes(&self, entity_type_id: EntityTypeId) -> EavResult<Vec<Attribute>> {
        self.read(|txn| {
            let mut attributes = attributes_for_type(txn, entity_type_id)?;
            sort_attributes(&mut attributes);
            Ok(attributes)
        })
    }

    /// Attributes placed in a group, ordered by position then code.
    pub fn attributes_in_group(&self, group_id: AttributeGroupId) -> EavResult<Vec<Attribute>> {
        self.read(|txn| {
            txn.attribute_group(group_id)?;
            let mut attributes = txn
                .linked_ids(ATTRIBUTES_BY_GROUP, group_id.get())?
                .into_iter()
                .map(|id| txn.attribute(AttributeId(id)))
                .collect::<EavResult<Vec<_>>>()?;
            sort_attributes(&mut attributes);
            Ok(attributes)
        })
    }
}

fn sort_attributes(attributes: &mut [Attribute]) {
    attributes.sort_by(|a, b| (a.position, &a.code).cmp(&(b.position, &b.code)));
}

/// Every attribute of the entity type, in code order.
pub(crate) fn attributes_for_type<S: TableSource>(
    txn: &S,
    entity_type_id: EntityTypeId,
) -> EavResult<Vec<Attribute>> {
    txn.attribute_ids_for_type(entity_type_id)?
        .into_iter()
        .map(|id| txn.attribute(id))
        .collect()
}

fn check_default(code: &str, backend: BackendType, raw: &str) -> EavResult<()> {
    InputValue::from(raw)
        .coerce(backend)
        .map(|_| ())
        .map_err(|reason| EavError::ValueConversion {
            code: code.to_string(),
            backend,
            reason: format!("default value: {reason}"),
        })
}

/// The group must exist and sit in a set of the attribute's entity type.
fn check_group(
    txn: &EavWriteTxn<'_>,
    group_id: AttributeGroupId,
    entity_type_id: EntityTypeId,
) -> EavResult<()> {
    let group = txn.attribute_group(group_id)?;
    let set = txn.attribute_set(group.set_id)?;
    if set.entity_type_id != entity_type_id {
        return Err(EavError::GroupEntityTypeMismatch {
            group_id,
            entity_type_id,
        });
    }
    Ok(())
}

fn move_to_group(
    txn: &EavWriteTxn<'_>,
    attribute: &Attribute,
    group_id: Option<AttributeGroupId>,
) -> EavResult<()> {
    let mut members = txn.multimap(ATTRIBUTES_BY_GROUP)?;
    if let Some(current) = attribute.group_id {
        members.remove(current.get(), attribute.id.get())?;
    }
    if let Some(target) = group_id {
        members.insert(target.get(), attribute.id.get())?;
    }
    Ok(())
}

pub(crate) fn create_attribute_set_in(
    txn: &EavWriteTxn<'_>,
    entity_type_id: EntityTypeId,
    name: &str,
    sort_order: u32,
) -> EavResult<AttributeSet> {
    let name = name.trim();
    if txn.attribute_set_id_by_name(entity_type_id, name)?.is_some() {
        return Err(EavError::DuplicateName {
            kind: RecordKind::AttributeSet,
            name: name.to_string(),
        });
    }

    let set = AttributeSet {
        id: AttributeSetId(txn.next_id(sequence::ATTRIBUTE_SET)?),
        entity_type_id,
        name: name.to_string(),
        sort_order,
    };
    txn.put_record(ATTRIBUTE_SETS, set.id.get(), &set)?;
    txn.table(ATTRIBUTE_SET_NAMES)?
        .insert((entity_type_id.get(), set.name.as_str()), set.id.get())?;
    debug!("EavStore: Created attribute set {} ({})", set.name, set.id);
    Ok(set)
}

pub(crate) fn create_attribute_group_in(
    txn: &EavWriteTxn<'_>,
    set_id: AttributeSetId,
    name: &str,
    sort_order: u32,
) -> EavResult<AttributeGroup> {
    txn.attribute_set(set_id)?;
    let name = name.trim();
    if txn.attribute_group_id_by_name(set_id, name)?.is_some() {
        return Err(EavError::DuplicateName {
            kind: RecordKind::AttributeGroup,
            name: name.to_string(),
        });
    }

    let group = AttributeGroup {
        id: AttributeGroupId(txn.next_id(sequence::ATTRIBUTE_GROUP)?),
        set_id,
        name: name.to_string(),
        sort_order,
    };
    txn.put_record(ATTRIBUTE_GROUPS, group.id.get(), &group)?;
    txn.table(ATTRIBUTE_GROUP_NAMES)?
        .insert((set_id.get(), group.name.as_str()), group.id.get())?;
    txn.multimap(GROUPS_BY_SET)?
        .insert(set_id.get(), group.id.get())?;
    Ok(group)
}

pub(crate) fn delete_attribute_group_in(
    txn: &EavWriteTxn<'_>,
    id: AttributeGroupId,
) -> EavResult<()> {
    let group = txn.attribute_group(id)?;

    for attribute_id in txn.linked_ids(ATTRIBUTES_BY_GROUP, id.get())? {
        let mut attribute = txn.attribute(AttributeId(attribute_id))?;
        attribute.group_id = None;
        txn.put_record(ATTRIBUTES, attribute_id, &attribute)?;
    }
    txn.multimap(ATTRIBUTES_BY_GROUP)?.remove_all(id.get())?;
    txn.multimap(GROUPS_BY_SET)?
        .remove(group.set_id.get(), id.get())?;
    txn.table(ATTRIBUTE_GROUP_NAMES)?
        .remove((group.set_id.get(), group.name.as_str()))?;
    txn.remove_record(ATTRIBUTE_GROUPS, id.get())?;
    Ok(())
}

pub(crate) fn create_attribute_in(
    txn: &EavWriteTxn<'_>,
    new: &NewAttribute,
) -> EavResult<Attribute> {
    validate_code(&new.code)?;
    if txn
        .attribute_id_by_code(new.entity_type_id, &new.code)?
        .is_some()
    {
        return Err(EavError::DuplicateCode {
            entity_type_id: new.entity_type_id,
            code: new.code.clone(),
        });
    }
    if let Some(group_id) = new.group_id {
        check_group(txn, group_id, new.entity_type_id)?;
    }
    if let Some(raw) = &new.default_value {
        check_default(&new.code, new.backend_type, raw)?;
    }

    let attribute = Attribute {
        id: AttributeId(txn.next_id(sequence::ATTRIBUTE)?),
        entity_type_id: new.entity_type_id,
        code: new.code.clone(),
        backend_type: new.backend_type,
        frontend_input: new
            .frontend_input
            .unwrap_or_else(|| new.backend_type.default_frontend_input()),
        label: new.label.clone().unwrap_or_else(|| new.code.clone()),
        flags: new.flags,
        default_value: new.default_value.clone(),
        group_id: new.group_id,
        position: new.position,
    };
    txn.put_record(ATTRIBUTES, attribute.id.get(), &attribute)?;
    txn.table(ATTRIBUTE_CODES)?.insert(
        (attribute.entity_type_id.get(), attribute.code.as_str()),
        attribute.id.get(),
    )?;
    if let Some(group_id) = attribute.group_id {
        txn.multimap(ATTRIBUTES_BY_GROUP)?
            .insert(group_id.get(), attribute.id.get())?;
    }
    debug!(
        "EavStore: Created attribute {} ({}) as {}",
        attribute.code, attribute.id, attribute.backend_type
    );
    Ok(attribute)
}
