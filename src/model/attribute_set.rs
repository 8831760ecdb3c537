use serde::{Deserialize, Serialize};

use super::{AttributeGroupId, AttributeSetId, EntityTypeId};

/// Named grouping of attributes for one entity type. Every entity references one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    pub id: AttributeSetId,
    pub entity_type_id: EntityTypeId,
    pub name: String,
    pub sort_order: u32,
}

/// Subdivision of an attribute set, used to lay out admin forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub id: AttributeGroupId,
    pub set_id: AttributeSetId,
    pub name: String,
    pub sort_order: u32,
}
