use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::{AttributeSetId, EntityId};
use crate::utils::datetime::EavDateTime;

/// Product type discriminator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Simple,
    Configurable,
    Virtual,
    Bundle,
    Grouped,
}

/// The subject of attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Natural key, unique across all entities.
    pub sku: String,
    pub kind: EntityKind,
    pub attribute_set_id: AttributeSetId,
    pub created_at: EavDateTime,
    pub updated_at: EavDateTime,
}
