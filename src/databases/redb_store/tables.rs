//! Table layout of the EAV database.
//!
//! Records are bincode encoded into `&[u8]` columns keyed by their numeric id.
//! Natural keys (codes, names, SKUs) get their own unique index tables and
//! one-to-many links live in multimap tables.
//!
//! The five value tables share one shape: the key is the
//! `(entity_id, attribute_id, store_id)` triple, so redb's key uniqueness is
//! the at-most-one-row-per-scope guarantee. Each value table has a multimap
//! index from attribute id to `(entity_id, store_id)` for attribute-wide scans.

use redb::{MultimapTableDefinition, TableDefinition};

/// `(entity_id, attribute_id, store_id)`
pub type ValueKey = (u64, u64, u32);

/// `(value_id, encoded payload)`
pub type ValueRow = (u64, &'static [u8]);

/// `attribute_id -> (entity_id, store_id)`
pub type ValueIndex = MultimapTableDefinition<'static, u64, (u64, u32)>;

/// Next free id per sequence name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("eav_sequences");

/// `entity_type_id -> seeding time in microseconds`. A row means the defaults
/// were seeded once and are never recreated.
pub const SEEDED: TableDefinition<u32, i64> = TableDefinition::new("eav_seeded");

pub const ATTRIBUTE_SETS: TableDefinition<u64, &[u8]> = TableDefinition::new("eav_attribute_sets");
/// `(entity_type_id, name) -> set id`
pub const ATTRIBUTE_SET_NAMES: TableDefinition<(u32, &str), u64> =
    TableDefinition::new("eav_attribute_set_names");

pub const ATTRIBUTE_GROUPS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("eav_attribute_groups");
/// `(set_id, name) -> group id`
pub const ATTRIBUTE_GROUP_NAMES: TableDefinition<(u64, &str), u64> =
    TableDefinition::new("eav_attribute_group_names");
/// `set_id -> group id`
pub const GROUPS_BY_SET: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("eav_groups_by_set");

pub const ATTRIBUTES: TableDefinition<u64, &[u8]> = TableDefinition::new("eav_attributes");
/// `(entity_type_id, code) -> attribute id`
pub const ATTRIBUTE_CODES: TableDefinition<(u32, &str), u64> =
    TableDefinition::new("eav_attribute_codes");
/// `group_id -> attribute id`
pub const ATTRIBUTES_BY_GROUP: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("eav_attributes_by_group");

pub const ENTITIES: TableDefinition<u64, &[u8]> = TableDefinition::new("eav_entities");
/// `sku -> entity id`
pub const ENTITY_SKUS: TableDefinition<&str, u64> = TableDefinition::new("eav_entity_skus");
/// `set_id -> entity id`
pub const ENTITIES_BY_SET: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("eav_entities_by_set");
/// `entity_id -> category id`
pub const ENTITY_CATEGORIES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("eav_entity_categories");
/// `category_id -> entity id`
pub const CATEGORY_ENTITIES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("eav_category_entities");

pub const VARCHAR_VALUES: TableDefinition<ValueKey, ValueRow> =
    TableDefinition::new("eav_values_varchar");
pub const VARCHAR_INDEX: ValueIndex = MultimapTableDefinition::new("eav_values_varchar_idx");

pub const TEXT_VALUES: TableDefinition<ValueKey, ValueRow> =
    TableDefinition::new("eav_values_text");
pub const TEXT_INDEX: ValueIndex = MultimapTableDefinition::new("eav_values_text_idx");

pub const INT_VALUES: TableDefinition<ValueKey, ValueRow> = TableDefinition::new("eav_values_int");
pub const INT_INDEX: ValueIndex = MultimapTableDefinition::new("eav_values_int_idx");

pub const DECIMAL_VALUES: TableDefinition<ValueKey, ValueRow> =
    TableDefinition::new("eav_values_decimal");
pub const DECIMAL_INDEX: ValueIndex = MultimapTableDefinition::new("eav_values_decimal_idx");

pub const DATETIME_VALUES: TableDefinition<ValueKey, ValueRow> =
    TableDefinition::new("eav_values_datetime");
pub const DATETIME_INDEX: ValueIndex = MultimapTableDefinition::new("eav_values_datetime_idx");

/// Sequence names used with [`SEQUENCES`].
pub mod sequence {
    pub const ENTITY: &str = "entity";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_SET: &str = "attribute_set";
    pub const ATTRIBUTE_GROUP: &str = "attribute_group";
    /// Shared by all five value tables.
    pub const VALUE: &str = "value";
}
