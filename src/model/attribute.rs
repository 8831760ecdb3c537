use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use typed_builder::TypedBuilder;

use super::{AttributeGroupId, AttributeId, EntityTypeId};
use crate::error::{EavError, EavResult};

/// Longest accepted attribute code.
pub const MAX_CODE_LEN: usize = 60;

/// Primitive storage type of an attribute.
///
/// Each variant owns exactly one value table; the backend type is the sole
/// router between them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Short strings, at most [`BackendType::VARCHAR_MAX_CHARS`] characters.
    Varchar,
    /// Unbounded text.
    Text,
    /// 64-bit signed integers.
    Int,
    /// Exact decimals.
    Decimal,
    /// UTC timestamps.
    Datetime,
}

impl BackendType {
    pub const VARCHAR_MAX_CHARS: usize = 255;

    /// Input widget suggested for attributes of this type when none is given.
    pub fn default_frontend_input(self) -> FrontendInput {
        match self {
            BackendType::Varchar => FrontendInput::Text,
            BackendType::Text => FrontendInput::Textarea,
            BackendType::Int => FrontendInput::Select,
            BackendType::Decimal => FrontendInput::Price,
            BackendType::Datetime => FrontendInput::Date,
        }
    }
}

/// Presentation hint for admin forms. Has no effect on storage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FrontendInput {
    Text,
    Textarea,
    Select,
    Multiselect,
    Boolean,
    Date,
    Datetime,
    Price,
    Weight,
    Media,
}

/// Behavioural flags of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct AttributeFlags {
    /// The global value may not be cleared.
    #[builder(default)]
    pub required: bool,
    /// No two entities may hold the same value in the same store.
    #[builder(default)]
    pub unique: bool,
    #[builder(default)]
    pub searchable: bool,
    #[builder(default)]
    pub filterable: bool,
    #[builder(default)]
    pub comparable: bool,
    #[builder(default = true)]
    pub visible: bool,
    #[builder(default)]
    pub html_allowed: bool,
}

impl Default for AttributeFlags {
    fn default() -> Self {
        AttributeFlags::builder().build()
    }
}

/// Metadata definition of one dynamic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub entity_type_id: EntityTypeId,
    /// Stable external key, unique per entity type.
    pub code: String,
    pub backend_type: BackendType,
    pub frontend_input: FrontendInput,
    pub label: String,
    pub flags: AttributeFlags,
    /// Raw default, coerced to the backend type when read.
    pub default_value: Option<String>,
    pub group_id: Option<AttributeGroupId>,
    pub position: u32,
}

/// Request to define a new attribute.
///
/// ```
/// use eav_store::model::{BackendType, EntityTypeId, NewAttribute};
///
/// let color = NewAttribute::builder()
///     .entity_type_id(EntityTypeId::PRODUCT)
///     .code("color")
///     .backend_type(BackendType::Int)
///     .default_value(Some("5".to_string()))
///     .build();
/// assert_eq!(color.code, "color");
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct NewAttribute {
    pub entity_type_id: EntityTypeId,
    #[builder(setter(into))]
    pub code: String,
    pub backend_type: BackendType,
    /// Defaults to the backend type's suggested input.
    #[builder(default, setter(strip_option))]
    pub frontend_input: Option<FrontendInput>,
    /// Defaults to the code.
    #[builder(default, setter(strip_option, into))]
    pub label: Option<String>,
    #[builder(default)]
    pub flags: AttributeFlags,
    #[builder(default)]
    pub default_value: Option<String>,
    #[builder(default)]
    pub group_id: Option<AttributeGroupId>,
    #[builder(default)]
    pub position: u32,
}

/// Partial update of an attribute's metadata. `None` leaves a field unchanged.
///
/// `backend_type` exists only so callers forwarding a full definition are told
/// explicitly that the backend type cannot move.
#[derive(Debug, Clone, Default)]
pub struct AttributeUpdate {
    pub backend_type: Option<BackendType>,
    pub frontend_input: Option<FrontendInput>,
    pub label: Option<String>,
    pub flags: Option<AttributeFlags>,
    pub default_value: Option<Option<String>>,
    pub group_id: Option<Option<AttributeGroupId>>,
    pub position: Option<u32>,
}

/// Checks that `code` is lowercase ASCII, starts with a letter and only contains
/// letters, digits and underscores.
pub fn validate_code(code: &str) -> EavResult<()> {
    let mut chars = code.chars();
    let valid = code.len() <= MAX_CODE_LEN
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EavError::InvalidAttributeCode(code.to_string()))
    }
}
