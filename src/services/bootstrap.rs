//! Seeding of the default product catalog metadata.
//!
//! Runs inside the store's open transaction, once per entity type. After the
//! first successful seeding a marker row is written and later opens leave the
//! metadata alone, so records an administrator deleted stay deleted. Within
//! that first run every record is looked up by its natural key, which keeps
//! metadata created by hand before seeding intact.

use log::debug;
use redb::ReadableTable;

use super::metadata::{create_attribute_group_in, create_attribute_in, create_attribute_set_in};
use crate::databases::redb_store::tables::SEEDED;
use crate::databases::redb_store::{EavStore, EavWriteTxn};
use crate::error::{EavError, EavResult, RecordKind};
use crate::model::{
    AttributeFlags, AttributeSet, BackendType, EntityTypeId, FrontendInput, NewAttribute,
};
use crate::traits::table_source::{EavRead, TableSource};
use crate::utils::datetime::{EavDateTime, EavDateTimeExt};

/// Name of the attribute set every catalog starts with.
pub const DEFAULT_SET_NAME: &str = "Default";

const GROUPS: [&str; 4] = ["General", "Prices", "Images", "Meta Information"];

struct Seed {
    code: &'static str,
    label: &'static str,
    backend: BackendType,
    input: FrontendInput,
    group: &'static str,
    required: bool,
    searchable: bool,
    filterable: bool,
    html_allowed: bool,
    default: Option<&'static str>,
}

impl Seed {
    const fn new(
        code: &'static str,
        label: &'static str,
        backend: BackendType,
        input: FrontendInput,
        group: &'static str,
    ) -> Self {
        Self {
            code,
            label,
            backend,
            input,
            group,
            required: false,
            searchable: false,
            filterable: false,
            html_allowed: false,
            default: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    const fn html(mut self) -> Self {
        self.html_allowed = true;
        self
    }

    const fn with_default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }
}

const ATTRIBUTES: [Seed; 13] = [
    Seed::new("name", "Name", BackendType::Varchar, FrontendInput::Text, "General")
        .required()
        .searchable(),
    Seed::new("description", "Description", BackendType::Text, FrontendInput::Textarea, "General")
        .searchable()
        .html(),
    Seed::new(
        "short_description",
        "Short Description",
        BackendType::Text,
        FrontendInput::Textarea,
        "General",
    )
    .html(),
    Seed::new("status", "Status", BackendType::Int, FrontendInput::Select, "General")
        .filterable()
        .with_default("1"),
    Seed::new("visibility", "Visibility", BackendType::Int, FrontendInput::Select, "General")
        .with_default("4"),
    Seed::new("price", "Price", BackendType::Decimal, FrontendInput::Price, "Prices")
        .required()
        .filterable(),
    Seed::new(
        "special_price",
        "Special Price",
        BackendType::Decimal,
        FrontendInput::Price,
        "Prices",
    ),
    Seed::new("cost", "Cost", BackendType::Decimal, FrontendInput::Price, "Prices"),
    Seed::new("weight", "Weight", BackendType::Decimal, FrontendInput::Weight, "General"),
    Seed::new("image", "Base Image", BackendType::Varchar, FrontendInput::Media, "Images"),
    Seed::new(
        "meta_title",
        "Meta Title",
        BackendType::Varchar,
        FrontendInput::Text,
        "Meta Information",
    ),
    Seed::new(
        "meta_description",
        "Meta Description",
        BackendType::Text,
        FrontendInput::Textarea,
        "Meta Information",
    ),
    Seed::new(
        "news_from_date",
        "New from Date",
        BackendType::Datetime,
        FrontendInput::Date,
        "General",
    ),
];

/// Creates whatever part of the default set, groups and attributes is missing,
/// unless the entity type was seeded before.
pub(crate) fn ensure_defaults(txn: &EavWriteTxn<'_>, entity_type_id: EntityTypeId) -> EavResult<()> {
    if txn.table(SEEDED)?.get(entity_type_id.get())?.is_some() {
        return Ok(());
    }
    let mut created = 0;

    let set_id = match txn.attribute_set_id_by_name(entity_type_id, DEFAULT_SET_NAME)? {
        Some(id) => id,
        None => {
            created += 1;
            create_attribute_set_in(txn, entity_type_id, DEFAULT_SET_NAME, 0)?.id
        }
    };

    for (sort_order, name) in (0u32..).zip(GROUPS) {
        if txn.attribute_group_id_by_name(set_id, name)?.is_none() {
            create_attribute_group_in(txn, set_id, name, sort_order)?;
            created += 1;
        }
    }

    for (position, seed) in (0u32..).zip(&ATTRIBUTES) {
        txn.checkpoint()?;
        if txn.attribute_id_by_code(entity_type_id, seed.code)?.is_some() {
            continue;
        }
        let group_id = txn.attribute_group_id_by_name(set_id, seed.group)?;
        let flags = AttributeFlags::builder()
            .required(seed.required)
            .searchable(seed.searchable)
            .filterable(seed.filterable)
            .html_allowed(seed.html_allowed)
            .build();
        let new = NewAttribute::builder()
            .entity_type_id(entity_type_id)
            .code(seed.code)
            .backend_type(seed.backend)
            .frontend_input(seed.input)
            .label(seed.label)
            .flags(flags)
            .default_value(seed.default.map(str::to_string))
            .group_id(group_id)
            .position(position * 10)
            .build();
        create_attribute_in(txn, &new)?;
        created += 1;
    }

    txn.table(SEEDED)?
        .insert(entity_type_id.get(), EavDateTime::eav_now().to_storage_micros())?;
    debug!("EavStore: Seeded {created} default metadata records for entity type {entity_type_id}");
    Ok(())
}

impl EavStore {
    /// The seeded "Default" attribute set of the configured product entity type.
    pub fn default_attribute_set(&self) -> EavResult<AttributeSet> {
        let entity_type_id = self.config().product_entity_type;
        self.read(|txn| {
            let id = txn
                .attribute_set_id_by_name(entity_type_id, DEFAULT_SET_NAME)?
                .ok_or_else(|| EavError::not_found(RecordKind::AttributeSet, DEFAULT_SET_NAME))?;
            txn.attribute_set(id)
        })
    }
}
