// Common test utilities and helpers
#![allow(dead_code)]

use eav_store::prelude::*;
use tempfile::TempDir;

/// A store in a temporary directory with the default catalog seeded.
///
/// The directory lives as long as the fixture.
pub struct TestCatalog {
    pub store: EavStore,
    pub set: AttributeSet,
    pub dir: TempDir,
}

pub fn catalog() -> TestCatalog {
    catalog_with(|config| config)
}

/// Builds a catalog with a customised config. The path is always set by the fixture.
pub fn catalog_with<F>(configure: F) -> TestCatalog
where
    F: FnOnce(StoreConfig) -> StoreConfig,
{
    let dir = TempDir::new().unwrap();
    let config = configure(StoreConfig::new(dir.path().join("catalog.redb")));
    let store = EavStore::open(config).unwrap();
    let set = store.default_attribute_set().unwrap();
    TestCatalog { store, set, dir }
}

impl TestCatalog {
    pub fn product(&self, sku: &str) -> EntityId {
        self.store
            .create_entity(sku, self.set.id, EntityKind::Simple)
            .unwrap()
    }

    pub fn attribute(&self, code: &str, backend_type: BackendType) -> Attribute {
        self.attribute_with(code, backend_type, AttributeFlags::default(), None)
    }

    pub fn attribute_with(
        &self,
        code: &str,
        backend_type: BackendType,
        flags: AttributeFlags,
        default_value: Option<&str>,
    ) -> Attribute {
        self.store
            .create_attribute(
                NewAttribute::builder()
                    .entity_type_id(EntityTypeId::PRODUCT)
                    .code(code)
                    .backend_type(backend_type)
                    .flags(flags)
                    .default_value(default_value.map(str::to_string))
                    .build(),
            )
            .unwrap()
    }

    /// Number of value rows the entity holds across all typed tables.
    pub fn row_count(&self, entity_id: EntityId) -> usize {
        self.store.value_rows_for_entity(entity_id).unwrap().len()
    }
}
