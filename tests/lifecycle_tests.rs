//! Entity lifecycle: creation, lookup, delete cascade and category links.

mod common;

use assert_matches::assert_matches;
use common::catalog;
use eav_store::prelude::*;

mod creation {
    use super::*;

    #[test_log::test]
    fn create_and_lookup_by_sku() {
        let cat = catalog();
        let shirt = cat.product("SHIRT-RED-M");

        let entity = cat.store.get_entity(shirt).unwrap();
        assert_eq!(entity.sku, "SHIRT-RED-M");
        assert_eq!(entity.attribute_set_id, cat.set.id);
        assert_eq!(entity.kind, EntityKind::Simple);
        assert_eq!(entity.created_at, entity.updated_at);

        let by_sku = cat.store.get_entity_by_sku("SHIRT-RED-M").unwrap();
        assert_eq!(by_sku.map(|e| e.id), Some(shirt));
        assert_eq!(cat.store.get_entity_by_sku("NOPE").unwrap(), None);
    }

    #[test]
    fn sku_is_trimmed() {
        let cat = catalog();
        let id = cat.product("  MUG  ");
        assert_eq!(cat.store.get_entity(id).unwrap().sku, "MUG");
        assert!(cat.store.get_entity_by_sku("MUG").unwrap().is_some());
    }

    #[test]
    fn ids_are_never_reused() {
        let cat = catalog();
        let first = cat.product("A");
        cat.store.delete_entity(first).unwrap();
        let second = cat.product("A");
        assert!(second > first);
    }

    #[test]
    fn duplicate_sku_is_rejected() {
        let cat = catalog();
        cat.product("SHIRT");
        assert_matches!(
            cat.store.create_entity("SHIRT", cat.set.id, EntityKind::Configurable),
            Err(EavError::DuplicateKey { key }) if key == "SHIRT"
        );
        assert_eq!(cat.store.entity_count().unwrap(), 1);
    }

    #[test]
    fn blank_sku_is_rejected() {
        let cat = catalog();
        assert_matches!(
            cat.store.create_entity("   ", cat.set.id, EntityKind::Simple),
            Err(EavError::InvalidNaturalKey(_))
        );
    }

    #[test]
    fn unknown_attribute_set_is_rejected() {
        let cat = catalog();
        assert_matches!(
            cat.store.create_entity("SHIRT", AttributeSetId(999), EntityKind::Simple),
            Err(EavError::InvalidAttributeSet(AttributeSetId(999)))
        );
        assert_eq!(cat.store.entity_count().unwrap(), 0);
    }

    #[test]
    fn entities_are_listed_by_set() {
        let cat = catalog();
        let apparel = cat
            .store
            .create_attribute_set(EntityTypeId::PRODUCT, "Apparel", 1)
            .unwrap();
        let shirt = cat.store.create_entity("SHIRT", apparel.id, EntityKind::Simple).unwrap();
        let mug = cat.product("MUG");

        assert_eq!(cat.store.entities_in_set(apparel.id).unwrap(), vec![shirt]);
        assert_eq!(cat.store.entities_in_set(cat.set.id).unwrap(), vec![mug]);
        assert_matches!(
            cat.store.entities_in_set(AttributeSetId(999)),
            Err(EavError::NotFound { .. })
        );
    }
}

mod deletion {
    use super::*;

    #[test_log::test]
    fn delete_removes_every_value_row() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let mug = cat.product("MUG");
        cat.store
            .set_values(
                shirt,
                [
                    ("name", InputValue::from("Shirt")),
                    ("description", InputValue::from("Cotton")),
                    ("status", InputValue::from(1)),
                    ("price", InputValue::from("9.99")),
                    ("news_from_date", InputValue::from("2024-05-01")),
                ],
                StoreId::GLOBAL,
            )
            .unwrap();
        cat.store.set_value(shirt, "name", "Chemise", StoreId(2)).unwrap();
        cat.store.set_value(mug, "name", "Mug", StoreId::GLOBAL).unwrap();
        assert_eq!(cat.row_count(shirt), 6);

        cat.store.delete_entity(shirt).unwrap();

        assert_eq!(cat.row_count(shirt), 0);
        assert_eq!(cat.row_count(mug), 1);
        assert_matches!(cat.store.get_entity(shirt), Err(EavError::NotFound { .. }));
        assert_eq!(cat.store.get_entity_by_sku("SHIRT").unwrap(), None);
        assert_eq!(cat.store.entities_in_set(cat.set.id).unwrap(), vec![mug]);

        let name = cat.store.get_attribute_by_code(EntityTypeId::PRODUCT, "name").unwrap();
        let rows = cat.store.value_rows_for_attribute(name.id).unwrap();
        assert!(rows.iter().all(|row| row.entity_id == mug));
    }

    #[test]
    fn deleting_a_missing_entity_is_not_found() {
        let cat = catalog();
        assert_matches!(
            cat.store.delete_entity(EntityId(7)),
            Err(EavError::NotFound { .. })
        );
    }

    #[test]
    fn deleted_entity_frees_its_sku_and_unique_values() {
        let cat = catalog();
        cat.attribute_with(
            "ean",
            BackendType::Varchar,
            AttributeFlags::builder().unique(true).build(),
            None,
        );
        let old = cat.product("SHIRT");
        cat.store.set_value(old, "ean", "111", StoreId::GLOBAL).unwrap();
        cat.store.delete_entity(old).unwrap();

        let new = cat.product("SHIRT");
        cat.store.set_value(new, "ean", "111", StoreId::GLOBAL).unwrap();
    }

    #[test]
    fn attribute_set_can_be_deleted_once_empty() {
        let cat = catalog();
        let apparel = cat
            .store
            .create_attribute_set(EntityTypeId::PRODUCT, "Apparel", 1)
            .unwrap();
        let shirt = cat.store.create_entity("SHIRT", apparel.id, EntityKind::Simple).unwrap();
        assert_matches!(
            cat.store.delete_attribute_set(apparel.id),
            Err(EavError::AttributeSetInUse { entities: 1, .. })
        );

        cat.store.delete_entity(shirt).unwrap();
        cat.store.delete_attribute_set(apparel.id).unwrap();
    }
}

mod categories {
    use super::*;

    #[test]
    fn links_are_visible_from_both_sides() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let mug = cat.product("MUG");

        assert!(cat.store.assign_category(shirt, CategoryId(10)).unwrap());
        assert!(cat.store.assign_category(shirt, CategoryId(11)).unwrap());
        assert!(cat.store.assign_category(mug, CategoryId(10)).unwrap());
        // Second assignment is a no-op.
        assert!(!cat.store.assign_category(shirt, CategoryId(10)).unwrap());

        assert_eq!(
            cat.store.categories_of(shirt).unwrap(),
            vec![CategoryId(10), CategoryId(11)]
        );
        assert_eq!(
            cat.store.entities_in_category(CategoryId(10)).unwrap(),
            vec![shirt, mug]
        );
    }

    #[test]
    fn unassign_reports_whether_a_link_existed() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.assign_category(shirt, CategoryId(3)).unwrap();

        assert!(cat.store.unassign_category(shirt, CategoryId(3)).unwrap());
        assert!(!cat.store.unassign_category(shirt, CategoryId(3)).unwrap());
        assert!(cat.store.categories_of(shirt).unwrap().is_empty());
        assert!(cat.store.entities_in_category(CategoryId(3)).unwrap().is_empty());
    }

    #[test]
    fn unknown_entity_cannot_be_linked() {
        let cat = catalog();
        assert_matches!(
            cat.store.assign_category(EntityId(55), CategoryId(1)),
            Err(EavError::NotFound { .. })
        );
        assert!(cat.store.entities_in_category(CategoryId(1)).unwrap().is_empty());
    }

    #[test]
    fn delete_entity_drops_its_links() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let mug = cat.product("MUG");
        cat.store.assign_category(shirt, CategoryId(10)).unwrap();
        cat.store.assign_category(mug, CategoryId(10)).unwrap();

        cat.store.delete_entity(shirt).unwrap();

        assert_eq!(
            cat.store.entities_in_category(CategoryId(10)).unwrap(),
            vec![mug]
        );
    }
}
