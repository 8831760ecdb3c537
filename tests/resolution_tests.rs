//! Value resolution: store override, global fallback, attribute default.

mod common;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use common::catalog;
use eav_store::prelude::*;
use proptest::prelude::*;

mod fallback_chain {
    use super::*;

    #[test_log::test]
    fn color_override_scenario() {
        let cat = catalog();
        cat.attribute("color", BackendType::Int);
        let shirt = cat.product("SHIRT");

        cat.store.set_value(shirt, "color", 5, StoreId::GLOBAL).unwrap();
        cat.store.set_value(shirt, "color", 7, StoreId(2)).unwrap();

        assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId::GLOBAL).unwrap(), Some(5));
        assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId(2)).unwrap(), Some(7));
        assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId(3)).unwrap(), Some(5));
    }

    #[test]
    fn each_tier_reports_its_source() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");

        // status has a seeded default of 1
        let resolved = cat.store.resolve(shirt, "status", StoreId(1)).unwrap().unwrap();
        assert_eq!(resolved.value, AttributeValue::Int(1));
        assert_eq!(resolved.source, ValueSource::AttributeDefault);

        cat.store.set_value(shirt, "status", 2, StoreId::GLOBAL).unwrap();
        let resolved = cat.store.resolve(shirt, "status", StoreId(1)).unwrap().unwrap();
        assert_eq!(resolved.value, AttributeValue::Int(2));
        assert_eq!(resolved.source, ValueSource::Global);

        cat.store.set_value(shirt, "status", 3, StoreId(1)).unwrap();
        let resolved = cat.store.resolve(shirt, "status", StoreId(1)).unwrap().unwrap();
        assert_eq!(resolved.value, AttributeValue::Int(3));
        assert_eq!(resolved.source, ValueSource::Store(StoreId(1)));
    }

    #[test]
    fn no_value_anywhere_is_none() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        assert_eq!(cat.store.get_value::<String>(shirt, "meta_title", StoreId(4)).unwrap(), None);
        assert_eq!(cat.store.resolve(shirt, "cost", StoreId::GLOBAL).unwrap(), None);
    }

    #[test]
    fn override_in_one_store_does_not_leak_into_another() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "name", "Shirt", StoreId::GLOBAL).unwrap();
        cat.store.set_value(shirt, "name", "Chemise", StoreId(2)).unwrap();

        assert_eq!(
            cat.store.get_value::<String>(shirt, "name", StoreId(3)).unwrap().as_deref(),
            Some("Shirt")
        );
        assert_eq!(
            cat.store.get_value::<String>(shirt, "name", StoreId::GLOBAL).unwrap().as_deref(),
            Some("Shirt")
        );
    }

    #[test]
    fn store_value_without_global_is_only_visible_in_that_store() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "meta_title", "Buy shirts", StoreId(5)).unwrap();

        assert!(cat.store.get_value::<String>(shirt, "meta_title", StoreId(5)).unwrap().is_some());
        assert!(cat.store.get_value::<String>(shirt, "meta_title", StoreId(6)).unwrap().is_none());
        assert!(cat.store.get_value::<String>(shirt, "meta_title", StoreId::GLOBAL).unwrap().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn requested_store_wins_then_global(global in any::<i64>(), local in any::<i64>(), store in 1u32..50, other in 50u32..100) {
            let cat = catalog();
            cat.attribute("color", BackendType::Int);
            let shirt = cat.product("SHIRT");
            cat.store.set_value(shirt, "color", global, StoreId::GLOBAL).unwrap();
            cat.store.set_value(shirt, "color", local, StoreId(store)).unwrap();

            prop_assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId(store)).unwrap(), Some(local));
            prop_assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId(other)).unwrap(), Some(global));
            prop_assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId::GLOBAL).unwrap(), Some(global));
        }
    }
}

mod typed_reads {
    use super::*;

    #[test]
    fn incompatible_type_is_a_mismatch() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "price", "19.99", StoreId::GLOBAL).unwrap();

        assert_matches!(
            cat.store.get_value::<String>(shirt, "price", StoreId::GLOBAL),
            Err(EavError::TypeMismatch { backend: BackendType::Decimal, requested: "String", .. })
        );
        assert_matches!(
            cat.store.get_value::<i64>(shirt, "name", StoreId::GLOBAL),
            Err(EavError::TypeMismatch { .. })
        );
        assert_eq!(
            cat.store.get_value::<Decimal>(shirt, "price", StoreId::GLOBAL).unwrap(),
            Some(Decimal::new(1999, 2))
        );
    }

    #[test]
    fn mismatch_is_reported_even_without_a_value() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        assert_matches!(
            cat.store.get_value::<EavDateTime>(shirt, "cost", StoreId(1)),
            Err(EavError::TypeMismatch { .. })
        );
    }

    #[test]
    fn text_backends_read_as_strings() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store
            .set_value(shirt, "description", "<p>Soft cotton</p>", StoreId::GLOBAL)
            .unwrap();
        assert_eq!(
            cat.store.get_value::<String>(shirt, "description", StoreId(9)).unwrap().as_deref(),
            Some("<p>Soft cotton</p>")
        );
        assert_eq!(
            cat.store.get_value::<AttributeValue>(shirt, "description", StoreId(9)).unwrap(),
            Some(AttributeValue::Text("<p>Soft cotton</p>".into()))
        );
    }

    #[test]
    fn datetimes_and_narrow_ints() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "news_from_date", "2024-03-01", StoreId::GLOBAL).unwrap();
        cat.store.set_value(shirt, "visibility", 2, StoreId::GLOBAL).unwrap();

        assert_eq!(
            cat.store.get_value::<EavDateTime>(shirt, "news_from_date", StoreId::GLOBAL).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(cat.store.get_value::<i32>(shirt, "visibility", StoreId(1)).unwrap(), Some(2));
    }

    #[test]
    fn narrow_int_overflow_is_a_conversion_error() {
        let cat = catalog();
        cat.attribute("stock", BackendType::Int);
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "stock", i64::MAX, StoreId::GLOBAL).unwrap();
        assert_matches!(
            cat.store.get_value::<i32>(shirt, "stock", StoreId::GLOBAL),
            Err(EavError::ValueConversion { .. })
        );
    }

    #[test]
    fn unknown_entity_and_code() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        assert_matches!(
            cat.store.get_value::<String>(EntityId(4242), "name", StoreId::GLOBAL),
            Err(EavError::NotFound { .. })
        );
        assert_matches!(
            cat.store.get_value::<String>(shirt, "flavour", StoreId::GLOBAL),
            Err(EavError::AttributeNotFound { .. })
        );
    }
}

mod bulk_reads {
    use super::*;

    #[test]
    fn get_values_resolves_every_attribute() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store
            .set_values(
                shirt,
                [
                    ("name", InputValue::from("Shirt")),
                    ("price", InputValue::from("10")),
                ],
                StoreId::GLOBAL,
            )
            .unwrap();
        cat.store.set_value(shirt, "name", "Chemise", StoreId(2)).unwrap();

        let values = cat.store.get_values(shirt, StoreId(2)).unwrap();
        assert_eq!(values["name"], AttributeValue::Varchar("Chemise".into()));
        assert_eq!(values["price"], AttributeValue::Decimal(Decimal::from(10)));
        // Seeded defaults
        assert_eq!(values["status"], AttributeValue::Int(1));
        assert_eq!(values["visibility"], AttributeValue::Int(4));
        assert!(!values.contains_key("cost"));
    }

    #[test]
    fn entities_with_attribute_includes_global_and_store_rows() {
        let cat = catalog();
        let a = cat.product("A");
        let b = cat.product("B");
        let c = cat.product("C");
        cat.store.set_value(a, "meta_title", "a", StoreId::GLOBAL).unwrap();
        cat.store.set_value(b, "meta_title", "b", StoreId(2)).unwrap();
        cat.store.set_value(c, "meta_title", "c", StoreId(3)).unwrap();

        let in_two = cat
            .store
            .entities_with_attribute(EntityTypeId::PRODUCT, "meta_title", StoreId(2))
            .unwrap();
        assert_eq!(in_two, vec![a, b]);

        let global = cat
            .store
            .entities_with_attribute(EntityTypeId::PRODUCT, "meta_title", StoreId::GLOBAL)
            .unwrap();
        assert_eq!(global, vec![a]);
    }
}
