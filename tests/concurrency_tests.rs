//! Concurrent writers, cancellation and maintenance on shared handles.

mod common;

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use common::catalog;
use eav_store::prelude::*;
use tokio_util::sync::CancellationToken;

mod writers {
    use super::*;

    #[test_log::test]
    fn racing_writers_leave_one_row_per_scope() {
        let cat = catalog();
        let color = cat.attribute("color", BackendType::Int);
        let shirt = cat.product("SHIRT");

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let store = cat.store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..10i64 {
                        store
                            .set_value(shirt, "color", i as i64 * 100 + round, StoreId::GLOBAL)
                            .unwrap();
                        store
                            .set_value(shirt, "color", round, StoreId(1 + (i as u32 % 2)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rows = cat.store.value_rows_for_attribute(color.id).unwrap();
        let mut scopes: Vec<StoreId> = rows.iter().map(|row| row.store_id).collect();
        scopes.sort();
        assert_eq!(scopes, vec![StoreId::GLOBAL, StoreId(1), StoreId(2)]);
        assert_eq!(cat.store.get_value::<i64>(shirt, "color", StoreId(1)).unwrap(), Some(9));
    }

    #[test]
    fn concurrent_entity_creation_keeps_skus_unique() {
        let cat = catalog();
        let set = cat.set.id;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = cat.store.clone();
                thread::spawn(move || store.create_entity("SHARED", set, EntityKind::Simple))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, EavError::DuplicateKey { .. }))
        );
        assert_eq!(cat.store.entity_count().unwrap(), 1);
    }

    #[test]
    fn readers_see_committed_state_only() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "name", "Before", StoreId::GLOBAL).unwrap();

        let failed = cat.store.set_values(
            shirt,
            [("name", InputValue::from("After")), ("status", InputValue::from("high"))],
            StoreId::GLOBAL,
        );
        assert!(failed.is_err());

        let reader = cat.store.clone();
        let name = thread::spawn(move || reader.get_value::<String>(shirt, "name", StoreId::GLOBAL))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(name.as_deref(), Some("Before"));
    }
}

mod cancellation {
    use super::*;

    #[test]
    fn cancelled_handle_commits_nothing() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");

        let token = CancellationToken::new();
        let cancellable = cat.store.with_cancellation(token.clone());
        cancellable.set_value(shirt, "name", "Kept", StoreId::GLOBAL).unwrap();

        token.cancel();
        assert_matches!(
            cancellable.set_value(shirt, "name", "Dropped", StoreId::GLOBAL),
            Err(EavError::Cancelled)
        );
        assert_matches!(
            cancellable.create_entity("MUG", cat.set.id, EntityKind::Simple),
            Err(EavError::Cancelled)
        );

        assert_eq!(
            cat.store.get_value::<String>(shirt, "name", StoreId::GLOBAL).unwrap().as_deref(),
            Some("Kept")
        );
        assert_eq!(cat.store.entity_count().unwrap(), 1);
    }

    #[test_log::test]
    fn cancelling_a_waiting_batch_commits_nothing() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let token = CancellationToken::new();
        let cancellable = cat.store.with_cancellation(token.clone());

        // Hold the write lock so the batch below waits inside its transaction start.
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let holder = {
            let store = cat.store.clone();
            thread::spawn(move || {
                store.write(|_| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
            })
        };
        started_rx.recv().unwrap();

        let batch = thread::spawn(move || {
            cancellable.set_values(
                shirt,
                [
                    ("name", InputValue::from("Shirt")),
                    ("price", InputValue::from("9.99")),
                    ("status", InputValue::from(1)),
                ],
                StoreId::GLOBAL,
            )
        });
        thread::sleep(Duration::from_millis(50));
        token.cancel();
        release_tx.send(()).unwrap();

        holder.join().unwrap().unwrap();
        assert_matches!(batch.join().unwrap(), Err(EavError::Cancelled));
        assert_eq!(cat.row_count(shirt), 0);
        let entity = cat.store.get_entity(shirt).unwrap();
        assert_eq!(entity.updated_at, entity.created_at);
    }

    #[test]
    fn reads_ignore_cancellation() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let token = CancellationToken::new();
        token.cancel();

        let cancelled = cat.store.with_cancellation(token);
        assert!(cancelled.get_entity(shirt).is_ok());
    }

    #[test]
    fn cancelling_a_clone_does_not_affect_the_original() {
        let cat = catalog();
        let shirt = cat.product("SHIRT");
        let token = CancellationToken::new();
        let cancellable = cat.store.with_cancellation(token.clone());
        token.cancel();

        assert!(cancellable.cancellation_token().is_cancelled());
        assert!(!cat.store.cancellation_token().is_cancelled());
        cat.store.set_value(shirt, "name", "Shirt", StoreId::GLOBAL).unwrap();
    }
}

mod maintenance {
    use super::*;

    #[test]
    fn maintenance_needs_a_sole_handle() {
        let mut cat = catalog();
        let shirt = cat.product("SHIRT");
        cat.store.set_value(shirt, "name", "Shirt", StoreId::GLOBAL).unwrap();

        let clone = cat.store.clone();
        assert_matches!(
            cat.store.check_integrity(),
            Err(EavError::StoreShared { .. })
        );
        assert_matches!(cat.store.compact(), Err(EavError::StoreShared { .. }));

        drop(clone);
        assert!(cat.store.check_integrity().unwrap());
        cat.store.compact().unwrap();
        assert_eq!(
            cat.store.get_value::<String>(shirt, "name", StoreId::GLOBAL).unwrap().as_deref(),
            Some("Shirt")
        );
    }
}

mod temp_stores {
    use super::*;

    #[test]
    fn file_is_removed_with_the_last_handle() {
        let store = EavStore::temp().unwrap();
        let path = store.path().to_path_buf();
        assert!(path.exists());

        let clone = store.clone();
        let cancellable = store.with_cancellation(CancellationToken::new());
        drop(store);
        drop(cancellable);
        assert!(path.exists());
        let set = clone.default_attribute_set().unwrap();
        clone.create_entity("SHIRT", set.id, EntityKind::Simple).unwrap();

        drop(clone);
        assert!(!path.exists());
    }

    #[test]
    fn configured_paths_are_kept() {
        let common::TestCatalog { store, dir, .. } = catalog();
        let path = dir.path().join("catalog.redb");
        drop(store);
        assert!(path.exists());
    }
}
