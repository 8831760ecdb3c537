pub mod redb_store;
