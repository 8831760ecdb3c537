//! # eav_store
//!
//! Store-scoped Entity-Attribute-Value storage for product catalogs, on top of
//! the [redb](https://docs.rs/redb) embedded database.
//!
//! Entities (products) carry a dynamic set of attributes. Each attribute has a
//! backend type that routes its values to one of five typed tables (`varchar`,
//! `text`, `int`, `decimal`, `datetime`). A value can be stored globally and
//! overridden per store; a read for a store falls back to the global value and
//! then to the attribute's default.
//!
//! ## Features
//!
//! - **Typed reads**: `get_value::<T>` checks `T` against the attribute's backend
//!   type before reading
//! - **Store overrides**: store, global and default tiers, see [`model::ValueSource`]
//! - **Atomic writes**: every operation runs in one redb transaction; batches
//!   commit all-or-nothing
//! - **Cascades**: deleting an entity or attribute removes all of its value rows
//! - **Cancellation**: writes observe a `CancellationToken` and roll back
//!
//! ## Quick Start
//!
//! ```
//! use eav_store::prelude::*;
//!
//! let store = EavStore::temp()?;
//! let set = store.default_attribute_set()?;
//!
//! let color = store.create_attribute(
//!     NewAttribute::builder()
//!         .entity_type_id(EntityTypeId::PRODUCT)
//!         .code("color")
//!         .backend_type(BackendType::Int)
//!         .build(),
//! )?;
//! assert_eq!(color.frontend_input, FrontendInput::Select);
//!
//! let shirt = store.create_entity("SHIRT-RED-M", set.id, EntityKind::Simple)?;
//! store.set_values(
//!     shirt,
//!     [("name", InputValue::from("Red shirt")), ("color", InputValue::from(5))],
//!     StoreId::GLOBAL,
//! )?;
//! store.set_value(shirt, "color", 7, StoreId(2))?;
//!
//! assert_eq!(store.get_value::<i64>(shirt, "color", StoreId(2))?, Some(7));
//! assert_eq!(store.get_value::<i64>(shirt, "color", StoreId(3))?, Some(5));
//! # Ok::<(), EavError>(())
//! ```

pub mod config;
pub mod databases;
pub mod error;
pub mod model;
pub mod prelude;
pub mod services;
pub mod traits;
pub mod utils;

pub use databases::redb_store::EavStore;
pub use error::{EavError, EavResult};
