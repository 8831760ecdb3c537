//! Domain records stored by the engine.
//!
//! Identifiers are thin newtypes so an attribute id can never be passed where an
//! entity id is expected. They convert to and from their raw integers, which is
//! the form the storage tables use.

pub mod attribute;
pub mod attribute_set;
pub mod entity;
pub mod value;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

pub use attribute::{
    Attribute, AttributeFlags, AttributeUpdate, BackendType, FrontendInput, NewAttribute,
};
pub use attribute_set::{AttributeGroup, AttributeSet};
pub use entity::{Entity, EntityKind};
pub use value::{AttributeValue, InputValue, ResolvedValue, TypedValue, ValueSource};

macro_rules! id_newtype {
    ($($(#[$meta:meta])* $name:ident($raw:ty);)*) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
                Display, From, Into, Serialize, Deserialize,
            )]
            pub struct $name(pub $raw);

            impl $name {
                pub const fn get(self) -> $raw {
                    self.0
                }
            }
        )*
    };
}

id_newtype! {
    /// Identifier of a catalog entity (a product).
    EntityId(u64);
    AttributeId(u64);
    AttributeSetId(u64);
    AttributeGroupId(u64);
    /// Opaque identifier of a category owned by the category tree service.
    CategoryId(u64);
    /// Entity type discriminator supplied by the caller (product, customer, ...).
    EntityTypeId(u32);
    /// Store scope. Store 0 is the global scope every other store falls back to.
    StoreId(u32);
}

impl EntityTypeId {
    /// The catalog product entity type seeded at bootstrap.
    pub const PRODUCT: EntityTypeId = EntityTypeId(1);
}

impl StoreId {
    /// The global scope. Encoded as 0 on disk.
    pub const GLOBAL: StoreId = StoreId(0);

    pub const fn is_global(self) -> bool {
        self.0 == 0
    }

    /// Store scopes to consult, most specific first.
    pub fn fallback_chain(self) -> impl Iterator<Item = StoreId> {
        let global = (!self.is_global()).then_some(StoreId::GLOBAL);
        std::iter::once(self).chain(global)
    }
}

impl Default for StoreId {
    fn default() -> Self {
        StoreId::GLOBAL
    }
}
