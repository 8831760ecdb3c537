pub mod attribute_type;
pub mod table_source;
pub mod value_table;

// Re-export commonly used traits
pub use attribute_type::AttributeType;
pub use table_source::{EavRead, TableSource};
pub use value_table::ValueTable;
