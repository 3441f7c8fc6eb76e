//! Column and table model
//!
//! Vendor-neutral descriptions of columns and tables. Rendering to SQL is
//! done by the DDL builders, per dialect.

pub mod column;
pub mod table;
pub mod validations;

pub use column::{ColumnDef, ColumnDefBuilder, ColumnType, DefaultValue};
pub use table::TableSpec;
