//! Read-only queries on the database catalog

pub mod constraint;
pub mod inspect;

pub use constraint::find_primary_key_constraint;
pub use inspect::{column_exists, index_exists, table_exists};
