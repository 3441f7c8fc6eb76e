//! DDL builders
//!
//! Builders validate their input and render the statements for one dialect,
//! in the order they must be executed. Nothing is sent to the database here,
//! except for the catalog lookup done by [`DropPrimaryKeySqlGenerator`].

pub mod add_columns;
pub mod alter_columns;
pub mod create_table;
pub mod drop_columns;
pub mod drop_table;
pub mod index;
pub mod primary_key;
pub mod rename;

pub use add_columns::AddColumnsBuilder;
pub use alter_columns::AlterColumnsBuilder;
pub use create_table::{create_table_statements, CreateTableBuilder};
pub use drop_columns::DropColumnsBuilder;
pub use drop_table::DropTableBuilder;
pub use index::{CreateIndexBuilder, DropIndexBuilder};
pub use primary_key::{AddPrimaryKeyBuilder, DropPrimaryKeySqlGenerator};
pub use rename::{RenameColumnsBuilder, RenameTableBuilder};
