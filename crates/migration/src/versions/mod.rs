//! Concrete database versions
//!
//! Step ids encode the version: `101_004` is the fourth step of 10.1.

pub mod common;
pub mod live_measures;
pub mod v100;
pub mod v101;
pub mod v102;

pub use common::{CreateIndex, CreateTable, DropTable, TableDefinition};
pub use v100::DbVersion100;
pub use v101::DbVersion101;
pub use v102::DbVersion102;

use crate::error::MigrationResult;
use crate::migrations::{DbVersion, MigrationStepRegistry, MigrationSteps};

/// Every version, oldest first
pub fn all_versions() -> Vec<Box<dyn DbVersion>> {
    vec![
        Box::new(DbVersion100),
        Box::new(DbVersion101),
        Box::new(DbVersion102),
    ]
}

/// Steps of every version, checked for ordering
pub fn migration_steps() -> MigrationResult<MigrationSteps> {
    MigrationStepRegistry::from_versions(&all_versions())
}

/// Definition of a table created by one of the versions
pub fn table_definition(table: &str) -> Option<TableDefinition> {
    let definition: TableDefinition = match table {
        "projects" => v100::projects_table,
        "metrics" => v100::metrics_table,
        "live_measures" => v100::live_measures_table,
        "measures" => v101::measures_table,
        _ => return None,
    };
    Some(definition)
}

/// Names accepted by [`table_definition`]
pub const TABLES: [&str; 4] = ["projects", "metrics", "live_measures", "measures"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_versions_register_in_order() {
        let steps = migration_steps().unwrap();
        assert_eq!(steps.len(), 14);
        assert_eq!(steps.all()[0].id(), 100_001);
        assert_eq!(steps.max_id(), Some(102_003));
        assert_eq!(steps.read_from(101_006).len(), 4);
    }

    #[test]
    fn test_every_table_has_a_definition() {
        for table in TABLES {
            let definition = table_definition(table).unwrap();
            for dialect in Dialect::ALL {
                assert!(definition(dialect).unwrap().build().is_ok());
            }
        }
        assert!(table_definition("issues").is_none());
    }
}
