//! Version 10.0: projects, metrics and their live measures

use super::common::{CreateIndex, CreateTable};
use crate::ddl::CreateTableBuilder;
use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::migrations::{DbVersion, MigrationStepRegistry};
use crate::schema::ColumnDef;

pub const UUID_SIZE: u32 = 40;

pub struct DbVersion100;

impl DbVersion for DbVersion100 {
    fn add_steps(&self, registry: &mut MigrationStepRegistry) -> MigrationResult<()> {
        registry
            .add(100_001, "Create table 'projects'", CreateTable::new("projects", projects_table))?
            .add(100_002, "Create table 'metrics'", CreateTable::new("metrics", metrics_table))?
            .add(
                100_003,
                "Create table 'live_measures'",
                CreateTable::new("live_measures", live_measures_table),
            )?
            .add(
                100_004,
                "Add index on 'live_measures.project_uuid'",
                CreateIndex::new("live_measures", "live_measures_project", &["project_uuid"]),
            )?
            .add(
                100_005,
                "Add unique index on 'live_measures' component and metric",
                CreateIndex::new(
                    "live_measures",
                    "live_measures_component",
                    &["component_uuid", "metric_uuid"],
                )
                .unique(),
            )?;
        Ok(())
    }
}

pub fn projects_table(dialect: Dialect) -> MigrationResult<CreateTableBuilder> {
    Ok(CreateTableBuilder::new(dialect, "projects")
        .add_pk_column(ColumnDef::varchar("uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("kee").limit(400).not_null().build()?)
        .add_column(ColumnDef::varchar("name").limit(2000).build()?)
        .add_column(ColumnDef::big_integer("created_at").not_null().build()?))
}

/// Keyed by name until 10.2 moves the primary key to `uuid`
pub fn metrics_table(dialect: Dialect) -> MigrationResult<CreateTableBuilder> {
    Ok(CreateTableBuilder::new(dialect, "metrics")
        .add_pk_column(ColumnDef::varchar("name").limit(64).not_null().build()?)
        .add_column(ColumnDef::varchar("uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("value_type").limit(8).not_null().build()?))
}

pub fn live_measures_table(dialect: Dialect) -> MigrationResult<CreateTableBuilder> {
    Ok(CreateTableBuilder::new(dialect, "live_measures")
        .add_pk_column(ColumnDef::varchar("uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("project_uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("component_uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("metric_uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::decimal("value").build()?)
        .add_column(ColumnDef::varchar("text_value").limit(4000).build()?)
        .add_column(ColumnDef::blob("measure_data").build()?)
        .add_column(ColumnDef::big_integer("created_at").not_null().build()?)
        .add_column(ColumnDef::big_integer("updated_at").not_null().build()?))
}
