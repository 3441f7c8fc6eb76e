//! Version 10.1: one JSON measures row per component

use async_trait::async_trait;

use super::common::{CreateIndex, CreateTable};
use super::live_measures::MigrateLiveMeasuresToMeasures;
use super::v100::UUID_SIZE;
use crate::ddl::{AddColumnsBuilder, AlterColumnsBuilder, CreateTableBuilder};
use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::introspection::column_exists;
use crate::migrations::{Context, DbVersion, MigrationStep, MigrationStepRegistry};
use crate::schema::ColumnDef;
use crate::sql::SelectQuery;

pub struct DbVersion101;

impl DbVersion for DbVersion101 {
    fn add_steps(&self, registry: &mut MigrationStepRegistry) -> MigrationResult<()> {
        registry
            .add(
                101_001,
                "Add 'measures_migrated' column to 'projects'",
                AddMeasuresMigratedColumn,
            )?
            .add(
                101_002,
                "Populate 'measures_migrated' column of 'projects'",
                PopulateMeasuresMigratedColumn,
            )?
            .add(
                101_003,
                "Make 'measures_migrated' column of 'projects' not nullable",
                MakeMeasuresMigratedNotNullable,
            )?
            .add(101_004, "Create table 'measures'", CreateTable::new("measures", measures_table))?
            .add(
                101_005,
                "Add index on 'measures.project_uuid'",
                CreateIndex::new("measures", "measures_project", &["project_uuid"]),
            )?
            .add(
                101_006,
                "Migrate content of 'live_measures' to 'measures'",
                MigrateLiveMeasuresToMeasures,
            )?;
        Ok(())
    }
}

pub fn measures_table(dialect: Dialect) -> MigrationResult<CreateTableBuilder> {
    Ok(CreateTableBuilder::new(dialect, "measures")
        .add_pk_column(ColumnDef::varchar("component_uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::varchar("project_uuid").limit(UUID_SIZE).not_null().build()?)
        .add_column(ColumnDef::clob("json_value").not_null().build()?)
        .add_column(ColumnDef::big_integer("json_value_hash").not_null().build()?)
        .add_column(ColumnDef::big_integer("created_at").not_null().build()?)
        .add_column(ColumnDef::big_integer("updated_at").not_null().build()?))
}

fn measures_migrated(nullable: bool) -> MigrationResult<ColumnDef> {
    ColumnDef::boolean("measures_migrated").nullable(nullable).build()
}

pub struct AddMeasuresMigratedColumn;

#[async_trait]
impl MigrationStep for AddMeasuresMigratedColumn {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let mut conn = ctx.connection().await?;
        if column_exists(conn.as_mut(), "projects", "measures_migrated").await? {
            tracing::debug!("column projects.measures_migrated already exists");
            return Ok(());
        }
        let statements = AddColumnsBuilder::new(ctx.dialect(), "projects")
            .add_column(measures_migrated(true)?)
            .build()?;
        ctx.execute_ddl(&statements).await
    }
}

/// Only rows still null are touched, so a rerun resumes where it stopped
pub struct PopulateMeasuresMigratedColumn;

#[async_trait]
impl MigrationStep for PopulateMeasuresMigratedColumn {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let rows = ctx
            .mass_update()
            .await?
            .select(SelectQuery::new("SELECT uuid FROM projects WHERE measures_migrated IS NULL"))
            .update("UPDATE projects SET measures_migrated = ? WHERE uuid = ?")
            .row_plural_name("projects")
            .execute(|row, update| {
                update
                    .set_boolean(1, Some(false))
                    .set_string(2, Some(&row.get_string(1)?));
                Ok(true)
            })
            .await?;
        tracing::info!(rows, "measures_migrated populated");
        Ok(())
    }
}

pub struct MakeMeasuresMigratedNotNullable;

#[async_trait]
impl MigrationStep for MakeMeasuresMigratedNotNullable {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let statements = AlterColumnsBuilder::new(ctx.dialect(), "projects")
            .update_column(measures_migrated(false)?)
            .build()?;
        ctx.execute_ddl(&statements).await
    }
}
