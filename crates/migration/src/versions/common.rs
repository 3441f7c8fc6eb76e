//! Idempotent DDL steps shared by versions

use async_trait::async_trait;

use crate::ddl::{CreateIndexBuilder, CreateTableBuilder, DropTableBuilder};
use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::introspection::{index_exists, table_exists};
use crate::migrations::{Context, MigrationStep};

pub type TableDefinition = fn(Dialect) -> MigrationResult<CreateTableBuilder>;

/// Create a table unless it already exists
pub struct CreateTable {
    table: &'static str,
    definition: TableDefinition,
}

impl CreateTable {
    pub fn new(table: &'static str, definition: TableDefinition) -> Self {
        Self { table, definition }
    }
}

#[async_trait]
impl MigrationStep for CreateTable {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let mut conn = ctx.connection().await?;
        if table_exists(conn.as_mut(), self.table).await? {
            tracing::debug!(table = self.table, "table already exists");
            return Ok(());
        }
        let statements = (self.definition)(ctx.dialect())?.build()?;
        ctx.execute_ddl(&statements).await
    }
}

/// Create an index unless one with the same name exists on the table
pub struct CreateIndex {
    table: &'static str,
    index: &'static str,
    columns: &'static [&'static str],
    unique: bool,
}

impl CreateIndex {
    pub fn new(table: &'static str, index: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            table,
            index,
            columns,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[async_trait]
impl MigrationStep for CreateIndex {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let mut conn = ctx.connection().await?;
        if index_exists(conn.as_mut(), self.table, self.index).await? {
            tracing::debug!(table = self.table, index = self.index, "index already exists");
            return Ok(());
        }
        let builder = self
            .columns
            .iter()
            .fold(CreateIndexBuilder::new(self.table, self.index).unique(self.unique), |b, c| {
                b.add_column(c)
            });
        ctx.execute_ddl(&builder.build()?).await
    }
}

/// Drop a table if it exists
pub struct DropTable {
    table: &'static str,
}

impl DropTable {
    pub fn new(table: &'static str) -> Self {
        Self { table }
    }
}

#[async_trait]
impl MigrationStep for DropTable {
    async fn execute(&self, ctx: &Context) -> MigrationResult<()> {
        let mut conn = ctx.connection().await?;
        if !table_exists(conn.as_mut(), self.table).await? {
            tracing::debug!(table = self.table, "table already dropped");
            return Ok(());
        }
        let statements = DropTableBuilder::new(ctx.dialect(), self.table).build()?;
        ctx.execute_ddl(&statements).await
    }
}
