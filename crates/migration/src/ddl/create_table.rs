//! CREATE TABLE

use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::schema::{ColumnDef, ColumnType, TableSpec};

/// Fluent builder for a table, its primary key and its auto-increment
#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    dialect: Dialect,
    table_name: String,
    columns: Vec<ColumnDef>,
    pk_columns: Vec<String>,
    pk_constraint_name: Option<String>,
    auto_increment: bool,
}

impl CreateTableBuilder {
    pub fn new(dialect: Dialect, table_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
            columns: Vec::new(),
            pk_columns: Vec::new(),
            pk_constraint_name: None,
            auto_increment: false,
        }
    }

    /// Add a column that is part of the primary key, in key order
    pub fn add_pk_column(mut self, column: ColumnDef) -> Self {
        self.pk_columns.push(column.name().to_string());
        self.columns.push(column);
        self
    }

    pub fn add_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Values of the single INTEGER or BIGINT primary key column are generated
    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Override the default `pk_<table>` constraint name
    pub fn with_pk_constraint_name(mut self, name: &str) -> Self {
        self.pk_constraint_name = Some(name.to_string());
        self
    }

    /// Validate into a table specification
    pub fn spec(self) -> MigrationResult<TableSpec> {
        TableSpec::new(
            &self.table_name,
            self.columns,
            self.pk_columns,
            self.pk_constraint_name,
            self.auto_increment,
        )
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        let dialect = self.dialect;
        create_table_statements(&self.spec()?, dialect)
    }
}

/// Statements creating `table`: the table itself first, then what depends on it
pub fn create_table_statements(
    table: &TableSpec,
    dialect: Dialect,
) -> MigrationResult<Vec<String>> {
    let mut statements = vec![create_table(table, dialect)?];

    if let (Dialect::Oracle, Some(column)) = (dialect, table.auto_increment_column()) {
        statements.push(format!(
            "CREATE SEQUENCE {}_seq START WITH 1 INCREMENT BY 1",
            table.name()
        ));
        statements.push(oracle_auto_increment_trigger(table.name(), column.name()));
    }
    Ok(statements)
}

fn create_table(table: &TableSpec, dialect: Dialect) -> MigrationResult<String> {
    let auto_increment = table.auto_increment_column().map(ColumnDef::name);

    let mut definitions = Vec::with_capacity(table.columns().len() + 1);
    for column in table.columns() {
        let definition = if Some(column.name()) == auto_increment {
            auto_increment_definition(column, dialect)?
        } else {
            column.sql_definition(dialect)?
        };
        definitions.push(definition);
    }

    if !table.primary_key().is_empty() {
        definitions.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            table.pk_constraint_name(),
            table.primary_key().join(", ")
        ));
    }

    let mut sql = format!("CREATE TABLE {} ({})", table.name(), definitions.join(", "));
    if dialect == Dialect::Oracle {
        for column in table.columns() {
            if matches!(column.column_type(), ColumnType::Clob | ColumnType::Blob) {
                sql.push_str(&format!(
                    " LOB ({}) STORE AS SECUREFILE (RETENTION NONE NOCACHE NOLOGGING)",
                    column.name()
                ));
            }
        }
    }
    Ok(sql)
}

fn auto_increment_definition(column: &ColumnDef, dialect: Dialect) -> MigrationResult<String> {
    let big = column.column_type() == ColumnType::BigInt;
    let sql = match dialect {
        Dialect::PostgreSql => {
            format!("{} {} NOT NULL", column.name(), if big { "BIGSERIAL" } else { "SERIAL" })
        }
        Dialect::H2 => format!(
            "{} {} NOT NULL AUTO_INCREMENT (1,1)",
            column.name(),
            column.sql_type(dialect)?
        ),
        Dialect::MsSql => format!(
            "{} {} NOT NULL IDENTITY (1,1)",
            column.name(),
            column.sql_type(dialect)?
        ),
        // values come from the sequence trigger
        Dialect::Oracle => format!("{} {} NOT NULL", column.name(), column.sql_type(dialect)?),
    };
    Ok(sql)
}

pub(crate) fn oracle_auto_increment_trigger(table: &str, column: &str) -> String {
    format!(
        "CREATE OR REPLACE TRIGGER {table}_idt BEFORE INSERT ON {table} FOR EACH ROW BEGIN \
         IF :new.{column} IS null THEN SELECT {table}_seq.nextval INTO :new.{column} FROM dual; END IF; END;",
        table = table,
        column = column
    )
}
