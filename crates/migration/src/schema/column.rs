//! Column definitions
//!
//! A `ColumnDef` is immutable once built. Builders check the per-type rules
//! (length limits, precision, defaults) so that an authoring mistake surfaces
//! when the migration is written, not when its DDL reaches the database.

use std::fmt;

use super::validations::validate_column_name;
use crate::dialect::Dialect;
use crate::error::{MigrationError, MigrationResult};

pub const MAX_VARCHAR_SIZE: u32 = 4000;
pub const DEFAULT_DECIMAL_PRECISION: u32 = 38;
pub const DEFAULT_DECIMAL_SCALE: u32 = 20;
pub const TINYINT_DIGITS: u32 = 3;

/// Semantic column type, independent of any vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Decimal { precision: u32, scale: u32 },
    Varchar { max_size: u32 },
    Clob,
    Blob,
    TinyInt,
}

impl ColumnType {
    /// Integer types able to carry an auto-increment primary key
    pub fn is_auto_increment_capable(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::BigInt)
    }

    /// Length limit carried by the type, if any
    pub fn limit(&self) -> Option<u32> {
        match self {
            ColumnType::Varchar { max_size } => Some(*max_size),
            ColumnType::TinyInt => Some(TINYINT_DIGITS),
            _ => None,
        }
    }

    /// Vendor type name
    pub fn sql_type(&self, dialect: Dialect) -> MigrationResult<String> {
        let sql = match (self, dialect) {
            (ColumnType::Boolean, Dialect::H2 | Dialect::PostgreSql) => "BOOLEAN".to_string(),
            (ColumnType::Boolean, Dialect::Oracle) => "NUMBER(1)".to_string(),
            (ColumnType::Boolean, Dialect::MsSql) => "BIT".to_string(),

            (ColumnType::Integer, Dialect::H2 | Dialect::PostgreSql) => "INTEGER".to_string(),
            (ColumnType::Integer, Dialect::Oracle) => "NUMBER(38,0)".to_string(),
            (ColumnType::Integer, Dialect::MsSql) => "INT".to_string(),

            (ColumnType::BigInt, Dialect::Oracle) => "NUMBER (38)".to_string(),
            (ColumnType::BigInt, _) => "BIGINT".to_string(),

            (ColumnType::Decimal { precision, .. }, Dialect::Oracle | Dialect::MsSql)
                if *precision > 38 =>
            {
                return Err(unsupported(self, dialect, "precision is limited to 38"));
            }
            (ColumnType::Decimal { precision, scale }, Dialect::PostgreSql | Dialect::Oracle) => {
                format!("NUMERIC ({},{})", precision, scale)
            }
            (ColumnType::Decimal { precision, scale }, Dialect::MsSql) => {
                format!("DECIMAL ({},{})", precision, scale)
            }
            (ColumnType::Decimal { .. }, Dialect::H2) => "DOUBLE".to_string(),

            (ColumnType::Varchar { max_size }, Dialect::Oracle | Dialect::MsSql)
                if *max_size > MAX_VARCHAR_SIZE =>
            {
                return Err(unsupported(self, dialect, "size is limited to 4000"));
            }
            (ColumnType::Varchar { max_size }, Dialect::H2 | Dialect::PostgreSql) => {
                format!("VARCHAR ({})", max_size)
            }
            (ColumnType::Varchar { max_size }, Dialect::Oracle) => {
                format!("VARCHAR2 ({} CHAR)", max_size)
            }
            (ColumnType::Varchar { max_size }, Dialect::MsSql) => {
                format!("NVARCHAR ({})", max_size)
            }

            (ColumnType::Clob, Dialect::H2 | Dialect::Oracle) => "CLOB".to_string(),
            (ColumnType::Clob, Dialect::PostgreSql) => "TEXT".to_string(),
            (ColumnType::Clob, Dialect::MsSql) => "NVARCHAR (MAX)".to_string(),

            (ColumnType::Blob, Dialect::H2 | Dialect::Oracle) => "BLOB".to_string(),
            (ColumnType::Blob, Dialect::PostgreSql) => "BYTEA".to_string(),
            (ColumnType::Blob, Dialect::MsSql) => "VARBINARY (MAX)".to_string(),

            (ColumnType::TinyInt, Dialect::H2 | Dialect::MsSql) => "TINYINT".to_string(),
            (ColumnType::TinyInt, Dialect::PostgreSql) => "SMALLINT".to_string(),
            (ColumnType::TinyInt, Dialect::Oracle) => "NUMBER(3)".to_string(),
        };
        Ok(sql)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            ColumnType::Varchar { max_size } => write!(f, "VARCHAR({})", max_size),
            ColumnType::Clob => write!(f, "CLOB"),
            ColumnType::Blob => write!(f, "BLOB"),
            ColumnType::TinyInt => write!(f, "TINYINT"),
        }
    }
}

fn unsupported(column_type: &ColumnType, dialect: Dialect, reason: &str) -> MigrationError {
    MigrationError::Specification(format!(
        "{} is not supported on {}: {}",
        column_type, dialect, reason
    ))
}

/// Default value of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Immutable column descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    default_value: Option<DefaultValue>,
}

impl ColumnDef {
    pub fn boolean(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Boolean)
    }

    pub fn integer(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Integer)
    }

    pub fn big_integer(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::BigInt)
    }

    /// Decimal column, NUMERIC(38,20) unless precision or scale are given
    pub fn decimal(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Decimal)
    }

    /// Variable length string; `limit` is mandatory
    pub fn varchar(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Varchar)
    }

    pub fn clob(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Clob)
    }

    pub fn blob(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::Blob)
    }

    pub fn tiny_integer(name: &str) -> ColumnDefBuilder {
        ColumnDefBuilder::new(name, Kind::TinyInt)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn limit(&self) -> Option<u32> {
        self.column_type.limit()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }

    /// Same column with a different nullability
    pub fn with_nullable(&self, nullable: bool) -> ColumnDef {
        ColumnDef {
            nullable,
            ..self.clone()
        }
    }

    /// Vendor type name of the column
    pub fn sql_type(&self, dialect: Dialect) -> MigrationResult<String> {
        self.column_type.sql_type(dialect)
    }

    /// `DEFAULT ...` clause, if the column has a default value
    pub fn sql_default(&self, dialect: Dialect) -> Option<String> {
        self.default_value.as_ref().map(|value| match value {
            DefaultValue::Bool(true) => format!("DEFAULT {}", dialect.true_sql_value()),
            DefaultValue::Bool(false) => format!("DEFAULT {}", dialect.false_sql_value()),
            DefaultValue::Int(i) => format!("DEFAULT {}", i),
            DefaultValue::Text(s) => format!("DEFAULT '{}'", s.replace('\'', "''")),
        })
    }

    /// `name TYPE [DEFAULT x] [NOT] NULL` as used in CREATE and ADD statements
    pub fn sql_definition(&self, dialect: Dialect) -> MigrationResult<String> {
        let mut sql = format!("{} {}", self.name, self.sql_type(dialect)?);
        if let Some(default) = self.sql_default(dialect) {
            sql.push(' ');
            sql.push_str(&default);
        }
        sql.push_str(if self.nullable { " NULL" } else { " NOT NULL" });
        Ok(sql)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Boolean,
    Integer,
    BigInt,
    Decimal,
    Varchar,
    Clob,
    Blob,
    TinyInt,
}

/// Fluent builder for `ColumnDef`
#[derive(Debug, Clone)]
pub struct ColumnDefBuilder {
    name: String,
    kind: Kind,
    nullable: bool,
    limit: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    default_value: Option<DefaultValue>,
}

impl ColumnDefBuilder {
    fn new(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: true,
            limit: None,
            precision: None,
            scale: None,
            default_value: None,
        }
    }

    /// Columns are nullable unless told otherwise
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Maximum length of a VARCHAR column
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn build(self) -> MigrationResult<ColumnDef> {
        validate_column_name(&self.name)?;

        if self.kind != Kind::Decimal && (self.precision.is_some() || self.scale.is_some()) {
            return Err(self.invalid("only DECIMAL columns accept a precision or a scale"));
        }
        if self.kind != Kind::Varchar && self.limit.is_some() {
            return Err(self.invalid("only VARCHAR columns accept a limit"));
        }

        let column_type = match self.kind {
            Kind::Boolean => ColumnType::Boolean,
            Kind::Integer => ColumnType::Integer,
            Kind::BigInt => ColumnType::BigInt,
            Kind::TinyInt => ColumnType::TinyInt,
            Kind::Clob => ColumnType::Clob,
            Kind::Blob => ColumnType::Blob,
            Kind::Varchar => {
                let max_size = self
                    .limit
                    .ok_or_else(|| self.invalid("a VARCHAR column needs a limit"))?;
                if max_size == 0 || max_size > MAX_VARCHAR_SIZE {
                    return Err(self.invalid(&format!(
                        "VARCHAR limit must be between 1 and {}, got {}",
                        MAX_VARCHAR_SIZE, max_size
                    )));
                }
                ColumnType::Varchar { max_size }
            }
            Kind::Decimal => {
                let precision = self.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION);
                let scale = self.scale.unwrap_or(DEFAULT_DECIMAL_SCALE);
                if precision == 0 || scale > precision {
                    return Err(self.invalid(&format!(
                        "invalid DECIMAL({},{}): precision must be positive and not less than scale",
                        precision, scale
                    )));
                }
                ColumnType::Decimal { precision, scale }
            }
        };

        if let Some(default) = &self.default_value {
            let compatible = match (default, column_type) {
                (DefaultValue::Bool(_), ColumnType::Boolean) => true,
                (
                    DefaultValue::Int(_),
                    ColumnType::Integer | ColumnType::BigInt | ColumnType::TinyInt,
                ) => true,
                (DefaultValue::Text(text), ColumnType::Varchar { max_size }) => {
                    text.chars().count() <= max_size as usize
                }
                _ => false,
            };
            if !compatible {
                return Err(self.invalid(&format!(
                    "default value {:?} is not supported for {}",
                    default, column_type
                )));
            }
        }

        Ok(ColumnDef {
            name: self.name,
            column_type,
            nullable: self.nullable,
            default_value: self.default_value,
        })
    }

    fn invalid(&self, reason: &str) -> MigrationError {
        MigrationError::Specification(format!("Column '{}': {}", self.name, reason))
    }
}
