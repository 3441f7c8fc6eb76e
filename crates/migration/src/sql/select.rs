//! Forward-only queries

use futures::StreamExt;

use super::Parameters;
use crate::backends::{DatabaseConnection, DatabaseRow, DatabaseValue, RowStream};
use crate::error::{MigrationError, MigrationResult};

/// Parameterized query, bound before it is opened on a connection
#[derive(Debug, Clone)]
pub struct SelectQuery {
    sql: String,
    params: Parameters,
}

impl SelectQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Parameters::default(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn set_string(mut self, index: usize, value: Option<&str>) -> Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_long(mut self, index: usize, value: Option<i64>) -> Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_double(mut self, index: usize, value: Option<f64>) -> Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_boolean(mut self, index: usize, value: Option<bool>) -> Self {
        self.params.set(index, value.into());
        self
    }

    pub fn set_bytes(mut self, index: usize, value: Option<Vec<u8>>) -> Self {
        self.params.set(index, value.into());
        self
    }

    /// Open a cursor over the result set
    pub fn open<'a>(&'a self, conn: &'a mut dyn DatabaseConnection) -> MigrationResult<Select<'a>> {
        let params = self.params.resolve()?;
        Ok(Select {
            rows: Some(conn.fetch(&self.sql, params)),
        })
    }

    /// First row of the result set, if any
    pub async fn first(&self, conn: &mut dyn DatabaseConnection) -> MigrationResult<Option<Row>> {
        let params = self.params.resolve()?;
        let row = conn.fetch_optional(&self.sql, &params).await?;
        Ok(row.map(Row::new))
    }

    /// Map every row; the whole result is held in memory, keep it for small sets
    pub async fn list<T, F>(
        &self,
        conn: &mut dyn DatabaseConnection,
        mut reader: F,
    ) -> MigrationResult<Vec<T>>
    where
        F: FnMut(&Row) -> MigrationResult<T>,
    {
        let mut select = self.open(conn)?;
        let mut items = Vec::new();
        while let Some(row) = select.next().await? {
            items.push(reader(&row)?);
        }
        Ok(items)
    }
}

/// Open cursor; rows are pulled from the database one at a time
pub struct Select<'a> {
    rows: Option<RowStream<'a>>,
}

impl Select<'_> {
    /// Next row, or `None` once the result set is exhausted
    pub async fn next(&mut self) -> MigrationResult<Option<Row>> {
        let Some(stream) = self.rows.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(row) => Ok(Some(Row::new(row?))),
            None => {
                // release the connection borrow as soon as the result set is drained
                self.rows = None;
                Ok(None)
            }
        }
    }
}

/// Current row of a cursor, read by 1-based column index
pub struct Row {
    inner: Box<dyn DatabaseRow>,
}

impl Row {
    pub(crate) fn new(inner: Box<dyn DatabaseRow>) -> Self {
        Self { inner }
    }

    pub fn column_count(&self) -> usize {
        self.inner.column_count()
    }

    fn value(&self, index: usize) -> MigrationResult<DatabaseValue> {
        if index == 0 {
            return Err(MigrationError::Conversion(
                "Column indexes start at 1".to_string(),
            ));
        }
        self.inner.get_by_index(index - 1)
    }

    fn mismatch(index: usize, expected: &str, value: &DatabaseValue) -> MigrationError {
        MigrationError::Conversion(format!(
            "Column {} holds a {} value, expected {}",
            index,
            value.type_name(),
            expected
        ))
    }

    fn required<T>(index: usize, value: Option<T>) -> MigrationResult<T> {
        value.ok_or_else(|| MigrationError::Conversion(format!("Column {} is null", index)))
    }

    pub fn get_nullable_string(&self, index: usize) -> MigrationResult<Option<String>> {
        match self.value(index)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::String(s) => Ok(Some(s)),
            other => Err(Self::mismatch(index, "a string", &other)),
        }
    }

    pub fn get_string(&self, index: usize) -> MigrationResult<String> {
        Self::required(index, self.get_nullable_string(index)?)
    }

    pub fn get_nullable_long(&self, index: usize) -> MigrationResult<Option<i64>> {
        match self.value(index)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::Int32(v) => Ok(Some(i64::from(v))),
            DatabaseValue::Int64(v) => Ok(Some(v)),
            other => Err(Self::mismatch(index, "an integer", &other)),
        }
    }

    pub fn get_long(&self, index: usize) -> MigrationResult<i64> {
        Self::required(index, self.get_nullable_long(index)?)
    }

    pub fn get_nullable_double(&self, index: usize) -> MigrationResult<Option<f64>> {
        match self.value(index)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::Float64(v) => Ok(Some(v)),
            DatabaseValue::Int32(v) => Ok(Some(f64::from(v))),
            DatabaseValue::Int64(v) => Ok(Some(v as f64)),
            other => Err(Self::mismatch(index, "a number", &other)),
        }
    }

    pub fn get_double(&self, index: usize) -> MigrationResult<f64> {
        Self::required(index, self.get_nullable_double(index)?)
    }

    /// Booleans are stored as 0/1 numbers on Oracle and SQL Server
    pub fn get_nullable_boolean(&self, index: usize) -> MigrationResult<Option<bool>> {
        match self.value(index)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::Bool(v) => Ok(Some(v)),
            DatabaseValue::Int32(0) | DatabaseValue::Int64(0) => Ok(Some(false)),
            DatabaseValue::Int32(1) | DatabaseValue::Int64(1) => Ok(Some(true)),
            other => Err(Self::mismatch(index, "a boolean", &other)),
        }
    }

    pub fn get_boolean(&self, index: usize) -> MigrationResult<bool> {
        Self::required(index, self.get_nullable_boolean(index)?)
    }

    pub fn get_nullable_bytes(&self, index: usize) -> MigrationResult<Option<Vec<u8>>> {
        match self.value(index)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::Bytes(b) => Ok(Some(b)),
            other => Err(Self::mismatch(index, "bytes", &other)),
        }
    }

    pub fn get_bytes(&self, index: usize) -> MigrationResult<Vec<u8>> {
        Self::required(index, self.get_nullable_bytes(index)?)
    }
}
