//! DROP TABLE

use crate::dialect::Dialect;
use crate::error::MigrationResult;
use crate::schema::validations::validate_table_name;

/// Drop a table. On Oracle the auto-increment sequence, which outlives the
/// table, is dropped too when it exists.
#[derive(Debug, Clone)]
pub struct DropTableBuilder {
    dialect: Dialect,
    table_name: String,
}

impl DropTableBuilder {
    pub fn new(dialect: Dialect, table_name: &str) -> Self {
        Self {
            dialect,
            table_name: table_name.to_string(),
        }
    }

    pub fn build(self) -> MigrationResult<Vec<String>> {
        validate_table_name(&self.table_name)?;
        let mut statements = vec![format!("DROP TABLE {}", self.table_name)];
        if self.dialect == Dialect::Oracle {
            statements.push(drop_oracle_sequence(&self.table_name));
        }
        Ok(statements)
    }
}

/// ORA-02289 (sequence does not exist) is ignored
pub(crate) fn drop_oracle_sequence(table: &str) -> String {
    format!(
        "BEGIN EXECUTE IMMEDIATE 'DROP SEQUENCE {}_seq'; EXCEPTION WHEN OTHERS THEN \
         IF SQLCODE != -2289 THEN RAISE; END IF; END;",
        table
    )
}

/// ORA-04080 (trigger does not exist) is ignored
pub(crate) fn drop_oracle_trigger(table: &str) -> String {
    format!(
        "BEGIN EXECUTE IMMEDIATE 'DROP TRIGGER {}_idt'; EXCEPTION WHEN OTHERS THEN \
         IF SQLCODE != -4080 THEN RAISE; END IF; END;",
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_table() {
        assert_eq!(
            DropTableBuilder::new(Dialect::PostgreSql, "live_measures").build().unwrap(),
            vec!["DROP TABLE live_measures"]
        );
        let statements = DropTableBuilder::new(Dialect::MsSql, "live_measures").build().unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_oracle_also_drops_sequence() {
        let statements = DropTableBuilder::new(Dialect::Oracle, "toto").build().unwrap();
        assert_eq!(statements[0], "DROP TABLE toto");
        assert_eq!(
            statements[1],
            "BEGIN EXECUTE IMMEDIATE 'DROP SEQUENCE toto_seq'; EXCEPTION WHEN OTHERS THEN \
             IF SQLCODE != -2289 THEN RAISE; END IF; END;"
        );
    }
}
