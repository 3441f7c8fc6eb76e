//! Identifier validation
//!
//! Identifiers must be portable across every supported dialect, so the rules
//! follow the most restrictive vendor.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MigrationError, MigrationResult};

pub const TABLE_NAME_MAX_SIZE: usize = 25;
pub const COLUMN_NAME_MAX_SIZE: usize = 30;
pub const INDEX_NAME_MAX_SIZE: usize = 30;
pub const CONSTRAINT_NAME_MAX_SIZE: usize = 30;

static LOWER_CASE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid identifier pattern"));

const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "between", "by", "case", "check", "column", "constraint", "create",
    "default", "delete", "distinct", "drop", "else", "exists", "from", "grant", "group",
    "having", "in", "insert", "into", "is", "join", "like", "not", "null", "on", "or", "order",
    "primary", "references", "select", "table", "then", "to", "union", "unique", "update",
    "user", "when", "where", "with",
];

pub fn validate_table_name(name: &str) -> MigrationResult<&str> {
    validate_identifier("Table name", name, TABLE_NAME_MAX_SIZE)
}

pub fn validate_column_name(name: &str) -> MigrationResult<&str> {
    validate_identifier("Column name", name, COLUMN_NAME_MAX_SIZE)
}

pub fn validate_index_name(name: &str) -> MigrationResult<&str> {
    validate_identifier("Index name", name, INDEX_NAME_MAX_SIZE)
}

pub fn validate_constraint_name(name: &str) -> MigrationResult<&str> {
    validate_identifier("Constraint name", name, CONSTRAINT_NAME_MAX_SIZE)
}

fn validate_identifier<'a>(kind: &str, name: &'a str, max_size: usize) -> MigrationResult<&'a str> {
    if name.is_empty() {
        return Err(MigrationError::Specification(format!("{} can't be empty", kind)));
    }
    if name.len() > max_size {
        return Err(MigrationError::Specification(format!(
            "{} length can't be more than {}, got '{}'",
            kind, max_size, name
        )));
    }
    if !LOWER_CASE_IDENTIFIER.is_match(name) {
        return Err(MigrationError::Specification(format!(
            "{} must be lower case and contain only alphanumeric chars or '_', got '{}'",
            kind, name
        )));
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(MigrationError::Specification(format!(
            "{} must not be an SQL reserved keyword, got '{}'",
            kind, name
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_portable_names() {
        assert!(validate_table_name("live_measures").is_ok());
        assert!(validate_column_name("json_value_hash").is_ok());
        assert!(validate_index_name("measures_project").is_ok());
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("LiveMeasures").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_column_name("order").is_err());
        assert!(validate_table_name("a_table_name_much_too_long_for_oracle").is_err());
    }
}
