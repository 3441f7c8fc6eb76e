use anyhow::{anyhow, Context as _};
use strata_migration::dialect::Dialect;
use strata_migration::versions::{table_definition, TABLES};

/// DDL of one of the registered tables, rendered for `dialect`
pub fn render(dialect: &str, table: &str) -> anyhow::Result<Vec<String>> {
    let dialect: Dialect = dialect.parse().context("Invalid --dialect")?;
    let definition = table_definition(table).ok_or_else(|| {
        anyhow!("Unknown table '{}', expected one of: {}", table, TABLES.join(", "))
    })?;
    Ok(definition(dialect)?.build()?)
}

pub fn print(dialect: &str, table: &str) -> anyhow::Result<()> {
    for statement in render(dialect, table)? {
        println!("{};", statement);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_oracle_sequence_free_table() {
        let statements = render("oracle", "projects").unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0]
            .starts_with("CREATE TABLE projects (uuid VARCHAR2 (40 CHAR) NOT NULL"));
    }

    #[test]
    fn test_rejects_unknown_input() {
        assert!(render("sqlite", "projects").is_err());
        let err = render("postgresql", "issues").unwrap_err();
        assert!(err.to_string().contains("measures"));
    }
}
