//! SQL dialect catalog
//!
//! The dialect is detected once, when the connection pool is created, and
//! threaded through every builder, resolver and inspector call afterwards.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Supported database vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    H2,
    PostgreSql,
    Oracle,
    MsSql,
}

impl Dialect {
    pub const ALL: [Dialect; 4] =
        [Dialect::H2, Dialect::PostgreSql, Dialect::Oracle, Dialect::MsSql];

    /// Stable identifier of the dialect
    pub fn id(&self) -> &'static str {
        match self {
            Dialect::H2 => "h2",
            Dialect::PostgreSql => "postgresql",
            Dialect::Oracle => "oracle",
            Dialect::MsSql => "mssql",
        }
    }

    /// Detect the dialect from a connection URL
    pub fn from_url(url: &str) -> Option<Dialect> {
        let url = url.trim().to_ascii_lowercase();
        if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("jdbc:postgresql:")
        {
            Some(Dialect::PostgreSql)
        } else if url.starts_with("jdbc:h2:") || url.starts_with("h2:") {
            Some(Dialect::H2)
        } else if url.starts_with("jdbc:oracle:") || url.starts_with("oracle://") {
            Some(Dialect::Oracle)
        } else if url.starts_with("jdbc:sqlserver:")
            || url.starts_with("mssql://")
            || url.starts_with("sqlserver://")
        {
            Some(Dialect::MsSql)
        } else {
            None
        }
    }

    /// Fold an identifier the way the vendor stores it in its catalogs
    pub fn normalize_identifier(&self, identifier: &str) -> String {
        match self {
            Dialect::Oracle | Dialect::H2 => identifier.to_ascii_uppercase(),
            Dialect::PostgreSql => identifier.to_ascii_lowercase(),
            Dialect::MsSql => identifier.to_string(),
        }
    }

    /// Literal used for boolean `true` in DDL defaults and data updates
    pub fn true_sql_value(&self) -> &'static str {
        match self {
            Dialect::H2 | Dialect::PostgreSql => "true",
            Dialect::Oracle | Dialect::MsSql => "1",
        }
    }

    /// Literal used for boolean `false`
    pub fn false_sql_value(&self) -> &'static str {
        match self {
            Dialect::H2 | Dialect::PostgreSql => "false",
            Dialect::Oracle | Dialect::MsSql => "0",
        }
    }

    /// Whether DDL statements take part in the surrounding transaction
    pub fn supports_transactional_ddl(&self) -> bool {
        matches!(self, Dialect::PostgreSql | Dialect::MsSql | Dialect::H2)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h2" => Ok(Dialect::H2),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            "oracle" => Ok(Dialect::Oracle),
            "mssql" | "sqlserver" => Ok(Dialect::MsSql),
            _ => Err(ConfigError::InvalidValue {
                field: "dialect".to_string(),
                value: s.to_string(),
                expected: "h2, postgresql, oracle or mssql".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_url() {
        assert_eq!(Dialect::from_url("postgres://localhost/sonar"), Some(Dialect::PostgreSql));
        assert_eq!(Dialect::from_url("jdbc:postgresql://db:5432/x"), Some(Dialect::PostgreSql));
        assert_eq!(Dialect::from_url("jdbc:h2:tcp://localhost:9092/sonar"), Some(Dialect::H2));
        assert_eq!(Dialect::from_url("jdbc:oracle:thin:@localhost:1521/XE"), Some(Dialect::Oracle));
        assert_eq!(
            Dialect::from_url("jdbc:sqlserver://localhost;databaseName=x"),
            Some(Dialect::MsSql)
        );
        assert_eq!(Dialect::from_url("mysql://localhost/x"), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSql);
        assert_eq!("sqlserver".parse::<Dialect>().unwrap(), Dialect::MsSql);
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_identifier_case_folding() {
        assert_eq!(Dialect::Oracle.normalize_identifier("live_measures"), "LIVE_MEASURES");
        assert_eq!(Dialect::H2.normalize_identifier("projects"), "PROJECTS");
        assert_eq!(Dialect::PostgreSql.normalize_identifier("Projects"), "projects");
        assert_eq!(Dialect::MsSql.normalize_identifier("Projects"), "Projects");
    }
}
