//! Parser configuration.
//!
//! [`ParserConfig`] selects the dialect and the limits the grammar and the CNF
//! normalizer enforce. It deserializes from TOML with every field optional:
//!
//! ```toml
//! dialect = "mssql"
//! max_nesting_depth = 64
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sql::dialect::Dialect;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;
pub const DEFAULT_MAX_CNF_LEAVES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub dialect: Dialect,
    /// Overrides the dialect's backslash escape rule for string literals.
    pub backslash_escapes: Option<bool>,
    pub allow_use_statements: bool,
    /// Parentheses, subqueries and function arguments nested deeper than this
    /// are rejected.
    pub max_nesting_depth: usize,
    /// Upper bound on the leaves of a normalized predicate.
    pub max_cnf_leaves: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            dialect: Dialect::default(),
            backslash_escapes: None,
            allow_use_statements: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_cnf_leaves: DEFAULT_MAX_CNF_LEAVES,
        }
    }
}

impl ParserConfig {
    pub fn new(dialect: Dialect) -> Self {
        ParserConfig {
            dialect,
            ..ParserConfig::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ParserConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(Error::config("max_nesting_depth must be greater than zero"));
        }
        if self.max_cnf_leaves == 0 {
            return Err(Error::config("max_cnf_leaves must be greater than zero"));
        }
        Ok(())
    }

    /// Whether backslash escapes apply to a plain quoted string.
    pub fn backslash_escapes(&self) -> bool {
        self.backslash_escapes
            .unwrap_or_else(|| self.dialect.backslash_escapes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = ParserConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dialect, Dialect::MySql);
        assert!(config.allow_use_statements);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = ParserConfig::from_toml_str("dialect = \"postgresql\"\nmax_cnf_leaves = 10\n")
            .unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.max_cnf_leaves, 10);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert!(!config.backslash_escapes());
    }

    #[test]
    fn backslash_override_wins() {
        let mut config = ParserConfig::new(Dialect::MySql);
        assert!(config.backslash_escapes());
        config.backslash_escapes = Some(false);
        assert!(!config.backslash_escapes());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = ParserConfig::from_toml_str("max_nesting_depth = 0").unwrap_err();
        assert_eq!(
            err,
            Error::config("max_nesting_depth must be greater than zero")
        );
    }

    #[test]
    fn unknown_dialect_is_a_config_error() {
        let err = ParserConfig::from_toml_str("dialect = \"oracle\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect = \"tsql\"").unwrap();
        writeln!(file, "allow_use_statements = false").unwrap();
        let config = ParserConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dialect, Dialect::MsSql);
        assert!(!config.allow_use_statements);

        let missing = ParserConfig::from_file("/non/existent/encsql.toml").unwrap_err();
        assert!(matches!(&missing, Error::Config(m) if m.starts_with("failed to read /non/existent/encsql.toml")));
    }
}
