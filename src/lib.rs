//! # encsql
//!
//! A multi-dialect SQL front end for an encrypted-query planner.
//!
//! SQL text written for MSSQL, MySQL or Postgres is parsed into a typed,
//! dialect-neutral [`Query`] representation. Every WHERE, HAVING and ON
//! condition is stored in conjunctive normal form, every literal is decoded,
//! and every column definition carries its resolved encryption flags.
//!
//! ```
//! use encsql::{parse, Dialect, Query};
//!
//! let queries = parse("SELECT a FROM t WHERE a <= 3 OR b = 'x'", Dialect::MySql).unwrap();
//! match &queries[0] {
//!     Query::Select(select) => assert_eq!(select.where_clause.as_ref().unwrap().cnf.len(), 1),
//!     other => panic!("unexpected {}", other.kind()),
//! }
//! ```

pub mod ast;
pub mod cnf;
pub mod config;
pub mod error;
pub mod query;
pub mod sql;
pub mod types;

pub use ast::{AggregateFunction, ConstantContainer, ExprKind, Expression};
pub use cnf::{ConjunctiveNormalForm, Disjunction, WhereClause};
pub use config::ParserConfig;
pub use error::{Error, Result};
pub use query::Query;
pub use sql::{Dialect, Parser};
pub use types::{ColumnRef, Constant, DataType, DatabaseRef, EncryptionFlags, Identifier, TableRef};

/// Parse a batch of statements with the default configuration for `dialect`.
pub fn parse(sql: &str, dialect: Dialect) -> Result<Vec<Query>> {
    Parser::new(dialect).parse(sql)
}

/// Parse a batch of statements with an explicit configuration.
pub fn parse_with_config(sql: &str, config: &ParserConfig) -> Result<Vec<Query>> {
    Parser::with_config(config.clone())?.parse(sql)
}
