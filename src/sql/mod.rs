//! SQL front end.
//!
//! Text goes through the dialect-aware [`lexer`], the recursive-descent
//! [`grammar`] builds a concrete parse tree ([`cst`]), and the [`builder`]
//! turns that tree into typed [`Query`] values.

pub mod builder;
pub mod cst;
pub mod dialect;
pub mod grammar;
pub mod lexer;
pub mod literal;

pub use dialect::Dialect;
pub use lexer::Token;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::query::Query;
use builder::Builder;
use cst::ParseNode;
use grammar::Grammar;

/// Parses batches of SQL statements for one dialect.
///
/// A parser holds only its configuration, so it is cheap to create and can
/// be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(dialect: Dialect) -> Self {
        Parser {
            config: ParserConfig::new(dialect),
        }
    }

    pub fn with_config(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Parser { config })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Parse a `;`-separated batch. Any error fails the whole batch.
    pub fn parse(&self, sql: &str) -> Result<Vec<Query>> {
        let tree = self.parse_tree(sql)?;
        let queries = Builder::new(sql, &self.config).build_batch(&tree)?;
        debug!(
            dialect = %self.config.dialect,
            statements = queries.len(),
            "parsed batch"
        );
        Ok(queries)
    }

    /// The concrete parse tree of a batch. Lexer and grammar failures are
    /// reported as [`Error::ParseFailed`].
    pub fn parse_tree(&self, sql: &str) -> Result<ParseNode> {
        Grammar::parse(sql, &self.config).map_err(Error::parse_failed)
    }
}
