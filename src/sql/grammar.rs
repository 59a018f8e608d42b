//! Recursive-descent grammar producing the concrete parse tree.
//!
//! [`Grammar::parse`] tokenizes a batch and returns a [`Rule::Batch`] node
//! whose children are one statement node per statement (plus the `;`
//! terminals between them). The grammar only checks shape. Every decision
//! about meaning (operator rewriting, literal decoding, dialect-specific
//! rejections) is left to the builder.
//!
//! Expression precedence, loosest first:
//!
//! ```text
//! OR < AND < NOT < ^ & | < comparisons, IN, LIKE, IS, BETWEEN < + - < * / % < unary
//! ```
//!
//! Parentheses, subqueries, function arguments, `NOT` and unary signs each
//! add one nesting level; deeper input than the configured limit is rejected
//! before it can exhaust the stack.

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::sql::cst::{ParseNode, Rule};
use crate::sql::dialect::Dialect;
use crate::sql::lexer::{line_column, Lexer, Span, SpannedToken, Token};

/// Niladic functions that are called without parentheses.
const BARE_FUNCTIONS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "LOCALTIME",
    "LOCALTIMESTAMP",
];

pub struct Grammar<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
    dialect: Dialect,
    max_depth: usize,
    depth: usize,
}

impl<'a> Grammar<'a> {
    /// Tokenize and parse a complete batch.
    pub fn parse(source: &'a str, config: &ParserConfig) -> Result<ParseNode> {
        let tokens = Lexer::new(source, config.dialect)
            .with_backslash_escapes(config.backslash_escapes())
            .tokenize()?;
        Grammar::new(source, tokens, config.dialect, config.max_nesting_depth).parse_batch()
    }

    pub fn new(
        source: &'a str,
        mut tokens: Vec<SpannedToken>,
        dialect: Dialect,
        max_depth: usize,
    ) -> Self {
        if tokens.last().map(|t| &t.token) != Some(&Token::Eof) {
            tokens.push(SpannedToken {
                token: Token::Eof,
                span: Span::new(source.len(), source.len()),
            });
        }
        Grammar {
            source,
            tokens,
            pos: 0,
            dialect,
            max_depth,
            depth: 0,
        }
    }

    // =======================================================================
    // Token helpers
    // =======================================================================

    fn current(&self) -> &Token {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn at(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn at_word(&self, word: &str) -> bool {
        self.current().is_word(word)
    }

    /// Consume the current token as a terminal node.
    fn advance(&mut self) -> ParseNode {
        let index = self.pos.min(self.tokens.len() - 1);
        let node = ParseNode::leaf(&self.tokens[index], self.source);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        node
    }

    fn accept(&mut self, token: &Token) -> Option<ParseNode> {
        if self.at(token) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn accept_word(&mut self, word: &str) -> Option<ParseNode> {
        if self.at_word(word) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, token: &Token) -> Result<ParseNode> {
        if self.at(token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<ParseNode> {
        if self.at_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(word))
        }
    }

    fn expect_identifier(&mut self) -> Result<ParseNode> {
        if self.current().is_identifier() {
            Ok(self.advance())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len());
        let (line, column) = line_column(self.source, offset);
        Error::syntax(message, line, column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error(format!("expected {expected}, found {}", self.current()))
    }

    fn deepen(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(self.error(format!(
                "nesting exceeds the limit of {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.deepen()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// `( item , item ... )` with the delimiters kept as terminals.
    fn parenthesized(
        &mut self,
        rule: Rule,
        mut item: impl FnMut(&mut Self) -> Result<ParseNode>,
    ) -> Result<ParseNode> {
        self.nested(|p| {
            let mut children = vec![p.expect(&Token::LeftParen)?];
            children.push(item(p)?);
            while let Some(comma) = p.accept(&Token::Comma) {
                children.push(comma);
                children.push(item(p)?);
            }
            children.push(p.expect(&Token::RightParen)?);
            Ok(ParseNode::new(rule, children))
        })
    }

    // =======================================================================
    // Batch and statement dispatch
    // =======================================================================

    pub fn parse_batch(&mut self) -> Result<ParseNode> {
        let mut children = Vec::new();
        loop {
            while let Some(semi) = self.accept(&Token::Semicolon) {
                children.push(semi);
            }
            if self.at(&Token::Eof) {
                break;
            }
            children.push(self.parse_statement()?);
            if !matches!(self.current(), Token::Semicolon | Token::Eof) {
                return Err(self.unexpected("';' or end of input"));
            }
        }
        Ok(ParseNode::new(Rule::Batch, children))
    }

    fn parse_statement(&mut self) -> Result<ParseNode> {
        let command = match self.current() {
            Token::Identifier(word) => Some(word.to_ascii_uppercase()),
            _ => None,
        };
        if let Some(word) = command {
            return match word.as_str() {
                "SHOW" => self.parse_show(),
                "EXPORT" => self.parse_keys_command(Rule::ExportKeysStatement),
                "ENCRYPT" => self.parse_column_encryption(Rule::EncryptColumnStatement),
                "DECRYPT" => self.parse_column_encryption(Rule::DecryptColumnStatement),
                "REBUILD" => self.parse_opetree_command(Rule::RebuildOpetreeStatement),
                "REBALANCE" => self.parse_opetree_command(Rule::RebalanceOpetreeStatement),
                "SAVE" | "LOAD" => self.parse_snapshot_command(&word),
                "BYPASS" => self.parse_bypass(),
                "LICENSE" => self.parse_license(),
                _ => Err(self.unexpected("a statement")),
            };
        }

        match self.current() {
            Token::Select => self.parse_select(),
            Token::Insert => self.parse_insert(),
            Token::Update if self.is_update_keys() => {
                self.parse_keys_command(Rule::UpdateKeysStatement)
            }
            Token::Update => self.parse_update(),
            Token::Delete => self.parse_delete(),
            Token::Create => self.parse_create(),
            Token::Alter => self.parse_alter_table(),
            Token::Drop => self.parse_drop_table(),
            Token::Use => self.parse_use(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// `UPDATE KEYS ...` unless `KEYS` is a table being updated.
    fn is_update_keys(&self) -> bool {
        self.peek_ahead(1).is_word("KEYS") && self.peek_ahead(2) != &Token::Set
    }

    // =======================================================================
    // SELECT
    // =======================================================================

    fn parse_select(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.expect(&Token::Select)?];
        if let Some(q) = self.accept(&Token::Distinct).or_else(|| self.accept(&Token::All)) {
            children.push(q);
        }
        if self.dialect.supports_top() && self.at_word("TOP") {
            children.push(self.parse_top()?);
        }
        children.push(self.parse_select_list()?);

        if self.at(&Token::From) {
            children.push(self.parse_from_clause()?);
        }
        if let Some(clause) = self.parse_where_clause()? {
            children.push(clause);
        }
        if self.at(&Token::Group) {
            let mut group = vec![self.advance(), self.expect(&Token::By)?];
            group.push(self.parse_expr()?);
            while let Some(comma) = self.accept(&Token::Comma) {
                group.push(comma);
                group.push(self.parse_expr()?);
            }
            children.push(ParseNode::new(Rule::GroupByClause, group));
        }
        if self.at(&Token::Having) {
            let having = vec![self.advance(), self.parse_expr()?];
            children.push(ParseNode::new(Rule::HavingClause, having));
        }
        if self.at(&Token::Order) {
            children.push(self.parse_order_by()?);
        }
        if self.dialect.supports_limit() && self.at(&Token::Limit) {
            children.push(self.parse_limit()?);
        }
        Ok(ParseNode::new(Rule::SelectStatement, children))
    }

    fn parse_top(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance()];
        let parenthesized = self.at(&Token::LeftParen);
        if parenthesized {
            children.push(self.advance());
        }
        children.push(self.parse_row_count()?);
        if parenthesized {
            children.push(self.expect(&Token::RightParen)?);
        }
        if let Some(percent) = self.accept_word("PERCENT") {
            children.push(percent);
        }
        Ok(ParseNode::new(Rule::TopClause, children))
    }

    fn parse_row_count(&mut self) -> Result<ParseNode> {
        match self.current() {
            Token::Number(_) | Token::Placeholder(_) => Ok(self.advance()),
            _ => Err(self.unexpected("a row count")),
        }
    }

    fn parse_select_list(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.parse_select_item()?];
        while let Some(comma) = self.accept(&Token::Comma) {
            children.push(comma);
            children.push(self.parse_select_item()?);
        }
        Ok(ParseNode::new(Rule::SelectList, children))
    }

    fn parse_select_item(&mut self) -> Result<ParseNode> {
        if self.at(&Token::Star) {
            let star = self.advance();
            return Ok(ParseNode::new(
                Rule::SelectItem,
                vec![ParseNode::new(Rule::AllColumns, vec![star])],
            ));
        }
        let mut children = vec![self.parse_expr()?];
        if let Some(alias) = self.parse_optional_alias()? {
            children.push(alias);
        }
        Ok(ParseNode::new(Rule::SelectItem, children))
    }

    fn parse_optional_alias(&mut self) -> Result<Option<ParseNode>> {
        if let Some(as_kw) = self.accept(&Token::As) {
            let name = self.expect_identifier()?;
            return Ok(Some(ParseNode::new(Rule::Alias, vec![as_kw, name])));
        }
        if self.current().is_identifier() {
            let name = self.advance();
            return Ok(Some(ParseNode::new(Rule::Alias, vec![name])));
        }
        Ok(None)
    }

    fn parse_from_clause(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.expect(&Token::From)?];
        children.push(self.parse_table_source()?);
        while let Some(comma) = self.accept(&Token::Comma) {
            children.push(comma);
            children.push(self.parse_table_source()?);
        }
        Ok(ParseNode::new(Rule::FromClause, children))
    }

    fn parse_table_source(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.parse_table_primary()?];
        while let Some(join) = self.parse_join()? {
            children.push(join);
        }
        Ok(ParseNode::new(Rule::TableSource, children))
    }

    fn parse_table_primary(&mut self) -> Result<ParseNode> {
        if !self.at(&Token::LeftParen) {
            return self.parse_table_name(true);
        }
        self.nested(|p| {
            let mut children = vec![p.advance()];
            children.push(p.parse_select()?);
            children.push(p.expect(&Token::RightParen)?);
            match p.parse_optional_alias()? {
                Some(alias) => children.push(alias),
                None => return Err(p.error("a derived table needs an alias")),
            }
            Ok(ParseNode::new(Rule::DerivedTable, children))
        })
    }

    fn parse_join(&mut self) -> Result<Option<ParseNode>> {
        let mut children = Vec::new();
        let cross = match self.current() {
            Token::Join => false,
            Token::Inner => {
                children.push(self.advance());
                false
            }
            Token::Left | Token::Right | Token::Full => {
                children.push(self.advance());
                if let Some(outer) = self.accept(&Token::Outer) {
                    children.push(outer);
                }
                false
            }
            Token::Cross => {
                children.push(self.advance());
                true
            }
            _ => return Ok(None),
        };
        children.push(self.expect(&Token::Join)?);
        children.push(self.parse_table_primary()?);
        if !cross {
            let on = vec![self.expect(&Token::On)?, self.parse_expr()?];
            children.push(ParseNode::new(Rule::JoinCondition, on));
        }
        Ok(Some(ParseNode::new(Rule::JoinClause, children)))
    }

    fn parse_where_clause(&mut self) -> Result<Option<ParseNode>> {
        match self.accept(&Token::Where) {
            Some(kw) => {
                let children = vec![kw, self.parse_expr()?];
                Ok(Some(ParseNode::new(Rule::WhereClause, children)))
            }
            None => Ok(None),
        }
    }

    fn parse_order_by(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect(&Token::By)?];
        loop {
            let mut item = vec![self.parse_expr()?];
            if let Some(dir) = self.accept(&Token::Asc).or_else(|| self.accept(&Token::Desc)) {
                item.push(dir);
            }
            children.push(ParseNode::new(Rule::OrderItem, item));
            match self.accept(&Token::Comma) {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        Ok(ParseNode::new(Rule::OrderByClause, children))
    }

    fn parse_limit(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.parse_row_count()?];
        if self.dialect.supports_limit_comma() && self.at(&Token::Comma) {
            children.push(self.advance());
            children.push(self.parse_row_count()?);
        } else if let Some(offset) = self.accept(&Token::Offset) {
            children.push(offset);
            children.push(self.parse_row_count()?);
        }
        Ok(ParseNode::new(Rule::LimitClause, children))
    }

    // =======================================================================
    // Names
    // =======================================================================

    /// `[db.][schema.]table [[AS] alias]`
    fn parse_table_name(&mut self, allow_alias: bool) -> Result<ParseNode> {
        let mut children = vec![self.expect_identifier()?];
        while self.at(&Token::Dot) && children.len() < 5 {
            children.push(self.advance());
            children.push(self.expect_identifier()?);
        }
        if allow_alias {
            if let Some(alias) = self.parse_optional_alias()? {
                children.push(alias);
            }
        }
        Ok(ParseNode::new(Rule::TableName, children))
    }

    /// A dotted column name, or `qualifier.*` when `allow_star` is set.
    fn parse_column_ref(&mut self, allow_star: bool) -> Result<ParseNode> {
        let mut children = vec![self.expect_identifier()?];
        while self.at(&Token::Dot) {
            children.push(self.advance());
            if allow_star && self.at(&Token::Star) {
                children.push(self.advance());
                return Ok(ParseNode::new(Rule::AllColumns, children));
            }
            children.push(self.expect_identifier()?);
        }
        Ok(ParseNode::new(Rule::ColumnName, children))
    }

    fn parse_column_list(&mut self, allow_direction: bool) -> Result<ParseNode> {
        self.parenthesized(Rule::ColumnList, |p| {
            let column = p.parse_column_ref(false)?;
            if !allow_direction {
                return Ok(column);
            }
            let mut children = vec![column];
            children.extend(p.accept(&Token::Asc).or_else(|| p.accept(&Token::Desc)));
            Ok(ParseNode::new(Rule::IndexColumn, children))
        })
    }

    // =======================================================================
    // DML
    // =======================================================================

    fn parse_insert(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance()];
        if let Some(into) = self.accept(&Token::Into) {
            children.push(into);
        }
        children.push(self.parse_table_name(false)?);
        if self.at(&Token::LeftParen) {
            children.push(self.parse_column_list(false)?);
        }
        if self.at(&Token::Select) {
            children.push(self.parse_select()?);
            return Ok(ParseNode::new(Rule::InsertStatement, children));
        }

        let mut values = vec![self.expect(&Token::Values)?];
        values.push(self.parse_value_row()?);
        while let Some(comma) = self.accept(&Token::Comma) {
            values.push(comma);
            values.push(self.parse_value_row()?);
        }
        children.push(ParseNode::new(Rule::ValuesClause, values));
        Ok(ParseNode::new(Rule::InsertStatement, children))
    }

    fn parse_value_row(&mut self) -> Result<ParseNode> {
        self.parenthesized(Rule::ValueRow, |p| p.parse_expr())
    }

    fn parse_update(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.parse_table_name(true)?];
        children.push(self.expect(&Token::Set)?);
        loop {
            let column = self.parse_column_ref(false)?;
            let eq = self.expect(&Token::Eq)?;
            let value = self.parse_expr()?;
            children.push(ParseNode::new(Rule::Assignment, vec![column, eq, value]));
            match self.accept(&Token::Comma) {
                Some(comma) => children.push(comma),
                None => break,
            }
        }
        if let Some(clause) = self.parse_where_clause()? {
            children.push(clause);
        }
        Ok(ParseNode::new(Rule::UpdateStatement, children))
    }

    fn parse_delete(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance()];
        if let Some(from) = self.accept(&Token::From) {
            children.push(from);
        }
        children.push(self.parse_table_name(true)?);
        if let Some(clause) = self.parse_where_clause()? {
            children.push(clause);
        }
        Ok(ParseNode::new(Rule::DeleteStatement, children))
    }

    // =======================================================================
    // DDL
    // =======================================================================

    fn parse_create(&mut self) -> Result<ParseNode> {
        let create = self.advance();
        match self.current() {
            Token::Table => self.parse_create_table(create),
            Token::Unique | Token::Index => self.parse_create_index(create),
            _ => Err(self.unexpected("TABLE or INDEX")),
        }
    }

    fn parse_create_table(&mut self, create: ParseNode) -> Result<ParseNode> {
        let mut children = vec![create, self.advance()];
        if self.at(&Token::If) {
            children.push(self.advance());
            children.push(self.expect(&Token::Not)?);
            children.push(self.expect(&Token::Exists)?);
        }
        children.push(self.parse_table_name(false)?);
        children.push(self.parenthesized(Rule::TableElementList, |p| p.parse_table_element())?);
        Ok(ParseNode::new(Rule::CreateTableStatement, children))
    }

    fn parse_table_element(&mut self) -> Result<ParseNode> {
        let mut prefix = Vec::new();
        if let Some(constraint) = self.accept_word("CONSTRAINT") {
            prefix.push(constraint);
            prefix.push(self.expect_identifier()?);
        }
        match self.current() {
            Token::Primary => {
                prefix.push(self.advance());
                prefix.push(self.expect(&Token::Key)?);
                prefix.push(self.parse_column_list(true)?);
                Ok(ParseNode::new(Rule::TablePrimaryKey, prefix))
            }
            Token::Unique => {
                prefix.push(self.advance());
                if let Some(key) = self.accept(&Token::Key).or_else(|| self.accept(&Token::Index)) {
                    prefix.push(key);
                }
                prefix.push(self.parse_column_list(true)?);
                Ok(ParseNode::new(Rule::TableUnique, prefix))
            }
            _ if prefix.is_empty() => self.parse_column_definition(None),
            _ => Err(self.unexpected("PRIMARY KEY or UNIQUE")),
        }
    }

    /// `name [TYPE] data_type constraint*`. When `name` is given it has
    /// already been consumed by the caller.
    fn parse_column_definition(&mut self, name: Option<ParseNode>) -> Result<ParseNode> {
        let mut children = vec![match name {
            Some(name) => name,
            None => self.expect_identifier()?,
        }];
        if let Some(type_kw) = self.accept_word("TYPE") {
            children.push(type_kw);
        }
        children.push(self.parse_data_type()?);
        while let Some(constraint) = self.parse_column_constraint()? {
            children.push(constraint);
        }
        Ok(ParseNode::new(Rule::ColumnDefinition, children))
    }

    fn parse_data_type(&mut self) -> Result<ParseNode> {
        let mut children = match self.current() {
            Token::Identifier(_) | Token::Set => vec![self.advance()],
            _ => return Err(self.unexpected("a data type")),
        };
        if let Some(word) = self
            .accept_word("PRECISION")
            .or_else(|| self.accept_word("VARYING"))
        {
            children.push(word);
        }
        let zone_follows =
            self.peek_ahead(1).is_word("TIME") && self.peek_ahead(2).is_word("ZONE");
        if (self.at_word("WITH") || self.at_word("WITHOUT")) && zone_follows {
            for _ in 0..3 {
                children.push(self.advance());
            }
        }
        if self.at(&Token::LeftParen) {
            children.push(self.parenthesized(Rule::TypeArguments, |p| match p.current() {
                Token::Number(_) | Token::String { .. } => Ok(p.advance()),
                _ if p.at_word("MAX") => Ok(p.advance()),
                _ => Err(p.unexpected("a type argument")),
            })?);
        }
        Ok(ParseNode::new(Rule::DataType, children))
    }

    fn parse_column_constraint(&mut self) -> Result<Option<ParseNode>> {
        let node = match self.current() {
            Token::Not => {
                let not = self.advance();
                let null = self.expect(&Token::Null)?;
                ParseNode::new(Rule::NotNullConstraint, vec![not, null])
            }
            Token::Null => ParseNode::new(Rule::NullConstraint, vec![self.advance()]),
            Token::Primary => {
                let primary = self.advance();
                let key = self.expect(&Token::Key)?;
                ParseNode::new(Rule::PrimaryKeyConstraint, vec![primary, key])
            }
            Token::Unique => {
                let mut children = vec![self.advance()];
                if let Some(key) = self.accept(&Token::Key) {
                    children.push(key);
                }
                ParseNode::new(Rule::UniqueConstraint, children)
            }
            Token::Default => {
                let default = self.advance();
                let value = self.parse_unary()?;
                ParseNode::new(Rule::DefaultConstraint, vec![default, value])
            }
            _ if self.at_word("AUTO_INCREMENT") || self.at_word("AUTOINCREMENT") => {
                ParseNode::new(Rule::AutoIncrementConstraint, vec![self.advance()])
            }
            _ if self.at_word("IDENTITY") => {
                let mut children = vec![self.advance()];
                if self.at(&Token::LeftParen) {
                    children.push(self.parenthesized(Rule::TypeArguments, |p| {
                        match p.current() {
                            Token::Number(_) => Ok(p.advance()),
                            _ => Err(p.unexpected("a number")),
                        }
                    })?);
                }
                ParseNode::new(Rule::AutoIncrementConstraint, children)
            }
            _ if self.at_word("ENCRYPTED") => {
                let mut children = vec![self.advance()];
                if let Some(for_kw) = self.accept_word("FOR") {
                    children.push(for_kw);
                    children.push(self.parse_flag_list()?);
                }
                ParseNode::new(Rule::EncryptionOption, children)
            }
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    fn parse_flag_list(&mut self) -> Result<ParseNode> {
        self.parenthesized(Rule::FlagList, |p| p.expect_identifier())
    }

    fn parse_alter_table(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect(&Token::Table)?];
        children.push(self.parse_table_name(false)?);

        let mut action = Vec::new();
        if let Some(modify) = self.accept_word("MODIFY") {
            action.push(modify);
            if let Some(column) = self.accept(&Token::Column) {
                action.push(column);
            }
            action.push(self.parse_column_definition(None)?);
        } else if self.at(&Token::Alter) {
            action.push(self.advance());
            if let Some(column) = self.accept(&Token::Column) {
                action.push(column);
            }
            let name = self.expect_identifier()?;
            action.push(self.parse_column_definition(Some(name))?);
        } else if self.at_word("ADD") || self.at(&Token::Drop) || self.at_word("RENAME") {
            action.push(self.parse_unsupported_clause());
        } else {
            return Err(self.unexpected("MODIFY or ALTER COLUMN"));
        }
        children.push(ParseNode::new(Rule::AlterAction, action));
        Ok(ParseNode::new(Rule::AlterTableStatement, children))
    }

    /// Consume everything up to the end of the statement.
    fn parse_unsupported_clause(&mut self) -> ParseNode {
        let mut children = Vec::new();
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            children.push(self.advance());
        }
        ParseNode::new(Rule::UnsupportedClause, children)
    }

    fn parse_drop_table(&mut self) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect(&Token::Table)?];
        if self.at(&Token::If) {
            children.push(self.advance());
            children.push(self.expect(&Token::Exists)?);
        }
        children.push(self.parse_table_name(false)?);
        Ok(ParseNode::new(Rule::DropTableStatement, children))
    }

    fn parse_create_index(&mut self, create: ParseNode) -> Result<ParseNode> {
        let mut children = vec![create];
        if let Some(unique) = self.accept(&Token::Unique) {
            children.push(unique);
        }
        children.push(self.expect(&Token::Index)?);
        let name = self.expect_identifier()?;
        children.push(ParseNode::new(Rule::IndexName, vec![name]));
        children.push(self.expect(&Token::On)?);
        children.push(self.parse_table_name(false)?);
        children.push(self.parse_column_list(true)?);
        Ok(ParseNode::new(Rule::CreateIndexStatement, children))
    }

    fn parse_use(&mut self) -> Result<ParseNode> {
        let use_kw = self.advance();
        let name = self.expect_identifier()?;
        let database = ParseNode::new(Rule::DatabaseName, vec![name]);
        Ok(ParseNode::new(Rule::UseStatement, vec![use_kw, database]))
    }

    fn parse_show(&mut self) -> Result<ParseNode> {
        let show = self.advance();
        if let Some(tables) = self.accept_word("TABLES") {
            let mut children = vec![show, tables];
            if let Some(from) = self.accept(&Token::From).or_else(|| self.accept(&Token::In)) {
                children.push(from);
                let name = self.expect_identifier()?;
                children.push(ParseNode::new(Rule::DatabaseName, vec![name]));
            }
            return Ok(ParseNode::new(Rule::ShowTablesStatement, children));
        }
        if let Some(columns) = self.accept_word("COLUMNS").or_else(|| self.accept_word("FIELDS")) {
            let mut children = vec![show, columns];
            match self.accept(&Token::From).or_else(|| self.accept(&Token::In)) {
                Some(from) => children.push(from),
                None => return Err(self.unexpected("FROM")),
            }
            children.push(self.parse_table_name(false)?);
            return Ok(ParseNode::new(Rule::ShowColumnsStatement, children));
        }
        Err(self.unexpected("TABLES or COLUMNS"))
    }

    // =======================================================================
    // Administrative commands
    // =======================================================================

    fn parse_status_flag(&mut self) -> Option<ParseNode> {
        self.accept_word("STATUS")
            .map(|status| ParseNode::new(Rule::StatusFlag, vec![status]))
    }

    /// `EXPORT KEYS [TO 'uri'] [STATUS]` / `UPDATE KEYS [TO 'uri'] [STATUS]`
    fn parse_keys_command(&mut self, rule: Rule) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect_word("KEYS")?];
        if let Some(to) = self.accept_word("TO") {
            let uri = match self.current() {
                Token::String { .. } => self.advance(),
                _ => return Err(self.unexpected("a destination string")),
            };
            children.push(ParseNode::new(Rule::Destination, vec![to, uri]));
        }
        if let Some(status) = self.parse_status_flag() {
            children.push(status);
        }
        Ok(ParseNode::new(rule, children))
    }

    /// `ENCRYPT COLUMN c [FOR (flags)] [STATUS]`
    fn parse_column_encryption(&mut self, rule: Rule) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect(&Token::Column)?];
        children.push(self.parse_column_ref(false)?);
        if let Some(for_kw) = self.accept_word("FOR") {
            children.push(for_kw);
            children.push(self.parse_flag_list()?);
        }
        if let Some(status) = self.parse_status_flag() {
            children.push(status);
        }
        Ok(ParseNode::new(rule, children))
    }

    /// `REBUILD OPETREE [WITH (seed, ...)] [STOP ...]`
    fn parse_opetree_command(&mut self, rule: Rule) -> Result<ParseNode> {
        let mut children = vec![self.advance(), self.expect_word("OPETREE")?];
        if let Some(with) = self.accept_word("WITH") {
            let values = self.parenthesized(Rule::ExpressionList, |p| p.parse_unary())?;
            children.push(ParseNode::new(Rule::SeedList, vec![with, values]));
        }
        if let Some(stop) = self.accept_word("STOP") {
            let mut clause = vec![stop];
            if let Some(immediate) = self.accept_word("IMMEDIATE") {
                clause.push(immediate);
            } else {
                clause.push(self.expect_word("AFTER")?);
                match self.current() {
                    Token::Number(_) => clause.push(self.advance()),
                    _ => return Err(self.unexpected("a duration")),
                }
                let unit = ["SECONDS", "SECOND", "MINUTES", "MINUTE", "HOURS", "HOUR"]
                    .iter()
                    .any(|u| self.at_word(u));
                if !unit {
                    return Err(self.unexpected("SECONDS, MINUTES or HOURS"));
                }
                clause.push(self.advance());
            }
            children.push(ParseNode::new(Rule::StopClause, clause));
        }
        Ok(ParseNode::new(rule, children))
    }

    fn parse_snapshot_command(&mut self, verb: &str) -> Result<ParseNode> {
        let verb_node = self.advance();
        let (object, opetree) = if let Some(o) = self.accept_word("OPETREE") {
            (o, true)
        } else if let Some(s) = self.accept_word("SCHEMA") {
            (s, false)
        } else {
            return Err(self.unexpected("OPETREE or SCHEMA"));
        };
        let rule = match (verb, opetree) {
            ("SAVE", true) => Rule::SaveOpetreeStatement,
            ("SAVE", false) => Rule::SaveSchemaStatement,
            (_, true) => Rule::LoadOpetreeStatement,
            (_, false) => Rule::LoadSchemaStatement,
        };
        Ok(ParseNode::new(rule, vec![verb_node, object]))
    }

    fn parse_bypass(&mut self) -> Result<ParseNode> {
        let bypass = self.advance();
        let inner = self.nested(|p| p.parse_statement())?;
        Ok(ParseNode::new(Rule::BypassStatement, vec![bypass, inner]))
    }

    fn parse_license(&mut self) -> Result<ParseNode> {
        let license = self.advance();
        if let Some(refresh) = self.accept_word("REFRESH") {
            return Ok(ParseNode::new(
                Rule::LicenseRefreshStatement,
                vec![license, refresh],
            ));
        }
        if let Some(status) = self.accept_word("STATUS") {
            return Ok(ParseNode::new(Rule::LicenseStatusStatement, vec![license, status]));
        }
        if let Some(set) = self.accept(&Token::Set) {
            let mut children = vec![license, set, self.expect(&Token::Key)?];
            if let Token::String { .. } = self.current() {
                let key = self.advance();
                children.push(ParseNode::new(Rule::LicenseKey, vec![key]));
            }
            return Ok(ParseNode::new(Rule::LicenseSetKeyStatement, children));
        }
        Err(self.unexpected("REFRESH, SET KEY or STATUS"))
    }

    // =======================================================================
    // Expressions
    // =======================================================================

    pub fn parse_expr(&mut self) -> Result<ParseNode> {
        self.parse_or()
    }

    /// One flat node for a chain of the same operator.
    fn parse_chain(
        &mut self,
        rule: Rule,
        is_operator: fn(&Token) -> bool,
        operand: fn(&mut Self) -> Result<ParseNode>,
    ) -> Result<ParseNode> {
        self.parse_chain_with(rule, is_operator, operand, false)
    }

    /// Like [`Grammar::parse_chain`], for operators that build a left-deep
    /// tree: every operator counts as one nesting level.
    fn parse_left_deep_chain(
        &mut self,
        rule: Rule,
        is_operator: fn(&Token) -> bool,
        operand: fn(&mut Self) -> Result<ParseNode>,
    ) -> Result<ParseNode> {
        self.parse_chain_with(rule, is_operator, operand, true)
    }

    fn parse_chain_with(
        &mut self,
        rule: Rule,
        is_operator: fn(&Token) -> bool,
        operand: fn(&mut Self) -> Result<ParseNode>,
        deepens: bool,
    ) -> Result<ParseNode> {
        let first = operand(self)?;
        if !is_operator(self.current()) {
            return Ok(first);
        }
        let base = self.depth;
        let mut children = vec![first];
        let result = loop {
            if !is_operator(self.current()) {
                break Ok(());
            }
            if deepens {
                if let Err(e) = self.deepen() {
                    break Err(e);
                }
            }
            children.push(self.advance());
            match operand(self) {
                Ok(node) => children.push(node),
                Err(e) => break Err(e),
            }
        };
        self.depth = base;
        result.map(|()| ParseNode::new(rule, children))
    }

    fn parse_or(&mut self) -> Result<ParseNode> {
        self.parse_chain(Rule::OrExpr, |t| t == &Token::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<ParseNode> {
        self.parse_chain(Rule::AndExpr, |t| t == &Token::And, Self::parse_not)
    }

    fn parse_not(&mut self) -> Result<ParseNode> {
        if !self.at(&Token::Not) {
            return self.parse_bitwise();
        }
        self.nested(|p| {
            let not = p.advance();
            let operand = p.parse_not()?;
            Ok(ParseNode::new(Rule::NotExpr, vec![not, operand]))
        })
    }

    fn parse_bitwise(&mut self) -> Result<ParseNode> {
        self.parse_chain(
            Rule::BitwiseExpr,
            |t| matches!(t, Token::Caret | Token::Ampersand | Token::Pipe),
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<ParseNode> {
        let left = self.parse_additive()?;
        match self.current() {
            Token::Eq | Token::NotEq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
                let op = self.advance();
                let right = self.parse_additive()?;
                Ok(ParseNode::new(Rule::ComparisonExpr, vec![left, op, right]))
            }
            Token::Is => {
                let mut children = vec![left, self.advance()];
                if let Some(not) = self.accept(&Token::Not) {
                    children.push(not);
                }
                children.push(self.expect(&Token::Null)?);
                Ok(ParseNode::new(Rule::IsNullExpr, children))
            }
            Token::Not
                if matches!(self.peek_ahead(1), Token::In | Token::Like | Token::Between) =>
            {
                let not = self.advance();
                self.parse_predicate_tail(left, Some(not))
            }
            Token::In | Token::Like | Token::Between => self.parse_predicate_tail(left, None),
            _ => Ok(left),
        }
    }

    fn parse_predicate_tail(
        &mut self,
        left: ParseNode,
        not: Option<ParseNode>,
    ) -> Result<ParseNode> {
        let mut children = vec![left];
        children.extend(not);
        let op = self.advance();
        let rule = match op.token() {
            Some(Token::In) => Rule::InExpr,
            Some(Token::Like) => Rule::LikeExpr,
            _ => Rule::BetweenExpr,
        };
        children.push(op);
        match rule {
            Rule::InExpr if self.peek_ahead(1) == &Token::Select => {
                children.push(self.parse_subquery()?);
            }
            Rule::InExpr => {
                children.push(self.parenthesized(Rule::ExpressionList, |p| p.parse_expr())?);
            }
            Rule::LikeExpr => {
                children.push(self.parse_additive()?);
                if let Some(escape) = self.accept(&Token::Escape) {
                    children.push(escape);
                    children.push(self.parse_additive()?);
                }
            }
            _ => {
                children.push(self.parse_additive()?);
                children.push(self.expect(&Token::And)?);
                children.push(self.parse_additive()?);
            }
        }
        Ok(ParseNode::new(rule, children))
    }

    fn parse_additive(&mut self) -> Result<ParseNode> {
        self.parse_left_deep_chain(
            Rule::AdditiveExpr,
            |t| matches!(t, Token::Plus | Token::Minus),
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<ParseNode> {
        self.parse_left_deep_chain(
            Rule::MultiplicativeExpr,
            |t| matches!(t, Token::Star | Token::Slash | Token::Percent),
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<ParseNode> {
        if !matches!(self.current(), Token::Minus | Token::Plus) {
            return self.parse_primary();
        }
        self.nested(|p| {
            let sign = p.advance();
            let operand = p.parse_unary()?;
            Ok(ParseNode::new(Rule::UnaryExpr, vec![sign, operand]))
        })
    }

    fn parse_subquery(&mut self) -> Result<ParseNode> {
        self.nested(|p| {
            let open = p.expect(&Token::LeftParen)?;
            let select = p.parse_select()?;
            let close = p.expect(&Token::RightParen)?;
            Ok(ParseNode::new(Rule::Subquery, vec![open, select, close]))
        })
    }

    fn parse_primary(&mut self) -> Result<ParseNode> {
        match self.current() {
            Token::LeftParen if self.peek_ahead(1) == &Token::Select => self.parse_subquery(),
            Token::LeftParen => self.nested(|p| {
                let open = p.advance();
                let inner = p.parse_expr()?;
                let close = p.expect(&Token::RightParen)?;
                Ok(ParseNode::new(Rule::ParenExpr, vec![open, inner, close]))
            }),
            Token::Number(_)
            | Token::HexNumber(_)
            | Token::HexString(_)
            | Token::String { .. }
            | Token::Null
            | Token::True
            | Token::False => Ok(ParseNode::new(Rule::Literal, vec![self.advance()])),
            Token::Placeholder(_) => Ok(ParseNode::new(Rule::Placeholder, vec![self.advance()])),
            Token::Identifier(_) if self.peek_ahead(1) == &Token::LeftParen => {
                self.parse_function_call()
            }
            Token::Identifier(name)
                if BARE_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name)) =>
            {
                Ok(ParseNode::new(Rule::FunctionCall, vec![self.advance()]))
            }
            Token::Identifier(_) | Token::QuotedIdentifier(_) => self.parse_column_ref(true),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_function_call(&mut self) -> Result<ParseNode> {
        let name = self.advance();
        self.nested(|p| {
            let mut children = vec![name, p.expect(&Token::LeftParen)?];
            if let Some(distinct) = p.accept(&Token::Distinct) {
                children.push(distinct);
            }
            if p.at(&Token::Star) {
                let star = p.advance();
                children.push(ParseNode::new(Rule::AllColumns, vec![star]));
            } else if !p.at(&Token::RightParen) {
                children.push(p.parse_expr()?);
                while let Some(comma) = p.accept(&Token::Comma) {
                    children.push(comma);
                    children.push(p.parse_expr()?);
                }
            }
            children.push(p.expect(&Token::RightParen)?);
            Ok(ParseNode::new(Rule::FunctionCall, children))
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str, dialect: Dialect) -> ParseNode {
        Grammar::parse(sql, &ParserConfig::new(dialect)).unwrap()
    }

    fn parse_one(sql: &str) -> ParseNode {
        let batch = parse(sql, Dialect::MySql);
        let mut statements = batch.children.into_iter().filter(|c| !c.is_terminal());
        let stmt = statements.next().unwrap();
        assert!(statements.next().is_none());
        stmt
    }

    fn where_expr(stmt: &ParseNode) -> &ParseNode {
        &stmt.child(Rule::WhereClause).unwrap().children[1]
    }

    #[test]
    fn batch_of_statements() {
        let batch = parse("SELECT 1; ; SELECT 2;", Dialect::MySql);
        let rules: Vec<Rule> = batch
            .children
            .iter()
            .filter(|c| !c.is_terminal())
            .map(|c| c.rule)
            .collect();
        assert_eq!(rules, vec![Rule::SelectStatement, Rule::SelectStatement]);
        assert!(parse("", Dialect::MsSql).children.is_empty());
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let stmt = parse_one("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3");
        let expr = where_expr(&stmt);
        assert_eq!(expr.rule, Rule::OrExpr);
        assert_eq!(expr.children[0].rule, Rule::ComparisonExpr);
        assert_eq!(expr.children[2].rule, Rule::AndExpr);
    }

    #[test]
    fn or_chains_stay_flat() {
        let stmt = parse_one("SELECT * FROM t WHERE a = 1 OR b = 2 OR c = 3 OR d = 4");
        let expr = where_expr(&stmt);
        assert_eq!(expr.rule, Rule::OrExpr);
        assert_eq!(expr.expressions().count(), 4);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let stmt = parse_one("SELECT a + b * c FROM t");
        let item = &stmt.child(Rule::SelectList).unwrap().children[0];
        let expr = &item.children[0];
        assert_eq!(expr.rule, Rule::AdditiveExpr);
        assert_eq!(expr.children[2].rule, Rule::MultiplicativeExpr);
    }

    #[test]
    fn not_forms() {
        let stmt = parse_one("SELECT * FROM t WHERE d NOT IN (1, 2) AND NOT e LIKE 'x%'");
        let and = where_expr(&stmt);
        let not_in = &and.children[0];
        assert_eq!(not_in.rule, Rule::InExpr);
        assert!(not_in.has_token(&Token::Not));
        let not_like = &and.children[2];
        assert_eq!(not_like.rule, Rule::NotExpr);
        assert_eq!(not_like.children[1].rule, Rule::LikeExpr);
    }

    #[test]
    fn between_consumes_its_and() {
        let stmt = parse_one("SELECT * FROM t WHERE a BETWEEN 1 AND 5 AND b = 2");
        let and = where_expr(&stmt);
        assert_eq!(and.rule, Rule::AndExpr);
        assert_eq!(and.children[0].rule, Rule::BetweenExpr);
    }

    #[test]
    fn bitwise_is_looser_than_comparison() {
        let stmt = parse_one("SELECT * FROM t WHERE a = 1 & b = 2");
        let expr = where_expr(&stmt);
        assert_eq!(expr.rule, Rule::BitwiseExpr);
        assert_eq!(expr.children[0].rule, Rule::ComparisonExpr);
    }

    #[test]
    fn joins_and_derived_tables() {
        let stmt = parse_one(
            "SELECT * FROM a LEFT OUTER JOIN b ON a.id = b.id CROSS JOIN c, (SELECT 1) AS d",
        );
        let from = stmt.child(Rule::FromClause).unwrap();
        let sources: Vec<&ParseNode> = from.children_with(Rule::TableSource).collect();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].children_with(Rule::JoinClause).count(), 2);
        assert_eq!(sources[1].children[0].rule, Rule::DerivedTable);
    }

    #[test]
    fn derived_table_requires_alias() {
        let err = Grammar::parse("SELECT * FROM (SELECT 1)", &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn top_only_for_mssql() {
        let batch = parse("SELECT TOP 5 a FROM t", Dialect::MsSql);
        assert!(batch.children[0].child(Rule::TopClause).is_some());
        assert!(Grammar::parse("SELECT TOP 5 a FROM t", &ParserConfig::new(Dialect::MySql)).is_err());
    }

    #[test]
    fn limit_forms() {
        let stmt = parse_one("SELECT a FROM t LIMIT 10, 20");
        assert_eq!(stmt.child(Rule::LimitClause).unwrap().children.len(), 4);
        let err = Grammar::parse("SELECT a FROM t LIMIT 1", &ParserConfig::new(Dialect::MsSql));
        assert!(err.is_err());
    }

    #[test]
    fn update_keys_lookahead() {
        assert_eq!(parse_one("UPDATE KEYS STATUS").rule, Rule::UpdateKeysStatement);
        assert_eq!(parse_one("UPDATE keys SET a = 1").rule, Rule::UpdateStatement);
    }

    #[test]
    fn admin_commands() {
        let cases = [
            ("EXPORT KEYS TO 'file:///k' STATUS", Rule::ExportKeysStatement),
            ("ENCRYPT COLUMN t.a FOR (STORE, SEARCH)", Rule::EncryptColumnStatement),
            ("DECRYPT COLUMN a STATUS", Rule::DecryptColumnStatement),
            ("REBUILD OPETREE WITH (1, 'x') STOP AFTER 1.5 HOURS", Rule::RebuildOpetreeStatement),
            ("REBALANCE OPETREE STOP IMMEDIATE", Rule::RebalanceOpetreeStatement),
            ("SAVE OPETREE", Rule::SaveOpetreeStatement),
            ("LOAD SCHEMA", Rule::LoadSchemaStatement),
            ("BYPASS DELETE FROM t", Rule::BypassStatement),
            ("LICENSE SET KEY 'abc'", Rule::LicenseSetKeyStatement),
            ("LICENSE REFRESH", Rule::LicenseRefreshStatement),
        ];
        for (sql, rule) in cases {
            assert_eq!(parse_one(sql).rule, rule, "{sql}");
        }
    }

    #[test]
    fn column_definitions() {
        let stmt = parse_one(
            "CREATE TABLE IF NOT EXISTS t (id INT AUTO_INCREMENT PRIMARY KEY, \
             b DOUBLE PRECISION DEFAULT -1 NOT NULL, c VARCHAR(MAX) ENCRYPTED FOR (STORE), \
             PRIMARY KEY (id))",
        );
        let elements = stmt.child(Rule::TableElementList).unwrap();
        let defs: Vec<&ParseNode> = elements.children_with(Rule::ColumnDefinition).collect();
        assert_eq!(defs.len(), 3);
        assert!(defs[0].child(Rule::AutoIncrementConstraint).is_some());
        assert_eq!(defs[1].child(Rule::DataType).unwrap().terminals().count(), 2);
        assert!(defs[2].child(Rule::EncryptionOption).is_some());
        assert!(elements.child(Rule::TablePrimaryKey).is_some());
    }

    #[test]
    fn index_columns_keep_direction() {
        let stmt = parse_one("CREATE INDEX ix ON t (a DESC, b)");
        let columns: Vec<&ParseNode> = stmt
            .child(Rule::ColumnList)
            .unwrap()
            .children_with(Rule::IndexColumn)
            .collect();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].has_token(&Token::Desc));
        assert_eq!(columns[1].children.len(), 1);
    }

    #[test]
    fn nesting_limit() {
        let mut config = ParserConfig::default();
        config.max_nesting_depth = 8;
        let sql = format!("SELECT {}1{}", "(".repeat(10), ")".repeat(10));
        let err = Grammar::parse(&sql, &config).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds the limit of 8 levels"));
        let ok = format!("SELECT {}1{}", "(".repeat(7), ")".repeat(7));
        assert!(Grammar::parse(&ok, &config).is_ok());
    }

    #[test]
    fn arithmetic_operators_count_as_nesting() {
        let mut config = ParserConfig::default();
        config.max_nesting_depth = 8;
        let terms = |n: usize| vec!["a"; n].join(" - ");

        let err = Grammar::parse(&format!("SELECT {}", terms(10)), &config).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds the limit of 8 levels"));
        assert!(Grammar::parse(&format!("SELECT {}", terms(9)), &config).is_ok());
        assert!(Grammar::parse(&format!("SELECT {} * b * c", terms(8)), &config).is_err());
        assert!(Grammar::parse(&format!("SELECT {} * b", terms(8)), &config).is_ok());

        // Each chain releases its levels once it ends.
        let sql = format!("SELECT {}, {} FROM t WHERE x = {}", terms(9), terms(9), terms(9));
        assert!(Grammar::parse(&sql, &config).is_ok());
    }

    #[test]
    fn logical_chains_do_not_count_as_nesting() {
        let mut config = ParserConfig::default();
        config.max_nesting_depth = 8;
        let sql = format!("SELECT * FROM t WHERE {}", vec!["a = 1"; 50].join(" OR "));
        assert!(Grammar::parse(&sql, &config).is_ok());
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = Grammar::parse("SELECT a FROM\nWHERE", &ParserConfig::default()).unwrap_err();
        assert_eq!(
            err,
            Error::syntax("expected identifier, found keyword WHERE", 2, 1)
        );
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(Grammar::parse("SELECT a FROM t t2 t3", &ParserConfig::default()).is_err());
    }
}
