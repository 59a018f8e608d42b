//! Builds the typed AST from the concrete parse tree.
//!
//! One handler per [`Rule`]. Operator rewriting, literal decoding, type and
//! length validation and CNF normalization of every condition happen here;
//! the grammar has only checked shape.

use rust_decimal::Decimal;
use tracing::trace;

use crate::ast::{AggregateFunction, ExprKind, Expression};
use crate::cnf::{self, WhereClause};
use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::query::{
    AlterTableQuery, ColumnDefinition, ColumnEncryptionCommand, CreateIndexQuery,
    CreateTableQuery, DeleteQuery, DropTableQuery, FromSource, GroupBy, IndexColumn,
    InsertQuery, Join, JoinKind, KeysCommand, LicenseKeyCommand, OpetreeCommand, OrderBy, Query,
    RowLimit, SelectQuery, ShowColumnsQuery, ShowTablesQuery, SortDirection, StopCondition,
    StopType, TableSource, UpdateQuery, UseQuery,
};
use crate::sql::cst::{ParseNode, Rule, Terminal};
use crate::sql::dialect::Dialect;
use crate::sql::lexer::Token;
use crate::sql::literal::{decode_hex, decode_number, decode_string, escape_character};
use crate::types::{
    ColumnRef, Constant, DatabaseRef, EncryptionFlags, Identifier, LengthClass, TableRef,
    LENGTH_MAX,
};

pub struct Builder<'a> {
    source: &'a str,
    config: &'a ParserConfig,
}

fn malformed(node: &ParseNode) -> Error {
    Error::semantic(format!("malformed {:?} node", node.rule))
}

/// The `n`th expression child of `node`.
fn operand(node: &ParseNode, n: usize) -> Result<&ParseNode> {
    node.expressions().nth(n).ok_or_else(|| malformed(node))
}

fn identifier(terminal: &Terminal) -> Option<Identifier> {
    match &terminal.token {
        Token::Identifier(name) | Token::QuotedIdentifier(name) => {
            Some(Identifier::new(name.clone()))
        }
        _ => None,
    }
}

/// Identifier terminals directly under `node`, in order.
fn identifiers(node: &ParseNode) -> Vec<Identifier> {
    node.terminals().filter_map(identifier).collect()
}

fn alias_name(node: &ParseNode) -> Result<Identifier> {
    node.child(Rule::Alias)
        .and_then(|alias| identifiers(alias).pop())
        .ok_or_else(|| malformed(node))
}

impl<'a> Builder<'a> {
    pub fn new(source: &'a str, config: &'a ParserConfig) -> Self {
        Builder { source, config }
    }

    fn text(&self, node: &ParseNode) -> &'a str {
        node.text(self.source)
    }

    // =======================================================================
    // Statements
    // =======================================================================

    pub fn build_batch(&self, batch: &ParseNode) -> Result<Vec<Query>> {
        batch
            .children
            .iter()
            .filter(|c| !c.is_terminal())
            .map(|statement| {
                let query = self.build_statement(statement)?;
                trace!(kind = query.kind(), "built statement");
                Ok(query)
            })
            .collect()
    }

    pub fn build_statement(&self, node: &ParseNode) -> Result<Query> {
        match node.rule {
            Rule::SelectStatement => self.build_select(node).map(Query::Select),
            Rule::InsertStatement => self.build_insert(node).map(Query::Insert),
            Rule::UpdateStatement => self.build_update(node).map(Query::Update),
            Rule::DeleteStatement => self.build_delete(node).map(Query::Delete),
            Rule::CreateTableStatement => self.build_create_table(node).map(Query::CreateTable),
            Rule::AlterTableStatement => self.build_alter_table(node).map(Query::AlterTable),
            Rule::DropTableStatement => Ok(Query::DropTable(DropTableQuery {
                table: self.required_table(node)?,
                if_exists: node.has_token(&Token::If),
            })),
            Rule::CreateIndexStatement => self.build_create_index(node).map(Query::CreateIndex),
            Rule::UseStatement => self.build_use(node).map(Query::Use),
            Rule::ShowTablesStatement => Ok(Query::ShowTables(ShowTablesQuery {
                database: node.child(Rule::DatabaseName).map(database_ref).transpose()?,
            })),
            Rule::ShowColumnsStatement => Ok(Query::ShowColumns(ShowColumnsQuery {
                table: self.required_table(node)?,
            })),
            Rule::ExportKeysStatement => self.build_keys_command(node).map(Query::ExportKeys),
            Rule::UpdateKeysStatement => self.build_keys_command(node).map(Query::UpdateKeys),
            Rule::EncryptColumnStatement => {
                self.build_column_encryption(node).map(Query::EncryptColumn)
            }
            Rule::DecryptColumnStatement => {
                self.build_column_encryption(node).map(Query::DecryptColumn)
            }
            Rule::RebuildOpetreeStatement => {
                self.build_opetree_command(node).map(Query::RebuildOpetree)
            }
            Rule::RebalanceOpetreeStatement => {
                self.build_opetree_command(node).map(Query::RebalanceOpetree)
            }
            Rule::SaveOpetreeStatement => Ok(Query::SaveOpetree),
            Rule::LoadOpetreeStatement => Ok(Query::LoadOpetree),
            Rule::SaveSchemaStatement => Ok(Query::SaveSchema),
            Rule::LoadSchemaStatement => Ok(Query::LoadSchema),
            Rule::BypassStatement => self.build_bypass(node),
            Rule::LicenseRefreshStatement => Ok(Query::LicenseRefresh),
            Rule::LicenseStatusStatement => Ok(Query::LicenseStatus),
            Rule::LicenseSetKeyStatement => {
                let key = match node.child(Rule::LicenseKey) {
                    Some(key) => Some(self.string_child(key)?),
                    None => None,
                };
                Ok(Query::LicenseSetKey(LicenseKeyCommand { key }))
            }
            _ => Err(malformed(node)),
        }
    }

    // =======================================================================
    // SELECT
    // =======================================================================

    fn build_select(&self, node: &ParseNode) -> Result<SelectQuery> {
        let mut query = SelectQuery {
            distinct: node.has_token(&Token::Distinct),
            ..SelectQuery::default()
        };
        for child in &node.children {
            match child.rule {
                Rule::TopClause => query.limit = Some(self.build_top(child)?),
                Rule::SelectList => {
                    query.select_expressions = child
                        .children_with(Rule::SelectItem)
                        .map(|item| self.build_select_item(item))
                        .collect::<Result<_>>()?;
                }
                Rule::FromClause => {
                    query.from = child
                        .children_with(Rule::TableSource)
                        .map(|source| self.build_from_source(source))
                        .collect::<Result<_>>()?;
                }
                Rule::WhereClause => {
                    query.where_clause = Some(self.condition(operand(child, 0)?, "WHERE")?);
                }
                Rule::GroupByClause => {
                    let expressions = child
                        .expressions()
                        .map(|e| self.expression(e))
                        .collect::<Result<_>>()?;
                    query.group_by = Some(GroupBy { expressions });
                }
                Rule::HavingClause => {
                    query.having = Some(self.condition(operand(child, 0)?, "HAVING")?);
                }
                Rule::OrderByClause => {
                    query.order_by = child
                        .children_with(Rule::OrderItem)
                        .map(|item| {
                            Ok(OrderBy {
                                expression: self.expression(operand(item, 0)?)?,
                                direction: sort_direction(item),
                            })
                        })
                        .collect::<Result<_>>()?;
                }
                Rule::LimitClause => query.limit = Some(self.build_limit(child)?),
                _ => {}
            }
        }
        Ok(query)
    }

    fn build_select_item(&self, item: &ParseNode) -> Result<Expression> {
        let mut expr = self.expression(operand(item, 0)?)?;
        if item.child(Rule::Alias).is_some() {
            let alias = alias_name(item)?;
            if let ExprKind::Column(column) = &mut expr.kind {
                column.alias = Some(alias.clone());
            }
            expr.alias = Some(alias.as_str().to_string());
        }
        Ok(expr)
    }

    fn build_top(&self, node: &ParseNode) -> Result<RowLimit> {
        if node.has_word("PERCENT") {
            return Err(Error::unsupported("TOP ... PERCENT is not supported"));
        }
        let count = node
            .terminals()
            .find(|t| matches!(t.token, Token::Number(_) | Token::Placeholder(_)))
            .ok_or_else(|| malformed(node))?;
        Ok(RowLimit {
            count: row_count(count)?,
            offset: None,
        })
    }

    fn build_limit(&self, node: &ParseNode) -> Result<RowLimit> {
        let values: Vec<&Terminal> = node
            .terminals()
            .filter(|t| matches!(t.token, Token::Number(_) | Token::Placeholder(_)))
            .collect();
        match values.as_slice() {
            [count] => Ok(RowLimit {
                count: row_count(count)?,
                offset: None,
            }),
            // MySQL `LIMIT offset, count`
            [offset, count] if node.has_token(&Token::Comma) => Ok(RowLimit {
                count: row_count(count)?,
                offset: Some(row_count(offset)?),
            }),
            [count, offset] => Ok(RowLimit {
                count: row_count(count)?,
                offset: Some(row_count(offset)?),
            }),
            _ => Err(malformed(node)),
        }
    }

    fn build_from_source(&self, node: &ParseNode) -> Result<FromSource> {
        let mut children = node.children.iter();
        let source = match children.next() {
            Some(primary) => self.build_table_source(primary)?,
            None => return Err(malformed(node)),
        };
        let joins = children
            .filter(|c| c.rule == Rule::JoinClause)
            .map(|join| self.build_join(join))
            .collect::<Result<_>>()?;
        Ok(FromSource { source, joins })
    }

    fn build_table_source(&self, node: &ParseNode) -> Result<TableSource> {
        match node.rule {
            Rule::TableName => Ok(TableSource::Table(self.table_ref(node)?)),
            Rule::DerivedTable => {
                let select = node
                    .child(Rule::SelectStatement)
                    .ok_or_else(|| malformed(node))?;
                Ok(TableSource::Derived {
                    query: Box::new(self.build_select(select)?),
                    alias: alias_name(node)?,
                })
            }
            _ => Err(malformed(node)),
        }
    }

    fn build_join(&self, node: &ParseNode) -> Result<Join> {
        let kind = if node.has_token(&Token::Cross) {
            JoinKind::Cross
        } else if node.has_token(&Token::Left) {
            JoinKind::Left
        } else if node.has_token(&Token::Right) {
            JoinKind::Right
        } else if node.has_token(&Token::Full) {
            JoinKind::Full
        } else {
            JoinKind::Inner
        };
        let primary = node
            .children
            .iter()
            .find(|c| matches!(c.rule, Rule::TableName | Rule::DerivedTable))
            .ok_or_else(|| malformed(node))?;
        let on = match node.child(Rule::JoinCondition) {
            Some(condition) => Some(self.condition(operand(condition, 0)?, "ON")?),
            None => None,
        };
        Ok(Join {
            kind,
            source: self.build_table_source(primary)?,
            on,
        })
    }

    /// A WHERE / HAVING / ON condition, normalized to CNF.
    fn condition(&self, node: &ParseNode, clause: &str) -> Result<WhereClause> {
        let expr = self.expression(node)?;
        if !expr.is_predicate() {
            return Err(Error::semantic(format!(
                "{clause} expects a condition, found {}",
                expr.kind_name()
            )));
        }
        let cnf = cnf::normalize_bounded(expr, self.config.max_cnf_leaves)?;
        Ok(WhereClause::new(cnf))
    }

    // =======================================================================
    // DML
    // =======================================================================

    fn build_insert(&self, node: &ParseNode) -> Result<InsertQuery> {
        if node.child(Rule::SelectStatement).is_some() {
            return Err(Error::unsupported("INSERT ... SELECT is not supported"));
        }
        let table = self.required_table(node)?;
        let columns = match node.child(Rule::ColumnList) {
            Some(list) => Some(self.column_list(list)?),
            None => None,
        };
        let values_clause = node
            .child(Rule::ValuesClause)
            .ok_or_else(|| malformed(node))?;

        let mut values = Vec::new();
        for (i, row) in values_clause.children_with(Rule::ValueRow).enumerate() {
            let row: Vec<Expression> = row
                .expressions()
                .map(|e| self.expression(e))
                .collect::<Result<_>>()?;
            // Without a column list the first row sets the width.
            let expected = columns
                .as_ref()
                .map(Vec::len)
                .or_else(|| values.first().map(Vec::len));
            if let Some(expected) = expected {
                if row.len() != expected {
                    return Err(Error::semantic(format!(
                        "VALUES row {} has {} values, expected {}",
                        i + 1,
                        row.len(),
                        expected
                    )));
                }
            }
            values.push(row);
        }
        Ok(InsertQuery {
            table,
            columns,
            values,
        })
    }

    fn build_update(&self, node: &ParseNode) -> Result<UpdateQuery> {
        let assignments = node
            .children_with(Rule::Assignment)
            .map(|assignment| {
                let column = assignment
                    .child(Rule::ColumnName)
                    .ok_or_else(|| malformed(assignment))?;
                let value = assignment
                    .children
                    .last()
                    .ok_or_else(|| malformed(assignment))?;
                Ok((self.column_ref(column)?, self.expression(value)?))
            })
            .collect::<Result<_>>()?;
        Ok(UpdateQuery {
            table: self.required_table(node)?,
            assignments,
            where_clause: self.optional_where(node)?,
        })
    }

    fn build_delete(&self, node: &ParseNode) -> Result<DeleteQuery> {
        Ok(DeleteQuery {
            table: self.required_table(node)?,
            where_clause: self.optional_where(node)?,
        })
    }

    fn optional_where(&self, node: &ParseNode) -> Result<Option<WhereClause>> {
        match node.child(Rule::WhereClause) {
            Some(clause) => Ok(Some(self.condition(operand(clause, 0)?, "WHERE")?)),
            None => Ok(None),
        }
    }

    // =======================================================================
    // DDL
    // =======================================================================

    fn build_create_table(&self, node: &ParseNode) -> Result<CreateTableQuery> {
        let elements = node
            .child(Rule::TableElementList)
            .ok_or_else(|| malformed(node))?;

        let mut columns = Vec::new();
        let mut primary_key = Vec::new();
        let mut unique = Vec::new();
        for element in &elements.children {
            match element.rule {
                Rule::ColumnDefinition => columns.push(self.column_definition(element)?),
                Rule::TablePrimaryKey => primary_key.extend(self.element_columns(element)?),
                Rule::TableUnique => {
                    let names = self.element_columns(element)?;
                    if names.len() > 1 {
                        return Err(Error::unsupported(
                            "multi-column UNIQUE constraints are not supported",
                        ));
                    }
                    unique.extend(names);
                }
                _ => {}
            }
        }

        for name in &primary_key {
            let column = find_column(&mut columns, name, "PRIMARY KEY")?;
            column.primary_key = true;
            column.nullable = false;
        }
        for name in &unique {
            find_column(&mut columns, name, "UNIQUE")?.unique = true;
        }

        Ok(CreateTableQuery {
            table: self.required_table(node)?,
            if_not_exists: node.has_token(&Token::If),
            columns,
        })
    }

    fn element_columns(&self, element: &ParseNode) -> Result<Vec<Identifier>> {
        let list = element
            .child(Rule::ColumnList)
            .ok_or_else(|| malformed(element))?;
        Ok(self
            .column_list(list)?
            .into_iter()
            .map(|column| column.name)
            .collect())
    }

    fn column_definition(&self, node: &ParseNode) -> Result<ColumnDefinition> {
        let name = node
            .terminals()
            .find_map(identifier)
            .ok_or_else(|| malformed(node))?;
        let type_node = node.child(Rule::DataType).ok_or_else(|| malformed(node))?;
        let type_name = type_node
            .terminals()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let spec = self.config.dialect.data_type(&type_name).ok_or_else(|| {
            Error::unsupported(format!(
                "unknown data type {} for the {} dialect",
                type_name.to_ascii_uppercase(),
                self.config.dialect
            ))
        })?;

        let mut column = ColumnDefinition::new(name, spec.data_type);
        column.auto_increment = spec.auto_increment;
        if let Some(args) = type_node.child(Rule::TypeArguments) {
            self.apply_type_arguments(&mut column, args)?;
        }

        for constraint in &node.children {
            match constraint.rule {
                Rule::NotNullConstraint => column.nullable = false,
                Rule::NullConstraint => column.nullable = true,
                Rule::PrimaryKeyConstraint => {
                    column.primary_key = true;
                    column.nullable = false;
                }
                Rule::UniqueConstraint => column.unique = true,
                Rule::AutoIncrementConstraint => column.auto_increment = true,
                Rule::DefaultConstraint => {
                    column.default_value = Some(self.expression(operand(constraint, 0)?)?);
                }
                Rule::EncryptionOption => {
                    column.encryption_flags = match constraint.child(Rule::FlagList) {
                        Some(flags) => encryption_flags(flags)?,
                        None => EncryptionFlags::STORE,
                    };
                }
                _ => {}
            }
        }
        Ok(column)
    }

    fn apply_type_arguments(&self, column: &mut ColumnDefinition, args: &ParseNode) -> Result<()> {
        let values: Vec<&Terminal> = args
            .terminals()
            .filter(|t| !matches!(t.token, Token::LeftParen | Token::RightParen | Token::Comma))
            .collect();

        if column.data_type.length_class() == LengthClass::Members {
            for value in values {
                column.enum_values.push(self.string_value(value)?);
            }
            return Ok(());
        }

        let class = column.data_type.length_class();
        match values.as_slice() {
            [length] => column.set_length(length_value(length)?),
            [precision, scale] if class == LengthClass::Precision => {
                column.set_length(length_value(precision)?)?;
                column.scale = Some(length_value(scale)?);
                Ok(())
            }
            _ if class == LengthClass::Fixed => column.set_length(0),
            _ => Err(Error::semantic(format!(
                "type {} of column {} takes a single length",
                column.data_type, column.name
            ))),
        }
    }

    fn build_alter_table(&self, node: &ParseNode) -> Result<AlterTableQuery> {
        let action = node.child(Rule::AlterAction).ok_or_else(|| malformed(node))?;
        if let Some(clause) = action.child(Rule::UnsupportedClause) {
            let word = clause
                .terminals()
                .next()
                .map(|t| t.text.to_ascii_uppercase())
                .unwrap_or_default();
            return Err(Error::unsupported(format!(
                "ALTER TABLE ... {word} is not supported"
            )));
        }
        if action.has_word("MODIFY") && !self.config.dialect.supports_modify_column() {
            return Err(Error::unsupported(format!(
                "MODIFY COLUMN is not supported by the {} dialect",
                self.config.dialect
            )));
        }
        let definition = action
            .child(Rule::ColumnDefinition)
            .ok_or_else(|| malformed(action))?;
        Ok(AlterTableQuery {
            table: self.required_table(node)?,
            column: self.column_definition(definition)?,
        })
    }

    fn build_create_index(&self, node: &ParseNode) -> Result<CreateIndexQuery> {
        let name = node
            .child(Rule::IndexName)
            .and_then(|n| identifiers(n).pop())
            .ok_or_else(|| malformed(node))?;
        let list = node.child(Rule::ColumnList).ok_or_else(|| malformed(node))?;
        Ok(CreateIndexQuery {
            name,
            table: self.required_table(node)?,
            columns: self.index_columns(list)?,
            unique: node.has_token(&Token::Unique),
        })
    }

    fn build_use(&self, node: &ParseNode) -> Result<UseQuery> {
        if !self.config.allow_use_statements {
            return Err(Error::unsupported(
                "USE statements are disabled by configuration",
            ));
        }
        self.config.dialect.check_use()?;
        let database = node
            .child(Rule::DatabaseName)
            .ok_or_else(|| malformed(node))?;
        Ok(UseQuery {
            database: database_ref(database)?,
        })
    }

    // =======================================================================
    // Administrative commands
    // =======================================================================

    fn build_keys_command(&self, node: &ParseNode) -> Result<KeysCommand> {
        let destination = match node.child(Rule::Destination) {
            Some(destination) => Some(self.string_child(destination)?),
            None => None,
        };
        Ok(KeysCommand {
            destination,
            status_check: node.child(Rule::StatusFlag).is_some(),
        })
    }

    fn build_column_encryption(&self, node: &ParseNode) -> Result<ColumnEncryptionCommand> {
        let column = node.child(Rule::ColumnName).ok_or_else(|| malformed(node))?;
        Ok(ColumnEncryptionCommand {
            column: self.column_ref(column)?,
            flags: node.child(Rule::FlagList).map(encryption_flags).transpose()?,
            status_check: node.child(Rule::StatusFlag).is_some(),
        })
    }

    fn build_opetree_command(&self, node: &ParseNode) -> Result<OpetreeCommand> {
        let mut seeds = Vec::new();
        if let Some(list) = node
            .child(Rule::SeedList)
            .and_then(|s| s.child(Rule::ExpressionList))
        {
            for seed in list.expressions() {
                match self.expression(seed)?.kind {
                    ExprKind::Constant(value) => seeds.push(value.into_inner()),
                    _ => {
                        return Err(Error::semantic(format!(
                            "opetree seed {} is not a literal",
                            self.text(seed)
                        )))
                    }
                }
            }
        }
        let stop = node
            .child(Rule::StopClause)
            .map(stop_condition)
            .transpose()?;
        Ok(OpetreeCommand { seeds, stop })
    }

    fn build_bypass(&self, node: &ParseNode) -> Result<Query> {
        let inner = node
            .children
            .iter()
            .find(|c| !c.is_terminal())
            .ok_or_else(|| malformed(node))?;
        let query = self.build_statement(inner)?;
        if !query.is_bypassable() {
            return Err(Error::semantic(format!(
                "{} cannot be bypassed",
                query.kind()
            )));
        }
        Ok(Query::Bypass(Box::new(query)))
    }

    // =======================================================================
    // Names
    // =======================================================================

    fn required_table(&self, node: &ParseNode) -> Result<TableRef> {
        let name = node.child(Rule::TableName).ok_or_else(|| malformed(node))?;
        self.table_ref(name)
    }

    /// `table`, `qualifier.table` or `db.schema.table`. A single qualifier
    /// is the database in MySQL and the schema elsewhere.
    fn table_from_parts(&self, mut parts: Vec<Identifier>) -> Result<TableRef> {
        let name = parts.pop().ok_or_else(|| Error::semantic("empty table name"))?;
        let table = TableRef::new(name);
        match parts.len() {
            0 => Ok(table),
            1 => {
                let qualifier = parts.remove(0);
                if self.config.dialect == Dialect::MySql {
                    Ok(table.with_database(qualifier))
                } else {
                    Ok(table.with_schema(qualifier))
                }
            }
            2 => {
                let schema = parts.remove(1);
                let database = parts.remove(0);
                Ok(table.with_database(database).with_schema(schema))
            }
            _ => Err(Error::semantic(format!(
                "too many qualifiers in table name {}.{}",
                parts
                    .iter()
                    .map(Identifier::as_str)
                    .collect::<Vec<_>>()
                    .join("."),
                table.name
            ))),
        }
    }

    fn table_ref(&self, node: &ParseNode) -> Result<TableRef> {
        let table = self.table_from_parts(identifiers(node))?;
        if node.child(Rule::Alias).is_some() {
            return Ok(table.with_alias(alias_name(node)?));
        }
        Ok(table)
    }

    fn column_ref(&self, node: &ParseNode) -> Result<ColumnRef> {
        let mut parts = identifiers(node);
        let name = parts.pop().ok_or_else(|| malformed(node))?;
        let column = ColumnRef::new(name);
        if parts.is_empty() {
            return Ok(column);
        }
        Ok(column.with_table(self.table_from_parts(parts)?))
    }

    fn column_list(&self, list: &ParseNode) -> Result<Vec<ColumnRef>> {
        Ok(self
            .index_columns(list)?
            .into_iter()
            .map(|c| c.column)
            .collect())
    }

    fn index_columns(&self, list: &ParseNode) -> Result<Vec<IndexColumn>> {
        let mut columns = Vec::new();
        for child in &list.children {
            let (name, direction) = match child.rule {
                Rule::ColumnName => (child, SortDirection::Ascending),
                Rule::IndexColumn => (
                    child.child(Rule::ColumnName).ok_or_else(|| malformed(child))?,
                    sort_direction(child),
                ),
                _ => continue,
            };
            columns.push(IndexColumn {
                column: self.column_ref(name)?,
                direction,
            });
        }
        Ok(columns)
    }

    // =======================================================================
    // Expressions
    // =======================================================================

    /// Build an expression whose alias is the source text it came from.
    pub fn expression(&self, node: &ParseNode) -> Result<Expression> {
        let expr = match node.rule {
            Rule::OrExpr => self.logical_chain(node, Expression::or)?,
            Rule::AndExpr => self.logical_chain(node, Expression::and)?,
            Rule::NotExpr => {
                let mut inner = self.expression(operand(node, 0)?)?;
                inner.negate()?;
                inner
            }
            Rule::BitwiseExpr => {
                let op = node
                    .terminals()
                    .next()
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                return Err(Error::unsupported(format!(
                    "bitwise operator {op} is not supported"
                )));
            }
            Rule::ComparisonExpr => self.comparison(node)?,
            Rule::InExpr => self.in_predicate(node)?,
            Rule::LikeExpr => self.like_predicate(node)?,
            Rule::IsNullExpr => {
                let column = self.column_operand(operand(node, 0)?, "IS NULL")?;
                let expr = Expression::is_null(column);
                if node.has_token(&Token::Not) {
                    expr.negated()
                } else {
                    expr
                }
            }
            Rule::BetweenExpr => self.between(node)?,
            Rule::AdditiveExpr | Rule::MultiplicativeExpr => self.arithmetic_chain(node)?,
            Rule::UnaryExpr => self.unary(node)?,
            Rule::ParenExpr => self.expression(operand(node, 0)?)?,
            Rule::FunctionCall => self.function_call(node)?,
            Rule::Literal => Expression::constant(self.literal(node)?),
            Rule::Placeholder => match node.children.first().and_then(|t| t.token()) {
                Some(Token::Placeholder(label)) => {
                    Expression::constant(Constant::Placeholder(label.clone()))
                }
                _ => return Err(malformed(node)),
            },
            Rule::ColumnName => Expression::column(self.column_ref(node)?),
            Rule::AllColumns => {
                let parts = identifiers(node);
                if parts.is_empty() {
                    Expression::all_columns(None)
                } else {
                    Expression::all_columns(Some(self.table_from_parts(parts)?))
                }
            }
            Rule::Subquery => {
                return Err(Error::unsupported(
                    "subqueries inside expressions are not supported",
                ))
            }
            _ => return Err(malformed(node)),
        };
        Ok(expr.with_alias(self.text(node)))
    }

    /// A value operand: anything but a condition.
    fn value(&self, node: &ParseNode) -> Result<Expression> {
        let expr = self.expression(node)?;
        if expr.is_predicate() {
            return Err(Error::semantic(format!(
                "a condition cannot be used as a value: {}",
                self.text(node)
            )));
        }
        Ok(expr)
    }

    fn column_operand(&self, node: &ParseNode, operator: &str) -> Result<ColumnRef> {
        let expr = self.expression(node)?;
        match expr.kind {
            ExprKind::Column(column) => Ok(column),
            _ => Err(Error::unsupported(format!(
                "the left side of {operator} must be a column, found {}",
                expr.kind_name()
            ))),
        }
    }

    fn constant_operand(&self, node: &ParseNode, context: &str) -> Result<Constant> {
        match self.expression(node)?.kind {
            ExprKind::Constant(value) => Ok(value.into_inner()),
            _ => Err(Error::unsupported(format!(
                "{context} must be a literal, found {}",
                self.text(node)
            ))),
        }
    }

    /// Fold a flat AND / OR chain into a balanced tree.
    fn logical_chain(
        &self,
        node: &ParseNode,
        combine: fn(Expression, Expression) -> Expression,
    ) -> Result<Expression> {
        let mut operands = Vec::new();
        for child in node.expressions() {
            let expr = self.expression(child)?;
            if !expr.is_predicate() {
                return Err(Error::semantic(format!(
                    "AND / OR operands must be conditions, found {}",
                    expr.kind_name()
                )));
            }
            operands.push(expr);
        }
        balanced(operands, combine).ok_or_else(|| malformed(node))
    }

    fn comparison(&self, node: &ParseNode) -> Result<Expression> {
        let left = self.value(operand(node, 0)?)?;
        let right = self.value(operand(node, 1)?)?;
        let op = node.terminals().next().ok_or_else(|| malformed(node))?;
        let expr = match op.token {
            Token::Eq => Expression::equals(left, right),
            Token::NotEq => Expression::equals(left, right).negated(),
            Token::Gt => Expression::greater_than(left, right),
            Token::Lt => Expression::less_than(left, right),
            Token::GtEq => Expression::greater_than_or_equal(left, right),
            Token::LtEq => Expression::less_than_or_equal(left, right),
            _ => return Err(malformed(node)),
        };
        Ok(expr)
    }

    fn in_predicate(&self, node: &ParseNode) -> Result<Expression> {
        let column = self.column_operand(operand(node, 0)?, "IN")?;
        if node.child(Rule::Subquery).is_some() {
            return Err(Error::unsupported("IN (SELECT ...) is not supported"));
        }
        let list = node
            .child(Rule::ExpressionList)
            .ok_or_else(|| malformed(node))?;
        let values = list
            .expressions()
            .map(|v| self.constant_operand(v, "an IN list value"))
            .collect::<Result<Vec<_>>>()?;
        let expr = Expression::in_list(column, values);
        Ok(if node.has_token(&Token::Not) {
            expr.negated()
        } else {
            expr
        })
    }

    fn like_predicate(&self, node: &ParseNode) -> Result<Expression> {
        let column = self.column_operand(operand(node, 0)?, "LIKE")?;
        let pattern = self.constant_operand(operand(node, 1)?, "a LIKE pattern")?;
        let escape = if node.has_token(&Token::Escape) {
            let value = self.constant_operand(operand(node, 2)?, "an ESCAPE character")?;
            Some(escape_character(&value)?)
        } else {
            None
        };
        let expr = Expression::like(column, pattern, escape);
        Ok(if node.has_token(&Token::Not) {
            expr.negated()
        } else {
            expr
        })
    }

    /// `x BETWEEN lo AND hi` is `x >= lo AND x <= hi`; the negated form is
    /// `x < lo OR x > hi`.
    fn between(&self, node: &ParseNode) -> Result<Expression> {
        let subject = self.value(operand(node, 0)?)?;
        let low = self.value(operand(node, 1)?)?;
        let high = self.value(operand(node, 2)?)?;
        if node.has_token(&Token::Not) {
            Ok(Expression::or(
                Expression::less_than(subject.clone(), low),
                Expression::greater_than(subject, high),
            ))
        } else {
            Ok(Expression::and(
                Expression::greater_than_or_equal(subject.clone(), low),
                Expression::less_than_or_equal(subject, high),
            ))
        }
    }

    /// Fold `a op b op c ...` left-associatively.
    fn arithmetic_chain(&self, node: &ParseNode) -> Result<Expression> {
        let first = node.children.first().ok_or_else(|| malformed(node))?;
        let mut acc = self.value(first)?;
        for pair in node.children[1..].chunks(2) {
            let [op, rhs] = pair else {
                return Err(malformed(node));
            };
            let right = Box::new(self.value(rhs)?);
            let left = Box::new(acc);
            let kind = match op.token() {
                Some(Token::Plus) => ExprKind::Addition(left, right),
                Some(Token::Minus) => ExprKind::Subtraction(left, right),
                Some(Token::Star) => ExprKind::Multiplication(left, right),
                Some(Token::Slash) => ExprKind::Division(left, right),
                Some(Token::Percent) => {
                    return Err(Error::unsupported("the modulo operator % is not supported"))
                }
                _ => return Err(malformed(node)),
            };
            acc = Expression::new(kind).with_alias(first.span.join(rhs.span).slice(self.source));
        }
        Ok(acc)
    }

    fn unary(&self, node: &ParseNode) -> Result<Expression> {
        let negative = node.has_token(&Token::Minus);
        let inner = operand(node, 0)?;
        if negative && inner.rule == Rule::Literal {
            if let Some(Token::Number(text)) = inner.children.first().and_then(|t| t.token()) {
                return Ok(Expression::constant(decode_number(text, true)?));
            }
        }
        let expr = self.value(inner)?;
        if !negative {
            return Ok(expr);
        }
        Ok(Expression::new(ExprKind::Subtraction(
            Box::new(Expression::constant(0i64).with_alias("0")),
            Box::new(expr),
        )))
    }

    fn function_call(&self, node: &ParseNode) -> Result<Expression> {
        let name = node
            .terminals()
            .next()
            .map(|t| t.text.clone())
            .ok_or_else(|| malformed(node))?;
        let distinct = node.has_token(&Token::Distinct);
        let params = node
            .expressions()
            .map(|p| self.value(p))
            .collect::<Result<Vec<_>>>()?;

        let function = AggregateFunction::from_name(&name);
        let star = params
            .iter()
            .any(|p| matches!(p.kind, ExprKind::AllColumns(_)));
        if star && function != Some(AggregateFunction::Count) {
            return Err(Error::semantic(format!("{name}(*) is not allowed")));
        }

        match function {
            Some(function) => Ok(Expression::new(ExprKind::Aggregate {
                function,
                params,
                distinct,
            })),
            None if distinct => Err(Error::semantic(format!(
                "DISTINCT is only allowed in aggregate functions, not {name}"
            ))),
            None => Ok(Expression::new(ExprKind::ScalarFunction {
                name: Identifier::new(name),
                params,
            })),
        }
    }

    fn literal(&self, node: &ParseNode) -> Result<Constant> {
        let terminal = node
            .children
            .first()
            .and_then(|c| c.terminal.as_ref())
            .ok_or_else(|| malformed(node))?;
        match &terminal.token {
            Token::Number(text) => decode_number(text, false),
            Token::HexNumber(digits) | Token::HexString(digits) => {
                decode_hex(digits).map(Constant::Binary)
            }
            Token::String { body, kind } => {
                decode_string(body, *kind, self.config.backslash_escapes())
            }
            Token::Null => Ok(Constant::Null),
            Token::True => Ok(Constant::Int(1)),
            Token::False => Ok(Constant::Int(0)),
            _ => Err(malformed(node)),
        }
    }

    // =======================================================================
    // Terminal values
    // =======================================================================

    fn string_value(&self, terminal: &Terminal) -> Result<String> {
        let decoded = match &terminal.token {
            Token::String { body, kind } => {
                decode_string(body, *kind, self.config.backslash_escapes())?
            }
            _ => {
                return Err(Error::semantic(format!(
                    "expected a string literal, found {}",
                    terminal.text
                )))
            }
        };
        match decoded {
            Constant::String(s) => Ok(s),
            other => Err(Error::semantic(format!(
                "expected a string literal, found {}",
                other.type_name()
            ))),
        }
    }

    /// The string terminal directly under `node`.
    fn string_child(&self, node: &ParseNode) -> Result<String> {
        let terminal = node
            .terminals()
            .find(|t| matches!(t.token, Token::String { .. }))
            .ok_or_else(|| malformed(node))?;
        self.string_value(terminal)
    }
}

fn balanced(
    mut operands: Vec<Expression>,
    combine: fn(Expression, Expression) -> Expression,
) -> Option<Expression> {
    match operands.len() {
        0 => None,
        1 => operands.pop(),
        n => {
            let right = operands.split_off(n / 2);
            let left = balanced(operands, combine)?;
            let right = balanced(right, combine)?;
            Some(combine(left, right))
        }
    }
}

fn sort_direction(node: &ParseNode) -> SortDirection {
    if node.has_token(&Token::Desc) {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

fn database_ref(node: &ParseNode) -> Result<DatabaseRef> {
    identifiers(node)
        .pop()
        .map(DatabaseRef::new)
        .ok_or_else(|| malformed(node))
}

fn encryption_flags(list: &ParseNode) -> Result<EncryptionFlags> {
    let mut flags = EncryptionFlags::NONE;
    for name in identifiers(list) {
        flags |= EncryptionFlags::from_name(name.as_str())
            .ok_or_else(|| Error::semantic(format!("unknown encryption flag {name}")))?;
    }
    Ok(flags)
}

fn stop_condition(node: &ParseNode) -> Result<StopCondition> {
    if node.has_word("IMMEDIATE") {
        return Ok(StopCondition {
            stop_type: StopType::Immediate,
            after: None,
        });
    }
    let after = node
        .terminals()
        .find_map(|t| match &t.token {
            Token::Number(text) => Some(text.as_str()),
            _ => None,
        })
        .ok_or_else(|| malformed(node))?;
    let after = match decode_number(after, false)? {
        Constant::Int(n) => Decimal::from(n),
        Constant::Decimal(d) => d,
        _ => return Err(malformed(node)),
    };
    let stop_type = if node.has_word("SECONDS") || node.has_word("SECOND") {
        StopType::Seconds
    } else if node.has_word("MINUTES") || node.has_word("MINUTE") {
        StopType::Minutes
    } else {
        StopType::Hours
    };
    Ok(StopCondition {
        stop_type,
        after: Some(after),
    })
}

fn row_count(terminal: &Terminal) -> Result<u64> {
    match &terminal.token {
        Token::Number(text) => text.parse::<u64>().map_err(|_| {
            Error::semantic(format!("row count must be a whole number, found {text}"))
        }),
        Token::Placeholder(_) => Err(Error::unsupported(
            "placeholders are not supported as row limits",
        )),
        _ => Err(Error::semantic(format!(
            "row count must be a whole number, found {}",
            terminal.text
        ))),
    }
}

fn length_value(terminal: &Terminal) -> Result<i64> {
    match &terminal.token {
        Token::Identifier(word) if word.eq_ignore_ascii_case("MAX") => Ok(LENGTH_MAX),
        Token::Number(text) => text
            .parse::<i64>()
            .map_err(|_| Error::semantic(format!("invalid type length {text}"))),
        _ => Err(Error::semantic(format!(
            "invalid type length {}",
            terminal.text
        ))),
    }
}

fn find_column<'c>(
    columns: &'c mut [ColumnDefinition],
    name: &Identifier,
    constraint: &str,
) -> Result<&'c mut ColumnDefinition> {
    columns
        .iter_mut()
        .find(|c| c.name.eq_ignore_case(name.as_str()))
        .ok_or_else(|| Error::semantic(format!("{constraint} names unknown column {name}")))
}
