//! Concrete parse tree.
//!
//! The grammar produces a tree of [`ParseNode`]s: every node is tagged with
//! the [`Rule`] that matched it, keeps its children in source order and spans
//! the source text it covers. Leaves are [`Rule::Terminal`] nodes carrying the
//! token and its exact text. The builder walks this tree by matching on
//! `Rule`, so no node ever needs to be downcast.

use crate::sql::lexer::{Span, SpannedToken, Token};

/// Grammar productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Batch,

    // statements
    SelectStatement,
    InsertStatement,
    UpdateStatement,
    DeleteStatement,
    CreateTableStatement,
    AlterTableStatement,
    DropTableStatement,
    CreateIndexStatement,
    UseStatement,
    ShowTablesStatement,
    ShowColumnsStatement,
    ExportKeysStatement,
    UpdateKeysStatement,
    EncryptColumnStatement,
    DecryptColumnStatement,
    RebuildOpetreeStatement,
    RebalanceOpetreeStatement,
    SaveOpetreeStatement,
    LoadOpetreeStatement,
    SaveSchemaStatement,
    LoadSchemaStatement,
    BypassStatement,
    LicenseRefreshStatement,
    LicenseSetKeyStatement,
    LicenseStatusStatement,

    // SELECT clauses
    TopClause,
    SelectList,
    SelectItem,
    Alias,
    FromClause,
    TableSource,
    DerivedTable,
    JoinClause,
    JoinCondition,
    WhereClause,
    GroupByClause,
    HavingClause,
    OrderByClause,
    OrderItem,
    LimitClause,

    // names
    TableName,
    ColumnName,
    DatabaseName,
    IndexName,

    // DML
    ColumnList,
    /// A column of an index or key list with its optional ASC / DESC.
    IndexColumn,
    ValuesClause,
    ValueRow,
    Assignment,

    // DDL
    TableElementList,
    ColumnDefinition,
    DataType,
    TypeArguments,
    NotNullConstraint,
    NullConstraint,
    PrimaryKeyConstraint,
    UniqueConstraint,
    DefaultConstraint,
    AutoIncrementConstraint,
    EncryptionOption,
    FlagList,
    TablePrimaryKey,
    TableUnique,
    AlterAction,
    UnsupportedClause,

    // administrative commands
    Destination,
    StatusFlag,
    SeedList,
    StopClause,
    LicenseKey,

    // expressions
    OrExpr,
    AndExpr,
    NotExpr,
    BitwiseExpr,
    ComparisonExpr,
    InExpr,
    LikeExpr,
    IsNullExpr,
    BetweenExpr,
    AdditiveExpr,
    MultiplicativeExpr,
    UnaryExpr,
    ParenExpr,
    FunctionCall,
    Literal,
    Placeholder,
    AllColumns,
    ExpressionList,
    Subquery,

    Terminal,
}

impl Rule {
    /// Productions that stand for a value or condition.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            Rule::OrExpr
                | Rule::AndExpr
                | Rule::NotExpr
                | Rule::BitwiseExpr
                | Rule::ComparisonExpr
                | Rule::InExpr
                | Rule::LikeExpr
                | Rule::IsNullExpr
                | Rule::BetweenExpr
                | Rule::AdditiveExpr
                | Rule::MultiplicativeExpr
                | Rule::UnaryExpr
                | Rule::ParenExpr
                | Rule::FunctionCall
                | Rule::Literal
                | Rule::Placeholder
                | Rule::ColumnName
                | Rule::AllColumns
                | Rule::Subquery
        )
    }
}

/// Token payload of a [`Rule::Terminal`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub token: Token,
    /// Source text exactly as written.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub rule: Rule,
    pub span: Span,
    pub children: Vec<ParseNode>,
    pub terminal: Option<Terminal>,
}

impl ParseNode {
    /// An interior node spanning all of its children.
    pub fn new(rule: Rule, children: Vec<ParseNode>) -> Self {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => first.span.join(last.span),
            _ => Span::default(),
        };
        ParseNode {
            rule,
            span,
            children,
            terminal: None,
        }
    }

    pub fn leaf(token: &SpannedToken, source: &str) -> Self {
        ParseNode {
            rule: Rule::Terminal,
            span: token.span,
            children: Vec::new(),
            terminal: Some(Terminal {
                token: token.token.clone(),
                text: token.span.slice(source).to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rule == Rule::Terminal
    }

    pub fn token(&self) -> Option<&Token> {
        self.terminal.as_ref().map(|t| &t.token)
    }

    /// First child with the given rule.
    pub fn child(&self, rule: Rule) -> Option<&ParseNode> {
        self.children.iter().find(|c| c.rule == rule)
    }

    pub fn children_with(&self, rule: Rule) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter(move |c| c.rule == rule)
    }

    /// Children that are expressions, in order.
    pub fn expressions(&self) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter(|c| c.rule.is_expression())
    }

    /// Terminal children, in order.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.children.iter().filter_map(|c| c.terminal.as_ref())
    }

    /// True if a direct terminal child is `token`.
    pub fn has_token(&self, token: &Token) -> bool {
        self.terminals().any(|t| &t.token == token)
    }

    /// True if a direct terminal child is the unquoted word `word`.
    pub fn has_word(&self, word: &str) -> bool {
        self.terminals().any(|t| t.token.is_word(word))
    }

    /// The source text this node covers.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.slice(source)
    }
}
