//! Expression tree for encsql.
//!
//! An [`Expression`] is an [`ExprKind`] plus an optional alias. Structural
//! equality compares kinds only, so an expression parsed from `a + b` equals
//! one built by hand even though the parsed one carries the alias `"a + b"`.
//!
//! Boolean leaves ([`Comparison`], [`InPredicate`], [`IsNullPredicate`],
//! [`LikePredicate`]) carry their own `not` flag. There is no NOT node:
//! negating a leaf toggles its flag and negating an `And` / `Or` pushes the
//! negation into the leaves (De Morgan). `And` / `Or` themselves only exist
//! between the builder and the CNF normalizer.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ColumnRef, Constant, Identifier, TableRef};

/// A node in the expression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExprKind,
    /// The explicit `AS` alias, or the source text the node was built from.
    pub alias: Option<String>,
}

/// The shape of an [`Expression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Column(ColumnRef),
    Constant(ConstantContainer),
    /// Any function call that is not a recognised aggregate.
    ScalarFunction {
        name: Identifier,
        params: Vec<Expression>,
    },
    Aggregate {
        function: AggregateFunction,
        params: Vec<Expression>,
        distinct: bool,
    },
    Addition(Box<Expression>, Box<Expression>),
    Subtraction(Box<Expression>, Box<Expression>),
    Multiplication(Box<Expression>, Box<Expression>),
    Division(Box<Expression>, Box<Expression>),
    Equals(Comparison),
    GreaterThan(Comparison),
    LessThan(Comparison),
    GreaterThanOrEqual(Comparison),
    LessThanOrEqual(Comparison),
    In(InPredicate),
    IsNull(IsNullPredicate),
    Like(LikePredicate),
    /// `*` or `t.*`.
    AllColumns(Option<TableRef>),
    /// Transient: raw `AND` before CNF normalization.
    And(Box<Expression>, Box<Expression>),
    /// Transient: raw `OR` before CNF normalization.
    Or(Box<Expression>, Box<Expression>),
}

/// Operands of a binary comparison leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub not: bool,
}

/// `column [NOT] IN (c1, c2, ...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InPredicate {
    pub column: ColumnRef,
    pub values: Vec<ConstantContainer>,
    pub not: bool,
}

/// `column IS [NOT] NULL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsNullPredicate {
    pub column: ColumnRef,
    pub not: bool,
}

/// `column [NOT] LIKE pattern [ESCAPE 'c']`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikePredicate {
    pub column: ColumnRef,
    pub pattern: ConstantContainer,
    pub escape: Option<char>,
    pub not: bool,
}

/// Uniform box around a literal so that heterogeneous constants can sit in
/// the same expression list. Compares equal to the bare value it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantContainer(pub Constant);

impl ConstantContainer {
    pub fn new(value: impl Into<Constant>) -> Self {
        ConstantContainer(value.into())
    }

    pub fn value(&self) -> &Constant {
        &self.0
    }

    pub fn into_inner(self) -> Constant {
        self.0
    }
}

impl Deref for ConstantContainer {
    type Target = Constant;

    fn deref(&self) -> &Constant {
        &self.0
    }
}

impl PartialEq<Constant> for ConstantContainer {
    fn eq(&self, other: &Constant) -> bool {
        self.0 == *other
    }
}

impl PartialEq<i64> for ConstantContainer {
    fn eq(&self, other: &i64) -> bool {
        self.0 == Constant::Int(*other)
    }
}

impl PartialEq<&str> for ConstantContainer {
    fn eq(&self, other: &&str) -> bool {
        matches!(&self.0, Constant::String(s) if s == other)
    }
}

impl From<Constant> for ConstantContainer {
    fn from(value: Constant) -> Self {
        ConstantContainer(value)
    }
}

/// Aggregates recognised by name when a function call is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    StdDev,
    LinReg,
}

impl AggregateFunction {
    /// Resolve a function name, case-insensitively.
    pub fn from_name(name: &str) -> Option<AggregateFunction> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "SUM" => Some(AggregateFunction::Sum),
            "COUNT" => Some(AggregateFunction::Count),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            "STDEV" | "STDDEV_SAMP" => Some(AggregateFunction::StdDev),
            "LINREG" => Some(AggregateFunction::LinReg),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::StdDev => "STDEV",
            AggregateFunction::LinReg => "LINREG",
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        self.kind == other.kind
    }
}

impl PartialEq<Constant> for Expression {
    fn eq(&self, other: &Constant) -> bool {
        matches!(&self.kind, ExprKind::Constant(c) if c == other)
    }
}

impl From<ExprKind> for Expression {
    fn from(kind: ExprKind) -> Self {
        Expression::new(kind)
    }
}

impl From<Constant> for Expression {
    fn from(value: Constant) -> Self {
        Expression::constant(value)
    }
}

impl From<ColumnRef> for Expression {
    fn from(column: ColumnRef) -> Self {
        Expression::column(column)
    }
}

fn comparison(left: Expression, right: Expression) -> Comparison {
    Comparison {
        left: Box::new(left),
        right: Box::new(right),
        not: false,
    }
}

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Expression { kind, alias: None }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    // -- constructors -------------------------------------------------------

    pub fn column(column: ColumnRef) -> Self {
        Expression::new(ExprKind::Column(column))
    }

    pub fn constant(value: impl Into<Constant>) -> Self {
        Expression::new(ExprKind::Constant(ConstantContainer(value.into())))
    }

    pub fn all_columns(table: Option<TableRef>) -> Self {
        Expression::new(ExprKind::AllColumns(table))
    }

    pub fn equals(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::Equals(comparison(left, right)))
    }

    pub fn greater_than(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::GreaterThan(comparison(left, right)))
    }

    pub fn less_than(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::LessThan(comparison(left, right)))
    }

    pub fn greater_than_or_equal(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::GreaterThanOrEqual(comparison(left, right)))
    }

    pub fn less_than_or_equal(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::LessThanOrEqual(comparison(left, right)))
    }

    pub fn in_list(column: ColumnRef, values: Vec<Constant>) -> Self {
        Expression::new(ExprKind::In(InPredicate {
            column,
            values: values.into_iter().map(ConstantContainer).collect(),
            not: false,
        }))
    }

    pub fn is_null(column: ColumnRef) -> Self {
        Expression::new(ExprKind::IsNull(IsNullPredicate { column, not: false }))
    }

    pub fn like(column: ColumnRef, pattern: impl Into<Constant>, escape: Option<char>) -> Self {
        Expression::new(ExprKind::Like(LikePredicate {
            column,
            pattern: ConstantContainer(pattern.into()),
            escape,
            not: false,
        }))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::And(Box::new(left), Box::new(right)))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::new(ExprKind::Or(Box::new(left), Box::new(right)))
    }

    /// Builder form of [`Expression::negate`] for boolean leaves.
    pub fn negated(mut self) -> Self {
        if let Some(flag) = self.not_flag_mut() {
            *flag = !*flag;
        }
        self
    }

    // -- classification -----------------------------------------------------

    pub fn is_and(&self) -> bool {
        matches!(self.kind, ExprKind::And(..))
    }

    pub fn is_or(&self) -> bool {
        matches!(self.kind, ExprKind::Or(..))
    }

    /// True for comparison, IN, IS NULL and LIKE nodes.
    pub fn is_boolean_leaf(&self) -> bool {
        self.not_flag().is_some()
    }

    /// True when every node reachable through `And` / `Or` is a boolean leaf.
    pub fn is_predicate(&self) -> bool {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match &node.kind {
                ExprKind::And(l, r) | ExprKind::Or(l, r) => {
                    stack.push(&**l);
                    stack.push(&**r);
                }
                _ if node.is_boolean_leaf() => {}
                _ => return false,
            }
        }
        true
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match &self.kind {
            ExprKind::Constant(c) => Some(&c.0),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match &self.kind {
            ExprKind::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Stable lower-case name of the node kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Column(_) => "column reference",
            ExprKind::Constant(_) => "constant",
            ExprKind::ScalarFunction { .. } => "function call",
            ExprKind::Aggregate { .. } => "aggregate",
            ExprKind::Addition(..) => "addition",
            ExprKind::Subtraction(..) => "subtraction",
            ExprKind::Multiplication(..) => "multiplication",
            ExprKind::Division(..) => "division",
            ExprKind::Equals(_) => "equality",
            ExprKind::GreaterThan(_) => "greater-than comparison",
            ExprKind::LessThan(_) => "less-than comparison",
            ExprKind::GreaterThanOrEqual(_) => "greater-than-or-equal comparison",
            ExprKind::LessThanOrEqual(_) => "less-than-or-equal comparison",
            ExprKind::In(_) => "IN predicate",
            ExprKind::IsNull(_) => "IS NULL predicate",
            ExprKind::Like(_) => "LIKE predicate",
            ExprKind::AllColumns(_) => "*",
            ExprKind::And(..) => "AND",
            ExprKind::Or(..) => "OR",
        }
    }

    // -- NOT handling -------------------------------------------------------

    pub fn not_flag(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::Equals(c)
            | ExprKind::GreaterThan(c)
            | ExprKind::LessThan(c)
            | ExprKind::GreaterThanOrEqual(c)
            | ExprKind::LessThanOrEqual(c) => Some(c.not),
            ExprKind::In(p) => Some(p.not),
            ExprKind::IsNull(p) => Some(p.not),
            ExprKind::Like(p) => Some(p.not),
            _ => None,
        }
    }

    pub fn not_flag_mut(&mut self) -> Option<&mut bool> {
        match &mut self.kind {
            ExprKind::Equals(c)
            | ExprKind::GreaterThan(c)
            | ExprKind::LessThan(c)
            | ExprKind::GreaterThanOrEqual(c)
            | ExprKind::LessThanOrEqual(c) => Some(&mut c.not),
            ExprKind::In(p) => Some(&mut p.not),
            ExprKind::IsNull(p) => Some(&mut p.not),
            ExprKind::Like(p) => Some(&mut p.not),
            _ => None,
        }
    }

    /// Apply a logical NOT.
    ///
    /// Leaves toggle their flag. `And` / `Or` swap and negate both operands.
    /// Anything that is not a predicate is rejected, and the tree is left
    /// untouched in that case.
    pub fn negate(&mut self) -> Result<()> {
        if !self.is_predicate() {
            return Err(Error::semantic(format!(
                "NOT cannot be applied to a {}",
                self.kind_name()
            )));
        }
        self.negate_predicate();
        Ok(())
    }

    fn negate_predicate(&mut self) {
        if let Some(flag) = self.not_flag_mut() {
            *flag = !*flag;
            return;
        }
        let placeholder = ExprKind::Constant(ConstantContainer(Constant::Null));
        self.kind = match std::mem::replace(&mut self.kind, placeholder) {
            ExprKind::And(mut l, mut r) => {
                l.negate_predicate();
                r.negate_predicate();
                ExprKind::Or(l, r)
            }
            ExprKind::Or(mut l, mut r) => {
                l.negate_predicate();
                r.negate_predicate();
                ExprKind::And(l, r)
            }
            other => other,
        };
    }

    // -- traversal ----------------------------------------------------------

    /// Direct sub-expressions, left to right.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::ScalarFunction { params, .. } | ExprKind::Aggregate { params, .. } => {
                params.iter().collect()
            }
            ExprKind::Addition(l, r)
            | ExprKind::Subtraction(l, r)
            | ExprKind::Multiplication(l, r)
            | ExprKind::Division(l, r)
            | ExprKind::And(l, r)
            | ExprKind::Or(l, r) => vec![&**l, &**r],
            ExprKind::Equals(c)
            | ExprKind::GreaterThan(c)
            | ExprKind::LessThan(c)
            | ExprKind::GreaterThanOrEqual(c)
            | ExprKind::LessThanOrEqual(c) => vec![&*c.left, &*c.right],
            ExprKind::Column(_)
            | ExprKind::Constant(_)
            | ExprKind::In(_)
            | ExprKind::IsNull(_)
            | ExprKind::Like(_)
            | ExprKind::AllColumns(_) => Vec::new(),
        }
    }

    /// Every column referenced anywhere in the tree, in left-to-right order.
    pub fn get_columns(&self) -> Vec<&ColumnRef> {
        let mut columns = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match &node.kind {
                ExprKind::Column(c) => columns.push(c),
                ExprKind::In(p) => columns.push(&p.column),
                ExprKind::IsNull(p) => columns.push(&p.column),
                ExprKind::Like(p) => columns.push(&p.column),
                _ => stack.extend(node.children().into_iter().rev()),
            }
        }
        columns
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_comparison(f: &mut fmt::Formatter<'_>, c: &Comparison, op: &str) -> fmt::Result {
    if c.not {
        write!(f, "NOT {} {op} {}", c.left, c.right)
    } else {
        write!(f, "{} {op} {}", c.left, c.right)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Column(c) => write!(f, "{c}"),
            ExprKind::Constant(c) => write!(f, "{}", c.0),
            ExprKind::ScalarFunction { name, params } => {
                write!(f, "{name}(")?;
                write_list(f, params)?;
                write!(f, ")")
            }
            ExprKind::Aggregate {
                function,
                params,
                distinct,
            } => {
                write!(f, "{}(", function.name())?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                write_list(f, params)?;
                write!(f, ")")
            }
            ExprKind::Addition(l, r) => write!(f, "({l} + {r})"),
            ExprKind::Subtraction(l, r) => write!(f, "({l} - {r})"),
            ExprKind::Multiplication(l, r) => write!(f, "({l} * {r})"),
            ExprKind::Division(l, r) => write!(f, "({l} / {r})"),
            ExprKind::Equals(c) if c.not => write!(f, "{} <> {}", c.left, c.right),
            ExprKind::Equals(c) => write!(f, "{} = {}", c.left, c.right),
            ExprKind::GreaterThan(c) => write_comparison(f, c, ">"),
            ExprKind::LessThan(c) => write_comparison(f, c, "<"),
            ExprKind::GreaterThanOrEqual(c) => write_comparison(f, c, ">="),
            ExprKind::LessThanOrEqual(c) => write_comparison(f, c, "<="),
            ExprKind::In(p) => {
                let not = if p.not { " NOT" } else { "" };
                write!(f, "{}{not} IN (", p.column)?;
                for (i, value) in p.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value.0)?;
                }
                write!(f, ")")
            }
            ExprKind::IsNull(p) if p.not => write!(f, "{} IS NOT NULL", p.column),
            ExprKind::IsNull(p) => write!(f, "{} IS NULL", p.column),
            ExprKind::Like(p) => {
                let not = if p.not { " NOT" } else { "" };
                write!(f, "{}{not} LIKE {}", p.column, p.pattern.0)?;
                if let Some(escape) = p.escape {
                    write!(f, " ESCAPE '{escape}'")?;
                }
                Ok(())
            }
            ExprKind::AllColumns(Some(table)) => write!(f, "{}.*", table.reference_name()),
            ExprKind::AllColumns(None) => write!(f, "*"),
            ExprKind::And(l, r) => write!(f, "({l} AND {r})"),
            ExprKind::Or(l, r) => write!(f, "({l} OR {r})"),
        }
    }
}
