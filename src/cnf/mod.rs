//! Conjunctive normal form for boolean predicates.
//!
//! Every WHERE, HAVING and join condition is rewritten into an AND of ORs of
//! boolean leaves before it is stored in a [`WhereClause`]. The rewrite is the
//! distributive law applied until [`is_cnf`] holds:
//!
//! ```text
//! Or(And(q, r2), r)  =>  And(Or(r, q), Or(r, r2))
//! Or(l, And(q, r2))  =>  And(Or(l, q), Or(l, r2))
//! ```
//!
//! Subtrees are owned, so each rewrite moves `q` and `r2` into their new
//! parents and clones the shared operand once.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{ExprKind, Expression};
use crate::error::{Error, Result};
use crate::types::ColumnRef;

/// An ordered list of boolean leaves joined by OR.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Disjunction {
    pub predicates: Vec<Expression>,
}

impl Disjunction {
    pub fn new(predicates: Vec<Expression>) -> Self {
        Disjunction { predicates }
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.predicates.iter()
    }
}

impl fmt::Display for Disjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " OR ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")
    }
}

/// An ordered list of [`Disjunction`]s joined by AND.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConjunctiveNormalForm {
    pub disjunctions: Vec<Disjunction>,
}

impl ConjunctiveNormalForm {
    pub fn len(&self) -> usize {
        self.disjunctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjunctions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Disjunction> {
        self.disjunctions.iter()
    }

    /// All leaves, clause by clause.
    pub fn predicates(&self) -> impl Iterator<Item = &Expression> {
        self.disjunctions.iter().flat_map(|d| d.predicates.iter())
    }

    pub fn get_columns(&self) -> Vec<&ColumnRef> {
        self.predicates().flat_map(|p| p.get_columns()).collect()
    }
}

impl fmt::Display for ConjunctiveNormalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.disjunctions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// A normalized boolean clause (WHERE, HAVING or ON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub cnf: ConjunctiveNormalForm,
}

impl WhereClause {
    pub fn new(cnf: ConjunctiveNormalForm) -> Self {
        WhereClause { cnf }
    }

    /// Normalize `predicate` without a size bound.
    pub fn from_predicate(predicate: Expression) -> Self {
        WhereClause {
            cnf: normalize(predicate),
        }
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cnf)
    }
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

/// True when no `And` appears below an `Or`.
pub fn is_cnf(expr: &Expression) -> bool {
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match &node.kind {
            ExprKind::Or(l, r) => {
                if l.is_and() || r.is_and() {
                    return false;
                }
                stack.push(&**l);
                stack.push(&**r);
            }
            ExprKind::And(l, r) => {
                stack.push(&**l);
                stack.push(&**r);
            }
            _ => {}
        }
    }
    true
}

type Operands = (Box<Expression>, Box<Expression>);

fn and_operands(expr: Box<Expression>) -> std::result::Result<Operands, Box<Expression>> {
    let Expression { kind, alias } = *expr;
    match kind {
        ExprKind::And(q, r) => Ok((q, r)),
        kind => Err(Box::new(Expression { kind, alias })),
    }
}

fn or_node(left: Box<Expression>, right: Box<Expression>) -> Expression {
    Expression::new(ExprKind::Or(left, right))
}

/// One pass of the distributive law over the whole tree.
pub fn rewrite_step(expr: Expression) -> Expression {
    let Expression { kind, alias } = expr;
    let kind = match kind {
        ExprKind::Or(left, right) => match and_operands(left) {
            Ok((q, r2)) => {
                let first = rewrite_step(or_node(right.clone(), q));
                let second = rewrite_step(or_node(right, r2));
                ExprKind::And(Box::new(first), Box::new(second))
            }
            Err(left) => match and_operands(right) {
                Ok((q, r2)) => {
                    let first = rewrite_step(or_node(left.clone(), q));
                    let second = rewrite_step(or_node(left, r2));
                    ExprKind::And(Box::new(first), Box::new(second))
                }
                Err(right) => ExprKind::Or(
                    Box::new(rewrite_step(*left)),
                    Box::new(rewrite_step(*right)),
                ),
            },
        },
        ExprKind::And(left, right) => ExprKind::And(
            Box::new(rewrite_step(*left)),
            Box::new(rewrite_step(*right)),
        ),
        leaf => leaf,
    };
    Expression { kind, alias }
}

/// Apply [`rewrite_step`] until the tree is in CNF.
pub fn to_cnf(mut expr: Expression) -> Expression {
    let mut passes = 0usize;
    while !is_cnf(&expr) {
        expr = rewrite_step(expr);
        passes += 1;
    }
    if passes > 1 {
        debug!(passes, "CNF rewrite needed more than one pass");
    }
    expr
}

/// Split a CNF tree at its `And` nodes. The input must satisfy [`is_cnf`].
pub fn flatten_to_cnf(expr: Expression) -> ConjunctiveNormalForm {
    let mut disjunctions = Vec::new();
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node.kind {
            ExprKind::And(l, r) => {
                stack.push(*r);
                stack.push(*l);
            }
            kind => disjunctions.push(flatten_to_disjunction(Expression {
                kind,
                alias: node.alias,
            })),
        }
    }
    ConjunctiveNormalForm { disjunctions }
}

/// Collect the leaves of an `Or` chain, left to right.
pub fn flatten_to_disjunction(expr: Expression) -> Disjunction {
    let mut predicates = Vec::new();
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node.kind {
            ExprKind::Or(l, r) => {
                stack.push(*r);
                stack.push(*l);
            }
            kind => {
                debug_assert!(!matches!(kind, ExprKind::And(..)), "And below Or after CNF rewrite");
                predicates.push(Expression {
                    kind,
                    alias: node.alias,
                });
            }
        }
    }
    Disjunction { predicates }
}

/// Rewrite and flatten `expr`.
pub fn normalize(expr: Expression) -> ConjunctiveNormalForm {
    let cnf = flatten_to_cnf(to_cnf(expr));
    debug!(clauses = cnf.len(), "normalized predicate");
    cnf
}

/// Like [`normalize`], but refuses predicates whose CNF would hold more than
/// `max_leaves` leaves. The size is computed before anything is expanded.
pub fn normalize_bounded(expr: Expression, max_leaves: usize) -> Result<ConjunctiveNormalForm> {
    let size = cnf_size(&expr);
    if size.leaves > max_leaves {
        return Err(Error::unsupported(format!(
            "predicate expands to {} terms in conjunctive normal form, the limit is {}",
            size.leaves, max_leaves
        )));
    }
    Ok(normalize(expr))
}

/// Clause and leaf counts of the fully distributed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CnfSize {
    pub clauses: usize,
    pub leaves: usize,
}

/// Size of the CNF that [`normalize`] would produce for `expr`.
pub fn cnf_size(expr: &Expression) -> CnfSize {
    match &expr.kind {
        ExprKind::And(l, r) => {
            let (l, r) = (cnf_size(l), cnf_size(r));
            CnfSize {
                clauses: l.clauses.saturating_add(r.clauses),
                leaves: l.leaves.saturating_add(r.leaves),
            }
        }
        ExprKind::Or(l, r) => {
            let (l, r) = (cnf_size(l), cnf_size(r));
            CnfSize {
                clauses: l.clauses.saturating_mul(r.clauses),
                leaves: l
                    .leaves
                    .saturating_mul(r.clauses)
                    .saturating_add(r.leaves.saturating_mul(l.clauses)),
            }
        }
        _ => CnfSize {
            clauses: 1,
            leaves: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnRef;
    use proptest::prelude::*;

    fn leaf(name: &str) -> Expression {
        Expression::equals(
            Expression::column(ColumnRef::new(name)),
            Expression::constant(1),
        )
    }

    fn names(cnf: &ConjunctiveNormalForm) -> Vec<Vec<String>> {
        cnf.iter()
            .map(|d| d.iter().map(|p| p.get_columns()[0].name.to_string()).collect())
            .collect()
    }

    #[test]
    fn leaves_are_cnf() {
        assert!(is_cnf(&leaf("a")));
        assert!(is_cnf(&Expression::and(leaf("a"), Expression::or(leaf("b"), leaf("c")))));
        assert!(!is_cnf(&Expression::or(leaf("a"), Expression::and(leaf("b"), leaf("c")))));
    }

    #[test]
    fn nested_and_under_or_chain_is_detected() {
        let e = Expression::or(
            leaf("a"),
            Expression::or(leaf("b"), Expression::and(leaf("c"), leaf("d"))),
        );
        assert!(!is_cnf(&e));
    }

    #[test]
    fn distributes_left_and() {
        let e = Expression::or(Expression::and(leaf("q"), leaf("s")), leaf("r"));
        let cnf = normalize(e);
        assert_eq!(names(&cnf), vec![vec!["r", "q"], vec!["r", "s"]]);
    }

    #[test]
    fn distributes_right_and() {
        let e = Expression::or(leaf("l"), Expression::and(leaf("q"), leaf("s")));
        let cnf = normalize(e);
        assert_eq!(names(&cnf), vec![vec!["l", "q"], vec!["l", "s"]]);
    }

    #[test]
    fn conjunction_of_leaves_keeps_order() {
        let e = Expression::and(Expression::and(leaf("a"), leaf("b")), leaf("c"));
        let cnf = normalize(e);
        assert_eq!(names(&cnf), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn both_sides_and_expands_to_four_clauses() {
        let e = Expression::or(
            Expression::and(leaf("a"), leaf("b")),
            Expression::and(leaf("c"), leaf("d")),
        );
        let cnf = normalize(e.clone());
        assert_eq!(cnf.len(), 4);
        assert!(cnf.iter().all(|d| d.len() == 2));
        assert_eq!(cnf_size(&e), CnfSize { clauses: 4, leaves: 8 });
    }

    #[test]
    fn bounded_normalization_rejects_blowup() {
        let mut e = Expression::and(leaf("a0"), leaf("b0"));
        for i in 1..12 {
            e = Expression::or(e, Expression::and(leaf(&format!("a{i}")), leaf(&format!("b{i}"))));
        }
        let err = normalize_bounded(e, 4096).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn where_clause_display() {
        let e = Expression::and(
            Expression::or(leaf("a"), leaf("b")),
            Expression::is_null(ColumnRef::new("c")),
        );
        let clause = WhereClause::from_predicate(e);
        assert_eq!(clause.to_string(), "(a = 1 OR b = 1) AND (c IS NULL)");
        assert!(clause.cnf.predicates().all(|p| p.is_boolean_leaf()));
    }

    fn arb_predicate() -> impl Strategy<Value = Expression> {
        let leaf = (0u8..6, any::<bool>()).prop_map(|(n, not)| {
            let e = Expression::greater_than(
                Expression::column(ColumnRef::new(format!("c{n}"))),
                Expression::constant(i64::from(n)),
            );
            if not {
                e.negated()
            } else {
                e
            }
        });
        leaf.prop_recursive(5, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Expression::and(l, r)),
                (inner.clone(), inner).prop_map(|(l, r)| Expression::or(l, r)),
            ]
        })
    }

    proptest! {
        #[test]
        fn rewriting_reaches_a_fixpoint(e in arb_predicate()) {
            let expected = cnf_size(&e);
            let rewritten = to_cnf(e);
            prop_assert!(is_cnf(&rewritten));
            prop_assert_eq!(rewrite_step(rewritten.clone()), rewritten.clone());

            let cnf = flatten_to_cnf(rewritten);
            prop_assert_eq!(cnf.len(), expected.clauses);
            prop_assert_eq!(cnf.predicates().count(), expected.leaves);
            for d in cnf.iter() {
                prop_assert!(!d.is_empty());
                for p in d.iter() {
                    prop_assert!(p.is_boolean_leaf());
                }
            }
        }
    }
}
