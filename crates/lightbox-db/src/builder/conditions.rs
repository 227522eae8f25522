//! Shared WHERE condition list for SELECT and UPDATE.

use super::traits::Filter;
use crate::value::Scalar;

/// One WHERE predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// `column op ?` with the value passed as a bound parameter
    Bound {
        column: String,
        op: &'static str,
        value: Scalar,
    },
    /// Complete SQL fragment, inserted verbatim
    Literal(String),
}

/// Ordered WHERE conditions.
///
/// Rendering puts every value-bound predicate before every literal one (each group in the
/// order it was added), so the bound values line up with the `?` placeholders without
/// having to look inside literal fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    predicates: Vec<Predicate>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub(crate) fn push_bound(&mut self, column: &str, op: &'static str, value: Scalar) {
        self.predicates.push(Predicate::Bound {
            column: column.to_string(),
            op,
            value: value.sanitized(),
        });
    }

    pub(crate) fn push_literal(&mut self, fragment: String) {
        self.predicates.push(Predicate::Literal(fragment));
    }

    fn ordered(&self) -> impl Iterator<Item = &Predicate> {
        let bound = self
            .predicates
            .iter()
            .filter(|p| matches!(p, Predicate::Bound { .. }));
        let literal = self
            .predicates
            .iter()
            .filter(|p| matches!(p, Predicate::Literal(_)));
        bound.chain(literal)
    }

    fn join(parts: Vec<String>) -> String {
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    /// `" WHERE a=? AND ..."` (or `""`) plus the bound values in placeholder order.
    pub fn render_where(&self) -> (String, Vec<Scalar>) {
        let mut params = Vec::new();
        let parts = self
            .ordered()
            .map(|p| match p {
                Predicate::Bound { column, op, value } => {
                    params.push(value.clone());
                    format!("{}{}?", column, op)
                }
                Predicate::Literal(sql) => sql.clone(),
            })
            .collect();
        (Self::join(parts), params)
    }

    /// Same clause as [`Conditions::render_where`] with the bound values written inline as
    /// literals (strings quoted, numbers bare). Produces no parameters.
    pub fn render_inline(&self) -> String {
        let parts = self
            .ordered()
            .map(|p| match p {
                Predicate::Bound { column, op, value } => {
                    format!("{}{}{}", column, op, value.to_sql_literal())
                }
                Predicate::Literal(sql) => sql.clone(),
            })
            .collect();
        Self::join(parts)
    }
}

impl Filter for Conditions {
    fn conditions_mut(&mut self) -> &mut Conditions {
        self
    }
}
