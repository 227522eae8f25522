use super::assignments::Assignments;
use super::conditions::Conditions;
use crate::error::DbResult;
use crate::value::Scalar;

/// SQL text plus the values for its `?` placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatement {
    sql: String,
    params: Vec<Scalar>,
}

impl RenderedStatement {
    pub fn new(sql: String, params: Vec<Scalar>) -> Self {
        Self { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Scalar] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Scalar>) {
        (self.sql, self.params)
    }
}

/// Anything that renders to a single parameterized statement.
pub trait Renderable {
    /// Render SQL and params. Fails with `DbError::InvalidArgument` on builder misuse.
    fn render(&self) -> DbResult<RenderedStatement>;

    /// Columns named in the statement's returning clause, if any.
    fn output_columns(&self) -> &[String] {
        &[]
    }

    /// Debug helper.
    fn to_sql(&self) -> DbResult<String> {
        self.render().map(|s| s.into_parts().0)
    }
}

/// WHERE-clause capability shared by the SELECT and UPDATE builders.
///
/// Value-bound predicates render first, literal predicates after; see
/// [`Conditions::render_where`].
pub trait Filter {
    fn conditions_mut(&mut self) -> &mut Conditions;

    /// `col=?`. Strings are sanitized, booleans bind `Y`/`N`.
    fn and_eq(&mut self, col: &str, val: impl Into<Scalar>) -> &mut Self {
        self.conditions_mut().push_bound(col, "=", val.into());
        self
    }

    /// `col<>?`.
    fn and_ne(&mut self, col: &str, val: impl Into<Scalar>) -> &mut Self {
        self.conditions_mut().push_bound(col, "<>", val.into());
        self
    }

    /// `col>=?`.
    fn and_gte(&mut self, col: &str, val: i64) -> &mut Self {
        self.conditions_mut().push_bound(col, ">=", Scalar::Int(val));
        self
    }

    /// `col<=?`.
    fn and_lte(&mut self, col: &str, val: i64) -> &mut Self {
        self.conditions_mut().push_bound(col, "<=", Scalar::Int(val));
        self
    }

    /// `col=EXPR`, literal.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    fn and_eq_fn(&mut self, col: &str, expr: &str) -> &mut Self {
        self.conditions_mut().push_literal(format!("{}={}", col, expr));
        self
    }

    /// `col<>EXPR`, literal.
    fn and_ne_fn(&mut self, col: &str, expr: &str) -> &mut Self {
        self.conditions_mut().push_literal(format!("{}<>{}", col, expr));
        self
    }

    /// `col IN (v1, v2, ...)` with every value sanitized and inlined, not bound.
    ///
    /// Meant for server-generated id lists. An empty list matches nothing (`1=0`).
    fn and_in<I>(&mut self, col: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        let literals: Vec<String> = values
            .into_iter()
            .map(|v| v.into().to_sql_literal())
            .collect();
        let fragment = if literals.is_empty() {
            "1=0".to_string()
        } else {
            format!("{} IN ({})", col, literals.join(", "))
        };
        self.conditions_mut().push_literal(fragment);
        self
    }

    /// `col IN (subquery)`, literal.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    fn and_in_subquery(&mut self, col: &str, subquery: &str) -> &mut Self {
        self.conditions_mut()
            .push_literal(format!("{} IN ({})", col, subquery));
        self
    }

    /// `col NOT IN (subquery)`, literal.
    fn and_not_in_subquery(&mut self, col: &str, subquery: &str) -> &mut Self {
        self.conditions_mut()
            .push_literal(format!("{} NOT IN ({})", col, subquery));
        self
    }

    fn and_is_null(&mut self, col: &str) -> &mut Self {
        self.conditions_mut().push_literal(format!("{} IS NULL", col));
        self
    }

    fn and_is_not_null(&mut self, col: &str) -> &mut Self {
        self.conditions_mut()
            .push_literal(format!("{} IS NOT NULL", col));
        self
    }

    // ==================== Option-friendly helpers ====================

    fn and_eq_opt<T: Into<Scalar>>(&mut self, col: &str, val: Option<T>) -> &mut Self {
        if let Some(v) = val {
            self.and_eq(col, v);
        }
        self
    }

    fn and_gte_opt(&mut self, col: &str, val: Option<i64>) -> &mut Self {
        if let Some(v) = val {
            self.and_gte(col, v);
        }
        self
    }

    fn and_lte_opt(&mut self, col: &str, val: Option<i64>) -> &mut Self {
        if let Some(v) = val {
            self.and_lte(col, v);
        }
        self
    }
}

/// Typed column assignments shared by the INSERT and UPDATE builders.
pub trait Assign {
    fn assignments_mut(&mut self) -> &mut Assignments;

    /// Bind a string value (sanitized).
    fn set_str(&mut self, column: &str, value: &str) -> &mut Self {
        self.assignments_mut().push_bound(column, Scalar::from(value));
        self
    }

    /// Bind an integer value.
    fn set_int(&mut self, column: &str, value: i64) -> &mut Self {
        self.assignments_mut().push_bound(column, Scalar::Int(value));
        self
    }

    /// Bind a boolean, stored as `Y`/`N`.
    fn set_bool(&mut self, column: &str, value: bool) -> &mut Self {
        self.assignments_mut().push_bound(column, Scalar::from(value));
        self
    }

    /// Bind any scalar.
    fn set(&mut self, column: &str, value: impl Into<Scalar>) -> &mut Self {
        self.assignments_mut().push_bound(column, value.into());
        self
    }

    /// Skip the column when `None`.
    fn set_opt<T: Into<Scalar>>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// Assign a raw SQL expression.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    fn set_fn(&mut self, column: &str, expr: &str) -> &mut Self {
        self.assignments_mut().push_function(column, expr);
        self
    }
}
