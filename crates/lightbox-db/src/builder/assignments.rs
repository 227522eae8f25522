use crate::value::Scalar;

/// Column value for INSERT/UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Assignment {
    /// Parameterized value
    Bound { column: String, value: Scalar },
    /// Raw SQL expression
    Function { column: String, expr: String },
}

/// Ordered column assignments.
///
/// Like [`Conditions`](super::Conditions), bound entries render before raw expressions so
/// the parameter list is simply the bound values in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments {
    items: Vec<Assignment>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn push_bound(&mut self, column: &str, value: Scalar) {
        self.items.push(Assignment::Bound {
            column: column.to_string(),
            value: value.sanitized(),
        });
    }

    pub(crate) fn push_function(&mut self, column: &str, expr: &str) {
        self.items.push(Assignment::Function {
            column: column.to_string(),
            expr: expr.to_string(),
        });
    }

    /// `(column, value expression)` pairs in render order, plus the bound values.
    pub(crate) fn render(&self) -> (Vec<(&str, &str)>, Vec<Scalar>) {
        let mut pairs = Vec::with_capacity(self.items.len());
        let mut params = Vec::new();

        for item in &self.items {
            if let Assignment::Bound { column, value } = item {
                pairs.push((column.as_str(), "?"));
                params.push(value.clone());
            }
        }
        for item in &self.items {
            if let Assignment::Function { column, expr } = item {
                pairs.push((column.as_str(), expr.as_str()));
            }
        }

        (pairs, params)
    }
}
