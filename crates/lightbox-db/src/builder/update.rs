use super::assignments::Assignments;
use super::conditions::Conditions;
use super::traits::{Assign, Filter, RenderedStatement, Renderable};
use crate::error::{DbError, DbResult};

/// UPDATE builder.
///
/// Parameters are always the SET values followed by the WHERE values, matching their
/// textual order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBuilder {
    /// Table name
    table: String,
    /// SET entries
    assignments: Assignments,
    /// WHERE conditions
    conditions: Conditions,
    /// RETURNING columns
    output_cols: Vec<String>,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Assignments::new(),
            conditions: Conditions::new(),
            output_cols: Vec::new(),
        }
    }

    /// Return these columns from the updated row(s).
    pub fn output(&mut self, cols: &[&str]) -> &mut Self {
        self.output_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl Assign for UpdateBuilder {
    fn assignments_mut(&mut self) -> &mut Assignments {
        &mut self.assignments
    }
}

impl Filter for UpdateBuilder {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}

impl Renderable for UpdateBuilder {
    fn render(&self) -> DbResult<RenderedStatement> {
        if self.assignments.is_empty() {
            return Err(DbError::invalid_argument(format!(
                "UpdateBuilder: SET clause cannot be empty ({})",
                self.table
            )));
        }

        let (pairs, mut params) = self.assignments.render();
        let set_parts: Vec<String> = pairs
            .iter()
            .map(|(col, expr)| format!("{}={}", col, expr))
            .collect();

        let (where_clause, where_params) = self.conditions.render_where();
        params.extend(where_params);

        let mut sql = format!(
            "UPDATE {} SET {}{}",
            self.table,
            set_parts.join(", "),
            where_clause
        );

        if !self.output_cols.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.output_cols.join(", "));
        }

        Ok(RenderedStatement::new(sql, params))
    }

    fn output_columns(&self) -> &[String] {
        &self.output_cols
    }
}
