use super::assignments::Assignments;
use super::traits::{Assign, RenderedStatement, Renderable};
use crate::error::{DbError, DbResult};

/// INSERT builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertBuilder {
    /// Table name
    table: String,
    /// Column values
    assignments: Assignments,
    /// RETURNING columns
    output_cols: Vec<String>,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Assignments::new(),
            output_cols: Vec::new(),
        }
    }

    /// Return these columns from the inserted row (typically the generated id).
    pub fn output(&mut self, cols: &[&str]) -> &mut Self {
        self.output_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl Assign for InsertBuilder {
    fn assignments_mut(&mut self) -> &mut Assignments {
        &mut self.assignments
    }
}

impl Renderable for InsertBuilder {
    fn render(&self) -> DbResult<RenderedStatement> {
        if self.assignments.is_empty() {
            return Err(DbError::invalid_argument(format!(
                "InsertBuilder: no values to insert into {}",
                self.table
            )));
        }

        let (pairs, params) = self.assignments.render();
        let columns: Vec<&str> = pairs.iter().map(|(c, _)| *c).collect();
        let values: Vec<&str> = pairs.iter().map(|(_, v)| *v).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES({})",
            self.table,
            columns.join(", "),
            values.join(", ")
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
