use super::conditions::Conditions;
use super::traits::{Filter, RenderedStatement, Renderable};
use crate::error::{DbError, DbResult};

/// Page size used when `limit` is never set.
pub const DEFAULT_LIMIT: i64 = 50;

/// SELECT builder.
///
/// With the default window (`limit` 50, `offset` 0) the statement renders flat. Any other
/// window renders a `ROW_NUMBER()` CTE that keeps rows `offset+1 ..= offset+limit` of the
/// sorted result, which needs at least one `order_by`.
///
/// The outer `SELECT * FROM Results_CTE` carries no `ORDER BY`, so the order of rows inside
/// a page is whatever the planner produces (in practice `RowNum` order). Sort again on the
/// caller side if that matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectBuilder {
    fields: Vec<String>,
    sources: Vec<String>,
    sort: Vec<String>,
    group_by: Vec<String>,
    limit: i64,
    offset: i64,
    conditions: Conditions,
}

impl Default for SelectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            sources: Vec::new(),
            sort: Vec::new(),
            group_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            conditions: Conditions::new(),
        }
    }

    /// Append one field expression (`"name"`, `"COUNT(*) AS total"`).
    pub fn field(&mut self, field: &str) -> &mut Self {
        self.fields.push(field.to_string());
        self
    }

    /// Append several field expressions.
    pub fn fields(&mut self, fields: &[&str]) -> &mut Self {
        self.fields.extend(fields.iter().map(|s| s.to_string()));
        self
    }

    /// Append a source. Joins are written out in full:
    /// `"web_lb_folder f INNER JOIN web_lb_folder_user u ON u.folder_id = f.id"`.
    pub fn from(&mut self, source: &str) -> &mut Self {
        self.sources.push(source.to_string());
        self
    }

    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.sort.push(clause.to_string());
        self
    }

    pub fn group_by(&mut self, clause: &str) -> &mut Self {
        self.group_by.push(clause.to_string());
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    pub fn paginate(&mut self, page: i64, per_page: i64) -> &mut Self {
        let p = if page < 1 { 1 } else { page };
        let size = if per_page < 1 { 1 } else { per_page };
        self.limit = size;
        // An out-of-range page saturates here and is rejected by `validate`.
        self.offset = (p - 1).saturating_mul(size);
        self
    }

    /// Whether rendering will use the `ROW_NUMBER()` window.
    pub fn is_windowed(&self) -> bool {
        !(self.limit == DEFAULT_LIMIT && self.offset == 0)
    }

    fn validate(&self) -> DbResult<()> {
        if self.fields.is_empty() {
            return Err(DbError::invalid_argument(
                "SelectBuilder: no fields specified",
            ));
        }
        if self.sources.is_empty() {
            return Err(DbError::invalid_argument(
                "SelectBuilder: no sources specified",
            ));
        }
        if self.is_windowed() {
            if self.sort.is_empty() {
                return Err(DbError::invalid_argument(
                    "SelectBuilder: limit/offset requires at least one sort column",
                ));
            }
            if self.limit < 0 || self.offset < 0 {
                return Err(DbError::invalid_argument(format!(
                    "SelectBuilder: limit ({}) and offset ({}) must not be negative",
                    self.limit, self.offset
                )));
            }
            if self.window_end().is_none() {
                return Err(DbError::invalid_argument(format!(
                    "SelectBuilder: window offset {} + limit {} is out of range",
                    self.offset, self.limit
                )));
            }
        }
        Ok(())
    }

    /// `offset + 1 + limit`, the first row number past the window.
    fn window_end(&self) -> Option<i64> {
        self.offset.checked_add(1)?.checked_add(self.limit)
    }

    fn group_by_clause(&self) -> String {
        if self.group_by.is_empty() {
            String::new()
        } else {
            format!(" GROUP BY {}", self.group_by.join(", "))
        }
    }

    fn build_sql_internal(&self, where_clause: &str) -> String {
        let fields = self.fields.join(", ");
        let sources = self.sources.join(", ");
        let group_by = self.group_by_clause();

        if !self.is_windowed() {
            let mut sql = format!("SELECT {} FROM {}{}{}", fields, sources, where_clause, group_by);
            if !self.sort.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&self.sort.join(", "));
            }
            return sql;
        }

        let first_row = self.offset.saturating_add(1);
        format!(
            ";WITH Results_CTE AS (SELECT {}, ROW_NUMBER() OVER (ORDER BY {}) AS RowNum FROM {}{}{}) \
             SELECT * FROM Results_CTE WHERE RowNum >= ({}) AND RowNum < {} + {}",
            fields,
            self.sort.join(", "),
            sources,
            where_clause,
            group_by,
            first_row,
            first_row,
            self.limit
        )
    }

    /// The statement with every predicate value written inline and no parameters.
    ///
    /// For logs and for pasting into `psql`; execution always goes through
    /// [`Renderable::render`].
    pub fn to_inline_sql(&self) -> DbResult<String> {
        self.validate()?;
        Ok(self.build_sql_internal(&self.conditions.render_inline()))
    }

    /// `SELECT COUNT(*)` over the same sources and predicates, ignoring sort and window.
    pub fn render_count(&self) -> DbResult<RenderedStatement> {
        if self.sources.is_empty() {
            return Err(DbError::invalid_argument(
                "SelectBuilder: no sources specified",
            ));
        }
        let (where_clause, params) = self.conditions.render_where();
        let sources = self.sources.join(", ");
        let sql = if self.group_by.is_empty() {
            format!("SELECT COUNT(*) FROM {}{}", sources, where_clause)
        } else {
            format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {}{}{}) AS t",
                sources,
                where_clause,
                self.group_by_clause()
            )
        };
        Ok(RenderedStatement::new(sql, params))
    }
}

impl Filter for SelectBuilder {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}

impl Renderable for SelectBuilder {
    fn render(&self) -> DbResult<RenderedStatement> {
        self.validate()?;
        let (where_clause, params) = self.conditions.render_where();
        Ok(RenderedStatement::new(
            self.build_sql_internal(&where_clause),
            params,
        ))
    }
}
