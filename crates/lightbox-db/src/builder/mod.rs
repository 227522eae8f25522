//! Structured SQL statement builders.
//!
//! ## Design
//!
//! - SQL is still explicit (strings), but common patterns are structured.
//! - Values are bound through `?` placeholders; raw expressions, `IN` lists and
//!   subqueries are inlined.
//! - Within a clause, bound entries render before inlined ones, so parameter order
//!   is the order the bound values were added.
//! - Safe defaults: SELECT requires fields, INSERT requires values, UPDATE requires SET.

pub mod assignments;
pub mod conditions;
pub mod insert;
pub mod select;
pub mod traits;
pub mod update;

pub use assignments::Assignments;
pub use conditions::Conditions;
pub use insert::InsertBuilder;
pub use select::{DEFAULT_LIMIT, SelectBuilder};
pub use traits::{Assign, Filter, RenderedStatement, Renderable};
pub use update::UpdateBuilder;
