//! # lightbox-db
//!
//! Parameterized SQL statement builders and a transactional database access object.
//!
//! ## Features
//!
//! - **Parameterized by default**: comparison values travel as bound params, never as SQL text
//! - **Unit of work**: every [`Database`] runs inside one transaction, committed or rolled
//!   back on [`Database::close`]
//! - **Windowed pagination**: `limit`/`offset` on a SELECT render a `ROW_NUMBER()` window
//! - **Named data sources**: several logical backends configured from TOML or the environment
//! - **Safe defaults**: SELECT requires fields, INSERT requires values, UPDATE requires SET
//!
//! ## Example
//!
//! ```ignore
//! use lightbox_db::{Assign, Database, DatabaseConfig, Filter, InsertBuilder, SelectBuilder};
//!
//! let config = DatabaseConfig::from_env()?;
//! let mut db = Database::connect_default(&config).await?;
//!
//! // INSERT ... RETURNING id
//! let mut ib = InsertBuilder::new("web_lb_folder");
//! ib.set_str("name", "Holiday").set_bool("is_shared", false).output(&["id"]);
//! let folder_id = db.execute(&ib, true).await?;
//!
//! // Second page of 10, ordered by name
//! let mut qb = SelectBuilder::new();
//! qb.fields(&["id", "name"])
//!     .from("web_lb_folder")
//!     .and_ne("status", "deleted")
//!     .order_by("name")
//!     .paginate(2, 10);
//! let folders = db.query(&qb, None).await?;
//!
//! let committed = db.close().await;
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod placeholder;
pub mod row;
pub mod value;

pub use builder::{
    Assign, Assignments, Conditions, DEFAULT_LIMIT, Filter, InsertBuilder, RenderedStatement,
    Renderable, SelectBuilder, UpdateBuilder,
};
pub use client::GenericClient;
pub use config::{DEFAULT_SOURCE, DataSourceConfig, DatabaseConfig};
pub use database::Database;
pub use error::{ConnectError, DbError, DbResult};
pub use row::{Record, Value};
pub use value::{Scalar, from_db_bool, sanitize, sanitize_bytes, to_db_bool};
