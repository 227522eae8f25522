//! Bind values, the Y/N boolean codec and the string sanitizer.

use bytes::BytesMut;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// Stored form of `true` in boolean columns.
pub const DB_TRUE: &str = "Y";
/// Stored form of `false` in boolean columns.
pub const DB_FALSE: &str = "N";

/// Encode a boolean for a `Y`/`N` column.
///
/// Together with [`from_db_bool`] this is the only place the two-character convention is
/// spelled out.
pub fn to_db_bool(value: bool) -> &'static str {
    if value { DB_TRUE } else { DB_FALSE }
}

/// Decode a `Y`/`N` column value. Anything other than `"Y"` reads as `false`.
pub fn from_db_bool(value: &str) -> bool {
    value == DB_TRUE
}

/// Strip characters that must never reach an inlined SQL string literal.
///
/// Single quotes are removed outright, as are NUL characters (PostgreSQL text cannot hold
/// them). Input without either is returned unchanged.
pub fn sanitize(input: &str) -> String {
    input.chars().filter(|c| *c != '\'' && *c != '\0').collect()
}

/// Like [`sanitize`], for raw bytes of unknown encoding.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD before sanitizing.
pub fn sanitize_bytes(input: &[u8]) -> String {
    sanitize(&String::from_utf8_lossy(input))
}

/// A value bound to a `?` placeholder, or inlined into a literal predicate.
///
/// Booleans have no variant of their own: they are converted to `Text("Y")`/`Text("N")`
/// when the value is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    /// Return the value with string content passed through [`sanitize`].
    pub fn sanitized(self) -> Self {
        match self {
            Scalar::Text(s) => Scalar::Text(sanitize(&s)),
            other => other,
        }
    }

    /// Render as an SQL literal: integers bare, strings sanitized and single-quoted.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Text(s) => format!("'{}'", sanitize(s)),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Int(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<i16> for Scalar {
    fn from(v: i16) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<&String> for Scalar {
    fn from(v: &String) -> Self {
        Scalar::Text(v.clone())
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Text(to_db_bool(v).to_string())
    }
}

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn int_to_sql(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().as_str().to_sql(ty, out),
        _ => Err(format!("cannot bind an integer to a parameter of type {}", ty).into()),
    }
}

// The prepared statement decides the parameter type (an `a=?` against an int4 column is
// int4), so integers adapt their width at encode time instead of forcing int8.
impl ToSql for Scalar {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Scalar::Int(v) => int_to_sql(*v, ty, out),
            Scalar::Text(s) if is_text_type(ty) => s.as_str().to_sql(ty, out),
            Scalar::Text(s) => {
                let v: i64 = s
                    .trim()
                    .parse()
                    .map_err(|_| format!("cannot bind '{}' to a parameter of type {}", s, ty))?;
                int_to_sql(v, ty, out)
            }
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_text_type(ty) || matches!(*ty, Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT8)
    }

    tokio_postgres::types::to_sql_checked!();
}
