//! Generic row records.
//!
//! `Database::query` hands rows back as [`Record`]s: an ordered list of column aliases and
//! decoded [`Value`]s. Collaborators read them with the typed getters or serialize them
//! straight to JSON.

use crate::error::{DbError, DbResult};
use crate::value::from_db_bool;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::ser::SerializeMap;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// `NUMERIC`, including `SUM`/`AVG` over integer columns
    Decimal(Decimal),
    Text(String),
    Json(serde_json::Value),
    Uuid(uuid::Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read a boolean, decoding `Y`/`N` text columns through the shared codec.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Text(s) => Some(from_db_bool(s)),
            _ => None,
        }
    }
}

/// One result row, keyed by the rendered column aliases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Later lookups by the same name see the first occurrence.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.fields.push((column.into(), value));
    }

    /// Builder-style [`Record::push`].
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.push(column, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Value at a column position.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.fields.get(idx).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    fn require(&self, column: &str) -> DbResult<&Value> {
        self.get(column)
            .ok_or_else(|| DbError::decode(column, "column not present in row"))
    }

    pub fn get_i64(&self, column: &str) -> DbResult<i64> {
        let v = self.require(column)?;
        v.as_i64()
            .ok_or_else(|| DbError::decode(column, format!("expected integer, got {:?}", v)))
    }

    pub fn get_str(&self, column: &str) -> DbResult<&str> {
        let v = self.require(column)?;
        v.as_str()
            .ok_or_else(|| DbError::decode(column, format!("expected text, got {:?}", v)))
    }

    /// Read a `Y`/`N` (or native boolean) column as `bool`.
    pub fn get_bool(&self, column: &str) -> DbResult<bool> {
        let v = self.require(column)?;
        v.as_bool()
            .ok_or_else(|| DbError::decode(column, format!("expected Y/N flag, got {:?}", v)))
    }

    /// Like [`Record::get_i64`] but `NULL` maps to `None`.
    pub fn get_opt_i64(&self, column: &str) -> DbResult<Option<i64>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            _ => self.get_i64(column).map(Some),
        }
    }

    /// Like [`Record::get_str`] but `NULL` maps to `None`.
    pub fn get_opt_str(&self, column: &str) -> DbResult<Option<&str>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            _ => self.get_str(column).map(Some),
        }
    }

    /// Decode a driver row, column by column.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = decode_column(row, idx, column.name(), column.type_())?;
            record.push(column.name(), value);
        }
        Ok(record)
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn get_opt<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> DbResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| DbError::decode(name, e.to_string()))
}

fn decode_column(row: &Row, idx: usize, name: &str, ty: &Type) -> DbResult<Value> {
    let value = match *ty {
        Type::BOOL => get_opt::<bool>(row, idx, name)?.map(Value::Bool),
        Type::INT2 => get_opt::<i16>(row, idx, name)?.map(|v| Value::Int(i64::from(v))),
        Type::INT4 => get_opt::<i32>(row, idx, name)?.map(|v| Value::Int(i64::from(v))),
        Type::INT8 => get_opt::<i64>(row, idx, name)?.map(Value::Int),
        Type::FLOAT4 => get_opt::<f32>(row, idx, name)?.map(|v| Value::Float(f64::from(v))),
        Type::FLOAT8 => get_opt::<f64>(row, idx, name)?.map(Value::Float),
        Type::NUMERIC => get_opt::<Decimal>(row, idx, name)?.map(Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            get_opt::<String>(row, idx, name)?.map(Value::Text)
        }
        Type::JSON | Type::JSONB => get_opt::<serde_json::Value>(row, idx, name)?.map(Value::Json),
        Type::UUID => get_opt::<uuid::Uuid>(row, idx, name)?.map(Value::Uuid),
        Type::TIMESTAMP => get_opt::<NaiveDateTime>(row, idx, name)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get_opt::<DateTime<Utc>>(row, idx, name)?.map(Value::TimestampTz),
        Type::DATE => get_opt::<NaiveDate>(row, idx, name)?.map(Value::Date),
        Type::BYTEA => get_opt::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
        _ => {
            return Err(DbError::decode(
                name,
                format!("unsupported column type {}; cast it in the field list", ty),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
