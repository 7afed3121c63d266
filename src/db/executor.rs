// src/db/executor.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use sqlx::{postgres::PgRow, Column, PgPool, Postgres, Row as SqlxRow, TypeInfo};

use crate::{
    common::error::AppError,
    db::query::{BoundQuery, SqlValue},
};

// ---
// Row: column name -> scalar, in projection order
// ---

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Int(v) => Some(Decimal::from(*v)),
            Scalar::Float(v) => Decimal::from_f64(*v),
            Scalar::Decimal(v) => Some(*v),
            Scalar::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Decimal(v) => v.trunc().to_i64(),
            Scalar::Float(v) => Some(v.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_none(),
            Scalar::Bool(v) => serializer.serialize_bool(*v),
            Scalar::Int(v) => serializer.serialize_i64(*v),
            Scalar::Float(v) => serializer.serialize_f64(*v),
            // serde-float: decimals leave as JSON numbers, like the rest of the API
            Scalar::Decimal(v) => Serialize::serialize(v, serializer),
            Scalar::Text(v) => serializer.serialize_str(v),
            Scalar::Date(v) => v.serialize(serializer),
            Scalar::Timestamp(v) => v.serialize(serializer),
        }
    }
}

impl From<Decimal> for Scalar {
    fn from(value: Decimal) -> Self {
        Scalar::Decimal(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Scalar::Date(value)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Scalar::Timestamp(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    /// `None` for absent columns and for SQL NULL.
    pub fn decimal(&self, column: &str) -> Option<Decimal> {
        self.get(column).and_then(Scalar::as_decimal)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Scalar::as_str)
    }

    /// Replaces the value in place, or appends the column.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.set(column, value);
        self
    }
}

#[cfg(test)]
impl Row {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// Reading rows back from JSON (the report cache) is lossy on types: dates come back as
// text and decimals as floats. Re-serializing yields the same JSON.

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON scalar")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
        Ok(Scalar::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(i64::try_from(v).map(Scalar::Int).unwrap_or(Scalar::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar::Text(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
        Ok(Scalar::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Scalar, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object of scalars")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut columns = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, Scalar>()? {
            columns.push((name, value));
        }
        Ok(Row { columns })
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

// ---
// Executor: the only way the service reaches the database
// ---

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_all(&self, query: &BoundQuery) -> Result<Vec<Row>, AppError>;

    async fn fetch_optional(&self, query: &BoundQuery) -> Result<Option<Row>, AppError> {
        Ok(self.fetch_all(query).await?.into_iter().next())
    }
}

#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch_all(&self, query: &BoundQuery) -> Result<Vec<Row>, AppError> {
        let mut q = sqlx::query::<Postgres>(&query.sql);
        for param in &query.params {
            q = match &param.value {
                SqlValue::Text(v) => q.bind(v.clone()),
                SqlValue::Int(v) => q.bind(*v),
                SqlValue::Decimal(v) => q.bind(*v),
                SqlValue::Date(v) => q.bind(*v),
                SqlValue::Timestamp(v) => q.bind(*v),
            };
        }

        let rows = q.fetch_all(&self.pool).await.map_err(|e| {
            // Parameter names only; the values may be user input.
            tracing::error!(params = ?query.param_names(), "Query failed: {}", e);
            AppError::QueryFailed(e)
        })?;

        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &PgRow) -> Result<Row, AppError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name().to_uppercase();
        let value: Scalar = match type_name.as_str() {
            "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Scalar::Bool).into(),
            "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(|v| Scalar::Int(v.into())).into(),
            "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(|v| Scalar::Int(v.into())).into(),
            "INT8" => row.try_get::<Option<i64>, _>(idx)?.into(),
            "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|v| Scalar::Float(v.into())).into(),
            "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Scalar::Float).into(),
            "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx)?.into(),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(idx)?.into(),
            "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.into(),
            "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(idx)?.into(),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|v| v.naive_utc())
                .into(),
            _ => {
                return Err(AppError::UnsupportedColumn {
                    column: column.name().to_string(),
                    type_name,
                });
            }
        };
        out.set(column.name(), value);
    }
    Ok(out)
}

// ---
// Test double
// ---

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    type Responder = Box<dyn Fn(&BoundQuery) -> Result<Vec<Row>, AppError> + Send + Sync>;

    /// Records every query and answers with a closure.
    pub struct FakeExecutor {
        responder: Responder,
        seen: Mutex<Vec<BoundQuery>>,
    }

    impl FakeExecutor {
        pub fn new(
            responder: impl Fn(&BoundQuery) -> Result<Vec<Row>, AppError> + Send + Sync + 'static,
        ) -> Self {
            Self { responder: Box::new(responder), seen: Mutex::new(Vec::new()) }
        }

        /// Serves `rows` as a table: `COUNT(*)` queries get the row count, windowed
        /// queries get the slice selected by the `offset` / `pageSize` parameters.
        pub fn table(rows: Vec<Row>) -> Self {
            Self::new(move |q| {
                if q.sql.contains("COUNT(*)") {
                    return Ok(vec![Row::new().with("total", rows.len() as i64)]);
                }
                let offset = q.param("offset").and_then(int_param).unwrap_or(0).max(0) as usize;
                let limit = q.param("pageSize").and_then(int_param).unwrap_or(i64::MAX).max(0) as usize;
                Ok(rows.iter().skip(offset).take(limit).cloned().collect())
            })
        }

        pub fn failing() -> Self {
            Self::new(|_| Err(AppError::QueryFailed(sqlx::Error::PoolTimedOut)))
        }

        pub fn queries(&self) -> Vec<BoundQuery> {
            self.seen.lock().clone()
        }

        pub fn query_count(&self) -> usize {
            self.seen.lock().len()
        }
    }

    fn int_param(value: &SqlValue) -> Option<i64> {
        match value {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn fetch_all(&self, query: &BoundQuery) -> Result<Vec<Row>, AppError> {
            self.seen.lock().push(query.clone());
            (self.responder)(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_serializes_in_projection_order_and_keeps_nulls() {
        let row = Row::new()
            .with("StockCode", "A-100")
            .with("Description", Scalar::Null)
            .with("OnHandCS", 7i64);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"StockCode":"A-100","Description":null,"OnHandCS":7}"#);
    }

    #[test]
    fn decimal_columns_serialize_as_json_numbers() {
        let row = Row::new()
            .with("Value", Decimal::new(11200, 2))
            .with("PricePerPcs", Scalar::Decimal(Decimal::new(-75, 1)));

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Value"], serde_json::json!(112.0));
        assert_eq!(json["PricePerPcs"], serde_json::json!(-7.5));
    }

    #[test]
    fn set_replaces_existing_column() {
        let mut row = Row::new().with("Amount", Decimal::new(100, 0));
        row.set("Amount", Decimal::new(112, 0));
        assert_eq!(row.len(), 1);
        assert_eq!(row.decimal("Amount"), Some(Decimal::new(112, 0)));
    }

    #[test]
    fn json_round_trip_reproduces_the_same_output() {
        let row = Row::new()
            .with("SalesOrder", "000123")
            .with("OrderDate", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .with("LineValue", Decimal::new(1250, 2))
            .with("Branch", Scalar::Null);

        let json = serde_json::to_value(&row).unwrap();
        let back: Row = serde_json::from_value(json.clone()).unwrap();

        assert_eq!(serde_json::to_value(&back).unwrap(), json);
        assert_eq!(back.column_names().collect::<Vec<_>>(), vec!["SalesOrder", "OrderDate", "LineValue", "Branch"]);
    }

    #[test]
    fn decimal_accessor_treats_null_as_absent() {
        let row = Row::new().with("ConvFactAltUom", Scalar::Null).with("QtyOnHand", 3i64);
        assert_eq!(row.decimal("ConvFactAltUom"), None);
        assert_eq!(row.decimal("Missing"), None);
        assert_eq!(row.decimal("QtyOnHand"), Some(Decimal::from(3)));
    }
}
