// src/db/query.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

// ---
// Bound parameters
// ---

/// A value that travels to the database as a bound parameter, never as query text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

/// A named parameter. The name is only used for logs and tests; binding is positional.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: SqlValue,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

// ---
// Predicates
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub param: Param,
    pub inclusive: bool,
}

/// One condition of a WHERE clause. Column names and subqueries are `&'static str`,
/// so only compile-time text can reach the query; everything else is a `Param`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { column: &'static str, op: CmpOp, param: Param },
    OneOf { column: &'static str, params: Vec<Param> },
    Range { column: &'static str, lower: Option<RangeBound>, upper: Option<RangeBound> },
    /// Case-insensitive pattern match against any of the columns, sharing one parameter.
    MatchesAny { columns: Vec<&'static str>, param: Param },
    NotNull { column: &'static str },
    Exists { subquery: &'static str },
}

impl Predicate {
    pub fn eq(column: &'static str, name: &str, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CmpOp::Eq, name, value)
    }

    pub fn compare(column: &'static str, op: CmpOp, name: &str, value: impl Into<SqlValue>) -> Self {
        Predicate::Compare { column, op, param: Param::new(name, value) }
    }

    pub fn one_of<V: Into<SqlValue>>(
        column: &'static str,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let params = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Param::new(format!("{}{}", name, i), v))
            .collect();
        Predicate::OneOf { column, params }
    }

    /// `[lower, upper)`, the usual shape of a calendar window.
    pub fn half_open(
        column: &'static str,
        name: &str,
        lower: impl Into<SqlValue>,
        upper: impl Into<SqlValue>,
    ) -> Self {
        Predicate::Range {
            column,
            lower: Some(RangeBound { param: Param::new(format!("{}Start", name), lower), inclusive: true }),
            upper: Some(RangeBound { param: Param::new(format!("{}End", name), upper), inclusive: false }),
        }
    }

    /// `[lower, upper]`
    pub fn closed(
        column: &'static str,
        name: &str,
        lower: impl Into<SqlValue>,
        upper: impl Into<SqlValue>,
    ) -> Self {
        Predicate::Range {
            column,
            lower: Some(RangeBound { param: Param::new(format!("{}Start", name), lower), inclusive: true }),
            upper: Some(RangeBound { param: Param::new(format!("{}End", name), upper), inclusive: true }),
        }
    }

    pub fn matches_any(columns: &[&'static str], name: &str, pattern: impl Into<String>) -> Self {
        Predicate::MatchesAny {
            columns: columns.to_vec(),
            param: Param::new(name, SqlValue::Text(pattern.into())),
        }
    }
}

// ---
// Ordering
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortKey {
    column: &'static str,
    direction: Direction,
}

/// A non-empty ORDER BY. Every key sorts nulls last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    pub fn by(column: &'static str, direction: Direction) -> Self {
        Self { keys: vec![SortKey { column, direction }] }
    }

    /// Adds a tiebreak key.
    pub fn then(mut self, column: &'static str, direction: Direction) -> Self {
        self.keys.push(SortKey { column, direction });
        self
    }

    pub fn to_sql(&self) -> String {
        self.keys
            .iter()
            .map(|k| {
                let dir = match k.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{} {} NULLS LAST", k.column, dir)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---
// Query assembly
// ---

/// Query text with `$n` placeholders plus the parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl BoundQuery {
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<Param>,
}

impl SqlBuilder {
    pub fn new(init: impl Into<String>) -> Self {
        Self { sql: init.into(), params: Vec::new() }
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_bind(&mut self, param: Param) -> &mut Self {
        let placeholder = self.bind(param);
        self.sql.push_str(&placeholder);
        self
    }

    fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Appends ` WHERE p1 AND p2 ...`, or nothing when there are no predicates.
    pub fn push_where<'a>(&mut self, predicates: impl IntoIterator<Item = &'a Predicate>) -> &mut Self {
        let mut first = true;
        for predicate in predicates {
            self.push(if first { " WHERE " } else { " AND " });
            self.push_predicate(predicate);
            first = false;
        }
        self
    }

    pub fn push_predicate(&mut self, predicate: &Predicate) -> &mut Self {
        match predicate {
            Predicate::Compare { column, op, param } => {
                self.push(column).push(" ").push(op.as_sql()).push(" ");
                self.push_bind(param.clone());
            }
            Predicate::OneOf { column, params } => {
                self.push(column).push(" IN (");
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_bind(param.clone());
                }
                self.push(")");
            }
            Predicate::Range { column, lower, upper } => {
                let mut parts = 0;
                if let Some(bound) = lower {
                    self.push(column).push(if bound.inclusive { " >= " } else { " > " });
                    self.push_bind(bound.param.clone());
                    parts += 1;
                }
                if let Some(bound) = upper {
                    if parts > 0 {
                        self.push(" AND ");
                    }
                    self.push(column).push(if bound.inclusive { " <= " } else { " < " });
                    self.push_bind(bound.param.clone());
                    parts += 1;
                }
                if parts == 0 {
                    self.push("TRUE");
                }
            }
            Predicate::MatchesAny { columns, param } => {
                let placeholder = self.bind(param.clone());
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{} ILIKE {}", c, placeholder))
                    .collect();
                self.push("(").push(&parts.join(" OR ")).push(")");
            }
            Predicate::NotNull { column } => {
                self.push(column).push(" IS NOT NULL");
            }
            Predicate::Exists { subquery } => {
                self.push("EXISTS (").push(subquery).push(")");
            }
        }
        self
    }

    pub fn build(self) -> BoundQuery {
        BoundQuery { sql: self.sql, params: self.params }
    }
}
