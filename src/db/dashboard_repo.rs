// src/db/dashboard_repo.rs

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::{
    common::{
        calendar::Window,
        error::AppError,
    },
    db::{
        executor::QueryExecutor,
        query::{BoundQuery, CmpOp, Predicate, SqlBuilder},
    },
    models::dashboard::MetricKind,
};

pub const PLACED_ORDER_STATUSES: [&str; 2] = ["9", "2"];
pub const PENDING_ORDER_STATUSES: [&str; 2] = ["8", "0"];

/// Field sales reps whose open orders count as pending.
pub const PENDING_SALESPEOPLE: [&str; 13] = [
    "F01", "F03", "F04", "N01", "N02", "N03", "N05", "N06", "N07", "N08", "N12", "N14", "N75",
];

/// Header conditions of an open order, on `SorMaster sm`.
pub fn pending_order_rules() -> Vec<Predicate> {
    vec![
        Predicate::one_of("sm.OrderStatus", "pendingStatus", PENDING_ORDER_STATUSES),
        Predicate::eq("sm.OrderType", "orderType", "B"),
        Predicate::eq("sm.DocumentType", "documentType", "B"),
        Predicate::one_of("sm.Salesperson", "salesperson", PENDING_SALESPEOPLE),
    ]
}

// ---
// Metric definitions
// ---

struct MetricSql {
    source: &'static str,
    date_column: &'static str,
    value_expr: &'static str,
    rules: Vec<Predicate>,
}

fn metric_sql(kind: MetricKind) -> MetricSql {
    match kind {
        MetricKind::OrderCount => MetricSql {
            source: "SorMasterRep",
            date_column: "OrderDate",
            value_expr: "1",
            rules: vec![
                Predicate::one_of("OrderStatus", "orderStatus", PLACED_ORDER_STATUSES),
                Predicate::eq("DocumentType", "documentType", "B"),
            ],
        },
        // Net of 12% VAT, then the 0.9820 collection factor.
        MetricKind::SalesValue => MetricSql {
            source: "ArTrnSummary",
            date_column: "InvoiceDate",
            value_expr: "(MerchandiseValue + TaxValue) / 1.12 * 0.9820",
            rules: vec![Predicate::compare("MerchandiseValue", CmpOp::Gt, "minMerchandise", Decimal::ZERO)],
        },
        MetricKind::PendingValue => {
            let mut rules = pending_order_rules();
            rules.push(Predicate::compare("sa.LineValue", CmpOp::Gt, "minLineValue", Decimal::ZERO));
            MetricSql {
                source: "SorMaster sm INNER JOIN SorAdditions sa ON sa.SalesOrder = sm.SalesOrder",
                date_column: "sm.OrderDate",
                value_expr: "sa.LineValue * 1.12",
                rules,
            }
        }
    }
}

/// One row, one `w{i}` column per window. Rows outside every window are cut by a lower
/// bound on the date column so the scan stays narrow.
pub fn aggregate_query(kind: MetricKind, windows: &[Window], as_of: NaiveDateTime) -> BoundQuery {
    let metric = metric_sql(kind);
    let ranges: Vec<_> = windows.iter().map(|w| w.range(as_of)).collect();

    let mut qb = SqlBuilder::new("SELECT ");
    for (i, range) in ranges.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        let name = format!("w{}", i);
        qb.push("COALESCE(SUM(CASE WHEN ");
        qb.push_predicate(&range.predicate(metric.date_column, &name));
        qb.push(" THEN ").push(metric.value_expr).push(" ELSE 0 END), 0) AS ");
        qb.push(&format!("\"{}\"", name));
    }
    qb.push(" FROM ").push(metric.source);

    let mut predicates = metric.rules;
    if let Some(earliest) = ranges.iter().map(|r| r.start).min() {
        predicates.push(Predicate::compare(metric.date_column, CmpOp::Ge, "earliest", earliest));
    }
    qb.push_where(&predicates);
    qb.build()
}

#[derive(Clone)]
pub struct DashboardRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl DashboardRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn aggregate(&self, kind: MetricKind, window: Window, as_of: NaiveDateTime) -> Result<Decimal, AppError> {
        let values = self.aggregate_windows(kind, &[window], as_of).await?;
        Ok(values.first().copied().unwrap_or(Decimal::ZERO))
    }

    /// Totals for several windows in a single round trip, in the order given.
    pub async fn aggregate_windows(
        &self,
        kind: MetricKind,
        windows: &[Window],
        as_of: NaiveDateTime,
    ) -> Result<Vec<Decimal>, AppError> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let query = aggregate_query(kind, windows, as_of);
        let row = self.executor.fetch_optional(&query).await?;

        let values: Vec<Decimal> = (0..windows.len())
            .map(|i| {
                row.as_ref()
                    .and_then(|r| r.decimal(&format!("w{}", i)))
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();

        tracing::debug!(metric = ?kind, windows = windows.len(), "Metric aggregated");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{executor::testing::FakeExecutor, executor::Row, query::SqlValue};
    use chrono::NaiveDate;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn order_count_query_shape() {
        let q = aggregate_query(MetricKind::OrderCount, &[Window::Today, Window::Yesterday], as_of());
        assert_eq!(
            q.sql,
            "SELECT COALESCE(SUM(CASE WHEN OrderDate >= $1 AND OrderDate <= $2 THEN 1 ELSE 0 END), 0) AS \"w0\", \
             COALESCE(SUM(CASE WHEN OrderDate >= $3 AND OrderDate < $4 THEN 1 ELSE 0 END), 0) AS \"w1\" \
             FROM SorMasterRep WHERE OrderStatus IN ($5, $6) AND DocumentType = $7 AND OrderDate >= $8"
        );
        let yesterday = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(q.param("earliest"), Some(&SqlValue::Timestamp(yesterday)));
    }

    #[test]
    fn pending_value_joins_lines_and_filters_salespeople() {
        let q = aggregate_query(MetricKind::PendingValue, &[Window::CurrentMonth], as_of());
        assert!(q.sql.contains("FROM SorMaster sm INNER JOIN SorAdditions sa ON sa.SalesOrder = sm.SalesOrder"));
        assert!(q.sql.contains("THEN sa.LineValue * 1.12 ELSE 0"));
        assert_eq!(q.param_names().iter().filter(|n| n.starts_with("salesperson")).count(), 13);
        assert_eq!(q.param("minLineValue"), Some(&SqlValue::Decimal(Decimal::ZERO)));
    }

    #[test]
    fn sales_value_uses_net_formula() {
        let q = aggregate_query(MetricKind::SalesValue, &[Window::Today], as_of());
        assert!(q.sql.contains("THEN (MerchandiseValue + TaxValue) / 1.12 * 0.9820 ELSE 0"));
        assert!(q.sql.contains("FROM ArTrnSummary WHERE MerchandiseValue > $3"));
    }

    #[tokio::test]
    async fn missing_or_null_columns_read_as_zero() {
        let exec = Arc::new(FakeExecutor::new(|_| {
            Ok(vec![Row::new().with("w0", 12i64).with("w1", crate::db::executor::Scalar::Null)])
        }));
        let repo = DashboardRepository::new(exec.clone());

        let values = repo
            .aggregate_windows(MetricKind::OrderCount, &[Window::Today, Window::Yesterday, Window::CurrentMonth], as_of())
            .await
            .unwrap();

        assert_eq!(values, vec![Decimal::from(12), Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(exec.query_count(), 1);
    }
}
