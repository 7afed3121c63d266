// src/models/dashboard.rs

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The three dashboard metrics. Each has its own table, date column and value rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Placed sales orders, counted.
    OrderCount,
    /// Invoiced merchandise, net of VAT and the collection factor.
    SalesValue,
    /// Open sales order lines, VAT included.
    PendingValue,
}

// 1. Comparison cards

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Positive,
    Negative,
}

impl Trend {
    pub fn of(percentage_change: Decimal) -> Self {
        if percentage_change.is_sign_negative() && !percentage_change.is_zero() {
            Trend::Negative
        } else {
            Trend::Positive
        }
    }
}

/// `(current - previous) / previous * 100`, one decimal. A zero baseline yields 100 when
/// there is any current value and 0 otherwise.
pub fn percentage_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current > Decimal::ZERO { Decimal::ONE_HUNDRED } else { Decimal::ZERO };
    }
    (current - previous)
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrdersToday {
    pub total_order_today: i64,
    pub total_order_yesterday: i64,
    #[schema(value_type = f64, example = 25.0)]
    pub percentage_change: Decimal,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesToday {
    #[schema(value_type = f64)]
    pub total_sales_today: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesThisMonth {
    #[schema(value_type = f64)]
    pub total_sales_in_month: Decimal,
    #[schema(value_type = f64)]
    pub total_sales_previous_month: Decimal,
    #[schema(value_type = f64, example = 12.5)]
    pub percentage_change: Decimal,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingTotal {
    #[schema(value_type = f64)]
    pub total_value_with_tax: Decimal,
}

// 2. Seven-month series

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MetricPeriod {
    Current,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyMetric {
    /// Three-letter month name
    #[schema(example = "Jan")]
    pub month: String,
    pub year: i32,
    #[schema(value_type = f64)]
    pub value: Decimal,
    #[serde(rename = "type")]
    pub period: MetricPeriod,
}

/// Current month first, then the six prior months oldest to newest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySeries {
    pub monthly_data: Vec<MonthlyMetric>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn percentage_change_rounds_to_one_decimal() {
        assert_eq!(percentage_change(d(150), d(120)), Decimal::new(250, 1));
        assert_eq!(percentage_change(d(2), d(3)), Decimal::new(-333, 1));
        assert_eq!(percentage_change(d(1), d(8)), Decimal::new(-875, 1));
    }

    #[test]
    fn zero_baseline() {
        assert_eq!(percentage_change(d(5), d(0)), d(100));
        assert_eq!(percentage_change(d(0), d(0)), d(0));
    }

    #[test]
    fn trend_follows_sign() {
        assert_eq!(Trend::of(Decimal::new(-1, 1)), Trend::Negative);
        assert_eq!(Trend::of(Decimal::ZERO), Trend::Positive);
        assert_eq!(Trend::of(d(100)), Trend::Positive);
    }

    #[test]
    fn monthly_metric_serializes_type_field() {
        let metric = MonthlyMetric {
            month: "Jan".into(),
            year: 2026,
            value: d(3),
            period: MetricPeriod::Current,
        };
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["type"], "current");
        assert_eq!(json["month"], "Jan");
    }
}
