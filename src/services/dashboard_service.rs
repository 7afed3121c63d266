// src/services/dashboard_service.rs

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::{
    common::{
        cache::ReportCache,
        calendar::{month_name, monthly_windows, Window},
        error::AppError,
    },
    db::DashboardRepository,
    models::dashboard::{
        percentage_change, MetricKind, MetricPeriod, MonthlyMetric, MonthlySeries, OrdersToday, PendingTotal,
        SalesThisMonth, SalesToday, Trend,
    },
};

/// Prior months shown next to the current one.
pub const TRAILING_MONTHS: u32 = 6;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    cache: Arc<ReportCache>,
}

// Keys carry the reference day (or month) so a cached "today" never outlives midnight.
fn day_key(prefix: &str, as_of: NaiveDateTime) -> String {
    format!("{}:{}", prefix, as_of.format("%Y-%m-%d"))
}

fn month_key(prefix: &str, as_of: NaiveDateTime) -> String {
    format!("{}:{}", prefix, as_of.format("%Y-%m"))
}

impl DashboardService {
    pub fn new(repo: DashboardRepository, cache: Arc<ReportCache>) -> Self {
        Self { repo, cache }
    }

    // --- ORDERS ---
    pub async fn orders_today(&self, as_of: NaiveDateTime) -> Result<OrdersToday, AppError> {
        self.cache
            .get_or_compute(&day_key("total-orders-today", as_of), || async {
                let values = self
                    .repo
                    .aggregate_windows(MetricKind::OrderCount, &[Window::Today, Window::Yesterday], as_of)
                    .await?;
                let today = values.first().copied().unwrap_or(Decimal::ZERO);
                let yesterday = values.get(1).copied().unwrap_or(Decimal::ZERO);
                let change = percentage_change(today, yesterday);

                Ok(OrdersToday {
                    total_order_today: today.to_i64().unwrap_or(0),
                    total_order_yesterday: yesterday.to_i64().unwrap_or(0),
                    percentage_change: change,
                    trend: Trend::of(change),
                })
            })
            .await
    }

    pub async fn orders_monthly(&self, as_of: NaiveDateTime) -> Result<MonthlySeries, AppError> {
        self.monthly(MetricKind::OrderCount, "total-orders-monthly-7", as_of).await
    }

    // --- SALES ---
    pub async fn sales_today(&self, as_of: NaiveDateTime) -> Result<SalesToday, AppError> {
        self.cache
            .get_or_compute(&day_key("total-sales-today", as_of), || async {
                let total = self.repo.aggregate(MetricKind::SalesValue, Window::Today, as_of).await?;
                Ok(SalesToday { total_sales_today: total })
            })
            .await
    }

    /// Month to date against the whole previous month.
    pub async fn sales_this_month(&self, as_of: NaiveDateTime) -> Result<SalesThisMonth, AppError> {
        self.cache
            .get_or_compute(&day_key("total-sales-month", as_of), || async {
                let values = self
                    .repo
                    .aggregate_windows(MetricKind::SalesValue, &[Window::CurrentMonth, Window::MonthsAgo(1)], as_of)
                    .await?;
                let current = values.first().copied().unwrap_or(Decimal::ZERO);
                let previous = values.get(1).copied().unwrap_or(Decimal::ZERO);
                let change = percentage_change(current, previous);

                Ok(SalesThisMonth {
                    total_sales_in_month: current,
                    total_sales_previous_month: previous,
                    percentage_change: change,
                    trend: Trend::of(change),
                })
            })
            .await
    }

    pub async fn sales_monthly(&self, as_of: NaiveDateTime) -> Result<MonthlySeries, AppError> {
        self.monthly(MetricKind::SalesValue, "total-sales-monthly-7", as_of).await
    }

    // --- PENDING ---
    pub async fn pending_total(&self, as_of: NaiveDateTime) -> Result<PendingTotal, AppError> {
        self.cache
            .get_or_compute(&day_key("pending-total", as_of), || async {
                let total = self
                    .repo
                    .aggregate(MetricKind::PendingValue, Window::CurrentMonth, as_of)
                    .await?;
                Ok(PendingTotal { total_value_with_tax: total })
            })
            .await
    }

    pub async fn pending_monthly(&self, as_of: NaiveDateTime) -> Result<MonthlySeries, AppError> {
        self.monthly(MetricKind::PendingValue, "pending-monthly-7", as_of).await
    }

    async fn monthly(&self, kind: MetricKind, prefix: &str, as_of: NaiveDateTime) -> Result<MonthlySeries, AppError> {
        self.cache
            .get_or_compute(&month_key(prefix, as_of), || async {
                let windows = monthly_windows(TRAILING_MONTHS);
                let values = self.repo.aggregate_windows(kind, &windows, as_of).await?;

                let monthly_data = windows
                    .iter()
                    .zip(values)
                    .map(|(window, value)| {
                        let (year, month) = window.year_month(as_of);
                        MonthlyMetric {
                            month: month_name(month).to_string(),
                            year,
                            value,
                            period: match window {
                                Window::CurrentMonth => MetricPeriod::Current,
                                _ => MetricPeriod::Monthly,
                            },
                        }
                    })
                    .collect();

                Ok(MonthlySeries { monthly_data })
            })
            .await
    }
}
