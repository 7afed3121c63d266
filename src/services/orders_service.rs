// src/services/orders_service.rs

use std::sync::Arc;

use chrono::NaiveDateTime;
use chrono_tz::Tz;

use crate::{
    common::{cache::ReportCache, calendar::Window, error::AppError},
    db::{
        executor::Row,
        filters::ReportParams,
        orders_repo::{INVOICE_FILTERS, PENDING_FILTERS, SALES_ORDER_FILTERS},
        pagination::Page,
        OrdersRepository,
    },
    models::{inventory::VAT_MULTIPLIER, orders::PendingOrderDetails},
};

pub const ORDER_PAGE_SIZE: i64 = 100;
pub const PENDING_PAGE_SIZE: i64 = 50;

#[derive(Clone)]
pub struct OrdersService {
    repo: OrdersRepository,
    cache: Arc<ReportCache>,
    tz: Tz,
}

impl OrdersService {
    pub fn new(repo: OrdersRepository, cache: Arc<ReportCache>, tz: Tz) -> Self {
        Self { repo, cache, tz }
    }

    pub async fn list_sales_orders(&self, params: &ReportParams) -> Result<Page, AppError> {
        let filters = SALES_ORDER_FILTERS.build(params, self.tz);
        self.repo
            .sales_orders_page(&filters, params.page_request(ORDER_PAGE_SIZE))
            .await
    }

    pub async fn list_invoices(&self, params: &ReportParams) -> Result<Page, AppError> {
        let filters = INVOICE_FILTERS.build(params, self.tz);
        self.repo
            .invoices_page(&filters, params.page_request(ORDER_PAGE_SIZE))
            .await
    }

    // --- PENDING ---

    /// Open orders of the current month, cached per page, size, search term and month.
    pub async fn pending_list(&self, params: &ReportParams, as_of: NaiveDateTime) -> Result<Page, AppError> {
        let request = params.page_request(PENDING_PAGE_SIZE);
        let key = format!(
            "pending-list:{}:{}:{}:{}",
            as_of.format("%Y-%m"),
            request.page,
            request.page_size,
            params.search_term().unwrap_or("")
        );

        self.cache
            .get_or_compute(&key, || async {
                let window = Window::CurrentMonth.range(as_of);
                let filters = PENDING_FILTERS.build(params, self.tz);
                self.repo.pending_page(&window, &filters, request).await
            })
            .await
    }

    pub async fn pending_details(&self, sales_order: &str) -> Result<PendingOrderDetails, AppError> {
        let sales_order = sales_order.trim();
        let (header, lines) = tokio::try_join!(
            self.repo.order_header(sales_order),
            self.repo.order_lines(sales_order),
        )?;

        let header = header.ok_or_else(|| AppError::NotFound(format!("Sales order {}", sales_order)))?;
        let line_items = lines.into_iter().map(with_tax).collect();
        Ok(PendingOrderDetails { header, line_items })
    }
}

fn with_tax(mut line: Row) -> Row {
    let value_with_tax = line.decimal("LineValue").and_then(|v| v.checked_mul(VAT_MULTIPLIER));
    line.set("ValueWithTax", value_with_tax);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::cache::{testing::ManualClock, TtlCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
    use crate::db::{executor::testing::FakeExecutor, query::SqlValue};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    fn service(exec: Arc<FakeExecutor>) -> OrdersService {
        let cache = Arc::new(TtlCache::with_clock(DEFAULT_TTL, DEFAULT_MAX_ENTRIES, ManualClock::new()));
        OrdersService::new(OrdersRepository::new(exec), cache, chrono_tz::UTC)
    }

    fn orders(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row::new().with("SalesOrder", format!("{:06}", 900 - i)).with("CustomerName", "ACME"))
            .collect()
    }

    #[tokio::test]
    async fn invoices_default_to_hundred_rows() {
        let exec = Arc::new(FakeExecutor::table(orders(150)));
        let page = service(exec).list_invoices(&ReportParams::default()).await.unwrap();

        assert_eq!(page.data.len(), 100);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn pending_list_is_cached_per_parameters() {
        let exec = Arc::new(FakeExecutor::table(orders(60)));
        let service = service(exec.clone());

        let first = service.pending_list(&ReportParams::default(), as_of()).await.unwrap();
        let again = service.pending_list(&ReportParams::default(), as_of()).await.unwrap();
        assert_eq!(exec.query_count(), 2);
        assert_eq!(first.data.len(), 50);
        assert_eq!(serde_json::to_value(&first).unwrap(), serde_json::to_value(&again).unwrap());

        let page_two = ReportParams { page: Some("2".into()), ..ReportParams::default() };
        let second = service.pending_list(&page_two, as_of()).await.unwrap();
        assert_eq!(exec.query_count(), 4);
        assert_eq!(second.data.len(), 10);
    }

    #[tokio::test]
    async fn pending_list_keys_on_search_and_page_size() {
        let exec = Arc::new(FakeExecutor::table(orders(60)));
        let service = service(exec.clone());
        let search = |term: &str| ReportParams { search: Some(term.into()), ..ReportParams::default() };

        service.pending_list(&search("acme"), as_of()).await.unwrap();
        service.pending_list(&search("globex"), as_of()).await.unwrap();
        assert_eq!(exec.query_count(), 4);

        // Surrounding blanks do not make a new key.
        service.pending_list(&search("  acme "), as_of()).await.unwrap();
        assert_eq!(exec.query_count(), 4);

        let smaller = ReportParams { page_size: Some("20".into()), ..search("acme") };
        let page = service.pending_list(&smaller, as_of()).await.unwrap();
        assert_eq!(exec.query_count(), 6);
        assert_eq!(page.page_size, 20);
        assert_eq!(exec.queries()[4].param("searchTerm"), Some(&SqlValue::Text("%acme%".into())));
    }

    #[tokio::test]
    async fn details_add_tax_to_lines() {
        let exec = Arc::new(FakeExecutor::new(|q| {
            if q.sql.contains("FROM SorMaster sm") {
                Ok(vec![Row::new().with("SalesOrder", "000123")])
            } else {
                Ok(vec![Row::new().with("StockCode", "A-1").with("LineValue", Decimal::from(100))])
            }
        }));

        let details = service(exec).pending_details(" 000123 ").await.unwrap();

        assert_eq!(details.header.text("SalesOrder"), Some("000123"));
        assert_eq!(details.line_items[0].decimal("ValueWithTax"), Some(Decimal::from(112)));
    }

    #[tokio::test]
    async fn details_of_unknown_order_is_not_found() {
        let exec = Arc::new(FakeExecutor::new(|_| Ok(vec![])));
        let err = service(exec).pending_details("999999").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
