// src/db/orders_repo.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::{calendar::TimeRange, error::AppError},
    db::{
        dashboard_repo::pending_order_rules,
        executor::{QueryExecutor, Row},
        filters::{FilterSet, FilterSpec},
        pagination::{Page, PageRequest, PaginatedQuery},
        query::{CmpOp, Direction, OrderBy, Predicate, SqlBuilder},
    },
};

// ---
// Sales orders (SorMaster)
// ---

const SALES_ORDER_PROJECTION: &str = r#"SalesOrder AS "SalesOrder", Customer AS "Customer", Salesperson AS "Salesperson", CustomerPoNumber AS "CustomerPoNumber", OrderDate AS "OrderDate", ReqShipDate AS "ReqShipDate", DateLastDocPrt AS "DateLastDocPrt", LastInvoice AS "LastInvoice", CustomerName AS "CustomerName", LastOperator AS "LastOperator""#;

pub const SALES_ORDER_FILTERS: FilterSpec = FilterSpec {
    date_column: Some("DateLastDocPrt"),
    search_columns: &["SalesOrder", "Customer", "CustomerName"],
    warehouse_column: None,
};

fn sales_order_query() -> PaginatedQuery {
    PaginatedQuery::new(
        SALES_ORDER_PROJECTION,
        "SorMaster",
        OrderBy::by("DateLastDocPrt", Direction::Desc).then("SalesOrder", Direction::Desc),
    )
}

// ---
// Invoices (ArTrnSummary)
// ---

const INVOICE_PROJECTION: &str = r#"Invoice AS "Invoice", InvoiceDate AS "InvoiceDate", Customer AS "Customer", SalesOrder AS "SalesOrder", Salesperson AS "Salesperson", Branch AS "Branch", Warehouse AS "Warehouse", MerchandiseValue AS "MerchandiseValue", TaxValue AS "TaxValue", Operator AS "Operator""#;

pub const INVOICE_FILTERS: FilterSpec = FilterSpec {
    date_column: Some("InvoiceDate"),
    search_columns: &["Invoice", "Customer", "SalesOrder"],
    warehouse_column: None,
};

fn invoice_query() -> PaginatedQuery {
    PaginatedQuery::new(
        INVOICE_PROJECTION,
        "ArTrnSummary",
        OrderBy::by("InvoiceDate", Direction::Desc).then("Invoice", Direction::Desc),
    )
}

// ---
// Pending orders
// ---

const PENDING_HEADER_PROJECTION: &str = r#"sm.SalesOrder AS "SalesOrder", sm.OrderStatus AS "OrderStatus", sm.DocumentType AS "DocumentType", sm.Customer AS "Customer", sm.Salesperson AS "Salesperson", sm.CustomerPoNumber AS "CustomerPoNumber", sm.CustomerName AS "CustomerName", sm.OrderDate AS "OrderDate", sm.ReqShipDate AS "ReqShipDate", sm.Branch AS "Branch", sm.Warehouse AS "Warehouse", sm.LastOperator AS "LastOperator""#;

const PENDING_LINE_PROJECTION: &str = r#"sa.StockCode AS "StockCode", sa.Description AS "Description", sa.OrderQty AS "OrderQty", sa.Price AS "Price", sa.LineValue AS "LineValue", sa.Salesperson AS "Salesperson""#;

const HAS_OPEN_LINES: &str =
    "SELECT 1 FROM SorAdditions sa WHERE sa.SalesOrder = sm.SalesOrder AND sa.LineValue > 0";

pub const PENDING_FILTERS: FilterSpec = FilterSpec {
    date_column: None,
    search_columns: &["sm.SalesOrder", "sm.CustomerName", "sm.CustomerPoNumber"],
    warehouse_column: None,
};

fn pending_query(window: &TimeRange) -> PaginatedQuery {
    let base = PaginatedQuery::new(
        PENDING_HEADER_PROJECTION,
        "SorMaster sm",
        OrderBy::by("sm.SalesOrder", Direction::Desc),
    );
    pending_order_rules()
        .into_iter()
        .fold(base, PaginatedQuery::with_fixed)
        .with_fixed(window.predicate("sm.OrderDate", "window"))
        .with_fixed(Predicate::Exists { subquery: HAS_OPEN_LINES })
}

#[derive(Clone)]
pub struct OrdersRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl OrdersRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn sales_orders_page(&self, filters: &FilterSet, request: PageRequest) -> Result<Page, AppError> {
        sales_order_query().run(self.executor.as_ref(), filters, request).await
    }

    pub async fn invoices_page(&self, filters: &FilterSet, request: PageRequest) -> Result<Page, AppError> {
        invoice_query().run(self.executor.as_ref(), filters, request).await
    }

    /// Open orders dated inside `window` that still have at least one valued line.
    pub async fn pending_page(
        &self,
        window: &TimeRange,
        filters: &FilterSet,
        request: PageRequest,
    ) -> Result<Page, AppError> {
        pending_query(window).run(self.executor.as_ref(), filters, request).await
    }

    pub async fn order_header(&self, sales_order: &str) -> Result<Option<Row>, AppError> {
        let mut qb = SqlBuilder::new(format!("SELECT {} FROM SorMaster sm", PENDING_HEADER_PROJECTION));
        qb.push_where(&[Predicate::eq("sm.SalesOrder", "salesOrder", sales_order)]);
        self.executor.fetch_optional(&qb.build()).await
    }

    pub async fn order_lines(&self, sales_order: &str) -> Result<Vec<Row>, AppError> {
        let mut qb = SqlBuilder::new(format!("SELECT {} FROM SorAdditions sa", PENDING_LINE_PROJECTION));
        qb.push_where(&[
            Predicate::eq("sa.SalesOrder", "salesOrder", sales_order),
            Predicate::compare("sa.LineValue", CmpOp::Gt, "minLineValue", Decimal::ZERO),
        ]);
        qb.push(" ORDER BY ").push(&OrderBy::by("sa.StockCode", Direction::Asc).to_sql());
        self.executor.fetch_all(&qb.build()).await
    }
}
