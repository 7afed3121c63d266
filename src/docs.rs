// src/docs.rs

use utoipa::OpenApi;

use crate::db;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Stock Reports API", description = "Read-only sales, pending order and inventory reports"),
    paths(
        // --- Orders ---
        handlers::reports::list_sales_orders,
        handlers::reports::list_invoices,

        // --- Pending ---
        handlers::dashboard::pending_total,
        handlers::dashboard::pending_monthly,
        handlers::reports::pending_list,
        handlers::reports::pending_details,

        // --- Dashboard ---
        handlers::dashboard::orders_today,
        handlers::dashboard::orders_monthly,
        handlers::dashboard::sales_today,
        handlers::dashboard::sales_this_month,
        handlers::dashboard::sales_monthly,

        // --- Inventory ---
        handlers::inventory::list_stock,
        handlers::inventory::list_warehouses,
        handlers::inventory::critical_stock,
        handlers::inventory::list_mr_movements,
    ),
    components(
        schemas(
            db::pagination::Page,

            // --- Dashboard ---
            models::dashboard::Trend,
            models::dashboard::OrdersToday,
            models::dashboard::SalesToday,
            models::dashboard::SalesThisMonth,
            models::dashboard::PendingTotal,
            models::dashboard::MetricPeriod,
            models::dashboard::MonthlyMetric,
            models::dashboard::MonthlySeries,

            // --- Inventory ---
            models::inventory::StockStatus,
            models::inventory::CriticalStockReport,

            // --- Orders ---
            models::orders::PendingOrderDetails,
        )
    ),
    tags(
        (name = "Orders", description = "Sales orders and invoices"),
        (name = "Pending", description = "Open sales orders"),
        (name = "Dashboard", description = "Order and sales indicators"),
        (name = "Inventory", description = "Stock on hand, critical stock and MR returns")
    )
)]
pub struct ApiDoc;
