// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    db::{filters::ReportParams, pagination::Page},
    models::orders::PendingOrderDetails,
};

// GET /api/SorMaster
#[utoipa::path(
    get,
    path = "/api/SorMaster",
    tag = "Orders",
    params(ReportParams),
    responses(
        (status = 200, description = "Sales orders, latest printed document first", body = Page),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn list_sales_orders(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.orders_service.list_sales_orders(&params).await?;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/ArTrnSummary
#[utoipa::path(
    get,
    path = "/api/ArTrnSummary",
    tag = "Orders",
    params(ReportParams),
    responses(
        (status = 200, description = "Invoices, newest first", body = Page),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.orders_service.list_invoices(&params).await?;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/pending/list
#[utoipa::path(
    get,
    path = "/api/pending/list",
    tag = "Pending",
    params(ReportParams),
    responses(
        (status = 200, description = "Open orders of the current month", body = Page),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn pending_list(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let page = app_state.orders_service.pending_list(&params, as_of).await?;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/pending/details/{salesOrder}
#[utoipa::path(
    get,
    path = "/api/pending/details/{salesOrder}",
    tag = "Pending",
    params(("salesOrder" = String, Path, description = "Sales order number")),
    responses(
        (status = 200, description = "Order header and valued lines", body = PendingOrderDetails),
        (status = 404, description = "Unknown sales order"),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn pending_details(
    State(app_state): State<AppState>,
    Path(sales_order): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let details = app_state.orders_service.pending_details(&sales_order).await?;
    Ok((StatusCode::OK, Json(details)))
}
