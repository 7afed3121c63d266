// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::dashboard::{MonthlySeries, OrdersToday, PendingTotal, SalesThisMonth, SalesToday},
};

// GET /api/totalordertoday
#[utoipa::path(
    get,
    path = "/api/totalordertoday",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Orders placed today against yesterday", body = OrdersToday),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn orders_today(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.orders_today(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/totalordertoday/monthly
#[utoipa::path(
    get,
    path = "/api/totalordertoday/monthly",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Order counts, current month and the six before it", body = MonthlySeries),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn orders_monthly(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.orders_monthly(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/totalsales/today
#[utoipa::path(
    get,
    path = "/api/totalsales/today",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Net sales invoiced today", body = SalesToday),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn sales_today(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.sales_today(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/totalsales
#[utoipa::path(
    get,
    path = "/api/totalsales",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Net sales this month against last month", body = SalesThisMonth),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn sales_this_month(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.sales_this_month(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/totalsales/monthly
#[utoipa::path(
    get,
    path = "/api/totalsales/monthly",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Net sales, current month and the six before it", body = MonthlySeries),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn sales_monthly(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.sales_monthly(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/pending
#[utoipa::path(
    get,
    path = "/api/pending",
    tag = "Pending",
    responses(
        (status = 200, description = "Open order value this month, VAT included", body = PendingTotal),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn pending_total(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.pending_total(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}

// GET /api/pending/monthly
#[utoipa::path(
    get,
    path = "/api/pending/monthly",
    tag = "Pending",
    responses(
        (status = 200, description = "Open order value, current month and the six before it", body = MonthlySeries),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn pending_monthly(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let as_of = app_state.report_clock.now();
    let result = app_state.dashboard_service.pending_monthly(as_of).await?;
    Ok((StatusCode::OK, Json(result)))
}
