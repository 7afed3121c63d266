// src/handlers/inventory.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    db::{filters::ReportParams, pagination::Page},
    models::inventory::CriticalStockReport,
};

// GET /api/allStockCheckerInventory
#[utoipa::path(
    get,
    path = "/api/allStockCheckerInventory",
    tag = "Inventory",
    params(ReportParams),
    responses(
        (status = 200, description = "Stock on hand in cartons and pieces, with prices", body = Page),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn list_stock(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.inventory_service.list_stock(&params).await?;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/allStockCheckerInventory/warehouses
#[utoipa::path(
    get,
    path = "/api/allStockCheckerInventory/warehouses",
    tag = "Inventory",
    responses(
        (status = 200, description = "Warehouses holding stock", body = Vec<String>),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn list_warehouses(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let warehouses = app_state.inventory_service.warehouses().await?;
    Ok((StatusCode::OK, Json(warehouses)))
}

// GET /api/allStockCheckerInventory/critical
#[utoipa::path(
    get,
    path = "/api/allStockCheckerInventory/critical",
    tag = "Inventory",
    params(ReportParams),
    responses(
        (status = 200, description = "Up to 50 M1 items closest to running out", body = CriticalStockReport),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn critical_stock(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state.inventory_service.critical_stock(&params).await?;
    Ok((StatusCode::OK, Json(report)))
}

// GET /api/MRChecker
#[utoipa::path(
    get,
    path = "/api/MRChecker",
    tag = "Inventory",
    params(ReportParams),
    responses(
        (status = 200, description = "Returns posted to the MR warehouse", body = Page),
        (status = 500, description = "Database Server Error")
    )
)]
pub async fn list_mr_movements(
    State(app_state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.inventory_service.list_mr_movements(&params).await?;
    Ok((StatusCode::OK, Json(page)))
}
