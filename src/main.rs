//src/main.rs

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        // Orders
        .route("/api/SorMaster", get(handlers::reports::list_sales_orders))
        .route("/api/ArTrnSummary", get(handlers::reports::list_invoices))
        // Inventory
        .route("/api/MRChecker", get(handlers::inventory::list_mr_movements))
        .route("/api/allStockCheckerInventory", get(handlers::inventory::list_stock))
        .route("/api/allStockCheckerInventory/warehouses", get(handlers::inventory::list_warehouses))
        .route("/api/allStockCheckerInventory/critical", get(handlers::inventory::critical_stock))
        // Pending
        .route("/api/pending", get(handlers::dashboard::pending_total))
        .route("/api/pending/list", get(handlers::reports::pending_list))
        .route("/api/pending/monthly", get(handlers::dashboard::pending_monthly))
        .route("/api/pending/details/{salesOrder}", get(handlers::reports::pending_details))
        // Dashboard
        .route("/api/totalordertoday", get(handlers::dashboard::orders_today))
        .route("/api/totalordertoday/monthly", get(handlers::dashboard::orders_monthly))
        .route("/api/totalsales", get(handlers::dashboard::sales_this_month))
        .route("/api/totalsales/today", get(handlers::dashboard::sales_today))
        .route("/api/totalsales/monthly", get(handlers::dashboard::sales_monthly))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // If configuration or the database fails, the service must not start.
    let (app_state, settings) = AppState::new().await?;

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app(app_state)).await.context("Axum server error")?;
    Ok(())
}
