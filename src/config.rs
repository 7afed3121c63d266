// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::{
        cache::{ReportCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL},
        calendar::ReportClock,
    },
    db::{
        executor::{PgExecutor, QueryExecutor},
        DashboardRepository, InventoryRepository, OrdersRepository,
    },
    services::{DashboardService, InventoryService, OrdersService},
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Manila;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub report_timezone: Tz,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub db_max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            report_timezone: DEFAULT_TIMEZONE,
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let report_timezone = match env::var("REPORT_TIMEZONE") {
            Ok(name) if !name.trim().is_empty() => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| anyhow!("REPORT_TIMEZONE {:?} is not a valid time zone: {}", name, e))?,
            _ => defaults.report_timezone,
        };

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            report_timezone,
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECONDS", defaults.cache_ttl.as_secs())),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
        })
    }
}

/// Parses an optional variable, keeping the default when it is missing or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, "Ignoring unparseable value {:?}", raw);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub report_clock: ReportClock,
    pub dashboard_service: DashboardService,
    pub inventory_service: InventoryService,
    pub orders_service: OrdersService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<(Self, Settings)> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Failed to connect to the database")?;

        tracing::info!(
            timezone = %settings.report_timezone,
            cache_ttl_secs = settings.cache_ttl.as_secs(),
            "✅ Database connection established"
        );

        let state = Self::from_executor(Arc::new(PgExecutor::new(db_pool)), &settings);
        Ok((state, settings))
    }

    /// Wires the dependency graph on top of any executor.
    pub fn from_executor(executor: Arc<dyn QueryExecutor>, settings: &Settings) -> Self {
        let cache = Arc::new(ReportCache::new(settings.cache_ttl, settings.cache_max_entries));

        let dashboard_repo = DashboardRepository::new(executor.clone());
        let inventory_repo = InventoryRepository::new(executor.clone());
        let orders_repo = OrdersRepository::new(executor);

        Self {
            report_clock: ReportClock::new(settings.report_timezone),
            dashboard_service: DashboardService::new(dashboard_repo, cache.clone()),
            inventory_service: InventoryService::new(inventory_repo, settings.report_timezone),
            orders_service: OrdersService::new(orders_repo, cache, settings.report_timezone),
        }
    }
}
