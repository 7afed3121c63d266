// src/models/inventory.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::executor::Row;

/// Philippine VAT, applied to prices and line values.
pub const VAT_MULTIPLIER: Decimal = Decimal::from_parts(112, 0, 0, false, 2);

pub const DEFAULT_CRITICAL_THRESHOLD: i64 = 20;
pub const CRITICAL_STOCK_LIMIT: usize = 50;

// --- 1. Cartons and pieces ---

/// A quantity expressed as whole cartons plus loose pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartonSplit {
    pub cartons: Decimal,
    pub pieces: Decimal,
}

// --- 2. Stock status ---

/// Declared in urgency order: sorting by status puts the emptiest items first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum StockStatus {
    #[serde(rename = "No Stock")]
    NoStock,
    Critical,
    Low,
    Warning,
    Normal,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::NoStock => "No Stock",
            StockStatus::Critical => "Critical",
            StockStatus::Low => "Low",
            StockStatus::Warning => "Warning",
            StockStatus::Normal => "Normal",
        }
    }
}

// --- 3. Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CriticalStockReport {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
    /// Rows returned (at most 50)
    pub total: usize,
}
