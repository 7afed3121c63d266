// src/services/inventory_service.rs

use std::cmp::Ordering;

use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::error::AppError,
    db::{
        executor::{Row, Scalar},
        filters::ReportParams,
        inventory_repo::{MOVEMENT_FILTERS, STOCK_FILTERS},
        pagination::Page,
        InventoryRepository,
    },
    models::inventory::{
        CartonSplit, CriticalStockReport, StockStatus, CRITICAL_STOCK_LIMIT, DEFAULT_CRITICAL_THRESHOLD,
        VAT_MULTIPLIER,
    },
};

pub const STOCK_PAGE_SIZE: i64 = 50;
pub const MOVEMENT_PAGE_SIZE: i64 = 30;

const OVER_ALLOCATED: &str = "OFR-OS QTY";

// ---
// Projection: cartons and pieces
// ---

/// Splits a quantity in cartons into whole cartons and loose pieces. The sign is dropped;
/// a missing or non-positive factor yields zero pieces.
pub fn project(quantity: Decimal, factor: Option<Decimal>) -> CartonSplit {
    let magnitude = quantity.abs();
    let cartons = magnitude.floor();

    let pieces = factor
        .filter(|f| *f > Decimal::ZERO)
        .and_then(|f| {
            let fraction = round2(magnitude - cartons);
            fraction.checked_mul(round2(f))
        })
        .map(|p| p.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).floor())
        .unwrap_or(Decimal::ZERO);

    CartonSplit { cartons, pieces }
}

fn round2(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn classify(split: &CartonSplit, threshold: i64) -> StockStatus {
    let cartons = split.cartons;
    if cartons.is_zero() {
        return if split.pieces > Decimal::ZERO { StockStatus::Critical } else { StockStatus::NoStock };
    }
    if cartons >= Decimal::from(5) && cartons <= Decimal::from(10) {
        StockStatus::Low
    } else if cartons > Decimal::from(10) && cartons <= Decimal::from(threshold) {
        StockStatus::Warning
    } else {
        StockStatus::Normal
    }
}

/// Most urgent first, then fewest cartons.
pub fn critical_order(a: &(StockStatus, CartonSplit), b: &(StockStatus, CartonSplit)) -> Ordering {
    a.0.cmp(&b.0).then(a.1.cartons.cmp(&b.1.cartons))
}

/// `threshold` query value, defaulting when missing, malformed or not positive.
pub fn parse_threshold(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_CRITICAL_THRESHOLD)
}

// ---
// Row shaping
// ---

fn carry(out: &mut Row, src: &Row, columns: &[&str]) {
    for column in columns {
        out.set(*column, src.get(column).cloned().unwrap_or(Scalar::Null));
    }
}

/// A NULL quantity has no carton count; the piece column still reads 0.
fn push_split(out: &mut Row, cartons_col: &str, pieces_col: &str, quantity: Option<Decimal>, factor: Option<Decimal>) {
    match quantity {
        Some(q) => {
            let split = project(q, factor);
            out.set(cartons_col, split.cartons);
            out.set(pieces_col, split.pieces);
        }
        None => {
            out.set(cartons_col, Scalar::Null);
            out.set(pieces_col, Decimal::ZERO);
        }
    }
}

fn free_stock(row: &Row) -> Option<Decimal> {
    Some(row.decimal("QtyOnHand")? - row.decimal("QtyAllocated")? + row.decimal("QtyOnBackOrder")?)
}

pub fn project_stock_row(row: Row) -> Row {
    let factor = row.decimal("ConvFactAltUom");
    let on_hand = row.decimal("QtyOnHand");
    let allocated = row.decimal("QtyAllocated");
    let price = row.decimal("SellingPrice");

    let mut out = Row::new();
    carry(&mut out, &row, &["StockCode", "Description", "Warehouse"]);
    push_split(&mut out, "OnHandCS", "OnHandPcs", on_hand, factor);
    push_split(&mut out, "AllocCS", "AllocPcs", allocated, factor);
    push_split(&mut out, "StockFreeCS", "StockFreePCS", free_stock(&row), factor);

    let value = price.zip(on_hand).and_then(|(p, q)| p.checked_mul(q)).and_then(|v| v.checked_mul(VAT_MULTIPLIER));
    out.set("Value", value);

    let price_per_piece = price
        .zip(factor.filter(|f| !f.is_zero()))
        .and_then(|(p, f)| p.checked_div(f))
        .unwrap_or(Decimal::ZERO);
    out.set("Price/PCS", price_per_piece.checked_mul(VAT_MULTIPLIER).unwrap_or(Decimal::ZERO));
    out.set("PriceCS", price.and_then(|p| p.checked_mul(VAT_MULTIPLIER)));

    out.set("Config", row.get("AlternateUom").cloned().unwrap_or(Scalar::Null));
    out.set("IB/Cs", row.get("ConvFactOthUom").cloned().unwrap_or(Scalar::Null));

    let over_allocated = matches!(allocated.zip(on_hand), Some((a, h)) if a > h);
    out.set("Remarks", if over_allocated { OVER_ALLOCATED } else { "" });
    out
}

pub fn project_movement_row(row: Row) -> Row {
    let mut out = Row::new();
    carry(&mut out, &row, &["StockCode", "Description"]);
    push_split(&mut out, "CS", "PCS", row.decimal("TrnQty"), row.decimal("ConvFactAltUom"));
    out.set(
        "Amount",
        row.decimal("TrnValue").and_then(|v| v.checked_mul(VAT_MULTIPLIER)),
    );
    carry(
        &mut out,
        &row,
        &["SalesOrder", "Invoice", "Customer", "Salesperson", "Warehouse", "Operator", "DATE", "CreditReason"],
    );
    out
}

/// Classifies, ranks and cuts the candidates to the most urgent `CRITICAL_STOCK_LIMIT`.
pub fn rank_critical(rows: Vec<Row>, threshold: i64) -> Vec<Row> {
    let mut ranked: Vec<((StockStatus, CartonSplit), Row)> = rows
        .into_iter()
        .map(|row| {
            let factor = row.decimal("ConvFactAltUom");
            let split = project(row.decimal("QtyOnHand").unwrap_or(Decimal::ZERO), factor);
            ((classify(&split, threshold), split), row)
        })
        .collect();

    // Stable: ties keep the database order.
    ranked.sort_by(|a, b| critical_order(&a.0, &b.0));
    ranked.truncate(CRITICAL_STOCK_LIMIT);

    ranked
        .into_iter()
        .map(|((status, split), row)| {
            let factor = row.decimal("ConvFactAltUom");
            let mut out = Row::new();
            carry(&mut out, &row, &["StockCode", "Description", "Warehouse"]);
            out.set("OnHandCS", split.cartons);
            out.set("OnHandPcs", split.pieces);
            push_split(&mut out, "StockFreeCS", "StockFreePCS", free_stock(&row), factor);
            out.set("StockStatus", status.label());
            out
        })
        .collect()
}

// ---
// Service
// ---

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    tz: Tz,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, tz: Tz) -> Self {
        Self { inventory_repo, tz }
    }

    // --- STOCK ON HAND ---
    pub async fn list_stock(&self, params: &ReportParams) -> Result<Page, AppError> {
        let filters = STOCK_FILTERS.build(params, self.tz);
        let page = self
            .inventory_repo
            .stock_page(&filters, params.page_request(STOCK_PAGE_SIZE))
            .await?;
        Ok(page.map_rows(project_stock_row))
    }

    // --- MR RETURNS ---
    pub async fn list_mr_movements(&self, params: &ReportParams) -> Result<Page, AppError> {
        let filters = MOVEMENT_FILTERS.build(params, self.tz);
        let page = self
            .inventory_repo
            .mr_movements_page(&filters, params.page_request(MOVEMENT_PAGE_SIZE))
            .await?;
        Ok(page.map_rows(project_movement_row))
    }

    pub async fn warehouses(&self) -> Result<Vec<String>, AppError> {
        self.inventory_repo.warehouses().await
    }

    // --- CRITICAL STOCK ---
    pub async fn critical_stock(&self, params: &ReportParams) -> Result<CriticalStockReport, AppError> {
        let threshold = parse_threshold(params.threshold.as_deref());
        let candidates = self.inventory_repo.critical_candidates(threshold).await?;
        let data = rank_critical(candidates, threshold);

        tracing::debug!(threshold, rows = data.len(), "Critical stock ranked");
        Ok(CriticalStockReport { total: data.len(), data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::executor::testing::FakeExecutor;
    use std::sync::Arc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn split(cartons: &str, pieces: &str) -> CartonSplit {
        CartonSplit { cartons: d(cartons), pieces: d(pieces) }
    }

    #[test]
    fn projects_fractional_cartons_into_pieces() {
        assert_eq!(project(d("7.5"), Some(d("12"))), split("7", "6"));
        assert_eq!(project(d("0.25"), Some(d("24"))), split("0", "6"));
        assert_eq!(project(d("3"), Some(d("12"))), split("3", "0"));
    }

    #[test]
    fn projection_rounds_before_multiplying() {
        // 0.333 -> 0.33, 0.33 * 12 = 3.96 -> 4
        assert_eq!(project(d("1.333"), Some(d("12"))), split("1", "4"));
        // 0.125 -> 0.13, 0.13 * 6 = 0.78 -> 1
        assert_eq!(project(d("2.125"), Some(d("6"))), split("2", "1"));
    }

    #[test]
    fn projection_ignores_sign() {
        assert_eq!(project(d("-7.5"), Some(d("12"))), split("7", "6"));
    }

    #[test]
    fn zero_missing_or_negative_factor_gives_no_pieces() {
        assert_eq!(project(d("7.5"), Some(Decimal::ZERO)), split("7", "0"));
        assert_eq!(project(d("7.5"), None), split("7", "0"));
        assert_eq!(project(d("7.5"), Some(d("-12"))), split("7", "0"));
        assert_eq!(project(Decimal::ZERO, Some(d("12"))), split("0", "0"));
    }

    #[test]
    fn classification_boundaries() {
        let t = DEFAULT_CRITICAL_THRESHOLD;
        assert_eq!(classify(&split("0", "0"), t), StockStatus::NoStock);
        assert_eq!(classify(&split("0", "3"), t), StockStatus::Critical);
        assert_eq!(classify(&split("4", "0"), t), StockStatus::Normal);
        assert_eq!(classify(&split("5", "0"), t), StockStatus::Low);
        assert_eq!(classify(&split("10", "11"), t), StockStatus::Low);
        assert_eq!(classify(&split("11", "0"), t), StockStatus::Warning);
        assert_eq!(classify(&split("20", "0"), t), StockStatus::Warning);
        assert_eq!(classify(&split("21", "0"), t), StockStatus::Normal);
    }

    #[test]
    fn threshold_defaults() {
        assert_eq!(parse_threshold(None), 20);
        assert_eq!(parse_threshold(Some("abc")), 20);
        assert_eq!(parse_threshold(Some("0")), 20);
        assert_eq!(parse_threshold(Some("-4")), 20);
        assert_eq!(parse_threshold(Some("35")), 35);
    }

    fn stock(code: &str, on_hand: &str) -> Row {
        Row::new()
            .with("StockCode", code)
            .with("Description", format!("Item {}", code))
            .with("Warehouse", "M1")
            .with("QtyOnHand", d(on_hand))
            .with("QtyAllocated", Decimal::ZERO)
            .with("QtyOnBackOrder", Decimal::ZERO)
            .with("ConvFactAltUom", d("12"))
    }

    #[test]
    fn critical_ranking_puts_most_urgent_first() {
        let rows = vec![
            stock("A", "15"),
            stock("B", "0"),
            stock("C", "7"),
            stock("D", "0.5"),
            stock("E", "3"),
            stock("F", "6"),
        ];
        let ranked = rank_critical(rows, 20);
        let codes: Vec<_> = ranked.iter().map(|r| r.text("StockCode").unwrap().to_string()).collect();
        let statuses: Vec<_> = ranked.iter().map(|r| r.text("StockStatus").unwrap().to_string()).collect();

        assert_eq!(codes, vec!["B", "D", "F", "C", "A", "E"]);
        assert_eq!(statuses, vec!["No Stock", "Critical", "Low", "Low", "Warning", "Normal"]);
    }

    #[test]
    fn critical_ranking_caps_at_fifty() {
        let rows = (0..80).map(|i| stock(&format!("S{:03}", i), "0")).collect();
        assert_eq!(rank_critical(rows, 20).len(), CRITICAL_STOCK_LIMIT);
    }

    #[test]
    fn stock_row_derives_prices_and_remarks() {
        let row = Row::new()
            .with("StockCode", "A-1")
            .with("Description", "Soap")
            .with("Warehouse", "M1")
            .with("QtyOnHand", d("2.5"))
            .with("QtyAllocated", d("3"))
            .with("QtyOnBackOrder", d("1"))
            .with("ConvFactAltUom", d("12"))
            .with("SellingPrice", d("120"))
            .with("AlternateUom", "CS")
            .with("ConvFactOthUom", d("1"));

        let out = project_stock_row(row);

        assert_eq!(out.decimal("OnHandCS"), Some(d("2")));
        assert_eq!(out.decimal("OnHandPcs"), Some(d("6")));
        // free = 2.5 - 3 + 1 = 0.5
        assert_eq!(out.decimal("StockFreeCS"), Some(d("0")));
        assert_eq!(out.decimal("StockFreePCS"), Some(d("6")));
        assert_eq!(out.decimal("Value"), Some(d("336")));
        assert_eq!(out.decimal("Price/PCS"), Some(d("11.2")));
        assert_eq!(out.decimal("PriceCS"), Some(d("134.4")));
        assert_eq!(out.text("Config"), Some("CS"));
        assert_eq!(out.text("Remarks"), Some("OFR-OS QTY"));
        assert!(out.get("QtyOnHand").is_none());
    }

    #[test]
    fn stock_row_without_factor_prices_pieces_at_zero() {
        let row = stock("A", "4").with("ConvFactAltUom", Scalar::Null).with("SellingPrice", d("50"));
        let out = project_stock_row(row);
        assert_eq!(out.decimal("Price/PCS"), Some(Decimal::ZERO));
        assert_eq!(out.decimal("OnHandPcs"), Some(Decimal::ZERO));
        assert_eq!(out.text("Remarks"), Some(""));
    }

    #[test]
    fn movement_row_keeps_column_order() {
        let row = Row::new()
            .with("StockCode", "A-1")
            .with("Description", "Soap")
            .with("TrnQty", d("-1.5"))
            .with("ConvFactAltUom", d("24"))
            .with("TrnValue", d("-100"))
            .with("SalesOrder", "000123")
            .with("Invoice", "INV1")
            .with("Customer", "C1")
            .with("Salesperson", "F01")
            .with("Warehouse", "MR")
            .with("Operator", "ADMIN")
            .with("DATE", "01/15/2026")
            .with("CreditReason", Scalar::Null);

        let out = project_movement_row(row);

        assert_eq!(
            out.column_names().collect::<Vec<_>>(),
            vec![
                "StockCode", "Description", "CS", "PCS", "Amount", "SalesOrder", "Invoice", "Customer",
                "Salesperson", "Warehouse", "Operator", "DATE", "CreditReason"
            ]
        );
        assert_eq!(out.decimal("CS"), Some(d("1")));
        assert_eq!(out.decimal("PCS"), Some(d("12")));
        assert_eq!(out.decimal("Amount"), Some(d("-112")));
    }

    #[tokio::test]
    async fn critical_stock_report_counts_returned_rows() {
        let exec = Arc::new(FakeExecutor::new(|_| Ok(vec![stock("A", "0"), stock("B", "12")])));
        let service = InventoryService::new(InventoryRepository::new(exec.clone()), chrono_tz::UTC);

        let report = service
            .critical_stock(&ReportParams { threshold: Some("bogus".into()), ..ReportParams::default() })
            .await
            .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.data[0].text("StockStatus"), Some("No Stock"));
        assert_eq!(
            exec.queries()[0].param("threshold"),
            Some(&crate::db::query::SqlValue::Decimal(Decimal::from(20)))
        );
    }

    #[tokio::test]
    async fn list_stock_projects_every_row() {
        let exec = Arc::new(FakeExecutor::table(vec![stock("A", "1.5"), stock("B", "2")]));
        let service = InventoryService::new(InventoryRepository::new(exec), chrono_tz::UTC);

        let page = service.list_stock(&ReportParams::default()).await.unwrap();

        assert_eq!(page.page_size, STOCK_PAGE_SIZE);
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].decimal("OnHandPcs"), Some(d("6")));
    }
}
