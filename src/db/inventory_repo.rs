// src/db/inventory_repo.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{
        executor::{QueryExecutor, Row},
        filters::{FilterSet, FilterSpec},
        pagination::{Page, PageRequest, PaginatedQuery},
        query::{CmpOp, Direction, OrderBy, Predicate, SqlBuilder},
    },
};

pub const CRITICAL_WAREHOUSE: &str = "M1";
pub const MR_WAREHOUSE: &str = "MR";

// ---
// Stock on hand
// ---

const STOCK_SOURCE: &str = "InvWarehouse \
     INNER JOIN InvMaster ON InvWarehouse.StockCode = InvMaster.StockCode \
     INNER JOIN InvPrice ON InvWarehouse.StockCode = InvPrice.StockCode";

// Raw quantities; the carton/piece split happens in the service.
const STOCK_PROJECTION: &str = r#"InvWarehouse.StockCode AS "StockCode", InvMaster.Description AS "Description", InvWarehouse.Warehouse AS "Warehouse", InvWarehouse.QtyOnHand AS "QtyOnHand", InvWarehouse.QtyAllocated AS "QtyAllocated", InvWarehouse.QtyOnBackOrder AS "QtyOnBackOrder", InvMaster.ConvFactAltUom AS "ConvFactAltUom", InvPrice.SellingPrice AS "SellingPrice", InvMaster.AlternateUom AS "AlternateUom", InvMaster.ConvFactOthUom AS "ConvFactOthUom""#;

pub const STOCK_FILTERS: FilterSpec = FilterSpec {
    date_column: None,
    search_columns: &["InvWarehouse.StockCode", "InvMaster.Description"],
    warehouse_column: Some("InvWarehouse.Warehouse"),
};

/// Stocked, sellable lines with a base price.
fn stock_rules() -> Vec<Predicate> {
    vec![
        Predicate::compare("InvWarehouse.QtyOnHand", CmpOp::NotEq, "zeroQty", Decimal::ZERO),
        Predicate::compare("InvMaster.ProductClass", CmpOp::NotEq, "excludedClass", "TS"),
        Predicate::eq("InvPrice.PriceCode", "priceCode", "1"),
    ]
}

fn stock_query() -> PaginatedQuery {
    stock_rules().into_iter().fold(
        PaginatedQuery::new(
            STOCK_PROJECTION,
            STOCK_SOURCE,
            OrderBy::by("InvMaster.Description", Direction::Asc)
                .then("InvWarehouse.Warehouse", Direction::Asc)
                .then("InvWarehouse.StockCode", Direction::Asc),
        ),
        PaginatedQuery::with_fixed,
    )
}

// ---
// MR movements
// ---

const MOVEMENT_SOURCE: &str = "InvMovements imv \
     JOIN ArTrnSummary ats ON ats.SalesOrder = imv.SalesOrder \
     JOIN InvMaster im ON im.StockCode = imv.StockCode \
     LEFT JOIN SorAdditions sa ON sa.SalesOrder = imv.SalesOrder AND sa.StockCode = imv.StockCode";

const MOVEMENT_PROJECTION: &str = r#"sa.StockCode AS "StockCode", sa.Description AS "Description", imv.TrnQty AS "TrnQty", im.ConvFactAltUom AS "ConvFactAltUom", imv.TrnValue AS "TrnValue", ats.SalesOrder AS "SalesOrder", ats.Invoice AS "Invoice", ats.Customer AS "Customer", ats.Salesperson AS "Salesperson", imv.Warehouse AS "Warehouse", ats.Operator AS "Operator", to_char(imv.EntryDate, 'MM/DD/YYYY') AS "DATE", sa.CreditReason AS "CreditReason""#;

pub const MOVEMENT_FILTERS: FilterSpec = FilterSpec {
    date_column: Some("imv.EntryDate"),
    search_columns: &["sa.StockCode", "ats.Operator"],
    warehouse_column: None,
};

fn movement_query() -> PaginatedQuery {
    PaginatedQuery::new(
        MOVEMENT_PROJECTION,
        MOVEMENT_SOURCE,
        // The trailing keys identify one movement, one summary row and one order line, so
        // pages never overlap.
        OrderBy::by("ats.Invoice", Direction::Asc)
            .then("imv.StockCode", Direction::Asc)
            .then("imv.EntryDate", Direction::Asc)
            .then("imv.TrnYear", Direction::Asc)
            .then("imv.TrnMonth", Direction::Asc)
            .then("imv.TrnTime", Direction::Asc)
            .then("imv.MovementType", Direction::Asc)
            .then("ats.Customer", Direction::Asc)
            .then("sa.SalesOrderLine", Direction::Asc),
    )
    .with_fixed(Predicate::eq("imv.Warehouse", "mrWarehouse", MR_WAREHOUSE))
    .with_fixed(Predicate::compare("imv.TrnQty", CmpOp::Lt, "zeroQty", Decimal::ZERO))
    .with_fixed(Predicate::NotNull { column: "sa.StockCode" })
}

#[derive(Clone)]
pub struct InventoryRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl InventoryRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn stock_page(&self, filters: &FilterSet, request: PageRequest) -> Result<Page, AppError> {
        stock_query().run(self.executor.as_ref(), filters, request).await
    }

    pub async fn mr_movements_page(&self, filters: &FilterSet, request: PageRequest) -> Result<Page, AppError> {
        movement_query().run(self.executor.as_ref(), filters, request).await
    }

    pub async fn warehouses(&self) -> Result<Vec<String>, AppError> {
        let mut qb = SqlBuilder::new(r#"SELECT DISTINCT InvWarehouse.Warehouse AS "Warehouse" FROM InvWarehouse"#);
        qb.push_where(&[Predicate::compare("InvWarehouse.QtyOnHand", CmpOp::NotEq, "zeroQty", Decimal::ZERO)]);
        qb.push(r#" ORDER BY "Warehouse" ASC"#);

        let rows = self.executor.fetch_all(&qb.build()).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.text("Warehouse"))
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect())
    }

    /// M1 lines whose whole-carton count is within `threshold`. Ranking and the final cut
    /// are left to the caller.
    pub async fn critical_candidates(&self, threshold: i64) -> Result<Vec<Row>, AppError> {
        let mut predicates = stock_rules();
        predicates.push(Predicate::eq("InvWarehouse.Warehouse", "warehouse", CRITICAL_WAREHOUSE));
        predicates.push(Predicate::compare(
            "FLOOR(ABS(InvWarehouse.QtyOnHand))",
            CmpOp::Le,
            "threshold",
            Decimal::from(threshold),
        ));

        let mut qb = SqlBuilder::new(format!("SELECT {} FROM {}", STOCK_PROJECTION, STOCK_SOURCE));
        qb.push_where(&predicates);
        qb.push(" ORDER BY ").push(
            &OrderBy::by("FLOOR(ABS(InvWarehouse.QtyOnHand))", Direction::Asc)
                .then("InvWarehouse.StockCode", Direction::Asc)
                .to_sql(),
        );

        self.executor.fetch_all(&qb.build()).await
    }
}
