// src/models/orders.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::executor::Row;

/// One pending sales order: the SorMaster header plus its valued lines, VAT included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderDetails {
    #[schema(value_type = Object)]
    pub header: Row,
    #[schema(value_type = Vec<Object>)]
    pub line_items: Vec<Row>,
}
