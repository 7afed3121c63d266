// src/db/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::{
        executor::{QueryExecutor, Row, Scalar},
        filters::FilterSet,
        query::{BoundQuery, OrderBy, Param, Predicate, SqlBuilder},
    },
};

pub const MAX_PAGE_SIZE: i64 = 500;

// ---
// PageRequest
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Clamps both values to at least 1, and the page size to `MAX_PAGE_SIZE`.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Non-numeric or non-positive inputs fall back to the defaults.
    pub fn from_raw(page: Option<&str>, page_size: Option<&str>, default_page_size: i64) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
        };
        Self::new(
            parse(page).unwrap_or(1),
            parse(page_size).unwrap_or(default_page_size),
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

// ---
// Page envelope
// ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Page {
    pub fn new(data: Vec<Row>, total: i64, request: PageRequest) -> Self {
        let total = total.max(0);
        let total_pages = total_pages(total, request.page_size);
        Self {
            data,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
            has_next_page: request.page < total_pages,
            has_previous_page: request.page > 1,
        }
    }

    pub fn map_rows(mut self, f: impl FnMut(Row) -> Row) -> Self {
        self.data = self.data.into_iter().map(f).collect();
        self
    }
}

/// `ceil(total / page_size)`, 0 only when there are no rows.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let page_size = page_size.max(1);
    (total + page_size - 1) / page_size
}

// ---
// Query shape
// ---

/// A report query: projection, FROM/JOIN text, domain predicates that always apply,
/// and a total order. `OrderBy` cannot be empty, so every page is deterministic.
#[derive(Debug, Clone)]
pub struct PaginatedQuery {
    projection: &'static str,
    source: &'static str,
    fixed: Vec<Predicate>,
    order: OrderBy,
}

impl PaginatedQuery {
    pub fn new(projection: &'static str, source: &'static str, order: OrderBy) -> Self {
        Self { projection, source, fixed: Vec::new(), order }
    }

    pub fn with_fixed(mut self, predicate: Predicate) -> Self {
        self.fixed.push(predicate);
        self
    }

    pub fn count_query(&self, filters: &FilterSet) -> BoundQuery {
        let mut qb = SqlBuilder::new(format!("SELECT COUNT(*) AS total FROM {}", self.source));
        qb.push_where(self.fixed.iter().chain(filters.predicates()));
        qb.build()
    }

    pub fn window_query(&self, filters: &FilterSet, request: PageRequest) -> BoundQuery {
        let mut qb = SqlBuilder::new(format!("SELECT {} FROM {}", self.projection, self.source));
        qb.push_where(self.fixed.iter().chain(filters.predicates()));
        qb.push(" ORDER BY ").push(&self.order.to_sql());
        qb.push(" LIMIT ").push_bind(Param::new("pageSize", request.page_size));
        qb.push(" OFFSET ").push_bind(Param::new("offset", request.offset()));
        qb.build()
    }

    /// Runs the count and the window concurrently and assembles the envelope.
    pub async fn run(
        &self,
        executor: &dyn QueryExecutor,
        filters: &FilterSet,
        request: PageRequest,
    ) -> Result<Page, AppError> {
        let count = self.count_query(filters);
        let window = self.window_query(filters, request);

        let (count_rows, data) =
            tokio::try_join!(executor.fetch_all(&count), executor.fetch_all(&window))?;

        let total = count_rows
            .first()
            .and_then(|r| r.get("total"))
            .and_then(Scalar::as_i64)
            .unwrap_or(0);

        tracing::debug!(
            total,
            page = request.page,
            page_size = request.page_size,
            filters = ?filters.named_params().iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Page loaded"
        );

        Ok(Page::new(data, total, request))
    }
}
