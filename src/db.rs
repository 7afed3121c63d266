pub mod executor;
pub mod filters;
pub mod pagination;
pub mod query;

pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod orders_repo;
pub use orders_repo::OrdersRepository;
