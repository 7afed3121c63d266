pub mod dashboard;
pub mod inventory;
pub mod orders;
