//! Business logic services for the Realty CRM

pub mod allocation;
pub mod deals;
pub mod inventory;
pub mod investors;
pub mod legacy;
pub mod payments;
mod plots;
pub mod requests;
pub mod users;

pub use allocation::AllocationService;
pub use deals::DealService;
pub use inventory::InventoryService;
pub use investors::InvestorService;
pub use legacy::LegacyPlotMigration;
pub use payments::PaymentService;
pub use requests::RequestService;
pub use users::UserService;
