//! Domain models for the Realty CRM

mod assignment;
mod deal;
mod inventory;
mod investor;
mod payment;
mod plot;
mod request;
mod user;

pub use assignment::*;
pub use deal::*;
pub use inventory::*;
pub use investor::*;
pub use payment::*;
pub use plot::*;
pub use request::*;
pub use user::*;
