//! HTTP handlers

mod deals;
mod health;
mod inventory;
mod investors;
mod payments;
mod requests;
mod users;

pub use deals::*;
pub use health::*;
pub use inventory::*;
pub use investors::*;
pub use payments::*;
pub use requests::*;
pub use users::*;
