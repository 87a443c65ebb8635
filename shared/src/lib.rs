//! Shared types and models for the Realty CRM
//!
//! This crate holds the domain rules of the inventory allocation and
//! investor funding ledger. It is shared between the backend, the browser
//! (via WASM) and the test suites, and has no database or HTTP dependencies.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
