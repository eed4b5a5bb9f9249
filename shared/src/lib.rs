//! Shared domain types for the inventory service
//!
//! Pure models and rules: stock counter arithmetic, workflow status tables,
//! receipt and transfer evaluation, alert priority. No I/O lives here.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
