//! Persistence for bills.
//!
//! The engine only needs a narrow query/update contract, captured by [`BillStore`]. Bills, their items and tables are
//! created by the ordering flow elsewhere in the platform; the engine reads them and updates the payment fields.
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use traits::{BillStore, StoreError};
