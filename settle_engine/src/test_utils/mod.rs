//! Helpers for tests, in this crate and downstream. Enabled with the `test_utils` feature.
mod mock_chain;
mod prepare_env;

pub use mock_chain::{payment_event, payment_log, MockChain};
#[cfg(feature = "sqlite")]
pub use prepare_env::memory_database;
pub use prepare_env::prepare_test_env;
