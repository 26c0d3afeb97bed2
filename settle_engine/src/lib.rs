//! Settle Engine
//!
//! The settle engine keeps a restaurant's off-chain bill ledger in step with an on-chain payment contract, and pushes
//! live payment status to staff dashboards and guest views. It is transport-agnostic: the HTTP and WebSocket surface
//! lives in the server crate.
//!
//! The library is divided into these sections:
//! 1. Bill storage ([`mod@db`]). The engine only needs a small query/update contract, [`BillStore`]. A SQLite backend
//!    is provided, along with an in-memory store for tests. The data types are defined in [`mod@db_types`].
//! 2. The chain contract ([`mod@chain`]). A [`ChainClient`] delivers payment events and answers "how much has been
//!    paid against this bill?".
//! 3. Bill splitting ([`mod@split`]). Pure functions that divide a bill between its guests.
//! 4. The connection hub ([`mod@hub`]). A single-writer actor that fans notifications out to viewers by room.
//! 5. The payment monitor ([`mod@monitor`]). Applies payment events to bills, and periodically reconciles every
//!    unsettled bill against the chain.
//!
//! The engine also emits events when a bill's payment status changes (see [`mod@events`]), so that host code can hook
//! in its own side effects, such as sending receipts.
pub mod chain;
pub mod db;
pub mod db_types;
pub mod events;
pub mod hub;
pub mod monitor;
pub mod split;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use chain::{ChainClient, ChainError, EventFeed, PaymentEvent, RawPaymentLog, Subscription};
#[cfg(any(feature = "test_utils", test))]
pub use db::memory::MemoryBillStore;
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::{BillStore, StoreError};
pub use hub::{ConnectionHub, HubConfig, HubError, HubHandle, Notification, Room};
pub use monitor::{MonitorConfig, MonitorError, PaymentMonitor, SweepReport};
pub use split::{SplitError, SplitRequest, SplitResult};
