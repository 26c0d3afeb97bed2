//! The on-chain side of bill settlement.
//!
//! The payment contract is the source of truth for how much has been paid against a bill. The engine only ever reads
//! from it, through a [`ChainClient`]: a push subscription to payment events, and a point-in-time query of a bill's
//! total paid.
mod chain_client;
mod errors;
mod event_feed;
mod payment_event;

pub use chain_client::{ChainClient, Subscription};
pub use errors::ChainError;
pub use event_feed::EventFeed;
pub use payment_event::{PaymentEvent, RawPaymentLog};
