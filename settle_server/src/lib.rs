//! # Settle server
//! This crate hosts the network surface of the Settle engine. It is responsible for:
//! * Accepting raw payment logs from the chain relay and feeding them to the payment monitor.
//! * Running the payment monitor, which reconciles bills against the chain on a fixed interval.
//! * Holding the live WebSocket connections of staff dashboards and guest views, fanning out bill notifications to
//!   them through the connection hub.
//! * Computing bill splits on request.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/ws?rooms=..`: WebSocket upgrade for live bill notifications.
//! * `/chain/events`: The (HMAC-signed) relay webhook that delivers payment logs.
//! * `/api/bills/{id}/confirmation`: The (HMAC-signed) relay call announcing a confirmed transaction.
//! * `/api/bills/{id}/split`: Splits a bill between diners.

pub mod chain_relay;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod ws;

#[cfg(test)]
mod endpoint_tests;
