//! The chain collaborator used by the running server.
//!
//! Payment logs are pushed to us: the relay posts them to the `/chain/events` webhook, which drops them into an
//! [`EventFeed`]. Authoritative totals are pulled: a sweep asks the relay for `GET {relay_url}/bills/{id}/total_paid`.
use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use settle_common::Money;
use settle_engine::{events::Handler, ChainClient, ChainError, EventFeed, PaymentEvent, Subscription};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalPaidResponse {
    pub bill_id: i64,
    pub total_paid: Money,
}

#[derive(Clone)]
pub struct RelayChainClient {
    feed: EventFeed,
    client: Arc<Client>,
    base_url: String,
}

impl RelayChainClient {
    pub fn new(relay_url: &str, feed: EventFeed, timeout: Duration) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create the relay client. {e}")))?;
        let base_url = relay_url.trim_end_matches('/').to_string();
        Ok(Self { feed, client: Arc::new(client), base_url })
    }

    fn total_paid_url(&self, bill_id: i64) -> String {
        format!("{}/bills/{bill_id}/total_paid", self.base_url)
    }
}

impl ChainClient for RelayChainClient {
    async fn monitor_payments(&self, handler: Handler<PaymentEvent>) -> Result<Subscription, ChainError> {
        info!("⛓️ Subscribing to relayed payment events");
        self.feed.subscribe(handler)
    }

    async fn bill_total_paid(&self, bill_id: i64) -> Result<Money, ChainError> {
        let url = self.total_paid_url(bill_id);
        trace!("⛓️ Querying {url}");
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ChainError::Timeout
            } else {
                ChainError::QueryFailed(format!("Relay request for bill #{bill_id} failed. {e}"))
            }
        })?;
        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<TotalPaidResponse>()
                    .await
                    .map_err(|e| ChainError::QueryFailed(format!("Relay sent an invalid total for #{bill_id}. {e}")))?;
                if body.bill_id != bill_id {
                    return Err(ChainError::QueryFailed(format!(
                        "Asked the relay for bill #{bill_id} but it answered for #{}",
                        body.bill_id
                    )));
                }
                Ok(body.total_paid)
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                debug!("⛓️ Relay answered {status} for bill #{bill_id}. {message}");
                Err(ChainError::QueryFailed(format!("Relay answered {status} for bill #{bill_id}")))
            },
        }
    }
}
