use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settle_common::Money;

use crate::{
    chain::PaymentEvent,
    db_types::{Bill, BillStatus},
};

/// The messages pushed to viewers. Each serializes to a JSON object with a `type` field naming the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A discrete payment, for staff dashboards.
    PaymentReceived {
        bill_id: i64,
        tx_hash: String,
        amount: Money,
        tip_amount: Money,
        payer: String,
        status: BillStatus,
        timestamp: DateTime<Utc>,
    },
    /// The running balance of a bill, for guest views.
    BillUpdate {
        bill_id: i64,
        status: BillStatus,
        paid_amount: Money,
        tip_amount: Money,
        total_amount: Money,
        remaining_amount: Money,
        timestamp: DateTime<Utc>,
    },
    /// An out-of-band confirmation that a payment transaction has been finalised.
    PaymentConfirmed { bill_id: i64, tx_hash: String, status: BillStatus, timestamp: DateTime<Utc> },
}

impl Notification {
    pub fn payment_received(event: &PaymentEvent, bill: &Bill) -> Self {
        Self::PaymentReceived {
            bill_id: bill.id,
            tx_hash: event.tx_hash.clone(),
            amount: event.amount,
            tip_amount: event.tip_amount,
            payer: event.payer.clone(),
            status: bill.status,
            timestamp: Utc::now(),
        }
    }

    pub fn bill_update(bill: &Bill) -> Self {
        Self::BillUpdate {
            bill_id: bill.id,
            status: bill.status,
            paid_amount: bill.paid_amount,
            tip_amount: bill.tip_amount,
            total_amount: bill.total_amount,
            remaining_amount: bill.remaining(),
            timestamp: Utc::now(),
        }
    }

    pub fn payment_confirmed(bill: &Bill, tx_hash: &str) -> Self {
        Self::PaymentConfirmed {
            bill_id: bill.id,
            tx_hash: tx_hash.to_string(),
            status: bill.status,
            timestamp: Utc::now(),
        }
    }

    pub fn bill_id(&self) -> i64 {
        match self {
            Self::PaymentReceived { bill_id, .. }
            | Self::BillUpdate { bill_id, .. }
            | Self::PaymentConfirmed { bill_id, .. } => *bill_id,
        }
    }
}
