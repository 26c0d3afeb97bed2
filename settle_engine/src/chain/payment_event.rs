use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use settle_common::Money;

use crate::chain::ChainError;

/// A decoded payment made against a bill on-chain.
///
/// Events are a trigger to update the bill, not a record in their own right. They may be delivered more than once,
/// and some may never be delivered at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub bill_id: i64,
    pub payer: String,
    pub amount: Money,
    pub tip_amount: Money,
    pub platform_fee: Money,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
}

/// A payment log as relayed from the chain indexer, before validation. Amounts are decimal strings and the timestamp
/// is in unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPaymentLog {
    pub bill_id: i64,
    pub payer: String,
    pub amount: String,
    #[serde(default)]
    pub tip_amount: Option<String>,
    #[serde(default)]
    pub platform_fee: Option<String>,
    pub timestamp: i64,
    pub tx_hash: String,
}

fn parse_amount(field: &str, value: Option<&str>) -> Result<Money, ChainError> {
    let Some(value) = value else {
        return Ok(Money::ZERO);
    };
    let amount = value
        .parse::<Money>()
        .map_err(|e| ChainError::MalformedEvent(format!("{field} is not a valid amount. {e}")))?;
    if amount.is_negative() {
        return Err(ChainError::MalformedEvent(format!("{field} is negative ({amount})")));
    }
    Ok(amount)
}

fn check_hex(field: &str, value: &str, pattern: &str) -> Result<(), ChainError> {
    let re = Regex::new(pattern).map_err(|e| ChainError::MalformedEvent(e.to_string()))?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ChainError::MalformedEvent(format!("{field} '{value}' is not well formed")))
    }
}

impl TryFrom<RawPaymentLog> for PaymentEvent {
    type Error = ChainError;

    fn try_from(raw: RawPaymentLog) -> Result<Self, Self::Error> {
        check_hex("tx_hash", &raw.tx_hash, r"^0x[0-9a-fA-F]{64}$")?;
        check_hex("payer", &raw.payer, r"^0x[0-9a-fA-F]{40}$")?;
        if raw.bill_id <= 0 {
            return Err(ChainError::MalformedEvent(format!("bill id {} is not valid", raw.bill_id)));
        }
        let amount = parse_amount("amount", Some(&raw.amount))?;
        let tip_amount = parse_amount("tip_amount", raw.tip_amount.as_deref())?;
        let platform_fee = parse_amount("platform_fee", raw.platform_fee.as_deref())?;
        let timestamp = DateTime::from_timestamp(raw.timestamp, 0)
            .ok_or_else(|| ChainError::MalformedEvent(format!("timestamp {} is out of range", raw.timestamp)))?;
        Ok(Self {
            bill_id: raw.bill_id,
            payer: raw.payer.to_lowercase(),
            amount,
            tip_amount,
            platform_fee,
            timestamp,
            tx_hash: raw.tx_hash.to_lowercase(),
        })
    }
}
