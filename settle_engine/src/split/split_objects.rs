use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use settle_common::Money;

use crate::db_types::BillItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    Equal,
    Custom,
    Items,
}

/// One participant's share of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSplit {
    pub person_id: String,
    pub name: String,
    pub amount: Money,
    pub tax_share: Money,
    pub service_fee_share: Money,
    pub subtotal_share: Money,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub items: Option<Vec<BillItem>>,
}

/// The outcome of splitting a bill. The split amounts always add up to `total_amount` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResult {
    pub method: SplitMethod,
    pub bill_id: i64,
    pub total_amount: Money,
    pub splits: Vec<PersonSplit>,
}

impl SplitResult {
    pub fn allocated(&self) -> Money {
        self.splits.iter().map(|s| s.amount).sum()
    }

    pub fn amounts(&self) -> Vec<Money> {
        self.splits.iter().map(|s| s.amount).collect()
    }
}

/// A split request as it arrives over the wire, tagged by `method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SplitRequest {
    Equal {
        num_people: u32,
    },
    Custom {
        amounts: BTreeMap<String, Money>,
        #[serde(default)]
        labels: HashMap<String, String>,
    },
    Items {
        assignments: BTreeMap<String, Vec<i64>>,
        #[serde(default)]
        labels: HashMap<String, String>,
    },
}

impl SplitRequest {
    pub fn method(&self) -> SplitMethod {
        match self {
            SplitRequest::Equal { .. } => SplitMethod::Equal,
            SplitRequest::Custom { .. } => SplitMethod::Custom,
            SplitRequest::Items { .. } => SplitMethod::Items,
        }
    }
}
