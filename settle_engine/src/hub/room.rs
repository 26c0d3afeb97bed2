use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A broadcast address. Rooms are plain string keys, derived from the id of a business, a table or a bill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Room(String);

impl Room {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Staff dashboards for a business.
    pub fn business(business_id: i64) -> Self {
        Self(format!("business:{business_id}"))
    }

    /// Guest views at a table, keyed by the table's code.
    pub fn table(code: &str) -> Self {
        Self(format!("table:{code}"))
    }

    /// Anyone following a single bill.
    pub fn bill(bill_id: i64) -> Self {
        Self(format!("bill:{bill_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Room {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Room {
    fn from(value: String) -> Self {
        Self(value)
    }
}
