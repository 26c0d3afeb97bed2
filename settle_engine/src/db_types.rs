use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use settle_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      BillStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// The bill is open and no payments have been recorded against it.
    Open,
    /// Some, but not all, of the bill total has been paid.
    Partial,
    /// The amount paid has reached the bill total.
    Paid,
    /// The bill has been closed by staff. Closed bills are immutable.
    Closed,
}

impl BillStatus {
    /// The status implied by the amount paid so far. This never yields `Closed`; closing a bill is a staff action.
    pub fn for_amounts(paid: Money, total: Money) -> Self {
        if paid >= total {
            BillStatus::Paid
        } else if paid > Money::ZERO {
            BillStatus::Partial
        } else {
            BillStatus::Open
        }
    }

    /// Open and partially paid bills are the ones the reconciliation sweep looks after.
    pub fn is_settling(&self) -> bool {
        matches!(self, BillStatus::Open | BillStatus::Partial)
    }
}

impl Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillStatus::Open => write!(f, "open"),
            BillStatus::Partial => write!(f, "partial"),
            BillStatus::Paid => write!(f, "paid"),
            BillStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid bill status: {0}")]
pub struct ConversionError(String);

impl FromStr for BillStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "closed" => Ok(Self::Closed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for BillStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid bill status: {value}. But this conversion cannot fail. Defaulting to Open");
            BillStatus::Open
        })
    }
}

//--------------------------------------       BillItem        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BillItem {
    pub id: i64,
    pub bill_id: i64,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// The line subtotal, `unit_price * quantity`, as recorded when the item was ordered.
    pub subtotal: Money,
}

impl BillItem {
    pub fn new<S: Into<String>>(id: i64, bill_id: i64, name: S, unit_price: Money, quantity: i64) -> Self {
        Self { id, bill_id, name: name.into(), unit_price, quantity, subtotal: unit_price * quantity }
    }
}

//--------------------------------------         Bill          -------------------------------------------------------
/// The off-chain record of a table's order and its running payment status.
///
/// `subtotal`, `tax_amount`, `service_fee_amount` and `total_amount` are fixed when the bill is opened.
/// `paid_amount`, `tip_amount` and `status` are only ever changed by the payment monitor.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub business_id: i64,
    pub table_id: i64,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub service_fee_amount: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub tip_amount: Money,
    pub status: BillStatus,
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<BillItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// The unpaid balance. Overpayments leave nothing remaining rather than a negative balance.
    pub fn remaining(&self) -> Money {
        if self.paid_amount >= self.total_amount {
            Money::ZERO
        } else {
            self.total_amount - self.paid_amount
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == BillStatus::Closed
    }

    /// Records a payment seen on-chain. Everything the guest sent, tip included, counts towards the paid amount, which
    /// is also what the contract reports as the bill's total paid. The tip is tracked on its own as well.
    pub fn apply_payment(&mut self, amount: Money, tip: Money) {
        self.paid_amount += amount + tip;
        self.tip_amount += tip;
        self.refresh_status();
    }

    /// Overwrites the paid amount with an authoritative total.
    pub fn set_paid_amount(&mut self, amount: Money) {
        self.paid_amount = amount;
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        if !self.is_closed() {
            self.status = BillStatus::for_amounts(self.paid_amount, self.total_amount);
        }
    }

    pub fn with_items(mut self, items: Vec<BillItem>) -> Self {
        self.items = items;
        self
    }
}

//--------------------------------------        NewBill        -------------------------------------------------------
/// A bill as submitted by the ordering flow. The total is derived, never supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBill {
    pub business_id: i64,
    pub table_id: i64,
    pub tax_amount: Money,
    pub service_fee_amount: Money,
    pub items: Vec<NewBillItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBillItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl NewBill {
    pub fn new(business_id: i64, table_id: i64) -> Self {
        Self { business_id, table_id, tax_amount: Money::ZERO, service_fee_amount: Money::ZERO, items: Vec::new() }
    }

    pub fn with_item<S: Into<String>>(mut self, name: S, unit_price: Money, quantity: i64) -> Self {
        self.items.push(NewBillItem { name: name.into(), unit_price, quantity });
        self
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax_amount = tax;
        self
    }

    pub fn with_service_fee(mut self, fee: Money) -> Self {
        self.service_fee_amount = fee;
        self
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.unit_price * i.quantity).sum()
    }

    pub fn total(&self) -> Money {
        self.subtotal() + self.tax_amount + self.service_fee_amount
    }
}

//--------------------------------------         Table         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub business_id: i64,
    /// The short code printed on the table's QR card. Guest views subscribe to the table by this code.
    pub code: String,
    pub name: String,
}
