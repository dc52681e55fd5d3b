//! Order intents and execution outcomes exchanged with the executor port.

use chrono::NaiveDateTime;
use std::fmt;

pub type OrderId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A market order request. The core only ever submits market orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub asset: String,
    pub side: OrderSide,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Filled(Fill),
    Pending,
    Rejected { reason: String },
}
