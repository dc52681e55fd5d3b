//! Simulated order executor: fills at the asset's last observed close,
//! optionally after a configurable confirmation delay.

use std::collections::BTreeMap;

use crate::domain::bar::PriceBar;
use crate::domain::error::NinetraderError;
use crate::domain::order::{Fill, OrderId, OrderIntent, OrderStatus};
use crate::ports::order_executor::OrderExecutor;

struct PendingOrder {
    asset: String,
    bars_remaining: u32,
}

pub struct SimulatedExecutor {
    fill_delay_bars: u32,
    last: BTreeMap<String, PriceBar>,
    pending: BTreeMap<OrderId, PendingOrder>,
    next_id: OrderId,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::with_fill_delay(0)
    }

    /// Orders confirm `fill_delay_bars` bars after submission instead of
    /// immediately, for exercising pending-order handling.
    pub fn with_fill_delay(fill_delay_bars: u32) -> Self {
        Self {
            fill_delay_bars,
            last: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn fill_at_last(&self, asset: &str) -> Result<OrderStatus, NinetraderError> {
        let bar = self.last.get(asset).ok_or_else(|| NinetraderError::Transport {
            reason: format!("no market data observed for {asset}"),
        })?;
        Ok(OrderStatus::Filled(Fill {
            price: bar.close,
            timestamp: bar.timestamp,
        }))
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderExecutor for SimulatedExecutor {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(OrderId, OrderStatus), NinetraderError> {
        let id = self.next_id;
        self.next_id += 1;

        if !self.last.contains_key(&intent.asset) {
            return Ok((
                id,
                OrderStatus::Rejected {
                    reason: format!("unknown asset {}", intent.asset),
                },
            ));
        }

        if self.fill_delay_bars == 0 {
            let status = self.fill_at_last(&intent.asset)?;
            return Ok((id, status));
        }

        self.pending.insert(
            id,
            PendingOrder {
                asset: intent.asset.clone(),
                bars_remaining: self.fill_delay_bars,
            },
        );
        Ok((id, OrderStatus::Pending))
    }

    fn poll(&mut self, id: OrderId) -> Result<OrderStatus, NinetraderError> {
        let Some(order) = self.pending.get_mut(&id) else {
            return Err(NinetraderError::Transport {
                reason: format!("poll for unknown order {id}"),
            });
        };
        order.bars_remaining -= 1;
        if order.bars_remaining > 0 {
            return Ok(OrderStatus::Pending);
        }
        let asset = order.asset.clone();
        self.pending.remove(&id);
        self.fill_at_last(&asset)
    }

    fn cancel(&mut self, id: OrderId) -> Result<(), NinetraderError> {
        self.pending.remove(&id);
        Ok(())
    }

    fn observe(&mut self, bar: &PriceBar) {
        self.last.insert(bar.asset.clone(), bar.clone());
    }
}
