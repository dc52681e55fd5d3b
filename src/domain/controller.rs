//! Per-asset risk-managed position state machine: entry sizing, initial stop
//! placement, trailing-stop ratchet, and exit on stop breach or signal.

use super::allocator::CapitalAllocator;
use super::bar::PriceBar;
use super::error::NinetraderError;
use super::order::{Fill, OrderId, OrderIntent, OrderSide, OrderStatus};
use super::position::{ExitReason, Position, TradeRecord};
use super::signal::{Polarity, Signal};
use super::volatility::AtrTracker;
use crate::ports::order_executor::OrderExecutor;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub volatility_period: usize,
    pub stop_multiplier: f64,
    pub max_loss_fraction: f64,
    pub min_profit_activation: f64,
    pub trailing_enabled: bool,
    pub order_timeout_bars: u32,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            volatility_period: 14,
            stop_multiplier: 2.5,
            max_loss_fraction: 0.03,
            min_profit_activation: 0.01,
            trailing_enabled: true,
            order_timeout_bars: 3,
        }
    }
}

/// What the controller did this bar; the orchestrator applies fills and
/// closes to the allocator and trade log, and holds/releases the shared
/// pool around unconfirmed entries.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    EntryPending { quantity: i64 },
    Entered { quantity: i64, fill_price: f64 },
    Closed(TradeRecord),
    OrderFailed { side: OrderSide, reason: String },
}

#[derive(Debug, Clone)]
enum State {
    Flat,
    PendingEntry {
        order_id: OrderId,
        quantity: i64,
        bars_waiting: u32,
    },
    Long(Position),
    PendingExit {
        order_id: OrderId,
        position: Position,
        reason: ExitReason,
        bars_waiting: u32,
    },
}

/// Long-only controller for a single asset. While an order is unresolved no
/// further entry/exit decision is evaluated (one in-flight order per asset).
#[derive(Debug)]
pub struct PositionController {
    asset: String,
    params: RiskParams,
    atr: AtrTracker,
    state: State,
    order_failures: u32,
}

impl PositionController {
    pub fn new(asset: &str, params: RiskParams) -> Self {
        let atr = AtrTracker::new(params.volatility_period);
        Self {
            asset: asset.to_string(),
            params,
            atr,
            state: State::Flat,
            order_failures: 0,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            State::Long(position) | State::PendingExit { position, .. } => Some(position),
            _ => None,
        }
    }

    pub fn has_pending_order(&self) -> bool {
        matches!(
            self.state,
            State::PendingEntry { .. } | State::PendingExit { .. }
        )
    }

    pub fn order_failures(&self) -> u32 {
        self.order_failures
    }

    /// Advance the state machine by one bar. `signal` is this bar's signal
    /// edge, if any; the allocator is consulted read-only for entry sizing.
    pub fn on_bar(
        &mut self,
        bar: &PriceBar,
        signal: Option<&Signal>,
        allocator: &CapitalAllocator,
        executor: &mut dyn OrderExecutor,
    ) -> Result<Option<ControllerEvent>, NinetraderError> {
        self.atr.update(bar);

        match std::mem::replace(&mut self.state, State::Flat) {
            State::PendingEntry {
                order_id,
                quantity,
                bars_waiting,
            } => self.resolve_pending_entry(order_id, quantity, bars_waiting, executor),
            State::PendingExit {
                order_id,
                position,
                reason,
                bars_waiting,
            } => self.resolve_pending_exit(order_id, position, reason, bars_waiting, executor),
            State::Flat => self.evaluate_entry(bar, signal, allocator, executor),
            State::Long(position) => self.manage_long(bar, position, signal, executor),
        }
    }

    fn evaluate_entry(
        &mut self,
        bar: &PriceBar,
        signal: Option<&Signal>,
        allocator: &CapitalAllocator,
        executor: &mut dyn OrderExecutor,
    ) -> Result<Option<ControllerEvent>, NinetraderError> {
        let buy_edge = matches!(signal, Some(s) if s.polarity == Polarity::Buy);
        if !buy_edge {
            return Ok(None);
        }

        let quantity = allocator.entry_quantity(&self.asset, bar.close);
        if quantity < 1 {
            // Insufficient capital is not an error; skip the entry.
            return Ok(None);
        }

        let intent = OrderIntent {
            asset: self.asset.clone(),
            side: OrderSide::Buy,
            quantity,
        };
        let (order_id, status) = executor.submit(&intent)?;

        match status {
            OrderStatus::Filled(fill) => Ok(Some(self.enter_long(quantity, &fill))),
            OrderStatus::Pending => {
                self.state = State::PendingEntry {
                    order_id,
                    quantity,
                    bars_waiting: 0,
                };
                Ok(Some(ControllerEvent::EntryPending { quantity }))
            }
            OrderStatus::Rejected { reason } => {
                self.order_failures += 1;
                Ok(Some(ControllerEvent::OrderFailed {
                    side: OrderSide::Buy,
                    reason,
                }))
            }
        }
    }

    fn enter_long(&mut self, quantity: i64, fill: &Fill) -> ControllerEvent {
        let entry_price = fill.price;
        let max_loss_distance = entry_price * self.params.max_loss_fraction;
        let stop_distance = match self.atr.value() {
            Some(atr) => (atr * self.params.stop_multiplier).min(max_loss_distance),
            None => max_loss_distance,
        };
        self.state = State::Long(Position {
            asset: self.asset.clone(),
            quantity,
            entry_price,
            stop_price: entry_price - stop_distance,
            highest_close: entry_price,
            opened_at: fill.timestamp,
        });
        ControllerEvent::Entered {
            quantity,
            fill_price: entry_price,
        }
    }

    fn manage_long(
        &mut self,
        bar: &PriceBar,
        mut position: Position,
        signal: Option<&Signal>,
        executor: &mut dyn OrderExecutor,
    ) -> Result<Option<ControllerEvent>, NinetraderError> {
        position.highest_close = position.highest_close.max(bar.close);

        if self.params.trailing_enabled
            && position.unrealized_gain_fraction(bar.close) >= self.params.min_profit_activation
        {
            if let Some(atr) = self.atr.value() {
                let candidate = position.highest_close - atr * self.params.stop_multiplier;
                // The stop only ever tightens.
                if candidate > position.stop_price {
                    position.stop_price = candidate;
                }
            }
        }

        // Stop breach is checked before the signal exit; risk control wins
        // when both trigger on the same bar.
        let exit_reason = if position.stop_breached(bar.close) {
            Some(ExitReason::StopLoss)
        } else if matches!(signal, Some(s) if s.polarity == Polarity::Sell) {
            Some(ExitReason::Signal)
        } else {
            None
        };

        let Some(reason) = exit_reason else {
            self.state = State::Long(position);
            return Ok(None);
        };

        let intent = OrderIntent {
            asset: self.asset.clone(),
            side: OrderSide::Sell,
            quantity: position.quantity,
        };
        let (order_id, status) = executor.submit(&intent)?;

        match status {
            OrderStatus::Filled(fill) => {
                let record =
                    TradeRecord::from_close(&position, fill.price, fill.timestamp, reason);
                self.state = State::Flat;
                Ok(Some(ControllerEvent::Closed(record)))
            }
            OrderStatus::Pending => {
                self.state = State::PendingExit {
                    order_id,
                    position,
                    reason,
                    bars_waiting: 0,
                };
                Ok(None)
            }
            OrderStatus::Rejected { reason: why } => {
                self.order_failures += 1;
                self.state = State::Long(position);
                Ok(Some(ControllerEvent::OrderFailed {
                    side: OrderSide::Sell,
                    reason: why,
                }))
            }
        }
    }

    fn resolve_pending_entry(
        &mut self,
        order_id: OrderId,
        quantity: i64,
        bars_waiting: u32,
        executor: &mut dyn OrderExecutor,
    ) -> Result<Option<ControllerEvent>, NinetraderError> {
        match executor.poll(order_id)? {
            OrderStatus::Filled(fill) => Ok(Some(self.enter_long(quantity, &fill))),
            OrderStatus::Rejected { reason } => {
                self.order_failures += 1;
                self.state = State::Flat;
                Ok(Some(ControllerEvent::OrderFailed {
                    side: OrderSide::Buy,
                    reason,
                }))
            }
            OrderStatus::Pending => {
                let bars_waiting = bars_waiting + 1;
                if bars_waiting > self.params.order_timeout_bars {
                    executor.cancel(order_id)?;
                    self.order_failures += 1;
                    self.state = State::Flat;
                    Ok(Some(ControllerEvent::OrderFailed {
                        side: OrderSide::Buy,
                        reason: format!("unconfirmed after {bars_waiting} bars"),
                    }))
                } else {
                    self.state = State::PendingEntry {
                        order_id,
                        quantity,
                        bars_waiting,
                    };
                    Ok(None)
                }
            }
        }
    }

    fn resolve_pending_exit(
        &mut self,
        order_id: OrderId,
        position: Position,
        reason: ExitReason,
        bars_waiting: u32,
        executor: &mut dyn OrderExecutor,
    ) -> Result<Option<ControllerEvent>, NinetraderError> {
        match executor.poll(order_id)? {
            OrderStatus::Filled(fill) => {
                let record = TradeRecord::from_close(&position, fill.price, fill.timestamp, reason);
                self.state = State::Flat;
                Ok(Some(ControllerEvent::Closed(record)))
            }
            OrderStatus::Rejected { reason: why } => {
                self.order_failures += 1;
                self.state = State::Long(position);
                Ok(Some(ControllerEvent::OrderFailed {
                    side: OrderSide::Sell,
                    reason: why,
                }))
            }
            OrderStatus::Pending => {
                let bars_waiting = bars_waiting + 1;
                if bars_waiting > self.params.order_timeout_bars {
                    executor.cancel(order_id)?;
                    self.order_failures += 1;
                    self.state = State::Long(position);
                    Ok(Some(ControllerEvent::OrderFailed {
                        side: OrderSide::Sell,
                        reason: format!("unconfirmed after {bars_waiting} bars"),
                    }))
                } else {
                    self.state = State::PendingExit {
                        order_id,
                        position,
                        reason,
                        bars_waiting,
                    };
                    Ok(None)
                }
            }
        }
    }
}
