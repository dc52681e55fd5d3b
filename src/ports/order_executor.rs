//! Order execution port.

use crate::domain::bar::PriceBar;
use crate::domain::error::NinetraderError;
use crate::domain::order::{OrderId, OrderIntent, OrderStatus};

/// Request/response order execution: submit returns either an immediate
/// terminal status or `Pending`, which the caller resolves by polling on
/// subsequent bars. Transport failures propagate as errors; the core does
/// not reconnect.
pub trait OrderExecutor {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(OrderId, OrderStatus), NinetraderError>;

    fn poll(&mut self, id: OrderId) -> Result<OrderStatus, NinetraderError>;

    /// Best-effort cancellation of a pending order.
    fn cancel(&mut self, id: OrderId) -> Result<(), NinetraderError>;

    /// Market-data hint for simulated executors; live adapters can ignore it.
    fn observe(&mut self, _bar: &PriceBar) {}
}
