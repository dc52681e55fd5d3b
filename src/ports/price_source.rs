//! Market data access port.

use crate::domain::bar::PriceBar;
use crate::domain::error::NinetraderError;

/// Pull-based bar delivery. Each call yields the bars for the next point on
/// the unified timeline, one per asset that traded at that point; `None`
/// signals end of data.
pub trait PriceSource {
    fn next_bars(&mut self) -> Result<Option<Vec<PriceBar>>, NinetraderError>;
}
