//! Streaming average true range with Wilder smoothing.

use super::bar::PriceBar;

/// Seeded with the simple average of the first `period` true ranges, then
/// smoothed as `(prev * (period - 1) + tr) / period`. The first bar's true
/// range is high - low (no previous close).
#[derive(Debug, Clone)]
pub struct AtrTracker {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seen: usize,
    atr: Option<f64>,
}

impl AtrTracker {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            seed_sum: 0.0,
            seen: 0,
            atr: None,
        }
    }

    /// `None` until `period` bars have been observed.
    pub fn value(&self) -> Option<f64> {
        self.atr
    }

    pub fn update(&mut self, bar: &PriceBar) {
        let tr = match self.prev_close {
            Some(prev) => bar.true_range(prev),
            None => bar.high - bar.low,
        };
        self.prev_close = Some(bar.close);
        self.seen += 1;

        match self.atr {
            Some(prev_atr) => {
                self.atr = Some((prev_atr * (self.period - 1) as f64 + tr) / self.period as f64);
            }
            None => {
                self.seed_sum += tr;
                if self.seen >= self.period {
                    self.atr = Some(self.seed_sum / self.period as f64);
                }
            }
        }
    }
}
