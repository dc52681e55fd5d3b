//! Open position state and closed trade records.

use chrono::NaiveDateTime;
use std::fmt;

/// A live long position, exclusively owned by its asset's controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub asset: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub stop_price: f64,
    pub highest_close: f64,
    pub opened_at: NaiveDateTime,
}

impl Position {
    /// (close / entry) - 1
    pub fn unrealized_gain_fraction(&self, close: f64) -> f64 {
        close / self.entry_price - 1.0
    }

    pub fn stop_breached(&self, close: f64) -> bool {
        close <= self.stop_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    Signal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::Signal => write!(f, "signal"),
        }
    }
}

/// Immutable record of a round-trip trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub asset: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn from_close(position: &Position, exit_price: f64, closed_at: NaiveDateTime, exit_reason: ExitReason) -> Self {
        let pnl = position.quantity as f64 * (exit_price - position.entry_price);
        let pnl_pct = exit_price / position.entry_price - 1.0;
        TradeRecord {
            asset: position.asset.clone(),
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            pnl,
            pnl_pct,
            opened_at: position.opened_at,
            closed_at,
            exit_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sample_position() -> Position {
        Position {
            asset: "AAPL".into(),
            quantity: 100,
            entry_price: 50.0,
            stop_price: 48.0,
            highest_close: 50.0,
            opened_at: ts(15),
        }
    }

    #[test]
    fn stop_breached_at_or_below_stop() {
        let pos = sample_position();
        assert!(pos.stop_breached(47.0));
        assert!(pos.stop_breached(48.0));
        assert!(!pos.stop_breached(49.0));
    }

    #[test]
    fn unrealized_gain_fraction() {
        let pos = sample_position();
        assert_abs_diff_eq!(pos.unrealized_gain_fraction(55.0), 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(pos.unrealized_gain_fraction(45.0), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn trade_record_pnl() {
        let pos = sample_position();
        let record = TradeRecord::from_close(&pos, 55.0, ts(20), ExitReason::Signal);
        assert_abs_diff_eq!(record.pnl, 500.0, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(record.pnl_pct, 0.10, epsilon = 1e-12);
        assert_eq!(record.opened_at, ts(15));
        assert_eq!(record.closed_at, ts(20));
        assert_eq!(record.exit_reason, ExitReason::Signal);
    }

    #[test]
    fn trade_record_loss() {
        let pos = sample_position();
        let record = TradeRecord::from_close(&pos, 47.5, ts(16), ExitReason::StopLoss);
        assert_abs_diff_eq!(record.pnl, -250.0, epsilon = f64::EPSILON);
        assert!(record.pnl_pct < 0.0);
        assert_eq!(record.exit_reason.to_string(), "stop_loss");
    }
}
