//! Run statistics derived from the trade log and equity curve.

use super::orchestrator::{EquityPoint, RunSummary};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_bars: i64,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl Metrics {
    pub fn compute(summary: &RunSummary) -> Self {
        let total_return = if summary.initial_capital > 0.0 {
            (summary.final_equity - summary.initial_capital) / summary.initial_capital
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_bars) = compute_drawdown(&summary.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in &summary.trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                trades_breakeven += 1;
            }
        }

        let total_trades = trades_won + trades_lost + trades_breakeven;
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown,
            max_drawdown_bars,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    if equity_curve.is_empty() {
        return (0.0, 0);
    }

    let mut peak = equity_curve[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_bars = 0i64;
    let mut current_dd_bars = 0i64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_dd_bars = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_bars += 1;
            if current_dd_bars > max_dd_bars {
                max_dd_bars = current_dd_bars;
            }
        }
    }

    (max_dd, max_dd_bars)
}
