//! CSV trade-log report adapter.

use crate::domain::error::NinetraderError;
use crate::domain::orchestrator::RunSummary;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, summary: &RunSummary, output_path: &str) -> Result<(), NinetraderError> {
        let mut writer = csv::Writer::from_path(output_path)
            .map_err(|e| NinetraderError::Io(std::io::Error::other(e)))?;

        writer
            .write_record([
                "asset",
                "quantity",
                "entry_price",
                "exit_price",
                "pnl",
                "pnl_pct",
                "opened_at",
                "closed_at",
                "exit_reason",
            ])
            .map_err(|e| NinetraderError::Io(std::io::Error::other(e)))?;

        for trade in &summary.trades {
            writer
                .write_record([
                    trade.asset.clone(),
                    trade.quantity.to_string(),
                    format!("{:.4}", trade.entry_price),
                    format!("{:.4}", trade.exit_price),
                    format!("{:.2}", trade.pnl),
                    format!("{:.4}", trade.pnl_pct),
                    trade.opened_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    trade.closed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    trade.exit_reason.to_string(),
                ])
                .map_err(|e| NinetraderError::Io(std::io::Error::other(e)))?;
        }

        writer
            .flush()
            .map_err(|e| NinetraderError::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, TradeRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn summary_with_one_trade() -> RunSummary {
        let opened_at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let closed_at = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        RunSummary {
            initial_capital: 100_000.0,
            final_equity: 100_475.0,
            trades: vec![TradeRecord {
                asset: "ACME".to_string(),
                quantity: 950,
                entry_price: 100.0,
                exit_price: 100.5,
                pnl: 475.0,
                pnl_pct: 0.005,
                opened_at,
                closed_at,
                exit_reason: ExitReason::StopLoss,
            }],
            equity_curve: vec![],
            data_gaps: 0,
            order_failures: 0,
        }
    }

    #[test]
    fn writes_header_and_trade_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let adapter = CsvReportAdapter::new();

        adapter
            .write(&summary_with_one_trade(), path.to_str().unwrap())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "asset,quantity,entry_price,exit_price,pnl,pnl_pct,opened_at,closed_at,exit_reason"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("ACME,950,100.0000,100.5000,475.00,0.0050,"));
        assert!(row.ends_with("stop_loss"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let adapter = CsvReportAdapter::new();
        let result = adapter.write(&summary_with_one_trade(), "/nonexistent/dir/trades.csv");
        assert!(result.is_err());
    }
}
