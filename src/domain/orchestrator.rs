//! Portfolio orchestration: one detector/evaluator/controller pipeline per
//! asset, stepped in lexicographic asset order over a shared bar clock.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::allocator::{CapitalAllocator, CapitalMode};
use super::bar::PriceBar;
use super::config::StrategyConfig;
use super::controller::{ControllerEvent, PositionController};
use super::detector::SequentialReversalDetector;
use super::error::NinetraderError;
use super::order::OrderSide;
use super::position::TradeRecord;
use super::signal::SignalEvaluator;
use crate::ports::order_executor::OrderExecutor;
use crate::ports::price_source::PriceSource;

/// Portfolio equity after a step: uncommitted cash plus open positions
/// marked at their latest close.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub data_gaps: u64,
    pub order_failures: u64,
}

struct AssetPipeline {
    detector: SequentialReversalDetector,
    evaluator: SignalEvaluator,
    controller: PositionController,
}

pub struct PortfolioOrchestrator {
    assets: Vec<String>,
    pipelines: BTreeMap<String, AssetPipeline>,
    allocator: CapitalAllocator,
    initial_capital: f64,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    last_close: BTreeMap<String, f64>,
    last_timestamp: BTreeMap<String, NaiveDateTime>,
    data_gaps: u64,
}

impl PortfolioOrchestrator {
    pub fn new(config: &StrategyConfig) -> Result<Self, NinetraderError> {
        let mut assets = config.assets.clone();
        assets.sort();

        let allocator = match config.capital_mode {
            CapitalMode::Shared => {
                CapitalAllocator::new_shared(config.total_capital, config.deployment_fraction)
            }
            CapitalMode::Independent => CapitalAllocator::new_independent(
                config.total_capital,
                config.deployment_fraction,
                &assets,
                &config.weights,
            )?,
        };

        let pipelines = assets
            .iter()
            .map(|asset| {
                let pipeline = AssetPipeline {
                    detector: SequentialReversalDetector::new(config.lookback),
                    evaluator: SignalEvaluator::new(config.threshold, config.convention),
                    controller: PositionController::new(asset, config.risk.clone()),
                };
                (asset.clone(), pipeline)
            })
            .collect();

        Ok(Self {
            assets,
            pipelines,
            allocator,
            initial_capital: config.total_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_close: BTreeMap::new(),
            last_timestamp: BTreeMap::new(),
            data_gaps: 0,
        })
    }

    /// Consume the source until exhausted and summarise the run.
    pub fn run(
        mut self,
        source: &mut dyn PriceSource,
        executor: &mut dyn OrderExecutor,
    ) -> Result<RunSummary, NinetraderError> {
        while let Some(bars) = source.next_bars()? {
            self.step(&bars, executor)?;
        }
        Ok(self.finish())
    }

    /// Process one step of bars, at most one bar per asset. Assets with a
    /// missing or out-of-order bar are skipped for this step and counted as
    /// a data gap; the rest of the portfolio proceeds.
    pub fn step(
        &mut self,
        bars: &[PriceBar],
        executor: &mut dyn OrderExecutor,
    ) -> Result<(), NinetraderError> {
        let mut by_asset: BTreeMap<&str, &PriceBar> = BTreeMap::new();
        for bar in bars {
            by_asset.entry(bar.asset.as_str()).or_insert(bar);
        }

        for asset in &self.assets {
            if let Some(bar) = by_asset.get(asset.as_str()) {
                executor.observe(bar);
            }
        }

        let mut step_timestamp: Option<NaiveDateTime> = None;
        let mut processed_any = false;

        for asset in &self.assets {
            let Some(&bar) = by_asset.get(asset.as_str()) else {
                self.data_gaps += 1;
                continue;
            };
            if let Some(last) = self.last_timestamp.get(asset) {
                if bar.timestamp <= *last {
                    self.data_gaps += 1;
                    continue;
                }
            }

            let pipeline = self
                .pipelines
                .get_mut(asset)
                .ok_or_else(|| NinetraderError::Data {
                    reason: format!("no pipeline for asset {asset}"),
                })?;

            let state = pipeline.detector.update(bar.close);
            let signal = pipeline.evaluator.evaluate(asset, bar.timestamp, state);
            let event =
                pipeline
                    .controller
                    .on_bar(bar, signal.as_ref(), &self.allocator, executor)?;

            match event {
                // An unconfirmed buy holds the shared pool so no other asset
                // can commit the same cash while it is in flight.
                Some(ControllerEvent::EntryPending { .. }) => {
                    self.allocator.reserve_entry(asset);
                }
                Some(ControllerEvent::Entered {
                    quantity,
                    fill_price,
                }) => {
                    self.allocator
                        .commit_entry(asset, quantity as f64 * fill_price);
                }
                Some(ControllerEvent::Closed(record)) => {
                    self.allocator
                        .release_exit(asset, record.quantity as f64 * record.exit_price);
                    self.trades.push(record);
                }
                Some(ControllerEvent::OrderFailed {
                    side: OrderSide::Buy,
                    ..
                }) => {
                    self.allocator.release_reservation(asset);
                }
                Some(ControllerEvent::OrderFailed { .. }) | None => {}
            }

            self.last_close.insert(asset.clone(), bar.close);
            self.last_timestamp.insert(asset.clone(), bar.timestamp);
            step_timestamp = Some(step_timestamp.map_or(bar.timestamp, |t| t.max(bar.timestamp)));
            processed_any = true;
        }

        if processed_any {
            if let Some(timestamp) = step_timestamp {
                let equity = self.mark_equity();
                self.equity_curve.push(EquityPoint { timestamp, equity });
            }
        }

        Ok(())
    }

    /// Uncommitted cash plus open positions at their last seen close.
    fn mark_equity(&self) -> f64 {
        let mut equity = self.allocator.total_cash();
        for (asset, pipeline) in &self.pipelines {
            if let Some(position) = pipeline.controller.position() {
                let close = self
                    .last_close
                    .get(asset)
                    .copied()
                    .unwrap_or(position.entry_price);
                equity += position.quantity as f64 * close;
            }
        }
        equity
    }

    pub fn finish(self) -> RunSummary {
        let order_failures = self
            .pipelines
            .values()
            .map(|p| p.controller.order_failures() as u64)
            .sum();
        let final_equity = self
            .equity_curve
            .last()
            .map_or(self.initial_capital, |p| p.equity);
        RunSummary {
            initial_capital: self.initial_capital,
            final_equity,
            trades: self.trades,
            equity_curve: self.equity_curve,
            data_gaps: self.data_gaps,
            order_failures,
        }
    }
}
