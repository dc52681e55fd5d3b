#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ninetrader::domain::allocator::CapitalMode;
use ninetrader::domain::bar::PriceBar;
use ninetrader::domain::config::StrategyConfig;
use ninetrader::domain::controller::RiskParams;
use ninetrader::domain::error::NinetraderError;
use ninetrader::domain::order::{Fill, OrderId, OrderIntent, OrderStatus};
use ninetrader::domain::signal::PolarityConvention;
use ninetrader::ports::order_executor::OrderExecutor;
use ninetrader::ports::price_source::PriceSource;
use std::collections::BTreeMap;

pub fn ts(day: u32) -> NaiveDateTime {
    // Days beyond 31 roll into later 2024 dates.
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days((day - 1) as i64)
}

/// Bar with a narrow range around the close, for scripted price paths.
pub fn make_bar(asset: &str, day: u32, close: f64) -> PriceBar {
    PriceBar {
        asset: asset.to_string(),
        timestamp: ts(day),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1_000,
    }
}

pub struct MockPriceSource {
    steps: Vec<Vec<PriceBar>>,
    cursor: usize,
}

impl MockPriceSource {
    pub fn new(steps: Vec<Vec<PriceBar>>) -> Self {
        Self { steps, cursor: 0 }
    }

    /// One asset, one bar per step, daily timestamps.
    pub fn single_asset(asset: &str, closes: &[f64]) -> Self {
        let steps = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| vec![make_bar(asset, i as u32 + 1, close)])
            .collect();
        Self::new(steps)
    }
}

impl PriceSource for MockPriceSource {
    fn next_bars(&mut self) -> Result<Option<Vec<PriceBar>>, NinetraderError> {
        if self.cursor < self.steps.len() {
            let bars = self.steps[self.cursor].clone();
            self.cursor += 1;
            Ok(Some(bars))
        } else {
            Ok(None)
        }
    }
}

/// Leaves its first order unconfirmed forever; later orders fill instantly
/// at the asset's last observed close.
pub struct OneShotPendingExecutor {
    last: BTreeMap<String, PriceBar>,
    pub filled_assets: Vec<String>,
    submitted: u64,
}

impl OneShotPendingExecutor {
    pub fn new() -> Self {
        Self {
            last: BTreeMap::new(),
            filled_assets: Vec::new(),
            submitted: 0,
        }
    }
}

impl OrderExecutor for OneShotPendingExecutor {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(OrderId, OrderStatus), NinetraderError> {
        self.submitted += 1;
        let id = self.submitted;
        if id == 1 {
            return Ok((id, OrderStatus::Pending));
        }
        let bar = self
            .last
            .get(&intent.asset)
            .ok_or_else(|| NinetraderError::Transport {
                reason: format!("no market data for {}", intent.asset),
            })?;
        self.filled_assets.push(intent.asset.clone());
        Ok((
            id,
            OrderStatus::Filled(Fill {
                price: bar.close,
                timestamp: bar.timestamp,
            }),
        ))
    }

    fn poll(&mut self, _id: OrderId) -> Result<OrderStatus, NinetraderError> {
        Ok(OrderStatus::Pending)
    }

    fn cancel(&mut self, _id: OrderId) -> Result<(), NinetraderError> {
        Ok(())
    }

    fn observe(&mut self, bar: &PriceBar) {
        self.last.insert(bar.asset.clone(), bar.clone());
    }
}

/// A small, fast-triggering configuration: one lower close signals a buy,
/// one higher close signals a sell.
pub fn quick_config(assets: &[&str]) -> StrategyConfig {
    StrategyConfig {
        lookback: 1,
        threshold: 1,
        convention: PolarityConvention::TdSequential,
        risk: RiskParams {
            volatility_period: 1,
            stop_multiplier: 100.0,
            max_loss_fraction: 0.5,
            min_profit_activation: 0.01,
            trailing_enabled: false,
            order_timeout_bars: 3,
        },
        capital_mode: CapitalMode::Shared,
        total_capital: 100_000.0,
        deployment_fraction: 0.95,
        weights: BTreeMap::new(),
        assets: assets.iter().map(|s| s.to_string()).collect(),
        data_path: String::new(),
    }
}
