//! Strategy configuration: typed view over the config port, validated
//! fail-fast before a run starts.

use std::collections::BTreeMap;

use super::allocator::CapitalMode;
use super::controller::RiskParams;
use super::error::NinetraderError;
use super::signal::PolarityConvention;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LOOKBACK: i64 = 4;
pub const DEFAULT_THRESHOLD: i64 = 9;
pub const DEFAULT_DEPLOYMENT_FRACTION: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub lookback: usize,
    pub threshold: u32,
    pub convention: PolarityConvention,
    pub risk: RiskParams,
    pub capital_mode: CapitalMode,
    pub total_capital: f64,
    pub deployment_fraction: f64,
    pub weights: BTreeMap<String, f64>,
    pub assets: Vec<String>,
    pub data_path: String,
}

impl StrategyConfig {
    /// Read and validate a full strategy configuration.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, NinetraderError> {
        let assets_raw = require_string(config, "data", "assets")?;
        let assets: Vec<String> = assets_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let data_path = require_string(config, "data", "path")?;

        let convention = match config.get_string("strategy", "polarity").as_deref() {
            None | Some("td_sequential") => PolarityConvention::TdSequential,
            Some("momentum") => PolarityConvention::Momentum,
            Some(other) => {
                return Err(NinetraderError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "polarity".into(),
                    reason: format!("unknown convention {other:?}"),
                });
            }
        };

        let defaults = RiskParams::default();
        let risk = RiskParams {
            volatility_period: config.get_int(
                "risk",
                "volatility_period",
                defaults.volatility_period as i64,
            ) as usize,
            stop_multiplier: config.get_double("risk", "stop_multiplier", defaults.stop_multiplier),
            max_loss_fraction: config.get_double(
                "risk",
                "max_loss_fraction",
                defaults.max_loss_fraction,
            ),
            min_profit_activation: config.get_double(
                "risk",
                "min_profit_activation",
                defaults.min_profit_activation,
            ),
            trailing_enabled: config.get_bool("risk", "trailing_enabled", defaults.trailing_enabled),
            order_timeout_bars: config.get_int(
                "risk",
                "order_timeout_bars",
                defaults.order_timeout_bars as i64,
            ) as u32,
        };

        let capital_mode = match config
            .get_string("capital", "mode")
            .unwrap_or_else(|| "shared".to_string())
            .as_str()
        {
            "shared" => CapitalMode::Shared,
            "independent" => CapitalMode::Independent,
            other => {
                return Err(NinetraderError::ConfigInvalid {
                    section: "capital".into(),
                    key: "mode".into(),
                    reason: format!("unknown mode {other:?}"),
                });
            }
        };

        let total_capital_raw = require_string(config, "capital", "total_capital")?;
        let total_capital =
            total_capital_raw
                .parse::<f64>()
                .map_err(|_| NinetraderError::ConfigInvalid {
                    section: "capital".into(),
                    key: "total_capital".into(),
                    reason: format!("{total_capital_raw:?} is not a number"),
                })?;

        let weights = match config.get_string("capital", "weights") {
            Some(raw) => parse_weights(&raw)?,
            None => BTreeMap::new(),
        };

        let strategy = StrategyConfig {
            lookback: config.get_int("strategy", "lookback", DEFAULT_LOOKBACK) as usize,
            threshold: config.get_int("strategy", "threshold", DEFAULT_THRESHOLD) as u32,
            convention,
            risk,
            capital_mode,
            total_capital,
            deployment_fraction: config.get_double(
                "capital",
                "deployment_fraction",
                DEFAULT_DEPLOYMENT_FRACTION,
            ),
            weights,
            assets,
            data_path,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn validate(&self) -> Result<(), NinetraderError> {
        if self.assets.is_empty() {
            return Err(invalid("data", "assets", "at least one asset is required"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for asset in &self.assets {
            if !seen.insert(asset) {
                return Err(invalid("data", "assets", &format!("duplicate asset {asset}")));
            }
        }
        if self.lookback < 1 {
            return Err(invalid("strategy", "lookback", "must be at least 1"));
        }
        if self.threshold < 1 {
            return Err(invalid("strategy", "threshold", "must be at least 1"));
        }
        if self.risk.volatility_period < 1 {
            return Err(invalid("risk", "volatility_period", "must be at least 1"));
        }
        if self.risk.stop_multiplier <= 0.0 {
            return Err(invalid("risk", "stop_multiplier", "must be positive"));
        }
        if self.risk.max_loss_fraction <= 0.0 || self.risk.max_loss_fraction > 1.0 {
            return Err(invalid("risk", "max_loss_fraction", "must be in (0, 1]"));
        }
        if self.risk.min_profit_activation < 0.0 {
            return Err(invalid("risk", "min_profit_activation", "must not be negative"));
        }
        if self.risk.order_timeout_bars < 1 {
            return Err(invalid("risk", "order_timeout_bars", "must be at least 1"));
        }
        if self.total_capital <= 0.0 || !self.total_capital.is_finite() {
            return Err(invalid("capital", "total_capital", "must be positive"));
        }
        if self.deployment_fraction <= 0.0 || self.deployment_fraction > 1.0 {
            return Err(invalid("capital", "deployment_fraction", "must be in (0, 1]"));
        }
        if self.capital_mode == CapitalMode::Shared && !self.weights.is_empty() {
            return Err(invalid(
                "capital",
                "weights",
                "weights only apply in independent mode",
            ));
        }
        Ok(())
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> NinetraderError {
    NinetraderError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, NinetraderError> {
    config
        .get_string(section, key)
        .ok_or_else(|| NinetraderError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

/// Parse a weight list of the form `ACME:0.6,BETA:0.4`.
pub fn parse_weights(raw: &str) -> Result<BTreeMap<String, f64>, NinetraderError> {
    let mut weights = BTreeMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((asset, weight)) = entry.split_once(':') else {
            return Err(invalid(
                "capital",
                "weights",
                &format!("expected ASSET:WEIGHT, got {entry:?}"),
            ));
        };
        let weight: f64 = weight
            .trim()
            .parse()
            .map_err(|_| invalid("capital", "weights", &format!("bad weight in {entry:?}")))?;
        if weights.insert(asset.trim().to_string(), weight).is_some() {
            return Err(invalid(
                "capital",
                "weights",
                &format!("duplicate weight for {}", asset.trim()),
            ));
        }
    }
    Ok(weights)
}
