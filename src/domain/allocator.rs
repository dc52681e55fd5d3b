//! Capital allocation: shared single pool or independent weighted pools,
//! and conversion of allocated capital into whole-unit order sizes.

use std::collections::BTreeMap;

use super::error::NinetraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapitalMode {
    Shared,
    Independent,
}

/// Per-asset share of capital, fixed at startup in independent mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetAllocation {
    pub asset: String,
    pub weight: f64,
    pub allocated_capital: f64,
}

#[derive(Debug, Clone)]
enum PoolState {
    /// One cash balance; `committed` names the asset currently holding it.
    Shared { cash: f64, committed: Option<String> },
    Independent {
        allocations: BTreeMap<String, AssetAllocation>,
    },
}

#[derive(Debug, Clone)]
pub struct CapitalAllocator {
    deployment_fraction: f64,
    pool: PoolState,
}

/// Resolve explicit weights against the asset list. Explicit weights are
/// preserved when any asset is unweighted (the remainder is split equally);
/// an all-explicit set is rescaled to sum to 1.
pub fn normalize_weights(
    assets: &[String],
    explicit: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, NinetraderError> {
    if assets.is_empty() {
        return Err(NinetraderError::Weights {
            reason: "no assets configured".into(),
        });
    }

    for (asset, weight) in explicit {
        if !assets.contains(asset) {
            return Err(NinetraderError::Weights {
                reason: format!("weight given for unknown asset {asset}"),
            });
        }
        if !weight.is_finite() || *weight < 0.0 {
            return Err(NinetraderError::Weights {
                reason: format!("weight for {asset} must be a non-negative number"),
            });
        }
    }

    let explicit_sum: f64 = explicit.values().sum();
    let unweighted: Vec<&String> = assets.iter().filter(|a| !explicit.contains_key(*a)).collect();

    let mut weights = BTreeMap::new();

    if unweighted.is_empty() {
        if explicit_sum <= 0.0 {
            return Err(NinetraderError::Weights {
                reason: "explicit weights sum to zero".into(),
            });
        }
        for (asset, weight) in explicit {
            weights.insert(asset.clone(), weight / explicit_sum);
        }
    } else {
        if explicit_sum > 1.0 + 1e-9 {
            return Err(NinetraderError::Weights {
                reason: format!(
                    "explicit weights sum to {explicit_sum} with unweighted assets remaining"
                ),
            });
        }
        let share = (1.0 - explicit_sum) / unweighted.len() as f64;
        for asset in assets {
            let weight = explicit.get(asset).copied().unwrap_or(share);
            weights.insert(asset.clone(), weight);
        }
    }

    Ok(weights)
}

impl CapitalAllocator {
    pub fn new_shared(total_capital: f64, deployment_fraction: f64) -> Self {
        Self {
            deployment_fraction,
            pool: PoolState::Shared {
                cash: total_capital,
                committed: None,
            },
        }
    }

    pub fn new_independent(
        total_capital: f64,
        deployment_fraction: f64,
        assets: &[String],
        explicit_weights: &BTreeMap<String, f64>,
    ) -> Result<Self, NinetraderError> {
        let weights = normalize_weights(assets, explicit_weights)?;
        let allocations = weights
            .into_iter()
            .map(|(asset, weight)| {
                let allocation = AssetAllocation {
                    asset: asset.clone(),
                    weight,
                    allocated_capital: total_capital * weight,
                };
                (asset, allocation)
            })
            .collect();
        Ok(Self {
            deployment_fraction,
            pool: PoolState::Independent { allocations },
        })
    }

    pub fn mode(&self) -> CapitalMode {
        match self.pool {
            PoolState::Shared { .. } => CapitalMode::Shared,
            PoolState::Independent { .. } => CapitalMode::Independent,
        }
    }

    pub fn allocation(&self, asset: &str) -> Option<&AssetAllocation> {
        match &self.pool {
            PoolState::Shared { .. } => None,
            PoolState::Independent { allocations } => allocations.get(asset),
        }
    }

    /// Uncommitted cash across the pool(s), for equity accounting.
    pub fn total_cash(&self) -> f64 {
        match &self.pool {
            PoolState::Shared { cash, .. } => *cash,
            PoolState::Independent { allocations } => {
                allocations.values().map(|a| a.allocated_capital).sum()
            }
        }
    }

    /// Whole units purchasable for `asset` at `price`. Returns 0 when the
    /// asset has no capital available (including when another asset already
    /// holds the shared pool), which the caller treats as "skip entry".
    pub fn entry_quantity(&self, asset: &str, price: f64) -> i64 {
        if price <= 0.0 || !price.is_finite() {
            return 0;
        }
        let available = match &self.pool {
            PoolState::Shared { cash, committed } => {
                if committed.is_some() {
                    return 0;
                }
                *cash
            }
            PoolState::Independent { allocations } => match allocations.get(asset) {
                Some(allocation) => allocation.allocated_capital,
                None => return 0,
            },
        };
        let quantity = (available * self.deployment_fraction / price).floor();
        if quantity >= 1.0 { quantity as i64 } else { 0 }
    }

    /// Lock the shared pool for `asset` while its entry order is in flight.
    /// No cash moves until the fill is committed; independent pools need no
    /// lock.
    pub fn reserve_entry(&mut self, asset: &str) {
        if let PoolState::Shared { committed, .. } = &mut self.pool {
            *committed = Some(asset.to_string());
        }
    }

    /// Unlock the shared pool after `asset`'s buy order failed before
    /// filling.
    pub fn release_reservation(&mut self, asset: &str) {
        if let PoolState::Shared { committed, .. } = &mut self.pool {
            if committed.as_deref() == Some(asset) {
                *committed = None;
            }
        }
    }

    /// Deduct the fill cost after an entry is confirmed.
    pub fn commit_entry(&mut self, asset: &str, cost: f64) {
        match &mut self.pool {
            PoolState::Shared { cash, committed } => {
                *cash -= cost;
                *committed = Some(asset.to_string());
            }
            PoolState::Independent { allocations } => {
                if let Some(allocation) = allocations.get_mut(asset) {
                    allocation.allocated_capital -= cost;
                }
            }
        }
    }

    /// Return sale proceeds after an exit is confirmed.
    pub fn release_exit(&mut self, asset: &str, proceeds: f64) {
        match &mut self.pool {
            PoolState::Shared { cash, committed } => {
                *cash += proceeds;
                if committed.as_deref() == Some(asset) {
                    *committed = None;
                }
            }
            PoolState::Independent { allocations } => {
                if let Some(allocation) = allocations.get_mut(asset) {
                    allocation.allocated_capital += proceeds;
                }
            }
        }
    }
}
