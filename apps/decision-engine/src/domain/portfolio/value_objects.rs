//! Portfolio value objects.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentCode;

/// Rebalance action for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionAction {
    /// Increase or open.
    Buy,
    /// Reduce or exit.
    Sell,
    /// Within the rebalance band.
    Hold,
}

/// Currently held quantity of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Shares held.
    pub quantity: u64,
    /// Average acquisition price.
    pub average_price: Decimal,
}

/// Sector and liquidity of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentLiquidity {
    /// Sector label.
    pub sector: String,
    /// 20-day average daily traded value.
    pub adtv20: Decimal,
}

/// Inputs the constructor reads besides the ranking.
#[derive(Debug, Clone, Default)]
pub struct PortfolioContext {
    /// Total capital (cash plus holdings at market).
    pub total_capital: Decimal,
    /// Current holdings by code.
    pub holdings: BTreeMap<InstrumentCode, Holding>,
    /// Latest prices by code.
    pub prices: BTreeMap<InstrumentCode, Decimal>,
    /// Sector and liquidity by code.
    pub liquidity: BTreeMap<InstrumentCode, InstrumentLiquidity>,
}

impl PortfolioContext {
    /// Market value of the current holding, zero when not held.
    ///
    /// Falls back to the average price when no latest price is known.
    #[must_use]
    pub fn current_value(&self, code: &InstrumentCode) -> Decimal {
        self.holdings.get(code).map_or(Decimal::ZERO, |holding| {
            let price = self
                .prices
                .get(code)
                .copied()
                .unwrap_or(holding.average_price);
            price * Decimal::from(holding.quantity)
        })
    }

    /// Shares currently held.
    #[must_use]
    pub fn held_quantity(&self, code: &InstrumentCode) -> u64 {
        self.holdings.get(code).map_or(0, |h| h.quantity)
    }
}

/// One line of the target portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Display name.
    pub name: String,
    /// Rank, absent for exits of instruments no longer ranked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    /// Target weight of total capital.
    pub weight: f64,
    /// Target monetary value.
    pub target_value: Decimal,
    /// Rebalance action.
    pub action: PositionAction,
    /// Why the weight is what it is.
    pub reason: String,
}

/// Target weights for one decision date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPortfolio {
    /// Decision date.
    pub date: NaiveDate,
    /// Ranked targets first, then exits.
    pub positions: Vec<TargetPosition>,
    /// Weight left in cash.
    pub cash_weight: f64,
}

impl TargetPortfolio {
    /// Positions with a positive target weight.
    pub fn held(&self) -> impl Iterator<Item = &TargetPosition> {
        self.positions.iter().filter(|p| p.weight > 0.0)
    }

    /// Sum of position weights.
    #[must_use]
    pub fn invested_weight(&self) -> f64 {
        self.positions.iter().map(|p| p.weight).sum()
    }

    /// Look up a position.
    #[must_use]
    pub fn position(&self, code: &InstrumentCode) -> Option<&TargetPosition> {
        self.positions.iter().find(|p| &p.code == code)
    }

    /// Weights by code for held positions.
    #[must_use]
    pub fn weights(&self) -> BTreeMap<InstrumentCode, f64> {
        self.held().map(|p| (p.code.clone(), p.weight)).collect()
    }
}
