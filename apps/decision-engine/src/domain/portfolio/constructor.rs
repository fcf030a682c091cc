//! Target portfolio construction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{debug, info, warn};

use super::errors::PortfolioError;
use super::value_objects::{PortfolioContext, PositionAction, TargetPortfolio, TargetPosition};
use crate::config::PortfolioConfig;
use crate::domain::selection::RankedStock;
use crate::domain::shared::InstrumentCode;

const UNCLASSIFIED_SECTOR: &str = "UNCLASSIFIED";
const WEIGHT_EPSILON: f64 = 1e-12;

struct Draft<'a> {
    stock: &'a RankedStock,
    weight: f64,
    reasons: Vec<String>,
}

/// Builds a [`TargetPortfolio`] from a ranked list.
#[derive(Debug, Clone)]
pub struct PortfolioConstructor {
    config: PortfolioConfig,
}

impl PortfolioConstructor {
    /// Create a constructor. Tier layout is validated at config load.
    #[must_use]
    pub const fn new(config: PortfolioConfig) -> Self {
        Self { config }
    }

    /// Construct target weights for `date`.
    ///
    /// When fewer candidates than `target_holdings` exist, the unfilled
    /// slots stay in cash unless `strict_candidate_count` is set.
    ///
    /// # Errors
    ///
    /// Returns an error when capital is not positive, or when candidates are
    /// short and strict counting is enabled.
    pub fn construct(
        &self,
        ranked: &[RankedStock],
        context: &PortfolioContext,
        date: NaiveDate,
    ) -> Result<TargetPortfolio, PortfolioError> {
        let c = &self.config;
        let capital = context
            .total_capital
            .to_f64()
            .filter(|v| *v > 0.0)
            .ok_or(PortfolioError::NonPositiveCapital {
                capital: context.total_capital,
            })?;

        let selected = &ranked[..ranked.len().min(c.target_holdings)];
        if selected.len() < c.target_holdings {
            if c.strict_candidate_count {
                return Err(PortfolioError::InsufficientCandidates {
                    available: selected.len(),
                    required: c.target_holdings,
                });
            }
            warn!(
                available = selected.len(),
                required = c.target_holdings,
                "Fewer candidates than holding slots, unfilled weight stays in cash"
            );
        }

        let mut drafts = self.tier_weights(selected);
        self.apply_sector_ceiling(&mut drafts, context);
        self.apply_liquidity_cap(&mut drafts, context, capital);

        let mut positions = Vec::with_capacity(drafts.len() + context.holdings.len());
        for draft in drafts {
            let code = &draft.stock.code;
            let mut reasons = draft.reasons;
            let mut weight = draft.weight;
            if weight < c.min_weight - WEIGHT_EPSILON {
                debug!(code = %code, weight, "Below minimum weight, moved to cash");
                reasons.push("below minimum weight, moved to cash".to_string());
                weight = 0.0;
                if context.held_quantity(code) == 0 {
                    continue;
                }
            }
            positions.push(self.position(
                code.clone(),
                draft.stock.name.clone(),
                Some(draft.stock.rank),
                weight,
                reasons.join("; "),
                context,
                capital,
            ));
        }

        for (code, holding) in &context.holdings {
            if holding.quantity == 0 || selected.iter().any(|s| &s.code == code) {
                continue;
            }
            positions.push(self.position(
                code.clone(),
                code.to_string(),
                None,
                0.0,
                "not in target, exit".to_string(),
                context,
                capital,
            ));
        }

        let invested: f64 = positions.iter().map(|p| p.weight).sum();
        let portfolio = TargetPortfolio {
            date,
            positions,
            cash_weight: (1.0 - invested).max(0.0),
        };

        info!(
            positions = portfolio.held().count(),
            exits = portfolio.positions.iter().filter(|p| p.weight == 0.0).count(),
            cash_weight = portfolio.cash_weight,
            "Target portfolio constructed"
        );
        Ok(portfolio)
    }

    fn tier_weights<'a>(&self, selected: &'a [RankedStock]) -> Vec<Draft<'a>> {
        let c = &self.config;
        selected
            .iter()
            .enumerate()
            .map(|(i, stock)| {
                let slot = i + 1;
                let (tier_weight, mut reasons) = c
                    .tiers
                    .iter()
                    .find(|tier| tier.contains(slot))
                    .map_or((0.0, Vec::new()), |tier| {
                        (
                            tier.weight,
                            vec![format!("tier {}-{}", tier.start_rank, tier.end_rank)],
                        )
                    });
                let weight = tier_weight.clamp(c.min_weight, c.max_weight);
                if (weight - tier_weight).abs() > WEIGHT_EPSILON {
                    reasons.push(format!("clamped to [{}, {}]", c.min_weight, c.max_weight));
                }
                Draft {
                    stock,
                    weight,
                    reasons,
                }
            })
            .collect()
    }

    fn apply_sector_ceiling(&self, drafts: &mut [Draft<'_>], context: &PortfolioContext) {
        let sector_of = |code: &InstrumentCode| {
            context
                .liquidity
                .get(code)
                .map_or(UNCLASSIFIED_SECTOR, |l| l.sector.as_str())
                .to_string()
        };

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for draft in drafts.iter() {
            *totals.entry(sector_of(&draft.stock.code)).or_default() += draft.weight;
        }

        for draft in drafts.iter_mut() {
            let sector = sector_of(&draft.stock.code);
            let total = totals.get(&sector).copied().unwrap_or(0.0);
            if total > self.config.sector_max + WEIGHT_EPSILON {
                draft.weight *= self.config.sector_max / total;
                draft.reasons.push(format!("sector {sector} scaled to ceiling"));
            }
        }
    }

    fn apply_liquidity_cap(
        &self,
        drafts: &mut [Draft<'_>],
        context: &PortfolioContext,
        capital: f64,
    ) {
        for draft in drafts.iter_mut() {
            let code = &draft.stock.code;
            let Some(adtv) = context.liquidity.get(code).and_then(|l| l.adtv20.to_f64()) else {
                continue;
            };
            let cap = self.config.max_adtv_participation * adtv.max(0.0);
            let current = context.current_value(code).to_f64().unwrap_or(0.0);
            let delta = draft.weight * capital - current;
            if delta.abs() > cap {
                let capped = (current + cap.copysign(delta)) / capital;
                // Reductions never leave a position above the maximum weight.
                draft.weight = capped.clamp(0.0, self.config.max_weight);
                draft.reasons.push("liquidity capped".to_string());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn position(
        &self,
        code: InstrumentCode,
        name: String,
        rank: Option<usize>,
        weight: f64,
        reason: String,
        context: &PortfolioContext,
        capital: f64,
    ) -> TargetPosition {
        let target_value = (Decimal::from_f64(weight).unwrap_or(Decimal::ZERO)
            * context.total_capital)
            .round_dp(2);
        let current = context.current_value(&code).to_f64().unwrap_or(0.0);
        let delta = weight * capital - current;

        let action = if context.held_quantity(&code) > 0
            && (delta / capital).abs() <= self.config.rebalance_band
            && weight > 0.0
        {
            PositionAction::Hold
        } else if delta > 0.0 {
            PositionAction::Buy
        } else if delta < 0.0 {
            PositionAction::Sell
        } else {
            PositionAction::Hold
        };

        TargetPosition {
            code,
            name,
            rank,
            weight,
            target_value,
            action,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::{TierConfig, WEIGHT_SUM_TOLERANCE};
    use crate::domain::portfolio::{Holding, InstrumentLiquidity};
    use crate::domain::selection::FactorBreakdown;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn ranked(n: usize) -> Vec<RankedStock> {
        (1..=n)
            .map(|rank| RankedStock {
                code: InstrumentCode::new(format!("S{rank:02}")),
                name: format!("Stock {rank}"),
                rank,
                total_score: 1.0 - rank as f64 / 100.0,
                breakdown: FactorBreakdown::default(),
            })
            .collect()
    }

    fn context(capital: Decimal) -> PortfolioContext {
        PortfolioContext {
            total_capital: capital,
            ..PortfolioContext::default()
        }
    }

    fn diversified(n: usize, capital: Decimal) -> PortfolioContext {
        let mut ctx = context(capital);
        for stock in ranked(n) {
            ctx.liquidity.insert(
                stock.code.clone(),
                InstrumentLiquidity {
                    sector: format!("sector-{}", stock.rank),
                    adtv20: dec!(100000000000),
                },
            );
        }
        ctx
    }

    fn assert_invariants(portfolio: &TargetPortfolio, config: &PortfolioConfig) {
        let total = portfolio.invested_weight() + portfolio.cash_weight;
        assert!((total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE, "sum {total}");
        for p in portfolio.held() {
            assert!(p.weight >= config.min_weight - 1e-12, "{} {}", p.code, p.weight);
            assert!(p.weight <= config.max_weight + 1e-12, "{} {}", p.code, p.weight);
        }
    }

    #[test]
    fn full_candidate_list_follows_tiers() {
        let config = PortfolioConfig::default();
        let ctx = diversified(25, dec!(1000000000));
        let portfolio = PortfolioConstructor::new(config.clone())
            .construct(&ranked(25), &ctx, date())
            .unwrap();

        assert_eq!(portfolio.held().count(), 20);
        assert!((portfolio.positions[0].weight - 0.07).abs() < 1e-12);
        assert!((portfolio.positions[5].weight - 0.04).abs() < 1e-12);
        assert!((portfolio.positions[19].weight - 0.02).abs() < 1e-12);
        assert!((portfolio.cash_weight - 0.15).abs() < 1e-9);
        assert_eq!(portfolio.positions[0].target_value, dec!(70000000));
        assert_eq!(portfolio.positions[0].action, PositionAction::Buy);
        assert_invariants(&portfolio, &config);
    }

    #[test]
    fn short_list_leaves_unfilled_slots_in_cash() {
        let config = PortfolioConfig::default();
        let ctx = diversified(3, dec!(1000000000));
        let portfolio = PortfolioConstructor::new(config.clone())
            .construct(&ranked(3), &ctx, date())
            .unwrap();

        assert_eq!(portfolio.held().count(), 3);
        assert!((portfolio.cash_weight - 0.79).abs() < 1e-9);
        assert_invariants(&portfolio, &config);
    }

    #[test]
    fn short_list_fails_when_strict() {
        let config = PortfolioConfig {
            strict_candidate_count: true,
            ..PortfolioConfig::default()
        };
        let result = PortfolioConstructor::new(config).construct(
            &ranked(3),
            &diversified(3, dec!(1000000000)),
            date(),
        );
        assert_eq!(
            result,
            Err(PortfolioError::InsufficientCandidates {
                available: 3,
                required: 20
            })
        );
    }

    #[test]
    fn sector_ceiling_scales_down() {
        let config = PortfolioConfig::default();
        let mut ctx = diversified(20, dec!(1000000000));
        for stock in ranked(5) {
            ctx.liquidity.get_mut(&stock.code).unwrap().sector = "semis".to_string();
        }
        let portfolio = PortfolioConstructor::new(config.clone())
            .construct(&ranked(20), &ctx, date())
            .unwrap();

        let semis: f64 = portfolio.positions[..5].iter().map(|p| p.weight).sum();
        assert!((semis - 0.30).abs() < 1e-9);
        assert!((portfolio.positions[0].weight - 0.06).abs() < 1e-9);
        assert!(portfolio.positions[0].reason.contains("sector semis"));
        assert_invariants(&portfolio, &config);
    }

    #[test]
    fn liquidity_cap_limits_order_size_and_drops_tiny_positions() {
        let config = PortfolioConfig::default();
        let mut ctx = diversified(20, dec!(10000000000));
        // 10% of 5bn = 500m -> 5% weight
        ctx.liquidity.get_mut(&InstrumentCode::new("S01")).unwrap().adtv20 = dec!(5000000000);
        // 10% of 1bn = 100m -> 1% weight, below minimum
        ctx.liquidity.get_mut(&InstrumentCode::new("S02")).unwrap().adtv20 = dec!(1000000000);

        let portfolio = PortfolioConstructor::new(config.clone())
            .construct(&ranked(20), &ctx, date())
            .unwrap();

        let s01 = portfolio.position(&InstrumentCode::new("S01")).unwrap();
        assert!((s01.weight - 0.05).abs() < 1e-9);
        assert!(s01.reason.contains("liquidity capped"));
        assert!(portfolio.position(&InstrumentCode::new("S02")).is_none());
        assert_eq!(portfolio.held().count(), 19);
        assert_invariants(&portfolio, &config);
    }

    #[test]
    fn holdings_outside_target_are_sold() {
        let config = PortfolioConfig::default();
        let mut ctx = diversified(3, dec!(1000000000));
        let old = InstrumentCode::new("OLD");
        ctx.holdings.insert(
            old.clone(),
            Holding {
                code: old.clone(),
                quantity: 100,
                average_price: dec!(10000),
            },
        );
        ctx.prices.insert(old.clone(), dec!(12000));

        let portfolio = PortfolioConstructor::new(config)
            .construct(&ranked(3), &ctx, date())
            .unwrap();
        let exit = portfolio.position(&old).unwrap();
        assert_eq!(exit.action, PositionAction::Sell);
        assert_eq!(exit.weight, 0.0);
        assert_eq!(exit.target_value, Decimal::ZERO);
        assert!(exit.rank.is_none());
    }

    #[test]
    fn small_delta_is_hold() {
        let config = PortfolioConfig::default();
        let mut ctx = diversified(3, dec!(1000000000));
        let code = InstrumentCode::new("S01");
        // 6,900 shares at 10,000 = 69m against a 70m target (0.1% delta)
        ctx.holdings.insert(
            code.clone(),
            Holding {
                code: code.clone(),
                quantity: 6900,
                average_price: dec!(10000),
            },
        );
        ctx.prices.insert(code.clone(), dec!(10000));

        let portfolio = PortfolioConstructor::new(config)
            .construct(&ranked(3), &ctx, date())
            .unwrap();
        assert_eq!(portfolio.position(&code).unwrap().action, PositionAction::Hold);
    }

    #[test]
    fn non_positive_capital_is_rejected() {
        let result = PortfolioConstructor::new(PortfolioConfig::default()).construct(
            &ranked(3),
            &context(Decimal::ZERO),
            date(),
        );
        assert!(matches!(result, Err(PortfolioError::NonPositiveCapital { .. })));
    }

    #[test]
    fn tier_below_minimum_is_clamped_up() {
        let config = PortfolioConfig {
            target_holdings: 2,
            tiers: vec![TierConfig {
                start_rank: 1,
                end_rank: 2,
                weight: 0.01,
            }],
            cash_weight: 0.98,
            ..PortfolioConfig::default()
        };
        let portfolio = PortfolioConstructor::new(config)
            .construct(&ranked(2), &diversified(2, dec!(1000000000)), date())
            .unwrap();
        assert!((portfolio.positions[0].weight - 0.02).abs() < 1e-12);
        assert!(portfolio.positions[0].reason.contains("clamped"));
    }

    proptest! {
        #[test]
        fn weights_stay_bounded_and_sum_to_one(
            sectors in prop::collection::vec(0usize..4, 1..30),
            adtv_billions in prop::collection::vec(1u32..200, 30),
            capital_millions in 100u32..100_000,
        ) {
            let config = PortfolioConfig::default();
            let stocks = ranked(sectors.len());
            let mut ctx = context(Decimal::from(capital_millions) * dec!(1000000));
            for (i, stock) in stocks.iter().enumerate() {
                ctx.liquidity.insert(
                    stock.code.clone(),
                    InstrumentLiquidity {
                        sector: format!("sector-{}", sectors[i]),
                        adtv20: Decimal::from(adtv_billions[i]) * dec!(1000000000),
                    },
                );
            }

            let portfolio = PortfolioConstructor::new(config.clone())
                .construct(&stocks, &ctx, date())
                .unwrap();

            assert_invariants(&portfolio, &config);
            prop_assert!(portfolio.held().count() <= config.target_holdings);
        }
    }
}
