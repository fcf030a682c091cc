//! Execution planner.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::errors::ExecutionError;
use super::pricing::{PriceRounding, expected_slippage, round_to_tick};
use super::splitter::OrderSplitter;
use crate::config::ExecutionConfig;
use crate::domain::order_execution::{CreateOrderCommand, Order, OrderSide, OrderType};
use crate::domain::portfolio::{PortfolioContext, PositionAction, TargetPortfolio, TargetPosition};
use crate::domain::shared::{InstrumentCode, OrderId};
use crate::domain::snapshot::DecisionSnapshot;
use crate::observability::record_plan;

/// A position that produced no order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRejection {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Stable reason, e.g. `ZERO_QUANTITY`.
    pub reason: String,
    /// Human-readable detail.
    pub message: String,
}

impl From<&ExecutionError> for PlanRejection {
    fn from(err: &ExecutionError) -> Self {
        Self {
            code: err.code().clone(),
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }
}

/// Planned orders plus the positions that could not be planned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanResult {
    /// Orders, sells before buys.
    pub orders: Vec<Order>,
    /// Per-position rejections.
    pub rejections: Vec<PlanRejection>,
}

/// Number of whole shares `value` buys at `price` (floor, never rounded up).
#[must_use]
pub fn shares_for_value(value: Decimal, price: Decimal) -> u64 {
    if price <= Decimal::ZERO || value <= Decimal::ZERO {
        return 0;
    }
    (value / price).floor().to_u64().unwrap_or(0)
}

/// Turns a target portfolio into broker-ready orders.
#[derive(Debug, Clone)]
pub struct ExecutionPlanner {
    config: ExecutionConfig,
    splitter: OrderSplitter,
}

impl ExecutionPlanner {
    /// Create a planner.
    #[must_use]
    pub fn new(config: ExecutionConfig) -> Self {
        let splitter = OrderSplitter::new(config.splitting.clone());
        Self { config, splitter }
    }

    /// Plan orders for `portfolio`.
    ///
    /// Deterministic: ids and timestamps come from `snapshot`, so the same
    /// inputs yield identical orders.
    #[must_use]
    pub fn plan(
        &self,
        portfolio: &TargetPortfolio,
        context: &PortfolioContext,
        snapshot: &DecisionSnapshot,
    ) -> PlanResult {
        let mut sells = Vec::new();
        let mut buys = Vec::new();
        let mut result = PlanResult::default();

        for position in &portfolio.positions {
            match self.plan_position(position, context, snapshot) {
                Ok(Some(command)) => match command.side {
                    OrderSide::Sell => sells.push(command),
                    OrderSide::Buy => buys.push(command),
                },
                Ok(None) => {}
                Err(err) => {
                    warn!(code = %position.code, reason = err.reason(), error = %err, "Order rejected at planning");
                    result.rejections.push(PlanRejection::from(&err));
                }
            }
        }

        for command in sells.into_iter().chain(buys) {
            let adtv = context.liquidity.get(&command.code).map(|l| l.adtv20);
            for slice in self.splitter.split(command, adtv) {
                let code = slice.code.clone();
                match Order::new(slice) {
                    Ok(order) => result.orders.push(order),
                    Err(source) => {
                        let err = ExecutionError::InvalidOrder { code, source };
                        warn!(error = %err, "Order rejected at planning");
                        result.rejections.push(PlanRejection::from(&err));
                    }
                }
            }
        }

        record_plan(result.orders.len(), result.rejections.len());
        info!(
            run_id = %snapshot.run_id,
            orders = result.orders.len(),
            rejections = result.rejections.len(),
            "Execution plan complete"
        );
        result
    }

    fn plan_position(
        &self,
        position: &TargetPosition,
        context: &PortfolioContext,
        snapshot: &DecisionSnapshot,
    ) -> Result<Option<CreateOrderCommand>, ExecutionError> {
        let code = &position.code;
        if position.action == PositionAction::Hold {
            debug!(code = %code, "Within rebalance band, no order");
            return Ok(None);
        }

        let price = context
            .prices
            .get(code)
            .copied()
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| ExecutionError::MissingPrice { code: code.clone() })?;

        let held = context.held_quantity(code);
        let current = price * Decimal::from(held);

        let (side, value, quantity) = match position.action {
            PositionAction::Sell => {
                let value = current - position.target_value;
                let quantity = if position.weight <= 0.0 {
                    held
                } else {
                    shares_for_value(value, price).min(held)
                };
                (OrderSide::Sell, value, quantity)
            }
            PositionAction::Buy | PositionAction::Hold => {
                let value = position.target_value - current;
                (OrderSide::Buy, value, shares_for_value(value, price))
            }
        };

        if quantity == 0 {
            return Err(ExecutionError::ZeroQuantity {
                code: code.clone(),
                side,
                value,
                price,
            });
        }

        let limit_price = match self.config.order_type {
            OrderType::Market => None,
            OrderType::Limit => Some(self.limit_price(price, side)),
        };
        let adtv = context.liquidity.get(code).map(|l| l.adtv20);

        Ok(Some(CreateOrderCommand {
            id: OrderId::new(format!("{}-{}-{code}", snapshot.run_id, side.tag())),
            code: code.clone(),
            side,
            order_type: self.config.order_type,
            quantity,
            price: limit_price,
            reference_price: price,
            expected_slippage_pct: expected_slippage(&self.config.slippage_segments, adtv),
            created_at: snapshot.created_at,
            slice: None,
        }))
    }

    /// Current price moved by the configured offset against us, on the tick grid.
    fn limit_price(&self, price: Decimal, side: OrderSide) -> Decimal {
        let offset = price * self.config.limit_offset_bps / Decimal::from(10_000);
        match side {
            OrderSide::Buy => {
                round_to_tick(&self.config.tick_table, price + offset, PriceRounding::Up)
            }
            OrderSide::Sell => {
                round_to_tick(&self.config.tick_table, price - offset, PriceRounding::Down)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::load_config_from_string;
    use crate::domain::order_execution::OrderStatus;
    use crate::domain::portfolio::{Holding, InstrumentLiquidity};

    fn snapshot() -> DecisionSnapshot {
        let doc = load_config_from_string("strategy:\n  id: test\n").unwrap();
        DecisionSnapshot::new(&doc, "snap", Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap())
    }

    fn position(code: &str, weight: f64, value: Decimal, action: PositionAction) -> TargetPosition {
        TargetPosition {
            code: InstrumentCode::new(code),
            name: code.to_string(),
            rank: Some(1),
            weight,
            target_value: value,
            action,
            reason: String::new(),
        }
    }

    fn portfolio(positions: Vec<TargetPosition>) -> TargetPortfolio {
        TargetPortfolio {
            date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            positions,
            cash_weight: 0.5,
        }
    }

    fn context(prices: &[(&str, Decimal)]) -> PortfolioContext {
        let mut ctx = PortfolioContext {
            total_capital: dec!(1000000000),
            ..PortfolioContext::default()
        };
        for (code, price) in prices {
            let code = InstrumentCode::new(*code);
            ctx.prices.insert(code.clone(), *price);
            ctx.liquidity.insert(
                code,
                InstrumentLiquidity {
                    sector: "any".to_string(),
                    adtv20: dec!(100000000000),
                },
            );
        }
        ctx
    }

    fn hold(ctx: &mut PortfolioContext, code: &str, quantity: u64) {
        let code = InstrumentCode::new(code);
        ctx.holdings.insert(
            code.clone(),
            Holding {
                code,
                quantity,
                average_price: dec!(1000),
            },
        );
    }

    #[test]
    fn quantity_is_floored() {
        assert_eq!(shares_for_value(dec!(1000000), dec!(50000)), 20);
        assert_eq!(shares_for_value(dec!(999999), dec!(50000)), 19);
        assert_eq!(shares_for_value(dec!(49999), dec!(50000)), 0);
    }

    #[test]
    fn buy_with_limit_price_on_tick() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let result = planner.plan(
            &portfolio(vec![position("A", 0.07, dec!(1000000), PositionAction::Buy)]),
            &context(&[("A", dec!(50000))]),
            &snapshot(),
        );
        assert!(result.rejections.is_empty());
        let order = &result.orders[0];
        assert_eq!(order.quantity(), 20);
        assert_eq!(order.side(), OrderSide::Buy);
        // 50,000 + 10bps = 50,050 -> next 100 tick
        assert_eq!(order.price(), Some(dec!(50100)));
        assert_eq!(order.reference_price(), dec!(50000));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.expected_slippage_pct(), 0.001);
        assert!(order.id().as_str().ends_with("-B-A"));
    }

    #[test]
    fn sells_come_before_buys() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let mut ctx = context(&[("A", dec!(10000)), ("B", dec!(10000))]);
        hold(&mut ctx, "B", 500);
        let result = planner.plan(
            &portfolio(vec![
                position("A", 0.07, dec!(1000000), PositionAction::Buy),
                position("B", 0.0, Decimal::ZERO, PositionAction::Sell),
            ]),
            &ctx,
            &snapshot(),
        );
        assert_eq!(result.orders.len(), 2);
        assert_eq!(result.orders[0].side(), OrderSide::Sell);
        assert_eq!(result.orders[0].quantity(), 500);
        // 10,000 - 10bps = 9,990 -> tick 10
        assert_eq!(result.orders[0].price(), Some(dec!(9990)));
        assert_eq!(result.orders[1].side(), OrderSide::Buy);
    }

    #[test]
    fn partial_sell_is_capped_at_holding() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let mut ctx = context(&[("A", dec!(10000))]);
        hold(&mut ctx, "A", 100);
        // current 1,000,000; target 100,000 -> sell 90
        let result = planner.plan(
            &portfolio(vec![position("A", 0.02, dec!(100000), PositionAction::Sell)]),
            &ctx,
            &snapshot(),
        );
        assert_eq!(result.orders[0].quantity(), 90);
    }

    #[test]
    fn zero_quantity_is_rejected_not_ordered() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let result = planner.plan(
            &portfolio(vec![
                position("A", 0.02, dec!(40000), PositionAction::Buy),
                position("B", 0.07, dec!(1000000), PositionAction::Buy),
            ]),
            &context(&[("A", dec!(50000)), ("B", dec!(50000))]),
            &snapshot(),
        );
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.rejections.len(), 1);
        assert_eq!(result.rejections[0].reason, "ZERO_QUANTITY");
        assert_eq!(result.rejections[0].code, InstrumentCode::new("A"));
    }

    #[test]
    fn missing_price_is_rejected() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let result = planner.plan(
            &portfolio(vec![position("X", 0.07, dec!(1000000), PositionAction::Buy)]),
            &context(&[]),
            &snapshot(),
        );
        assert_eq!(result.rejections[0].reason, "MISSING_PRICE");
    }

    #[test]
    fn hold_produces_nothing() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let result = planner.plan(
            &portfolio(vec![position("A", 0.07, dec!(1000000), PositionAction::Hold)]),
            &context(&[("A", dec!(50000))]),
            &snapshot(),
        );
        assert_eq!(result, PlanResult::default());
    }

    #[test]
    fn market_orders_carry_no_price() {
        let planner = ExecutionPlanner::new(ExecutionConfig {
            order_type: OrderType::Market,
            ..ExecutionConfig::default()
        });
        let result = planner.plan(
            &portfolio(vec![position("A", 0.07, dec!(1000000), PositionAction::Buy)]),
            &context(&[("A", dec!(50000))]),
            &snapshot(),
        );
        assert_eq!(result.orders[0].price(), None);
    }

    #[test]
    fn plans_are_byte_identical() {
        let planner = ExecutionPlanner::new(ExecutionConfig::default());
        let portfolio = portfolio(vec![
            position("A", 0.07, dec!(70000000), PositionAction::Buy),
            position("B", 0.04, dec!(40000000), PositionAction::Buy),
        ]);
        let mut ctx = context(&[("A", dec!(50000)), ("B", dec!(12345))]);
        ctx.liquidity.get_mut(&InstrumentCode::new("A")).unwrap().adtv20 = dec!(1000000000);

        let first = serde_json::to_string(&planner.plan(&portfolio, &ctx, &snapshot())).unwrap();
        let second = serde_json::to_string(&planner.plan(&portfolio, &ctx, &snapshot())).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"parent_id\""));
    }
}
