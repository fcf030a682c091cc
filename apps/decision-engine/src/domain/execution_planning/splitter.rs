//! Liquidity-driven order splitting.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::config::SplittingConfig;
use crate::domain::order_execution::{CreateOrderCommand, SliceInfo};
use crate::domain::shared::OrderId;

/// Splits orders whose notional is large relative to ADTV20.
#[derive(Debug, Clone)]
pub struct OrderSplitter {
    config: SplittingConfig,
}

impl OrderSplitter {
    /// Create a splitter.
    #[must_use]
    pub const fn new(config: SplittingConfig) -> Self {
        Self { config }
    }

    /// Number of slices for a notional/ADTV ratio, 1 when below the trigger.
    #[must_use]
    pub fn slice_count(&self, ratio: f64) -> u32 {
        let c = &self.config;
        if !ratio.is_finite() || ratio <= c.trigger_ratio {
            return 1;
        }
        let wanted = (ratio / c.trigger_ratio).ceil();
        let wanted = if wanted >= f64::from(c.max_slices) {
            c.max_slices
        } else {
            wanted as u32
        };
        wanted.clamp(c.min_slices, c.max_slices)
    }

    /// Split one order.
    ///
    /// Market orders, orders without a positive price and orders for
    /// instruments without liquidity data are returned unsplit. Slice
    /// quantities differ by at most one share and sum to the original.
    #[must_use]
    pub fn split(&self, order: CreateOrderCommand, adtv20: Option<Decimal>) -> Vec<CreateOrderCommand> {
        if !self.config.enabled || order.order_type.is_market() {
            return vec![order];
        }
        let Some(price) = order.price.filter(|p| *p > Decimal::ZERO) else {
            return vec![order];
        };
        let Some(adtv) = adtv20.filter(|a| *a > Decimal::ZERO) else {
            return vec![order];
        };

        let notional = price * Decimal::from(order.quantity);
        let ratio = (notional / adtv).to_f64().unwrap_or(0.0);
        let count = u64::from(self.slice_count(ratio)).min(order.quantity);
        if count <= 1 {
            return vec![order];
        }

        debug!(
            order_id = %order.id,
            ratio,
            slices = count,
            "Splitting order"
        );

        let base = order.quantity / count;
        let remainder = order.quantity % count;
        let interval_secs = self.config.interval_secs.min(86_400);
        let interval = Duration::seconds(i64::try_from(interval_secs).unwrap_or(0));
        let parent_id = order.id.clone();

        (0..count)
            .map(|index| {
                let quantity = base + u64::from(index < remainder);
                let offset = i32::try_from(index).unwrap_or(i32::MAX);
                CreateOrderCommand {
                    id: OrderId::new(format!("{parent_id}-{:02}", index + 1)),
                    quantity,
                    slice: Some(SliceInfo {
                        parent_id: parent_id.clone(),
                        index: u32::try_from(index).unwrap_or(u32::MAX),
                        count: u32::try_from(count).unwrap_or(u32::MAX),
                        scheduled_at: order.created_at + interval * offset,
                        offset_secs: interval_secs * index,
                    }),
                    ..order.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::order_execution::{OrderSide, OrderType};
    use crate::domain::shared::InstrumentCode;

    fn splitter() -> OrderSplitter {
        OrderSplitter::new(SplittingConfig::default())
    }

    fn command(quantity: u64, price: Option<Decimal>, order_type: OrderType) -> CreateOrderCommand {
        CreateOrderCommand {
            id: OrderId::new("run-B-005930"),
            code: InstrumentCode::new("005930"),
            side: OrderSide::Buy,
            order_type,
            quantity,
            price,
            reference_price: price.unwrap_or(dec!(50000)),
            expected_slippage_pct: 0.004,
            created_at: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
            slice: None,
        }
    }

    #[test]
    fn large_order_is_split_within_bounds() {
        // 3,000 shares at 50,000 = 150,000,000 against ADTV 2,000,000,000 (7.5%)
        let order = command(3000, Some(dec!(50000)), OrderType::Limit);
        let slices = splitter().split(order, Some(dec!(2000000000)));

        let config = SplittingConfig::default();
        let n = slices.len() as u32;
        assert!(n >= config.min_slices && n <= config.max_slices);
        assert_eq!(n, 4);
        assert_eq!(slices.iter().map(|s| s.quantity).sum::<u64>(), 3000);
        assert_eq!(slices[0].id.as_str(), "run-B-005930-01");
        let info = slices[3].slice.as_ref().unwrap();
        assert_eq!(info.parent_id.as_str(), "run-B-005930");
        assert_eq!(info.index, 3);
        assert_eq!(info.count, 4);
        assert_eq!(
            info.scheduled_at,
            Utc.with_ymd_and_hms(2025, 6, 30, 0, 15, 0).unwrap()
        );
        assert_eq!(info.offset_secs, 900);
        assert_eq!(slices[0].slice.as_ref().unwrap().offset_secs, 0);
    }

    #[test]
    fn remainder_goes_to_first_slices() {
        let order = command(3001, Some(dec!(50000)), OrderType::Limit);
        let slices = splitter().split(order, Some(dec!(2000000000)));
        let quantities: Vec<u64> = slices.iter().map(|s| s.quantity).collect();
        assert_eq!(quantities, vec![751, 750, 750, 750]);
    }

    #[test]
    fn market_order_is_never_split() {
        let order = command(1_000_000, None, OrderType::Market);
        let slices = splitter().split(order.clone(), Some(dec!(1000000)));
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].quantity, order.quantity);
        assert!(slices[0].slice.is_none());
    }

    #[test]
    fn zero_price_is_never_split() {
        let order = command(1_000_000, Some(Decimal::ZERO), OrderType::Limit);
        assert_eq!(splitter().split(order, Some(dec!(1000000))).len(), 1);
    }

    #[test]
    fn small_order_is_not_split() {
        let order = command(100, Some(dec!(50000)), OrderType::Limit);
        assert_eq!(splitter().split(order, Some(dec!(2000000000))).len(), 1);
    }

    #[test]
    fn slice_count_is_clamped() {
        let s = splitter();
        assert_eq!(s.slice_count(0.01), 1);
        assert_eq!(s.slice_count(0.021), 2);
        assert_eq!(s.slice_count(0.075), 4);
        assert_eq!(s.slice_count(5.0), 10);
    }

    proptest! {
        #[test]
        fn slices_sum_exactly_and_differ_by_at_most_one(
            quantity in 1u64..200_000,
            price in 1_000i64..500_000,
            adtv in 1_000_000i64..10_000_000_000,
        ) {
            let order = command(quantity, Some(Decimal::from(price)), OrderType::Limit);
            let slices = splitter().split(order, Some(Decimal::from(adtv)));
            let config = SplittingConfig::default();

            prop_assert!(slices.len() as u32 <= config.max_slices);
            prop_assert_eq!(slices.iter().map(|s| s.quantity).sum::<u64>(), quantity);
            let max = slices.iter().map(|s| s.quantity).max().unwrap();
            let min = slices.iter().map(|s| s.quantity).min().unwrap();
            prop_assert!(max - min <= 1);
            prop_assert!(min > 0);
        }
    }
}
