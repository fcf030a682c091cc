//! Tick rounding and slippage tiers.

use rust_decimal::Decimal;

use crate::config::{SlippageSegment, TickBand};

/// Rounding direction for limit prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRounding {
    /// Round up to the next tick (buys).
    Up,
    /// Round down to the previous tick (sells).
    Down,
}

/// Tick size for a price: the first band whose upper bound exceeds it.
///
/// Returns `None` only for an empty table.
#[must_use]
pub fn tick_size(table: &[TickBand], price: Decimal) -> Option<Decimal> {
    table
        .iter()
        .find(|band| band.below.is_none_or(|below| price < below))
        .map(|band| band.tick)
}

/// Round a price onto the tick grid.
///
/// A downward rounding never produces less than one tick.
#[must_use]
pub fn round_to_tick(table: &[TickBand], price: Decimal, rounding: PriceRounding) -> Decimal {
    let Some(tick) = tick_size(table, price).filter(|t| *t > Decimal::ZERO) else {
        return price;
    };
    let steps = price / tick;
    let steps = match rounding {
        PriceRounding::Up => steps.ceil(),
        PriceRounding::Down => steps.floor(),
    };
    (steps * tick).max(tick).normalize()
}

/// Expected slippage for an instrument's ADTV20.
///
/// Segments are evaluated from the highest threshold down and the first
/// match wins. Unknown liquidity is treated as zero.
#[must_use]
pub fn expected_slippage(segments: &[SlippageSegment], adtv20: Option<Decimal>) -> f64 {
    let adtv = adtv20.unwrap_or(Decimal::ZERO);
    let mut ordered: Vec<&SlippageSegment> = segments.iter().collect();
    ordered.sort_by(|a, b| b.min_adtv.cmp(&a.min_adtv));
    ordered
        .into_iter()
        .find(|segment| adtv >= segment.min_adtv)
        .or_else(|| segments.iter().min_by(|a, b| a.min_adtv.cmp(&b.min_adtv)))
        .map_or(0.0, |segment| segment.slippage_pct)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;
    use crate::config::ExecutionConfig;

    fn table() -> Vec<TickBand> {
        ExecutionConfig::default().tick_table
    }

    #[test_case(dec!(1999), dec!(1) ; "below 2000")]
    #[test_case(dec!(2000), dec!(5) ; "band boundary")]
    #[test_case(dec!(49950), dec!(50) ; "mid band")]
    #[test_case(dec!(750000), dec!(1000) ; "open ended")]
    fn tick_bands(price: Decimal, expected: Decimal) {
        assert_eq!(tick_size(&table(), price), Some(expected));
    }

    #[test]
    fn buy_rounds_up_sell_rounds_down() {
        assert_eq!(round_to_tick(&table(), dec!(50050.5), PriceRounding::Up), dec!(50100));
        assert_eq!(round_to_tick(&table(), dec!(50050.5), PriceRounding::Down), dec!(50000));
        assert_eq!(round_to_tick(&table(), dec!(50000), PriceRounding::Up), dec!(50000));
    }

    #[test]
    fn down_rounding_keeps_one_tick() {
        assert_eq!(round_to_tick(&table(), dec!(0.4), PriceRounding::Down), dec!(1));
    }

    #[test]
    fn slippage_tiers_highest_first() {
        let segments = ExecutionConfig::default().slippage_segments;
        assert_eq!(expected_slippage(&segments, Some(dec!(200000000000))), 0.001);
        assert_eq!(expected_slippage(&segments, Some(dec!(50000000000))), 0.002);
        assert_eq!(expected_slippage(&segments, Some(dec!(2000000000))), 0.004);
        assert_eq!(expected_slippage(&segments, Some(dec!(5000000))), 0.008);
        assert_eq!(expected_slippage(&segments, None), 0.008);
    }
}
