//! Eager validation of a parsed configuration.
//!
//! Every rule is checked and every failure is reported, so a broken document
//! is fixed in one pass instead of one error at a time.

use rust_decimal::Decimal;
use thiserror::Error;

use super::{BrokerKind, Config, WEIGHT_SUM_TOLERANCE};

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("{field}: {message}")]
pub struct ConfigurationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

#[derive(Default)]
struct Collector {
    errors: Vec<ConfigurationError>,
}

impl Collector {
    fn check(&mut self, ok: bool, field: &str, message: impl FnOnce() -> String) {
        if !ok {
            self.errors.push(ConfigurationError {
                field: field.to_string(),
                message: message(),
            });
        }
    }

    fn positive(&mut self, value: f64, field: &str) {
        self.check(value > 0.0, field, || format!("must be positive, got {value}"));
    }

    fn fraction(&mut self, value: f64, field: &str) {
        self.check((0.0..=1.0).contains(&value), field, || {
            format!("must be within [0, 1], got {value}")
        });
    }

    fn window(&mut self, value: usize, field: &str) {
        self.check(value > 0, field, || "window must be at least 1".to_string());
    }

    /// Blend weights must be finite and non-negative with a positive sum.
    fn blend(&mut self, group: &str, weights: &[(&str, f64)]) {
        for (name, weight) in weights {
            self.check(
                weight.is_finite() && *weight >= 0.0,
                &format!("{group}.{name}"),
                || format!("must not be negative, got {weight}"),
            );
        }
        let total: f64 = weights.iter().map(|(_, weight)| weight).sum();
        self.check(total > 0.0, group, || {
            let names: Vec<&str> = weights.iter().map(|(name, _)| *name).collect();
            format!("{} must sum to a positive value, got {total}", names.join(" + "))
        });
    }
}

/// Validate configuration values.
///
/// Returns every failed rule; an empty list means the configuration is valid.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<ConfigurationError> {
    let mut c = Collector::default();

    validate_signals(config, &mut c);
    validate_ranking(config, &mut c);
    validate_portfolio(config, &mut c);
    validate_execution(config, &mut c);
    validate_risk_gate(config, &mut c);
    validate_broker(config, &mut c);

    c.check(!config.strategy.id.trim().is_empty(), "strategy.id", || {
        "must not be empty".to_string()
    });
    c.check(
        matches!(
            config.observability.logging.format.as_str(),
            "pretty" | "json"
        ),
        "observability.logging.format",
        || {
            format!(
                "must be 'pretty' or 'json', got '{}'",
                config.observability.logging.format
            )
        },
    );
    if let Some(addr) = &config.observability.metrics.listen_addr {
        c.check(
            addr.parse::<std::net::SocketAddr>().is_ok(),
            "observability.metrics.listen_addr",
            || format!("must be a socket address, got '{addr}'"),
        );
    }

    c.errors
}

fn validate_signals(config: &Config, c: &mut Collector) {
    let signals = &config.signals;
    c.check(signals.max_concurrency >= 1, "signals.max_concurrency", || {
        "must be at least 1".to_string()
    });

    let norm = &signals.normalization;
    c.check(
        (0.0..0.5).contains(&norm.winsor_pct),
        "signals.normalization.winsor_pct",
        || format!("must be within [0, 0.5), got {}", norm.winsor_pct),
    );
    c.positive(norm.clip_sigma, "signals.normalization.clip_sigma");
    c.check(
        norm.min_samples >= 2,
        "signals.normalization.min_samples",
        || "must be at least 2".to_string(),
    );

    let m = &signals.momentum;
    c.window(m.short_window, "signals.momentum.short_window");
    c.check(
        m.short_window < m.medium_window && m.medium_window < m.long_window,
        "signals.momentum",
        || {
            format!(
                "windows must satisfy short < medium < long, got {}/{}/{}",
                m.short_window, m.medium_window, m.long_window
            )
        },
    );
    c.window(m.volume_short_window, "signals.momentum.volume_short_window");
    c.check(
        m.volume_short_window < m.volume_long_window,
        "signals.momentum.volume_long_window",
        || "must be longer than volume_short_window".to_string(),
    );
    c.positive(m.scale, "signals.momentum.scale");
    c.blend(
        "signals.momentum",
        &[
            ("short_weight", m.short_weight),
            ("medium_weight", m.medium_weight),
            ("long_weight", m.long_weight),
            ("volume_weight", m.volume_weight),
        ],
    );

    let t = &signals.technical;
    c.window(t.ma_short, "signals.technical.ma_short");
    c.check(t.ma_short < t.ma_long, "signals.technical.ma_long", || {
        format!("must be longer than ma_short ({})", t.ma_short)
    });
    c.window(t.slope_lookback, "signals.technical.slope_lookback");
    c.check(
        t.high_window >= t.ma_long,
        "signals.technical.high_window",
        || format!("must be at least ma_long ({})", t.ma_long),
    );
    c.check(
        t.high_band > 0.0 && t.high_band < 1.0,
        "signals.technical.high_band",
        || format!("must be within (0, 1), got {}", t.high_band),
    );
    c.window(t.rsi_period, "signals.technical.rsi_period");
    c.blend(
        "signals.technical",
        &[
            ("cross_weight", t.cross_weight),
            ("slope_weight", t.slope_weight),
            ("high_weight", t.high_weight),
            ("rsi_weight", t.rsi_weight),
        ],
    );

    let v = &signals.value;
    c.positive(v.neutral_per, "signals.value.neutral_per");
    c.positive(v.neutral_pbr, "signals.value.neutral_pbr");
    c.positive(v.scale, "signals.value.scale");
    c.blend(
        "signals.value",
        &[("per_weight", v.per_weight), ("pbr_weight", v.pbr_weight)],
    );

    let q = &signals.quality;
    c.positive(q.roe_range, "signals.quality.roe_range");
    c.positive(q.debt_range, "signals.quality.debt_range");
    c.blend(
        "signals.quality",
        &[("roe_weight", q.roe_weight), ("debt_weight", q.debt_weight)],
    );

    let f = &signals.flow;
    c.window(f.short_window, "signals.flow.short_window");
    c.check(f.short_window < f.long_window, "signals.flow.long_window", || {
        format!("must be longer than short_window ({})", f.short_window)
    });
    c.window(f.adtv_window, "signals.flow.adtv_window");
    c.positive(f.scale, "signals.flow.scale");
    c.blend(
        "signals.flow",
        &[("short_weight", f.short_weight), ("long_weight", f.long_weight)],
    );
    c.blend(
        "signals.flow",
        &[
            ("foreign_weight", f.foreign_weight),
            ("institution_weight", f.institution_weight),
        ],
    );

    let e = &signals.event;
    c.positive(e.half_life_days, "signals.event.half_life_days");
    c.check(
        (0.0..1.0).contains(&e.min_weight),
        "signals.event.min_weight",
        || format!("must be within [0, 1), got {}", e.min_weight),
    );
    c.positive(e.max_abs_score, "signals.event.max_abs_score");
    c.check(e.lookback_days > 0, "signals.event.lookback_days", || {
        "must be positive".to_string()
    });
}

fn validate_ranking(config: &Config, c: &mut Collector) {
    let ranking = &config.ranking;
    let total = ranking.weights.total();
    c.check(total == 100, "ranking.weights", || {
        format!("must sum to exactly 100, got {total}")
    });

    let correlated = ranking.weights.momentum + ranking.weights.technical;
    c.check(
        correlated <= ranking.max_correlated_weight,
        "ranking.max_correlated_weight",
        || {
            format!(
                "momentum + technical = {correlated} exceeds ceiling {}",
                ranking.max_correlated_weight
            )
        },
    );
}

fn validate_portfolio(config: &Config, c: &mut Collector) {
    let p = &config.portfolio;

    c.check(p.target_holdings >= 1, "portfolio.target_holdings", || {
        "must be at least 1".to_string()
    });
    c.check(
        p.min_weight > 0.0 && p.min_weight <= p.max_weight && p.max_weight <= 1.0,
        "portfolio.min_weight",
        || {
            format!(
                "bounds must satisfy 0 < min <= max <= 1, got [{}, {}]",
                p.min_weight, p.max_weight
            )
        },
    );
    c.fraction(p.cash_weight, "portfolio.cash_weight");
    c.check(
        p.sector_max > 0.0 && p.sector_max <= 1.0,
        "portfolio.sector_max",
        || format!("must be within (0, 1], got {}", p.sector_max),
    );
    c.check(
        p.max_adtv_participation > 0.0 && p.max_adtv_participation <= 1.0,
        "portfolio.max_adtv_participation",
        || format!("must be within (0, 1], got {}", p.max_adtv_participation),
    );
    c.check(
        (0.0..1.0).contains(&p.rebalance_band),
        "portfolio.rebalance_band",
        || format!("must be within [0, 1), got {}", p.rebalance_band),
    );

    if p.tiers.is_empty() {
        c.check(false, "portfolio.tiers", || "at least one tier is required".to_string());
        return;
    }

    let mut expected_start = 1;
    for (i, tier) in p.tiers.iter().enumerate() {
        let field = format!("portfolio.tiers[{i}]");
        c.check(tier.start_rank == expected_start, &field, || {
            format!(
                "must start at rank {expected_start} to stay contiguous, starts at {}",
                tier.start_rank
            )
        });
        c.check(tier.end_rank >= tier.start_rank, &field, || {
            format!(
                "end_rank {} is before start_rank {}",
                tier.end_rank, tier.start_rank
            )
        });
        c.check(
            tier.weight >= p.min_weight && tier.weight <= p.max_weight,
            &field,
            || {
                format!(
                    "weight {} outside position bounds [{}, {}]",
                    tier.weight, p.min_weight, p.max_weight
                )
            },
        );
        expected_start = tier.end_rank.max(tier.start_rank) + 1;
    }

    let slots: usize = p.tiers.iter().map(super::TierConfig::slots).sum();
    c.check(slots == p.target_holdings, "portfolio.tiers", || {
        format!(
            "tier slots ({slots}) must equal target_holdings ({})",
            p.target_holdings
        )
    });

    let invested: f64 = p
        .tiers
        .iter()
        .map(|tier| tier.slots() as f64 * tier.weight)
        .sum();
    let total = invested + p.cash_weight;
    c.check(
        (total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
        "portfolio.cash_weight",
        || format!("tier weights plus cash must equal 1.0 ± {WEIGHT_SUM_TOLERANCE}, got {total:.4}"),
    );
}

fn validate_execution(config: &Config, c: &mut Collector) {
    let e = &config.execution;

    c.check(
        e.limit_offset_bps >= Decimal::ZERO,
        "execution.limit_offset_bps",
        || format!("must not be negative, got {}", e.limit_offset_bps),
    );

    c.check(!e.tick_table.is_empty(), "execution.tick_table", || {
        "at least one band is required".to_string()
    });
    for (i, band) in e.tick_table.iter().enumerate() {
        c.check(band.tick > Decimal::ZERO, &format!("execution.tick_table[{i}]"), || {
            format!("tick must be positive, got {}", band.tick)
        });
    }
    let bounds: Vec<Decimal> = e.tick_table.iter().filter_map(|band| band.below).collect();
    c.check(
        bounds.windows(2).all(|pair| pair[0] < pair[1]),
        "execution.tick_table",
        || "bands must be sorted by ascending upper bound".to_string(),
    );
    c.check(
        e.tick_table.last().is_some_and(|band| band.below.is_none()),
        "execution.tick_table",
        || "last band must be open-ended (no `below`)".to_string(),
    );

    let s = &e.splitting;
    c.positive(s.trigger_ratio, "execution.splitting.trigger_ratio");
    c.check(s.min_slices >= 1, "execution.splitting.min_slices", || {
        "must be at least 1".to_string()
    });
    c.check(
        s.min_slices <= s.max_slices,
        "execution.splitting.max_slices",
        || {
            format!(
                "must be at least min_slices ({}), got {}",
                s.min_slices, s.max_slices
            )
        },
    );
    c.check(s.interval_secs > 0, "execution.splitting.interval_secs", || {
        "must be positive".to_string()
    });

    c.check(
        !e.slippage_segments.is_empty(),
        "execution.slippage_segments",
        || "at least one segment is required".to_string(),
    );
    for (i, segment) in e.slippage_segments.iter().enumerate() {
        let field = format!("execution.slippage_segments[{i}]");
        c.check(
            (0.0..1.0).contains(&segment.slippage_pct),
            &field,
            || format!("slippage_pct must be within [0, 1), got {}", segment.slippage_pct),
        );
        c.check(segment.min_adtv >= Decimal::ZERO, &field, || {
            format!("min_adtv must not be negative, got {}", segment.min_adtv)
        });
    }
}

fn validate_risk_gate(config: &Config, c: &mut Collector) {
    let r = &config.risk_gate;

    for (i, limit) in r.var_limits.iter().enumerate() {
        let field = format!("risk_gate.var_limits[{i}]");
        c.check(
            limit.confidence > 0.0 && limit.confidence < 1.0,
            &field,
            || format!("confidence must be within (0, 1), got {}", limit.confidence),
        );
        c.check(limit.max_loss_pct > 0.0, &field, || {
            format!("max_loss_pct must be positive, got {}", limit.max_loss_pct)
        });
    }
    c.check(
        r.max_position_weight > 0.0 && r.max_position_weight <= 1.0,
        "risk_gate.max_position_weight",
        || format!("must be within (0, 1], got {}", r.max_position_weight),
    );
    c.check(r.lookback_days >= 2, "risk_gate.lookback_days", || {
        "must be at least 2".to_string()
    });
    c.positive(r.default_volatility, "risk_gate.default_volatility");
    c.check(
        (0.0..=1.0).contains(&r.correlation),
        "risk_gate.correlation",
        || format!("must be within [0, 1], got {}", r.correlation),
    );
    c.check(r.horizon_days >= 1, "risk_gate.horizon_days", || {
        "must be at least 1".to_string()
    });
    c.check(r.timeout_ms > 0, "risk_gate.timeout_ms", || {
        "must be positive".to_string()
    });
}

fn validate_broker(config: &Config, c: &mut Collector) {
    let b = &config.broker;

    c.positive(b.requests_per_second, "broker.requests_per_second");
    c.check(b.max_in_flight >= 1, "broker.max_in_flight", || {
        "must be at least 1".to_string()
    });
    c.check(b.request_timeout_ms > 0, "broker.request_timeout_ms", || {
        "must be positive".to_string()
    });
    c.check(
        b.retry.backoff_multiplier >= 1.0,
        "broker.retry.backoff_multiplier",
        || format!("must be at least 1.0, got {}", b.retry.backoff_multiplier),
    );
    c.fraction(b.retry.jitter_factor, "broker.retry.jitter_factor");
    if b.kind == BrokerKind::Http {
        c.check(
            b.base_url.starts_with("http://") || b.base_url.starts_with("https://"),
            "broker.base_url",
            || format!("must be an http(s) URL, got '{}'", b.base_url),
        );
        c.check(
            !b.app_key.is_empty() && !b.app_secret.is_empty(),
            "broker.app_key",
            || "app_key and app_secret are required for the http broker".to_string(),
        );
    }
    c.check(
        config.monitor.poll_interval_ms > 0,
        "monitor.poll_interval_ms",
        || "must be positive".to_string(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SlippageSegment, TierConfig};
    use test_case::test_case;

    fn fields(config: &Config) -> Vec<String> {
        validate_config(config)
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn default_config_passes() {
        assert!(validate_config(&Config::default()).is_empty());
    }

    #[test_case(26, 15, "ranking.weights" ; "sum above 100")]
    #[test_case(24, 15, "ranking.weights" ; "sum below 100")]
    fn weights_must_sum_to_100(momentum: u32, technical: u32, field: &str) {
        let mut config = Config::default();
        config.ranking.weights.momentum = momentum;
        config.ranking.weights.technical = technical;
        assert!(fields(&config).contains(&field.to_string()));
    }

    #[test]
    fn correlated_weight_ceiling() {
        let mut config = Config::default();
        config.ranking.weights.momentum = 40;
        config.ranking.weights.technical = 15;
        config.ranking.weights.flow = 5;
        assert_eq!(config.ranking.weights.total(), 100);
        assert_eq!(fields(&config), vec!["ranking.max_correlated_weight"]);
    }

    #[test]
    fn tier_gap_is_reported() {
        let mut config = Config::default();
        config.portfolio.tiers[1].start_rank = 7;
        let fields = fields(&config);
        assert!(fields.contains(&"portfolio.tiers[1]".to_string()));
    }

    #[test]
    fn tier_slots_must_match_target_holdings() {
        let mut config = Config::default();
        config.portfolio.target_holdings = 3;
        let fields = fields(&config);
        assert!(fields.contains(&"portfolio.tiers".to_string()));
    }

    #[test]
    fn tier_weights_plus_cash_must_sum_to_one() {
        let mut config = Config::default();
        config.portfolio.cash_weight = 0.05;
        assert!(fields(&config).contains(&"portfolio.cash_weight".to_string()));
    }

    #[test]
    fn three_slot_scheme_is_valid() {
        let mut config = Config::default();
        config.portfolio.target_holdings = 3;
        config.portfolio.tiers = vec![TierConfig {
            start_rank: 1,
            end_rank: 3,
            weight: 0.30,
        }];
        config.portfolio.max_weight = 0.30;
        config.portfolio.cash_weight = 0.10;
        config.risk_gate.max_position_weight = 0.30;
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn zero_flow_window_weights_are_rejected() {
        let mut config = Config::default();
        config.signals.flow.short_weight = 0.0;
        config.signals.flow.long_weight = 0.0;
        assert_eq!(fields(&config), vec!["signals.flow"]);
    }

    #[test_case("signals.momentum.short_weight" ; "momentum")]
    #[test_case("signals.technical.rsi_weight" ; "technical")]
    #[test_case("signals.value.pbr_weight" ; "value")]
    #[test_case("signals.quality.debt_weight" ; "quality")]
    #[test_case("signals.flow.institution_weight" ; "flow")]
    fn negative_sub_weight_is_rejected(field: &str) {
        let mut config = Config::default();
        let s = &mut config.signals;
        match field {
            "signals.momentum.short_weight" => s.momentum.short_weight = -5.0,
            "signals.technical.rsi_weight" => s.technical.rsi_weight = -0.1,
            "signals.value.pbr_weight" => s.value.pbr_weight = -0.4,
            "signals.quality.debt_weight" => s.quality.debt_weight = -1.0,
            _ => s.flow.institution_weight = -0.2,
        }
        assert!(fields(&config).contains(&field.to_string()));
    }

    #[test]
    fn single_term_blend_is_allowed() {
        let mut config = Config::default();
        config.signals.value.pbr_weight = 0.0;
        config.signals.quality.roe_weight = 0.0;
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn invalid_windows_are_reported() {
        let mut config = Config::default();
        config.signals.momentum.medium_window = 10;
        config.signals.technical.ma_long = 3;
        let fields = fields(&config);
        assert!(fields.contains(&"signals.momentum".to_string()));
        assert!(fields.contains(&"signals.technical.ma_long".to_string()));
    }

    #[test]
    fn split_bounds_are_checked() {
        let mut config = Config::default();
        config.execution.splitting.min_slices = 5;
        config.execution.splitting.max_slices = 2;
        assert_eq!(fields(&config), vec!["execution.splitting.max_slices"]);
    }

    #[test]
    fn slippage_pct_must_be_fraction() {
        let mut config = Config::default();
        config.execution.slippage_segments = vec![SlippageSegment {
            min_adtv: Decimal::ZERO,
            slippage_pct: 1.5,
        }];
        assert_eq!(fields(&config), vec!["execution.slippage_segments[0]"]);
    }

    #[test]
    fn multiple_failures_are_all_reported() {
        let mut config = Config::default();
        config.signals.max_concurrency = 0;
        config.broker.requests_per_second = 0.0;
        config.risk_gate.var_limits[0].confidence = 1.5;
        let fields = fields(&config);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn http_broker_needs_url_and_credentials() {
        let mut config = Config::default();
        config.broker.kind = BrokerKind::Http;
        config.broker.base_url = "broker.local".to_string();
        assert_eq!(fields(&config), vec!["broker.base_url", "broker.app_key"]);

        config.broker.base_url = "https://broker.local".to_string();
        config.broker.app_key = "key".to_string();
        config.broker.app_secret = "secret".to_string();
        assert!(fields(&config).is_empty());
    }
}
