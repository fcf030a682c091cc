//! Shared market snapshot fixture.

#![allow(clippy::unwrap_used, dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

use decision_engine::infrastructure::market_data::JsonSnapshotRepository;

pub const BARS: i64 = 130;
pub const CAPITAL: Decimal = dec!(100_000_000);

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

struct Profile {
    code: &'static str,
    drift: f64,
    per: f64,
    pbr: f64,
    roe: f64,
    debt_ratio: f64,
    net_buying: f64,
    event_score: Option<f64>,
}

/// A dominates on every input, C trails on every input.
fn profiles() -> [Profile; 3] {
    [
        Profile {
            code: "A",
            drift: 0.004,
            per: 6.0,
            pbr: 0.6,
            roe: 0.20,
            debt_ratio: 0.3,
            net_buying: 2_000_000_000.0,
            event_score: Some(3.0),
        },
        Profile {
            code: "B",
            drift: 0.002,
            per: 12.0,
            pbr: 1.0,
            roe: 0.10,
            debt_ratio: 1.0,
            net_buying: 0.0,
            event_score: None,
        },
        Profile {
            code: "C",
            drift: 0.0005,
            per: 25.0,
            pbr: 2.5,
            roe: 0.03,
            debt_ratio: 2.0,
            net_buying: -2_000_000_000.0,
            event_score: Some(-2.0),
        },
    ]
}

fn instrument(p: &Profile) -> Value {
    let day = |i: i64| (date() - Duration::days(BARS - 1 - i)).to_string();
    let bars: Vec<Value> = (0..BARS)
        .map(|i| {
            let close = 10_000.0 * (1.0 + p.drift).powi(i as i32);
            json!({
                "date": day(i), "open": close, "high": close * 1.01, "low": close * 0.99,
                "close": close, "volume": 1_000_000.0, "traded_value": close * 1_000_000.0
            })
        })
        .collect();
    let flows: Vec<Value> = (BARS - 30..BARS)
        .map(|i| json!({ "date": day(i), "foreign_net": p.net_buying, "institution_net": p.net_buying / 2.0 }))
        .collect();
    let events: Vec<Value> = p
        .event_score
        .map(|score| vec![json!({ "date": day(BARS - 3), "kind": "disclosure", "score": score })])
        .unwrap_or_default();

    json!({
        "code": p.code,
        "name": format!("Stock {}", p.code),
        "sector": "IT",
        "bars": bars,
        "fundamentals": { "per": p.per, "pbr": p.pbr, "roe": p.roe, "debt_ratio": p.debt_ratio },
        "flows": flows,
        "events": events
    })
}

pub fn snapshot() -> Arc<JsonSnapshotRepository> {
    Arc::new(JsonSnapshotRepository::from_json(&snapshot_json()).unwrap())
}

/// Three IT instruments over 130 sessions with 100M KRW cash.
pub fn snapshot_json() -> String {
    json!({
        "snapshot_id": "krx-20250630",
        "date": date().to_string(),
        "quality_gate": { "passed": true, "coverage": 1.0 },
        "account": { "cash": CAPITAL.to_string() },
        "instruments": profiles().iter().map(instrument).collect::<Vec<_>>()
    })
    .to_string()
}
