//! Rank-normalized factor scoring.
//!
//! Every factor is turned into a unit-free score in `[0, 1]` by fractional
//! ranking, then combined per profile as a weighted linear sum. Ranks are
//! always computed within the subset of rows the profile scores.

use std::cmp::Ordering;

use serde::Serialize;

use super::config::{ProfileWeights, WatchlistConfig};
use super::normalize::CanonicalRow;
use super::quantitative::sector_key;

// ============================================================================
// Rank Normalization
// ============================================================================

/// Which end of a factor's range is considered best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Largest value scores 1
    FavorHigh,
    /// Smallest value scores 1
    FavorLow,
}

/// Fractional ranks (1-based, ties averaged) in input order.
fn fractional_ranks(values: &[f64]) -> Vec<f64> {
    // -0.0 and 0.0 must tie; total_cmp alone would order them
    let values: Vec<f64> = values.iter().map(|v| v + 0.0).collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len()
            && values[order[end]].total_cmp(&values[order[start]]) == Ordering::Equal
        {
            end += 1;
        }
        // positions start+1 ..= end share their mean
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Rank `values` and rescale the ranks linearly onto `[0, 1]`.
///
/// The best row per `direction` scores 1 and the worst 0. When every value
/// is equal there is no spread, and every row scores 0.5.
pub fn rank_normalize(values: &[f64], direction: Direction) -> Vec<f64> {
    let ranks = fractional_ranks(values);
    let (min, max) = ranks
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(*r), hi.max(*r))
        });

    let spread = max - min;
    if ranks.is_empty() || spread <= 0.0 {
        return vec![0.5; ranks.len()];
    }

    ranks
        .iter()
        .map(|r| match direction {
            Direction::FavorHigh => (r - min) / spread,
            Direction::FavorLow => (max - r) / spread,
        })
        .collect()
}

// ============================================================================
// Factors
// ============================================================================

/// A numeric column that takes part in scoring.
///
/// Every factor is ranked favor-high; profiles express a preference for low
/// values through a negative weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    ChangePct,
    Turnover,
    MarketCap,
    DividendYield,
    /// Ranked by expensiveness: the highest P/E scores 1. Profiles attach a
    /// negative weight, so cheaper rows end up ahead.
    PriceEarnings,
    Momentum5d,
}

impl Factor {
    pub fn value(&self, row: &CanonicalRow) -> f64 {
        match self {
            Self::ChangePct => row.change_pct,
            Self::Turnover => row.turnover,
            Self::MarketCap => row.market_cap,
            Self::DividendYield => row.dividend_yield,
            Self::PriceEarnings => row.price_earnings,
            Self::Momentum5d => row.momentum_5d,
        }
    }
}

/// One weighted term of a profile formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorWeight {
    pub factor: Factor,
    pub weight: f64,
}

impl FactorWeight {
    pub fn new(factor: Factor, weight: f64) -> Self {
        Self { factor, weight }
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// The three watchlists produced per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    General,
    Growth,
    Value,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::General, Profile::Growth, Profile::Value];

    pub fn title(&self) -> &'static str {
        match self {
            Self::General => "JP watchlist (general)",
            Self::Growth => "JP watchlist (growth)",
            Self::Value => "JP watchlist (value/defensive)",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::General => "watchlist_jp.txt",
            Self::Growth => "watchlist_jp_growth.txt",
            Self::Value => "watchlist_jp_value.txt",
        }
    }

    pub fn weights<'c>(&self, config: &'c WatchlistConfig) -> &'c ProfileWeights {
        match self {
            Self::General => &config.general,
            Self::Growth => &config.growth,
            Self::Value => &config.value,
        }
    }

    /// Rows this profile scores.
    ///
    /// Growth takes non-defensive sectors and value takes defensive ones.
    /// With no defensive sectors configured both use the full table.
    pub fn select_rows(&self, rows: &[CanonicalRow], defensive: &[String]) -> Vec<CanonicalRow> {
        if defensive.is_empty() {
            return rows.to_vec();
        }

        let is_defensive = |row: &CanonicalRow| {
            let key = sector_key(&row.sector);
            defensive.iter().any(|d| *d == key)
        };

        match self {
            Self::General => rows.to_vec(),
            Self::Growth => rows.iter().filter(|r| !is_defensive(r)).cloned().collect(),
            Self::Value => rows.iter().filter(|r| is_defensive(r)).cloned().collect(),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Growth => write!(f, "growth"),
            Self::Value => write!(f, "value"),
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// A canonical row with its profile score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    #[serde(flatten)]
    pub row: CanonicalRow,
    pub score: f64,
}

/// Score every row with the weighted sum of its rank-normalized factors.
pub fn score_profile(rows: &[CanonicalRow], weights: &ProfileWeights) -> Vec<ScoredRow> {
    let mut scores = vec![0.0; rows.len()];

    for term in &weights.terms {
        let values: Vec<f64> = rows.iter().map(|r| term.factor.value(r)).collect();
        let ranked = rank_normalize(&values, Direction::FavorHigh);
        for (score, r) in scores.iter_mut().zip(ranked) {
            *score += term.weight * r;
        }
    }

    rows.iter()
        .cloned()
        .zip(scores)
        .map(|(row, score)| ScoredRow { row, score })
        .collect()
}

/// Highest `limit` rows by score; equal scores keep table order.
pub fn select_top(mut scored: Vec<ScoredRow>, limit: usize) -> Vec<ScoredRow> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::config::{ConfigKey, ConfigMap};
    use proptest::prelude::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    fn row(symbol: &str, change_pct: f64, turnover: f64, sector: &str) -> CanonicalRow {
        CanonicalRow {
            symbol: symbol.to_string(),
            price: 1000.0,
            change_pct,
            turnover,
            sector: sector.to_string(),
            ..CanonicalRow::default()
        }
    }

    #[test]
    fn test_rank_normalize_directions() {
        let values = [10.0, 30.0, 20.0];
        assert_close(&rank_normalize(&values, Direction::FavorHigh), &[0.0, 1.0, 0.5]);
        assert_close(&rank_normalize(&values, Direction::FavorLow), &[1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_rank_normalize_ties_share_average() {
        // ranks 1, 2.5, 2.5, 4
        let values = [1.0, 5.0, 5.0, 9.0];
        assert_close(
            &rank_normalize(&values, Direction::FavorHigh),
            &[0.0, 0.5, 0.5, 1.0],
        );
    }

    #[test]
    fn test_rank_normalize_signed_zero_ties() {
        assert_close(
            &rank_normalize(&[-0.0, 0.0, 1.0], Direction::FavorHigh),
            &[0.0, 0.0, 1.0],
        );
        assert_close(
            &rank_normalize(&[0.0, -0.0, 1.0], Direction::FavorLow),
            &[1.0, 1.0, 0.0],
        );
    }

    #[test]
    fn test_signed_zero_change_scores_equal() {
        let rows = vec![
            row("NEG", -0.0, 1e9, ""),
            row("POS", 0.0, 1e9, ""),
            row("UP", 1.0, 1e9, ""),
        ];
        let weights = ProfileWeights {
            terms: vec![FactorWeight::new(Factor::ChangePct, 1.0)],
        };
        let scored = score_profile(&rows, &weights);
        assert_eq!(scored[0].score, scored[1].score);
        assert!(scored[2].score > scored[0].score);
    }

    #[test]
    fn test_rank_normalize_degenerate_inputs() {
        assert!(rank_normalize(&[], Direction::FavorHigh).is_empty());
        assert_close(&rank_normalize(&[7.0], Direction::FavorHigh), &[0.5]);
        assert_close(&rank_normalize(&[0.0; 4], Direction::FavorLow), &[0.5; 4]);
    }

    #[test]
    fn test_score_scenario_two_rows() {
        let rows = vec![row("AAA", 5.0, 1e9, ""), row("BBB", 1.0, 5e8, "")];
        let weights = ProfileWeights {
            terms: vec![
                FactorWeight::new(Factor::ChangePct, 0.5),
                FactorWeight::new(Factor::Turnover, 0.5),
            ],
        };

        let scored = score_profile(&rows, &weights);
        assert!((scored[0].score - 1.0).abs() < 1e-9);
        assert!(scored[1].score.abs() < 1e-9);

        let top = select_top(scored, 10);
        assert_eq!(top[0].row.symbol, "AAA");
        assert_eq!(top[1].row.symbol, "BBB");
    }

    #[test]
    fn test_price_earnings_prefers_cheap() {
        let mut cheap = row("CHEAP", 0.0, 0.0, "");
        cheap.price_earnings = 8.0;
        let mut rich = row("RICH", 0.0, 0.0, "");
        rich.price_earnings = 40.0;

        let weights = ProfileWeights {
            terms: vec![FactorWeight::new(Factor::PriceEarnings, -0.35)],
        };
        let top = select_top(score_profile(&[rich, cheap], &weights), 2);
        assert_eq!(top[0].row.symbol, "CHEAP");
    }

    #[test]
    fn test_select_top_truncates_and_is_stable() {
        let scored: Vec<ScoredRow> = ["A", "B", "C", "D"]
            .iter()
            .zip([0.2, 0.9, 0.2, 0.5])
            .map(|(s, score)| ScoredRow {
                row: row(s, 0.0, 0.0, ""),
                score,
            })
            .collect();

        let top = select_top(scored.clone(), 3);
        let symbols: Vec<_> = top.iter().map(|s| s.row.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "D", "A"]);

        assert!(select_top(scored, 0).is_empty());
    }

    #[test]
    fn test_profile_subsets() {
        let defensive = vec!["utilities".to_string()];
        let rows = vec![
            row("UTIL", 0.0, 0.0, "Utilities"),
            row("TECH", 0.0, 0.0, "Technology"),
            row("NONE", 0.0, 0.0, ""),
        ];

        let symbols = |p: Profile, d: &[String]| -> Vec<String> {
            p.select_rows(&rows, d).into_iter().map(|r| r.symbol).collect()
        };

        assert_eq!(symbols(Profile::General, &defensive).len(), 3);
        assert_eq!(symbols(Profile::Growth, &defensive), vec!["TECH", "NONE"]);
        assert_eq!(symbols(Profile::Value, &defensive), vec!["UTIL"]);
        assert_eq!(symbols(Profile::Value, &[]).len(), 3);
        assert_eq!(symbols(Profile::Growth, &[]).len(), 3);
    }

    #[test]
    fn test_profile_weights_lookup() {
        let map = ConfigMap::default().with(ConfigKey::VwDiv, "0.9");
        let config = WatchlistConfig::from_map(&map);
        let weights = Profile::Value.weights(&config);
        assert!((weights.weight(Factor::DividendYield) - 0.9).abs() < 1e-9);
        assert_eq!(Profile::Growth.file_name(), "watchlist_jp_growth.txt");
        assert_eq!(Profile::Value.to_string(), "value");
    }

    proptest! {
        #[test]
        fn rank_scores_stay_in_unit_interval(
            values in proptest::collection::vec(-1e6f64..1e6, 1..60),
        ) {
            for direction in [Direction::FavorHigh, Direction::FavorLow] {
                let scores = rank_normalize(&values, direction);
                prop_assert_eq!(scores.len(), values.len());
                for s in &scores {
                    prop_assert!((0.0..=1.0).contains(s));
                }
            }
        }

        #[test]
        fn best_value_scores_one(
            values in proptest::collection::vec(-1e6f64..1e6, 2..60),
        ) {
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            prop_assume!(max > min);

            let scores = rank_normalize(&values, Direction::FavorHigh);
            for (v, s) in values.iter().zip(&scores) {
                if *v == max {
                    prop_assert!((s - 1.0).abs() < 1e-9);
                }
                if *v == min {
                    prop_assert!(s.abs() < 1e-9);
                }
            }
        }
    }
}
