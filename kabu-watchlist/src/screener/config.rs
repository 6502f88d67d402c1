//! Watchlist configuration module.
//!
//! Settings come from a loosely formatted `KEY = VALUE` text file layered
//! over built-in defaults. The string map is resolved once into an
//! immutable [`WatchlistConfig`] that every stage borrows.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use kabu_common::util::{parse_float, parse_int, parse_list, to_halfwidth};
use kabu_common::{Error, Result, ResultExt};
use serde::Serialize;
use tracing::{debug, info};

use super::scoring::{Factor, FactorWeight};

// ============================================================================
// Config Keys
// ============================================================================

/// The fixed set of recognized configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    TopLimit,
    MinPrice,
    MaxPrice,
    MinTurnover,
    SectorDefensive,
    ExcludeSymbols,
    IncludeSectors,
    ExcludeSectors,
    WChange,
    WTurnover,
    WMcap,
    WDiv,
    WPe,
    WMom5,
    GwChange,
    GwTurnover,
    GwMcap,
    GwMom5,
    VwDiv,
    VwPe,
    VwMcap,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 21] = [
        Self::TopLimit,
        Self::MinPrice,
        Self::MaxPrice,
        Self::MinTurnover,
        Self::SectorDefensive,
        Self::ExcludeSymbols,
        Self::IncludeSectors,
        Self::ExcludeSectors,
        Self::WChange,
        Self::WTurnover,
        Self::WMcap,
        Self::WDiv,
        Self::WPe,
        Self::WMom5,
        Self::GwChange,
        Self::GwTurnover,
        Self::GwMcap,
        Self::GwMom5,
        Self::VwDiv,
        Self::VwPe,
        Self::VwMcap,
    ];

    /// Key name as written in the config file.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TopLimit => "TOP_LIMIT",
            Self::MinPrice => "MIN_PRICE",
            Self::MaxPrice => "MAX_PRICE",
            Self::MinTurnover => "MIN_TURNOVER",
            Self::SectorDefensive => "SECTOR_DEFENSIVE",
            Self::ExcludeSymbols => "EXCLUDE_SYMBOLS",
            Self::IncludeSectors => "INCLUDE_SECTORS",
            Self::ExcludeSectors => "EXCLUDE_SECTORS",
            Self::WChange => "W_CHANGE",
            Self::WTurnover => "W_TURNOVER",
            Self::WMcap => "W_MCAP",
            Self::WDiv => "W_DIV",
            Self::WPe => "W_PE",
            Self::WMom5 => "W_MOM5",
            Self::GwChange => "GW_CHANGE",
            Self::GwTurnover => "GW_TURNOVER",
            Self::GwMcap => "GW_MCAP",
            Self::GwMom5 => "GW_MOM5",
            Self::VwDiv => "VW_DIV",
            Self::VwPe => "VW_PE",
            Self::VwMcap => "VW_MCAP",
        }
    }

    /// Built-in default value.
    pub const fn default_value(&self) -> &'static str {
        match self {
            Self::TopLimit => "40",
            Self::MinPrice => "200",              // yen
            Self::MaxPrice => "20000",            // yen
            Self::MinTurnover => "3e8",           // raw yen, not 億
            Self::SectorDefensive => "Utilities, Consumer Staples, Healthcare, Telecommunications",
            Self::ExcludeSymbols => "",
            Self::IncludeSectors => "",
            Self::ExcludeSectors => "",
            Self::WChange => "0.35",
            Self::WTurnover => "0.25",
            Self::WMcap => "0.15",
            Self::WDiv => "0.10",
            Self::WPe => "-0.05",
            Self::WMom5 => "0.20",
            Self::GwChange => "0.40",
            Self::GwTurnover => "0.30",
            Self::GwMcap => "0.10",
            Self::GwMom5 => "0.20",
            Self::VwDiv => "0.45",
            Self::VwPe => "-0.35",
            Self::VwMcap => "0.20",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = to_halfwidth(s).trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == upper)
            .ok_or_else(|| format!("Unknown config key: {}", s))
    }
}

// ============================================================================
// Config Map
// ============================================================================

/// Fully populated key → string value map.
///
/// Every [`ConfigKey`] always has a value; keys absent from the file keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMap {
    values: BTreeMap<ConfigKey, String>,
}

impl Default for ConfigMap {
    fn default() -> Self {
        Self {
            values: ConfigKey::ALL
                .iter()
                .map(|key| (*key, key.default_value().to_string()))
                .collect(),
        }
    }
}

impl ConfigMap {
    /// Load overrides from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        if path.is_dir() {
            return Err(Error::Config(format!(
                "{} is a directory, expected a settings file",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        Ok(Self::parse(&content))
    }

    /// Parse config text layered over the defaults.
    ///
    /// Accepts `KEY = VALUE` and `KEY: VALUE`; `#` starts a comment.
    pub fn parse(content: &str) -> Self {
        let mut map = Self::default();

        for raw in content.lines() {
            let line = to_halfwidth(raw);
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=').or_else(|| trimmed.split_once(':'))
            else {
                debug!(line = %trimmed, "Ignoring config line without separator");
                continue;
            };

            match key.parse::<ConfigKey>() {
                Ok(key) => {
                    map.values.insert(key, clean_value(value));
                }
                Err(_) => debug!(key = %key.trim(), "Ignoring unknown config key"),
            }
        }

        map
    }

    /// Return a copy with one value replaced.
    pub fn with(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    /// Raw string value for `key`.
    pub fn get(&self, key: ConfigKey) -> &str {
        self.values
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_value())
    }

    /// Numeric value for `key`; malformed values fall back to the key's default.
    pub fn float(&self, key: ConfigKey) -> f64 {
        let fallback = parse_float(key.default_value(), 0.0);
        parse_float(self.get(key), fallback)
    }

    /// Integer value for `key`; malformed values fall back to the key's default.
    pub fn int(&self, key: ConfigKey) -> i64 {
        let fallback = parse_int(key.default_value(), 0);
        parse_int(self.get(key), fallback)
    }

    /// List value for `key`, width-folded and lower-cased.
    pub fn lower_list(&self, key: ConfigKey) -> Vec<String> {
        parse_list(self.get(key))
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect()
    }
}

/// Strip an inline `#` comment and surrounding quotes from a value.
fn clean_value(value: &str) -> String {
    let mut end = value.len();
    let mut prev_is_space = true;
    for (idx, c) in value.char_indices() {
        if c == '#' && prev_is_space {
            end = idx;
            break;
        }
        prev_is_space = c.is_whitespace();
    }

    value[..end]
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_string()
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Filter thresholds and scope lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterConfig {
    /// Lower price bound in yen (inclusive)
    pub min_price: f64,
    /// Upper price bound in yen (inclusive)
    pub max_price: f64,
    /// Minimum traded value in raw yen (inclusive)
    pub min_turnover: f64,
    /// Symbols to drop, upper-cased
    pub exclude_symbols: Vec<String>,
    /// Sector allow-list, lower-cased; empty means no restriction
    pub include_sectors: Vec<String>,
    /// Sector deny-list, lower-cased
    pub exclude_sectors: Vec<String>,
}

impl FilterConfig {
    /// One-line threshold summary used in watchlist headers.
    pub fn summary(&self) -> String {
        format!(
            "MIN_PRICE={}  MAX_PRICE={}  MIN_TURNOVER={}",
            format_threshold(self.min_price),
            format_threshold(self.max_price),
            format_threshold(self.min_turnover),
        )
    }
}

fn format_threshold(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Weighted factor terms for one scoring profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileWeights {
    pub terms: Vec<FactorWeight>,
}

impl ProfileWeights {
    fn from_map(map: &ConfigMap, terms: &[(Factor, ConfigKey)]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|(factor, key)| FactorWeight::new(*factor, map.float(*key)))
                .collect(),
        }
    }

    /// Weight attached to `factor`, or 0.0 if the profile does not use it.
    pub fn weight(&self, factor: Factor) -> f64 {
        self.terms
            .iter()
            .filter(|t| t.factor == factor)
            .map(|t| t.weight)
            .sum()
    }
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistConfig {
    /// Rows per output list (at least 1)
    pub top_limit: usize,
    pub filters: FilterConfig,
    /// Defensive sectors, lower-cased; splits growth from value
    pub defensive_sectors: Vec<String>,
    pub general: ProfileWeights,
    pub growth: ProfileWeights,
    pub value: ProfileWeights,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self::from_map(&ConfigMap::default())
    }
}

impl WatchlistConfig {
    /// Resolve the string map into typed settings.
    pub fn from_map(map: &ConfigMap) -> Self {
        let top_limit = usize::try_from(map.int(ConfigKey::TopLimit).max(1)).unwrap_or(1);

        let filters = FilterConfig {
            min_price: map.float(ConfigKey::MinPrice),
            max_price: map.float(ConfigKey::MaxPrice),
            min_turnover: map.float(ConfigKey::MinTurnover),
            exclude_symbols: parse_list(map.get(ConfigKey::ExcludeSymbols))
                .into_iter()
                .map(|s| s.to_uppercase())
                .collect(),
            include_sectors: map.lower_list(ConfigKey::IncludeSectors),
            exclude_sectors: map.lower_list(ConfigKey::ExcludeSectors),
        };

        let general = ProfileWeights::from_map(
            map,
            &[
                (Factor::ChangePct, ConfigKey::WChange),
                (Factor::Turnover, ConfigKey::WTurnover),
                (Factor::MarketCap, ConfigKey::WMcap),
                (Factor::DividendYield, ConfigKey::WDiv),
                (Factor::PriceEarnings, ConfigKey::WPe),
                (Factor::Momentum5d, ConfigKey::WMom5),
            ],
        );
        let growth = ProfileWeights::from_map(
            map,
            &[
                (Factor::ChangePct, ConfigKey::GwChange),
                (Factor::Turnover, ConfigKey::GwTurnover),
                (Factor::MarketCap, ConfigKey::GwMcap),
                (Factor::Momentum5d, ConfigKey::GwMom5),
            ],
        );
        let value = ProfileWeights::from_map(
            map,
            &[
                (Factor::DividendYield, ConfigKey::VwDiv),
                (Factor::PriceEarnings, ConfigKey::VwPe),
                (Factor::MarketCap, ConfigKey::VwMcap),
            ],
        );

        Self {
            top_limit,
            filters,
            defensive_sectors: map.lower_list(ConfigKey::SectorDefensive),
            general,
            growth,
            value,
        }
    }

    /// Load and resolve the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let map = ConfigMap::load(path)?;
        let config = Self::from_map(&map);
        debug!(
            top_limit = config.top_limit,
            filters = %config.filters.summary(),
            defensive = config.defensive_sectors.len(),
            "Configuration resolved"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchlistConfig::default();
        assert_eq!(config.top_limit, 40);
        assert!((config.filters.min_price - 200.0).abs() < 1e-9);
        assert!((config.filters.max_price - 20000.0).abs() < 1e-9);
        assert!((config.filters.min_turnover - 3e8).abs() < 1e-3);
        assert_eq!(
            config.defensive_sectors,
            vec!["utilities", "consumer staples", "healthcare", "telecommunications"]
        );
        assert!(config.filters.exclude_symbols.is_empty());
        assert!(config.filters.include_sectors.is_empty());
    }

    #[test]
    fn test_default_weights() {
        let config = WatchlistConfig::default();
        assert_eq!(config.general.terms.len(), 6);
        assert!((config.general.weight(Factor::ChangePct) - 0.35).abs() < 1e-9);
        assert!((config.general.weight(Factor::PriceEarnings) + 0.05).abs() < 1e-9);
        assert!((config.general.weight(Factor::Momentum5d) - 0.20).abs() < 1e-9);
        assert_eq!(config.growth.terms.len(), 4);
        assert!((config.growth.weight(Factor::ChangePct) - 0.40).abs() < 1e-9);
        assert_eq!(config.growth.weight(Factor::DividendYield), 0.0);
        assert_eq!(config.value.terms.len(), 3);
        assert!((config.value.weight(Factor::PriceEarnings) + 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_parse_overrides_and_comments() {
        let text = "\
# watchlist settings

top_limit = 10
MIN_PRICE: 500
MAX_PRICE = \"15000\"
EXCLUDE_SYMBOLS = '1570, 1357'
no separator here
";
        let map = ConfigMap::parse(text);
        assert_eq!(map.get(ConfigKey::TopLimit), "10");
        assert_eq!(map.get(ConfigKey::MinPrice), "500");
        assert_eq!(map.get(ConfigKey::MaxPrice), "15000");
        assert_eq!(map.get(ConfigKey::ExcludeSymbols), "1570, 1357");
        assert_eq!(map.get(ConfigKey::WChange), "0.35");
    }

    #[test]
    fn test_parse_full_width_input() {
        let map = ConfigMap::parse("ＴＯＰ＿ＬＩＭＩＴ　＝　２５\nＭＩＮ＿ＰＲＩＣＥ：１，０００");
        assert_eq!(map.get(ConfigKey::TopLimit), "25");
        assert_eq!(map.int(ConfigKey::TopLimit), 25);
        assert!((map.float(ConfigKey::MinPrice) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_inline_comment_stripped() {
        let map = ConfigMap::parse("MIN_PRICE = 300  # yen\nSECTOR_DEFENSIVE = Utilities#Banks");
        assert_eq!(map.get(ConfigKey::MinPrice), "300");
        // '#' inside a word is kept
        assert_eq!(map.get(ConfigKey::SectorDefensive), "Utilities#Banks");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let map = ConfigMap::parse("MIN_VALUE = 5\nFOO=bar");
        assert_eq!(map, ConfigMap::default());
    }

    #[test]
    fn test_malformed_numbers_fall_back_to_defaults() {
        let map = ConfigMap::parse("TOP_LIMIT = lots\nMIN_TURNOVER = n/a\nW_CHANGE =");
        assert_eq!(map.int(ConfigKey::TopLimit), 40);
        assert!((map.float(ConfigKey::MinTurnover) - 3e8).abs() < 1e-3);
        assert!((map.float(ConfigKey::WChange) - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_top_limit_clamped() {
        let map = ConfigMap::default().with(ConfigKey::TopLimit, "-3");
        assert_eq!(WatchlistConfig::from_map(&map).top_limit, 1);
        let map = ConfigMap::default().with(ConfigKey::TopLimit, "0");
        assert_eq!(WatchlistConfig::from_map(&map).top_limit, 1);
    }

    #[test]
    fn test_empty_defensive_list_allowed() {
        let map = ConfigMap::parse("SECTOR_DEFENSIVE =");
        let config = WatchlistConfig::from_map(&map);
        assert!(config.defensive_sectors.is_empty());
    }

    #[test]
    fn test_scope_lists_case_folded() {
        let map = ConfigMap::default()
            .with(ConfigKey::ExcludeSymbols, "7203.t / ６７５８.T")
            .with(ConfigKey::IncludeSectors, "Banks、ENERGY");
        let config = WatchlistConfig::from_map(&map);
        assert_eq!(config.filters.exclude_symbols, vec!["7203.T", "6758.T"]);
        assert_eq!(config.filters.include_sectors, vec!["banks", "energy"]);
    }

    #[test]
    fn test_filter_summary() {
        let config = WatchlistConfig::default();
        assert_eq!(
            config.filters.summary(),
            "MIN_PRICE=200  MAX_PRICE=20000  MIN_TURNOVER=300000000"
        );
    }

    #[test]
    fn test_config_key_round_trip() {
        for key in ConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ConfigKey>().unwrap(), key);
        }
        assert!("MIN_VALUE".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let map = ConfigMap::load(&dir.path().join("config_jp.txt")).unwrap();
        assert_eq!(map, ConfigMap::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config_jp.txt");
        std::fs::write(&path, "TOP_LIMIT = 5\nW_PE = -0.2\n").unwrap();
        let config = WatchlistConfig::load(&path).unwrap();
        assert_eq!(config.top_limit, 5);
        assert!((config.general.weight(Factor::PriceEarnings) + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_load_directory_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigMap::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
