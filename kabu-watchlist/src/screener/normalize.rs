//! Row normalization.
//!
//! Maps a snapshot table with unknown column names onto [`CanonicalRow`].
//! Columns are matched through a static alias table, resolved once per
//! header. Fields that may be derived from other columns carry an explicit,
//! ordered list of derivation rules; the first applicable rule wins.

use std::collections::HashMap;

use kabu_common::util::{normalize_header, parse_float};
use serde::Serialize;
use tracing::{debug, warn};

use crate::data::{RawRow, RawTable};

// ============================================================================
// Canonical Row
// ============================================================================

/// One ticker snapshot in the canonical schema.
///
/// Every field is always present. Unavailable numbers are 0.0 and
/// unavailable strings are empty; `symbol` is never empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanonicalRow {
    pub symbol: String,
    /// Company name, informational only
    pub name: String,
    /// Last price in yen
    pub price: f64,
    /// Day change in yen
    pub change: f64,
    /// Day change in percent
    pub change_pct: f64,
    /// Traded value in raw yen
    pub turnover: f64,
    /// Market capitalization in raw yen
    pub market_cap: f64,
    pub price_earnings: f64,
    /// Dividend yield in percent
    pub dividend_yield: f64,
    pub sector: String,
    /// Price change over the trailing 5 trading days, in percent
    pub momentum_5d: f64,
}

// ============================================================================
// Source Fields & Aliases
// ============================================================================

/// Logical source columns recognized in the input header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    Symbol,
    Name,
    Price,
    ChangePct,
    Change,
    Volume,
    Turnover,
    MarketCap,
    PriceEarnings,
    DividendYield,
    Sector,
    Momentum5d,
}

/// An acceptable header spelling, with the multiplier that converts its
/// unit into the canonical one.
#[derive(Debug, Clone, Copy)]
struct Alias {
    header: &'static str,
    scale: f64,
}

const fn plain(header: &'static str) -> Alias {
    Alias { header, scale: 1.0 }
}

const fn oku(header: &'static str) -> Alias {
    Alias { header, scale: 1e8 }
}

const fn hyakuman(header: &'static str) -> Alias {
    Alias { header, scale: 1e6 }
}

/// Alias table in priority order. Comparison goes through
/// [`normalize_header`], so case, width and whitespace do not matter.
const ALIASES: &[(SourceField, &[Alias])] = &[
    (
        SourceField::Symbol,
        &[plain("code"), plain("ticker"), plain("銘柄コード"), plain("証券コード"), plain("コード"), plain("symbol")],
    ),
    (SourceField::Name, &[plain("name"), plain("銘柄名"), plain("会社名")]),
    (
        SourceField::Price,
        &[plain("price"), plain("last"), plain("close"), plain("終値"), plain("現値"), plain("株価")],
    ),
    (
        SourceField::ChangePct,
        &[
            plain("change%"),
            plain("pctchange"),
            plain("changepercent"),
            plain("chg%"),
            plain("前日比%"),
            plain("騰落率"),
            plain("変動率"),
        ],
    ),
    (
        SourceField::Change,
        &[plain("change"), plain("chg"), plain("前日比"), plain("値上がり"), plain("値下がり")],
    ),
    (
        SourceField::Volume,
        &[plain("volume"), plain("出来高"), plain("出来高株"), plain("売買高")],
    ),
    (
        SourceField::Turnover,
        &[
            plain("turnover"),
            plain("value"),
            plain("売買代金"),
            plain("売買代金円"),
            plain("売買代金(円)"),
            plain("value(jpy)"),
            oku("value(億jpy)"),
            oku("value(億円)"),
            oku("売買代金(億円)"),
            hyakuman("売買代金(百万円)"),
        ],
    ),
    (
        SourceField::MarketCap,
        &[
            plain("marketcap"),
            plain("mktcap"),
            plain("時価総額"),
            plain("時価総額円"),
            plain("時価総額(円)"),
            oku("時価総額(億円)"),
            hyakuman("時価総額(百万円)"),
        ],
    ),
    (
        SourceField::PriceEarnings,
        &[plain("pe"), plain("per"), plain("per(倍)"), plain("peratio"), plain("trailingpe"), plain("株価収益率")],
    ),
    (
        SourceField::DividendYield,
        &[plain("dividendyield"), plain("yield"), plain("divyield"), plain("配当利回り"), plain("配当利回り(%)")],
    ),
    (
        SourceField::Sector,
        &[plain("sector"), plain("業種"), plain("セクター"), plain("分類"), plain("industry")],
    ),
    (
        SourceField::Momentum5d,
        &[
            plain("momentum5d"),
            plain("mom5"),
            plain("mom5d"),
            plain("5dchange%"),
            plain("change5d%"),
            plain("5日騰落率"),
            plain("5日変化率"),
        ],
    ),
];

/// A source field bound to a concrete header position.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
    pub scale: f64,
}

/// Source field → input column, resolved once per header.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<SourceField, ResolvedColumn>,
}

impl ColumnMap {
    /// Resolve every source field against `headers`.
    ///
    /// If a header appears twice, its first position is used.
    pub fn resolve(headers: &[String]) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            positions.entry(normalize_header(header)).or_insert(idx);
        }

        let mut columns = HashMap::new();
        for (field, aliases) in ALIASES {
            let found = aliases.iter().find_map(|alias| {
                positions
                    .get(&normalize_header(alias.header))
                    .map(|&index| ResolvedColumn {
                        index,
                        header: headers[index].clone(),
                        scale: alias.scale,
                    })
            });
            if let Some(column) = found {
                columns.insert(*field, column);
            }
        }

        Self { columns }
    }

    pub fn get(&self, field: SourceField) -> Option<&ResolvedColumn> {
        self.columns.get(&field)
    }

    pub fn contains(&self, field: SourceField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Parsed, unit-scaled value of `field` in `row`; `None` if unmapped.
    fn value(&self, row: &RawRow, field: SourceField) -> Option<f64> {
        self.get(field)
            .map(|col| parse_float(row.cell(col.index), 0.0) * col.scale)
    }

    fn text(&self, row: &RawRow, field: SourceField) -> Option<String> {
        self.get(field).map(|col| row.cell(col.index).trim().to_string())
    }
}

// ============================================================================
// Derivation Rules
// ============================================================================

/// How a canonical numeric field is obtained from source columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Read the column as is
    Direct(SourceField),
    /// `part / whole * 100`, 0.0 when `whole` is zero
    PercentOf { part: SourceField, whole: SourceField },
    /// `whole * percent / 100`
    PercentApplied { percent: SourceField, whole: SourceField },
    /// `left * right`
    Product(SourceField, SourceField),
}

impl Derivation {
    fn inputs(&self) -> Vec<SourceField> {
        match *self {
            Self::Direct(f) => vec![f],
            Self::PercentOf { part, whole } => vec![part, whole],
            Self::PercentApplied { percent, whole } => vec![percent, whole],
            Self::Product(a, b) => vec![a, b],
        }
    }

    /// Whether every column this rule reads is present.
    pub fn applies(&self, columns: &ColumnMap) -> bool {
        self.inputs().iter().all(|f| columns.contains(*f))
    }

    fn eval(&self, columns: &ColumnMap, row: &RawRow) -> f64 {
        let v = |f| columns.value(row, f).unwrap_or(0.0);
        match *self {
            Self::Direct(f) => v(f),
            Self::PercentOf { part, whole } => {
                let whole = v(whole);
                if whole == 0.0 {
                    0.0
                } else {
                    v(part) / whole * 100.0
                }
            }
            Self::PercentApplied { percent, whole } => v(whole) * v(percent) / 100.0,
            Self::Product(a, b) => v(a).max(0.0) * v(b).max(0.0),
        }
    }
}

/// Canonical numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Price,
    Change,
    ChangePct,
    Turnover,
    MarketCap,
    PriceEarnings,
    DividendYield,
    Momentum5d,
}

impl CanonicalField {
    /// Prioritized derivation rules; when none applies the field is 0.0.
    pub const fn rules(&self) -> &'static [Derivation] {
        match self {
            Self::Price => &[Derivation::Direct(SourceField::Price)],
            Self::Change => &[
                Derivation::Direct(SourceField::Change),
                Derivation::PercentApplied {
                    percent: SourceField::ChangePct,
                    whole: SourceField::Price,
                },
            ],
            Self::ChangePct => &[
                Derivation::Direct(SourceField::ChangePct),
                Derivation::PercentOf {
                    part: SourceField::Change,
                    whole: SourceField::Price,
                },
            ],
            Self::Turnover => &[
                Derivation::Direct(SourceField::Turnover),
                Derivation::Product(SourceField::Price, SourceField::Volume),
            ],
            Self::MarketCap => &[Derivation::Direct(SourceField::MarketCap)],
            Self::PriceEarnings => &[Derivation::Direct(SourceField::PriceEarnings)],
            Self::DividendYield => &[Derivation::Direct(SourceField::DividendYield)],
            Self::Momentum5d => &[Derivation::Direct(SourceField::Momentum5d)],
        }
    }

    /// Fields that can never be negative.
    const fn non_negative(&self) -> bool {
        matches!(
            self,
            Self::Price | Self::Turnover | Self::MarketCap | Self::DividendYield
        )
    }

    /// First rule whose inputs are all present.
    pub fn select_rule(&self, columns: &ColumnMap) -> Option<Derivation> {
        self.rules().iter().copied().find(|rule| rule.applies(columns))
    }
}

// ============================================================================
// Row Normalizer
// ============================================================================

/// Normalizer bound to one input header.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    columns: ColumnMap,
    symbol_index: usize,
    price: Option<Derivation>,
    change: Option<Derivation>,
    change_pct: Option<Derivation>,
    turnover: Option<Derivation>,
    market_cap: Option<Derivation>,
    price_earnings: Option<Derivation>,
    dividend_yield: Option<Derivation>,
    momentum_5d: Option<Derivation>,
}

impl RowNormalizer {
    /// Resolve aliases and derivation rules for `headers`.
    pub fn for_headers(headers: &[String]) -> Self {
        let columns = ColumnMap::resolve(headers);
        let symbol_index = columns
            .get(SourceField::Symbol)
            .map(|c| c.index)
            .unwrap_or(0);

        let normalizer = Self {
            symbol_index,
            price: CanonicalField::Price.select_rule(&columns),
            change: CanonicalField::Change.select_rule(&columns),
            change_pct: CanonicalField::ChangePct.select_rule(&columns),
            turnover: CanonicalField::Turnover.select_rule(&columns),
            market_cap: CanonicalField::MarketCap.select_rule(&columns),
            price_earnings: CanonicalField::PriceEarnings.select_rule(&columns),
            dividend_yield: CanonicalField::DividendYield.select_rule(&columns),
            momentum_5d: CanonicalField::Momentum5d.select_rule(&columns),
            columns,
        };

        debug!(
            symbol_column = symbol_index,
            price = ?normalizer.price,
            change_pct = ?normalizer.change_pct,
            turnover = ?normalizer.turnover,
            "Resolved input columns"
        );

        normalizer
    }

    /// Rule chosen for `field`, if any.
    pub fn rule(&self, field: CanonicalField) -> Option<Derivation> {
        match field {
            CanonicalField::Price => self.price,
            CanonicalField::Change => self.change,
            CanonicalField::ChangePct => self.change_pct,
            CanonicalField::Turnover => self.turnover,
            CanonicalField::MarketCap => self.market_cap,
            CanonicalField::PriceEarnings => self.price_earnings,
            CanonicalField::DividendYield => self.dividend_yield,
            CanonicalField::Momentum5d => self.momentum_5d,
        }
    }

    fn numeric(&self, field: CanonicalField, row: &RawRow) -> f64 {
        let value = self
            .rule(field)
            .map(|rule| rule.eval(&self.columns, row))
            .unwrap_or(0.0);
        if field.non_negative() {
            value.max(0.0)
        } else {
            value
        }
    }

    /// Normalize one row; `None` when the symbol is blank.
    pub fn normalize_row(&self, row: &RawRow) -> Option<CanonicalRow> {
        let symbol = row.cell(self.symbol_index).trim();
        if symbol.is_empty() {
            return None;
        }

        Some(CanonicalRow {
            symbol: symbol.to_string(),
            name: self.columns.text(row, SourceField::Name).unwrap_or_default(),
            price: self.numeric(CanonicalField::Price, row),
            change: self.numeric(CanonicalField::Change, row),
            change_pct: self.numeric(CanonicalField::ChangePct, row),
            turnover: self.numeric(CanonicalField::Turnover, row),
            market_cap: self.numeric(CanonicalField::MarketCap, row),
            price_earnings: self.numeric(CanonicalField::PriceEarnings, row),
            dividend_yield: self.numeric(CanonicalField::DividendYield, row),
            sector: self.columns.text(row, SourceField::Sector).unwrap_or_default(),
            momentum_5d: self.numeric(CanonicalField::Momentum5d, row),
        })
    }

    /// Normalize every row of `table`, dropping rows with a blank symbol.
    pub fn normalize(&self, table: &RawTable) -> Vec<CanonicalRow> {
        let rows: Vec<CanonicalRow> = table
            .rows
            .iter()
            .filter_map(|row| self.normalize_row(row))
            .collect();

        let dropped = table.len() - rows.len();
        if dropped > 0 {
            warn!(dropped, "Dropped rows without a symbol");
        }

        rows
    }
}

/// Normalize `table` with a normalizer resolved against its own header.
pub fn normalize_table(table: &RawTable) -> Vec<CanonicalRow> {
    RowNormalizer::for_headers(&table.headers).normalize(table)
}
