//! Quantitative filtering module for the watchlist.
//!
//! Implements a three-stage funnel:
//! 1. Bounds: price range and minimum turnover
//! 2. Scope: explicit symbol exclusions and sector allow/deny lists
//! 3. Dedup: first occurrence per symbol wins

use std::collections::HashSet;

use kabu_common::util::to_halfwidth;
use serde::Serialize;

use super::config::FilterConfig;
use super::normalize::CanonicalRow;

// ============================================================================
// Filter Stage
// ============================================================================

/// Filter stage identifier for tracking where rows are eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStage {
    /// Price and turnover bounds
    Bounds,
    /// Symbol exclusions and sector lists
    Scope,
    /// Duplicate symbol removal
    Dedup,
}

impl std::fmt::Display for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounds => write!(f, "bounds"),
            Self::Scope => write!(f, "scope"),
            Self::Dedup => write!(f, "dedup"),
        }
    }
}

// ============================================================================
// Filter Result
// ============================================================================

/// Result of a filtering stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    /// Stage name
    pub stage: FilterStage,
    /// Number of rows that passed this stage
    pub passed: usize,
    /// Number of rows eliminated at this stage
    pub eliminated: usize,
    /// Elimination rate (%)
    pub elimination_rate: f64,
}

impl FilterResult {
    pub fn new(stage: FilterStage, input_count: usize, passed_count: usize) -> Self {
        let eliminated = input_count.saturating_sub(passed_count);
        let elimination_rate = if input_count > 0 {
            (eliminated as f64 / input_count as f64) * 100.0
        } else {
            0.0
        };

        Self {
            stage,
            passed: passed_count,
            eliminated,
            elimination_rate,
        }
    }
}

/// Rows that survived every stage, with the per-stage funnel.
#[derive(Debug, Clone)]
pub struct FilteredRows {
    pub rows: Vec<CanonicalRow>,
    pub funnel: Vec<FilterResult>,
}

/// Case- and width-insensitive comparison key for sector names.
pub fn sector_key(sector: &str) -> String {
    to_halfwidth(sector).trim().to_lowercase()
}

// ============================================================================
// Quantitative Filter
// ============================================================================

/// Quantitative filter over canonical rows.
pub struct QuantitativeFilter<'a> {
    config: &'a FilterConfig,
}

impl<'a> QuantitativeFilter<'a> {
    /// Create a new quantitative filter borrowing the given configuration.
    pub fn new(config: &'a FilterConfig) -> Self {
        Self { config }
    }

    // ========================================================================
    // Stage 1: Bounds
    // ========================================================================

    /// Keep rows with `min_price <= price <= max_price` and
    /// `turnover >= min_turnover`.
    pub fn filter_bounds(&self, rows: &[CanonicalRow]) -> (Vec<CanonicalRow>, FilterResult) {
        let passed: Vec<CanonicalRow> = rows
            .iter()
            .filter(|r| self.passes_bounds(r))
            .cloned()
            .collect();

        let result = FilterResult::new(FilterStage::Bounds, rows.len(), passed.len());
        (passed, result)
    }

    fn passes_bounds(&self, row: &CanonicalRow) -> bool {
        row.price >= self.config.min_price
            && row.price <= self.config.max_price
            && row.turnover >= self.config.min_turnover
    }

    // ========================================================================
    // Stage 2: Scope
    // ========================================================================

    /// Apply symbol exclusions and sector allow/deny lists.
    pub fn filter_scope(&self, rows: &[CanonicalRow]) -> (Vec<CanonicalRow>, FilterResult) {
        let passed: Vec<CanonicalRow> = rows
            .iter()
            .filter(|r| self.passes_scope(r))
            .cloned()
            .collect();

        let result = FilterResult::new(FilterStage::Scope, rows.len(), passed.len());
        (passed, result)
    }

    fn passes_scope(&self, row: &CanonicalRow) -> bool {
        let symbol = to_halfwidth(&row.symbol).to_uppercase();
        if self.config.exclude_symbols.iter().any(|s| *s == symbol) {
            return false;
        }

        let sector = sector_key(&row.sector);

        // Rows without a sector never match a non-empty allow-list
        if !self.config.include_sectors.is_empty()
            && !self.config.include_sectors.iter().any(|s| *s == sector)
        {
            return false;
        }

        if self.config.exclude_sectors.iter().any(|s| *s == sector) {
            return false;
        }

        true
    }

    // ========================================================================
    // Stage 3: Dedup
    // ========================================================================

    /// Keep the first occurrence of each symbol, preserving order.
    pub fn dedupe(&self, rows: &[CanonicalRow]) -> (Vec<CanonicalRow>, FilterResult) {
        let mut seen = HashSet::new();
        let passed: Vec<CanonicalRow> = rows
            .iter()
            .filter(|r| seen.insert(r.symbol.clone()))
            .cloned()
            .collect();

        let result = FilterResult::new(FilterStage::Dedup, rows.len(), passed.len());
        (passed, result)
    }

    // ========================================================================
    // Combined Filter
    // ========================================================================

    /// Run all stages in order.
    pub fn apply(&self, rows: &[CanonicalRow]) -> FilteredRows {
        let (after_bounds, bounds) = self.filter_bounds(rows);
        let (after_scope, scope) = self.filter_scope(&after_bounds);
        let (after_dedup, dedup) = self.dedupe(&after_scope);

        FilteredRows {
            rows: after_dedup,
            funnel: vec![bounds, scope, dedup],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
