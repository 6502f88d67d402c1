//! Watchlist engine.
//!
//! The central orchestrator for one batch run: normalize → filter → score
//! per profile → select, plus the file-level pipeline around it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use crate::data::{read_csv_table, RawTable};

use super::analysis::{AnalysisConfig, MarketAnalysis};
use super::config::WatchlistConfig;
use super::normalize::{CanonicalRow, RowNormalizer};
use super::quantitative::{FilterResult, QuantitativeFilter};
use super::report::{RunSummary, WatchlistWriter};
use super::scoring::{score_profile, select_top, Profile, ScoredRow};

// ============================================================================
// Watchlist Result
// ============================================================================

/// One profile's selection.
#[derive(Debug, Clone)]
pub struct ProfileList {
    pub profile: Profile,
    /// Rows eligible for this profile before the top-N cut
    pub candidates: usize,
    /// Selected rows, best first
    pub entries: Vec<ScoredRow>,
}

impl ProfileList {
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.row.symbol.as_str()).collect()
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct WatchlistResult {
    /// Run ID (timestamp-based)
    pub id: String,
    /// Records in the input table
    pub input_rows: usize,
    /// Rows that survived normalization
    pub normalized_rows: usize,
    /// Rows that passed every filter
    pub filtered_rows: usize,
    /// Normalized, unfiltered rows
    pub rows: Vec<CanonicalRow>,
    pub funnel: Vec<FilterResult>,
    pub filter_summary: String,
    /// General, growth and value lists in that order
    pub lists: Vec<ProfileList>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl WatchlistResult {
    pub fn list(&self, profile: Profile) -> Option<&ProfileList> {
        self.lists.iter().find(|l| l.profile == profile)
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .lists
            .iter()
            .map(|l| format!("{}={}", l.profile, l.entries.len()))
            .collect();
        format!(
            "{} input rows, {} after filters, selected {}",
            self.input_rows,
            self.filtered_rows,
            counts.join(" ")
        )
    }
}

// ============================================================================
// Watchlist Engine
// ============================================================================

/// Runs the in-memory stages against a loaded table.
pub struct WatchlistEngine<'a> {
    config: &'a WatchlistConfig,
}

impl<'a> WatchlistEngine<'a> {
    pub fn new(config: &'a WatchlistConfig) -> Self {
        Self { config }
    }

    /// Normalize, filter and score `table` into the three watchlists.
    ///
    /// An empty table, or one where nothing survives the filters, yields
    /// three empty lists rather than an error.
    pub fn run(&self, table: &RawTable) -> WatchlistResult {
        let started_at = Utc::now();
        let id = format!("run_{}", started_at.format("%Y%m%d_%H%M%S"));

        info!(run_id = %id, rows = table.len(), "Starting watchlist run");

        // Phase 1: Normalize
        let normalizer = RowNormalizer::for_headers(&table.headers);
        let rows = normalizer.normalize(table);
        debug!(rows = rows.len(), "Normalization complete");

        // Phase 2: Filter
        let filtered = QuantitativeFilter::new(&self.config.filters).apply(&rows);
        for stage in &filtered.funnel {
            info!(
                stage = %stage.stage,
                passed = stage.passed,
                eliminated = stage.eliminated,
                rate = format!("{:.1}%", stage.elimination_rate),
                "Filter stage complete"
            );
        }
        if filtered.rows.is_empty() {
            warn!("No candidates left after filtering; writing empty watchlists");
        }

        // Phase 3: Score and select per profile
        let lists: Vec<ProfileList> = Profile::ALL
            .iter()
            .map(|profile| self.select(*profile, &filtered.rows))
            .collect();

        let completed_at = Utc::now();
        let result = WatchlistResult {
            id,
            input_rows: table.len(),
            normalized_rows: rows.len(),
            filtered_rows: filtered.rows.len(),
            rows,
            funnel: filtered.funnel,
            filter_summary: self.config.filters.summary(),
            lists,
            started_at,
            completed_at,
        };

        info!(run_id = %result.id, "{}", result.summary());
        result
    }

    fn select(&self, profile: Profile, rows: &[CanonicalRow]) -> ProfileList {
        let subset = profile.select_rows(rows, &self.config.defensive_sectors);
        let scored = score_profile(&subset, profile.weights(self.config));
        let entries = select_top(scored, self.config.top_limit);

        debug!(
            profile = %profile,
            candidates = subset.len(),
            selected = entries.len(),
            "Profile scored"
        );

        ProfileList {
            profile,
            candidates: subset.len(),
            entries,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// File locations for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub config: PathBuf,
    pub out_dir: PathBuf,
    /// Optional market analysis report
    pub analysis: Option<PathBuf>,
    /// Optional JSON run summary
    pub summary: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("jp_latest.csv"),
            config: PathBuf::from("config_jp.txt"),
            out_dir: PathBuf::from("."),
            analysis: None,
            summary: None,
        }
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: WatchlistResult,
    /// Every file written, watchlists first
    pub written: Vec<PathBuf>,
}

/// Run the full batch: config → input table → engine → output files.
///
/// A missing or empty input table is fatal and nothing is written.
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineOutput> {
    let config = WatchlistConfig::load(&options.config)
        .with_context(|| format!("Failed to load config {}", options.config.display()))?;

    let table = read_csv_table(&options.input)
        .with_context(|| format!("Failed to load input table {}", options.input.display()))?;

    let result = WatchlistEngine::new(&config).run(&table);
    let written = write_outputs(&result, options)?;

    Ok(PipelineOutput { result, written })
}

fn write_outputs(result: &WatchlistResult, options: &PipelineOptions) -> Result<Vec<PathBuf>> {
    let writer = WatchlistWriter::new(result.started_at, result.filter_summary.as_str());
    let mut written = Vec::new();

    for list in &result.lists {
        let path = writer.write(&options.out_dir, list.profile, &list.entries)?;
        info!(path = %path.display(), total = list.entries.len(), "Watchlist written");
        written.push(path);
    }

    if let Some(path) = &options.analysis {
        let analysis_config = AnalysisConfig::default();
        MarketAnalysis::analyze(&result.rows, &analysis_config, Local::now())
            .save(path, &analysis_config)?;
        info!(path = %path.display(), "Market analysis written");
        written.push(path.clone());
    }

    if let Some(path) = &options.summary {
        RunSummary::new(result).save(path)?;
        info!(path = %path.display(), "Run summary written");
        written.push(path.clone());
    }

    Ok(written)
}

/// Convenience for callers holding only an input path and output directory.
pub fn run_with_defaults(input: &Path, out_dir: &Path) -> Result<PipelineOutput> {
    run_pipeline(&PipelineOptions {
        input: input.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        ..PipelineOptions::default()
    })
}
