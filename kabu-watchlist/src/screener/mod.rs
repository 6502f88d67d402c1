//! Watchlist Screener Module.
//!
//! Ranks one market snapshot into three watchlists (general, growth and
//! value/defensive) with weighted, rank-normalized factor scores.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Watchlist Pipeline                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐           │
//! │  │ config_jp   │────▶│ Watchlist   │◀────│ jp_latest   │           │
//! │  │ (ConfigMap) │     │ Config      │     │ (RawTable)  │           │
//! │  └─────────────┘     └──────┬──────┘     └──────┬──────┘           │
//! │                             │                   │                   │
//! │                             │           ┌───────▼───────┐           │
//! │                             │           │ RowNormalizer │           │
//! │                             │           └───────┬───────┘           │
//! │                      ┌──────▼───────────────────▼──────┐            │
//! │                      │  Quantitative Filter            │            │
//! │                      │  bounds → scope → dedup         │            │
//! │                      └──────────────┬──────────────────┘            │
//! │                                     │                               │
//! │          ┌──────────────────────────┼──────────────────────┐        │
//! │          ▼                          ▼                      ▼        │
//! │    ┌───────────┐            ┌───────────┐          ┌───────────┐    │
//! │    │  general  │            │  growth   │          │   value   │    │
//! │    └─────┬─────┘            └─────┬─────┘          └─────┬─────┘    │
//! │          └──────── top N ─────────┴──── WatchlistWriter ─┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kabu_watchlist::screener::{run_pipeline, PipelineOptions};
//!
//! let output = run_pipeline(&PipelineOptions::default())?;
//! println!("{}", output.result.summary());
//! ```

pub mod analysis;
pub mod config;
pub mod engine;
pub mod normalize;
pub mod quantitative;
pub mod report;
pub mod scoring;

pub use analysis::{AnalysisConfig, MarketAnalysis, Verdict};
pub use config::{ConfigKey, ConfigMap, FilterConfig, ProfileWeights, WatchlistConfig};
pub use engine::{
    run_pipeline, run_with_defaults, PipelineOptions, PipelineOutput, ProfileList, WatchlistEngine,
    WatchlistResult,
};
pub use normalize::{normalize_table, CanonicalRow, RowNormalizer};
pub use quantitative::{FilterResult, FilterStage, QuantitativeFilter};
pub use report::{RunSummary, WatchlistWriter};
pub use scoring::{rank_normalize, Direction, Factor, FactorWeight, Profile, ScoredRow};
