//! Kabu Watchlist Library
//!
//! Turns a daily snapshot of Japanese equities (`jp_latest.csv`) into three
//! ranked watchlists of ticker symbols, driven by a flat `KEY = VALUE`
//! settings file (`config_jp.txt`).
//!
//! # Key Concepts
//!
//! ## Rank-normalized scoring
//! - Every factor is ranked with ties averaged, then rescaled to `[0, 1]`
//! - Profiles combine factors as a weighted linear sum
//! - A factor with no data scores the same for every row
//!
//! ## Profiles
//! - **general**: change%, turnover, market cap, dividend yield, P/E, momentum
//! - **growth**: momentum-oriented, non-defensive sectors only
//! - **value**: yield and P/E, defensive sectors only
//!
//! ## Input tolerance
//! - Column names are matched through an alias table (English and Japanese)
//! - Full-width digits, thousands separators and unit suffixes are accepted
//! - Unparseable numbers read as 0.0 and never abort a run

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod screener;

pub use data::{DataError, RawRow, RawTable};
pub use screener::{run_pipeline, PipelineOptions, PipelineOutput, WatchlistConfig, WatchlistResult};
