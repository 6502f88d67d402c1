//! Watchlist output.
//!
//! Generates:
//! - Flat text watchlists (one symbol per line under a fixed header)
//! - A JSON run summary (for downstream tooling)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::engine::{ProfileList, WatchlistResult};
use super::quantitative::FilterResult;
use super::scoring::{Profile, ScoredRow};

/// Marker line after which symbols start.
pub const SYMBOLS_MARKER: &str = "# ---- symbols below ----";

/// Create `path`'s parent directory if needed, then write `content`.
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// Watchlist Writer
// ============================================================================

/// Renders and writes the per-profile watchlists.
pub struct WatchlistWriter {
    generated_at: DateTime<Utc>,
    filter_summary: String,
}

impl WatchlistWriter {
    pub fn new(generated_at: DateTime<Utc>, filter_summary: impl Into<String>) -> Self {
        Self {
            generated_at,
            filter_summary: filter_summary.into(),
        }
    }

    /// Render one watchlist: header, then symbols in rank order.
    pub fn render(&self, title: &str, entries: &[ScoredRow]) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", title));
        out.push_str(&format!(
            "# generated at {} (UTC)\n",
            self.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
        ));
        out.push_str(&format!("# filters: {}\n", self.filter_summary));
        out.push_str(&format!("# total={}\n", entries.len()));
        out.push_str(SYMBOLS_MARKER);
        out.push('\n');

        for entry in entries {
            out.push_str(entry.row.symbol.trim());
            out.push('\n');
        }
        out
    }

    /// Write `entries` to `<out_dir>/<profile file name>`.
    pub fn write(&self, out_dir: &Path, profile: Profile, entries: &[ScoredRow]) -> Result<PathBuf> {
        let path = out_dir.join(profile.file_name());
        write_file(&path, &self.render(profile.title(), entries))?;
        Ok(path)
    }
}

// ============================================================================
// Run Summary
// ============================================================================

/// One selected row in the summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub rank: usize,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub score: f64,
}

/// One profile's selection in the summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryList {
    pub profile: Profile,
    pub file: String,
    /// Rows eligible for this profile before the top-N cut
    pub candidates: usize,
    pub entries: Vec<SummaryEntry>,
}

impl From<&ProfileList> for SummaryList {
    fn from(list: &ProfileList) -> Self {
        Self {
            profile: list.profile,
            file: list.profile.file_name().to_string(),
            candidates: list.candidates,
            entries: list
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| SummaryEntry {
                    rank: i + 1,
                    symbol: e.row.symbol.clone(),
                    name: e.row.name.clone(),
                    sector: e.row.sector.clone(),
                    score: e.score,
                })
                .collect(),
        }
    }
}

/// Machine-readable summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub input_rows: usize,
    pub normalized_rows: usize,
    pub filtered_rows: usize,
    pub filters: String,
    pub funnel: Vec<FilterResult>,
    pub lists: Vec<SummaryList>,
}

impl RunSummary {
    pub fn new(result: &WatchlistResult) -> Self {
        Self {
            id: result.id.clone(),
            started_at: result.started_at,
            completed_at: result.completed_at,
            input_rows: result.input_rows,
            normalized_rows: result.normalized_rows,
            filtered_rows: result.filtered_rows,
            filters: result.filter_summary.clone(),
            funnel: result.funnel.clone(),
            lists: result.lists.iter().map(SummaryList::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run summary")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = self.to_json()?;
        content.push('\n');
        write_file(path, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::normalize::CanonicalRow;
    use chrono::TimeZone;

    fn scored(symbol: &str, score: f64) -> ScoredRow {
        ScoredRow {
            row: CanonicalRow {
                symbol: symbol.to_string(),
                name: format!("{symbol} Corp"),
                ..CanonicalRow::default()
            },
            score,
        }
    }

    fn writer() -> WatchlistWriter {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap();
        WatchlistWriter::new(ts, "MIN_PRICE=200  MAX_PRICE=20000  MIN_TURNOVER=300000000")
    }

    #[test]
    fn test_render_header_and_symbols() {
        let text = writer().render("JP watchlist (general)", &[scored("7203.T", 0.9), scored("6758.T", 0.4)]);
        let expected = "\
# JP watchlist (general)
# generated at 2024-03-01T06:30:00Z (UTC)
# filters: MIN_PRICE=200  MAX_PRICE=20000  MIN_TURNOVER=300000000
# total=2
# ---- symbols below ----
7203.T
6758.T
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty() {
        let text = writer().render("JP watchlist (growth)", &[]);
        assert!(text.contains("# total=0\n"));
        assert!(text.ends_with(&format!("{}\n", SYMBOLS_MARKER)));
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("out");

        let path = writer()
            .write(&out_dir, Profile::Value, &[scored("9432.T", 1.0)])
            .unwrap();

        assert_eq!(path, out_dir.join("watchlist_jp_value.txt"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# JP watchlist (value/defensive)\n"));
        assert!(text.ends_with("9432.T\n"));
    }

    #[test]
    fn test_summary_list_ranks() {
        let list = ProfileList {
            profile: Profile::Growth,
            candidates: 5,
            entries: vec![scored("A", 0.8), scored("B", 0.3)],
        };

        let summary = SummaryList::from(&list);
        assert_eq!(summary.file, "watchlist_jp_growth.txt");
        assert_eq!(summary.entries[0].rank, 1);
        assert_eq!(summary.entries[1].symbol, "B");
        assert_eq!(summary.entries[1].name, "B Corp");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["profile"], "growth");
        assert_eq!(json["candidates"], 5);
    }
}
