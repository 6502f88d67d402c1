//! Market snapshot analysis.
//!
//! Buckets the normalized (unfiltered) snapshot by day change into
//! Buy / Watch / Avoid and renders a short text report.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use super::normalize::CanonicalRow;

/// Classification thresholds and section caps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    /// Change% at or above this is Buy
    pub buy_threshold: f64,
    /// Change% at or above this (and below buy) is Watch; below is Avoid
    pub watch_floor: f64,
    pub buy_cap: usize,
    pub watch_cap: usize,
    pub avoid_cap: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buy_threshold: 3.0,
            watch_floor: 0.0,
            buy_cap: 15,
            watch_cap: 20,
            avoid_cap: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Buy,
    Watch,
    Avoid,
}

impl AnalysisConfig {
    pub fn classify(&self, change_pct: f64) -> Verdict {
        if change_pct >= self.buy_threshold {
            Verdict::Buy
        } else if change_pct >= self.watch_floor {
            Verdict::Watch
        } else {
            Verdict::Avoid
        }
    }
}

/// Classified snapshot, each section already ordered and capped.
#[derive(Debug, Clone)]
pub struct MarketAnalysis {
    pub generated_at: DateTime<Local>,
    pub buy: Vec<CanonicalRow>,
    pub watch: Vec<CanonicalRow>,
    pub avoid: Vec<CanonicalRow>,
}

impl MarketAnalysis {
    pub fn analyze(rows: &[CanonicalRow], config: &AnalysisConfig, generated_at: DateTime<Local>) -> Self {
        let mut buy = Vec::new();
        let mut watch = Vec::new();
        let mut avoid = Vec::new();

        for row in rows {
            match config.classify(row.change_pct) {
                Verdict::Buy => buy.push(row.clone()),
                Verdict::Watch => watch.push(row.clone()),
                Verdict::Avoid => avoid.push(row.clone()),
            }
        }

        // Strongest first, except Avoid which lists the weakest first
        buy.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
        watch.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
        avoid.sort_by(|a, b| a.change_pct.total_cmp(&b.change_pct));

        buy.truncate(config.buy_cap);
        watch.truncate(config.watch_cap);
        avoid.truncate(config.avoid_cap);

        Self {
            generated_at,
            buy,
            watch,
            avoid,
        }
    }

    pub fn render(&self, config: &AnalysisConfig) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "JP market analysis - {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M")
        ));
        out.push_str(&format!(
            "(Change% >= {} -> Buy, {} to {} -> Watch, < {} -> Avoid)\n\n",
            config.buy_threshold, config.watch_floor, config.buy_threshold, config.watch_floor
        ));

        render_section(&mut out, "[Buy candidates]", &self.buy);
        render_section(&mut out, "[Watch]", &self.watch);
        render_section(&mut out, "[Avoid]", &self.avoid);
        out
    }

    pub fn save(&self, path: &Path, config: &AnalysisConfig) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context("Failed to create analysis directory")?;
        }

        std::fs::write(path, self.render(config))
            .with_context(|| format!("Failed to write analysis report {}", path.display()))
    }
}

fn render_section(out: &mut String, title: &str, rows: &[CanonicalRow]) {
    out.push_str(title);
    out.push('\n');
    if rows.is_empty() {
        out.push_str("  - (none)\n\n");
        return;
    }
    for row in rows {
        out.push_str(&format!(
            "  - {:>8}  {:>10.1}  {:>+9.1}  {:>+7.2}%\n",
            row.symbol, row.price, row.change, row.change_pct
        ));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(symbol: &str, change_pct: f64) -> CanonicalRow {
        CanonicalRow {
            symbol: symbol.to_string(),
            price: 1000.0,
            change: 1000.0 * change_pct / 100.0,
            change_pct,
            ..CanonicalRow::default()
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
    }

    fn symbols(rows: &[CanonicalRow]) -> Vec<&str> {
        rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_classify_boundaries() {
        let config = AnalysisConfig::default();
        let cases = vec![
            (3.0, Verdict::Buy),
            (7.5, Verdict::Buy),
            (2.99, Verdict::Watch),
            (0.0, Verdict::Watch),
            (-0.01, Verdict::Avoid),
        ];
        for (change, expected) in cases {
            assert_eq!(config.classify(change), expected, "change={change}");
        }
    }

    #[test]
    fn test_sections_sorted() {
        let rows = vec![
            row("A", 3.5),
            row("B", 9.0),
            row("C", 1.0),
            row("D", 2.0),
            row("E", -1.0),
            row("F", -4.0),
        ];
        let analysis = MarketAnalysis::analyze(&rows, &AnalysisConfig::default(), at());
        assert_eq!(symbols(&analysis.buy), vec!["B", "A"]);
        assert_eq!(symbols(&analysis.watch), vec!["D", "C"]);
        assert_eq!(symbols(&analysis.avoid), vec!["F", "E"]);
    }

    #[test]
    fn test_sections_capped() {
        let rows: Vec<_> = (0..30).map(|i| row(&format!("S{i}"), 5.0 + i as f64)).collect();
        let analysis = MarketAnalysis::analyze(&rows, &AnalysisConfig::default(), at());
        assert_eq!(analysis.buy.len(), 15);
        assert_eq!(analysis.buy[0].symbol, "S29");
    }

    #[test]
    fn test_render_empty_sections() {
        let analysis = MarketAnalysis::analyze(&[row("A", 1.0)], &AnalysisConfig::default(), at());
        let text = analysis.render(&AnalysisConfig::default());
        assert!(text.starts_with("JP market analysis - 2024-03-01 15:00\n"));
        assert!(text.contains("[Buy candidates]\n  - (none)\n"));
        assert!(text.contains("[Avoid]\n  - (none)\n"));
        assert!(text.contains("+1.00%"));
    }

    #[test]
    fn test_render_lists_price_change_and_percent() {
        let config = AnalysisConfig::default();
        let text = MarketAnalysis::analyze(&[row("7203", 4.0)], &config, at()).render(&config);
        let buy = text.split("[Buy candidates]\n").nth(1).unwrap();
        let line = buy.lines().next().unwrap();
        let cols: Vec<&str> = line.trim_start_matches("  - ").split_whitespace().collect();
        assert_eq!(cols, ["7203", "1000.0", "+40.0", "+4.00%"]);
    }

    #[test]
    fn test_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("jp_analysis.txt");
        let config = AnalysisConfig::default();
        MarketAnalysis::analyze(&[row("A", -2.0)], &config, at())
            .save(&path, &config)
            .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let avoid = text.split("[Avoid]\n").nth(1).unwrap();
        assert!(avoid.lines().next().unwrap().trim_start().starts_with("- "));
        assert!(avoid.contains("-2.00%"));
    }
}
