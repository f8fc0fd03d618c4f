//! JSON run reports.
//!
//! # Output Structure
//!
//! Reports are grouped by source, one file per run:
//! ```text
//! json_output_dir/
//! └── coinpost/
//!     ├── 2025-05-06T08-00-00Z.json
//!     └── 2025-05-06T20-00-00Z.json
//! ```
//!
//! Colons are replaced in the timestamp so the file name is valid everywhere.

use crate::models::RunReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path a report is written to: `{json_output_dir}/{source}/{started_at}.json`.
pub fn report_path(report: &RunReport, json_output_dir: &str) -> PathBuf {
    let stamp = report.started_at.replace(':', "-");
    Path::new(json_output_dir)
        .join(&report.source)
        .join(format!("{stamp}.json"))
}

/// Serialise `report` as pretty JSON and write it under `json_output_dir`.
///
/// # Returns
///
/// The path of the written file.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(report: &RunReport, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), entries = report.entries.len(), "Wrote JSON run report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, ReportEntry, RunStats};

    fn report() -> RunReport {
        RunReport {
            source: "ripple2c".to_string(),
            started_at: "2025-05-06T08:00:00Z".to_string(),
            dry_run: true,
            entries: vec![ReportEntry {
                article: Article::new("https://ripple.2chblog.jp/archives/1.html"),
                result: None,
                error: None,
            }],
            stats: RunStats {
                candidates: 1,
                extracted: 1,
                ..RunStats::default()
            },
        }
    }

    #[test]
    fn test_report_path_is_filesystem_safe() {
        let path = report_path(&report(), "/tmp/out");
        assert_eq!(path, PathBuf::from("/tmp/out/ripple2c/2025-05-06T08-00-00Z.json"));
    }

    #[tokio::test]
    async fn test_write_report_creates_dirs() {
        let dir = std::env::temp_dir().join(format!("coin_news_relay_json_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();

        let path = write_report(&report(), &dir_str).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: RunReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.source, "ripple2c");
        assert_eq!(parsed.stats.extracted, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
