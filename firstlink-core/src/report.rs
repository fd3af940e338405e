// Report generation for finished walks

use crate::walk::{Outcome, Walk};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use url::{form_urlencoded, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkReport {
    pub start_url: String,
    pub target_url: String,
    pub reached_target: bool,
    pub outcome: Outcome,
    pub hops: usize,
    pub path: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl WalkReport {
    pub fn new(walk: &Walk) -> Self {
        Self {
            start_url: walk.start_url.clone(),
            target_url: walk.target_url.clone(),
            reached_target: walk.reached_target(),
            outcome: walk.outcome,
            hops: walk.hops(),
            path: walk.path.clone(),
            finished_at: Utc::now(),
        }
    }
}

/// Human readable page name for a URL: the last path segment decoded, with
/// underscores as spaces, e.g. `/wiki/Kurt_G%C3%B6del` -> `Kurt Gödel`
pub fn page_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(decode_segment))
        })
        .filter(|s| !s.is_empty())
        .map(|s| s.replace('_', " "))
        .unwrap_or_else(|| url.to_string())
}

// Article hrefs escape `+`, `&` and `=`, so form decoding only undoes the
// percent-encoding
fn decode_segment(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

pub fn render_text(walk: &Walk) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Start: {}\n", walk.start_url));
    report.push_str(&format!("  Target: {}\n", walk.target_url));
    report.push_str(&format!("  Outcome: {}\n", walk.outcome));
    report.push_str(&format!("  Hops: {}\n", walk.hops()));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str("## Path\n");
    for (idx, url) in walk.path.iter().enumerate() {
        report.push_str(&format!("  {:>3}. {}  {}\n", idx, page_title(url), url));
    }

    report
}

pub fn render_json(walk: &Walk) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&WalkReport::new(walk))
}

pub fn render(walk: &Walk, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(walk)),
        ReportFormat::Json => render_json(walk),
    }
}

pub fn write_report(walk: &Walk, format: ReportFormat, path: &Path) -> std::io::Result<()> {
    let content = render(walk, format).map_err(std::io::Error::other)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
