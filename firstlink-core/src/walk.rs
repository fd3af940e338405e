use firstlink_scanner::error::{Result, ScanError};
use firstlink_scanner::fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use firstlink_scanner::selector::WIKIPEDIA_ROOT;
use firstlink_scanner::{Fetcher, HttpFetcher, LinkCandidate, LinkSelector, Paragraph};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::report::page_title;

pub const PHILOSOPHY_URL: &str = "https://en.wikipedia.org/wiki/Philosophy";
pub const SEED_URL: &str = "https://en.wikipedia.org/wiki/Java_(programming_language)";

/// Receives the final path of every walk, success or not
pub type TraceCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Called before each page fetch with the hop number and the page URL
pub type HopCallback = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// Prints the path as `[url, url, ...]` on stdout
pub fn stdout_trace() -> TraceCallback {
    Arc::new(|path: &[String]| println!("{}", format_path(path)))
}

/// Same as [`stdout_trace`] but on stderr, for when stdout carries a report
pub fn stderr_trace() -> TraceCallback {
    Arc::new(|path: &[String]| eprintln!("{}", format_path(path)))
}

pub fn format_path(path: &[String]) -> String {
    format!("[{}]", path.join(", "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The target page was selected as a link
    ReachedTarget,
    /// A page had no paragraphs, or its first paragraph had no valid link
    NoValidLink,
    /// The fetcher reported that a page does not exist
    PageMissing,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::ReachedTarget)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::ReachedTarget => write!(f, "reached target"),
            Outcome::NoValidLink => write!(f, "no valid link"),
            Outcome::PageMissing => write!(f, "page missing"),
        }
    }
}

/// A finished walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walk {
    pub start_url: String,
    pub target_url: String,
    pub path: Vec<String>,
    pub outcome: Outcome,
}

impl Walk {
    pub fn reached_target(&self) -> bool {
        self.outcome.is_success()
    }

    /// Number of links followed
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn last_url(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// Follows first links from a start page until the target page, a dead end,
/// a missing page or a loop.
///
/// Fetches are awaited one at a time; the visited path is owned by the
/// running walk and never shared.
pub struct PathFinder<F> {
    fetcher: F,
    selector: LinkSelector,
    target_url: String,
    trace_callback: TraceCallback,
    hop_callback: Option<HopCallback>,
}

impl<F: Fetcher> PathFinder<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            selector: LinkSelector::default(),
            target_url: PHILOSOPHY_URL.to_string(),
            trace_callback: stdout_trace(),
            hop_callback: None,
        }
    }

    pub fn with_selector(mut self, selector: LinkSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_target(mut self, target_url: impl Into<String>) -> Self {
        self.target_url = target_url.into();
        self
    }

    pub fn with_trace_callback(mut self, callback: TraceCallback) -> Self {
        self.trace_callback = callback;
        self
    }

    pub fn with_hop_callback(mut self, callback: HopCallback) -> Self {
        self.hop_callback = Some(callback);
        self
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub async fn has_target_path(&self, start_url: &str) -> Result<Walk> {
        info!("Walking from {} towards {}", start_url, self.target_url);

        let mut path = vec![start_url.to_string()];
        let mut current = start_url.to_string();

        let outcome = loop {
            let hop = path.len() - 1;
            if let Some(ref callback) = self.hop_callback {
                callback(hop, &current);
            }

            let paragraphs = match self.fetcher.fetch_paragraphs(&current).await {
                Ok(paragraphs) => paragraphs,
                Err(ScanError::PageNotFound(url)) => {
                    warn!("Page does not exist: {}", url);
                    break Outcome::PageMissing;
                }
                Err(e) => return Err(e),
            };

            match self.next_link(&paragraphs, &path) {
                Some(LinkCandidate { url }) if url == self.target_url => {
                    info!("Hop {}: reached {}", hop + 1, url);
                    path.push(url);
                    break Outcome::ReachedTarget;
                }
                Some(LinkCandidate { url }) => {
                    info!("Hop {}: {} -> {}", hop + 1, page_title(&current), page_title(&url));
                    path.push(url.clone());
                    current = url;
                }
                None => {
                    info!("No valid link on {}", current);
                    break Outcome::NoValidLink;
                }
            }
        };

        (self.trace_callback)(&path);

        Ok(Walk {
            start_url: start_url.to_string(),
            target_url: self.target_url.clone(),
            path,
            outcome,
        })
    }

    /// The link a walk standing on `url` would follow, without following it
    pub async fn peek(&self, url: &str) -> Result<Option<LinkCandidate>> {
        let paragraphs = self.fetcher.fetch_paragraphs(url).await?;
        Ok(self.next_link(&paragraphs, &[url.to_string()]))
    }

    // Only the first paragraph decides: it either yields the link or ends
    // the walk, later paragraphs are never scanned.
    fn next_link(&self, paragraphs: &[Paragraph], visited: &[String]) -> Option<LinkCandidate> {
        let Some(first) = paragraphs.first() else {
            debug!("Page has no paragraphs");
            return None;
        };
        self.selector.select_first_valid_link(first, visited)
    }
}

/// Options for configuring a walk over HTTP
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub start_url: String,
    pub target_url: String,
    pub site_root: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub show_progress: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            start_url: SEED_URL.to_string(),
            target_url: PHILOSOPHY_URL.to_string(),
            site_root: WIKIPEDIA_ROOT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: false,
        }
    }
}

impl WalkOptions {
    pub fn fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::builder()
            .with_timeout(self.timeout_secs)
            .with_user_agent(self.user_agent.clone())
            .build()
    }

    pub fn path_finder(&self) -> Result<PathFinder<HttpFetcher>> {
        Ok(PathFinder::new(self.fetcher()?)
            .with_selector(LinkSelector::new(self.site_root.clone()))
            .with_target(self.target_url.clone()))
    }
}

/// Execute a walk over HTTP with the given options.
/// The trace callback runs once with the final path.
pub async fn execute_walk(options: WalkOptions, trace_callback: TraceCallback) -> Result<Walk> {
    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| ScanError::Other(format!("Invalid progress template: {}", e)))?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting walk...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut finder = options.path_finder()?;

    if let Some(ref pb) = progress_bar {
        let pb_hop = pb.clone();
        finder = finder.with_hop_callback(Arc::new(move |hop: usize, url: &str| {
            pb_hop.set_message(format!("Hop {}: {}", hop, page_title(url)));
        }));

        // Keep the spinner from drawing over the trace output
        let pb_trace = pb.clone();
        let inner = trace_callback.clone();
        finder = finder.with_trace_callback(Arc::new(move |path: &[String]| {
            pb_trace.suspend(|| inner(path));
        }));
    } else {
        finder = finder.with_trace_callback(trace_callback);
    }

    let result = finder.has_target_path(&options.start_url).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    result
}
