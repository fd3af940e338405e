use crate::document::{self, Paragraph, CONTENT_PARAGRAPHS};
use crate::error::{Result, ScanError};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "firstlink/0.1 (https://github.com/trapdoorsec/firstlink)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Source of page paragraphs for a walk.
///
/// Implementations report a page that does not exist as
/// [`ScanError::PageNotFound`]; any other error ends the walk.
pub trait Fetcher {
    fn fetch_paragraphs(&self, url: &str) -> impl Future<Output = Result<Vec<Paragraph>>> + Send;
}

/// Fetches pages over HTTP and flattens their article paragraphs
pub struct HttpFetcher {
    client: Client,
    paragraph_selector: String,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching {}", url);
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("{} answered {} in {:?}", url, status.as_u16(), start.elapsed());

        if status == StatusCode::NOT_FOUND {
            return Err(ScanError::PageNotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        if let Some(ref ct) = content_type
            && !ct.contains("html")
        {
            return Err(ScanError::ParseError(format!(
                "Expected HTML from {}, got {}",
                url, ct
            )));
        }

        Ok(response.text().await?)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_paragraphs(&self, url: &str) -> Result<Vec<Paragraph>> {
        let body = self.get_html(url).await?;
        document::parse_paragraphs_matching(&body, &self.paragraph_selector)
    }
}

pub struct HttpFetcherBuilder {
    timeout_secs: u64,
    user_agent: String,
    paragraph_selector: String,
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            paragraph_selector: CONTENT_PARAGRAPHS.to_string(),
        }
    }
}

impl HttpFetcherBuilder {
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_paragraph_selector(mut self, css: impl Into<String>) -> Self {
        self.paragraph_selector = css.into();
        self
    }

    pub fn build(self) -> Result<HttpFetcher> {
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.timeout_secs.div_ceil(2)))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(HttpFetcher {
            client,
            paragraph_selector: self.paragraph_selector,
        })
    }
}
