//! Where paradigm pages come from.
//!
//! [`LexiconSource`] is the seam between the pipeline and the network;
//! [`HttpLexicon`] is the blocking reqwest implementation used in
//! production, tests plug in an in-memory fake.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.frag-caesar.de/lateinwoerterbuch/";
/// Appended to the headword to form its page name.
pub const PAGE_SUFFIX: &str = "-uebersetzung.html";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("cannot build page address: {0}")]
    Url(#[from] url::ParseError),
}

/// A reference source that serves one HTML page per headword.
pub trait LexiconSource: Send + Sync {
    /// Address relative links on fetched pages resolve against.
    fn base_url(&self) -> &Url;

    /// Fetch the page named after `headword`.
    fn fetch_document(&self, headword: &str) -> Result<String, FetchError>;

    /// Fetch an absolute address, typically a disambiguation target.
    fn fetch_url(&self, url: &Url) -> Result<String, FetchError>;
}

/// Page address for `headword` under `base`.
pub fn page_url(base: &Url, headword: &str) -> Result<Url, FetchError> {
    Ok(base.join(&format!("{}{PAGE_SUFFIX}", headword.trim()))?)
}

pub struct HttpLexicon {
    client: Client,
    base_url: Url,
}

impl HttpLexicon {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid lexicon base URL: {base_url}"))?;
        // Url::join drops the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()
            .context("failed to build lexicon HTTP client")?;
        Ok(Self { client, base_url })
    }

    fn get(&self, url: &Url) -> Result<String, FetchError> {
        debug!("fetching {url}");
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.clone()).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(transport)
    }
}

impl LexiconSource for HttpLexicon {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn fetch_document(&self, headword: &str) -> Result<String, FetchError> {
        let url = page_url(&self.base_url, headword)?;
        self.get(&url)
    }

    fn fetch_url(&self, url: &Url) -> Result<String, FetchError> {
        self.get(url)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers
}
