/// Source adapters: one file per external source.
///
/// Submodules:
/// - `thaiwater`: station table row on the provincial water-level page.
/// - `hii`: dam telemetry JSON embedded in a chart page.
/// - `openweather`: forecast list and current conditions.
///
/// Every adapter implements [`SourceAdapter`]. Adapters never fail on a
/// missing value (they return a reading with the value absent); they fail
/// only when the page or API cannot be fetched or no longer has the
/// expected structure.

pub mod hii;
pub mod openweather;
pub mod thaiwater;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::DataSource;
use crate::model::SourceError;

/// Timeout for page fetches. The government pages are slow under load.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for API calls.
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// One external source producing a normalized output per poll.
pub trait SourceAdapter {
    type Output;

    fn source(&self) -> DataSource;

    /// Station identifier from the registry, for logs.
    fn station_id(&self) -> &str;

    fn fetch(&self) -> Result<Self::Output, SourceError>;
}

// ---------------------------------------------------------------------------
// Rendered page collaborator
// ---------------------------------------------------------------------------

/// Returns the text of a (possibly script-rendered) page.
pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, SourceError>;
}

/// Plain HTTP GET with a browser user agent and caching disabled.
pub struct HttpPageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self { client: build_client(timeout)? })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::Http(response.status().as_u16()));
        }
        Ok(response.text()?)
    }
}

/// Serves a saved page from disk regardless of URL (offline development).
pub struct LocalPageFetcher {
    path: PathBuf,
}

impl LocalPageFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageFetcher for LocalPageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        tracing::info!(path = %self.path.display(), url, "serving page from local file");
        fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Request(format!("{}: {}", self.path.display(), e)))
    }
}

/// Blocking client shared by the HTTP adapters.
pub fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| SourceError::Request(e.to_string()))
}

/// Picks the page fetcher for the current configuration.
pub fn page_fetcher(config: &crate::config::Config) -> Result<Box<dyn PageFetcher>, SourceError> {
    if config.use_local_html {
        Ok(Box::new(LocalPageFetcher::new(&config.local_html_path)))
    } else {
        Ok(Box::new(HttpPageFetcher::new(PAGE_TIMEOUT)?))
    }
}
