use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A single browser tab driven by the crawler
///
/// Everything the harvester and the detail extractor need from a browser:
/// navigation with a bound, waiting for structural markers and reading the
/// rendered markup back. DOM querying happens on the returned markup.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to `url`, failing if the page does not load within `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until any of `selectors` matches an element
    async fn wait_for_any(&mut self, selectors: &[&str], timeout: Duration) -> Result<()>;

    /// URL of the page currently loaded, after redirects
    async fn current_url(&mut self) -> Result<String>;

    /// Full rendered markup of the current page
    async fn content(&mut self) -> Result<String>;

    /// PNG screenshot of the current page
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Pointer movement, scrolling and cookie-banner dismissal
    async fn humanize(&mut self) -> Result<()>;

    /// Release the underlying browser
    async fn close(&mut self) -> Result<()>;
}

/// Opens browser sessions
///
/// The pipeline asks for exactly one session per run.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}
