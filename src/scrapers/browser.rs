use crate::scrapers::traits::{PageSession, SessionFactory};
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept cookies if a consent banner is present
const DISMISS_CONSENT_JS: &str = r#"
    (() => {
        const button = document.querySelector(
            '#cookie-notifier-cta, button[id*="accept"], button[data-testid*="cookie"], button[class*="cookie"]'
        );
        if (button) { button.click(); return true; }
        return false;
    })()
"#;

/// Launches headless Chrome sessions
pub struct ChromeLauncher {
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        let headless = self.headless;
        let session = blocking(move || ChromeSession::launch(headless)).await?;
        Ok(Box::new(session))
    }
}

/// A Chrome process with one tab, used for the whole run
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch Chrome and open the working tab
    pub fn launch(headless: bool) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", headless);

        let args = [
            "--disable-blink-features=AutomationControlled",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--lang=pt-BR",
        ];

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1366, 768)))
            .idle_browser_timeout(Duration::from_secs(600))
            .args(args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| ScrapeError::Browser(format!("failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| ScrapeError::Browser(format!("failed to launch Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(format!("failed to open tab: {e}")))?;
        tab.set_user_agent(USER_AGENT, Some("pt-BR,pt;q=0.9"), None)
            .map_err(|e| ScrapeError::Browser(format!("failed to set user agent: {e}")))?;

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    fn tab(&self) -> Arc<Tab> {
        Arc::clone(&self.tab)
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let tab = self.tab();
        let target = url.to_string();
        blocking(move || {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)
                .and_then(|tab| tab.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| ScrapeError::Navigation {
                    url: target.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn wait_for_any(&mut self, selectors: &[&str], timeout: Duration) -> Result<()> {
        let tab = self.tab();
        let joined = selectors.join(", ");
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&joined, timeout)
                .map(|_| ())
                .map_err(|e| {
                    debug!("Wait for '{}' failed: {}", joined, e);
                    ScrapeError::Timeout {
                        url: tab.get_url(),
                        what: joined.clone(),
                    }
                })
        })
        .await
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn content(&mut self) -> Result<String> {
        let tab = self.tab();
        blocking(move || {
            tab.get_content()
                .map_err(|e| ScrapeError::Browser(format!("failed to read page content: {e}")))
        })
        .await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let tab = self.tab();
        blocking(move || {
            tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| ScrapeError::Browser(format!("failed to capture screenshot: {e}")))
        })
        .await
    }

    async fn humanize(&mut self) -> Result<()> {
        let tab = self.tab();
        let (x, y, scroll) = {
            let mut rng = rand::rng();
            (
                rng.random_range(100..1200),
                rng.random_range(100..650),
                rng.random_range(200..900),
            )
        };

        blocking(move || {
            let dismissed = tab
                .evaluate(DISMISS_CONSENT_JS, false)
                .ok()
                .and_then(|result| result.value)
                .and_then(|value| value.as_bool())
                .unwrap_or(false);
            if dismissed {
                debug!("Dismissed cookie banner");
            }

            let script = format!(
                "document.dispatchEvent(new MouseEvent('mousemove', {{clientX: {x}, clientY: {y}, bubbles: true}})); \
                 window.scrollBy(0, {scroll});"
            );
            tab.evaluate(&script, false)
                .map(|_| ())
                .map_err(|e| ScrapeError::Browser(format!("page interaction failed: {e}")))
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let tab = self.tab();
        blocking(move || {
            if let Err(e) = tab.close(true) {
                warn!("Failed to close tab: {}", e);
            }
            drop(browser);
            Ok(())
        })
        .await?;
        info!("Browser closed");
        Ok(())
    }
}

/// Runs a blocking CDP call off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ScrapeError::Browser(format!("browser task failed: {e}")))?
}
