//! Scripted in-memory browser used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use listing_crawler::scrapers::{ExtractOptions, PageSession, SessionFactory};
use listing_crawler::{Result, ScrapeError};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, String>,
    failures: HashMap<String, u32>,
    visits: Vec<String>,
    opened: u32,
    closed: u32,
}

/// A fake website shared between the test and the sessions it hands out
#[derive(Clone, Default)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, html: impl Into<String>) -> &Self {
        self.state.lock().unwrap().pages.insert(url.to_string(), html.into());
        self
    }

    /// Makes the next `times` navigations to `url` fail
    pub fn fail_navigation(&self, url: &str, times: u32) -> &Self {
        self.state.lock().unwrap().failures.insert(url.to_string(), times);
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.visits().iter().filter(|v| *v == url).count()
    }

    pub fn opened(&self) -> u32 {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> u32 {
        self.state.lock().unwrap().closed
    }

    pub fn session(&self) -> FakeSession {
        self.state.lock().unwrap().opened += 1;
        FakeSession {
            site: self.clone(),
            current: None,
        }
    }
}

pub struct FakeSession {
    site: FakeSite,
    current: Option<String>,
}

impl FakeSession {
    fn current_html(&self) -> Option<String> {
        let url = self.current.as_ref()?;
        self.site.state.lock().unwrap().pages.get(url).cloned()
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.site.state.lock().unwrap();
        state.visits.push(url.to_string());

        if let Some(remaining) = state.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_TIMED_OUT".to_string(),
                });
            }
        }

        if !state.pages.contains_key(url) {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }

        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_any(&mut self, selectors: &[&str], _timeout: Duration) -> Result<()> {
        let html = self.current_html().unwrap_or_default();
        let document = Html::parse_document(&html);
        let found = selectors.iter().any(|css| {
            Selector::parse(css)
                .map(|s| document.select(&s).next().is_some())
                .unwrap_or(false)
        });
        if found {
            Ok(())
        } else {
            Err(ScrapeError::Timeout {
                url: self.current.clone().unwrap_or_default(),
                what: selectors.join(", "),
            })
        }
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.current_html().unwrap_or_default())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn humanize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.site.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Hands out sessions on a [`FakeSite`], or fails like a missing browser
pub struct FakeLauncher {
    pub site: FakeSite,
    pub fail: bool,
}

#[async_trait]
impl SessionFactory for FakeLauncher {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        if self.fail {
            return Err(ScrapeError::Browser(
                "Could not auto detect a chrome executable".to_string(),
            ));
        }
        Ok(Box::new(self.site.session()))
    }
}

/// Search result page with one card per href
pub fn results_page(hrefs: &[&str]) -> String {
    let cards: String = hrefs
        .iter()
        .map(|href| format!(r#"<li data-cy="rp-property-cd"><a href="{href}">card</a></li>"#))
        .collect();
    format!("<html><body><ul>{cards}</ul></body></html>")
}

/// Listing page with a price and an address
pub fn listing_page(price: &str, address: &str) -> String {
    format!(
        r#"<html><body><main>
            <div class="price-info__values-sale">
              <div class="value-item">
                <p class="value-item__title">Venda</p>
                <p class="value-item__value">{price}</p>
              </div>
            </div>
            <p class="location-address__text" data-testid="location-address">{address}</p>
            <span class="amenities-item-text">80 m²</span>
            <span class="amenities-item-text">3 quartos</span>
        </main></body></html>"#
    )
}

/// Extraction options without waiting between attempts or listings
pub fn fast_extract_options() -> ExtractOptions {
    ExtractOptions {
        backoff_base_ms: 1,
        backoff_cap_ms: 5,
        pause_min_ms: 0,
        pause_max_ms: 0,
        ..ExtractOptions::default()
    }
}
