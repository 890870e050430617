//! Link discovery over paginated search results

use crate::models::SearchTarget;
use crate::scrapers::consolidate::LinkSet;
use crate::scrapers::listing::{absolutize, selector};
use crate::scrapers::traits::PageSession;
use crate::scrapers::types::{HarvestOptions, PaginationPolicy};
use crate::scrapers::url_builder::build_page_url;
use crate::storage::write_link_table;
use crate::{Result, ScrapeError};
use scraper::Html;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// Listing card on a search result page
pub const CARD_SELECTOR: &str = "li[data-cy='rp-property-cd']";

/// Collects listing links for search targets and saves them as link tables
pub struct LinkHarvester {
    options: HarvestOptions,
    links_dir: PathBuf,
}

impl LinkHarvester {
    pub fn new(options: HarvestOptions, links_dir: impl Into<PathBuf>) -> Self {
        Self {
            options,
            links_dir: links_dir.into(),
        }
    }

    /// Harvests `target` and writes its link table
    ///
    /// Returns `Ok(None)` when no links were found. Any failure while
    /// paginating discards the links gathered so far for this target.
    pub async fn harvest(
        &self,
        session: &mut dyn PageSession,
        target: &SearchTarget,
        pages: u32,
    ) -> Result<Option<PathBuf>> {
        let links = self.collect(session, target, pages).await?;

        if links.is_empty() {
            warn!("No links found for target {}", target.id);
            return Ok(None);
        }

        let path = write_link_table(&self.links_dir, &target.id, links.as_slice())?;
        info!("Saved {} links for {} to {}", links.len(), target.id, path.display());
        Ok(Some(path))
    }

    /// Visits result pages `1..=pages` and returns the unique links in
    /// first-seen order
    pub async fn collect(
        &self,
        session: &mut dyn PageSession,
        target: &SearchTarget,
        pages: u32,
    ) -> Result<LinkSet> {
        let mut links = LinkSet::new();

        for page in 1..=pages {
            let url = build_page_url(&target.base_url, page, target.sort_suffix.as_deref())?;
            info!("[{}] Navigating to page {}: {}", target.id, page, url);

            session.navigate(&url, self.options.navigation_timeout()).await?;

            let waited = session
                .wait_for_any(&[CARD_SELECTOR], self.options.card_timeout())
                .await;
            if let Err(e) = waited {
                match (self.options.pagination, &e) {
                    (PaginationPolicy::StopOnEmpty, ScrapeError::Timeout { .. }) => {
                        info!("[{}] Page {} has no listings, stopping", target.id, page);
                        break;
                    }
                    _ => return Err(e),
                }
            }

            let page_url = session.current_url().await?;
            let html = session.content().await?;
            let found = extract_card_links(&html, &page_url);

            let before = links.len();
            for link in found.iter().cloned() {
                links.insert(link);
            }
            info!(
                "[{}] Page {}: {} cards, {} new links ({} total)",
                target.id,
                page,
                found.len(),
                links.len() - before,
                links.len()
            );

            if found.is_empty() && self.options.pagination == PaginationPolicy::StopOnEmpty {
                info!("[{}] Page {} has no listings, stopping", target.id, page);
                break;
            }
        }

        Ok(links)
    }
}

/// Reads the anchor of every listing card and resolves it against `page_url`
pub fn extract_card_links(html: &str, page_url: &str) -> Vec<String> {
    let (Some(card_selector), Some(anchor_selector)) =
        (selector(CARD_SELECTOR), selector("a[href]"))
    else {
        return Vec::new();
    };
    let base = match Url::parse(page_url) {
        Ok(base) => base,
        Err(e) => {
            warn!("Cannot resolve links against {}: {}", page_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for card in document.select(&card_selector) {
        let Some(href) = card
            .select(&anchor_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            debug!("Card without link, skipping");
            continue;
        };
        if let Some(link) = absolutize(&base, href) {
            links.push(link);
        }
    }

    links
}
