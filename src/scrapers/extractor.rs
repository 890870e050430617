//! Per-listing detail extraction with retry and backoff

use crate::models::{ExtractionAttempt, ListingRecord};
use crate::scrapers::listing::{parse_listing, READY_SELECTORS};
use crate::scrapers::traits::PageSession;
use crate::scrapers::types::ExtractOptions;
use crate::storage::{file_stem_safe, ListingWriter};
use crate::{Result, ScrapeError};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest sanitized link used in debug artifact names
const DEBUG_NAME_MAX: usize = 180;

/// What happened to a single link
#[derive(Debug)]
pub enum LinkOutcome {
    Saved { attempts: u32 },
    Failed { last: ExtractionAttempt },
}

impl LinkOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, LinkOutcome::Saved { .. })
    }
}

/// Counts for a batch of links
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Visits listings and appends their records to the data table
pub struct DetailExtractor {
    options: ExtractOptions,
    writer: ListingWriter,
    debug_dir: Option<PathBuf>,
}

impl DetailExtractor {
    /// `debug_dir` receives screenshots and markup of failed attempts when
    /// diagnostics are enabled in `options`
    pub fn new(
        options: ExtractOptions,
        writer: ListingWriter,
        debug_dir: impl Into<PathBuf>,
    ) -> Self {
        let debug_dir = options.save_debug.then(|| debug_dir.into());
        Self {
            options,
            writer,
            debug_dir,
        }
    }

    pub fn data_path(&self) -> &Path {
        self.writer.path()
    }

    /// Extracts every link in order, reusing `session`
    ///
    /// A link that exhausts its retries is logged and skipped. Only a
    /// failure to write the data table stops the batch.
    pub async fn run_batch(
        &mut self,
        session: &mut dyn PageSession,
        links: &[String],
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary {
            total: links.len(),
            ..BatchSummary::default()
        };

        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                let pause = self.random_pause();
                debug!("Pausing {:?} before next listing", pause);
                tokio::time::sleep(pause).await;
            }

            info!("[{}/{}] Processing: {}", i + 1, links.len(), link);
            if self.scrape_link(session, link).await?.is_saved() {
                summary.processed += 1;
            } else {
                summary.skipped += 1;
            }
        }

        info!(
            "Extraction finished. Processed: {}, skipped: {}, total: {}",
            summary.processed, summary.skipped, summary.total
        );
        Ok(summary)
    }

    /// Extracts one listing, retrying up to `options.retries` times
    pub async fn scrape_link(
        &mut self,
        session: &mut dyn PageSession,
        link: &str,
    ) -> Result<LinkOutcome> {
        let total_attempts = self.options.retries + 1;
        let mut index = 1;

        loop {
            let error = match self.attempt(session, link).await {
                Ok(record) => {
                    self.writer.append(&record)?;
                    info!("Saved listing {} (attempt {}/{})", link, index, total_attempts);
                    return Ok(LinkOutcome::Saved { attempts: index });
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            warn!("Attempt {}/{} failed for {}: {}", index, total_attempts, link, error);
            let debug_artifact = self.save_debug(session, link, index).await;

            if index >= total_attempts {
                error!("Giving up on {}: {}", link, error);
                return Ok(LinkOutcome::Failed {
                    last: ExtractionAttempt {
                        index,
                        last_failure: error.to_string(),
                        debug_artifact,
                    },
                });
            }

            tokio::time::sleep(self.options.backoff(index)).await;
            index += 1;
        }
    }

    async fn attempt(&self, session: &mut dyn PageSession, link: &str) -> Result<ListingRecord> {
        session.navigate(link, self.options.navigation_timeout()).await?;
        session
            .wait_for_any(READY_SELECTORS, self.options.ready_timeout())
            .await?;

        if self.options.humanize {
            if let Err(e) = session.humanize().await {
                debug!("Page interaction failed on {}: {}", link, e);
            }
        }

        let html = session.content().await?;
        let record = parse_listing(&html, link, &self.options);
        if !record.is_meaningful() {
            return Err(ScrapeError::EmptyRecord { url: link.to_string() });
        }
        Ok(record)
    }

    /// Writes `<name>_attempt<N>.png` and `.html`, returning the markup path
    async fn save_debug(
        &self,
        session: &mut dyn PageSession,
        link: &str,
        attempt: u32,
    ) -> Option<PathBuf> {
        let dir = self.debug_dir.as_ref()?;
        let stem = format!("{}_attempt{}", debug_name(link), attempt);

        match write_debug_artifacts(session, dir, &stem).await {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Could not save debug artifacts for {}: {}", link, e);
                None
            }
        }
    }

    fn random_pause(&self) -> Duration {
        let (min, max) = (self.options.pause_min_ms, self.options.pause_max_ms);
        let ms = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_millis(ms)
    }
}

async fn write_debug_artifacts(
    session: &mut dyn PageSession,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let png = dir.join(format!("{stem}.png"));
    let html = dir.join(format!("{stem}.html"));
    tokio::fs::write(&png, session.screenshot().await?).await?;
    tokio::fs::write(&html, session.content().await?).await?;
    info!("Debug saved: {}, {}", png.display(), html.display());
    Ok(html)
}

/// File-name form of a link: scheme dropped, separators replaced, truncated
pub fn debug_name(link: &str) -> String {
    let without_scheme = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);
    file_stem_safe(without_scheme)
        .chars()
        .take(DEBUG_NAME_MAX)
        .collect()
}
