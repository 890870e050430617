//! End-to-end run orchestration
//!
//! A run opens one browser session, uses it for every phase and closes it
//! on every exit path.

use crate::config::Config;
use crate::scrapers::consolidate::consolidate_tables;
use crate::scrapers::extractor::{BatchSummary, DetailExtractor, LinkOutcome};
use crate::scrapers::harvester::LinkHarvester;
use crate::scrapers::traits::{PageSession, SessionFactory};
use crate::storage::{data_table_path, ListingWriter};
use crate::{Result, ScrapeError};
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a run should do
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Harvest, consolidate and extract
    Full,
    /// Harvest only
    LinksOnly,
    /// Extract the links listed in existing link tables
    FromTables(Vec<PathBuf>),
    /// Extract a single listing
    Single(String),
}

/// Files and counts produced by a run
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub link_tables: Vec<PathBuf>,
    pub data_table: Option<PathBuf>,
    pub summary: Option<BatchSummary>,
}

pub struct Pipeline<F: SessionFactory> {
    config: Config,
    factory: F,
}

impl<F: SessionFactory> Pipeline<F> {
    pub fn new(config: Config, factory: F) -> Self {
        Self { config, factory }
    }

    /// Runs `mode` inside a single browser session
    ///
    /// `Ok(None)` means the run produced nothing usable, e.g. every target
    /// failed to harvest.
    pub async fn run(&self, mode: RunMode) -> Result<Option<RunOutput>> {
        let mut session = self.factory.open().await?;

        let result = self.run_with_session(session.as_mut(), mode).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        result
    }

    async fn run_with_session(
        &self,
        session: &mut dyn PageSession,
        mode: RunMode,
    ) -> Result<Option<RunOutput>> {
        match mode {
            RunMode::Full => {
                let link_tables = self.harvest_all(session).await?;
                if link_tables.is_empty() {
                    error!("No links captured, stopping the pipeline");
                    return Ok(None);
                }
                self.extract_tables(session, link_tables).await.map(Some)
            }
            RunMode::LinksOnly => {
                let link_tables = self.harvest_all(session).await?;
                if link_tables.is_empty() {
                    return Ok(None);
                }
                Ok(Some(RunOutput {
                    link_tables,
                    ..RunOutput::default()
                }))
            }
            RunMode::FromTables(link_tables) => {
                self.extract_tables(session, link_tables).await.map(Some)
            }
            RunMode::Single(link) => {
                let path = self
                    .config
                    .data_dir()
                    .join(format!("{}_vivareal_single.csv", Local::now().format("%Y%m%d")));
                let mut extractor = self.extractor(path)?;
                let outcome = extractor.scrape_link(session, &link).await?;
                let saved = outcome.is_saved();
                if let LinkOutcome::Failed { last } = &outcome {
                    error!(
                        "Failed to extract {} after {} attempts: {}",
                        link, last.index, last.last_failure
                    );
                }
                Ok(Some(RunOutput {
                    link_tables: Vec::new(),
                    data_table: Some(extractor.data_path().to_path_buf()),
                    summary: Some(BatchSummary {
                        processed: usize::from(saved),
                        skipped: usize::from(!saved),
                        total: 1,
                    }),
                }))
            }
        }
    }

    /// Harvests every configured target, skipping targets that fail
    async fn harvest_all(&self, session: &mut dyn PageSession) -> Result<Vec<PathBuf>> {
        let targets = self.config.search_targets()?;
        let harvester = LinkHarvester::new(self.config.harvest.clone(), self.config.links_dir());

        info!(
            "Capturing links from {} pages for {} targets",
            self.config.pages,
            targets.len()
        );

        let mut tables = Vec::new();
        for target in &targets {
            match harvester.harvest(session, target, self.config.pages).await {
                Ok(Some(path)) => tables.push(path),
                Ok(None) => {}
                Err(e @ (ScrapeError::Io(_) | ScrapeError::Csv(_))) => return Err(e),
                Err(e) => error!("Harvest failed for {}, no links kept: {}", target.id, e),
            }
        }
        Ok(tables)
    }

    async fn extract_tables(
        &self,
        session: &mut dyn PageSession,
        link_tables: Vec<PathBuf>,
    ) -> Result<RunOutput> {
        let links = consolidate_tables(&link_tables, self.config.links_limit)?;

        let mut extractor = self.extractor(data_table_path(&self.config.data_dir()))?;
        info!("Extracting {} listings into {}", links.len(), extractor.data_path().display());
        let summary = extractor.run_batch(session, &links).await?;

        Ok(RunOutput {
            link_tables,
            data_table: Some(extractor.data_path().to_path_buf()),
            summary: Some(summary),
        })
    }

    fn extractor(&self, data_path: PathBuf) -> Result<DetailExtractor> {
        let writer = ListingWriter::open(data_path)?;
        Ok(DetailExtractor::new(
            self.config.extract.clone(),
            writer,
            self.config.debug_dir(),
        ))
    }
}
