//! CSV persistence for link tables and the listing data table

use crate::models::{ListingRecord, LISTING_COLUMNS};
use crate::Result;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header of the single-column link tables
pub const LINK_COLUMN: &str = "link_anuncio";

/// Column names accepted when reading a link table, in priority order
const LINK_COLUMN_ALIASES: &[&str] = &[LINK_COLUMN, "link", "url"];

/// Writes `links` to `<dir>/<target>_<timestamp>_<count>_links.csv`
pub fn write_link_table(dir: &Path, target_id: &str, links: &[String]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "{}_{}_{}_links.csv",
        file_stem_safe(target_id),
        timestamp,
        links.len()
    ));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([LINK_COLUMN])?;
    for link in links {
        writer.write_record([link])?;
    }
    writer.flush()?;

    Ok(path)
}

/// Reads the link column of a link table
///
/// The column is the first header matching a known alias, or the first
/// column when none match. Blank values are dropped and values are trimmed.
pub fn read_link_table(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = LINK_COLUMN_ALIASES
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        .unwrap_or(0);

    let mut links = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(column).map(str::trim) {
            if !value.is_empty() {
                links.push(value.to_string());
            }
        }
    }
    Ok(links)
}

/// Append-only writer for the listing data table
///
/// Creates the file with a header when it is missing or empty, otherwise
/// appends. Every row is flushed as soon as it is written.
pub struct ListingWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ListingWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if needs_header {
            writer.write_record(LISTING_COLUMNS)?;
            writer.flush()?;
            debug!("Created data table {}", path.display());
        }

        Ok(Self { path, writer })
    }

    pub fn append(&mut self, record: &ListingRecord) -> Result<()> {
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default data table path for a run: `<dir>/<YYYYmmdd_HHMMSS>_vivareal.csv`
pub fn data_table_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}_vivareal.csv", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Replaces characters that do not belong in a file name
pub(crate) fn file_stem_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '&' | '=' | ':' | '#' | '*' | '"' | '<' | '>' | '|' | ' ' => '_',
            c => c,
        })
        .collect()
}
