//! Merging of harvested link tables

use crate::storage::read_link_table;
use crate::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Insertion-ordered set of links
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `link`, returning false if it was already present
    pub fn insert(&mut self, link: String) -> bool {
        if self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.order.push(link);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Deduplicates across all inputs combined, then applies `limit`
pub fn consolidate<I, S>(links: I, limit: Option<usize>) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = LinkSet::new();
    for link in links {
        let link = link.as_ref().trim();
        if !link.is_empty() {
            set.insert(link.to_string());
        }
    }

    let mut unique = set.into_vec();
    if let Some(limit) = limit {
        unique.truncate(limit);
    }
    unique
}

/// Reads every link table in `paths` and consolidates them
pub fn consolidate_tables<P: AsRef<Path>>(
    paths: &[P],
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let mut all = Vec::new();
    for path in paths {
        let links = read_link_table(path.as_ref())?;
        info!("Read {} links from {}", links.len(), path.as_ref().display());
        all.extend(links);
    }

    let total = all.len();
    let unique = consolidate(all, limit);
    info!(
        "Consolidated {} links from {} tables into {} unique{}",
        total,
        paths.len(),
        unique.len(),
        limit.map(|l| format!(" (limit {})", l)).unwrap_or_default()
    );
    Ok(unique)
}
