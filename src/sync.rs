//! Mirroring of the output directory to a storage bucket

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Destination for uploaded files
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Upload the file at `local` as `object`
    async fn upload(&self, local: &Path, object: &str) -> Result<()>;

    /// Human-readable destination, for logs
    fn describe(&self, prefix: &str) -> String;
}

/// Google Cloud Storage bucket, written through the JSON upload API
pub struct GcsSink {
    client: Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl GcsSink {
    pub fn new(
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token,
        })
    }
}

#[async_trait]
impl RemoteSink for GcsSink {
    async fn upload(&self, local: &Path, object: &str) -> Result<()> {
        let body = tokio::fs::read(local)
            .await
            .with_context(|| format!("Failed to read {}", local.display()))?;

        let url = format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.bucket);
        let mut request = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object)])
            .header(reqwest::header::CONTENT_TYPE, content_type(local))
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Upload request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("Upload of {} returned status {}", object, response.status());
        }
        Ok(())
    }

    fn describe(&self, prefix: &str) -> String {
        format!("gs://{}/{}", self.bucket, prefix)
    }
}

/// Outcome of a directory sync
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Prefix for a run's files: `execucao_<YYYYmmdd_HHMMSS>`
pub fn run_prefix() -> String {
    format!("execucao_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Uploads every file under `root` to `<prefix>/<relative path>`
///
/// Failed uploads are logged and skipped. A missing `root` uploads nothing.
pub async fn sync_directory(sink: &dyn RemoteSink, root: &Path, prefix: &str) -> SyncReport {
    let mut report = SyncReport::default();

    if !root.exists() {
        warn!("Nothing to upload, {} does not exist", root.display());
        return report;
    }

    let files = list_files(root);

    info!("Uploading {} files to {}", files.len(), sink.describe(prefix));
    for file in files {
        let Ok(relative) = file.strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let object = if prefix.is_empty() {
            relative.clone()
        } else {
            format!("{}/{}", prefix.trim_end_matches('/'), relative)
        };

        match sink.upload(&file, &object).await {
            Ok(()) => {
                info!("[UPLOAD] {}", relative);
                report.uploaded += 1;
            }
            Err(e) => {
                warn!("[UPLOAD FAILED] {}: {:#}", relative, e);
                report.failed += 1;
            }
        }
    }

    info!("Upload finished: {} uploaded, {} failed", report.uploaded, report.failed);
    report
}

/// All regular files under `root`, sorted for a stable upload order
///
/// Symlinks are not followed. Unreadable entries are logged and skipped.
fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    files
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
