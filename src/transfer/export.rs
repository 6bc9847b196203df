//! Remote export dispatcher
//!
//! Packages a filtered archive and posts it to another server's ingest
//! endpoint. The transfer only counts as successful when the remote reports
//! success for exactly as many records as were sent.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::filter::CategoryFilter;
use super::packager::{self, Selection};
use super::{TransferError, TransferResponse};
use crate::store::{RecordStore, StoreError};

/// Destination half of an `/export` query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportTarget {
    pub to: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub to: String,
    pub password: String,
    pub filter: CategoryFilter,
}

impl ExportRequest {
    pub fn new(target: ExportTarget, filter: CategoryFilter) -> Self {
        Self {
            to: target.to,
            password: target.password,
            filter,
        }
    }
}

/// Pushes archives to other servers
#[derive(Clone)]
pub struct RemoteExporter {
    client: reqwest::Client,
}

impl RemoteExporter {
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Package, send and verify. Returns the acknowledged record count.
    ///
    /// `transfer_lock` guards the temporary archive path and is released as
    /// soon as the archive has been read back, before anything is sent.
    pub async fn export(
        &self,
        store: Arc<RecordStore>,
        temp_path: PathBuf,
        transfer_lock: &Mutex<()>,
        request: ExportRequest,
    ) -> Result<usize, TransferError> {
        if request.to.trim().is_empty() {
            return Err(TransferError::Transport("no destination given".to_string()));
        }

        let selection = Selection::Filtered(request.filter.clone());
        let guard = transfer_lock.lock().await;
        let task_path = temp_path.clone();
        let packaged = tokio::task::spawn_blocking(move || {
            let packaged = packager::package(&store, &selection, &task_path)?;
            let payload = std::fs::read(packaged.path()).map_err(|e| TransferError::Filesystem {
                written: packaged.count,
                source: StoreError::io(&task_path, e),
            })?;
            packaged.archive.remove();
            Ok::<_, TransferError>((payload, packaged.count))
        })
        .await;
        drop(guard);
        let (payload, sent) = packaged.map_err(|e| {
            error!(error = %e, "Packaging task failed");
            TransferError::task_failed(&temp_path, e)
        })??;

        let url = destination_url(&request.to);
        info!(url = %url, records = sent, bytes = payload.len(), "Exporting archive");

        let ack = self.send(&url, &request.password, payload).await?;
        let result = verify_ack(sent, ack);
        match &result {
            Ok(count) => info!(url = %url, count, "Export acknowledged"),
            Err(e) => warn!(url = %url, error = %e, "Export not acknowledged"),
        }
        result
    }

    async fn send(
        &self,
        url: &str,
        password: &str,
        payload: Vec<u8>,
    ) -> Result<TransferResponse, TransferError> {
        let part = reqwest::multipart::Part::bytes(payload)
            .file_name("export.zip")
            .mime_str("application/zip")
            .map_err(|e| TransferError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("upload", part);

        let response = self
            .client
            .post(url)
            .query(&[("password", password)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransferError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json::<TransferResponse>()
            .await
            .map_err(|e| TransferError::Transport(format!("invalid response: {}", e)))
    }
}

/// A remote success counts only if every sent record was received.
pub fn verify_ack(sent: usize, ack: TransferResponse) -> Result<usize, TransferError> {
    if ack.success && ack.count == sent as i64 {
        Ok(sent)
    } else {
        Err(TransferError::TransferMismatch {
            sent,
            received: ack.count,
        })
    }
}

fn destination_url(to: &str) -> String {
    let to = to.trim();
    if to.starts_with("http://") || to.starts_with("https://") {
        to.to_string()
    } else {
        format!("http://{}", to)
    }
}
