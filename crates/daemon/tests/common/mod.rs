#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use archive_validator_core::model::{UploadOutcome, ValidationOutcome};
use archive_validator_daemon::archive::ArchiveStore;
use archive_validator_daemon::backend::{BackendClient, BackendError};
use archive_validator_daemon::service::ProtocolAdapter;
use async_trait::async_trait;

/// Scripted backend that records every call it receives.
#[derive(Default)]
pub struct FakeBackend {
    /// `None` makes the call fail like an unreachable backend.
    pub upload_reply: Mutex<Option<UploadOutcome>>,
    pub report_reply: Mutex<Option<ValidationOutcome>>,
    pub uploads: Mutex<Vec<(Vec<u8>, String)>>,
    pub fetches: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn accepting(report_url: &str, report: ValidationOutcome) -> Self {
        let backend = Self::default();
        *backend.upload_reply.lock().unwrap() = Some(UploadOutcome {
            report_url: Some(report_url.to_string()),
            digest_echo: Some("echo".into()),
            message: None,
        });
        *backend.report_reply.lock().unwrap() = Some(report);
        backend
    }

    pub fn rejecting(message: &str) -> Self {
        let backend = Self::default();
        *backend.upload_reply.lock().unwrap() = Some(UploadOutcome {
            message: Some(message.to_string()),
            ..Default::default()
        });
        backend
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

fn unavailable(url: &str) -> BackendError {
    BackendError::Decode {
        url: url.to_string(),
        source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn upload(&self, archive: Vec<u8>, digest: &str) -> Result<UploadOutcome, BackendError> {
        self.uploads
            .lock()
            .unwrap()
            .push((archive, digest.to_string()));
        self.upload_reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("http://backend/upload"))
    }

    async fn fetch_report(&self, url: &str) -> Result<ValidationOutcome, BackendError> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.report_reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable(url))
    }
}

pub fn adapter(backend: Arc<FakeBackend>, dir: &tempfile::TempDir) -> ProtocolAdapter {
    ProtocolAdapter::new(
        backend,
        ArchiveStore::new(dir.path().join("archives")),
        "eark-validator",
        "1.0.0",
    )
}

pub fn archive_files(adapter: &ProtocolAdapter) -> usize {
    std::fs::read_dir(adapter.archive_root())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
