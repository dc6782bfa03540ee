//! Protocol adapter: maps the multi-call front-end protocol onto the
//! two-call backend.
//!
//! Session mode runs `begin -> initialise -> upload -> report -> end`, keeping
//! archive, digest and report URL in the [`SessionStore`] between calls.
//! Direct mode does upload and report in one call and keeps no state.

use std::path::Path;
use std::sync::Arc;

use archive_validator_core::api::{
    AnyContent, ModuleDefinition, ProcessRequest, ProcessResponse, ValidateRequest,
};
use archive_validator_core::definition::{module_definition, OUTPUT_SESSION};
use archive_validator_core::report::{self, EchoedInputs, Report};
use archive_validator_core::request::{
    InitialiseRequest, RequestError, SessionStep, ValidationRequest,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::ArchiveStore;
use crate::backend::{BackendClient, BackendError};
use crate::session::{SessionError, SessionState, SessionStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    fn storage(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Storage { context, source }
    }
}

impl From<RequestError> for ServiceError {
    fn from(e: RequestError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

impl From<SessionError> for ServiceError {
    fn from(e: SessionError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

pub struct ProtocolAdapter {
    backend: Arc<dyn BackendClient>,
    sessions: SessionStore,
    archives: ArchiveStore,
    definition: ModuleDefinition,
}

impl ProtocolAdapter {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        archives: ArchiveStore,
        service_id: &str,
        service_version: &str,
    ) -> Self {
        Self {
            backend,
            sessions: SessionStore::new(),
            archives,
            definition: module_definition(service_id, service_version),
        }
    }

    pub fn module_definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Opens a session. No backend call.
    pub fn begin_transaction(&self) -> String {
        let session_id = self.sessions.create();
        info!(%session_id, "transaction started");
        session_id
    }

    /// `process` entry point: records archive and digest for the session.
    pub async fn process(&self, req: &ProcessRequest) -> Result<ProcessResponse, ServiceError> {
        let req = InitialiseRequest::from_request(req)?;
        self.initialise(&req.session_id, &req.archive, &req.digest)
            .await?;
        Ok(ProcessResponse {
            outputs: vec![AnyContent::string(OUTPUT_SESSION, req.session_id)],
            report: Report::empty(),
        })
    }

    /// Stores a fresh copy of the archive and the digest. Re-initialising
    /// replaces both and discards the earlier copy; once a report URL has
    /// been issued the session no longer accepts new input.
    pub async fn initialise(
        &self,
        session_id: &str,
        archive: &[u8],
        digest: &str,
    ) -> Result<(), ServiceError> {
        ensure_not_uploaded(session_id, self.sessions.get(session_id)?.state())?;

        let path = self
            .archives
            .persist(archive)
            .await
            .map_err(ServiceError::storage("Unable to write archive to file system"))?;

        let recorded = self.sessions.update(session_id, |s| {
            ensure_not_uploaded(session_id, s.state())?;
            s.digest = Some(digest.to_string());
            Ok::<_, ServiceError>(s.archive_path.replace(path.clone()))
        });

        match recorded {
            Ok(Ok(previous)) => {
                if let Some(previous) = previous {
                    self.archives.discard(&previous).await;
                }
                debug!(%session_id, path = %path.display(), "session initialised");
                Ok(())
            }
            Ok(Err(e)) => {
                self.archives.discard(&path).await;
                Err(e)
            }
            Err(e) => {
                self.archives.discard(&path).await;
                Err(e.into())
            }
        }
    }

    /// `validate` entry point.
    pub async fn validate(&self, req: &ValidateRequest) -> Result<Report, ServiceError> {
        match ValidationRequest::from_request(req)? {
            ValidationRequest::Direct { archive, digest } => {
                self.validate_direct(&archive, &digest).await
            }
            ValidationRequest::Session { session_id, step } => {
                debug!(%session_id, step = step.as_str(), "session step");
                match step {
                    SessionStep::Upload => self.invoke_upload(&session_id).await,
                    SessionStep::Report => self.invoke_report(&session_id).await,
                }
            }
        }
    }

    /// Uploads the session's archive. A returned report URL moves the session
    /// to UPLOADED; a rejection leaves it as it was so the step can be retried.
    pub async fn invoke_upload(&self, session_id: &str) -> Result<Report, ServiceError> {
        let (archive, digest) = self.session_archive(session_id).await?;
        let outcome = self.backend.upload(archive.clone(), &digest).await?;

        if let Some(url) = outcome.usable_report_url() {
            let url = url.to_string();
            if let Err(e) = self
                .sessions
                .update(session_id, |s| s.report_url = Some(url))
            {
                warn!(%session_id, error = %e, "session ended during upload");
            }
        } else {
            info!(%session_id, message = ?outcome.message, "upload did not yield a report URL");
        }

        Ok(report::build(
            Some(&outcome),
            None,
            &EchoedInputs {
                archive: Some(&archive),
                digest: Some(&digest),
                report_url: None,
            },
        ))
    }

    /// Reads the archive and digest recorded for a session. A concurrent
    /// re-initialise may discard the file between snapshot and read; the
    /// session is then looked up once more for the replacement.
    async fn session_archive(&self, session_id: &str) -> Result<(Vec<u8>, String), ServiceError> {
        let mut retried = false;
        loop {
            let session = self.sessions.get(session_id)?;
            let (Some(path), Some(digest)) = (session.archive_path, session.digest) else {
                return Err(ServiceError::invalid(format!(
                    "Session with ID '{session_id}' has not been initialised"
                )));
            };
            match self.archives.read(&path).await {
                Ok(archive) => return Ok((archive, digest)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if retried {
                        return Err(ServiceError::invalid(format!(
                            "Archive of session with ID '{session_id}' is no longer available"
                        )));
                    }
                    debug!(%session_id, path = %path.display(), "archive replaced during read");
                    retried = true;
                }
                Err(e) => {
                    return Err(ServiceError::storage("Unable to read archive from file system")(e))
                }
            }
        }
    }

    /// Fetches the backend report for the session. Before a successful upload
    /// there is nothing to fetch and the canned failure report is returned.
    pub async fn invoke_report(&self, session_id: &str) -> Result<Report, ServiceError> {
        let session = self.sessions.get(session_id)?;
        let Some(url) = session.report_url else {
            info!(%session_id, "no report URL recorded; returning failure report");
            return Ok(Report::no_report_available());
        };

        let outcome = self.backend.fetch_report(&url).await?;
        Ok(report::build(
            None,
            Some(&outcome),
            &EchoedInputs {
                report_url: Some(&url),
                ..Default::default()
            },
        ))
    }

    /// Drops the session and its archive copy. Unknown ids are ignored so
    /// duplicate end signals are harmless.
    pub async fn end_transaction(&self, session_id: &str) {
        match self.sessions.delete(session_id) {
            Some(session) => {
                if let Some(path) = session.archive_path {
                    self.archives.discard(&path).await;
                }
                info!(%session_id, "transaction ended");
            }
            None => debug!(%session_id, "end for unknown session ignored"),
        }
    }

    /// Single-call validation: upload, then fetch the report if the backend
    /// issued a URL. The archive copy lives only for the duration of the call.
    pub async fn validate_direct(&self, archive: &[u8], digest: &str) -> Result<Report, ServiceError> {
        let path = self
            .archives
            .persist(archive)
            .await
            .map_err(ServiceError::storage("Unable to write archive to file system"))?;
        let res = self.run_direct(&path, digest).await;
        self.archives.discard(&path).await;
        res
    }

    async fn run_direct(&self, path: &Path, digest: &str) -> Result<Report, ServiceError> {
        let archive = self
            .archives
            .read(path)
            .await
            .map_err(ServiceError::storage("Unable to read archive from file system"))?;

        let upload = self.backend.upload(archive.clone(), digest).await?;
        let validation = match upload.usable_report_url() {
            Some(url) => Some(self.backend.fetch_report(url).await?),
            None => None,
        };

        Ok(report::build(
            Some(&upload),
            validation.as_ref(),
            &EchoedInputs {
                archive: Some(&archive),
                digest: Some(digest),
                report_url: None,
            },
        ))
    }

    pub fn archive_root(&self) -> &Path {
        self.archives.root()
    }
}

fn ensure_not_uploaded(session_id: &str, state: SessionState) -> Result<(), ServiceError> {
    if state == SessionState::Uploaded {
        return Err(ServiceError::invalid(format!(
            "Session with ID '{session_id}' has already uploaded its archive"
        )));
    }
    Ok(())
}
