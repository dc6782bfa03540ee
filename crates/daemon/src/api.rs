use std::sync::Arc;

use archive_validator_core::api::{
    BeginTransactionResponse, EndTransactionRequest, ErrorBody, ModuleDefinition, ProcessRequest,
    ProcessResponse, ValidateRequest, ValidateResponse,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::service::{ProtocolAdapter, ServiceError};

#[derive(Clone)]
pub struct AppState {
    adapter: Arc<ProtocolAdapter>,
}

pub fn router(adapter: Arc<ProtocolAdapter>, max_request_bytes: usize) -> Router {
    let state = AppState { adapter };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/definition", get(definition))
        .route("/v1/transactions", post(begin_transaction))
        .route("/v1/transactions/end", post(end_transaction))
        .route("/v1/process", post(process))
        .route("/v1/validate", post(validate))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn definition(State(st): State<AppState>) -> Json<ModuleDefinition> {
    Json(st.adapter.module_definition().clone())
}

async fn begin_transaction(State(st): State<AppState>) -> Json<BeginTransactionResponse> {
    Json(BeginTransactionResponse {
        session_id: st.adapter.begin_transaction(),
    })
}

async fn process(
    State(st): State<AppState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    Ok(Json(st.adapter.process(&req).await?))
}

async fn validate(
    State(st): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let report = st.adapter.validate(&req).await?;
    Ok(Json(ValidateResponse { report }))
}

async fn end_transaction(
    State(st): State<AppState>,
    Json(req): Json<EndTransactionRequest>,
) -> Json<serde_json::Value> {
    if let Some(session_id) = req.session_id {
        st.adapter.end_transaction(&session_id).await;
    }
    Json(serde_json::json!({}))
}

#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self.0 {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if code.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        let body = Json(ErrorBody {
            error: self.0.to_string(),
        });
        (code, body).into_response()
    }
}
