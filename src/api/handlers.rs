use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::certificate::{self, CertificateInput, Fingerprint};
use crate::error::{CtError, Result};
use crate::verification::{FailureKind, Verdict, VerificationReport, VerificationRequest};

/// Body of `POST /add-certificate`. A supplied fingerprint must match the
/// certificate; unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCertificateRequest {
    pub domain: String,
    pub certificate: CertificateInput,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl AddCertificateRequest {
    fn check_fingerprint(&self) -> Result<()> {
        let Some(claimed) = &self.fingerprint else {
            return Ok(());
        };
        let claimed = Fingerprint::parse(claimed)?;
        let actual = certificate::fingerprint(&self.certificate)?;
        if claimed != actual {
            return Err(CtError::InvalidFingerprint(format!(
                "{} does not match certificate fingerprint {}",
                claimed.display_form(),
                actual.display_form()
            )));
        }
        Ok(())
    }
}

fn error_body(err: &CtError) -> Json<Value> {
    Json(json!({ "error": err.to_string() }))
}

/// Internal failures are 500, fetch failures 502, other errors 400. Every
/// other verdict is a successful check.
fn report_status(report: &VerificationReport) -> StatusCode {
    match (report.verdict, report.failure.as_ref().map(|f| f.kind)) {
        (Verdict::Error, Some(FailureKind::Internal)) => StatusCode::INTERNAL_SERVER_ERROR,
        (Verdict::Error, Some(FailureKind::Fetch)) => StatusCode::BAD_GATEWAY,
        (Verdict::Error, _) => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    }
}

pub async fn ct_check(
    State(state): State<AppState>,
    Json(request): Json<VerificationRequest>,
) -> (StatusCode, Json<Value>) {
    let report = state.service.verify(&request).await;

    let status = report_status(&report);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Verification failed internally for {}: {}", report.domain, report.message);
    }

    match serde_json::to_value(&report) {
        Ok(body) => (status, Json(body)),
        Err(e) => {
            error!("Failed to serialize report for {}: {}", report.domain, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to serialize report" })),
            )
        }
    }
}

pub async fn add_certificate(
    State(state): State<AppState>,
    Json(record): Json<AddCertificateRequest>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = record.check_fingerprint() {
        warn!("Rejected certificate for {}: {}", record.domain, e);
        return (StatusCode::BAD_REQUEST, error_body(&e));
    }

    match state
        .service
        .store()
        .append(&record.domain, &record.certificate)
        .await
    {
        Ok(entry) => {
            info!("Certificate added via API for {}", entry.domain);
            match serde_json::to_value(&entry) {
                Ok(body) => (StatusCode::CREATED, Json(body)),
                Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))),
            }
        }
        Err(e) if e.is_internal() => {
            error!("Append failed, service bug: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&e))
        }
        Err(e) => {
            warn!("Rejected certificate for {}: {}", record.domain, e);
            (StatusCode::BAD_REQUEST, error_body(&e))
        }
    }
}

pub async fn merkle_root(State(state): State<AppState>) -> Json<Value> {
    let summary = state.service.store().current_root().await;
    Json(json!({
        "root": summary.root,
        "entryCount": summary.entry_count,
        "domainCount": summary.domain_count,
        "logId": state.service.store().log_id(),
    }))
}

pub async fn list_logs(State(state): State<AppState>) -> Json<Value> {
    let logs = state.service.store().list_all().await;
    Json(json!({ "domains": logs }))
}

pub async fn list_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> (StatusCode, Json<Value>) {
    match crate::domain::resolve_domain(&domain) {
        Ok(resolved) => {
            let entries = state.service.store().list_domain(&resolved).await;
            (
                StatusCode::OK,
                Json(json!({ "domain": resolved, "entries": entries })),
            )
        }
        Err(e) => (StatusCode::BAD_REQUEST, error_body(&e)),
    }
}

pub async fn proof(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> (StatusCode, Json<Value>) {
    let view = state.service.store().view().await;
    let snapshot = view.snapshot();

    match view.prove_inclusion_at(index, snapshot.size) {
        Ok(proof) => (
            StatusCode::OK,
            Json(json!({
                "proof": proof,
                "root": snapshot.root,
                "treeSize": snapshot.size,
            })),
        ),
        Err(e @ CtError::IndexOutOfRange { .. }) => (StatusCode::NOT_FOUND, error_body(&e)),
        Err(e) => {
            error!("Proof generation failed for index {}: {}", index, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&e))
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "ct-service",
        "entries": state.service.store().len().await,
        "timestamp": chrono::Utc::now()
    }))
}
