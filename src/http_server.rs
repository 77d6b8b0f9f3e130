//! HTTP API for paper grading
//!
//! Thin axum layer over the extractor and grading engine:
//! - POST /grade        - Grade a JSON paper object, a JSON list, or form fields
//!                        (urlencoded or multipart)
//! - POST /process_pdf  - Upload a PDF (multipart field `file`), extract and grade
//! - POST /extract      - Extract attributes from `{"text": ...}`
//! - POST /analyze      - Extract then grade `{"text": ...}`
//! - GET  /health       - Liveness and version

use crate::error::GradeError;
use crate::grading::{EvidenceGrader, GradeResponse, GradingResult};
use crate::papers::{extract, extract_text_from_pdf, PaperRecord};
use crate::utils::{char_preview, has_pdf_extension};
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub grader: Arc<EvidenceGrader>,
    pub preview_chars: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(grader: EvidenceGrader, preview_chars: usize) -> Self {
        Self {
            grader: Arc::new(grader),
            preview_chars,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

pub struct AppError {
    status: StatusCode,
    message: String,
    field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(field) = self.field {
            body["field"] = Value::String(field);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<GradeError> for AppError {
    fn from(e: GradeError) -> Self {
        let status = match &e {
            GradeError::Validation { .. } | GradeError::DocumentDecode(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GradeError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            GradeError::Config(_) | GradeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            field: e.field().map(str::to_string),
            message: e.to_string(),
        }
    }
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: msg.into(),
        field: None,
    }
}

fn internal(msg: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: msg.into(),
        field: None,
    }
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Extracted record with its grade; `raw_text` carries a preview for uploads
#[derive(Serialize)]
pub struct PaperReport {
    #[serde(flatten)]
    pub record: PaperRecord,
    #[serde(flatten)]
    pub grading: GradingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

// ============================================================================
// Handlers
// ============================================================================

// POST /grade
async fn grade_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GradeResponse>, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let response = if content_type.starts_with("application/json") {
        let Json(payload) = Json::<Value>::from_request(request, &state)
            .await
            .map_err(|e| bad_request(format!("Invalid JSON: {}", e.body_text())))?;
        state.grader.grade_payload(&payload)?
    } else {
        let fields = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &state)
                .await
                .map_err(|e| bad_request(format!("Invalid multipart body: {}", e.body_text())))?;
            multipart_fields(multipart).await?
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &state)
                .await
                .map_err(|e| bad_request(format!("Invalid form submission: {}", e.body_text())))?;
            fields
        };
        let record = PaperRecord::from_form(&fields)?;
        GradeResponse::Single(state.grader.grade(&record))
    };

    match &response {
        GradeResponse::Single(result) => {
            tracing::info!(level = %result.evidence_level, composite = result.composite(), "[POST /grade] graded paper");
        }
        GradeResponse::Batch(items) => {
            let graded = items.iter().filter(|item| item.is_graded()).count();
            tracing::info!(total = items.len(), graded, "[POST /grade] graded batch");
        }
    }

    Ok(Json(response))
}

/// Named text fields of a multipart form. File parts are skipped.
async fn multipart_fields(mut multipart: Multipart) -> Result<HashMap<String, String>, AppError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| bad_request(format!("Invalid form field '{}': {}", name, e)))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

// POST /process_pdf
async fn process_pdf_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PaperReport>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read upload: {}", e)))?;
            upload = Some((file_name, data));
            break;
        }
    }

    let (file_name, data) = upload.ok_or_else(|| bad_request("No file provided"))?;
    if file_name.is_empty() {
        return Err(bad_request("No file selected"));
    }
    if !has_pdf_extension(&file_name) {
        return Err(bad_request("File must be a PDF"));
    }

    let size = data.len();
    let text = tokio::task::spawn_blocking(move || extract_text_from_pdf(&data))
        .await
        .map_err(|e| internal(format!("PDF worker failed: {}", e)))?
        .inspect_err(|e| tracing::warn!(file = %file_name, error = %e, "[POST /process_pdf] decode failed"))?;

    let record = extract(&text);
    let grading = state.grader.grade(&record);

    tracing::info!(
        file = %file_name,
        bytes = size,
        paper_id = %record.paper_id,
        level = %grading.evidence_level,
        "[POST /process_pdf] graded upload"
    );

    Ok(Json(PaperReport {
        raw_text: Some(char_preview(&text, state.preview_chars).to_string()),
        record,
        grading,
    }))
}

// POST /extract
async fn extract_handler(Json(req): Json<TextRequest>) -> Json<PaperRecord> {
    Json(extract(&req.text))
}

// POST /analyze
async fn analyze_handler(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Json<PaperReport> {
    let record = extract(&req.text);
    let grading = state.grader.grade(&record);
    Json(PaperReport {
        record,
        grading,
        raw_text: None,
    })
}

// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/grade", post(grade_handler))
        .route("/process_pdf", post(process_pdf_handler))
        .route("/extract", post(extract_handler))
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, bind_addr: &str, max_body_bytes: usize) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, router(state, max_body_bytes)).await
}
