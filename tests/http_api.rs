use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use evigrade_lib::http_server::{router, AppState};
use evigrade_lib::EvidenceGrader;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "evigrade-test-boundary";

fn app() -> Router {
    router(AppState::new(EvidenceGrader::new(), 1000), 1024 * 1024)
}

const COHORT_PDF: &[u8] = include_bytes!("fixtures/cohort_study.pdf");

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    send_to(app(), req).await
}

async fn send_to(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn post_upload(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/process_pdf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn grade_single_object_reaches_high() {
    let paper = json!({
        "paper_id": "P1",
        "title": "Statins in older adults",
        "study_type": "systematic review",
        "methodology": "systematic review",
        "sample_size": 1500,
        "control_group": "yes",
        "randomization": "yes",
        "blinding": "double-blind",
        "follow_up": 24,
        "statistical_analysis": "comprehensive",
        "risk_of_bias": "low",
        "consistency": "high",
        "directness": "high",
        "precision": "high"
    });

    let (status, body) = send(post_json("/grade", &paper)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evidence_level"], "High");
    assert_eq!(body["scores"]["composite"], 31);
    assert_eq!(body["scores"]["study_design"], 8);
}

#[tokio::test]
async fn grade_empty_object_is_very_low() {
    let (status, body) = send(post_json("/grade", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evidence_level"], "Very Low");
    assert_eq!(body["scores"]["composite"], 0);
}

#[tokio::test]
async fn grade_batch_reports_failure_in_place() {
    let batch = json!([
        { "study_type": "cohort study", "sample_size": 250 },
        { "sample_size": "not-a-number" },
        { "study_type": "randomized controlled trial" }
    ]);

    let (status, body) = send(post_json("/grade", &batch)).await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["scores"]["composite"], 6);
    assert_eq!(items[1]["index"], 1);
    assert_eq!(items[1]["field"], "sample_size");
    assert!(items[1]["error"].as_str().unwrap().contains("sample_size"));
    assert_eq!(items[2]["scores"]["study_design"], 8);
}

#[tokio::test]
async fn grade_scalar_payload_is_rejected() {
    let (status, body) = send(post_json("/grade", &json!(42))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn grade_invalid_field_names_it() {
    let (status, body) = send(post_json("/grade", &json!({ "blinding": "triple" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "blinding");
}

#[tokio::test]
async fn grade_accepts_form_fields() {
    let req = Request::post("/grade")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "paper_id=F1&study_type=Randomized+Controlled+Trial&sample_size=120&blinding=single-blind",
        ))
        .unwrap();

    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::OK);
    // methodology stays unknown
    assert_eq!(body["scores"]["study_design"], 8);
    assert_eq!(body["scores"]["sample_size"], 1);
    assert_eq!(body["scores"]["blinding"], 1);
    assert_eq!(body["scores"]["composite"], 10);
}

#[tokio::test]
async fn grade_accepts_multipart_form_fields() {
    let mut body = String::new();
    for (name, value) in [("study_type", "systematic review"), ("sample_size", "1500")] {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    let req = Request::post("/grade")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scores"]["study_design"], 8);
    assert_eq!(body["scores"]["sample_size"], 2);
    assert_eq!(body["scores"]["composite"], 10);
}

#[tokio::test]
async fn extract_returns_record_only() {
    let payload = json!({ "text": "Outcomes after hip surgery\nA total of 120 patients were enrolled in this cohort study." });
    let (status, body) = send(post_json("/extract", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Outcomes after hip surgery");
    assert_eq!(body["study_type"], "cohort study");
    assert_eq!(body["sample_size"], 120);
    assert!(body["paper_id"].as_str().unwrap().starts_with("PDF_"));
    assert!(body.get("evidence_level").is_none());
}

#[tokio::test]
async fn analyze_extracts_and_grades() {
    let payload = json!({ "text": "A total of 120 patients were enrolled in this cohort study." });
    let (status, body) = send(post_json("/analyze", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample_size"], 120);
    assert_eq!(body["study_type"], "cohort study");
    assert_eq!(body["scores"]["sample_size"], 1);
    assert!(body["evidence_level"].is_string());
    assert!(body.get("raw_text").is_none());
}

#[tokio::test]
async fn health_reports_version() {
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn process_pdf_requires_pdf_extension() {
    let (status, body) = send(post_upload("file", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File must be a PDF");
}

#[tokio::test]
async fn process_pdf_requires_file_field() {
    let (status, body) = send(post_upload("document", "paper.pdf", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn process_pdf_rejects_empty_file_name() {
    let (status, body) = send(post_upload("file", "", b"%PDF-1.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");
}

#[tokio::test]
async fn process_pdf_undecodable_bytes() {
    let (status, body) = send(post_upload("file", "paper.PDF", b"this is not a pdf")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn process_pdf_extracts_and_grades_upload() {
    let (status, body) = send(post_upload("file", "cohort_study.pdf", COHORT_PDF)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample_size"], 120);
    assert_eq!(body["study_type"], "cohort study");
    assert_eq!(body["follow_up"], 18);
    assert_eq!(body["follow_up_unit"], "months");
    assert!(body["paper_id"].as_str().unwrap().starts_with("PDF_"));
    assert!(body["evidence_level"].is_string());
    assert_eq!(body["scores"]["study_design"], 5);
    assert!(body["raw_text"].as_str().unwrap().contains("cohort"));
}

#[tokio::test]
async fn process_pdf_trims_raw_text_to_preview() {
    let app = router(AppState::new(EvidenceGrader::new(), 12), 1024 * 1024);
    let (status, body) = send_to(app, post_upload("file", "cohort_study.pdf", COHORT_PDF)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw_text"].as_str().unwrap().chars().count(), 12);
    assert_eq!(body["sample_size"], 120);
}
