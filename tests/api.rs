mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use provenance_core::api::{self, AppState};
use provenance_core::detector::Detector;
use provenance_core::fingerprint::Fingerprinter;
use provenance_core::index::FingerprintIndex;
use provenance_core::model_client::ModelScorer;
use provenance_core::policy::ScoringPolicy;

const BOUNDARY: &str = "X-SCAN-BOUNDARY";

fn router(model: Arc<dyn ModelScorer>, max_upload_bytes: usize) -> axum::Router {
    let detector = Detector::new(
        Arc::new(FingerprintIndex::empty()),
        Fingerprinter::default(),
        model,
        ScoringPolicy::default(),
    );
    api::app(Arc::new(AppState {
        detector: Arc::new(detector),
        max_upload_bytes,
    }))
}

fn multipart_body(field: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn scan_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/images/scan")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router(Arc::new(common::FixedModel(0.0)), 1024);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/images/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "\"All OK\"");
}

#[tokio::test]
async fn scan_returns_fused_report() {
    let app = router(Arc::new(common::FixedModel(30.0)), 5 * 1024 * 1024);
    let body = multipart_body("image", "image/png", &common::left_right_png());

    let response = app.oneshot(scan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    // 空参考库 -> 视觉 50；PNG 无元数据 -> 20
    // 0.55*30 + 0.30*20 + 0.15*50 = 30
    assert_eq!(json["final_score"], 30);
    assert_eq!(json["verdict"], "Likely Real");
    assert_eq!(json["breakdown"]["model"], 30);
    assert_eq!(json["breakdown"]["metadata"], 20);
    assert_eq!(json["breakdown"]["web"], 50);
    assert_eq!(json["evidence"][0], "Metadata appears stripped");
    assert!(json["sha256"].as_str().is_some());
    assert!(json["scanned_at"].as_str().is_some());
}

#[tokio::test]
async fn missing_image_field_is_bad_request() {
    let app = router(Arc::new(common::FixedModel(0.0)), 1024 * 1024);
    let body = multipart_body("document", "image/png", b"whatever");

    let response = app.oneshot(scan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "No Image Uploaded");
}

#[tokio::test]
async fn unsupported_type_is_rejected() {
    let app = router(Arc::new(common::FixedModel(0.0)), 1024 * 1024);
    let body = multipart_body("image", "image/gif", b"GIF89a");

    let response = app.oneshot(scan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = router(Arc::new(common::FixedModel(0.0)), 16);
    let body = multipart_body("image", "image/png", &common::left_right_png());

    let response = app.oneshot(scan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn internal_failures_are_generic() {
    let app = router(Arc::new(common::FailingModel), 1024 * 1024);
    let body = multipart_body("image", "image/png", &common::left_right_png());

    let response = app.oneshot(scan_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "System failure");
}
