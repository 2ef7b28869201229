mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{app, app_with, multipart_body, png, Part, BOUNDARY};

async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn scores(report: &Value) -> Vec<f64> {
    report["detections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["score"].as_f64().unwrap())
        .collect()
}

#[tokio::test]
async fn config_exposes_slider_and_classes() {
    let (status, body) = get_json(app(), "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "stub");
    assert!((body["threshold"]["default"].as_f64().unwrap() - 0.25).abs() < 1e-6);
    assert!((body["threshold"]["min"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    assert_eq!(body["class_names"][0], "glioma");
    assert_eq!(body["accepted_formats"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn tumors_lists_all_four_classes() {
    let (status, body) = get_json(app(), "/api/tumors").await;
    assert_eq!(status, StatusCode::OK);
    let tumors = body["tumors"].as_array().unwrap();
    let classes: Vec<_> = tumors.iter().map(|t| t["class"].as_str().unwrap()).collect();
    assert_eq!(classes, ["Glioma", "Meningioma", "Pituitary", "General"]);
}

#[tokio::test]
async fn health_reports_model() {
    let (status, body) = get_json(app(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["model"], "stub");
}

#[tokio::test]
async fn detect_filters_by_threshold_and_describes_findings() {
    let image = png(64, 64);
    let (status, _, body) = post_multipart(
        app(),
        "/api/detect",
        &[Part::Text("threshold", "0.25"), Part::File("file", "scan.png", &image)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    let report = &body["results"][0];
    assert_eq!(report["file_name"], "scan.png");
    assert_eq!(report["width"], 64);
    let s = scores(report);
    assert_eq!(s.len(), 3);
    assert!(s.iter().all(|&v| v >= 0.25));

    let labels: Vec<_> = report["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, ["glioma", "pituitary"]);
    assert!(report["findings"][0]["description"].as_str().unwrap().starts_with("Glioma is"));
    assert_eq!(report["findings"][0]["title"], "Glioma");
    assert_eq!(report["findings"][0]["known"], true);
    assert_eq!(report["summary"], "2 glioma, 1 pituitary");
    assert!(report["annotated_image"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
    let name = report["download_name"].as_str().unwrap();
    assert!(name.starts_with("tumor_result_") && name.ends_with(".jpg"));
}

#[tokio::test]
async fn raising_threshold_never_adds_detections() {
    let image = png(64, 64);
    let mut last = usize::MAX;
    for t in ["0.0", "0.1", "0.25", "0.5", "0.9", "1.0"] {
        let (status, _, body) = post_multipart(
            app(),
            "/api/detect",
            &[Part::Text("threshold", t), Part::File("file", "scan.png", &image)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let n = scores(&json(&body)["results"][0]).len();
        assert!(n <= last, "count grew at threshold {t}");
        last = n;
    }
    assert_eq!(last, 0);
}

#[tokio::test]
async fn missing_threshold_uses_slider_default() {
    let image = png(32, 32);
    let (status, _, body) = post_multipart(app(), "/api/detect", &[Part::File("file", "a.png", &image)]).await;
    assert_eq!(status, StatusCode::OK);
    let report = &json(&body)["results"][0];
    assert!((report["threshold"].as_f64().unwrap() - 0.25).abs() < 1e-6);
}

#[tokio::test]
async fn no_detections_is_not_an_error() {
    let image = png(32, 32);
    let (status, _, body) = post_multipart(
        app_with(Vec::new()),
        "/api/detect",
        &[Part::File("file", "clean.png", &image)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = &json(&body)["results"][0];
    assert!(report["detections"].as_array().unwrap().is_empty());
    assert!(report["findings"].as_array().unwrap().is_empty());
    assert_eq!(report["summary"], "");
}

#[tokio::test]
async fn corrupt_file_is_reported_without_failing_the_batch() {
    let image = png(32, 32);
    let (status, _, body) = post_multipart(
        app(),
        "/api/detect",
        &[
            Part::File("file", "broken.jpg", b"\xff\xd8\xff\xe0 not really a jpeg"),
            Part::File("file", "ok.png", &image),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["file_name"], "broken.jpg");
    assert!(results[0]["error"].as_str().unwrap().contains("decode"));
    assert_eq!(results[1]["file_name"], "ok.png");
    assert!(results[1].get("error").is_none());
}

#[tokio::test]
async fn out_of_range_threshold_is_rejected() {
    let image = png(16, 16);
    let (status, _, body) = post_multipart(
        app(),
        "/api/detect",
        &[Part::Text("threshold", "1.5"), Part::File("file", "a.png", &image)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("threshold"));
}

#[tokio::test]
async fn non_numeric_threshold_is_rejected() {
    let image = png(16, 16);
    let (status, _, _) = post_multipart(
        app(),
        "/api/detect",
        &[Part::Text("threshold", "high"), Part::File("file", "a.png", &image)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_without_file_is_rejected() {
    let (status, _, body) = post_multipart(app(), "/api/detect", &[Part::Text("threshold", "0.5")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("no image"));
}

#[tokio::test]
async fn annotate_returns_jpeg_attachment() {
    let image = png(48, 48);
    let (status, headers, body) = post_multipart(
        app(),
        "/api/annotate",
        &[Part::Text("threshold", "0.5"), Part::File("file", "scan.png", &image)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"tumor_result_"));
    assert_eq!(headers["x-detection-count"], "2");
    assert_eq!(&body[..2], &[0xff, 0xd8]);
}

#[tokio::test]
async fn annotate_rejects_unsupported_format() {
    let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
    let (status, _, body) = post_multipart(app(), "/api/annotate", &[Part::File("file", "a.gif", gif)]).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json(&body)["error"].as_str().unwrap().contains("unsupported"));
}

#[tokio::test]
async fn annotate_reports_corrupt_image() {
    let (status, _, _) = post_multipart(app(), "/api/annotate", &[Part::File("file", "x.png", b"garbage")]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
