//! Router-level tests driven through `tower::ServiceExt::oneshot`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::TestHarness;
use vr_server::router::{build_router, build_static_router};

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = TestHarness::new();
    let resp = build_router(h.ctx.clone()).oneshot(get("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn request_id_is_generated() {
    let h = TestHarness::new();
    let resp = build_router(h.ctx.clone()).oneshot(get("/health")).await.unwrap();

    let id = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let h = TestHarness::new();
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "client-supplied-42")
        .body(Body::empty())
        .unwrap();
    let resp = build_router(h.ctx.clone()).oneshot(req).await.unwrap();

    assert_eq!(
        resp.headers()["x-request-id"].to_str().unwrap(),
        "client-supplied-42"
    );
}

#[tokio::test]
async fn validation_error_body_carries_request_id() {
    let h = TestHarness::new();
    let req = Request::builder()
        .uri("/video")
        .header("x-request-id", "abc")
        .body(Body::empty())
        .unwrap();
    let resp = build_router(h.ctx.clone()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["request_id"], "abc");
    assert_eq!(json["code"], "validation_error");
}

#[tokio::test]
async fn public_dir_is_served_at_root() {
    let h = TestHarness::new();
    std::fs::create_dir_all(h.public_dir()).unwrap();
    std::fs::write(h.public_dir().join("index.html"), "<html>player</html>").unwrap();

    let resp = build_router(h.ctx.clone()).oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"<html>player</html>");

    let resp = build_router(h.ctx.clone())
        .oneshot(get("/no-such-job/stream.m3u8"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_tools_lists_known_tools() {
    let h = TestHarness::new();
    let resp = build_router(h.ctx.clone())
        .oneshot(get("/admin/tools"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let tools: Vec<serde_json::Value> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, ["ffmpeg", "ffprobe"]);
}

#[tokio::test]
async fn static_router_serves_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();

    let resp = build_static_router(dir.path())
        .oneshot(get("/hello.txt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(body_bytes(resp).await, b"hi");

    let resp = build_static_router(dir.path())
        .oneshot(get("/video?url=http://x/a.mp4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
