// shared helpers, not every test file uses all of them
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde_json::json;
use tokio::sync::oneshot;
use tower::ServiceExt;

use cinemahub::{
    AppConfig, CatalogEntry, DynCatalogRepository, InMemoryCatalog,
    server::{ApplicationServer, services::AppServices},
};

pub const MASTER_PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:6\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\",IV=0x00000000000000000000000000000001\n\
#EXTINF:6.0,\n\
segment001.ts\n\
#EXTINF:6.0,\n\
https://other-cdn.com/v2/segment002.ts\n\
#EXT-X-ENDLIST\n";

pub const SEGMENT_LEN: usize = 2000;

/// a tiny origin on loopback that behaves like the cdns the relay talks to
pub async fn spawn_origin() -> String {
    let app = Router::new()
        .route("/path/to/index.m3u8", get(playlist))
        .route("/path/to/octet.m3u8", get(octet_playlist))
        .route("/path/to/fake.m3u8", get(fake_playlist))
        .route("/path/to/seg.ts", get(segment))
        .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
        .route("/redirect", get(|| async { Redirect::temporary("/path/to/index.m3u8") }))
        .route("/slow", get(slow))
        .route("/echo", get(echo));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback origin");
    let addr = listener.local_addr().expect("origin addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("origin server");
    });

    format!("http://{}", addr)
}

async fn playlist() -> Response {
    (
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        MASTER_PLAYLIST,
    )
        .into_response()
}

async fn octet_playlist() -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        MASTER_PLAYLIST,
    )
        .into_response()
}

async fn fake_playlist() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        "<html>not a playlist</html>",
    )
        .into_response()
}

async fn segment(headers: HeaderMap) -> Response {
    let body: Vec<u8> = (0..SEGMENT_LEN).map(|i| (i % 251) as u8).collect();

    match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some("bytes=1000-") => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "video/mp2t"),
                (header::CONTENT_RANGE, "bytes 1000-1999/2000"),
                (header::ACCEPT_RANGES, "bytes"),
            ],
            body[1000..].to_vec(),
        )
            .into_response(),
        _ => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "video/mp2t")],
            body,
        )
            .into_response(),
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "too late"
}

async fn echo(headers: HeaderMap) -> Json<serde_json::Value> {
    let get = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Json(json!({
        "user_agent": get(header::USER_AGENT),
        "accept": get(header::ACCEPT),
        "accept_encoding": get(header::ACCEPT_ENCODING),
        "referer": get(header::REFERER),
        "origin": get(header::ORIGIN),
        "range": get(header::RANGE),
    }))
}

/// an origin whose only route streams a segment that never ends. the receiver resolves once the
/// origin has dropped that body, which only happens when the relay hangs up on it
pub async fn spawn_endless_origin() -> (String, oneshot::Receiver<()>) {
    let (dropped_tx, dropped_rx) = oneshot::channel::<()>();
    let dropped_tx = Arc::new(Mutex::new(Some(dropped_tx)));

    let app = Router::new().route(
        "/live/seg.ts",
        get(move || {
            let dropped_tx = dropped_tx.clone();
            async move {
                let guard = dropped_tx.lock().ok().and_then(|mut tx| tx.take());
                let body = futures::stream::unfold(guard, |guard| async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some((Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 1000])), guard))
                });

                ([(header::CONTENT_TYPE, "video/mp2t")], Body::from_stream(body)).into_response()
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback origin");
    let addr = listener.local_addr().expect("origin addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("origin server");
    });

    (format!("http://{}", addr), dropped_rx)
}

pub fn entry(id: &str, video_url: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: format!("Video {}", id),
        description: "a test video".to_string(),
        thumbnail: "/static/images/test.jpg".to_string(),
        video_url: video_url.to_string(),
        duration: "1:00:00".to_string(),
        category: "drama".to_string(),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        upstream_timeout_secs: 1,
        ..Default::default()
    }
}

pub fn catalog_with(entries: Vec<CatalogEntry>) -> DynCatalogRepository {
    Arc::new(InMemoryCatalog::new(entries).expect("valid catalog")) as DynCatalogRepository
}

/// router backed by the real upstream client
pub fn router_with(config: AppConfig, entries: Vec<CatalogEntry>) -> Router {
    let services = AppServices::new(Arc::new(config), catalog_with(entries)).expect("services");
    ApplicationServer::router(services)
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");

    (status, headers, body)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Range");
}
