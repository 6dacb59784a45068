use axum::{
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use url::Url;

use cinemahub::server::{
    error::Error,
    services::{
        RelayService,
        upstream_services::{ByteStream, FetchResult},
    },
};

fn upstream_chunks(count: usize, len: usize) -> ByteStream {
    futures::stream::iter((0..count).map(move |i| Ok(Bytes::from(vec![i as u8; len])))).boxed()
}

fn playlist_result(body: &'static [u8]) -> FetchResult {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "application/vnd.apple.mpegurl".parse().unwrap(),
    );

    FetchResult::from_bytes(
        StatusCode::OK,
        headers,
        Url::parse("https://cdn.example.com/path/to/index.m3u8").unwrap(),
        Bytes::from_static(body),
    )
}

async fn relay_error(relay: &RelayService, fetched: FetchResult) -> Error {
    match relay.relay(Ok(fetched), "7", 1024).await {
        Err(err) => err,
        Ok(response) => panic!("expected a relay error, got {}", response.status()),
    }
}

async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

#[tokio::test]
async fn regroup_upstream_chunks_into_fixed_sizes() {
    let chunks: Vec<Bytes> = RelayService::fixed_chunks(upstream_chunks(10, 1000), 4096)
        .try_collect()
        .await
        .unwrap();

    let sizes: Vec<usize> = chunks.iter().map(Bytes::len).collect();
    assert_eq!(sizes, [4096, 4096, 1808]);

    // bytes come out in the order they went in
    let joined = chunks.concat();
    assert_eq!(joined[999], 0);
    assert_eq!(joined[1000], 1);
    assert_eq!(joined[9999], 9);
}

#[tokio::test]
async fn split_large_upstream_chunks() {
    let sizes: Vec<usize> = RelayService::fixed_chunks(upstream_chunks(1, 10_000), 4096)
        .map_ok(|chunk| chunk.len())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(sizes, [4096, 4096, 1808]);
}

#[tokio::test]
async fn yield_nothing_for_an_empty_body() {
    let chunks: Vec<Bytes> = RelayService::fixed_chunks(upstream_chunks(0, 0), 4096)
        .try_collect()
        .await
        .unwrap();

    assert!(chunks.is_empty());
}

#[tokio::test]
async fn pass_upstream_read_errors_on() {
    let body = futures::stream::iter(vec![
        Ok(Bytes::from_static(b"abc")),
        Err(std::io::Error::other("connection reset")),
    ])
    .boxed();

    let result: Result<Vec<Bytes>, _> = RelayService::fixed_chunks(body, 4096).try_collect().await;

    assert!(result.is_err());
}

#[tokio::test]
async fn reject_playlists_over_the_size_limit() {
    let relay = RelayService::new(64);
    let oversized: &'static [u8] = b"#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nsegment001.ts\n#EXTINF:6.0,\nsegment002.ts\n#EXT-X-ENDLIST\n";
    assert!(oversized.len() > 64);

    let err = relay_error(&relay, playlist_result(oversized)).await;
    assert!(matches!(err, Error::MalformedPlaylist(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn reject_playlists_that_are_not_utf8() {
    let relay = RelayService::new(4096);

    let err = relay_error(&relay, playlist_result(b"#EXTM3U\n\xff\xfe.ts\n")).await;
    assert!(matches!(err, Error::MalformedPlaylist(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn accept_playlists_right_at_the_limit() {
    let body: &'static [u8] = b"#EXTM3U\nseg.ts\n";
    let relay = RelayService::new(body.len());

    let response = relay
        .relay(Ok(playlist_result(body)), "7", 1024)
        .await
        .unwrap_or_else(|err| panic!("relay failed: {}", err));

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_bytes(response).await;
    assert!(text.starts_with(b"#EXTM3U\n/segment/7?url="));
}
