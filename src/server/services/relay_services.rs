use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, error, warn};
use url::Url;

use crate::server::{
    error::{AppResult, Error, FetchError},
    services::upstream_services::{ByteStream, FetchResult},
    utils::{
        playlist_utils::PlaylistRewriter,
        url_utils::UrlResolver,
    },
};

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// passed through only when the origin sent them
const FORWARDED_MEDIA_HEADERS: [header::HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

/// turns an upstream fetch into the response the player gets
#[derive(Clone)]
pub struct RelayService {
    max_playlist_bytes: usize,
}

impl RelayService {
    pub fn new(max_playlist_bytes: usize) -> Self {
        Self { max_playlist_bytes }
    }

    /// playlists come back rewritten, everything else is streamed through in `chunk_size`
    /// pieces. a failed fetch is a bodyless 502
    pub async fn relay(
        &self,
        fetched: Result<FetchResult, FetchError>,
        video_id: &str,
        chunk_size: usize,
    ) -> AppResult<Response> {
        let fetched = fetched?;

        let is_playlist = Self::is_playlist(fetched.content_type.as_deref(), &fetched.url);
        debug!(
            "Content-Type: {:?}, status: {}, Detected as M3U8: {}",
            fetched.content_type, fetched.status, is_playlist
        );

        if is_playlist {
            let base = UrlResolver::resolve_base(fetched.url.as_str()).map_err(|e| {
                error!("Failed to parse base URL: {}", e);
                Error::MalformedPlaylist(format!("invalid base url: {}", e))
            })?;
            let text = self.read_playlist(fetched.body).await?;
            let processed_body = PlaylistRewriter::rewrite(&text, video_id, &base)?;

            Ok(Self::build_m3u8_response(processed_body))
        } else {
            Ok(Self::build_media_response(fetched, chunk_size))
        }
    }

    /// content type decides when it can, the url suffix is only a fallback for origins that send
    /// something generic like octet-stream or text/plain
    pub fn is_playlist(content_type: Option<&str>, url: &Url) -> bool {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime.ends_with("mpegurl") {
            return true;
        }

        if mime.starts_with("video/") || mime.starts_with("audio/") || mime.starts_with("image/") {
            return false;
        }

        let path = url.path().to_ascii_lowercase();
        path.ends_with(".m3u8") || path.ends_with(".m3u")
    }

    /// buffers the whole playlist, it has to be valid utf-8 and actually look like a playlist
    async fn read_playlist(&self, mut body: ByteStream) -> AppResult<String> {
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!("Failed to read response: {}", e);
                FetchError::UpstreamUnreachable(format!("failed to read playlist body: {}", e))
            })?;

            if buffer.len() + chunk.len() > self.max_playlist_bytes {
                return Err(Error::MalformedPlaylist(format!(
                    "playlist larger than {} bytes",
                    self.max_playlist_bytes
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        debug!("Read {} playlist bytes", buffer.len());

        let text = String::from_utf8(buffer).map_err(|e| {
            error!("Failed to parse m3u8 as UTF-8: {}", e);
            Error::MalformedPlaylist("Invalid m3u8 encoding".to_string())
        })?;

        if !PlaylistRewriter::is_playlist_text(&text) {
            return Err(Error::MalformedPlaylist(
                "body does not start with #EXTM3U".to_string(),
            ));
        }

        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    fn build_m3u8_response(processed_body: String) -> Response {
        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(PLAYLIST_CONTENT_TYPE),
        );
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(processed_body.len()));
        Self::apply_cors(&mut response_headers);

        debug!("Sending rewritten M3U8, {} bytes", processed_body.len());

        (StatusCode::OK, response_headers, processed_body).into_response()
    }

    fn build_media_response(fetched: FetchResult, chunk_size: usize) -> Response {
        let mut response_headers = HeaderMap::new();

        let content_type = fetched
            .headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        response_headers.insert(header::CONTENT_TYPE, content_type);

        for name in FORWARDED_MEDIA_HEADERS {
            if let Some(value) = fetched.headers.get(&name) {
                response_headers.insert(name, value.clone());
            }
        }
        Self::apply_cors(&mut response_headers);

        debug!(
            "Streaming {} body in {} byte chunks (range: {:?})",
            fetched.status,
            chunk_size,
            fetched.headers.get(header::CONTENT_RANGE)
        );

        let body = Body::from_stream(Self::fixed_chunks(fetched.body, chunk_size));

        (fetched.status, response_headers, body).into_response()
    }

    /// regroups the upstream body into `chunk_size` pieces, only the last one can be shorter.
    /// reads are pulled as the client consumes, nothing is buffered past the current chunk
    pub fn fixed_chunks(body: ByteStream, chunk_size: usize) -> ByteStream {
        let chunk_size = chunk_size.max(1);
        let reader = StreamReader::new(body);

        futures::stream::try_unfold(reader, move |mut reader| async move {
            let mut chunk = BytesMut::zeroed(chunk_size);
            let mut filled = 0;

            while filled < chunk_size {
                let read = reader.read(&mut chunk[filled..]).await?;
                if read == 0 {
                    break;
                }
                filled += read;
            }

            if filled == 0 {
                return Ok(None);
            }

            chunk.truncate(filled);
            Ok::<_, std::io::Error>(Some((chunk.freeze(), reader)))
        })
        .boxed()
    }

    pub fn apply_cors(headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Range"),
        );
    }

    /// browsers preflight before sending a Range header cross origin
    pub fn preflight() -> Response {
        let mut headers = HeaderMap::new();
        Self::apply_cors(&mut headers);
        (StatusCode::NO_CONTENT, headers).into_response()
    }
}
