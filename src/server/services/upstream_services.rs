use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use mockall::automock;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::AppConfig,
    server::{error::FetchError, extractors::ForwardedHeaders},
};

/// upstream body, pulled lazily. dropping it abandons whatever the origin hasn't sent yet
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// a 200 or 206 from the origin. the body hasn't been read yet
pub struct FetchResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    // final url after redirects, playlists resolve their references against this
    pub url: Url,
    pub body: ByteStream,
}

impl FetchResult {
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: ByteStream) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            status,
            headers,
            content_type,
            url,
            body,
        }
    }

    /// a result with a fully known body, handy when the bytes are already in memory
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, url: Url, body: Bytes) -> Self {
        Self::new(
            status,
            headers,
            url,
            futures::stream::once(async move { Ok(body) }).boxed(),
        )
    }
}

impl fmt::Debug for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResult")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

pub type DynUpstreamService = Arc<dyn UpstreamServiceTrait + Send + Sync>;

#[automock]
#[async_trait::async_trait]
pub trait UpstreamServiceTrait {
    /// GET `url` from the origin. only 200 and 206 count as success, nothing is retried
    async fn fetch(
        &self,
        url: &str,
        forwarded: &ForwardedHeaders,
    ) -> Result<FetchResult, FetchError>;
}

pub struct UpstreamService {
    http: reqwest::Client,
    user_agent: HeaderValue,
    referer: Option<String>,
    origin: Option<String>,
    timeout: Duration,
}

impl UpstreamService {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.upstream_timeout_secs);

        let redirect = match config.upstream_max_redirects {
            0 => reqwest::redirect::Policy::none(),
            max => reqwest::redirect::Policy::limited(max),
        };

        // no .timeout() here, that would cap the whole body and kill long segment downloads.
        // the head of the response is bounded in fetch instead
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(redirect)
            .build()?;

        let user_agent = HeaderValue::from_str(&config.upstream_user_agent)?;

        Ok(Self {
            http,
            user_agent,
            referer: config.upstream_referer.clone(),
            origin: config.upstream_origin.clone(),
            timeout,
        })
    }

    // most hotlink protection only looks at these, so make it look like the player page asked
    fn apply_upstream_headers(
        &self,
        request_builder: reqwest::RequestBuilder,
        target: &Url,
        forwarded: &ForwardedHeaders,
    ) -> reqwest::RequestBuilder {
        let target_origin = target.origin().ascii_serialization();

        let referer = self
            .referer
            .clone()
            .unwrap_or_else(|| format!("{}/", target_origin));
        let origin = self.origin.clone().unwrap_or(target_origin);

        let user_agent = forwarded
            .user_agent
            .clone()
            .unwrap_or_else(|| self.user_agent.clone());

        let mut request_builder = request_builder
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, "*/*")
            // playlists get split into lines, a compressed body would be garbage
            .header(header::ACCEPT_ENCODING, "identity")
            .header(header::REFERER, referer)
            .header(header::ORIGIN, origin);

        if let Some(range) = &forwarded.range {
            request_builder = request_builder.header(header::RANGE, range.clone());
        }

        request_builder
    }
}

#[async_trait::async_trait]
impl UpstreamServiceTrait for UpstreamService {
    async fn fetch(
        &self,
        url: &str,
        forwarded: &ForwardedHeaders,
    ) -> Result<FetchResult, FetchError> {
        let target = Url::parse(url).map_err(|e| {
            warn!("refusing to fetch invalid upstream url {}: {}", url, e);
            FetchError::UpstreamUnreachable(format!("invalid upstream url: {}", e))
        })?;

        let request_builder =
            self.apply_upstream_headers(self.http.get(target.clone()), &target, forwarded);

        debug!("Sending request to target {}", target);

        let target_response = tokio::time::timeout(self.timeout, request_builder.send())
            .await
            .map_err(|_| {
                warn!("upstream timed out after {:?}: {}", self.timeout, target);
                FetchError::UpstreamUnreachable(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| {
                warn!("Request failed: {}", e);
                FetchError::UpstreamUnreachable(e.to_string())
            })?;

        let status = target_response.status();
        debug!("Received response with status: {}", status);

        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            // the body is usually a cloudflare page, not worth reading. dropping the response
            // closes it
            warn!("Response from target not successful: {} ({})", status, target);
            return Err(FetchError::UpstreamRejected(status));
        }

        let final_url = target_response.url().clone();
        let headers = target_response.headers().clone();
        let body = target_response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(FetchResult::new(status, headers, final_url, body))
    }
}
