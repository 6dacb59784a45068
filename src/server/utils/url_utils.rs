use tracing::{debug, warn};
use url::Url;

use crate::server::error::{AppResult, Error};

/// resolves playlist references against the playlist they came from
pub struct UrlResolver;

impl UrlResolver {
    /// drops the last path segment, query and fragment of a playlist url so that relative
    /// references can be joined onto it. `https://cdn/a/b/index.m3u8?t=1` -> `https://cdn/a/b/`
    pub fn resolve_base(url: &str) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(url)?;

        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }

        let path = base.path().to_string();
        let dir = &path[..path.rfind('/').map_or(0, |i| i + 1)];
        let dir = if dir.is_empty() { "/" } else { dir };

        base.set_path(dir);
        base.set_query(None);
        base.set_fragment(None);

        Ok(base)
    }

    /// absolute references come back untouched, anything else is joined onto `base` with the
    /// usual relative url rules. running it on its own output is a no-op
    pub fn resolve_reference(base: &Url, reference: &str) -> Result<String, url::ParseError> {
        let reference = reference.trim();

        if Self::has_scheme(reference) {
            return Ok(reference.to_string());
        }

        base.join(reference).map(String::from)
    }

    /// `scheme://` where scheme is a letter followed by letters, digits, `+`, `-` or `.`
    pub fn has_scheme(reference: &str) -> bool {
        let Some((scheme, _)) = reference.split_once("://") else {
            return false;
        };

        let mut chars = scheme.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            }
            _ => false,
        }
    }
}

/// the (video id, upstream url) pair that every rewritten playlist line points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReference {
    pub video_id: String,
    pub upstream_url: String,
}

impl ProxyReference {
    pub fn new(video_id: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            upstream_url: upstream_url.into(),
        }
    }

    /// `/segment/{video_id}?url={upstream_url}`, both percent encoded. everything outside the
    /// unreserved set gets escaped so `&`, `#`, `%`, `?` and `+` can't break the query
    pub fn to_path(&self) -> String {
        format!(
            "/segment/{}?url={}",
            urlencoding::encode(&self.video_id),
            urlencoding::encode(&self.upstream_url)
        )
    }

    /// reads the `url` parameter back out of a raw query string. it is decoded exactly once,
    /// so whatever `to_path` encoded comes back byte for byte
    pub fn from_query(video_id: &str, query: Option<&str>) -> AppResult<Self> {
        let encoded = query
            .and_then(|q| {
                q.split('&')
                    .find(|param| param.starts_with("url="))
                    .and_then(|param| param.strip_prefix("url="))
            })
            .filter(|encoded| !encoded.is_empty())
            .ok_or_else(|| Error::BadRequest("missing url parameter".to_string()))?;

        let upstream_url = urlencoding::decode(encoded)
            .map(|s| s.into_owned())
            .map_err(|e| {
                warn!("rejecting badly encoded url parameter: {}", e);
                Error::BadRequest("Invalid URL encoding".to_string())
            })?;

        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(Error::BadRequest("Invalid URL format".to_string()));
        }

        debug!("decoded segment url for video {}: {}", video_id, upstream_url);

        Ok(Self::new(video_id, upstream_url))
    }
}
