use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderValue;
use axum::http::header::{RANGE, USER_AGENT};
use axum::http::request::Parts;
use tracing::debug;

/// the few client headers that are passed on to the origin. `Range` is kept as the raw header
/// value so it goes upstream exactly as the player sent it
#[derive(Debug, Clone, Default)]
pub struct ForwardedHeaders {
    pub user_agent: Option<HeaderValue>,
    pub range: Option<HeaderValue>,
}

impl<S> FromRequestParts<S> for ForwardedHeaders
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .filter(|v| !v.is_empty())
            .cloned();

        let range = parts.headers.get(RANGE).cloned();

        if let Some(ref range) = range {
            debug!("client sent range {:?}", range);
        }

        Ok(ForwardedHeaders { user_agent, range })
    }
}
