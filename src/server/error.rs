use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error, warn};

pub type AppResult<T> = Result<T, Error>;

/// failures talking to the origin, these all end up as a bodyless 502
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream rejected the request with status {0}")]
    UpstreamRejected(StatusCode),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] FetchError),

    // the upstream said it was a playlist but we couldn't treat it as one
    #[error("malformed playlist: {0}")]
    MalformedPlaylist(String),

    #[error("internal server error: {0}")]
    InternalServerErrorWithContext(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::InternalServerErrorWithContext(format!("{:#}", err))
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::MalformedPlaylist(_) => StatusCode::BAD_GATEWAY,
            Error::InternalServerErrorWithContext(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            Error::BadRequest(message) | Error::NotFound(message) => {
                debug!("{}: {}", status, message);
                (status, Json(json!({ "error": message }))).into_response()
            }
            // never hand upstream details to the player, a bare 502 is all it gets
            Error::Upstream(ref err) => {
                warn!("relay failed: {}", err);
                status.into_response()
            }
            Error::MalformedPlaylist(ref message) => {
                warn!("relay failed, malformed playlist: {}", message);
                status.into_response()
            }
            Error::InternalServerErrorWithContext(_) => {
                error!("{}", self);
                (
                    status,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
