use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum GscError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Upstream query failed: {0}")]
    UpstreamQueryFailed(String),

    #[error("OAuth flow error: {0}")]
    OauthFlow(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Client secrets unavailable: {0}")]
    MissingClientSecrets(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GscError {
    fn code(&self) -> &'static str {
        match self {
            GscError::Unauthenticated => "UNAUTHENTICATED",
            GscError::MalformedCredential(_) => "MALFORMED_CREDENTIAL",
            GscError::UpstreamQueryFailed(_) => "UPSTREAM_QUERY_FAILED",
            GscError::OauthFlow(_) => "OAUTH_FLOW",
            GscError::Oauth2Token(_) | GscError::Oauth2Server { .. } => "OAUTH_TOKEN",
            GscError::MissingClientSecrets(_) => "MISSING_CLIENT_SECRETS",
            _ => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GscError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GscError::OauthFlow(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<reqwest::Error>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for GscError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<reqwest::Error>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => GscError::Oauth2Server {
                error: match err.error_description() {
                    Some(desc) => format!("{}: {}", err.error(), desc),
                    None => err.error().to_string(),
                },
            },
            RequestTokenError::Request(req_e) => {
                GscError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => GscError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => GscError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for GscError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Error envelope returned by Google APIs.
#[derive(Deserialize, Debug)]
pub struct GoogleApiError {
    pub error: GoogleApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GoogleApiErrorBody {
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GoogleApiError {
    /// Best-effort message for an upstream failure body.
    pub fn describe(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<GoogleApiError>(body) {
            Ok(parsed) => match parsed.error.status {
                Some(s) => format!("{} ({s}): {}", parsed.error.code, parsed.error.message),
                None => format!("{}: {}", parsed.error.code, parsed.error.message),
            },
            Err(_) if body.trim().is_empty() => format!("upstream returned {status}"),
            Err(_) => format!("upstream returned {status}: {}", body.trim()),
        }
    }
}
