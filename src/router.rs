use crate::config::{Config, WEBMASTERS_READONLY_SCOPE};
use crate::error::GscError;
use crate::google_oauth::{ClientSecrets, CredentialRecord, GoogleOauthFlow, OAuthFlowOptions};
use crate::handlers::{analytics, google_oauth, service_status};
use crate::service::SearchConsoleClient;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method},
    routing::get,
};
use axum_extra::extract::cookie::Key;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::Url;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct GscState {
    pub client: reqwest::Client,
    /// The login flow, or why it could not be set up.
    pub oauth: Result<Arc<GoogleOauthFlow>, String>,
    pub search_console_url: Url,
    pub cookie_key: Key,
    pub secure_cookies: bool,
    pub dashboard_url: Url,
    pub cors_origins: Vec<String>,
}

impl FromRef<GscState> for Key {
    fn from_ref(state: &GscState) -> Self {
        state.cookie_key.clone()
    }
}

impl GscState {
    pub fn from_config(cfg: &Config) -> Result<Self, GscError> {
        let client = build_http_client(cfg)?;

        let oauth = match ClientSecrets::from_config(cfg) {
            Ok(secrets) => {
                let flow = GoogleOauthFlow::new(
                    secrets,
                    cfg.callback_uri()?,
                    vec![WEBMASTERS_READONLY_SCOPE.to_string()],
                    OAuthFlowOptions {
                        allow_insecure_transport: cfg.allow_insecure_transport,
                        relax_token_scope: cfg.relax_token_scope,
                    },
                )?;
                Ok(Arc::new(flow))
            }
            Err(e) => {
                warn!(error = %e, "OAuth login disabled");
                Err(match e {
                    GscError::MissingClientSecrets(reason) => reason,
                    other => other.to_string(),
                })
            }
        };

        Ok(Self {
            client,
            oauth,
            search_console_url: cfg.search_console_url.clone(),
            cookie_key: cookie_key(cfg.cookie_key.as_deref())?,
            secure_cookies: !cfg.insecure_cookie,
            dashboard_url: cfg.dashboard_url()?,
            cors_origins: cfg.cors_origins(),
        })
    }

    pub fn oauth_flow(&self) -> Result<&GoogleOauthFlow, GscError> {
        self.oauth
            .as_deref()
            .map_err(|reason| GscError::MissingClientSecrets(reason.clone()))
    }

    /// Per-request Search Console client for the carried credential.
    pub fn search_console(&self, cred: &CredentialRecord) -> SearchConsoleClient {
        SearchConsoleClient::rehydrate(self.client.clone(), self.search_console_url.clone(), cred)
    }
}

fn build_http_client(cfg: &Config) -> Result<reqwest::Client, GscError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("gsc-lens/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        // oauth2 token requests must not follow redirects.
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

fn cookie_key(encoded: Option<&str>) -> Result<Key, GscError> {
    let Some(encoded) = encoded else {
        warn!("GSC_COOKIE_KEY not set; generated an ephemeral key, sessions end on restart");
        return Ok(Key::generate());
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| GscError::Config(format!("cookie_key is not valid base64: {e}")))?;
    Key::try_from(bytes.as_slice())
        .map_err(|e| GscError::Config(format!("cookie_key rejected: {e}")))
}

pub fn gsc_router(state: GscState) -> Router {
    let origins: Vec<HeaderValue> = state
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    info!(origins = ?state.cors_origins, "CORS allow-list");

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/", get(service_status))
        .route("/auth/login", get(google_oauth::google_oauth_login))
        .route("/auth/callback", get(google_oauth::google_oauth_callback))
        .route("/api/sites", get(analytics::list_sites))
        .route("/api/data", get(analytics::data_by_date))
        .route("/api/urls", get(analytics::data_by_url))
        .route("/api/url-timeseries", get(analytics::url_time_series))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
