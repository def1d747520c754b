use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::GscError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SEARCH_CONSOLE_URL: &str = "https://searchconsole.googleapis.com/";

/// The only scope requested from Google.
pub const WEBMASTERS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";

/// Cookie carrying the serialized credential record.
pub const CREDENTIAL_COOKIE: &str = "gsc_credentials";
pub const CREDENTIAL_COOKIE_MAX_AGE_SECS: i64 = 3600;

/// Runtime configuration, read from `GSC_*` environment variables.
///
/// List values such as `GSC_EXTRA_CORS_ORIGINS` take either a comma separated
/// string (`http://a.example.com,http://b.example.com`) or figment's `[a, b]` form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    /// Public base URL of this service; the OAuth callback hangs off it.
    pub backend_url: Url,
    /// Front-end origin; post-login redirect target and CORS origin.
    pub frontend_url: Url,
    #[serde(deserialize_with = "string_list")]
    pub extra_cors_origins: Vec<String>,

    pub client_secrets_file: PathBuf,
    /// Whole client-secrets document inline; also read from `GOOGLE_CREDENTIALS`.
    #[serde(deserialize_with = "json_document")]
    pub client_secrets_json: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub client_id: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub client_secret: Option<String>,
    pub auth_uri: Url,
    pub token_uri: Url,
    pub allow_insecure_transport: bool,
    pub relax_token_scope: bool,

    /// Base64 encoded key (at least 64 bytes) used to encrypt cookies.
    #[serde(deserialize_with = "scalar_string")]
    pub cookie_key: Option<String>,
    pub insecure_cookie: bool,

    pub search_console_url: Url,
    pub proxy: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            backend_url: Url::parse("http://localhost:8000").expect("static url"),
            frontend_url: Url::parse("http://localhost:5173").expect("static url"),
            extra_cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            client_secrets_file: PathBuf::from("client_secret.json"),
            client_secrets_json: None,
            client_id: None,
            client_secret: None,
            auth_uri: Url::parse(GOOGLE_AUTH_URL).expect("static url"),
            token_uri: Url::parse(GOOGLE_TOKEN_URI).expect("static url"),
            allow_insecure_transport: false,
            relax_token_scope: true,
            cookie_key: None,
            insecure_cookie: false,
            search_console_url: Url::parse(SEARCH_CONSOLE_URL).expect("static url"),
            proxy: None,
        }
    }
}

impl Config {
    /// Defaults, then the unprefixed `BACKEND_URL` / `FRONTEND_URL` /
    /// `GOOGLE_CREDENTIALS`, then `GSC_*`.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&["backend_url", "frontend_url"]))
            .merge(
                Env::raw()
                    .only(&["google_credentials"])
                    .map(|_| "client_secrets_json".into()),
            )
            .merge(Env::prefixed("GSC_"))
            .extract()
            .map_err(Box::new)
    }

    pub fn callback_uri(&self) -> Result<Url, GscError> {
        let base = self.backend_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/auth/callback"))?)
    }

    pub fn dashboard_url(&self) -> Result<Url, GscError> {
        let base = self.frontend_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/dashboard"))?)
    }

    /// Origins allowed to make credentialed cross-origin calls, deduplicated.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.origin().ascii_serialization()];
        for extra in &self.extra_cors_origins {
            let extra = extra.trim_end_matches('/').to_string();
            if !origins.contains(&extra) {
                origins.push(extra);
            }
        }
        origins
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

// Env values are typed by figment, so an all-digit secret arrives as a number.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<String>),
        One(String),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

// figment may read a JSON object from the environment as its own dict.
fn json_document<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<serde_json::Value>::deserialize(deserializer)?.map(|value| match value {
            serde_json::Value::String(raw) => raw,
            other => other.to_string(),
        }),
    )
}
