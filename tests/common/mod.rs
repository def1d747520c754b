#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use base64::Engine;
use gsc_lens::{
    CredentialRecord, GscState, config::Config, gsc_router, middleware::attach_credential,
    service::QueryWindow,
};
use httpmock::MockServer;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const SITE: &str = "sc-domain:example.com";
pub const QUERY_PATH: &str = "/webmasters/v3/sites/sc-domain:example.com/searchAnalytics/query";

/// Config pointing every Google endpoint at the mock server.
pub fn test_config(server: &MockServer) -> Config {
    let mut cfg = Config::default();
    cfg.frontend_url = Url::parse("https://app.example.com").expect("frontend url");
    cfg.client_id = Some(CLIENT_ID.to_string());
    cfg.client_secret = Some(CLIENT_SECRET.to_string());
    cfg.auth_uri = Url::parse(&server.url("/authorize")).expect("auth url");
    cfg.token_uri = Url::parse(&server.url("/token")).expect("token url");
    cfg.search_console_url = Url::parse(&server.url("/")).expect("search console url");
    cfg.cookie_key = Some(base64::engine::general_purpose::STANDARD.encode([7u8; 64]));
    cfg.insecure_cookie = true;
    cfg
}

pub fn build_app(cfg: &Config) -> (Router, GscState) {
    let state = GscState::from_config(cfg).expect("state should build from test config");
    (gsc_router(state.clone()), state)
}

pub fn record(token: &str) -> CredentialRecord {
    CredentialRecord {
        token: token.to_string(),
        refresh_token: Some("refresh-it".to_string()),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        scopes: vec!["https://www.googleapis.com/auth/webmasters.readonly".to_string()],
        expiry: None,
    }
}

/// `name=value` pair of a sealed credential cookie, ready for a `Cookie` header.
pub fn credential_cookie(state: &GscState, token: &str) -> String {
    let jar = attach_credential(PrivateCookieJar::new(state.cookie_key.clone()), &record(token), false)
        .expect("credential should serialize");
    let resp = (jar, ()).into_response();
    let set_cookie = resp.headers()[header::SET_COOKIE]
        .to_str()
        .expect("set-cookie should be ascii");
    cookie_pair(set_cookie)
}

pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .expect("set-cookie has a pair")
        .to_string()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("set-cookie should be ascii").to_string())
        .collect()
}

pub fn uri(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let resp = app
        .clone()
        .oneshot(builder.body(Body::empty()).expect("failed to build request"))
        .await
        .expect("request failed");

    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

pub fn window() -> (String, String) {
    let w = QueryWindow::today();
    (w.start.to_string(), w.end.to_string())
}
