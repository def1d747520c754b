use crate::google_oauth::CredentialRecord;
use crate::middleware::credential::{credential_cookie, sealed_cookie};
use crate::{GscError, router::GscState};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/login -> redirects to Google's OAuth2 consent page.
pub async fn google_oauth_login(
    State(state): State<GscState>,
    jar: PrivateCookieJar,
) -> Result<Response, GscError> {
    let request = state.oauth_flow()?.authorize_url();

    let session = LoginSession {
        csrf_state: request.csrf_state.secret().to_owned(),
        pkce_verifier: request.pkce_verifier,
    };
    let jar = session.store(jar, state.secure_cookies);

    info!("Dispatching OAuth redirect");
    Ok((jar, Redirect::temporary(request.url.as_str())).into_response())
}

/// GET /auth/callback -> exchanges the code, carries the credential in a cookie,
/// and sends the browser to the dashboard.
///
/// The login-session cookies are expired on every outcome.
pub async fn google_oauth_callback(
    State(state): State<GscState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (jar, session) = LoginSession::take(jar);
    let sealed = match complete_login(&state, &query, session).await {
        Ok(sealed) => sealed,
        Err(err) => return (jar, err).into_response(),
    };
    let jar = jar.add(credential_cookie(sealed, state.secure_cookies));
    (jar, Redirect::temporary(state.dashboard_url.as_str())).into_response()
}

/// Validates the callback against the login session and returns the serialized credential.
async fn complete_login(
    state: &GscState,
    query: &AuthCallbackQuery,
    session: Result<LoginSession, GscError>,
) -> Result<String, GscError> {
    let session = session?;

    if let Some(denied) = query.error.as_deref() {
        warn!(error = denied, "authorization denied by provider");
        return Err(GscError::OauthFlow(format!(
            "authorization failed: {denied}"
        )));
    }

    let state_param = query
        .state
        .as_deref()
        .ok_or_else(|| GscError::OauthFlow("missing `state` in callback".to_string()))?;
    if !bool::from(state_param.as_bytes().ct_eq(session.csrf_state.as_bytes())) {
        return Err(GscError::OauthFlow("CSRF token mismatch".to_string()));
    }

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| GscError::OauthFlow("missing `code` in callback".to_string()))?;

    let record: CredentialRecord = state
        .oauth_flow()?
        .exchange_code(code, session.pkce_verifier, &state.client)
        .await?;
    let sealed = record.to_json()?;

    info!(
        has_refresh_token = record.refresh_token.is_some(),
        scopes = record.scopes.len(),
        "OAuth callback stored credential"
    );
    Ok(sealed)
}

/// Per-login secrets parked in private cookies between `/auth/login` and the callback.
struct LoginSession {
    csrf_state: String,
    pkce_verifier: String,
}

impl LoginSession {
    const CSRF_COOKIE: &'static str = "oauth_csrf_token";
    const PKCE_COOKIE: &'static str = "oauth_pkce_verifier";

    fn store(self, jar: PrivateCookieJar, secure: bool) -> PrivateCookieJar {
        let ttl = Duration::minutes(15);
        jar.add(sealed_cookie(Self::CSRF_COOKIE, self.csrf_state, secure, ttl))
            .add(sealed_cookie(Self::PKCE_COOKIE, self.pkce_verifier, secure, ttl))
    }

    /// Reads the session and always expires both cookies; a callback is single use.
    fn take(jar: PrivateCookieJar) -> (PrivateCookieJar, Result<Self, GscError>) {
        let csrf_state = jar.get(Self::CSRF_COOKIE).map(|c| c.value().to_owned());
        let pkce_verifier = jar.get(Self::PKCE_COOKIE).map(|c| c.value().to_owned());
        let jar = [Self::CSRF_COOKIE, Self::PKCE_COOKIE]
            .into_iter()
            .fold(jar, |jar, name| jar.remove(Cookie::build(name).path("/")));

        let session = match (csrf_state, pkce_verifier) {
            (Some(csrf_state), Some(pkce_verifier)) => Ok(Self {
                csrf_state,
                pkce_verifier,
            }),
            (None, _) => Err(GscError::OauthFlow(
                "no login in progress: CSRF cookie missing".to_string(),
            )),
            (_, None) => Err(GscError::OauthFlow(
                "no login in progress: PKCE verifier cookie missing".to_string(),
            )),
        };
        (jar, session)
    }
}
