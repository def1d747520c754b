use crate::config::{CREDENTIAL_COOKIE, CREDENTIAL_COOKIE_MAX_AGE_SECS};
use crate::error::GscError;
use crate::google_oauth::CredentialRecord;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use time::Duration;
use tracing::debug;

/// The caller's credential, recovered from the encrypted credential cookie.
///
/// Rejects with [`GscError::Unauthenticated`] before any handler code runs when
/// the cookie is missing or fails to decrypt.
#[derive(Debug, Clone)]
pub struct CarriedCredential(pub CredentialRecord);

impl<S> FromRequestParts<S> for CarriedCredential
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = GscError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(jar) = PrivateCookieJar::<Key>::from_request_parts(parts, state).await;
        let Some(cookie) = jar.get(CREDENTIAL_COOKIE) else {
            debug!("no credential cookie on request");
            return Err(GscError::Unauthenticated);
        };
        debug!(len = cookie.value().len(), "credential cookie present");
        CredentialRecord::from_json(cookie.value()).map(Self)
    }
}

/// Attach the serialized credential to the outgoing response.
pub fn attach_credential(
    jar: PrivateCookieJar,
    record: &CredentialRecord,
    secure: bool,
) -> Result<PrivateCookieJar, GscError> {
    Ok(jar.add(credential_cookie(record.to_json()?, secure)))
}

/// One hour. The jar encrypts the value on the way out.
pub fn credential_cookie(value: String, secure: bool) -> Cookie<'static> {
    sealed_cookie(
        CREDENTIAL_COOKIE,
        value,
        secure,
        Duration::seconds(CREDENTIAL_COOKIE_MAX_AGE_SECS),
    )
}

/// HttpOnly, `SameSite=Lax`, scoped to `/`. Every cookie this service sets goes
/// through the private jar with these attributes.
pub(crate) fn sealed_cookie(
    name: &'static str,
    value: String,
    secure: bool,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}
