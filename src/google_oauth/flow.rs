use crate::error::GscError;
use crate::google_oauth::client_secrets::ClientSecrets;
use crate::google_oauth::credentials::CredentialRecord;

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EmptyExtraTokenFields, EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use std::collections::BTreeSet;
use url::{Host, Url};
use tracing::{debug, info};

/// Knobs that relax the OAuth client's safety checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuthFlowOptions {
    /// Permit plain-http endpoints on non-loopback hosts.
    pub allow_insecure_transport: bool,
    /// Accept a token whose granted scopes differ from the requested ones.
    pub relax_token_scope: bool,
}

/// Redirect target plus the per-login secrets that must survive until the callback.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub csrf_state: CsrfToken,
    pub pkce_verifier: String,
}

/// Authorization-code flow against Google's OAuth endpoints.
pub struct GoogleOauthFlow {
    client: GoogleOauth2Client,
    secrets: ClientSecrets,
    scopes: Vec<String>,
    options: OAuthFlowOptions,
}

impl GoogleOauthFlow {
    pub fn new(
        secrets: ClientSecrets,
        redirect_uri: Url,
        scopes: Vec<String>,
        options: OAuthFlowOptions,
    ) -> Result<Self, GscError> {
        let auth_uri = Url::parse(&secrets.auth_uri)?;
        let token_uri = Url::parse(&secrets.token_uri)?;
        for (name, url) in [
            ("redirect", &redirect_uri),
            ("authorization", &auth_uri),
            ("token", &token_uri),
        ] {
            ensure_transport(name, url, options)?;
        }

        let client = OAuth2Client::new(ClientId::new(secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(secrets.client_secret.clone()))
            .set_auth_uri(AuthUrl::from_url(auth_uri))
            .set_token_uri(TokenUrl::from_url(token_uri))
            .set_redirect_uri(RedirectUrl::from_url(redirect_uri));

        Ok(Self {
            client,
            secrets,
            scopes,
            options,
        })
    }

    /// Build the consent URL. Requests offline access so Google issues a refresh token.
    pub fn authorize_url(&self) -> AuthorizationRequest {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("include_granted_scopes", "true")
            .set_pkce_challenge(challenge)
            .url();

        AuthorizationRequest {
            url,
            csrf_state,
            pkce_verifier: verifier.secret().to_string(),
        }
    }

    /// Exchange the callback `code` for a credential record.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: String,
        http_client: &reqwest::Client,
    ) -> Result<CredentialRecord, GscError> {
        let token: GoogleTokenResponse = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(http_client)
            .await?;

        self.check_granted_scopes(&token)?;
        debug!(
            has_refresh_token = token.refresh_token().is_some(),
            "authorization code exchanged"
        );
        info!("OAuth token exchange succeeded");
        Ok(CredentialRecord::from_token_response(
            &token,
            &self.secrets,
            &self.scopes,
        ))
    }

    fn check_granted_scopes(&self, token: &GoogleTokenResponse) -> Result<(), GscError> {
        if self.options.relax_token_scope {
            return Ok(());
        }
        let Some(granted) = token.scopes() else {
            return Ok(());
        };
        let granted: BTreeSet<&str> = granted.iter().map(|s| s.as_str()).collect();
        let requested: BTreeSet<&str> = self.scopes.iter().map(String::as_str).collect();
        if granted != requested {
            return Err(GscError::OauthFlow(format!(
                "scope has changed from {:?} to {:?}",
                requested, granted
            )));
        }
        Ok(())
    }
}

fn ensure_transport(name: &str, url: &Url, options: OAuthFlowOptions) -> Result<(), GscError> {
    if url.scheme() == "https" || options.allow_insecure_transport || is_loopback(url) {
        return Ok(());
    }
    Err(GscError::Config(format!(
        "{name} endpoint {url} must use https (set GSC_ALLOW_INSECURE_TRANSPORT=true to override)"
    )))
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

pub(crate) type GoogleTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

pub(crate) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WEBMASTERS_READONLY_SCOPE;
    use std::collections::HashMap;

    fn secrets(token_uri: &str) -> ClientSecrets {
        ClientSecrets {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: token_uri.into(),
        }
    }

    fn flow(redirect: &str, options: OAuthFlowOptions) -> Result<GoogleOauthFlow, GscError> {
        GoogleOauthFlow::new(
            secrets("https://oauth2.googleapis.com/token"),
            Url::parse(redirect).unwrap(),
            vec![WEBMASTERS_READONLY_SCOPE.to_string()],
            options,
        )
    }

    #[test]
    fn authorize_url_requests_offline_access_with_pkce() {
        let flow = flow(
            "http://localhost:8000/auth/callback",
            OAuthFlowOptions::default(),
        )
        .unwrap();
        let request = flow.authorize_url();
        let params: HashMap<_, _> = request.url.query_pairs().into_owned().collect();

        assert_eq!(params.get("client_id"), Some(&"client-id".to_string()));
        assert_eq!(
            params.get("redirect_uri"),
            Some(&"http://localhost:8000/auth/callback".to_string())
        );
        assert_eq!(
            params.get("scope"),
            Some(&WEBMASTERS_READONLY_SCOPE.to_string())
        );
        assert_eq!(params.get("access_type"), Some(&"offline".to_string()));
        assert_eq!(
            params.get("include_granted_scopes"),
            Some(&"true".to_string())
        );
        assert_eq!(params.get("code_challenge_method"), Some(&"S256".to_string()));
        assert_eq!(params.get("state"), Some(request.csrf_state.secret()));
        assert!(!request.pkce_verifier.is_empty());
    }

    #[test]
    fn plain_http_redirect_needs_explicit_opt_in() {
        let err = flow(
            "http://api.example.com/auth/callback",
            OAuthFlowOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, GscError::Config(_)));

        let allowed = flow(
            "http://api.example.com/auth/callback",
            OAuthFlowOptions {
                allow_insecure_transport: true,
                ..Default::default()
            },
        );
        assert!(allowed.is_ok());
        assert!(flow("http://127.0.0.1:8000/auth/callback", OAuthFlowOptions::default()).is_ok());
    }
}
