use crate::config::{GOOGLE_TOKEN_URI, WEBMASTERS_READONLY_SCOPE};
use crate::error::GscError;
use crate::google_oauth::client_secrets::ClientSecrets;
use chrono::{DateTime, Utc};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

use super::flow::GoogleTokenResponse;

/// Everything needed to call Google APIs on behalf of the user without
/// re-running the consent flow. Round-trips through the client as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![WEBMASTERS_READONLY_SCOPE.to_string()]
}

impl CredentialRecord {
    pub fn to_json(&self) -> Result<String, GscError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a carried credential. `token` must be present and non-empty.
    pub fn from_json(text: &str) -> Result<Self, GscError> {
        let record: CredentialRecord = serde_json::from_str(text)
            .map_err(|e| GscError::MalformedCredential(e.to_string()))?;
        if record.token.trim().is_empty() {
            return Err(GscError::MalformedCredential(
                "empty `token` field".to_string(),
            ));
        }
        Ok(record)
    }

    /// Build a record from a successful authorization-code exchange.
    ///
    /// Granted scopes win over the requested ones when Google reports them.
    pub fn from_token_response(
        token: &GoogleTokenResponse,
        secrets: &ClientSecrets,
        requested_scopes: &[String],
    ) -> Self {
        let scopes = match token.scopes() {
            Some(granted) if !granted.is_empty() => {
                granted.iter().map(|s| s.as_str().to_owned()).collect()
            }
            _ => requested_scopes.to_vec(),
        };
        let expiry = token
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Self {
            token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry,
        }
    }
}
