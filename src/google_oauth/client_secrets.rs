use crate::config::Config;
use crate::error::GscError;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Checked after the configured path, for checkouts that run from the repo root.
const FALLBACK_SECRETS_FILE: &str = "backend/client_secret.json";

/// OAuth client registration, as found in a Google `client_secret.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Resolution order: inline `client_id`/`client_secret`, the inline JSON
    /// document, then the first secrets file that exists.
    pub fn from_config(cfg: &Config) -> Result<Self, GscError> {
        if let (Some(client_id), Some(client_secret)) = (&cfg.client_id, &cfg.client_secret) {
            info!("using inline OAuth client configuration");
            return Ok(Self {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                auth_uri: cfg.auth_uri.to_string(),
                token_uri: cfg.token_uri.to_string(),
            });
        }
        if let Some(raw) = cfg.client_secrets_json.as_deref() {
            info!("using OAuth client secrets from the environment");
            return Self::from_json(raw);
        }
        let candidates = secrets_file_candidates(&cfg.client_secrets_file);
        let path = candidates
            .iter()
            .find(|p| p.exists())
            .unwrap_or(&candidates[0]);
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, GscError> {
        if !path.exists() {
            return Err(GscError::MissingClientSecrets(format!(
                "{} not found; place it next to the backend or set GSC_CLIENT_ID and GSC_CLIENT_SECRET",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        let secrets = Self::from_json(&contents)?;
        info!(path = %path.display(), "loaded OAuth client secrets");
        Ok(secrets)
    }

    /// Accepts both the `web` and `installed` application layouts.
    pub fn from_json(contents: &str) -> Result<Self, GscError> {
        let file: ClientSecretsFile = serde_json::from_str(contents)?;
        file.web.or(file.installed).ok_or_else(|| {
            GscError::MissingClientSecrets(
                "client secrets file has neither a `web` nor an `installed` section".to_string(),
            )
        })
    }
}

fn secrets_file_candidates(configured: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![configured.to_path_buf()];
    let fallback = PathBuf::from(FALLBACK_SECRETS_FILE);
    if configured.is_relative() && fallback.as_path() != configured {
        candidates.push(fallback);
    }
    candidates
}
