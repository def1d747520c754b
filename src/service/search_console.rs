use crate::api::SearchConsoleApi;
use crate::error::GscError;
use crate::google_oauth::CredentialRecord;
use crate::service::query::{AnalyticsQuery, QueryWindow};
use crate::types::search_analytics::{AnalyticsRow, SiteEntry};
use tracing::info;
use url::Url;

/// Search Console client bound to one request's carried credential.
pub struct SearchConsoleClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl SearchConsoleClient {
    /// Rebuild an authenticated client from a carried credential record.
    pub fn rehydrate(http: reqwest::Client, base: Url, cred: &CredentialRecord) -> Self {
        Self {
            http,
            base,
            token: cred.token.clone(),
        }
    }

    pub async fn list_sites(&self) -> Result<Vec<SiteEntry>, GscError> {
        let resp = SearchConsoleApi::list_sites(&self.http, &self.base, &self.token).await?;
        info!(count = resp.siteEntry.len(), "listed sites");
        Ok(resp.siteEntry)
    }

    pub async fn query_by_date(
        &self,
        site_url: &str,
        page_filter: Option<&str>,
    ) -> Result<Vec<AnalyticsRow>, GscError> {
        self.run(site_url, AnalyticsQuery::by_date(page_filter, QueryWindow::today()))
            .await
    }

    pub async fn query_by_url(
        &self,
        site_url: &str,
        page_filter: Option<&str>,
    ) -> Result<Vec<AnalyticsRow>, GscError> {
        self.run(site_url, AnalyticsQuery::by_url(page_filter, QueryWindow::today()))
            .await
    }

    pub async fn query_url_time_series(
        &self,
        site_url: &str,
        page_url: &str,
    ) -> Result<Vec<AnalyticsRow>, GscError> {
        self.run(
            site_url,
            AnalyticsQuery::url_time_series(page_url, QueryWindow::today()),
        )
        .await
    }

    async fn run(
        &self,
        site_url: &str,
        query: AnalyticsQuery,
    ) -> Result<Vec<AnalyticsRow>, GscError> {
        let resp = SearchConsoleApi::query(
            &self.http,
            &self.base,
            &self.token,
            site_url,
            &query.to_request(),
        )
        .await?;
        let rows = query.normalize(resp.rows);
        info!(
            site_url,
            shape = ?query.shape,
            filtered = query.filter.is_some(),
            rows = rows.len(),
            "search analytics query complete"
        );
        Ok(rows)
    }
}
