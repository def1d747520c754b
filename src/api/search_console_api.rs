use crate::error::{GoogleApiError, GscError};
use crate::types::search_analytics::{
    SearchAnalyticsRequest, SearchAnalyticsResponse, SitesListResponse,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// Stateless calls against the Search Console REST API.
pub struct SearchConsoleApi;

impl SearchConsoleApi {
    pub async fn list_sites(
        client: &reqwest::Client,
        base: &Url,
        token: &str,
    ) -> Result<SitesListResponse, GscError> {
        let url = endpoint(base, &["webmasters", "v3", "sites"])?;
        let resp = client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(upstream)?;
        read_json(resp).await
    }

    pub async fn query(
        client: &reqwest::Client,
        base: &Url,
        token: &str,
        site_url: &str,
        body: &SearchAnalyticsRequest,
    ) -> Result<SearchAnalyticsResponse, GscError> {
        let url = endpoint(
            base,
            &[
                "webmasters",
                "v3",
                "sites",
                site_url,
                "searchAnalytics",
                "query",
            ],
        )?;
        debug!(%url, start = %body.start_date, end = %body.end_date, "searchAnalytics.query");
        let resp = client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(upstream)?;
        read_json(resp).await
    }
}

/// Append path segments to `base`, percent-encoding each one (site URLs contain `/`).
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GscError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GscError::Config(format!("{base} cannot be used as an API base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GscError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = GoogleApiError::describe(status, &body);
        warn!(%status, %message, "Search Console request rejected");
        return Err(GscError::UpstreamQueryFailed(message));
    }
    resp.json::<T>().await.map_err(upstream)
}

fn upstream(e: reqwest::Error) -> GscError {
    GscError::UpstreamQueryFailed(e.to_string())
}
