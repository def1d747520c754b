use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::middleware::CarriedCredential;
use crate::types::search_analytics::{AnalyticsRow, SiteEntry};
use crate::{GscError, router::GscState};

#[derive(Debug, Deserialize)]
pub struct SiteQuery {
    pub site_url: String,
    #[serde(default)]
    pub page_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub site_url: String,
    pub page_url: String,
}

// The credential extractor runs first so unauthenticated calls get 401
// regardless of their query string.

/// GET /api/sites
pub async fn list_sites(
    State(state): State<GscState>,
    CarriedCredential(cred): CarriedCredential,
) -> Result<Json<Vec<SiteEntry>>, GscError> {
    let sites = state.search_console(&cred).list_sites().await?;
    Ok(Json(sites))
}

/// GET /api/data?site_url&page_filter
pub async fn data_by_date(
    State(state): State<GscState>,
    CarriedCredential(cred): CarriedCredential,
    Query(q): Query<SiteQuery>,
) -> Result<Json<Vec<AnalyticsRow>>, GscError> {
    let rows = state
        .search_console(&cred)
        .query_by_date(&q.site_url, q.page_filter.as_deref())
        .await?;
    Ok(Json(rows))
}

/// GET /api/urls?site_url&page_filter
pub async fn data_by_url(
    State(state): State<GscState>,
    CarriedCredential(cred): CarriedCredential,
    Query(q): Query<SiteQuery>,
) -> Result<Json<Vec<AnalyticsRow>>, GscError> {
    let rows = state
        .search_console(&cred)
        .query_by_url(&q.site_url, q.page_filter.as_deref())
        .await?;
    Ok(Json(rows))
}

/// GET /api/url-timeseries?site_url&page_url
pub async fn url_time_series(
    State(state): State<GscState>,
    CarriedCredential(cred): CarriedCredential,
    Query(q): Query<PageQuery>,
) -> Result<Json<Vec<AnalyticsRow>>, GscError> {
    let rows = state
        .search_console(&cred)
        .query_url_time_series(&q.site_url, &q.page_url)
        .await?;
    Ok(Json(rows))
}
