use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A site the signed-in account can see. Passed through untouched.
pub type SiteEntry = Value;

/// Response of `GET webmasters/v3/sites`.
#[derive(Debug, Clone, Deserialize)]
#[allow(non_snake_case)]
pub struct SitesListResponse {
    #[serde(default)]
    pub siteEntry: Vec<SiteEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Date,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Contains,
    Equals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionFilter {
    pub dimension: Dimension,
    pub operator: FilterOperator,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionFilterGroup {
    pub filters: Vec<DimensionFilter>,
}

/// Body of `POST webmasters/v3/sites/{siteUrl}/searchAnalytics/query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimension_filter_groups: Vec<DimensionFilterGroup>,
    pub row_limit: u32,
    pub data_state: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<ApiDataRow>,
}

/// Raw row as reported by Google; metrics arrive as JSON doubles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiDataRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// Dimension value of a normalized row. Serialized as a `date` or `url` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKey {
    Date(String),
    Url(String),
}

impl DimensionKey {
    pub fn value(&self) -> &str {
        match self {
            DimensionKey::Date(v) | DimensionKey::Url(v) => v,
        }
    }
}

/// Normalized analytics row handed to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(flatten)]
    pub key: DimensionKey,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}
