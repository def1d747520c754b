use crate::types::search_analytics::{
    AnalyticsRow, ApiDataRow, Dimension, DimensionFilter, DimensionFilterGroup, DimensionKey,
    FilterOperator, SearchAnalyticsRequest,
};
use chrono::{Days, Local, NaiveDate};
use tracing::warn;

/// Days covered before the end date; the window includes both ends.
pub const WINDOW_DAYS: u64 = 10;
/// Upstream truncates anything beyond this.
pub const ROW_LIMIT: u32 = 25_000;
const DATA_STATE: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn ending(end: NaiveDate) -> Self {
        Self {
            start: end - Days::new(WINDOW_DAYS),
            end,
        }
    }

    pub fn today() -> Self {
        Self::ending(Local::now().date_naive())
    }
}

/// Grouping and ordering of a query's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Keyed by date, ascending.
    ByDate,
    /// Keyed by page URL, most clicks first.
    ByUrl,
}

impl QueryShape {
    fn dimension(self) -> Dimension {
        match self {
            QueryShape::ByDate => Dimension::Date,
            QueryShape::ByUrl => Dimension::Page,
        }
    }

    fn key(self, value: String) -> DimensionKey {
        match self {
            QueryShape::ByDate => DimensionKey::Date(value),
            QueryShape::ByUrl => DimensionKey::Url(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFilter {
    pub operator: FilterOperator,
    pub expression: String,
}

/// A single Search Analytics query: one dimension, at most one page filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsQuery {
    pub shape: QueryShape,
    pub filter: Option<PageFilter>,
    pub window: QueryWindow,
}

impl AnalyticsQuery {
    pub fn new(
        shape: QueryShape,
        operator: FilterOperator,
        expression: Option<&str>,
        window: QueryWindow,
    ) -> Self {
        let filter = expression
            .filter(|e| !e.is_empty())
            .map(|e| PageFilter {
                operator,
                expression: e.to_string(),
            });
        Self {
            shape,
            filter,
            window,
        }
    }

    /// Daily totals, optionally limited to pages whose URL contains `page_filter`.
    pub fn by_date(page_filter: Option<&str>, window: QueryWindow) -> Self {
        Self::new(QueryShape::ByDate, FilterOperator::Contains, page_filter, window)
    }

    /// Per-page totals, optionally limited to pages whose URL contains `page_filter`.
    pub fn by_url(page_filter: Option<&str>, window: QueryWindow) -> Self {
        Self::new(QueryShape::ByUrl, FilterOperator::Contains, page_filter, window)
    }

    /// Daily totals for exactly one page.
    pub fn url_time_series(page_url: &str, window: QueryWindow) -> Self {
        Self::new(
            QueryShape::ByDate,
            FilterOperator::Equals,
            Some(page_url),
            window,
        )
    }

    pub fn to_request(&self) -> SearchAnalyticsRequest {
        let dimension_filter_groups = self
            .filter
            .iter()
            .map(|f| DimensionFilterGroup {
                filters: vec![DimensionFilter {
                    dimension: Dimension::Page,
                    operator: f.operator,
                    expression: f.expression.clone(),
                }],
            })
            .collect();

        SearchAnalyticsRequest {
            start_date: self.window.start.to_string(),
            end_date: self.window.end.to_string(),
            dimensions: vec![self.shape.dimension()],
            dimension_filter_groups,
            row_limit: ROW_LIMIT,
            data_state: DATA_STATE,
        }
    }

    /// Map raw rows into [`AnalyticsRow`]s and apply the shape's stable ordering.
    pub fn normalize(&self, rows: Vec<ApiDataRow>) -> Vec<AnalyticsRow> {
        let mut out: Vec<AnalyticsRow> = rows
            .into_iter()
            .filter_map(|row| {
                let Some(key) = row.keys.into_iter().next() else {
                    warn!("dropping analytics row without dimension keys");
                    return None;
                };
                Some(AnalyticsRow {
                    key: self.shape.key(key),
                    clicks: to_count(row.clicks),
                    impressions: to_count(row.impressions),
                    ctr: row.ctr,
                    position: row.position,
                })
            })
            .collect();

        match self.shape {
            // ISO-8601 dates are fixed width, so string order is date order.
            QueryShape::ByDate => out.sort_by(|a, b| a.key.value().cmp(b.key.value())),
            QueryShape::ByUrl => out.sort_by(|a, b| b.clicks.cmp(&a.clicks)),
        }
        out
    }
}

fn to_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.round() as u64
    } else {
        0
    }
}
