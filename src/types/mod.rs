pub mod search_analytics;
