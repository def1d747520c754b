pub mod query;
pub mod search_console;

pub use query::{AnalyticsQuery, QueryShape, QueryWindow};
pub use search_console::SearchConsoleClient;
