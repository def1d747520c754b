pub mod search_console_api;

pub use search_console_api::SearchConsoleApi;
