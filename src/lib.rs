pub mod api;
pub mod config;
pub mod error;
pub mod google_oauth;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::GscError;
pub use google_oauth::CredentialRecord;
pub use router::{GscState, gsc_router};
