pub mod client_secrets;
pub mod credentials;
pub mod flow;

pub use client_secrets::ClientSecrets;
pub use credentials::CredentialRecord;
pub use flow::{AuthorizationRequest, GoogleOauthFlow, OAuthFlowOptions};
