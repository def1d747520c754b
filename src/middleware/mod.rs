pub mod credential;

pub use credential::{CarriedCredential, attach_credential};
