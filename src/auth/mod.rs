//! Authentication module
//!
//! The AppMetrica API authenticates every call with a static token sent as
//! `Authorization: OAuth <token>`. There is no refresh flow.

mod authenticator;

pub use authenticator::{is_auth_failure, AuthConfig, Authenticator};
