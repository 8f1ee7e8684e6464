//! Authenticator implementation
//!
//! Applies a static token header to outgoing requests.

use reqwest::{RequestBuilder, StatusCode};

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Static token sent in a header as `<scheme> <token>`
    Token {
        /// Header name (usually `Authorization`)
        header_name: String,
        /// Scheme placed before the token (e.g. `OAuth`)
        scheme: String,
        /// The token value
        token: String,
    },
}

impl AuthConfig {
    /// AppMetrica's `Authorization: OAuth <token>` scheme
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::Token {
            header_name: "Authorization".to_string(),
            scheme: "OAuth".to_string(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::None => f.write_str("None"),
            AuthConfig::Token {
                header_name,
                scheme,
                ..
            } => f
                .debug_struct("Token")
                .field("header_name", header_name)
                .field("scheme", scheme)
                .field("token", &"***")
                .finish(),
        }
    }
}

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    config: AuthConfig,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config {
            AuthConfig::None => req,
            AuthConfig::Token {
                header_name,
                scheme,
                token,
            } => req.header(header_name.as_str(), format!("{scheme} {token}")),
        }
    }

    /// Whether any credentials are attached
    pub fn is_configured(&self) -> bool {
        !matches!(self.config, AuthConfig::None)
    }
}

/// Statuses that mean the credentials were rejected and retrying cannot help
pub fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}
