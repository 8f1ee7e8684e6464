//! Per-window request parameters

use crate::http::RequestConfig;

/// Path and query for one window's request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    /// Endpoint path, relative to the base URL
    pub path: String,
    /// Query parameters in the order they are sent
    pub query: Vec<(String, String)>,
}

impl RequestParams {
    /// Create params for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a query parameter when a value is present
    #[must_use]
    pub fn param_opt(self, key: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Look up a query parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Convert into an HTTP request config
    pub fn to_request_config(&self) -> RequestConfig {
        self.query
            .iter()
            .fold(RequestConfig::new(), |config, (k, v)| config.query(k, v))
    }
}
