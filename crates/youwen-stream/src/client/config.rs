use std::time::Duration;

use crate::config::Settings;

/// Default budget for one streaming exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for [`SseClient`](super::SseClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server root, without a trailing slash.
    pub base_url: String,
    /// Deadline for the whole exchange, from sending the request to stream close.
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
    /// Extra request headers, applied in order.
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            timeout: DEFAULT_TIMEOUT,
            bearer_token: None,
            headers: Vec::new(),
        }
    }

    /// Builds a config from loaded settings (API URL and token).
    pub fn from_settings(settings: &Settings) -> Self {
        let config = Self::new(settings.api_url.clone());
        match settings.token.as_deref() {
            Some(token) => config.bearer_token(token),
            None => config,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the bearer credential. Blank tokens are ignored.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into()).filter(|t: &String| !t.trim().is_empty());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
