//! Same-origin HTML proxy for documents in the public storage buckets.
//!
//! Browsers refuse to render HTML served from object storage with a
//! generic content type, so `/api/html-proxy?url=...` re-serves allowed
//! documents as `text/html`.

pub mod fetcher;
pub mod server;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::config::ProxyConfig;

pub use fetcher::{HtmlFetcher, ReqwestFetcher, UpstreamResponse};
pub use server::{ProxyParams, ProxyState, html_proxy, router, serve, serve_on};

/// Hosts and paths the proxy will fetch from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    host_suffixes: Vec<String>,
    path_markers: Vec<String>,
}

impl AllowList {
    pub fn new(host_suffixes: Vec<String>, path_markers: Vec<String>) -> Self {
        Self {
            host_suffixes,
            path_markers,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.allowed_host_suffixes.clone(),
            config.allowed_path_markers.clone(),
        )
    }

    /// Parsed URL when `raw` is an http(s) URL on an allowed host whose path
    /// contains an allowed marker
    pub fn check(&self, raw: &str) -> Option<Url> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str()?;
        let host_ok = self.host_suffixes.iter().any(|s| host.ends_with(s.as_str()));
        let path_ok = self.path_markers.iter().any(|m| url.path().contains(m.as_str()));
        (host_ok && path_ok).then_some(url)
    }
}

/// Proxy failures, each rendered as `{"error": "<message>"}`
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing url")]
    MissingUrl,

    #[error("URL not allowed")]
    NotAllowed,

    #[error("Upstream error: {status} {reason}")]
    Upstream { status: u16, reason: String },

    /// Transport or body failure; the detail is logged, never returned
    #[error("Server error")]
    Server(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl | ProxyError::NotAllowed => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            ProxyError::Server(detail) => error!("Proxy failure: {}", detail),
            other => warn!("Proxy rejected request: {}", other),
        }

        let body = json!({ "error": self.to_string() }).to_string();
        (
            self.status(),
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_list() -> AllowList {
        AllowList::from_config(&ProxyConfig::default())
    }

    #[test]
    fn test_allows_public_bucket_documents() {
        let list = allow_list();
        assert!(
            list.check("https://abc.supabase.co/storage/v1/object/public/ai-apps/apps/1_x.html")
                .is_some()
        );
        assert!(
            list.check("https://abc.supabase.co/storage/v1/object/public/teaching/plan/a.html")
                .is_some()
        );
    }

    #[test]
    fn test_rejects_other_hosts_paths_and_garbage() {
        let list = allow_list();
        assert!(
            list.check("https://evil.example.com/storage/v1/object/public/ai-apps/a.html")
                .is_none()
        );
        assert!(
            list.check("https://abc.supabase.co/storage/v1/object/private/ai-apps/a.html")
                .is_none()
        );
        assert!(list.check("not a url").is_none());
        assert!(
            list.check("ftp://abc.supabase.co/storage/v1/object/public/ai-apps/a.html")
                .is_none()
        );
    }

    #[test]
    fn test_host_suffix_is_not_a_substring_match() {
        let list = allow_list();
        assert!(
            list.check("https://abc.supabase.co.evil.com/storage/v1/object/public/ai-apps/a.html")
                .is_none()
        );
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ProxyError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::Upstream {
                status: 404,
                reason: "Not Found".to_string()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::Server("boom".to_string()).to_string(),
            "Server error"
        );
    }
}
