use anyhow::{Context, Result};
use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{debug, error, info};

use super::fetcher::{HtmlFetcher, ReqwestFetcher};
use super::{AllowList, ProxyError};
use crate::config::ProxyConfig;

#[derive(Debug, Clone)]
pub struct ProxyState {
    pub allow_list: Arc<AllowList>,
    pub fetcher: Arc<dyn HtmlFetcher>,
    pub max_age_secs: u64,
}

impl ProxyState {
    pub fn new(allow_list: AllowList, fetcher: Arc<dyn HtmlFetcher>, max_age_secs: u64) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
            fetcher,
            max_age_secs,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        Ok(Self::new(
            AllowList::from_config(config),
            Arc::new(fetcher),
            config.max_age_secs,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// `GET /api/html-proxy?url=...`
///
/// A query string that does not yield a single `url` value counts as a
/// missing url.
pub async fn html_proxy(
    State(state): State<ProxyState>,
    params: Result<Query<ProxyParams>, QueryRejection>,
) -> Result<Response, ProxyError> {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!("Unreadable proxy query: {}", rejection);
            ProxyParams::default()
        }
    };
    let raw = params
        .url
        .filter(|u| !u.is_empty())
        .ok_or(ProxyError::MissingUrl)?;
    let url = state.allow_list.check(&raw).ok_or(ProxyError::NotAllowed)?;

    let upstream = state
        .fetcher
        .fetch(&url)
        .await
        .map_err(|e| ProxyError::Server(format!("{e:#}")))?;

    if !upstream.is_success() {
        return Err(ProxyError::Upstream {
            status: upstream.status,
            reason: upstream.reason,
        });
    }

    info!("Proxied {} ({} bytes)", url, upstream.body.len());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.max_age_secs),
            ),
        ],
        upstream.body,
    )
        .into_response())
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/html-proxy", get(html_proxy))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, state: ProxyState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!("HTML proxy listening on {}", address);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Proxy server failed")?;
    info!("HTML proxy stopped");
    Ok(())
}

/// Bind to the configured address and serve until Ctrl+C or SIGTERM
pub async fn serve(config: &ProxyConfig) -> Result<()> {
    let state = ProxyState::from_config(config)?;
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve_on(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::fetcher::UpstreamResponse;
    use async_trait::async_trait;
    use url::Url;

    const ALLOWED: &str = "https://abc.supabase.co/storage/v1/object/public/ai-apps/apps/1_x.html";

    #[derive(Debug)]
    enum Stub {
        Page(u16, &'static str),
        Broken,
    }

    #[async_trait]
    impl HtmlFetcher for Stub {
        async fn fetch(&self, _url: &Url) -> Result<UpstreamResponse> {
            match self {
                Stub::Page(status, body) => Ok(UpstreamResponse {
                    status: *status,
                    reason: StatusCode::from_u16(*status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or_default()
                        .to_string(),
                    body: body.to_string(),
                }),
                Stub::Broken => anyhow::bail!("connection reset"),
            }
        }
    }

    fn state(stub: Stub) -> ProxyState {
        ProxyState::new(
            AllowList::from_config(&ProxyConfig::default()),
            Arc::new(stub),
            300,
        )
    }

    async fn call(stub: Stub, url: Option<&str>) -> Response {
        let params = ProxyParams {
            url: url.map(String::from),
        };
        html_proxy(State(state(stub)), Ok(Query(params)))
            .await
            .into_response()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_success_serves_html() {
        let response = call(Stub::Page(200, "<h1>hi</h1>"), Some(ALLOWED)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=300"
        );
        assert_eq!(body_text(response).await, "<h1>hi</h1>");
    }

    #[tokio::test]
    async fn test_missing_url() {
        for url in [None, Some("")] {
            let response = call(Stub::Page(200, ""), url).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, r#"{"error":"Missing url"}"#);
        }
    }

    #[tokio::test]
    async fn test_disallowed_url() {
        let response = call(Stub::Page(200, ""), Some("https://example.com/a.html")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(body_text(response).await, r#"{"error":"URL not allowed"}"#);
    }

    #[tokio::test]
    async fn test_upstream_status_is_forwarded() {
        let response = call(Stub::Page(404, "nope"), Some(ALLOWED)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            r#"{"error":"Upstream error: 404 Not Found"}"#
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_server_error() {
        let response = call(Stub::Broken, Some(ALLOWED)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, r#"{"error":"Server error"}"#);
    }
}
