use anyhow::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use teach_portal::config::ProxyConfig;
use teach_portal::proxy::{AllowList, HtmlFetcher, ProxyState, UpstreamResponse, serve_on};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Default)]
struct FakeStorage {
    calls: AtomicUsize,
}

#[async_trait]
impl HtmlFetcher for FakeStorage {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.path().ends_with("missing.html") {
            return Ok(UpstreamResponse {
                status: 404,
                reason: "Not Found".to_string(),
                body: String::new(),
            });
        }
        Ok(UpstreamResponse {
            status: 200,
            reason: "OK".to_string(),
            body: "<html><body>分数墙</body></html>".to_string(),
        })
    }
}

struct RunningProxy {
    address: SocketAddr,
    fetcher: Arc<FakeStorage>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl RunningProxy {
    async fn start() -> Self {
        let config = ProxyConfig::default();
        let fetcher = Arc::new(FakeStorage::default());
        let state = ProxyState::new(
            AllowList::from_config(&config),
            fetcher.clone(),
            config.max_age_secs,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve_on(listener, state, async move {
            let _ = rx.await;
        }));

        Self {
            address,
            fetcher,
            shutdown,
            handle,
        }
    }

    fn proxy_url(&self, target: &str) -> String {
        let mut url = Url::parse(&format!("http://{}/api/html-proxy", self.address)).unwrap();
        url.query_pairs_mut().append_pair("url", target);
        url.to_string()
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let proxy = RunningProxy::start().await;
    let response = reqwest::get(format!("http://{}/health", proxy.address))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
    proxy.stop().await;
}

#[tokio::test]
async fn test_missing_url() {
    let proxy = RunningProxy::start().await;
    let response = reqwest::get(format!("http://{}/api/html-proxy", proxy.address))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(error_message(response).await, "Missing url");
    proxy.stop().await;
}

#[tokio::test]
async fn test_repeated_url_parameter_is_missing_url() {
    let proxy = RunningProxy::start().await;
    let response = reqwest::get(format!(
        "http://{}/api/html-proxy?url=a&url=b",
        proxy.address
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(error_message(response).await, "Missing url");
    assert_eq!(proxy.fetcher.calls.load(Ordering::SeqCst), 0);
    proxy.stop().await;
}

#[tokio::test]
async fn test_disallowed_url_never_fetched() {
    let proxy = RunningProxy::start().await;
    let targets = [
        "https://evil.example.com/storage/v1/object/public/ai-apps/apps/x.html",
        "https://abc.supabase.co/rest/v1/resources",
        "ftp://abc.supabase.co/storage/v1/object/public/x.html",
        "not a url",
    ];
    for target in targets {
        let response = reqwest::get(proxy.proxy_url(target)).await.unwrap();
        assert_eq!(response.status(), 400, "{target}");
        assert_eq!(error_message(response).await, "URL not allowed");
    }
    assert_eq!(proxy.fetcher.calls.load(Ordering::SeqCst), 0);
    proxy.stop().await;
}

#[tokio::test]
async fn test_allowed_url_returns_html() {
    let proxy = RunningProxy::start().await;
    let target = "https://abc.supabase.co/storage/v1/object/public/ai-apps/apps/1.html";
    let response = reqwest::get(proxy.proxy_url(target)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert_eq!(response.headers()["cache-control"], "public, max-age=300");
    assert_eq!(
        response.text().await.unwrap(),
        "<html><body>分数墙</body></html>"
    );
    assert_eq!(proxy.fetcher.calls.load(Ordering::SeqCst), 1);
    proxy.stop().await;
}

#[tokio::test]
async fn test_upstream_status_is_forwarded() {
    let proxy = RunningProxy::start().await;
    let target = "https://abc.supabase.co/storage/v1/object/public/ai-apps/apps/missing.html";
    let response = reqwest::get(proxy.proxy_url(target)).await.unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(error_message(response).await, "Upstream error: 404 Not Found");
    proxy.stop().await;
}
