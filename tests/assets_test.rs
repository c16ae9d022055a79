//! Asset cache against a mock origin, directly and through the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use localreel::assets::{AssetCache, AssetFetcher, HttpFetcher, Served};
use localreel::server::{create_router, ServerContext};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manifest() -> Vec<String> {
    ["/", "/index.html", "/app.js", "/manifest.json", "/style.css"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

async fn origin_with_shell() -> MockServer {
    let origin = MockServer::start().await;
    for asset in manifest() {
        Mock::given(method("GET"))
            .and(path(asset.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string(format!("asset {}", asset)),
            )
            .expect(1)
            .mount(&origin)
            .await;
    }
    origin
}

async fn start_server(cache: AssetCache, fetcher: HttpFetcher) -> SocketAddr {
    let ctx = ServerContext {
        cache: Arc::new(cache),
        fetcher: Arc::new(fetcher),
    };
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

#[tokio::test]
async fn http_fetcher_reports_status_and_type() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/javascript")
                .set_body_string("main()"),
        )
        .mount(&origin)
        .await;

    let fetcher = HttpFetcher::new(&origin.uri()).unwrap();
    let response = fetcher.fetch("GET", "/app.js").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/javascript"));
    assert_eq!(&response.body[..], b"main()");

    let missing = fetcher.fetch("GET", "/nope").await.unwrap();
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn installed_shell_is_served_offline() {
    let origin = origin_with_shell().await;
    let dir = tempdir().unwrap();
    let cache = AssetCache::new(dir.path(), "video-stream-pwa-v1");
    let fetcher = HttpFetcher::new(&origin.uri()).unwrap();

    assert_eq!(cache.install(&manifest(), &fetcher).await.unwrap(), 5);

    // Every manifest entry was fetched exactly once; the rest comes from disk.
    for asset in manifest() {
        let (response, served) = cache.respond("GET", &asset, &fetcher).await.unwrap();
        assert_eq!(served, Served::Cache);
        assert_eq!(response.body, format!("asset {}", asset).into_bytes());
    }
    origin.verify().await;
}

#[tokio::test]
async fn install_fails_on_missing_asset() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&origin)
        .await;

    let dir = tempdir().unwrap();
    let cache = AssetCache::new(dir.path(), "v1");
    let fetcher = HttpFetcher::new(&origin.uri()).unwrap();

    assert!(cache.install(&manifest(), &fetcher).await.is_err());
    assert!(!cache.version_dir().exists());
}

#[tokio::test]
async fn server_serves_hits_misses_and_media() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("about"))
        .expect(1)
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("frames"))
        .expect(2)
        .mount(&origin)
        .await;

    let dir = tempdir().unwrap();
    let cache = AssetCache::new(dir.path(), "v1");
    let fetcher = HttpFetcher::new(&origin.uri()).unwrap();
    let addr = start_server(cache, fetcher).await;
    let client = reqwest::Client::new();

    let first = client
        .get(format!("http://{addr}/about.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-localreel-cache"], "miss");
    assert_eq!(first.text().await.unwrap(), "about");

    let second = client
        .get(format!("http://{addr}/about.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.headers()["x-localreel-cache"], "hit");

    for _ in 0..2 {
        let media = client
            .get(format!("http://{addr}/videos/clip.mp4"))
            .send()
            .await
            .unwrap();
        assert_eq!(media.headers()["x-localreel-cache"], "passthrough");
        assert_eq!(media.text().await.unwrap(), "frames");
    }

    origin.verify().await;
}

#[tokio::test]
async fn server_reports_unreachable_origin() {
    let dir = tempdir().unwrap();
    let cache = AssetCache::new(dir.path(), "v1");
    // Nothing listens on port 9 of localhost.
    let fetcher = HttpFetcher::new("http://127.0.0.1:9").unwrap();
    let addr = start_server(cache, fetcher).await;

    let response = reqwest::get(format!("http://{addr}/index.html"))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}
