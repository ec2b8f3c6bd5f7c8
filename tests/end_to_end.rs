//! End-to-end tests: daemon over HTTP against local fixture servers.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;
use prerender::config::PrerenderConfig;
use serde_json::{json, Value};

mod common;

const FIXTURE_HTML: &str = "<!DOCTYPE html><html><head><title>Fixture</title></head><body><p>static</p></body></html>";

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

async fn status_report(client: &reqwest::Client, daemon: &common::Daemon) -> Value {
    client
        .get(daemon.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_render_then_cache_hit() {
    let (fixture, hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser.clone()).await;
    let client = client();

    let query = [
        ("source", "https://example.test/"),
        ("timeout", "5"),
        ("repeat", "2"),
        ("cache", "60"),
    ];

    let first = client.get(daemon.url("/prerender")).query(&query).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache-status"], "MISS");
    let first = first.bytes().await.unwrap();
    assert_eq!(first, FIXTURE_HTML.as_bytes());

    let second = client.get(daemon.url("/prerender")).query(&query).send().await.unwrap();
    assert_eq!(second.headers()["x-cache-status"], "HIT");
    assert_eq!(second.bytes().await.unwrap(), first);

    assert_eq!(hits.load(Ordering::SeqCst), 1, "second call must not fetch");
    assert_eq!(browser.launches.load(Ordering::SeqCst), 1);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_failing_source_exhausts_retries() {
    let (fixture, hits) = common::start_fixture(|| async { (500, "boom".to_string()) }).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser).await;

    let res = client()
        .get(daemon.url("/prerender"))
        .query(&[("source", "https://example.test/"), ("timeout", "5"), ("repeat", "2")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let (fixture, _hits) = common::start_fixture(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, FIXTURE_HTML.to_string())
    })
    .await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser).await;

    let res = client()
        .get(daemon.url("/prerender"))
        .query(&[("source", "https://example.test/slow"), ("timeout", "1")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_source_rejected() {
    let (fixture, hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser.clone()).await;
    let client = client();

    for source in ["", "example.test/page", "/just/a/path"] {
        let res = client
            .get(daemon.url("/prerender"))
            .query(&[("source", source)])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "source {source:?}");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(browser.launches.load(Ordering::SeqCst), 0);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_delete_with_empty_source_flushes_cache() {
    let (fixture, hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser).await;
    let client = client();

    for source in ["https://a.test/", "https://b.test/"] {
        let res = client
            .get(daemon.url("/prerender"))
            .query(&[("source", source), ("cache", "60")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    assert_eq!(status_report(&client, &daemon).await["cache_entries"], 2);

    let res = client
        .delete(daemon.url("/prerender"))
        .json(&json!({ "source": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(status_report(&client, &daemon).await["cache_entries"], 0);

    for source in ["https://a.test/", "https://b.test/"] {
        let res = client
            .get(daemon.url("/prerender"))
            .query(&[("source", source), ("cache", "60")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.headers()["x-cache-status"], "MISS");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_delete_single_source() {
    let (fixture, hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser).await;
    let client = client();

    for source in ["https://a.test/", "https://b.test/"] {
        client
            .get(daemon.url("/prerender"))
            .query(&[("source", source), ("cache", "60")])
            .send()
            .await
            .unwrap();
    }

    let res = client
        .delete(daemon.url("/prerender"))
        .json(&json!({ "source": "https://a.test/" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let b = client
        .get(daemon.url("/prerender"))
        .query(&[("source", "https://b.test/"), ("cache", "60")])
        .send()
        .await
        .unwrap();
    assert_eq!(b.headers()["x-cache-status"], "HIT");
    let a = client
        .get(daemon.url("/prerender"))
        .query(&[("source", "https://a.test/"), ("cache", "60")])
        .send()
        .await
        .unwrap();
    assert_eq!(a.headers()["x-cache-status"], "MISS");
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_meta_scripts_injected_root_first() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<meta name=robots content=noindex>").unwrap();
    std::fs::create_dir_all(dir.path().join("blog")).unwrap();
    std::fs::write(dir.path().join("blog/index.html"), "<meta property=og:type content=article>").unwrap();

    let (fixture, _hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let mut config = PrerenderConfig::default();
    config.meta.dir = Some(dir.path().to_path_buf());
    let daemon = common::start_daemon(config, browser.clone()).await;

    let res = client()
        .get(daemon.url("/prerender"))
        .query(&[("source", "https://example.test/blog/"), ("cache", "0")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cache-status"], "BYPASS");

    let evaluated = browser.evaluated();
    assert_eq!(evaluated.len(), 2);
    assert!(evaluated[0].contains("content=noindex"));
    assert!(evaluated[1].contains("content=article"));

    daemon.shutdown.trigger();
}

#[tokio::test]
async fn test_health_and_graceful_shutdown() {
    let (fixture, _hits) = common::start_static_fixture(FIXTURE_HTML).await;
    let browser = common::HttpFetchLauncher::new(fixture);
    let daemon = common::start_daemon(PrerenderConfig::default(), browser).await;
    let client = client();

    let res = client.get(daemon.url("/health")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    let report = status_report(&client, &daemon).await;
    assert_eq!(report["status"], "ok");
    assert_eq!(report["session_active"], false);

    daemon.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), daemon.task)
        .await
        .expect("daemon did not stop")
        .unwrap();
    assert!(result.is_ok());
}
