use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use pagedata_core::{
    ApiClient, ContentSource, FetchError, PageQuery, PagedataRenderer, RendererConfig, Scope, Status,
};
use serde_json::{Value, json};
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    params: HashMap<String, String>,
    api_key: Option<String>,
    user_agent: Option<String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn seen(path: String, params: HashMap<String, String>, headers: &HeaderMap) -> Seen {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Seen { path, params, api_key: header("x-api-key"), user_agent: header("user-agent") }
}

/// Mock content API: a header fragment, two pages and a listing.
fn content_api(log: Log) -> Router {
    let pages_log = Arc::clone(&log);
    Router::new()
        .route(
            "/pages/{slug}",
            get(move |Path(slug): Path<String>, Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(seen(format!("/pages/{slug}"), params, &headers));
                    let content = match slug.as_str() {
                        "site-header" => json!({ "title": "Acme" }),
                        "acme-about" => json!({ "text": "Hello World" }),
                        "slow" => {
                            tokio::time::sleep(Duration::from_secs(3)).await;
                            json!({})
                        }
                        "broken" => return Err(StatusCode::INTERNAL_SERVER_ERROR),
                        _ => return Err(StatusCode::NOT_FOUND),
                    };
                    Ok(Json(json!({ "slug": slug, "type": "page", "content": content })))
                }
            }),
        )
        .route(
            "/pages",
            get(move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let log = Arc::clone(&pages_log);
                async move {
                    log.lock().unwrap().push(seen("/pages".to_string(), params, &headers));
                    Json(json!([
                        { "slug": "acme-post-b", "type": "page", "parentPageSlug": "acme-blog", "content": { "text": "B" } },
                        { "slug": "acme-post-a", "type": "page", "parentPageSlug": "acme-blog", "content": { "text": "A" } },
                    ]))
                }
            }),
        )
        .route("/garbage/pages/{slug}", get(|| async { "not json" }))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn setup() -> (RendererConfig, Log) {
    let log: Log = Arc::default();
    let host = serve(content_api(Arc::clone(&log))).await;
    let config = RendererConfig {
        host,
        api_key: "apiKey".to_string(),
        user_agent: "pagedataRenderer/1".to_string(),
        ..Default::default()
    };
    (config, log)
}

#[tokio::test]
async fn test_get_page_sends_status_key_and_agent() {
    let (config, log) = setup().await;
    let client = ApiClient::new(&config).unwrap();

    let page = client.get_page("acme-about", Status::Published).await.unwrap();
    assert_eq!(page.content, json!({ "text": "Hello World" }));

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "/pages/acme-about");
    assert_eq!(seen.params.get("status").map(String::as_str), Some("published"));
    assert_eq!(seen.api_key.as_deref(), Some("apiKey"));
    assert_eq!(seen.user_agent.as_deref(), Some("pagedataRenderer/1"));
}

#[tokio::test]
async fn test_get_pages_query_parameters() {
    let (config, log) = setup().await;
    let client = ApiClient::new(&config).unwrap();

    let query = PageQuery::new(Scope::Parent("acme-blog".into()), Status::Draft);
    let pages = client.get_pages(&query).await.unwrap();

    let slugs: Vec<_> = pages.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, vec!["acme-post-b", "acme-post-a"]);

    let params = log.lock().unwrap()[0].params.clone();
    assert_eq!(params.get("parentPageSlug").map(String::as_str), Some("acme-blog"));
    assert_eq!(params.get("populate").map(String::as_str), Some("content"));
    assert_eq!(params.get("status").map(String::as_str), Some("draft"));
    assert!(!params.contains_key("projectSlug"));
}

#[tokio::test]
async fn test_http_errors_carry_slug_and_status() {
    let (config, _) = setup().await;
    let client = ApiClient::new(&config).unwrap();

    match client.get_page("nope", Status::Published).await.unwrap_err() {
        FetchError::Status { target, status } => {
            assert_eq!(target, "pages/nope");
            assert_eq!(status.as_u16(), 404);
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let err = client.get_page("broken", Status::Published).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 500));
}

#[tokio::test]
async fn test_invalid_body_is_decode_error() {
    let (mut config, _) = setup().await;
    config.host = format!("{}/garbage", config.host);
    let client = ApiClient::new(&config).unwrap();

    let err = client.get_page("acme-about", Status::Published).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RendererConfig { host: format!("http://{addr}"), ..Default::default() };
    let err = ApiClient::new(&config).unwrap().get_page("acme-about", Status::Published).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "got {err:?}");
    assert_eq!(err.target(), Some("pages/acme-about"));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let (mut config, _) = setup().await;
    config.timeout_secs = 1;
    let client = ApiClient::new(&config).unwrap();

    let err = client.get_page("slow", Status::Published).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_render_page_over_http() {
    let (mut config, log) = setup().await;
    let templates = TempDir::new().unwrap();
    let template = templates.path().join("page1.html");
    std::fs::write(&template, "<h1>{{ header.title }}</h1><p>{{ content.text }}</p>").unwrap();
    config.template_root = templates.path().to_path_buf();
    config.common.insert("header".to_string(), "site-header".to_string());

    let renderer = PagedataRenderer::connect(config).unwrap();
    let html = renderer.render_page("acme-about", &template).await.unwrap();

    assert_eq!(html, "<h1>Acme</h1><p>Hello World</p>");
    let statuses: Vec<Value> =
        log.lock().unwrap().iter().map(|s| json!(s.params.get("status"))).collect();
    assert_eq!(statuses, vec![json!("published"), json!("published")]);
}
