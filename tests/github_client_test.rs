//! GitHub Client Tests - HTTP Behaviour Against a Local Server
//!
//! Serves canned GitHub responses from an in-process axum router and
//! checks how the client maps them onto PR states or "unknown".

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

use ship_or_slip_oracle::adapters::github::client::LookupError;
use ship_or_slip_oracle::adapters::github::{GithubClient, GithubClientConfig};
use ship_or_slip_oracle::domain::pull_request::PrState;
use ship_or_slip_oracle::ports::pr_status::PrStatusSource;

const RATE_HEADERS: [(&str, &str); 3] = [
    ("x-ratelimit-remaining", "41"),
    ("x-ratelimit-limit", "60"),
    ("x-ratelimit-reset", "1700000000"),
];

/// Route handler keyed by PR number.
async fn pull(
    Path((_owner, _repo, number)): Path<(String, String, u64)>,
    State(flaky_hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
) -> Response {
    match number {
        42 => (
            StatusCode::OK,
            RATE_HEADERS,
            axum::Json(json!({
                "state": "closed",
                "merged": true,
                "title": "Ship it",
                "user": {"login": "octocat"},
                "merged_at": "2024-05-01T12:00:00Z",
                "closed_at": "2024-05-01T12:00:00Z"
            })),
        )
            .into_response(),
        43 => axum::Json(json!({"state": "closed", "merged": false, "title": "Nope", "user": null}))
            .into_response(),
        44 => axum::Json(json!({"state": "open", "merged": false, "title": "WIP", "user": {"login": "dev"}}))
            .into_response(),
        // Requires a bearer token
        45 => match headers.get(header::AUTHORIZATION) {
            Some(value) if value == "Bearer s3cret" => {
                axum::Json(json!({"state": "open", "merged": false, "title": "Private"})).into_response()
            }
            _ => StatusCode::UNAUTHORIZED.into_response(),
        },
        // Fails once, then succeeds
        50 => {
            if flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                StatusCode::BAD_GATEWAY.into_response()
            } else {
                axum::Json(json!({"state": "closed", "merged": true, "title": "Flaky"})).into_response()
            }
        }
        // Closed, but merge state missing
        46 => axum::Json(json!({"state": "closed", "title": "x"})).into_response(),
        500 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        403 => (
            StatusCode::FORBIDDEN,
            [("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1700000000")],
        )
            .into_response(),
        429 => StatusCode::TOO_MANY_REQUESTS.into_response(),
        99 => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => (StatusCode::NOT_FOUND, axum::Json(json!({"message": "Not Found"}))).into_response(),
    }
}

async fn spawn_server() -> (String, Arc<AtomicUsize>) {
    let flaky_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/repos/:owner/:repo/pulls/:number", get(pull))
        .with_state(Arc::clone(&flaky_hits));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), flaky_hits)
}

fn client(base_url: String, token: Option<&str>) -> GithubClient {
    GithubClient::new(GithubClientConfig {
        base_url,
        token: token.map(str::to_string),
        timeout: Duration::from_secs(5),
        requests_per_minute: 6_000,
        max_concurrent: 4,
        max_retries: 2,
        retry_base_delay: Duration::from_millis(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_merged_pr_and_rate_limit_headers() {
    let (url, _) = spawn_server().await;
    let client = client(url, None);

    let pr = client.pull_request("a/b", 42).await.unwrap();
    assert_eq!(pr.state, PrState::Merged);
    assert_eq!(pr.title, "Ship it");
    assert_eq!(pr.author, "octocat");

    let limits = client.rate_limit_status().await.unwrap();
    assert_eq!(limits.remaining, 41);
    assert_eq!(limits.limit, 60);
}

#[tokio::test]
async fn test_closed_and_open_states() {
    let (url, _) = spawn_server().await;
    let client = client(url, None);

    let closed = client.pull_request("a/b", 43).await.unwrap();
    assert_eq!(closed.state, PrState::Closed);
    assert_eq!(closed.author, "unknown");

    let open = client.pull_request("a/b", 44).await.unwrap();
    assert_eq!(open.state, PrState::Open);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let (url, _) = spawn_server().await;

    assert!(client(url.clone(), None).pull_request("a/b", 45).await.is_none());

    let pr = client(url, Some("s3cret")).pull_request("a/b", 45).await.unwrap();
    assert_eq!(pr.title, "Private");
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (url, hits) = spawn_server().await;
    let client = client(url, None);

    let pr = client.pull_request("a/b", 50).await.unwrap();
    assert_eq!(pr.state, PrState::Merged);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failures_map_to_unknown() {
    let (url, _) = spawn_server().await;
    let client = client(url, None);

    for number in [404, 500, 403, 429, 99] {
        assert!(
            client.pull_request("a/b", number).await.is_none(),
            "PR {number} should be unknown"
        );
    }

    assert!(matches!(client.fetch("a/b", 404).await, Err(LookupError::NotFound)));
    assert!(matches!(client.fetch("a/b", 403).await, Err(LookupError::RateLimited)));
    assert!(matches!(client.fetch("a/b", 429).await, Err(LookupError::RateLimited)));
    assert!(matches!(
        client.fetch("a/b", 500).await,
        Err(LookupError::Status(StatusCode::INTERNAL_SERVER_ERROR))
    ));
    assert!(matches!(client.fetch("a/b", 99).await, Err(LookupError::Malformed(_))));
}

#[tokio::test]
async fn test_closed_without_merge_flag_is_unknown() {
    let (url, _) = spawn_server().await;
    let client = client(url, None);

    assert!(client.pull_request("a/b", 46).await.is_none());
    assert!(matches!(client.fetch("a/b", 46).await, Err(LookupError::Malformed(_))));
}

#[tokio::test]
async fn test_unreachable_host_is_unknown() {
    let client = client("http://127.0.0.1:1".to_string(), None);
    assert!(client.pull_request("a/b", 42).await.is_none());
}
