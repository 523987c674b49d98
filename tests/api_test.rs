// Integration tests for the movie API and its rate limiting middleware.
//
// Requests go through the full router with an in-memory store. The peer
// address normally supplied by the server is injected with MockConnectInfo.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use futures::future::join_all;
use marquee::config::{AppConfig, LimiterConfig};
use marquee::http::{router, AppState};
use marquee::movies::SqliteMovieStore;
use marquee::ratelimit::{Clock, ManualClock, RateLimiter};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ── Test harness ──────────────────────────────────────────────────────────────

struct TestApp {
    app: Router,
    limiter: Arc<RateLimiter>,
    clock: Arc<ManualClock>,
}

fn peer() -> SocketAddr {
    "203.0.113.7:50000".parse().unwrap()
}

fn spawn_app(limiter: LimiterConfig, trust_proxy: bool) -> TestApp {
    let mut config = AppConfig::default();
    config.limiter = limiter;
    config.server.trust_proxy = trust_proxy;
    config.server.environment = "testing".to_string();

    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::with_clock(
        &config.limiter,
        clock.clone() as Arc<dyn Clock>,
    ));
    let movies = Arc::new(SqliteMovieStore::in_memory().unwrap());

    let state = AppState::new(&config, limiter.clone(), movies);
    let app = router(state).layer(MockConnectInfo(peer()));

    TestApp {
        app,
        limiter,
        clock,
    }
}

/// Limiter switched off so CRUD tests never hit it.
fn unlimited() -> LimiterConfig {
    LimiterConfig {
        enabled: false,
        ..LimiterConfig::default()
    }
}

fn limited(rps: f64, burst: u32) -> LimiterConfig {
    LimiterConfig {
        enabled: true,
        rps,
        burst,
        ..LimiterConfig::default()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_body(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, body) = send(app, with_body("POST", "/v1/movies", &body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["movie"].clone()
}

async fn seed(app: &Router) {
    for movie in [
        json!({"title": "Moana", "year": 2016, "runtime": "107 mins", "genres": ["animation", "adventure"]}),
        json!({"title": "Black Panther", "year": 2018, "runtime": "134 mins", "genres": ["action", "adventure"]}),
        json!({"title": "Deadpool", "year": 2016, "runtime": "108 mins", "genres": ["action", "comedy"]}),
        json!({"title": "The Breakfast Club", "year": 1985, "runtime": "96 mins", "genres": ["drama"]}),
    ] {
        create(app, movie).await;
    }
}

// ── Rate limiting ─────────────────────────────────────────────────────────────

/// Four requests pass, the next two are rejected, one second later one more
/// passes.
#[tokio::test]
async fn test_burst_then_reject_then_refill() {
    let t = spawn_app(limited(2.0, 4), false);

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );

    t.clock.advance(Duration::from_secs(1));
    let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);

    let remaining = t.limiter.available_tokens("203.0.113.7").unwrap();
    assert!((remaining - 1.0).abs() < 1e-9, "remaining = {}", remaining);
}

#[tokio::test]
async fn test_rejection_envelope() {
    let t = spawn_app(limited(1.0, 1), false);

    send(&t.app, get("/v1/healthcheck")).await;
    let (status, body) = send(&t.app, get("/v1/healthcheck")).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({"error": "rate limit exceeded"}));
}

/// A rejected request never reaches its handler.
#[tokio::test]
async fn test_rejected_request_has_no_side_effects() {
    let t = spawn_app(limited(1.0, 1), false);

    let movie = json!({"title": "Moana", "year": 2016, "runtime": "107 mins", "genres": ["animation"]});
    create(&t.app, movie.clone()).await;

    let (status, _) = send(&t.app, with_body("POST", "/v1/movies", &movie.to_string())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    t.clock.advance(Duration::from_secs(1));
    let (status, body) = send(&t.app, get("/v1/movies")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["total_records"], 1);
}

/// Unknown routes and wrong methods still count against the client.
#[tokio::test]
async fn test_limit_applies_to_every_route() {
    let t = spawn_app(limited(1.0, 2), false);

    let (status, _) = send(&t.app, get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&t.app, with_body("PUT", "/v1/movies", "{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_clients_are_isolated() {
    let t = spawn_app(limited(1.0, 1), true);

    let from = |ip: &str| {
        Request::builder()
            .uri("/v1/healthcheck")
            .header("X-Forwarded-For", format!("{}, 10.0.0.1", ip))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&t.app, from("198.51.100.1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, from("198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client still has its full burst
    let (status, _) = send(&t.app, from("198.51.100.2")).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(t.limiter.client_count(), 2);
    assert!(t.limiter.available_tokens("203.0.113.7").is_none());
}

/// Without trust_proxy the header is ignored and everyone shares the peer's
/// bucket.
#[tokio::test]
async fn test_forwarded_header_ignored_without_trust() {
    let t = spawn_app(limited(1.0, 1), false);

    let spoofed = Request::builder()
        .uri("/v1/healthcheck")
        .header("X-Forwarded-For", "198.51.100.9")
        .body(Body::empty())
        .unwrap();

    send(&t.app, get("/v1/healthcheck")).await;
    let (status, _) = send(&t.app, spoofed).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(t.limiter.client_count(), 1);
}

#[tokio::test]
async fn test_disabled_limiter_allows_everything() {
    let t = spawn_app(
        LimiterConfig {
            enabled: false,
            rps: 0.001,
            burst: 1,
            ..LimiterConfig::default()
        },
        false,
    );

    for _ in 0..50 {
        let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(t.limiter.client_count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_never_exceed_burst() {
    let t = spawn_app(limited(0.001, 5), false);

    let responses = join_all((0..40).map(|_| send(&t.app, get("/v1/healthcheck")))).await;
    let allowed = responses
        .iter()
        .filter(|(status, _)| *status == StatusCode::OK)
        .count();

    assert_eq!(allowed, 5);
    assert_eq!(t.limiter.client_count(), 1);
}

#[tokio::test]
async fn test_idle_client_is_forgotten() {
    let t = spawn_app(limited(1.0, 1), false);

    send(&t.app, get("/v1/healthcheck")).await;
    let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    t.clock.advance(Duration::from_secs(181));
    assert_eq!(t.limiter.sweep(), 1);
    assert_eq!(t.limiter.client_count(), 0);

    let (status, _) = send(&t.app, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Healthcheck ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_healthcheck() {
    let t = spawn_app(unlimited(), false);

    let (status, body) = send(&t.app, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "testing");
    assert_eq!(body["system_info"]["version"], env!("CARGO_PKG_VERSION"));
}

// ── Movies ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_and_show_movie() {
    let t = spawn_app(unlimited(), false);

    let response = t
        .app
        .clone()
        .oneshot(with_body(
            "POST",
            "/v1/movies",
            r#"{"title":"Moana","year":2016,"runtime":"107 mins","genres":["animation","adventure"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["location"], "/v1/movies/1");

    let (status, body) = send(&t.app, get("/v1/movies/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"movie": {
            "id": 1,
            "title": "Moana",
            "year": 2016,
            "runtime": "107 mins",
            "genres": ["animation", "adventure"],
            "version": 1
        }})
    );
}

#[tokio::test]
async fn test_show_missing_or_bad_id() {
    let t = spawn_app(unlimited(), false);

    for uri in ["/v1/movies/99", "/v1/movies/0", "/v1/movies/abc"] {
        let (status, body) = send(&t.app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(
            body,
            json!({"error": "the requested resource could not be found"})
        );
    }
}

#[tokio::test]
async fn test_method_not_allowed() {
    let t = spawn_app(unlimited(), false);

    let (status, body) = send(&t.app, with_body("PUT", "/v1/movies/1", "{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body,
        json!({"error": "the PUT method is not supported for this resource"})
    );
}

#[tokio::test]
async fn test_create_rejects_bad_json() {
    let t = spawn_app(unlimited(), false);

    let cases = [
        ("", "body must not be empty"),
        (r#"{"title": "Moana""#, "body contains badly-formed JSON"),
        (r#"{"rating": 5}"#, "body contains unknown key \"rating\""),
        (r#"{"title": "Moana"} {}"#, "body must only contain a single JSON value"),
        (r#"{"runtime": "107 minutes"}"#, "invalid runtime format"),
    ];

    for (input, expected) in cases {
        let (status, body) = send(&t.app, with_body("POST", "/v1/movies", input)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", input);
        assert_eq!(body, json!({"error": expected}), "{}", input);
    }

    // Larger than the default 1 MiB limit
    let oversized = format!(r#"{{"title": "{}"}}"#, "a".repeat(1_048_576));
    let (status, body) = send(&t.app, with_body("POST", "/v1/movies", &oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "body must not be larger than 1048576 bytes"})
    );

    // Position-bearing messages
    let cases = [
        (r#"{"title": "Moana", }"#, "body contains badly-formed JSON (at line 1 column "),
        (r#"{"title": 123}"#, "body contains incorrect JSON type (at line 1 column "),
    ];

    for (input, prefix) in cases {
        let (status, body) = send(&t.app, with_body("POST", "/v1/movies", input)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", input);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with(prefix), "{}", message);
    }
}

#[tokio::test]
async fn test_create_rejects_invalid_movie() {
    let t = spawn_app(unlimited(), false);

    let (status, body) = send(
        &t.app,
        with_body(
            "POST",
            "/v1/movies",
            r#"{"title":"","year":1500,"runtime":"-1 mins","genres":["drama","drama"]}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({"error": {
            "title": "must be provided",
            "year": "must be greater than 1888",
            "runtime": "must be a positive integer",
            "genres": "must not contain duplicate values"
        }})
    );
}

#[tokio::test]
async fn test_update_movie() {
    let t = spawn_app(unlimited(), false);
    seed(&t.app).await;

    let (status, body) = send(
        &t.app,
        with_body("PATCH", "/v1/movies/3", r#"{"year": 2017}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["movie"]["title"], "Deadpool");
    assert_eq!(body["movie"]["year"], 2017);
    assert_eq!(body["movie"]["version"], 2);
}

#[tokio::test]
async fn test_update_with_stale_version_conflicts() {
    let t = spawn_app(unlimited(), false);
    seed(&t.app).await;

    let stale = Request::builder()
        .method("PATCH")
        .uri("/v1/movies/1")
        .header("Content-Type", "application/json")
        .header("X-Expected-Version", "7")
        .body(Body::from(r#"{"title": "Moana II"}"#))
        .unwrap();

    let (status, body) = send(&t.app, stale).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        json!({"error": "unable to update the record due to an edit conflict, please try again"})
    );

    let (_, body) = send(&t.app, get("/v1/movies/1")).await;
    assert_eq!(body["movie"]["title"], "Moana");
    assert_eq!(body["movie"]["version"], 1);
}

#[tokio::test]
async fn test_update_rejects_invalid_result() {
    let t = spawn_app(unlimited(), false);
    seed(&t.app).await;

    let (status, body) = send(
        &t.app,
        with_body("PATCH", "/v1/movies/1", r#"{"genres": []}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["genres"], "must contain at least 1 genre");
}

#[tokio::test]
async fn test_delete_movie() {
    let t = spawn_app(unlimited(), false);
    seed(&t.app).await;

    let delete = Request::builder()
        .method("DELETE")
        .uri("/v1/movies/2")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "movie successfully deleted"}));

    let (status, _) = send(&t.app, get("/v1/movies/2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let again = Request::builder()
        .method("DELETE")
        .uri("/v1/movies/2")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, again).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_movies_with_filters() {
    let t = spawn_app(unlimited(), false);
    seed(&t.app).await;

    let (status, body) = send(&t.app, get("/v1/movies?genres=adventure&sort=-year")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Black Panther", "Moana"]);
    assert_eq!(
        body["metadata"],
        json!({
            "current_page": 1,
            "page_size": 20,
            "first_page": 1,
            "last_page": 1,
            "total_records": 2
        })
    );

    let (_, body) = send(&t.app, get("/v1/movies?title=club")).await;
    assert_eq!(body["movies"][0]["title"], "The Breakfast Club");

    let (_, body) = send(&t.app, get("/v1/movies?page=2&page_size=3&sort=id")).await;
    assert_eq!(body["movies"].as_array().unwrap().len(), 1);
    assert_eq!(body["movies"][0]["id"], 4);
    assert_eq!(body["metadata"]["last_page"], 2);
}

#[tokio::test]
async fn test_list_movies_empty_metadata() {
    let t = spawn_app(unlimited(), false);

    let (status, body) = send(&t.app, get("/v1/movies?title=nothing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"movies": [], "metadata": {}}));
}

#[tokio::test]
async fn test_list_movies_rejects_bad_query() {
    let t = spawn_app(unlimited(), false);

    let (status, body) = send(&t.app, get("/v1/movies?page=0&page_size=500&sort=rating")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({"error": {
            "page": "must be greater than zero",
            "page_size": "must be a maximum of 100",
            "sort": "invalid sort value"
        }})
    );
}
