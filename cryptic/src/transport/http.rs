//! HTTP and SSE adapter.
//!
//! A thin axum router over [`PhaseScheduler`]. Sessions, payments and
//! password handling live upstream: player identity arrives in the trusted
//! `x-user-id` / `x-user-name` headers and admin calls carry `x-admin-key`.
//!
//! Observers connect to `GET /sse`; the first frame is always a `STATE`
//! snapshot, followed by every published event in order.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cycle::{CycleEvent, Player};
use crate::error::{GenerateError, TransportError};
use crate::observability::metrics;
use crate::phase::{GenerateRequest, PhaseScheduler};

/// Largest accepted request body.
pub const MAX_BODY_SIZE: usize = 16 * 1024;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the display name.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Configuration for the HTTP listener.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to; port 0 picks a free port.
    pub bind_addr: SocketAddr,
    /// Required `x-admin-key` value; admin and entry routes reject every
    /// request when `None`.
    pub admin_key: Option<String>,
}

/// Shared state behind every handler.
struct AppState {
    scheduler: Arc<PhaseScheduler>,
    admin_key: Option<String>,
    cancel: CancellationToken,
}

/// Binds the listener and serves until `cancel` fires.
///
/// Returns the bound address and the server task.
///
/// # Errors
///
/// Returns [`TransportError::Bind`] if the address cannot be bound.
pub async fn serve(
    config: HttpConfig,
    scheduler: Arc<PhaseScheduler>,
    cancel: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>), TransportError> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: config.bind_addr.to_string(),
            source,
        })?;
    let bound_addr = listener.local_addr()?;

    let router = build_router(scheduler, config.admin_key, cancel.clone());
    let handle = tokio::spawn(async move {
        info!(%bound_addr, "HTTP listener started");
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await
            .ok();
        debug!("HTTP listener shut down");
    });
    Ok((bound_addr, handle))
}

// ============================================================================
// Axum Router
// ============================================================================

/// Builds the router.
pub fn build_router(
    scheduler: Arc<PhaseScheduler>,
    admin_key: Option<String>,
    cancel: CancellationToken,
) -> Router {
    let state = Arc::new(AppState {
        scheduler,
        admin_key,
        cancel,
    });

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/state", get(handle_state))
        .route("/api/cipher", get(handle_cipher))
        .route("/api/reveal", get(handle_reveal))
        .route("/api/submit", post(handle_submit))
        .route("/api/entry", post(handle_entry))
        .route("/api/admin/preview", post(handle_preview))
        .route("/api/admin/cipher", post(handle_generate))
        .route("/sse", get(handle_sse))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    cycle_id: u64,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryBody {
    cycle_id: u64,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PreviewBody {
    phrase: String,
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn handle_state(State(app): State<Arc<AppState>>) -> Response {
    Json(app.scheduler.read_public_state()).into_response()
}

async fn handle_cipher(State(app): State<Arc<AppState>>) -> Response {
    app.scheduler.read_public_cipher().map_or_else(
        || (StatusCode::NOT_FOUND, Json(json!({ "ok": false }))).into_response(),
        |cipher| Json(cipher).into_response(),
    )
}

/// `GET /api/reveal`: previous answer sheet, for current-cycle entrants.
async fn handle_reveal(State(app): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    player_from(&headers)
        .and_then(|player| app.scheduler.read_last_cycle_reveal(&player.user_id))
        .map_or_else(forbidden, |reveal| Json(reveal).into_response())
}

/// `POST /api/submit`: every rejection looks the same to the caller.
async fn handle_submit(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return bad_request();
    };
    let Some(player) = player_from(&headers) else {
        return forbidden();
    };
    match app.scheduler.submit_answer(body.cycle_id, &player, &body.answer) {
        Ok(ack) => Json(ack).into_response(),
        Err(_) => forbidden(),
    }
}

/// `POST /api/entry`: the payment collaborator grants entry for a cycle.
async fn handle_entry(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<EntryBody>, JsonRejection>,
) -> Response {
    if !app.is_admin(&headers) {
        return forbidden();
    }
    let Ok(Json(body)) = body else {
        return bad_request();
    };
    match app.scheduler.grant_entry(body.cycle_id, &body.user_id) {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(err) => (
            StatusCode::CONFLICT,
            Json(json!({ "ok": false, "error": "stale_cycle", "currentCycleId": err.current })),
        )
            .into_response(),
    }
}

async fn handle_preview(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<PreviewBody>, JsonRejection>,
) -> Response {
    if !app.is_admin(&headers) {
        return forbidden();
    }
    let Ok(Json(body)) = body else {
        return bad_request();
    };
    Json(app.scheduler.preview_puzzle(&body.phrase)).into_response()
}

async fn handle_generate(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    if !app.is_admin(&headers) {
        return forbidden();
    }
    let Ok(Json(request)) = body else {
        return bad_request();
    };
    match app.scheduler.generate_puzzle(&request) {
        Ok(staged) => Json(json!({ "ok": true, "staged": staged })).into_response(),
        Err(err) => {
            let status = match &err {
                GenerateError::WindowOpen => StatusCode::CONFLICT,
                GenerateError::Cipher(_) => StatusCode::BAD_REQUEST,
            };
            let counts = match &err {
                GenerateError::Cipher(cipher) => cipher.counts().cloned(),
                GenerateError::WindowOpen => None,
            };
            (
                status,
                Json(json!({ "ok": false, "error": err.code(), "counts": counts })),
            )
                .into_response()
        }
    }
}

/// `GET /sse`: current snapshot, then live events.
///
/// The stream ends on the first event after shutdown begins, so graceful
/// shutdown is not held open by observers.
async fn handle_sse(
    State(app): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (snapshot, rx) = app.scheduler.subscribe();
    let cancel = app.cancel.clone();

    let first = tokio_stream::once(CycleEvent::State(snapshot));
    let live = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            metrics::record_observer_lag(skipped);
            debug!(skipped, "observer lagged");
            None
        }
    });
    let stream = first
        .chain(live)
        .take_while(move |_| !cancel.is_cancelled())
        .filter_map(|event| {
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok(SseEvent::default().data(data)))
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============================================================================
// Helpers
// ============================================================================

impl AppState {
    /// True when an admin key is configured and the header matches it.
    fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.admin_key else {
            return false;
        };
        headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|given| keys_match(given.as_bytes(), expected.as_bytes()))
    }
}

/// Length-independent-time comparison of two keys.
fn keys_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Reads the upstream identity headers.
fn player_from(headers: &HeaderMap) -> Option<Player> {
    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|id| !id.is_empty())?;
    let username = headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(user_id);
    Some(Player::new(user_id, username))
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "ok": false }))).into_response()
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "ok": false }))).into_response()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
    use cryptic_core::BundleBuilder;
    use tower::util::ServiceExt;

    use crate::cycle::EventBus;
    use crate::phase::{FallbackPuzzle, ManualClock, Schedule, WeeklyAnchor};

    /// Sunday 2026-01-04 12:00 in UTC-6, plus `hours`.
    fn week(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 4, 18, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn scheduler_at(hours: i64) -> Arc<PhaseScheduler> {
        let schedule = Schedule::new(
            FixedOffset::west_opt(6 * 3600).unwrap(),
            WeeklyAnchor::new(Weekday::Sun, NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
            WeeklyAnchor::new(Weekday::Sat, NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            Duration::hours(24),
        );
        let scheduler = PhaseScheduler::new(
            schedule,
            Arc::new(ManualClock::new(week(hours))),
            EventBus::new(16),
        )
        .with_fallback(FallbackPuzzle::new("HELLO WORLD", BundleBuilder::new()));
        let scheduler = Arc::new(scheduler);
        scheduler.tick();
        scheduler
    }

    const KEY: &str = "sesame-sesame-sesame";
    const ADMIN: &[(&str, &str)] = &[(ADMIN_KEY_HEADER, KEY)];

    fn app(scheduler: &Arc<PhaseScheduler>, admin_key: Option<&str>) -> Router {
        build_router(
            Arc::clone(scheduler),
            admin_key.map(str::to_owned),
            CancellationToken::new(),
        )
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn submit(user: Option<&str>, cycle_id: u64, answer: &str) -> Request<Body> {
        let body = json!({ "cycleId": cycle_id, "answer": answer });
        match user {
            Some(user) => post_json("/api/submit", &body, &[(USER_ID_HEADER, user)]),
            None => post_json("/api/submit", &body, &[]),
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let scheduler = scheduler_at(1);
        let resp = app(&scheduler, None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["ok"], true);
    }

    #[tokio::test]
    async fn state_is_public_snapshot() {
        let scheduler = scheduler_at(1);
        let resp = app(&scheduler, None)
            .oneshot(Request::get("/api/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["status"], "RUNNING");
        assert_eq!(body["cycleId"], 0);
        assert!(body["version"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn cipher_hidden_outside_window() {
        let scheduler = scheduler_at(1);
        let resp = app(&scheduler, None)
            .oneshot(Request::get("/api/cipher").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cipher_shown_during_window_without_secrets() {
        let scheduler = scheduler_at(150);
        let resp = app(&scheduler, None)
            .oneshot(Request::get("/api/cipher").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["type"], "CRIP36");
        assert!(body.get("legend").is_none());
        assert!(body.get("reveal").is_none());
        assert!(body.get("normalizedAnswer").is_none());
    }

    #[tokio::test]
    async fn submit_rejections_are_indistinguishable() {
        let scheduler = scheduler_at(150);
        let router = app(&scheduler, None);

        let anonymous = router.clone().oneshot(submit(None, 0, "x")).await.unwrap();
        let unpaid = router.clone().oneshot(submit(Some("u"), 0, "x")).await.unwrap();
        scheduler.grant_entry(0, "u").unwrap();
        let stale = router.clone().oneshot(submit(Some("u"), 5, "x")).await.unwrap();

        for resp in [anonymous, unpaid, stale] {
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            assert_eq!(json_body(resp).await, json!({ "ok": false }));
        }
    }

    #[tokio::test]
    async fn submit_ack_same_for_right_wrong_and_repeat() {
        let scheduler = scheduler_at(150);
        scheduler.grant_entry(0, "a").unwrap();
        scheduler.grant_entry(0, "b").unwrap();
        let router = app(&scheduler, None);

        let right = router.clone().oneshot(submit(Some("a"), 0, "hello world")).await.unwrap();
        let wrong = router.clone().oneshot(submit(Some("b"), 0, "nope")).await.unwrap();
        let again = router.clone().oneshot(submit(Some("a"), 0, "nope")).await.unwrap();

        let expected = json!({ "ok": true, "received": true });
        for resp in [right, wrong, again] {
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(json_body(resp).await, expected);
        }
    }

    #[tokio::test]
    async fn malformed_submit_is_bad_request() {
        let scheduler = scheduler_at(150);
        let req = Request::builder()
            .method("POST")
            .uri("/api/submit")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let resp = app(&scheduler, None).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_require_key_when_configured() {
        let scheduler = scheduler_at(1);
        let body = json!({ "phrase": "HELLO" });
        let router = app(&scheduler, Some(KEY));

        let missing = router
            .clone()
            .oneshot(post_json("/api/admin/preview", &body, &[]))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);

        let ok = router
            .oneshot(post_json("/api/admin/preview", &body, ADMIN))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let counts = json_body(ok).await;
        assert_eq!(counts["charCount"], 5);
        assert_eq!(counts["fits7x7"], true);
    }

    #[tokio::test]
    async fn admin_and_entry_closed_without_key() {
        let scheduler = scheduler_at(1);
        let router = app(&scheduler, None);
        let requests = [
            ("/api/entry", json!({ "cycleId": 0, "userId": "u" })),
            ("/api/admin/preview", json!({ "phrase": "HELLO" })),
            ("/api/admin/cipher", json!({ "phrase": "HELLO" })),
        ];
        let header_sets: [&[(&str, &str)]; 3] = [
            &[],
            &[(ADMIN_KEY_HEADER, "")],
            &[(ADMIN_KEY_HEADER, "anything")],
        ];
        for (uri, body) in requests {
            for headers in header_sets {
                let resp = router
                    .clone()
                    .oneshot(post_json(uri, &body, headers))
                    .await
                    .unwrap();
                assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
            }
        }

        // self-granted entry must not unlock submission
        let scheduler = scheduler_at(150);
        let router = app(&scheduler, None);
        router
            .clone()
            .oneshot(post_json("/api/entry", &json!({ "cycleId": 0, "userId": "u" }), &[]))
            .await
            .unwrap();
        let resp = router.oneshot(submit(Some("u"), 0, "hello world")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn generate_reports_overflow_with_counts() {
        let scheduler = scheduler_at(1);
        let body = json!({ "phrase": "A".repeat(60) });
        let resp = app(&scheduler, Some(KEY))
            .oneshot(post_json("/api/admin/cipher", &body, ADMIN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "layout_overflow");
        assert_eq!(json["counts"]["charCount"], 60);
    }

    #[tokio::test]
    async fn generate_rejected_during_window() {
        let scheduler = scheduler_at(150);
        let body = json!({ "phrase": "LATE" });
        let resp = app(&scheduler, Some(KEY))
            .oneshot(post_json("/api/admin/cipher", &body, ADMIN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["error"], "cipher_window_open");
    }

    #[tokio::test]
    async fn entry_for_old_cycle_conflicts() {
        let scheduler = scheduler_at(1);
        let body = json!({ "cycleId": 9, "userId": "u" });
        let resp = app(&scheduler, Some(KEY))
            .oneshot(post_json("/api/entry", &body, ADMIN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["currentCycleId"], 0);
    }

    #[tokio::test]
    async fn reveal_requires_entry() {
        let scheduler = scheduler_at(1);
        let req = Request::get("/api/reveal")
            .header(USER_ID_HEADER, "u")
            .body(Body::empty())
            .unwrap();
        let resp = app(&scheduler, None).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sse_starts_with_state() {
        let scheduler = scheduler_at(1);
        let resp = app(&scheduler, None)
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let mut frames = resp.into_body().into_data_stream();
        let first = frames.next().await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&first);
        assert!(text.starts_with("data: "));
        assert!(text.contains(r#""type":"STATE""#));
    }

    #[tokio::test]
    async fn serve_binds_and_stops_on_cancel() {
        let scheduler = scheduler_at(1);
        let cancel = CancellationToken::new();
        let config = HttpConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            admin_key: None,
        };
        let (addr, handle) = serve(config, scheduler, cancel.clone()).await.unwrap();
        assert_ne!(addr.port(), 0);

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn serve_reports_bind_failure() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = HttpConfig {
            bind_addr: taken.local_addr().unwrap(),
            admin_key: None,
        };
        let err = serve(config, scheduler_at(1), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
    }

    #[test]
    fn keys_match_requires_equal_length() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(!keys_match(b"abc", b"abcd"));
    }

    #[test]
    fn player_name_defaults_to_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, "u1".parse().unwrap());
        assert_eq!(player_from(&headers), Some(Player::new("u1", "u1")));
        headers.insert(USER_NAME_HEADER, "Una".parse().unwrap());
        assert_eq!(player_from(&headers), Some(Player::new("u1", "Una")));
        headers.insert(USER_ID_HEADER, "  ".parse().unwrap());
        assert_eq!(player_from(&headers), None);
    }
}
