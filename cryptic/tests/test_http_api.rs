mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{CLOSES, Harness, OPENS};
use serde_json::{Value, json};
use tokio_stream::StreamExt;
use tower::util::ServiceExt;

const ADMIN_KEY: &str = "integration-admin-key";

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user).header("x-user-name", user);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn admin(uri: &str, body: &Value) -> Request<Body> {
    post(uri, body, &[("x-admin-key", ADMIN_KEY)])
}

fn submit(user: &str, cycle_id: u64, answer: &str) -> Request<Body> {
    post(
        "/api/submit",
        &json!({ "cycleId": cycle_id, "answer": answer }),
        &[("x-user-id", user), ("x-user-name", user)],
    )
}

#[tokio::test]
async fn week_through_the_http_surface() {
    let h = Harness::at(1);
    h.scheduler.tick();
    let app = h.router(Some(ADMIN_KEY));

    let (status, state) = send(&app, get("/api/state", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["status"], "RUNNING");
    assert_eq!(state["hasPreparedCipher"], false);

    // operator stages a puzzle
    let (status, staged) = send(
        &app,
        admin("/api/admin/cipher", &json!({ "phrase": "Open Sesame", "title": "DOOR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{staged}");
    assert_eq!(staged["staged"]["cycleId"], 0);
    assert_eq!(staged["staged"]["seed"], "cycle:0");

    // payment collaborator grants entry
    for user in ["ann", "ben"] {
        let (status, _) = send(
            &app,
            admin("/api/entry", &json!({ "cycleId": 0, "userId": user })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    h.tick_at(OPENS);
    let (status, cipher) = send(&app, get("/api/cipher", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cipher["title"], "DOOR");

    let (status, ack) = send(&app, submit("ben", 0, "open sesame")).await;
    assert_eq!((status, ack.clone()), (StatusCode::OK, json!({ "ok": true, "received": true })));
    let (status, again) = send(&app, submit("ann", 0, "OPEN SESAME")).await;
    assert_eq!((status, again), (StatusCode::OK, ack));

    let (status, body) = send(&app, submit("cat", 0, "OPEN SESAME")).await;
    assert_eq!((status, body), (StatusCode::FORBIDDEN, json!({ "ok": false })));

    h.tick_at(CLOSES);
    let (_, state) = send(&app, get("/api/state", None)).await;
    assert_eq!(state["status"], "ENDED");
    assert_eq!(state["cycleId"], 1);
    assert_eq!(state["last"]["winner"]["un"], "ben");

    let (status, _) = send(&app, get("/api/reveal", Some("ben"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    send(&app, admin("/api/entry", &json!({ "cycleId": 1, "userId": "ben" }))).await;
    let (status, reveal) = send(&app, get("/api/reveal", Some("ben"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reveal["lastCycleId"], 0);
    assert_eq!(reveal["lastWinner"]["un"], "ben");
    assert_eq!(reveal["lastCipher"]["normalizedAnswer"], "OPENSESAME");
}

#[tokio::test]
async fn admin_routes_reject_wrong_key() {
    let h = Harness::at(1);
    h.scheduler.tick();
    let app = h.router(Some(ADMIN_KEY));

    let body = json!({ "phrase": "HELLO" });
    for uri in ["/api/admin/cipher", "/api/admin/preview"] {
        let (status, _) = send(&app, post(uri, &body, &[("x-admin-key", "guess")])).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
    let (status, _) = send(
        &app,
        post("/api/entry", &json!({ "cycleId": 0, "userId": "u" }), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!h.scheduler.read_public_state().has_prepared_cipher);
}

#[tokio::test]
async fn sse_delivers_snapshot_then_live_events() {
    let h = Harness::at(1);
    h.scheduler.tick();
    let app = h.router(None);

    let resp = app.oneshot(get("/sse", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut frames = resp.into_body().into_data_stream();

    let first = frames.next().await.unwrap().unwrap();
    let first = String::from_utf8_lossy(&first);
    assert!(first.contains(r#""type":"STATE""#), "{first}");

    h.tick_at(OPENS);
    let mut seen = Vec::new();
    while seen.len() < 3 {
        let frame = frames.next().await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&frame).into_owned();
        let Some(data) = text.strip_prefix("data: ") else {
            continue;
        };
        let event: Value = serde_json::from_str(data.trim()).unwrap();
        seen.push(event["type"].as_str().unwrap().to_owned());
    }
    assert_eq!(seen, ["CIPHER", "STATUS", "STATE"]);
}
