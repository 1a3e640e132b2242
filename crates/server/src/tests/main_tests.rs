use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext {
        storage: storage.clone(),
        generator: Arc::new(StagedGenerator::default()),
    };
    (build_router(Arc::new(AppState { api }), 64 * 1024), storage)
}

async fn json_body(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn session_round_trip_over_http() {
    let (app, storage) = test_app().await;

    let write = post_json(
        "/session",
        json!({
            "client_id": "alice",
            "history": [{"question": "q0", "answer": true}, {"question": "q1", "answer": false}],
            "current_index": 2,
            "cards": [{"id": 0, "question": "q0"}, {"id": 1, "question": "q1"}, {"id": 2, "question": "q2"}]
        }),
    );
    let response = app.clone().oneshot(write).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"success": true}));

    let read = Request::get("/session?client_id=alice")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(read).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["client_id"], "alice");
    assert_eq!(body["current_index"], 2);
    assert_eq!(body["history"][1]["answer"], false);
    assert_eq!(body["cards"].as_array().map(Vec::len), Some(3));

    let delete = Request::delete("/session?client_id=alice")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(delete).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(storage.count_sessions().await.expect("count"), 0);
}

#[tokio::test]
async fn unknown_client_gets_an_empty_session() {
    let (app, _storage) = test_app().await;
    let read = Request::get("/session?client_id=nobody")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(read).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["client_id"], "nobody");
    assert_eq!(body["cards"], json!([]));
    assert_eq!(body["current_index"], 0);
}

#[tokio::test]
async fn session_routes_require_a_client_id() {
    let (app, _storage) = test_app().await;

    let read = Request::get("/session").body(Body::empty()).expect("request");
    let response = app.clone().oneshot(read).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation");
    assert_eq!(body["error"], "client_id required");

    let delete = Request::delete("/session?client_id=")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(delete).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let write = post_json("/session", json!({"current_index": 1}));
    let response = app.oneshot(write).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cards_route_returns_a_batch() {
    let (app, _storage) = test_app().await;
    let request = post_json(
        "/cards",
        json!({"history": [{"question": "q0", "answer": true}], "current_count": 5}),
    );
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let cards = body["cards"].as_array().expect("cards array");
    assert_eq!(cards.len(), 10);
    assert_eq!(cards[0]["id"], 5);
    assert_eq!(cards[0]["type"], "insight");
    assert_eq!(cards[1]["category"], "triggers");
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/cards").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _storage) = test_app().await;
    let history: Vec<Value> = (0..4000)
        .map(|i| json!({"question": format!("question number {i}"), "answer": true}))
        .collect();
    let request = post_json("/cards", json!({"history": history, "current_count": 0}));
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn out_of_range_index_is_a_bad_request() {
    let (app, storage) = test_app().await;
    let write = post_json(
        "/session",
        json!({
            "client_id": "alice",
            "current_index": 9223372036854775808_u64,
            "cards": [{"id": 0, "question": "q0"}]
        }),
    );
    let response = app.oneshot(write).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation");
    assert_eq!(storage.count_sessions().await.expect("count"), 0);
}
