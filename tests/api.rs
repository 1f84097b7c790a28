//! HTTP request dispatch integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use sonos_gateway::actions::BuiltinActions;
use sonos_gateway::api::resolver::NOT_DISCOVERED_MESSAGE;
use sonos_gateway::{
    ActionFailure, ActionOutcome, ActionRegistry, FailureKind, Player, StaticDiscovery,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

mod common;
use common::{build_test_router, kitchen_and_office};

/// Registry with a handful of actions exercising every outcome shape
fn test_registry() -> ActionRegistry {
    let mut builder = ActionRegistry::builder();
    builder
        .register("echo", |player, args| async move {
            ActionOutcome::json(serde_json::json!({
                "player": player.map(|p| p.room_name),
                "args": args,
            }))
        })
        .register("nothing", |_, _| async { ActionOutcome::done() })
        .register("null", |_, _| async {
            ActionOutcome::json(serde_json::Value::Null)
        })
        .register("passthrough", |_, _| async {
            ActionOutcome::RawTransportPassthrough
        })
        .register("grouped", |_, _| async {
            ActionOutcome::batch(vec![
                ActionOutcome::RawTransportPassthrough,
                ActionOutcome::json(serde_json::json!({ "ignored": true })),
            ])
        })
        .register("broken", |_, _| async {
            let err = std::io::Error::other("speaker socket closed");
            ActionOutcome::Failure(ActionFailure::from_error(FailureKind::Device, &err))
        })
        .register("refuse", |_, _| async {
            ActionOutcome::failure(FailureKind::InvalidArgument, "volume must be a number")
        })
        .register("volume", |_, args| async move {
            let level: u8 = args[0].parse().unwrap_or_default();
            ActionOutcome::json(serde_json::json!({ "volume": level }))
        });
    builder.build()
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_favicon_before_discovery() {
    let app = build_test_router(test_registry(), Arc::new(StaticDiscovery::empty()));

    let (status, _, body) = get(app, "/favicon.ico").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_not_discovered() {
    let app = build_test_router(test_registry(), Arc::new(StaticDiscovery::empty()));

    let (status, json) = get_json(app, "/Kitchen/echo").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], NOT_DISCOVERED_MESSAGE);
    assert!(json.get("stack").is_none());
}

#[tokio::test]
async fn test_named_player_with_args() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app, "/Living%20Room/ECHO/x/y").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["player"], "Living Room");
    assert_eq!(json["args"], serde_json::json!(["x", "y"]));
}

#[tokio::test]
async fn test_unnamed_player_uses_any_player() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app, "/echo/20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["player"], "Kitchen");
    assert_eq!(json["args"], serde_json::json!(["20"]));
}

#[tokio::test]
async fn test_method_agnostic() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/Kitchen/nothing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_action() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app, "/Kitchen/dance").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("dance"));
}

#[tokio::test]
async fn test_malformed_player_segment_never_dispatches() {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    let mut builder = ActionRegistry::builder();
    builder.register("play", move |_, _| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(());
            ActionOutcome::done()
        }
    });
    let app = build_test_router(builder.build(), kitchen_and_office());

    for uri in ["/%zz/play", "/%E0%A4%A/play", "/%FF/play"] {
        let (status, json) = get_json(app.clone(), uri).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(json["status"], "error");
        assert!(json["error"].as_str().unwrap().contains("URI malformed"));
    }

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_outcomes_collapse_to_success() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    for uri in ["/Kitchen/nothing", "/Kitchen/null", "/Kitchen/passthrough", "/Kitchen/grouped"] {
        let (status, json) = get_json(app.clone(), uri).await;

        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json, serde_json::json!({ "status": "success" }), "{uri}");
    }
}

#[tokio::test]
async fn test_handler_failure_with_trace() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app, "/Kitchen/broken").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "speaker socket closed");
    assert!(json["stack"].as_str().unwrap().contains("speaker socket closed"));
}

#[tokio::test]
async fn test_handler_failure_without_trace() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app, "/Kitchen/refuse").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        serde_json::json!({ "status": "error", "error": "volume must be a number" })
    );
}

#[tokio::test]
async fn test_panicking_handler_returns_error_envelope() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (status, json) = get_json(app.clone(), "/Kitchen/volume").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("index out of bounds"));

    let (status, json) = get_json(app, "/Kitchen/volume/15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["volume"], 15);
}

#[tokio::test]
async fn test_json_headers() {
    let app = build_test_router(test_registry(), kitchen_and_office());

    let (_, headers, body) = get(app, "/Kitchen/echo/a").await;

    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/json;charset=utf-8"
    );
    assert_eq!(
        headers[header::CONTENT_LENGTH].to_str().unwrap(),
        body.len().to_string()
    );
}

#[tokio::test]
async fn test_builtin_actions() {
    let discovery = kitchen_and_office();
    discovery
        .update_state("Kitchen", serde_json::json!({ "volume": 30 }))
        .unwrap();
    let registry = ActionRegistry::builder()
        .module(&BuiltinActions::new(discovery.clone()))
        .build();
    let app = build_test_router(registry, Arc::clone(&discovery));

    let (status, json) = get_json(app.clone(), "/zones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = get_json(app.clone(), "/kitchen/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["volume"], 30);

    let (status, json) = get_json(app, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "status": "success" }));
}

#[tokio::test]
async fn test_player_added_after_startup() {
    let discovery = Arc::new(StaticDiscovery::empty());
    let app = build_test_router(test_registry(), Arc::clone(&discovery));

    let (status, _) = get_json(app.clone(), "/Office/echo").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    discovery.add_player(Player::new("Office", "RINCON_9"));

    let (status, json) = get_json(app, "/Office/echo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["player"], "Office");
}
