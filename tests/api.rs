mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use starhub::{app, rooms::Sender};
use tower::ServiceExt;

async fn call(app: &Router, method: &str, uri: &str, actor: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        req = req.header("x-actor-id", actor);
    }
    let response = app
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn like_toggles_and_counts() {
    let app = app(common::state().await);

    let (status, body) = call(&app, "POST", "/api/articles/post42/like", Some("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);

    let (_, body) = call(&app, "GET", "/api/toggles/post42/count", None).await;
    assert_eq!(body["count"], 1);

    let (_, body) = call(&app, "GET", "/api/articles/post42/likes", Some("u1")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["active"], true);

    let (_, body) = call(&app, "GET", "/api/articles/post42/likes", None).await;
    assert_eq!(body["active"], false);

    let (_, body) = call(&app, "POST", "/api/articles/post42/like", Some("u1")).await;
    assert_eq!(body["active"], false);

    let (_, body) = call(&app, "GET", "/api/toggles/post42/count", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn like_requires_actor() {
    let app = app(common::state().await);

    let (status, body) = call(&app, "POST", "/api/articles/post42/like", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rejected_quoted_content_stays_out_of_history() {
    let state = common::state().await;
    common::reject_content(&state.store, "it's gone").await;

    assert!(state.chat.send_message("general", "it's gone", Sender::Anonymous).await.is_err());
    state.chat.send_message("general", "it's fine", Sender::Anonymous).await.unwrap();
    let app = app(state);

    let (status, body) = call(&app, "GET", "/api/messages/general", None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "it's fine");
}

#[tokio::test]
async fn history_and_channels() {
    let state = common::state().await;
    state.chat.send_message("general", "one", Sender::Identified("u1".to_owned())).await.unwrap();
    state.chat.send_message("general", "two", Sender::Anonymous).await.unwrap();
    state.chat.send_message("random", "elsewhere", Sender::Anonymous).await.unwrap();
    let app = app(state);

    let (status, body) = call(&app, "GET", "/api/messages/general", None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "one");
    assert_eq!(messages[0]["sender"], "u1");
    assert_eq!(messages[1]["anonymous"], true);
    assert!(messages[0]["created_at"].as_str().unwrap() <= messages[1]["created_at"].as_str().unwrap());

    let (_, body) = call(&app, "GET", "/api/channels", None).await;
    let names: Vec<_> = body.as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"general") && names.contains(&"random"));
}

#[tokio::test]
async fn unknown_room_has_empty_history() {
    let app = app(common::state().await);
    let (status, body) = call(&app, "GET", "/api/messages/nowhere", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
}
