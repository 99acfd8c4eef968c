//! Follow API integration tests
//!
//! Exercises the REST surface over the Social Graph Manager: idempotent
//! follow/unfollow, listing routes, and the error contract.

mod common;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;

use common::{bearer, test_app};

fn auth(value: &str) -> (axum::http::HeaderName, HeaderValue) {
    (AUTHORIZATION, HeaderValue::from_str(value).unwrap())
}

#[tokio::test]
async fn test_follow_creates_edge_on_both_sides() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let bob = app.directory.insert("bob", "bob@example.com");
    let (name, value) = auth(&bearer(alice));

    let response = app
        .server
        .post(&format!("/api/follow/{bob}"))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);

    let followers: serde_json::Value = app
        .server
        .get(&format!("/api/users/{bob}/followers"))
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(followers["followers"][0]["id"], alice.to_string());

    let following: serde_json::Value = app
        .server
        .get(&format!("/api/users/{alice}/following"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(following["following"][0]["id"], bob.to_string());
}

#[tokio::test]
async fn test_follow_twice_is_idempotent() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let bob = app.directory.insert("bob", "bob@example.com");
    let (name, value) = auth(&bearer(alice));

    for _ in 0..2 {
        let response = app
            .server
            .post(&format!("/api/follow/{bob}"))
            .add_header(name.clone(), value.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let followers: serde_json::Value = app
        .server
        .get(&format!("/api/users/{bob}/followers"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(followers["followers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unfollow_restores_pre_follow_state() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let bob = app.directory.insert("bob", "bob@example.com");
    let (name, value) = auth(&bearer(alice));

    app.server
        .post(&format!("/api/follow/{bob}"))
        .add_header(name.clone(), value.clone())
        .await;
    let response = app
        .server
        .delete(&format!("/api/follow/{bob}"))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let followers: serde_json::Value = app
        .server
        .get(&format!("/api/users/{bob}/followers"))
        .add_header(name, value)
        .await
        .json();
    assert!(followers["followers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unfollow_without_edge_is_noop_success() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let bob = app.directory.insert("bob", "bob@example.com");
    let (name, value) = auth(&bearer(alice));

    let response = app
        .server
        .delete(&format!("/api/follow/{bob}"))
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Not following");
}

#[tokio::test]
async fn test_self_follow_rejected() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let (name, value) = auth(&bearer(alice));

    let response = app
        .server
        .post(&format!("/api/follow/{alice}"))
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_follow_unknown_user_rejected() {
    let app = test_app();
    let alice = app.directory.insert("alice", "alice@example.com");
    let (name, value) = auth(&bearer(alice));

    let response = app
        .server
        .post(&format!("/api/follow/{}", uuid::Uuid::new_v4()))
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = test_app();
    let bob = app.directory.insert("bob", "bob@example.com");

    let response = app.server.post(&format!("/api/follow/{bob}")).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_rejected() {
    let app = test_app();
    let bob = app.directory.insert("bob", "bob@example.com");
    // Valid token, but the subject is not in the directory.
    let (name, value) = auth(&bearer(uuid::Uuid::new_v4()));

    let response = app
        .server
        .post(&format!("/api/follow/{bob}"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
}
