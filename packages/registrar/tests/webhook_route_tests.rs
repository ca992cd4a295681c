//! HTTP-level tests for the webhook and health routes.

mod common;

use crate::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use registrar_core::common::Signal;
use registrar_core::server::app::{build_app, AppState};
use registrar_core::DEFAULT_REGISTRATION_MARKER;
use serde_json::{json, Value};
use test_context::test_context;
use tower::ServiceExt;

fn app(ctx: &TestHarness) -> axum::Router {
    build_app(AppState::new(
        ctx.server_deps.clone(),
        test_config(),
        DEFAULT_REGISTRATION_MARKER,
    ))
}

fn registration_message(fields: Value) -> Value {
    json!({
        "id": "900",
        "channel_id": "800",
        "webhook_id": "700",
        "content": DEFAULT_REGISTRATION_MARKER,
        "embeds": [{ "fields": fields }],
    })
}

fn complete_fields() -> Value {
    json!([
        { "name": "discordId", "value": "111" },
        { "name": "studentCode", "value": "20200001" },
        { "name": "gmail", "value": "ana@gmail.com" },
        { "name": "fullName", "value": "Ana Torres" },
        { "name": "base", "value": "2020" },
    ])
}

async fn post_webhook(ctx: &TestHarness, body: Value) -> (StatusCode, Value) {
    let response = app(ctx)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/registrations")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test_context(TestHarness)]
#[tokio::test]
async fn health_reports_store_status(ctx: &TestHarness) {
    let response = app(ctx)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn messages_without_marker_are_ignored(ctx: &TestHarness) {
    let mut message = registration_message(complete_fields());
    message["content"] = json!("just chatting");

    let (status, body) = post_webhook(ctx, message).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ignored");
    assert!(ctx.log().calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn messages_from_users_are_ignored(ctx: &TestHarness) {
    let mut message = registration_message(complete_fields());
    message["webhook_id"] = Value::Null;

    let (status, _) = post_webhook(ctx, message).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(ctx.log().calls().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_form_is_rejected_with_hard_error(ctx: &TestHarness) {
    let fields = json!([
        { "name": "discordId", "value": "111" },
        { "name": "base", "value": "twenty" },
    ]);

    let (status, body) = post_webhook(ctx, registration_message(fields)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["signal"], "hard_error");
    assert_eq!(ctx.log().count("fetch_member"), 0);

    let acks = ctx.messenger().acknowledgments();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].0.message_id, "900");
    assert_eq!(acks[0].1, Signal::HardError);
    assert_eq!(ctx.messenger().replies().len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn fresh_registration_is_acknowledged_with_success(ctx: &TestHarness) {
    ctx.directory().add_member(guild_member(false));

    let (status, body) = post_webhook(ctx, registration_message(complete_fields())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");
    assert_eq!(body["outcome"], "proceeded");
    assert_eq!(body["signal"], "success");
    assert_eq!(body["state"], "succeeded");
    assert!(body.get("requires_reconciliation").is_none());

    assert_eq!(ctx.messenger().acknowledgments()[0].1, Signal::Success);
    assert!(ctx.messenger().replies().is_empty());
    assert_eq!(ctx.store().records().len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn returning_member_is_waved_back(ctx: &TestHarness) {
    ctx.directory().add_member(guild_member(false));
    ctx.store().seed(existing_record(true, true, true));

    let (status, body) = post_webhook(ctx, registration_message(complete_fields())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "welcomed_back");

    assert_eq!(ctx.messenger().acknowledgments()[0].1, Signal::Success);
    let reactions = ctx.messenger().reactions();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].0.message_id, "900");
    assert_eq!(reactions[0].1, "👋");
    assert!(ctx.log().position("acknowledge") < ctx.log().position("react"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn conflicts_are_replied_with_one_embed_each(ctx: &TestHarness) {
    ctx.directory().add_member(guild_member(false));
    ctx.store().seed(existing_record(false, false, true));
    ctx.store().seed(existing_record(true, false, false));

    let (status, body) = post_webhook(ctx, registration_message(complete_fields())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signal"], "suspicious");
    assert_eq!(body["state"], "conflict_reported");

    let replies = ctx.messenger().replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].embeds.len(), 2);
    assert!(replies[0]
        .text
        .as_deref()
        .unwrap_or_default()
        .contains("Found 2 registrations"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn persistence_failure_is_flagged_in_response(ctx: &TestHarness) {
    ctx.directory().add_member(guild_member(false));
    ctx.store()
        .fail_next_insert(registrar_core::kernel::InsertError::Transport("gone".into()));

    let (status, body) = post_webhook(ctx, registration_message(complete_fields())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "persistence_failed");
    assert_eq!(body["signal"], "soft_error");
    assert_eq!(body["requires_reconciliation"], true);
}
