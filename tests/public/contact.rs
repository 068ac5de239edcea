//! Integration tests for the public contact form.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

async fn submit(state: &AppState, body: serde_json::Value) -> axum::response::Response {
    test_app(state)
        .oneshot(json_request(Method::POST, "/contact", &body))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_new_contact_creates_lead() {
    let state = create_test_app_state();

    let response = submit(
        &state,
        json!({
            "name": "Acme Plumbing",
            "email": "Owner@Acme.co",
            "message": "Need a site",
            "category": "business"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["deduped"], false);
    let lead_id = json["data"]["lead_id"].as_i64().unwrap();

    let lead = get_lead(&state, lead_id);
    assert_eq!(lead.business_name, "Acme Plumbing");
    assert_eq!(lead.email, "owner@acme.co");
    assert_eq!(lead.category.as_deref(), Some("business"));
    assert_eq!(lead.message.as_deref(), Some("Need a site"));
    assert_eq!(lead.score, 85);
    assert_eq!(lead.stage, Stage::New);
    assert_eq!(lead.review_status, ReviewStatus::PendingReview);
    assert_eq!(lead.payment_status, PaymentStatus::Unpaid);

    {
        let conn = state.db.get().unwrap();
        let contacts = queries::list_contacts(&conn, 10).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].email, "owner@acme.co");
        assert_eq!(contacts[0].source, "website");
    }
    assert_eq!(activity_count(&state, ActivityAction::InboundContact), 1);
}

#[tokio::test]
async fn test_repeat_contact_updates_existing_lead() {
    let state = create_test_app_state();

    let first = body_json(
        submit(
            &state,
            json!({"name": "Acme", "email": "a@b.co", "message": "First"}),
        )
        .await,
    )
    .await;
    let second = body_json(
        submit(
            &state,
            json!({"name": "Acme", "email": "A@B.co", "message": "Second"}),
        )
        .await,
    )
    .await;

    assert_eq!(second["data"]["deduped"], true);
    assert_eq!(second["data"]["lead_id"], first["data"]["lead_id"]);

    let lead = get_lead(&state, first["data"]["lead_id"].as_i64().unwrap());
    assert_eq!(lead.message.as_deref(), Some("Second"));

    let conn = state.db.get().unwrap();
    assert_eq!(queries::count_leads(&conn).unwrap(), 1);
    // Every submission is kept as a contact
    assert_eq!(queries::list_contacts(&conn, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_old_lead_is_not_reused() {
    let state = create_test_app_state();
    let old = {
        let conn = state.db.get().unwrap();
        let lead = create_test_lead(&conn, "Acme", "a@b.co", None);
        conn.execute(
            "UPDATE leads SET created_at = created_at - 8 * 86400 WHERE id = ?1",
            [lead.id],
        )
        .unwrap();
        lead
    };

    let json = body_json(submit(&state, json!({"name": "Acme", "email": "a@b.co"})).await).await;

    assert_eq!(json["data"]["deduped"], false);
    assert_ne!(json["data"]["lead_id"].as_i64().unwrap(), old.id);
}

#[tokio::test]
async fn test_markup_is_stripped_and_category_defaults() {
    let state = create_test_app_state();

    let json = body_json(
        submit(
            &state,
            json!({"name": "<b>Acme</b>", "email": "a@b.co", "message": "<script>x</script>hi"}),
        )
        .await,
    )
    .await;

    let lead = get_lead(&state, json["data"]["lead_id"].as_i64().unwrap());
    assert_eq!(lead.business_name, "bAcme/b");
    assert!(!lead.message.unwrap().contains('<'));
    assert_eq!(lead.category.as_deref(), Some("pro"));
}

#[tokio::test]
async fn test_validation_errors() {
    let state = create_test_app_state();

    let response = submit(&state, json!({"name": "A", "email": "a@b.co"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Name is required (min 2 chars)"
    );

    let response = submit(&state, json!({"name": "Acme", "email": "nope"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Valid email is required");

    let response = submit(&state, json!({"email": "a@b.co"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let conn = state.db.get().unwrap();
    assert_eq!(queries::count_leads(&conn).unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_body() {
    let state = create_test_app_state();

    let response = test_app(&state)
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/contact")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_per_email_limit() {
    let state = create_test_app_state();

    for _ in 0..5 {
        let response = submit(&state, json!({"name": "Acme", "email": "a@b.co"})).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = submit(&state, json!({"name": "Acme", "email": "a@b.co"})).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["error"],
        "Too many submissions. Please try again later."
    );

    // Other addresses are unaffected
    let response = submit(&state, json!({"name": "Other", "email": "c@d.co"})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_confirmation_email_only_for_new_leads() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mail/send")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    let state = create_test_app_state_with_email(mock_email_service(&server.url()));

    submit(&state, json!({"name": "Acme", "email": "a@b.co"})).await;
    submit(&state, json!({"name": "Acme", "email": "a@b.co"})).await;

    for _ in 0..50 {
        if mock.matched_async().await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    // Give a stray second send a chance to show up
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    mock.assert_async().await;
}
