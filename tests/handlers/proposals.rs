//! Integration tests for proposal sending.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

async fn send(state: &AppState, body: serde_json::Value) -> axum::response::Response {
    test_app(state)
        .oneshot(operator_request(Method::POST, "/proposals/send", Some(&body)))
        .await
        .unwrap()
}

fn state_with_approved_lead(email: EmailService, category: Option<&str>) -> (AppState, Lead) {
    let state = create_test_app_state_with_email(email);
    let lead = {
        let conn = state.db.get().unwrap();
        seed_test_links(&conn);
        create_approved_lead(&conn, "Acme Plumbing", "owner@acme.co", category)
    };
    (state, lead)
}

#[tokio::test]
async fn test_send_proposal_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mail/send")
        .match_body(mockito::Matcher::PartialJson(json!({
            "personalizations": [{"to": [{"email": "owner@acme.co"}]}]
        })))
        .with_status(202)
        .with_header("x-message-id", "msg-123")
        .expect(1)
        .create_async()
        .await;
    let (state, lead) = state_with_approved_lead(mock_email_service(&server.url()), Some("pro"));

    let response = send(&state, json!({"lead_id": lead.id})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["data"],
        json!({"sent": true, "lead_id": lead.id, "tier": "pro", "message_id": "msg-123"})
    );
    mock.assert_async().await;

    let lead = get_lead(&state, lead.id);
    assert!(lead.proposal_sent_at.is_some());
    assert_eq!(lead.proposal_message_id.as_deref(), Some("msg-123"));
    assert_eq!(lead.payment_status, PaymentStatus::Pending);
    assert_eq!(lead.stage, Stage::Contacted);
    assert!(lead.send_error.is_none());

    {
        let conn = state.db.get().unwrap();
        let proposals = queries::list_proposals_for_lead(&conn, lead.id).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].tier, "pro");
        assert_eq!(proposals[0].payment_url, "https://buy.stripe.com/plink_pro_deposit");
    }
    assert_eq!(activity_count(&state, ActivityAction::ProposalSent), 1);
}

#[tokio::test]
async fn test_starter_lead_gets_full_payment_link() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v3/mail/send")
        .match_body(mockito::Matcher::Regex("plink_starter_full".to_string()))
        .with_status(202)
        .create_async()
        .await;
    let (state, lead) =
        state_with_approved_lead(mock_email_service(&server.url()), Some("Starter"));

    let response = send(&state, json!({"lead_id": lead.id})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["tier"], "starter");
    assert!(json["data"]["message_id"].is_null());
}

#[tokio::test]
async fn test_lead_id_as_string_is_accepted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v3/mail/send")
        .with_status(202)
        .create_async()
        .await;
    let (state, lead) = state_with_approved_lead(mock_email_service(&server.url()), None);

    let response = send(&state, json!({"lead_id": lead.id.to_string()})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_proposal_not_sent_twice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/mail/send")
        .with_status(202)
        .expect(1)
        .create_async()
        .await;
    let (state, lead) = state_with_approved_lead(mock_email_service(&server.url()), Some("pro"));

    assert_eq!(send(&state, json!({"lead_id": lead.id})).await.status(), StatusCode::OK);

    let response = send(&state, json!({"lead_id": lead.id})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Proposal already sent");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unapproved_lead_rejected() {
    let state = create_test_app_state();
    let lead = {
        let conn = state.db.get().unwrap();
        seed_test_links(&conn);
        create_test_lead(&conn, "Pending Co", "p@b.co", Some("pro"))
    };

    let response = send(&state, json!({"lead_id": lead.id})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Lead must be approved first");
}

#[tokio::test]
async fn test_unknown_lead_is_not_found() {
    let state = create_test_app_state();

    let response = send(&state, json!({"lead_id": 9999})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Lead not found");
}

#[tokio::test]
async fn test_missing_lead_id() {
    let state = create_test_app_state();

    for body in [json!({}), json!({"lead_id": 0}), json!({"lead_id": "abc"})] {
        let response = send(&state, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "lead_id is required");
    }
}

#[tokio::test]
async fn test_missing_payment_link() {
    let state = create_test_app_state();
    let lead = {
        let conn = state.db.get().unwrap();
        create_approved_lead(&conn, "Acme", "a@b.co", Some("business"))
    };

    let response = send(&state, json!({"lead_id": lead.id})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "No payment link found for business/deposit. Run setup first."
    );
}

#[tokio::test]
async fn test_email_failure_records_send_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v3/mail/send")
        .with_status(400)
        .with_body("invalid recipient")
        .create_async()
        .await;
    let (state, lead) = state_with_approved_lead(mock_email_service(&server.url()), Some("pro"));

    let response = send(&state, json!({"lead_id": lead.id})).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"],
        "Email send failed: 400: invalid recipient"
    );

    let lead = get_lead(&state, lead.id);
    assert!(lead.proposal_sent_at.is_none());
    assert_eq!(lead.send_error.as_deref(), Some("400: invalid recipient"));
    assert_eq!(lead.payment_status, PaymentStatus::Unpaid);
    assert_eq!(activity_count(&state, ActivityAction::ProposalSent), 0);
}

#[tokio::test]
async fn test_unconfigured_email_is_bad_gateway() {
    let (state, lead) = state_with_approved_lead(
        EmailService::new(None, "hello@test.local".into(), TEST_BRAND.into()),
        Some("pro"),
    );

    let response = send(&state, json!({"lead_id": lead.id})).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"],
        "Email send failed: SENDGRID_API_KEY not configured"
    );
}

#[tokio::test]
async fn test_proposal_sends_are_rate_limited() {
    let state = create_test_app_state();

    for _ in 0..20 {
        let response = send(&state, json!({"lead_id": 424242})).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = send(&state, json!({"lead_id": 424242})).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["error"],
        "Too many proposal sends. Please try again later."
    );
}
