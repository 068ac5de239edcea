//! Integration tests for lead listing and review.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

async fn review(state: &AppState, id: &str, body: serde_json::Value) -> axum::response::Response {
    test_app(state)
        .oneshot(operator_request(
            Method::PATCH,
            &format!("/leads/{}", id),
            Some(&body),
        ))
        .await
        .unwrap()
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_list_leads_newest_first() {
        let state = create_test_app_state();
        {
            let conn = state.db.get().unwrap();
            let first = create_test_lead(&conn, "First Co", "first@b.co", None);
            conn.execute(
                "UPDATE leads SET created_at = created_at - 60 WHERE id = ?1",
                [first.id],
            )
            .unwrap();
            create_test_lead(&conn, "Second Co", "second@b.co", None);
        }

        let response = test_app(&state)
            .oneshot(operator_request(Method::GET, "/leads", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 2);
        let leads = json["data"]["leads"].as_array().unwrap();
        assert_eq!(leads[0]["business_name"], "Second Co");
        assert_eq!(leads[1]["business_name"], "First Co");
        assert_eq!(leads[0]["review_status"], "pending_review");
        assert_eq!(leads[0]["payment_status"], "none");
    }

    #[tokio::test]
    async fn test_list_leads_filters() {
        let state = create_test_app_state();
        {
            let conn = state.db.get().unwrap();
            create_test_lead(&conn, "Pending Co", "p@b.co", None);
            create_approved_lead(&conn, "Approved Co", "a@b.co", None);
        }

        let response = test_app(&state)
            .oneshot(operator_request(
                Method::GET,
                "/leads?review_status=approved",
                None,
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 1);
        assert_eq!(json["data"]["leads"][0]["business_name"], "Approved Co");

        let response = test_app(&state)
            .oneshot(operator_request(
                Method::GET,
                "/leads?stage=closed_won",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["data"]["count"], 0);
    }
}

mod reviewing {
    use super::*;

    #[tokio::test]
    async fn test_reject_lead() {
        let state = create_test_app_state();
        let lead = {
            let conn = state.db.get().unwrap();
            create_test_lead(&conn, "Spam Co", "spam@b.co", None)
        };

        let response = review(
            &state,
            &lead.id.to_string(),
            json!({"review_status": "rejected", "review_notes": "Not a fit"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["lead"]["review_status"], "rejected");
        assert_eq!(json["data"]["lead"]["review_notes"], "Not a fit");
        assert!(json["data"]["lead"]["reviewed_at"].is_number());

        let conn = state.db.get().unwrap();
        let activity = queries::list_activity(&conn, Some("lead_reviewed"), 10).unwrap();
        assert_eq!(activity.len(), 1);
        let metadata = activity[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["lead_id"], lead.id);
        assert_eq!(metadata["old_status"], "pending_review");
        assert_eq!(metadata["new_status"], "rejected");
    }

    #[tokio::test]
    async fn test_approval_sends_proposal_in_background() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v3/mail/send")
            .with_status(202)
            .with_header("x-message-id", "msg-approve")
            .create_async()
            .await;
        let state = create_test_app_state_with_email(mock_email_service(&server.url()));
        let lead = {
            let conn = state.db.get().unwrap();
            seed_test_links(&conn);
            create_test_lead(&conn, "Good Co", "good@b.co", Some("pro"))
        };

        let response = review(
            &state,
            &lead.id.to_string(),
            json!({"review_status": "approved"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["data"]["lead"]["review_status"],
            "approved"
        );

        let sent = wait_for(|| get_lead(&state, lead.id).proposal_sent_at.is_some()).await;
        assert!(sent, "proposal should be sent after approval");
        let lead = get_lead(&state, lead.id);
        assert_eq!(lead.proposal_message_id.as_deref(), Some("msg-approve"));
        assert_eq!(lead.stage, Stage::Contacted);
    }

    #[tokio::test]
    async fn test_approval_succeeds_even_if_proposal_fails() {
        // No payment links and no email: the background send fails quietly
        let state = create_test_app_state();
        let lead = {
            let conn = state.db.get().unwrap();
            create_test_lead(&conn, "Good Co", "good@b.co", Some("pro"))
        };

        let response = review(
            &state,
            &lead.id.to_string(),
            json!({"review_status": "approved"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let lead = get_lead(&state, lead.id);
        assert_eq!(lead.review_status, ReviewStatus::Approved);
        assert!(lead.proposal_sent_at.is_none());
    }

    #[tokio::test]
    async fn test_invalid_status() {
        let state = create_test_app_state();
        let lead = {
            let conn = state.db.get().unwrap();
            create_test_lead(&conn, "Acme", "a@b.co", None)
        };

        let response = review(
            &state,
            &lead.id.to_string(),
            json!({"review_status": "maybe"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid status. Must be one of: pending_review, approved, rejected, edit_needed"
        );
        assert_eq!(get_lead(&state, lead.id).review_status, ReviewStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_invalid_lead_id() {
        let state = create_test_app_state();

        let response = review(&state, "abc", json!({"review_status": "approved"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid lead ID");
    }

    #[tokio::test]
    async fn test_unknown_lead() {
        let state = create_test_app_state();

        let response = review(&state, "777", json!({"review_status": "rejected"})).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Lead not found");
    }
}
