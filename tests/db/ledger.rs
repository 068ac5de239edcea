//! Webhook event ledger tests

#[path = "../common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_first_delivery_is_new() {
    let conn = setup_test_db();

    let entry = queries::record_webhook_event(&conn, "evt_1", "checkout.session.completed").unwrap();
    assert_eq!(entry, LedgerEntry::New);

    let record = queries::get_webhook_event(&conn, "evt_1").unwrap().unwrap();
    assert_eq!(record.event_type, "checkout.session.completed");
    assert!(!record.processed);
}

#[test]
fn test_unprocessed_redelivery_is_unfinished() {
    let conn = setup_test_db();
    queries::record_webhook_event(&conn, "evt_1", "checkout.session.completed").unwrap();

    let entry = queries::record_webhook_event(&conn, "evt_1", "checkout.session.completed").unwrap();
    assert_eq!(entry, LedgerEntry::Unfinished);
    assert_eq!(queries::count_webhook_events(&conn).unwrap(), 1);
}

#[test]
fn test_processed_redelivery_is_duplicate() {
    let conn = setup_test_db();
    queries::record_webhook_event(&conn, "evt_1", "checkout.session.completed").unwrap();
    assert!(queries::mark_webhook_event_processed(&conn, "evt_1").unwrap());

    let entry = queries::record_webhook_event(&conn, "evt_1", "checkout.session.completed").unwrap();
    assert_eq!(entry, LedgerEntry::Duplicate);
}

#[test]
fn test_mark_unknown_event() {
    let conn = setup_test_db();
    assert!(!queries::mark_webhook_event_processed(&conn, "evt_missing").unwrap());
    assert!(queries::get_webhook_event(&conn, "evt_missing").unwrap().is_none());
}
