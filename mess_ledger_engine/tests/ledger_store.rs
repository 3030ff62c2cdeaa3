use mess_ledger_engine::{
    db_types::{LineItem, NewAccount, OrderId},
    helpers::items_signature,
    test_utils::prepare_env::fresh_test_ledger,
    AccountManagement,
    LedgerDatabase,
    SettlementOutcome,
    SettlementRequest,
    SqliteDatabase,
    SqliteDatabaseError,
};
use mls_common::Rupees;

async fn register(db: &SqliteDatabase, service_number: &str, allowance: i64) -> i64 {
    let account = db
        .register_account(NewAccount {
            service_number: service_number.to_string(),
            name: "Test Cadet".to_string(),
            starting_allowance: Rupees::from(allowance),
        })
        .await
        .expect("Error registering account");
    account.id
}

fn request_for(account_id: i64, order_id: OrderId, items: Vec<LineItem>, total: i64) -> SettlementRequest {
    let items_signature = items_signature(&items);
    SettlementRequest {
        account_id,
        order_id,
        items,
        items_signature,
        total: Rupees::from(total),
        payment_hint: "cash".to_string(),
        idempotency_key: None,
        duplicate_window_secs: 0,
    }
}

#[tokio::test]
async fn over_debits_clamp_at_zero_and_book_only_the_covered_spend() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-401", 1000).await;

    let remaining = db.apply_allowance_debit(id, Rupees::from(1500)).await.expect("Error applying debit");
    assert_eq!(remaining, Rupees::from(0));

    let account = db.fetch_account(id).await.expect("Error fetching account").expect("Account disappeared");
    assert_eq!(account.allowance_remaining, Rupees::from(0));
    // Only the rupees that were actually there count as spend.
    assert_eq!(account.total_spent, Rupees::from(1000));
}

#[tokio::test]
async fn debiting_an_unknown_account_fails_cleanly() {
    let db = fresh_test_ledger().await;
    let err = db.apply_allowance_debit(999, Rupees::from(100)).await.err();
    assert!(matches!(err, Some(SqliteDatabaseError::AccountNotFound(999))), "{err:?}");
}

#[tokio::test]
async fn a_taken_receipt_number_is_rerolled_instead_of_failing() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-402", 1000).await;

    let taken = OrderId("RCP-20990101-4821".to_string());
    let first = request_for(id, taken.clone(), vec![LineItem::new("idli plate", Rupees::from(60), 1)], 60);
    let outcome = db.settle_order(first).await.expect("Error settling order");
    assert!(matches!(outcome, SettlementOutcome::Fresh { .. }));

    // A different cart that happens to draw the same receipt number must still settle, under a fresh number.
    let second = request_for(id, taken.clone(), vec![LineItem::new("vada plate", Rupees::from(50), 2)], 100);
    let outcome = db.settle_order(second).await.expect("Error settling order");
    match outcome {
        SettlementOutcome::Fresh { order, account, .. } => {
            assert_ne!(order.order_id, taken);
            assert_eq!(account.allowance_remaining, Rupees::from(840));
        },
        other => panic!("Expected a fresh settlement, got {other:?}"),
    }
}
