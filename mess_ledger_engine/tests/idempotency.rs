use mess_ledger_engine::{
    db_types::{LineItem, NewAccount},
    events::EventProducers,
    test_utils::prepare_env::fresh_test_ledger,
    AccountApi,
    SettlementApi,
    SettlementError,
    SqliteDatabase,
};
use mls_common::Rupees;

async fn register(db: &SqliteDatabase, service_number: &str, allowance: i64) -> i64 {
    let api = AccountApi::new(db.clone());
    let account = api
        .register_account(NewAccount {
            service_number: service_number.to_string(),
            name: "Test Cadet".to_string(),
            starting_allowance: Rupees::from(allowance),
        })
        .await
        .expect("Error registering account");
    account.id
}

fn cart() -> Vec<LineItem> {
    vec![LineItem::new("veg thali", Rupees::from(150), 2)]
}

#[tokio::test]
async fn a_repeated_idempotency_key_replays_the_original_order() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-101", 1000).await;
    let api = SettlementApi::new(db, EventProducers::default());

    let first = api.settle(id, cart(), "cash", Some("key-1".into())).await.expect("Error settling order");
    assert!(!first.replayed);
    assert_eq!(first.account.allowance_remaining, Rupees::from(700));

    let second = api.settle(id, cart(), "cash", Some("key-1".into())).await.expect("Error settling order");
    assert!(second.replayed);
    assert_eq!(second.order.order_id, first.order.order_id);
    // The ledger moved exactly once.
    assert_eq!(second.account.allowance_remaining, Rupees::from(700));
    assert_eq!(second.account.total_spent, Rupees::from(300));
}

#[tokio::test]
async fn concurrent_submissions_with_the_same_key_debit_once() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-102", 1000).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());

    let (a, b) = tokio::join!(
        api.settle(id, cart(), "cash", Some("key-race".into())),
        api.settle(id, cart(), "cash", Some("key-race".into())),
    );
    let a = a.expect("Error settling order");
    let b = b.expect("Error settling order");
    // Whoever lost the race replayed the winner's record.
    assert_eq!(a.order.order_id, b.order.order_id);
    assert!(a.replayed != b.replayed || (a.replayed && b.replayed));

    let accounts = AccountApi::new(db.clone());
    let account = accounts.account_by_id(id).await.expect("Error fetching account").expect("Account disappeared");
    assert_eq!(account.allowance_remaining, Rupees::from(700));
    assert_eq!(account.total_spent, Rupees::from(300));

    let order = accounts.order_by_idempotency_key("key-race").await.expect("Error fetching order");
    assert!(order.is_some());
    let history = accounts.order_history(id, false).await.expect("Error fetching history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn a_key_never_replays_another_accounts_order() {
    let db = fresh_test_ledger().await;
    let asha = register(&db, "SN-110", 1000).await;
    let vikram = register(&db, "SN-111", 1000).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());

    let first = api.settle(asha, cart(), "cash", Some("key-shared".into())).await.expect("Error settling order");
    assert!(!first.replayed);

    // A second account presenting the same key must not be handed the first account's receipt.
    let err = api
        .settle(vikram, vec![LineItem::new("paneer roll", Rupees::from(90), 1)], "cash", Some("key-shared".into()))
        .await
        .err();
    assert!(matches!(err, Some(SettlementError::InvalidRequest(_))), "{err:?}");

    let accounts = AccountApi::new(db);
    let untouched =
        accounts.account_by_id(vikram).await.expect("Error fetching account").expect("Account disappeared");
    assert_eq!(untouched.allowance_remaining, Rupees::from(1000));
    assert_eq!(untouched.total_spent, Rupees::from(0));
    assert!(accounts.order_history(vikram, false).await.expect("Error fetching history").is_empty());

    // The original owner still replays their own order under that key.
    let replay = accounts.order_by_idempotency_key("key-shared").await.expect("Error fetching order");
    assert_eq!(replay.map(|o| o.account_id), Some(asha));
}

#[tokio::test]
async fn distinct_keys_settle_independently() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-103", 1000).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());

    let first = api.settle(id, cart(), "cash", Some("key-a".into())).await.expect("Error settling order");
    let second = api.settle(id, cart(), "cash", Some("key-b".into())).await.expect("Error settling order");
    assert!(!first.replayed);
    assert!(!second.replayed);
    assert_ne!(first.order.order_id, second.order.order_id);

    let account = AccountApi::new(db)
        .account_by_id(id)
        .await
        .expect("Error fetching account")
        .expect("Account disappeared");
    assert_eq!(account.allowance_remaining, Rupees::from(400));
}
