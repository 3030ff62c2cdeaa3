use log::*;
use mess_ledger_engine::{
    db_types::{LineItem, NewAccount, PaymentMethod},
    events::EventProducers,
    test_utils::prepare_env::fresh_test_ledger,
    AccountApi,
    SettlementApi,
    SettlementError,
    SqliteDatabase,
};
use mls_common::Rupees;
use rand::Rng;

async fn register(db: &SqliteDatabase, service_number: &str, name: &str, allowance: i64) -> i64 {
    let api = AccountApi::new(db.clone());
    let account = api
        .register_account(NewAccount {
            service_number: service_number.to_string(),
            name: name.to_string(),
            starting_allowance: Rupees::from(allowance),
        })
        .await
        .expect("Error registering account");
    account.id
}

#[tokio::test]
async fn allowance_covers_what_it_can_and_the_rest_is_cash_or_card() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-001", "Asha Rao", 1000).await;
    let api = SettlementApi::new(db, EventProducers::default());

    let items = vec![LineItem::new("chicken biryani", Rupees::from(750), 2)];
    let result = api.settle(id, items, "Credit Card", None).await.expect("Error settling order");
    assert!(!result.replayed);
    assert_eq!(result.order.total, Rupees::from(1500));
    assert_eq!(result.order.allowance_used, Rupees::from(1000));
    assert_eq!(result.order.cash_or_card_due, Rupees::from(500));
    assert_eq!(result.order.payment_method, PaymentMethod::CreditCard);
    assert_eq!(result.account.allowance_remaining, Rupees::from(0));
    assert_eq!(result.account.total_spent, Rupees::from(1000));
    // Went from 0% straight past 50%.
    assert!(result.alerts.threshold_crossed);
    assert_eq!(result.alerts.base_limit, Rupees::from(1000));
    info!("🧾️ Split settlement checked out");
}

#[tokio::test]
async fn exhausted_allowance_leaves_the_ledger_untouched() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-002", "Vikram Iyer", 0).await;
    let api = SettlementApi::new(db, EventProducers::default());

    let items = vec![LineItem::new("masala dosa", Rupees::from(100), 2)];
    let result = api.settle(id, items, "cash", None).await.expect("Error settling order");
    assert_eq!(result.order.allowance_used, Rupees::from(0));
    assert_eq!(result.order.cash_or_card_due, Rupees::from(200));
    assert_eq!(result.order.payment_method, PaymentMethod::Cash);
    assert_eq!(result.account.total_spent, Rupees::from(0));
    assert!(!result.alerts.threshold_crossed);
}

#[tokio::test]
async fn fully_covered_orders_are_labelled_monthly_allowance() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-003", "Meera Nair", 1000).await;
    let api = SettlementApi::new(db, EventProducers::default());

    // The client's stated intent is ignored when nothing is left over to pay.
    let items = vec![LineItem::new("lime juice", Rupees::from(40), 3)];
    let result = api.settle(id, items, "Credit Card", None).await.expect("Error settling order");
    assert_eq!(result.order.cash_or_card_due, Rupees::from(0));
    assert_eq!(result.order.payment_method, PaymentMethod::MonthlyAllowance);
    assert_eq!(result.account.allowance_remaining, Rupees::from(880));
}

#[tokio::test]
async fn half_used_notification_fires_exactly_once_per_cycle() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-004", "Rohan Menon", 1000).await;
    let api = SettlementApi::new(db, EventProducers::default());

    let result = api
        .settle(id, vec![LineItem::new("thali", Rupees::from(600), 1)], "cash", None)
        .await
        .expect("Error settling order");
    assert!(result.alerts.threshold_crossed);
    assert!(result.account.half_used_notified);

    // Deeper into the allowance, but the one-shot flag has already fired.
    let result = api
        .settle(id, vec![LineItem::new("filter coffee", Rupees::from(50), 4)], "cash", None)
        .await
        .expect("Error settling order");
    assert!(!result.alerts.threshold_crossed);
    assert!(result.account.half_used_notified);
}

#[tokio::test]
async fn malformed_carts_are_rejected_before_touching_the_ledger() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-005", "Tara Pillai", 500).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());

    let err = api.settle(id, vec![], "cash", None).await.err();
    assert!(matches!(err, Some(SettlementError::InvalidRequest(_))), "{err:?}");

    let items = vec![LineItem::new("samosa", Rupees::from(25), 0)];
    let err = api.settle(id, items, "cash", None).await.err();
    assert!(matches!(err, Some(SettlementError::InvalidRequest(_))), "{err:?}");

    // An absurd price must come back as a clean rejection, not wrapped arithmetic.
    let items = vec![LineItem::new("gold thali", Rupees::from(i64::MAX / 2), 3)];
    let err = api.settle(id, items, "cash", None).await.err();
    assert!(matches!(err, Some(SettlementError::InvalidRequest(_))), "{err:?}");

    let account = AccountApi::new(db).account_by_id(id).await.expect("Error fetching account");
    assert_eq!(account.map(|a| a.allowance_remaining), Some(Rupees::from(500)));
}

#[tokio::test]
async fn settling_for_an_unknown_account_fails() {
    let db = fresh_test_ledger().await;
    let api = SettlementApi::new(db, EventProducers::default());
    let items = vec![LineItem::new("samosa", Rupees::from(25), 1)];
    let err = api.settle(999, items, "cash", None).await.err();
    assert!(matches!(err, Some(SettlementError::AccountNotFound(999))), "{err:?}");
}

#[tokio::test]
async fn balances_never_go_negative_under_a_random_order_stream() {
    let db = fresh_test_ledger().await;
    let id = register(&db, "SN-006", "Kiran Das", 5000).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());

    let mut rng = rand::thread_rng();
    for i in 0..20 {
        let price = Rupees::from(rng.gen_range(1..1200));
        let qty = rng.gen_range(1..4);
        // Unique names keep the duplicate scan out of the way.
        let items = vec![LineItem::new(format!("special #{i}"), price, qty)];
        api.settle(id, items, "cash", None).await.expect("Error settling order");
    }
    let account = AccountApi::new(db)
        .account_by_id(id)
        .await
        .expect("Error fetching account")
        .expect("Account disappeared");
    assert!(account.allowance_remaining >= Rupees::from(0));
    // Every debit moves allowance into spend, so the implied limit is conserved.
    assert_eq!(account.base_limit(), Rupees::from(5000));
}
