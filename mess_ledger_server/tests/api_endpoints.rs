use std::time::Duration;

use actix_web::{middleware::Logger, test, web, App};
use mess_ledger_engine::{
    events::EventHandlers,
    test_utils::prepare_env::fresh_test_ledger,
    AccountApi,
    SettlementApi,
};
use mess_ledger_server::{
    config::ServerConfig,
    routes::{health, my_account, order_history, recent_activity, register, settle_order},
    server::audit_hooks,
};
use serde_json::{json, Value};

macro_rules! test_app {
    ($db:expr, $producers:expr) => {
        test::init_service(
            App::new()
                .wrap(Logger::default())
                .app_data(web::Data::new(SettlementApi::new($db.clone(), $producers)))
                .app_data(web::Data::new(AccountApi::new($db.clone())))
                .app_data(web::Data::new(ServerConfig::default()))
                .service(health)
                .service(
                    web::scope("/api")
                        .service(register)
                        .service(my_account)
                        .service(settle_order)
                        .service(order_history)
                        .service(recent_activity),
                ),
        )
        .await
    };
}

#[actix_web::test]
async fn health_check() {
    let db = fresh_test_ledger().await;
    let app = test_app!(db, Default::default());
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn register_settle_and_read_back() {
    let db = fresh_test_ledger().await;
    let handlers = EventHandlers::new(8, audit_hooks(db.clone()));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let app = test_app!(db, producers);

    let req = test::TestRequest::post()
        .uri("/api/account/register")
        .set_json(json!({ "service_number": "SN-1042", "name": "Asha Rao", "starting_allowance": 1000 }))
        .to_request();
    let account: Value = test::call_and_read_body_json(&app, req).await;
    let id = account["id"].as_i64().expect("Account id missing");
    assert_eq!(account["allowance_remaining"], json!(1000));

    let req = test::TestRequest::post()
        .uri("/api/order/create")
        .insert_header(("X-Account-Id", id.to_string()))
        .set_json(json!({
            "items": [{ "name": "chicken biryani", "price": 750, "qty": 2 }],
            "payment_method": "Credit Card",
            "idempotency_key": "e2e-1",
        }))
        .to_request();
    let settled: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(settled["replayed"], json!(false));
    assert_eq!(settled["order"]["allowance_used"], json!(1000));
    assert_eq!(settled["order"]["cash_or_card_due"], json!(500));
    assert_eq!(settled["alerts"]["threshold_crossed"], json!(true));

    // Same key again replays without another debit.
    let req = test::TestRequest::post()
        .uri("/api/order/create")
        .insert_header(("X-Account-Id", id.to_string()))
        .set_json(json!({
            "items": [{ "name": "chicken biryani", "price": 750, "qty": 2 }],
            "idempotency_key": "e2e-1",
        }))
        .to_request();
    let replayed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replayed["replayed"], json!(true));
    assert_eq!(replayed["account"]["allowance_remaining"], json!(0));

    let req = test::TestRequest::get()
        .uri("/api/account")
        .insert_header(("X-Account-Id", id.to_string()))
        .to_request();
    let account: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(account["total_spent"], json!(1000));

    let req = test::TestRequest::get()
        .uri("/api/order/history")
        .insert_header(("X-Account-Id", id.to_string()))
        .to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(history.as_array().map(|v| v.len()), Some(1));

    // Audit writes ride on the event hooks, so give them a beat to land.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let req = test::TestRequest::get().uri("/api/activity/recent").to_request();
    let activity: Value = test::call_and_read_body_json(&app, req).await;
    let kinds = activity
        .as_array()
        .map(|v| v.iter().filter_map(|r| r["kind"].as_str().map(str::to_string)).collect::<Vec<_>>())
        .unwrap_or_default();
    assert!(kinds.contains(&"purchase".to_string()), "{kinds:?}");
    assert!(kinds.contains(&"allowance".to_string()), "{kinds:?}");
}

#[actix_web::test]
async fn missing_account_header_is_a_bad_request() {
    let db = fresh_test_ledger().await;
    let app = test_app!(db, Default::default());
    let req = test::TestRequest::post()
        .uri("/api/order/create")
        .set_json(json!({ "items": [{ "name": "tea", "price": 20, "qty": 1 }] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn settling_for_an_unknown_account_is_a_404() {
    let db = fresh_test_ledger().await;
    let app = test_app!(db, Default::default());
    let req = test::TestRequest::post()
        .uri("/api/order/create")
        .insert_header(("X-Account-Id", "4242"))
        .set_json(json!({ "items": [{ "name": "tea", "price": 20, "qty": 1 }] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}
