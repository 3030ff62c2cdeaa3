use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mess_ledger_engine::{
    db_types::NewActivity,
    events::{AllowanceExceededEvent, AllowanceResetEvent, EventHandlers, EventHooks, EventProducers, PurchaseEvent},
    AccountApi,
    LedgerDatabase,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    reset_worker::start_reset_worker,
    routes::{health, my_account, order_by_id, order_history, recent_activity, register, settle_order},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::create(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(128, audit_hooks(db.clone()));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if config.run_reset_worker {
        start_reset_worker(db.clone(), producers.clone(), config.reset.clone());
    } else {
        info!("🕰️ The in-process allowance reset worker is disabled by configuration");
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the engine's events into the activity audit log. Audit writes are best-effort; a failed write is logged and
/// never affects the settlement that produced the event.
pub fn audit_hooks(db: SqliteDatabase) -> EventHooks {
    let mut hooks = EventHooks::default();
    let purchase_db = db.clone();
    hooks.on_purchase(move |ev: PurchaseEvent| {
        let db = purchase_db.clone();
        Box::pin(async move {
            if let Err(e) = db.log_activity(NewActivity::purchase(&ev.order, &ev.account)).await {
                warn!("📬️ Could not record purchase activity for order {}: {e}", ev.order.order_id);
            }
        })
    });
    let exceeded_db = db.clone();
    hooks.on_allowance_exceeded(move |ev: AllowanceExceededEvent| {
        let db = exceeded_db.clone();
        Box::pin(async move {
            if let Err(e) = db.log_activity(NewActivity::allowance_exceeded(&ev.order, &ev.account)).await {
                warn!("📬️ Could not record allowance-exceeded activity for order {}: {e}", ev.order.order_id);
            }
        })
    });
    hooks.on_reset(move |ev: AllowanceResetEvent| {
        let db = db.clone();
        Box::pin(async move {
            if let Err(e) = db.log_activity(NewActivity::allowance_reset(ev.summary, ev.base_credit)).await {
                warn!("📬️ Could not record allowance-reset activity: {e}");
            }
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let settlement_api = SettlementApi::new(db.clone(), producers.clone());
        let accounts_api = AccountApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(register)
            .service(my_account)
            .service(settle_order)
            .service(order_history)
            .service(order_by_id)
            .service(recent_activity);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mls::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
