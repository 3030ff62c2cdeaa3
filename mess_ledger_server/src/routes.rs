//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Each worker thread processes its requests sequentially, so a handler that blocks the current thread stalls the
//! whole worker. Any long, non-cpu-bound operation (I/O, database queries) must be awaited, never blocked on.
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use mess_ledger_engine::{
    db_types::{LineItem, NewAccount, OrderId},
    AccountApi,
    SettlementApi,
    SqliteDatabase,
};
use mls_common::Rupees;

use crate::{
    config::ServerConfig,
    data_objects::{ActivityParams, HistoryParams, RegisterAccountRequest, SettleOrderRequest},
    errors::ServerError,
};

/// Route handler for the health check endpoint
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Registers a new ledger account. The starting allowance falls back to the server's configured default when the
/// request does not carry one.
#[post("/account/register")]
pub async fn register(
    req: web::Json<RegisterAccountRequest>,
    api: web::Data<AccountApi<SqliteDatabase>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let req = req.into_inner();
    let starting_allowance = req.starting_allowance.map(Rupees::from).unwrap_or(config.starting_allowance);
    if starting_allowance.value() < 0 {
        return Err(ServerError::InvalidRequestBody("the starting allowance cannot be negative".into()));
    }
    let account = api
        .register_account(NewAccount { service_number: req.service_number, name: req.name, starting_allowance })
        .await?;
    debug!("💻️ Registered account #{} ({})", account.id, account.service_number);
    Ok(HttpResponse::Created().json(account))
}

/// Returns the calling cadet's ledger snapshot.
#[get("/account")]
pub async fn my_account(
    req: HttpRequest,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let account_id = account_id_from_headers(&req)?;
    let account = api
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Account #{account_id} is not registered")))?;
    Ok(HttpResponse::Ok().json(account))
}

/// Settles a cart against the calling cadet's allowance ledger. Replays (idempotency key or duplicate resubmission)
/// return the original order with a 200 rather than settling again.
#[post("/order/create")]
pub async fn settle_order(
    req: HttpRequest,
    body: web::Json<SettleOrderRequest>,
    api: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let account_id = account_id_from_headers(&req)?;
    let body = body.into_inner();
    let items = body.items.into_iter().map(LineItem::from).collect::<Vec<_>>();
    let hint = body.payment_method.unwrap_or_default();
    let result = api.settle(account_id, items, &hint, body.idempotency_key).await?;
    if result.replayed {
        Ok(HttpResponse::Ok().json(result))
    } else {
        Ok(HttpResponse::Created().json(result))
    }
}

/// The calling cadet's order history, newest first.
#[get("/order/history")]
pub async fn order_history(
    req: HttpRequest,
    params: web::Query<HistoryParams>,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let account_id = account_id_from_headers(&req)?;
    let orders = api.order_history(account_id, params.deduped).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Fetches a single order by its business id, e.g. `RCP-20250801-4821`.
#[get("/order/{order_id}")]
pub async fn order_by_id(
    path: web::Path<String>,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api
        .order_by_order_id(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order with id {order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

/// The most recent audit records.
#[get("/activity/recent")]
pub async fn recent_activity(
    params: web::Query<ActivityParams>,
    api: web::Data<AccountApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let limit = params.limit.clamp(1, 200);
    let records = api.recent_activity(limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Extracts the caller's account id from the `X-Account-Id` header.
fn account_id_from_headers(req: &HttpRequest) -> Result<i64, ServerError> {
    req.headers()
        .get("X-Account-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ServerError::InvalidRequestBody("A numeric X-Account-Id header is required".into()))
}
