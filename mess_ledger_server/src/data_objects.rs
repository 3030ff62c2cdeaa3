use mess_ledger_engine::db_types::LineItem;
use mls_common::Rupees;
use serde::Deserialize;

/// A cart line as submitted by the till client.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub name: String,
    pub price: i64,
    pub qty: i64,
}

impl From<CartItem> for LineItem {
    fn from(item: CartItem) -> Self {
        LineItem::new(item.name, Rupees::from(item.price), item.qty)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettleOrderRequest {
    pub items: Vec<CartItem>,
    /// Client hint for how any non-allowance remainder will be paid. Labelling only.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAccountRequest {
    pub service_number: String,
    pub name: String,
    /// Overrides the server's configured starting allowance when present.
    #[serde(default)]
    pub starting_allowance: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryParams {
    /// When true (the default), near-simultaneous repeats of the same cart are collapsed in the returned view.
    #[serde(default = "default_true")]
    pub deduped: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActivityParams {
    #[serde(default = "default_activity_limit")]
    pub limit: i64,
}

fn default_true() -> bool {
    true
}

fn default_activity_limit() -> i64 {
    20
}
