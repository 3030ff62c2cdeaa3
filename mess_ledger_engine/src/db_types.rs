use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mls_common::Rupees;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::Type;
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// The human-readable business id of an order, e.g. `RCP-20250801-4821`. It is unique, but purely cosmetic; no
/// settlement logic keys off its format.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id with a date-based prefix and a random 4-digit suffix.
    pub fn generate() -> Self {
        let date = Utc::now().format("%Y%m%d");
        let suffix = rand::thread_rng().gen_range(1000..10_000);
        Self(format!("RCP-{date}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        LineItem        ------------------------------------------------------
/// A single cart line. Quantities are always positive; unit prices are never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit_price: Rupees,
    pub quantity: i64,
}

impl LineItem {
    pub fn new<S: Into<String>>(name: S, unit_price: Rupees, quantity: i64) -> Self {
        Self { name: name.into(), unit_price, quantity }
    }

    /// The line's price, or `None` when `unit_price * quantity` cannot be represented. Prices and quantities arrive
    /// from clients, so the arithmetic here must never be allowed to wrap.
    pub fn line_total(&self) -> Option<Rupees> {
        self.unit_price.checked_mul(self.quantity)
    }

    /// Returns a copy with the name trimmed. Signatures and stored orders always use normalized lines.
    pub fn normalized(&self) -> Self {
        Self { name: self.name.trim().to_string(), unit_price: self.unit_price, quantity: self.quantity }
    }
}

//--------------------------------------     PaymentMethod      ------------------------------------------------------
/// The label recorded against an order. The label never changes the settlement arithmetic; it only describes how the
/// non-allowance remainder (if any) was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    MonthlyAllowance,
    Cash,
    CreditCard,
}

impl PaymentMethod {
    /// Interprets a free-text client hint as the method for the cash/card remainder. Unrecognised hints fall back to
    /// cash, matching the behaviour at the till.
    pub fn remainder_from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if hint.contains("credit") {
            PaymentMethod::CreditCard
        } else {
            PaymentMethod::Cash
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::MonthlyAllowance => write!(f, "Monthly Allowance"),
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::CreditCard => write!(f, "Credit Card"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment method: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Monthly Allowance" => Ok(Self::MonthlyAllowance),
            "Cash" => Ok(Self::Cash),
            "Credit Card" => Ok(Self::CreditCard),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid payment method in record: {value}. Defaulting to Cash");
            PaymentMethod::Cash
        })
    }
}

//--------------------------------------     CadetAccount       ------------------------------------------------------
/// A cadet's ledger row. `allowance_remaining` is never negative, and the cycle limit is always reconstructible as
/// `allowance_remaining + total_spent`; every mutation path must preserve that sum within a cycle.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CadetAccount {
    pub id: i64,
    pub service_number: String,
    pub name: String,
    pub allowance_remaining: Rupees,
    pub total_spent: Rupees,
    pub half_used_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CadetAccount {
    /// The implied monthly limit for the current cycle. There is no independently stored limit.
    pub fn base_limit(&self) -> Rupees {
        self.allowance_remaining + self.total_spent
    }

    /// Fraction of the cycle limit consumed so far, in `[0, 1]`. Zero when the limit is zero.
    pub fn used_ratio(&self) -> f64 {
        let limit = self.base_limit().value();
        if limit <= 0 {
            0.0
        } else {
            self.total_spent.value() as f64 / limit as f64
        }
    }

    pub fn used_percent(&self) -> i64 {
        (self.used_ratio() * 100.0).round() as i64
    }

    /// The cadet's first name, falling back to the service number. Used in audit messages.
    pub fn short_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.service_number)
    }
}

/// Registration data for a new ledger account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub service_number: String,
    pub name: String,
    pub starting_allowance: Rupees,
}

//--------------------------------------      OrderRecord       ------------------------------------------------------
/// A settled order. Immutable once written, except for the pickup-verification fields, which are outside the
/// settlement path.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub account_id: i64,
    pub items: Vec<LineItem>,
    pub items_signature: String,
    pub total: Rupees,
    pub allowance_used: Rupees,
    pub cash_or_card_due: Rupees,
    pub payment_method: PaymentMethod,
    pub idempotency_key: Option<String>,
    pub pickup_verified: bool,
    pub collected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The write-side of [`OrderRecord`]: everything the settlement transaction needs to persist a fresh order.
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub order_id: OrderId,
    pub account_id: i64,
    pub items: Vec<LineItem>,
    pub items_signature: String,
    pub total: Rupees,
    pub allowance_used: Rupees,
    pub cash_or_card_due: Rupees,
    pub payment_method: PaymentMethod,
    pub idempotency_key: Option<String>,
}

//--------------------------------------   Settlement results   ------------------------------------------------------
/// Threshold metadata returned to the client alongside a settled order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettlementAlerts {
    pub threshold_crossed: bool,
    pub used_percent: i64,
    pub base_limit: Rupees,
}

/// Outcome of a bulk allowance reset run. `attempted` counts accounts selected for reset; `confirmed` counts rows the
/// store acknowledged. The two differ only when a batch fails mid-run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResetSummary {
    pub attempted: u64,
    pub confirmed: u64,
}

//--------------------------------------      Activity log      ------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Purchase,
    Inventory,
    Allowance,
    System,
}

impl Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Purchase => write!(f, "purchase"),
            ActivityKind::Inventory => write!(f, "inventory"),
            ActivityKind::Allowance => write!(f, "allowance"),
            ActivityKind::System => write!(f, "system"),
        }
    }
}

impl From<String> for ActivityKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "purchase" => Self::Purchase,
            "inventory" => Self::Inventory,
            "allowance" => Self::Allowance,
            _ => Self::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Cadet,
    Manager,
    System,
}

impl Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorType::Cadet => write!(f, "cadet"),
            ActorType::Manager => write!(f, "manager"),
            ActorType::System => write!(f, "system"),
        }
    }
}

impl From<String> for ActorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "cadet" => Self::Cadet,
            "manager" => Self::Manager,
            _ => Self::System,
        }
    }
}

/// A human-readable audit record. Append-only; the engine never reads these back for correctness.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub kind: ActivityKind,
    pub message: String,
    pub amount: Rupees,
    pub unit: String,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub message: String,
    pub amount: Rupees,
    pub unit: String,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub meta: serde_json::Value,
}

impl NewActivity {
    pub fn purchase(order: &OrderRecord, account: &CadetAccount) -> Self {
        let first_item = order.items.first().map(|i| i.name.as_str()).unwrap_or("items");
        Self {
            kind: ActivityKind::Purchase,
            message: format!("Cadet {} purchased {first_item}", account.short_name()),
            amount: order.total,
            unit: "Rs".to_string(),
            actor_type: ActorType::Cadet,
            actor_id: account.service_number.clone(),
            meta: json!({ "orderId": order.order_id.as_str() }),
        }
    }

    pub fn allowance_exceeded(order: &OrderRecord, account: &CadetAccount) -> Self {
        Self {
            kind: ActivityKind::Allowance,
            message: format!("Cadet {} exceeded credit limit", account.short_name()),
            amount: -order.cash_or_card_due,
            unit: "Rs".to_string(),
            actor_type: ActorType::Cadet,
            actor_id: account.service_number.clone(),
            meta: json!({ "orderId": order.order_id.as_str() }),
        }
    }

    pub fn allowance_reset(summary: ResetSummary, base_credit: Option<Rupees>) -> Self {
        Self {
            kind: ActivityKind::Allowance,
            message: "Monthly credit allocation completed".to_string(),
            amount: base_credit.unwrap_or_default(),
            unit: "Rs".to_string(),
            actor_type: ActorType::System,
            actor_id: String::new(),
            meta: json!({
                "attempted": summary.attempted,
                "confirmed": summary.confirmed,
                "baseCredit": base_credit.map(|c| c.value()),
            }),
        }
    }
}
