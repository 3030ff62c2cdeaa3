mod rupees;

pub mod op;

pub use rupees::{Rupees, RupeesConversionError, RUPEE_CURRENCY_CODE};
