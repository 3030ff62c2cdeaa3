mod history;
mod settlement;
mod signature;

pub use history::{dedup_order_history, HISTORY_DEDUP_WINDOW_SECS};
pub use settlement::{check_half_threshold, split_charge, SplitAmounts, ThresholdCheck};
pub use signature::items_signature;
