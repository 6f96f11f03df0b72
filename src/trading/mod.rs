pub mod journal;
pub mod lifecycle;
pub mod reconcile;
pub mod trade;

pub use journal::TradeJournal;
pub use lifecycle::{PositionState, TradeLifecycleManager};
pub use reconcile::{reconcile, ReconciliationReport};
pub use trade::{ExitCondition, PartialFill, Trade};
