//! Conversion planning and trade execution

pub mod allocator;
pub mod balance_handler;
pub mod dispatcher;
pub mod job;

pub use allocator::{Allocation, ConversionRules, Target};
pub use balance_handler::BalanceEventHandler;
pub use dispatcher::{DispatcherStats, JobOutcome, Resolution, TradeDispatcher};
pub use job::{Route, TradeJob};
