//! Exchange and notification collaborators

pub mod binance;
pub mod telegram;
pub mod traits;
pub mod user_stream;

pub use binance::BinanceRestClient;
pub use telegram::TelegramSink;
pub use traits::*;
pub use user_stream::{spawn_keepalive, UserDataStream};
