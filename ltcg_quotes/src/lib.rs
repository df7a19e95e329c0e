mod client;
mod errors;
pub mod symbol;
pub mod types;
mod user_agent;
pub use self::client::Client;
pub use self::errors::Error;
pub use self::symbol::{Exchange, ExchangeSymbol};
pub use self::types::Quote;
