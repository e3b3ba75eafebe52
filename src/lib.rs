pub mod config;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod logging;
pub mod secrets;
pub mod server;
pub mod sizing;

pub use config::Config;
pub use error::{Result, TradeError};
pub use handler::{execute_buy, handle, invoke, InvocationRequest, InvocationResponse};
