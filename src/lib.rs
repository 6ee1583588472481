pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod monitor;
pub mod notify;
pub mod telemetry;

pub use error::{Error, Result};
