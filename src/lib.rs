pub mod batch;
pub mod bet;
pub mod client;
pub mod codec;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod signal;

#[cfg(test)]
mod testing;

pub use bet::Bet;
pub use client::{Client, ClientConfig, PollOutcome};
pub use error::ExchangeError;
pub use logging::LogSink;
pub use signal::StopSignal;
