use thiserror::Error;

use crate::{
    batch::BatchError,
    protocol::{ProtocolError, TransportError},
};

/// Failure of a submission or results exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("batch error: {0}")]
    Batch(#[from] BatchError),
}
