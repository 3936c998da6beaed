//! Client-server communication protocol.
//!
//! This module defines the byte-exact protocol spoken between lottery agencies and
//! the lottery server: the opcode vocabulary, the length-prefixed framing, the
//! transport that moves whole buffers over a stream, and the two exchanges a
//! client drives.
//!
//! # Binary Format
//!
//! - Opcodes are a single byte (see [`Opcode`]).
//! - Frames are a two byte, big-endian, unsigned length followed by that many
//!   payload bytes. A zero length frame carries no payload.
//! - Payloads are delimited text produced by [`BetCodec`](crate::codec::BetCodec)
//!   or, for results, winner ids joined by [`WINNER_SEPARATOR`].
//!
//! # Exchanges
//!
//! Submission: `[SENDING_BETS]`, then one frame per batch each answered by a
//! single `[BATCH_RECEIVED]` byte, then the empty completion frame `[0x00 0x00]`
//! which is not answered.
//!
//! Results: `[REQUEST_RESULTS][agency]`, answered by `[RESULTS_NOT_READY]` or by
//! `[SENDING_RESULTS]` followed by a frame of winners. Every results request
//! uses its own connection.
//!
//! # Key Components
//!
//! - [`ReliableTransport`]: Full-buffer sends and exact-length receives over a stream.
//! - [`FrameCodec`]: Encodes and decodes frame length prefixes.
//! - [`ProtocolSession`]: Client side of both exchanges.
//! - [`LotteryServer`]: Reference server implementing the counterparty.
//!
//! # Limitations
//!
//! The agency id travels as one byte, so only agencies `0..=255` can request
//! results.
mod frame;
mod server;
mod session;
mod thread;
mod transport;

use std::string::FromUtf8Error;

use thiserror::Error;

use thread::ThreadPool;

pub use frame::{FrameCodec, LEN_PREFIX_SIZE};
pub use server::{LotteryServer, ServerConfig};
pub use session::ProtocolSession;
pub use transport::{Connector, ReliableTransport, TcpConnector, TransportError};

use crate::codec::ParseError;

pub const WINNER_SEPARATOR: char = '$';

/// Single byte tag identifying the purpose of a message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    SendingBets = 0,
    BatchReceived = 1,
    RequestResults = 2,
    ResultsNotReady = 3,
    SendingResults = 4,
    Error = 5,
}

impl Opcode {
    pub fn decode(code: u8) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Opcode::SendingBets),
            1 => Ok(Opcode::BatchReceived),
            2 => Ok(Opcode::RequestResults),
            3 => Ok(Opcode::ResultsNotReady),
            4 => Ok(Opcode::SendingResults),
            5 => Ok(Opcode::Error),
            code => Err(ProtocolError::UnexpectedCode(code)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value as u8
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("error received from server")]
    Rejected,

    #[error("unexpected code received from peer: {0}")]
    UnexpectedCode(u8),

    #[error("payload of {0} bytes does not fit in a frame")]
    FrameTooLarge(usize),

    #[error("failed to encode frame header: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode frame header: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("results payload is not valid utf-8: {0}")]
    InvalidResults(#[from] FromUtf8Error),

    #[error("malformed batch: {0}")]
    MalformedBatch(#[from] ParseError),
}

/// Winner ids joined by [`WINNER_SEPARATOR`].
pub fn encode_winners<S: AsRef<str>>(winners: &[S]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (i, winner) in winners.iter().enumerate() {
        if i > 0 {
            payload.push(WINNER_SEPARATOR as u8);
        }
        payload.extend_from_slice(winner.as_ref().as_bytes());
    }
    payload
}

/// Inverse of [`encode_winners`]; an empty payload means no winners.
pub fn decode_winners(payload: Vec<u8>) -> Result<Vec<String>, ProtocolError> {
    let payload = String::from_utf8(payload)?;
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    Ok(payload.split(WINNER_SEPARATOR).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_values() {
        let codes = [
            (Opcode::SendingBets, 0),
            (Opcode::BatchReceived, 1),
            (Opcode::RequestResults, 2),
            (Opcode::ResultsNotReady, 3),
            (Opcode::SendingResults, 4),
            (Opcode::Error, 5),
        ];

        for (opcode, byte) in codes {
            assert_eq!(u8::from(opcode), byte);
            assert_eq!(Opcode::decode(byte).unwrap(), opcode);
        }
    }

    #[test]
    fn unknown_opcode() {
        assert!(matches!(
            Opcode::decode(42),
            Err(ProtocolError::UnexpectedCode(42))
        ));
    }

    #[test]
    fn winners_split_on_separator() {
        assert_eq!(
            decode_winners(b"1$2$3".to_vec()).unwrap(),
            vec!["1".to_string(), "2".to_string(), "3".to_string()]
        );
        assert!(decode_winners(Vec::new()).unwrap().is_empty());
        assert_eq!(encode_winners(&["30111222", "40222333"]), b"30111222$40222333");
    }
}
