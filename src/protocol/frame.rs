use std::fmt;

use bincode::config::{BigEndian, Configuration, Fixint};

use super::{Opcode, ProtocolError};

/// Size of a frame's length prefix.
pub const LEN_PREFIX_SIZE: usize = size_of::<u16>();

/// Encodes the fixed-width header fields of the protocol.
///
/// Integers are written big-endian at their natural width, so a frame length
/// always occupies exactly [`LEN_PREFIX_SIZE`] bytes.
#[derive(Clone, Copy)]
pub struct FrameCodec {
    config: Configuration<BigEndian, Fixint>,
}

impl fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCodec").finish_non_exhaustive()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_fixed_int_encoding();
        Self { config }
    }

    pub fn encode_len(&self, len: usize) -> Result<[u8; LEN_PREFIX_SIZE], ProtocolError> {
        let len = u16::try_from(len).map_err(|_| ProtocolError::FrameTooLarge(len))?;
        let mut prefix = [0; LEN_PREFIX_SIZE];
        bincode::encode_into_slice(len, &mut prefix, self.config)?;
        Ok(prefix)
    }

    pub fn decode_len(&self, prefix: &[u8]) -> Result<usize, ProtocolError> {
        let (len, _): (u16, usize) = bincode::decode_from_slice(prefix, self.config)?;
        Ok(usize::from(len))
    }

    /// `[len:2][payload]`
    pub fn frame(&self, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(LEN_PREFIX_SIZE + payload.len());
        out.extend_from_slice(&self.encode_len(payload.len())?);
        out.extend_from_slice(payload);
        Ok(out)
    }

    /// `[opcode:1][len:2][payload]`
    pub fn tagged_frame(&self, opcode: Opcode, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(1 + LEN_PREFIX_SIZE + payload.len());
        out.push(opcode.into());
        out.extend_from_slice(&self.frame(payload)?);
        Ok(out)
    }
}
