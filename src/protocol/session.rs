use std::io::{Read, Write};

use crate::{
    Bet, ExchangeError, LogSink,
    batch::{BatchAssembler, RecordSource},
    codec::{LineDecoder, RecordEncoder, RecordSizer},
};

use super::{FrameCodec, LEN_PREFIX_SIZE, Opcode, ProtocolError, ReliableTransport, decode_winners};

/// Client end of one protocol exchange over an exclusively owned transport.
pub struct ProtocolSession<T: Read + Write> {
    transport: ReliableTransport<T>,
    frames: FrameCodec,
    log: LogSink,
}

impl<T: Read + Write> ProtocolSession<T> {
    pub fn new(stream: T, log: LogSink) -> Self {
        Self {
            transport: ReliableTransport::new(stream),
            frames: FrameCodec::new(),
            log,
        }
    }

    /// Sends every batch the assembler produces, then the completion frame.
    ///
    /// Batches are encoded by the assembler's own codec, the one that sized
    /// them. Returns the number of bets the server acknowledged. The first
    /// error aborts the submission without signalling completion.
    pub fn submit_batches<S, C>(
        &mut self,
        batches: &mut BatchAssembler<S, C>,
    ) -> Result<usize, ExchangeError>
    where
        S: RecordSource,
        C: RecordSizer + LineDecoder,
    {
        self.transport.send_all(&[u8::from(Opcode::SendingBets)])?;

        let mut sent = 0;
        let mut count = 0;
        loop {
            let batch = batches.next_batch()?;
            if batch.is_empty() {
                break;
            }

            self.send_batch(batches.codec(), &batch)?;
            self.await_ack()?;

            count += 1;
            sent += batch.len();
            self.log.debug(format_args!(
                "batch {count} acknowledged ({} bets)",
                batch.len()
            ));
        }

        self.send_completion()?;
        self.log
            .info(format_args!("submitted {sent} bets in {count} batches"));
        Ok(sent)
    }

    pub fn send_batch<E>(&mut self, encoder: &E, batch: &[Bet]) -> Result<(), ExchangeError>
    where
        E: RecordEncoder + ?Sized,
    {
        let payload = encoder.serialize_batch(batch);
        let frame = self.frames.frame(&payload)?;
        self.log
            .trace(format_args!("sending batch frame of {} bytes", frame.len()));
        self.transport.send_all(&frame)?;
        Ok(())
    }

    /// Waits for the single byte answer to a batch.
    pub fn await_ack(&mut self) -> Result<(), ExchangeError> {
        let code = self.transport.receive_byte()?;
        match Opcode::decode(code)? {
            Opcode::BatchReceived => Ok(()),
            Opcode::Error => Err(ProtocolError::Rejected.into()),
            other => Err(ProtocolError::UnexpectedCode(other.into()).into()),
        }
    }

    /// Empty frame announcing that no more batches follow. It is not answered.
    pub fn send_completion(&mut self) -> Result<(), ExchangeError> {
        let frame = self.frames.frame(&[])?;
        self.transport.send_all(&frame)?;
        Ok(())
    }

    /// Asks once for the agency's winners; `None` means they are not ready yet.
    pub fn request_results(&mut self, agency: u8) -> Result<Option<Vec<String>>, ExchangeError> {
        self.transport
            .send_all(&[u8::from(Opcode::RequestResults), agency])?;

        let code = self.transport.receive_byte()?;
        match Opcode::decode(code)? {
            Opcode::ResultsNotReady => Ok(None),
            Opcode::SendingResults => {
                let prefix = self.transport.receive_exact(LEN_PREFIX_SIZE)?;
                let len = self.frames.decode_len(&prefix)?;
                let payload = self.transport.receive_exact(len)?;
                Ok(Some(decode_winners(payload)?))
            }
            Opcode::Error => Err(ProtocolError::Rejected.into()),
            other => Err(ProtocolError::UnexpectedCode(other.into()).into()),
        }
    }

    pub fn close(self) -> Result<(), ExchangeError> {
        self.transport.close()?;
        Ok(())
    }
}
