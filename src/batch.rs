//! Batch assembly.
//!
//! Bets are read lazily from a [`RecordSource`] and grouped into batches bounded
//! both by a record count and by the cumulative serialized size of their bets.
//! A bet that would overflow the byte budget is held back and opens the next
//! batch, so nothing is lost or sent twice.
//!
//! # Key Components
//!
//! - [`RecordSource`]: Forward-only supplier of raw input lines.
//! - [`LineSource`]: [`RecordSource`] over any buffered reader (e.g. a data file).
//! - [`BatchAssembler`]: Produces bounded batches until the source runs dry.
use std::io::{self, BufRead, Lines};

use thiserror::Error;

use crate::{
    Bet,
    codec::{LineDecoder, ParseError, RecordSizer},
};

/// Upper bound on the summed serialized size of the bets in one batch.
pub const MAX_BATCH_BYTES: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("malformed record: {0}")]
    Parse(#[from] ParseError),

    #[error("record of {size} bytes can never fit a batch of {limit} bytes")]
    Oversized { size: usize, limit: usize },

    #[error("failed to read record source: {0}")]
    Read(#[from] io::Error),
}

/// Supplier of raw input lines; `Ok(None)` signals end of input.
pub trait RecordSource {
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads one record per line from a buffered reader.
pub struct LineSource<R> {
    lines: Lines<R>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> RecordSource for LineSource<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next().transpose()
    }
}

/// Groups records from a source into batches bounded by count and size.
pub struct BatchAssembler<S, C> {
    source: S,
    codec: C,
    pending: Option<Bet>,
    max_count: usize,
    max_bytes: usize,
    finished: bool,
}

impl<S, C> BatchAssembler<S, C>
where
    S: RecordSource,
    C: RecordSizer + LineDecoder,
{
    /// # Panics
    /// If `max_count` is zero.
    pub fn new(source: S, codec: C, max_count: usize) -> Self {
        assert!(max_count > 0, "batches must hold at least one record");

        Self {
            source,
            codec,
            pending: None,
            max_count,
            max_bytes: MAX_BATCH_BYTES,
            finished: false,
        }
    }

    pub fn with_byte_limit(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// The codec that decodes and sizes records; batches go out encoded by it.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Assembles the next batch.
    ///
    /// An empty batch means the source is exhausted and no record is pending;
    /// every later call returns an empty batch as well. Once an error is
    /// returned the assembler yields no further records.
    pub fn next_batch(&mut self) -> Result<Vec<Bet>, BatchError> {
        let mut batch = Vec::new();
        let mut size = 0;

        if let Some(bet) = self.pending.take() {
            size = self.codec.serialized_size(&bet);
            batch.push(bet);
        }

        while !self.finished && batch.len() < self.max_count {
            let bet = match self.next_bet() {
                Ok(Some(bet)) => bet,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            };

            let bet_size = self.codec.serialized_size(&bet);
            if size + bet_size > self.max_bytes {
                self.pending = Some(bet);
                break;
            }

            size += bet_size;
            batch.push(bet);
        }

        Ok(batch)
    }

    fn next_bet(&mut self) -> Result<Option<Bet>, BatchError> {
        let line = match self.source.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ParseError::InvalidUtf8.into());
            }
            Err(e) => return Err(e.into()),
        };

        let bet = self.codec.deserialize_line(&line)?;
        let size = self.codec.serialized_size(&bet);
        if size > self.max_bytes {
            return Err(BatchError::Oversized {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(Some(bet))
    }
}
