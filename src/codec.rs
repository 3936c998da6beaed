//! Textual encoding of bets.
//!
//! Bets travel as delimited text. Inside a record the fields are joined by
//! [`FIELD_SEPARATOR`]; inside a batch payload records are joined by
//! [`RECORD_SEPARATOR`]. Input files use [`LINE_DELIMITER`] between columns.
//!
//! # Key Components
//!
//! - [`BetCodec`]: Encodes bets for the wire and decodes input lines.
//! - [`RecordEncoder`]: Capability that writes bets and batch payloads for the wire.
//! - [`RecordSizer`]: Capability used by the batch assembler to measure a bet
//!   exactly as its encoder will write it.
//! - [`LineDecoder`]: Capability that turns an input line into a [`Bet`].
use thiserror::Error;

use crate::Bet;

pub const FIELD_SEPARATOR: char = '|';
pub const RECORD_SEPARATOR: char = '#';
pub const LINE_DELIMITER: char = ',';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least {expected} fields but found {found} in '{input}'")]
    MissingFields {
        expected: usize,
        found: usize,
        input: String,
    },

    #[error("record is not valid utf-8")]
    InvalidUtf8,
}

/// Encodes bets for the wire.
pub trait RecordEncoder {
    fn serialize(&self, bet: &Bet) -> Vec<u8>;

    /// Batch payload: every bet serialized, joined by [`RECORD_SEPARATOR`].
    fn serialize_batch(&self, batch: &[Bet]) -> Vec<u8> {
        let mut payload = Vec::new();
        for (i, bet) in batch.iter().enumerate() {
            if i > 0 {
                payload.push(RECORD_SEPARATOR as u8);
            }
            payload.extend_from_slice(&self.serialize(bet));
        }
        payload
    }
}

/// Measures the serialized size of a bet.
///
/// The size must equal `self.serialize(bet).len()`; the provided method
/// derives it from the encoder.
pub trait RecordSizer: RecordEncoder {
    fn serialized_size(&self, bet: &Bet) -> usize {
        self.serialize(bet).len()
    }
}

/// Decodes a bet from one line of input.
pub trait LineDecoder {
    fn deserialize_line(&self, line: &str) -> Result<Bet, ParseError>;
}

/// Wire and input codec for [`Bet`] records.
///
/// When built with [`BetCodec::with_agency`], input lines omit the agency column
/// and the configured agency is prepended to every decoded bet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BetCodec {
    agency: Option<String>,
}

impl BetCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agency(agency: impl Into<String>) -> Self {
        Self {
            agency: Some(agency.into()),
        }
    }

    /// Inverse of [`RecordEncoder::serialize_batch`]. An empty payload holds no bets.
    pub fn deserialize_batch(&self, payload: &[u8]) -> Result<Vec<Bet>, ParseError> {
        let payload = std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        payload
            .split(RECORD_SEPARATOR)
            .map(|record| bet_from_fields(record.split(FIELD_SEPARATOR), record))
            .collect()
    }

    /// Formats a bet the way [`LineDecoder::deserialize_line`] reads it.
    pub fn serialize_line(&self, bet: &Bet) -> String {
        let fields = bet.fields();
        match self.agency {
            Some(_) => join(fields[1..].iter().copied(), LINE_DELIMITER),
            None => join(fields, LINE_DELIMITER),
        }
    }
}

impl RecordEncoder for BetCodec {
    fn serialize(&self, bet: &Bet) -> Vec<u8> {
        join(bet.fields(), FIELD_SEPARATOR).into_bytes()
    }
}

impl RecordSizer for BetCodec {
    fn serialized_size(&self, bet: &Bet) -> usize {
        bet.fields().iter().map(|f| f.len()).sum::<usize>() + Bet::FIELD_COUNT - 1
    }
}

impl LineDecoder for BetCodec {
    fn deserialize_line(&self, line: &str) -> Result<Bet, ParseError> {
        let columns = line.split(LINE_DELIMITER);
        match &self.agency {
            Some(agency) => {
                bet_from_fields(std::iter::once(agency.as_str()).chain(columns), line)
            }
            None => bet_from_fields(columns, line),
        }
    }
}

fn join<'a>(fields: impl IntoIterator<Item = &'a str>, separator: char) -> String {
    let mut out = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(field);
    }
    out
}

/// Builds a bet from the leading fields; trailing extras are ignored.
fn bet_from_fields<'a>(
    fields: impl Iterator<Item = &'a str>,
    input: &str,
) -> Result<Bet, ParseError> {
    let fields = fields.collect::<Vec<&str>>();
    if fields.len() < Bet::FIELD_COUNT {
        return Err(ParseError::MissingFields {
            expected: Bet::FIELD_COUNT,
            found: fields.len(),
            input: input.to_string(),
        });
    }

    Ok(Bet::new(
        fields[0], fields[1], fields[2], fields[3], fields[4], fields[5],
    ))
}
