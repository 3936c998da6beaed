//! Bet records.
//!
//! A [`Bet`] is the unit of data exchanged with the lottery server. It holds six
//! textual fields and is never mutated once built; the codec decides how it is
//! laid out on the wire.
use std::fmt;

/// A single lottery bet placed through an agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    agency: String,
    first_name: String,
    last_name: String,
    document: String,
    birthdate: String,
    number: String,
}

impl Bet {
    /// Number of fields carried by every bet.
    pub const FIELD_COUNT: usize = 6;

    pub fn new(
        agency: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        document: impl Into<String>,
        birthdate: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            agency: agency.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            document: document.into(),
            birthdate: birthdate.into(),
            number: number.into(),
        }
    }

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn birthdate(&self) -> &str {
        &self.birthdate
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Fields in wire order.
    pub fn fields(&self) -> [&str; Self::FIELD_COUNT] {
        [
            &self.agency,
            &self.first_name,
            &self.last_name,
            &self.document,
            &self.birthdate,
            &self.number,
        ]
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agency {} document {} number {}",
            self.agency, self.document, self.number
        )
    }
}
