use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar format used by the ticket calendar (`data-date` attributes).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Date '{0}' must be in YYYY-MM-DD format")]
    Format(String),

    #[error("Date '{0}' is not a valid date")]
    Invalid(String),
}

/// A watched calendar day, held as its ISO `YYYY-MM-DD` string.
///
/// Equality and ordering are plain string comparisons. Because the format is
/// fixed-width and zero-padded, lexical order is also chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketDate(String);

impl TicketDate {
    /// Parse and validate an ISO calendar date.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        let trimmed = s.trim();
        let well_formed = trimmed.len() == 10
            && trimmed.char_indices().all(|(i, c)| match i {
                4 | 7 => c == '-',
                _ => c.is_ascii_digit(),
            });
        if !well_formed {
            return Err(DateError::Format(s.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map_err(|_| DateError::Invalid(s.to_string()))?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TicketDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TicketDate {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TicketDate> for String {
    fn from(date: TicketDate) -> Self {
        date.0
    }
}

impl AsRef<str> for TicketDate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
