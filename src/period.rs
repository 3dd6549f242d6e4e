use crate::error::{ClientError, ClientResult};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub fn as_str(self) -> &'static str {
        match self {
            Term::First => "1",
            Term::Second => "2",
        }
    }

    pub fn parse(raw: &str) -> ClientResult<Self> {
        match raw {
            "1" => Ok(Term::First),
            "2" => Ok(Term::Second),
            _ => Err(ClientError::validation("term", "invalid_term")),
        }
    }
}

/// Academic year plus term, serialized as `YYYY-T`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: String,
    term: Term,
}

impl Period {
    /// Exact parts only: four ASCII digits and `1` or `2`, no padding.
    pub fn new(year: &str, term: &str) -> ClientResult<Self> {
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClientError::validation("year", "invalid_year"));
        }
        Ok(Period {
            year: year.to_string(),
            term: Term::parse(term)?,
        })
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn term(&self) -> Term {
        self.term
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.year, SEPARATOR, self.term.as_str())
    }
}

impl FromStr for Period {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((year, term)) = s.split_once(SEPARATOR) else {
            return Err(ClientError::validation("period", "invalid_period"));
        };
        if term.contains(SEPARATOR) {
            return Err(ClientError::validation("period", "invalid_period"));
        }
        Period::new(year, term)
    }
}

/// Splits a stored period for the edit form without rejecting malformed
/// values; the form validates again on submit.
pub fn split_for_form(raw: &str) -> (String, String) {
    match raw.parse::<Period>() {
        Ok(p) => (p.year().to_string(), p.term().as_str().to_string()),
        Err(_) => match raw.split_once(SEPARATOR) {
            Some((y, t)) => (y.to_string(), t.to_string()),
            None => (raw.to_string(), Term::First.as_str().to_string()),
        },
    }
}

/// The current year and the five before it, newest first.
pub fn year_choices(current_year: i32) -> Vec<String> {
    (0..6).map(|i| (current_year - i).to_string()).collect()
}
