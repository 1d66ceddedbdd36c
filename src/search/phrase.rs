//! Query fragments parsed from raw user input.
//!
//! A leading and/or trailing `*` turns an exact lookup into a prefix, suffix
//! or substring match. Matching is case-insensitive and independent of locale.

use serde::{Deserialize, Serialize};
use std::fmt;

const WILDCARD: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    StartsWith,
    EndsWith,
    Contains,
}

/// A parsed query fragment: match operator plus normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchPhrase {
    operator: Operator,
    text: String,
}

impl SearchPhrase {
    /// Parses `raw` into a phrase.
    ///
    /// Returns `None` for empty or whitespace-only input, which callers treat as
    /// "filter not applied".
    ///
    /// ```
    /// use contextmap::search::{Operator, SearchPhrase};
    ///
    /// let phrase = SearchPhrase::from_input("*order*").unwrap();
    /// assert_eq!(phrase.operator(), Operator::Contains);
    /// assert_eq!(phrase.text(), "order");
    /// assert!(SearchPhrase::from_input("   ").is_none());
    /// ```
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let leading = trimmed.starts_with(WILDCARD);
        let trailing = trimmed.len() > 1 && trimmed.ends_with(WILDCARD);
        let operator = match (leading, trailing) {
            (true, true) => Operator::Contains,
            (true, false) => Operator::EndsWith,
            (false, true) => Operator::StartsWith,
            (false, false) => Operator::Equals,
        };

        let text = trimmed.trim_matches(WILDCARD).trim();
        Some(Self {
            operator,
            text: normalize(text),
        })
    }

    /// Parses every non-empty input, dropping the blank ones.
    pub fn from_inputs<'a, I>(raw: I) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        raw.into_iter().filter_map(Self::from_input).collect()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluates the phrase against a candidate value.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = normalize(candidate);
        match self.operator {
            Operator::Equals => candidate == self.text,
            Operator::StartsWith => candidate.starts_with(&self.text),
            Operator::EndsWith => candidate.ends_with(&self.text),
            Operator::Contains => candidate.contains(&self.text),
        }
    }

    /// Same as [`matches`](Self::matches) but takes a parsed term.
    pub fn matches_term(&self, term: &SearchTerm) -> bool {
        self.matches(term.value())
    }
}

impl fmt::Display for SearchPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{}", self.text),
            Operator::StartsWith => write!(f, "{}*", self.text),
            Operator::EndsWith => write!(f, "*{}", self.text),
            Operator::Contains => write!(f, "*{}*", self.text),
        }
    }
}

/// A plain, trimmed search value without a match operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key normalization shared by every read-model index.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
