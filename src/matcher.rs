//! Regex matching of resolved field values, with bounded capture sets.

use regex::Regex;

use crate::types::{Message, fields};

/// Capture slots retained per match: `$0` plus nine groups. Expressions
/// declaring more groups still match but yield no captures.
pub const MAX_CAPTURES: usize = 10;

/// Captured substrings of one match. Index 0 is the whole match; groups that
/// did not participate are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<String>);

impl Captures {
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Combined byte length of every capture.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.0.iter().map(String::len).sum()
    }

    /// Replace the message's `DP_MATCH` field with these captures.
    pub fn publish(&self, message: &mut Message) {
        message.remove(fields::DP_MATCH);
        for value in &self.0 {
            message.push(fields::DP_MATCH, value.as_str());
        }
    }
}

/// Result of matching one field value against one expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Present only for a successful match of an expression with groups.
    pub captures: Option<Captures>,
}

impl MatchOutcome {
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unconditional(matched: bool) -> Self {
        Self {
            matched,
            captures: None,
        }
    }
}

/// `true` when the expression text declares at least one group. Captures
/// are only kept for such expressions.
#[must_use]
pub fn declares_groups(expression: &str) -> bool {
    expression.contains('(')
}

/// Match `subject` against `regex`. Captures are kept when `keep_captures`
/// is set and the expression fits within [`MAX_CAPTURES`].
#[must_use]
pub fn perform(subject: &str, regex: &Regex, keep_captures: bool) -> MatchOutcome {
    if !keep_captures {
        return MatchOutcome::unconditional(regex.is_match(subject));
    }
    let Some(caps) = regex.captures(subject) else {
        return MatchOutcome::no_match();
    };
    let captures = (regex.captures_len() <= MAX_CAPTURES).then(|| {
        Captures(
            caps.iter()
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    });
    MatchOutcome {
        matched: true,
        captures,
    }
}
