use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// When to stop walking the remaining conditions of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BreakPolicy {
    /// Stop after a condition that matched.
    OnTrue,
    /// Stop after a condition that did not match.
    #[default]
    OnFalse,
    /// Stop after this condition regardless of its outcome.
    Always,
    /// Never stop because of this condition.
    Never,
}

impl BreakPolicy {
    /// Decide whether the walk stops after a condition with this policy.
    #[must_use]
    pub fn should_stop(self, matched: bool) -> bool {
        match (self, matched) {
            (BreakPolicy::OnTrue, true) | (BreakPolicy::OnFalse, false) => true,
            (BreakPolicy::OnTrue, false) | (BreakPolicy::OnFalse, true) => false,
            (BreakPolicy::Always, _) => true,
            (BreakPolicy::Never, _) => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BreakPolicy::OnTrue => "on-true",
            BreakPolicy::OnFalse => "on-false",
            BreakPolicy::Always => "always",
            BreakPolicy::Never => "never",
        }
    }
}

/// Returned when a `break` attribute names no known policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown break policy '{0}'")]
pub struct UnknownBreakPolicy(pub String);

impl FromStr for BreakPolicy {
    type Err = UnknownBreakPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            BreakPolicy::OnTrue,
            BreakPolicy::OnFalse,
            BreakPolicy::Always,
            BreakPolicy::Never,
        ]
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| UnknownBreakPolicy(s.to_owned()))
    }
}

impl fmt::Display for BreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
