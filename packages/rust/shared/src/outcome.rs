//! Best-effort results.
//!
//! Steps that must never abort the surrounding pipeline (ranking-oracle
//! parsing, address parsing, markup conversion, directory pagination) return
//! an [`Outcome`] instead of a `Result`. Fatal failures still travel as
//! `Err(OrgScoutError)` one level up.

/// The value produced by a best-effort step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The step produced its full result.
    Complete(T),
    /// The step fell back to an empty or partial value.
    Degraded {
        /// The fallback value.
        value: T,
        /// Why the step degraded (for logs and reports).
        reason: String,
    },
}

impl<T> Outcome<T> {
    /// Build a degraded outcome.
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Borrow the value regardless of how it was produced.
    pub fn value(&self) -> &T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Take the value regardless of how it was produced.
    pub fn into_value(self) -> T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// The degrade reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_keeps_value_and_reason() {
        let outcome: Outcome<Vec<String>> = Outcome::degraded(vec![], "oracle returned prose");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason(), Some("oracle returned prose"));
        assert!(outcome.into_value().is_empty());
    }
}
