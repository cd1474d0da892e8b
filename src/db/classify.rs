//! Connection-failure classification.
//!
//! Decides whether a database error means the physical connection is dead
//! (worth replacing the pool and retrying once) or is an ordinary query
//! failure that must surface immediately. The judgment is a pure function of
//! the error variant and SQLSTATE; message substrings are never inspected, so
//! a malformed query or constraint violation can never be mistaken for a dead
//! link.

use std::collections::HashSet;

use crate::error::DbError;

/// SQLSTATEs treated as dead-connection failures out of the box: the
/// connection-exception class (08xxx) plus 70100 (connection was killed).
pub const DEFAULT_TRANSIENT_SQL_STATES: &[&str] =
    &["08000", "08001", "08004", "08006", "08S01", "70100"];

/// Outcome of classifying a database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The physical connection is unusable; the server itself is presumably
    /// still reachable through a fresh connection.
    ConnectionDead,
    /// Any other failure. Never retried.
    Other,
}

#[derive(Debug, Clone)]
pub struct TransientErrorClassifier {
    sql_states: HashSet<String>,
}

impl TransientErrorClassifier {
    /// Classifier with the default transient SQLSTATE set.
    pub fn new() -> Self {
        Self::with_extra_states(std::iter::empty::<String>())
    }

    /// Classifier extended with operator-configured SQLSTATEs on top of the
    /// defaults.
    pub fn with_extra_states<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sql_states: HashSet<String> = DEFAULT_TRANSIENT_SQL_STATES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for state in extra {
            let trimmed = state.as_ref().trim();
            if !trimmed.is_empty() {
                sql_states.insert(trimmed.to_ascii_uppercase());
            }
        }
        Self { sql_states }
    }

    /// Classify a database error.
    pub fn classify(&self, err: &DbError) -> FailureClass {
        match err {
            DbError::Connection { .. } => FailureClass::ConnectionDead,
            // A statement that never came back is indistinguishable from a
            // half-dead link; treat it as one so the retry path can recover.
            DbError::Timeout { .. } => FailureClass::ConnectionDead,
            DbError::Query {
                sql_state: Some(state),
                ..
            } if self.sql_states.contains(state.as_str()) => FailureClass::ConnectionDead,
            _ => FailureClass::Other,
        }
    }

    /// Number of SQLSTATEs in the transient set.
    pub fn sql_state_count(&self) -> usize {
        self.sql_states.len()
    }
}

impl Default for TransientErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_is_dead() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::connection("connection reset by peer");
        assert_eq!(classifier.classify(&err), FailureClass::ConnectionDead);
    }

    #[test]
    fn test_timeout_is_dead() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::timeout("query execution", 30);
        assert_eq!(classifier.classify(&err), FailureClass::ConnectionDead);
    }

    #[test]
    fn test_communication_link_failure_is_dead() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::query("Communications link failure", Some("08S01".to_string()));
        assert_eq!(classifier.classify(&err), FailureClass::ConnectionDead);
    }

    #[test]
    fn test_syntax_error_is_other() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::query("You have an error in your SQL syntax", Some("42000".to_string()));
        assert_eq!(classifier.classify(&err), FailureClass::Other);
    }

    #[test]
    fn test_constraint_violation_is_other() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::query("Duplicate entry 'A1'", Some("23000".to_string()));
        assert_eq!(classifier.classify(&err), FailureClass::Other);
    }

    #[test]
    fn test_query_without_sql_state_is_other() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::query("no rows returned", None);
        assert_eq!(classifier.classify(&err), FailureClass::Other);
    }

    #[test]
    fn test_internal_error_is_other() {
        let classifier = TransientErrorClassifier::new();
        let err = DbError::internal("decode error");
        assert_eq!(classifier.classify(&err), FailureClass::Other);
    }

    #[test]
    fn test_extra_states_extend_defaults() {
        let classifier = TransientErrorClassifier::with_extra_states(["hy001"]);
        assert_eq!(
            classifier.sql_state_count(),
            DEFAULT_TRANSIENT_SQL_STATES.len() + 1
        );

        let err = DbError::query("out of memory", Some("HY001".to_string()));
        assert_eq!(classifier.classify(&err), FailureClass::ConnectionDead);

        // The defaults still apply alongside the extension.
        let err = DbError::query("link failure", Some("08006".to_string()));
        assert_eq!(classifier.classify(&err), FailureClass::ConnectionDead);
    }

    #[test]
    fn test_blank_extra_states_ignored() {
        let classifier = TransientErrorClassifier::with_extra_states(["", "  "]);
        assert_eq!(
            classifier.sql_state_count(),
            DEFAULT_TRANSIENT_SQL_STATES.len()
        );
    }
}
