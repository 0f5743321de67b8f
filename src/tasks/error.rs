//! Error taxonomy for task operations.
//!
//! All three recoverable variants map onto an HTTP status in the REST
//! layer: `Unauthorized` → 403, `Validation` → 422, `NotFound` → 404.
//! Storage failures are fatal for the current request and surface as 500.

use std::collections::BTreeMap;

/// Field-keyed validation messages, ordered for stable response bodies.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The actor lacks the capability for this action. Always surfaced
    /// with the fixed message, never field-specific.
    #[error("This action is unauthorized.")]
    Unauthorized,

    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    /// Unresolvable id, or resolvable but outside the actor's visibility.
    #[error("resource not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TaskError {
    /// Single-field validation failure.
    pub fn validation(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation(errors)
    }
}

/// Accumulates field errors across a whole request before failing, so a
/// response reports every invalid field at once.
#[derive(Debug, Default)]
pub struct ErrorBag {
    errors: ValidationErrors,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        let messages = self.errors.entry(field.to_string()).or_default();
        // The same rule can trip on several inputs (e.g. one message per
        // dependency list); don't repeat identical messages.
        if !messages.iter().any(|m| m == message) {
            messages.push(message.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a failure if any errors were recorded.
    pub fn into_result(self) -> Result<(), TaskError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bag_collects_and_dedupes() {
        let mut bag = ErrorBag::new();
        bag.add("title", "Task title is required");
        bag.add("dependencies", "One or more dependency tasks do not exist");
        bag.add("dependencies", "One or more dependency tasks do not exist");

        let err = bag.into_result().unwrap_err();
        match err {
            TaskError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors["dependencies"].len(), 1);
            }
            other => panic!("expected validation error, got: {other:?}"),
        }
    }

    #[test]
    fn empty_bag_is_ok() {
        assert!(ErrorBag::new().into_result().is_ok());
    }
}
