//! Validation types for the regmaid configuration.
//!
//! Validation collects every violation instead of stopping at the first one,
//! so a broken config file is reported in a single pass.

use std::fmt;

/// A single constraint violation found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path that failed validation (e.g. `policies[1].keep`).
    pub field: String,
    /// A human-readable description of the failure.
    pub message: String,
    /// The kind of validation that failed.
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use regmaid_core::validation::{ValidationError, ValidationErrorKind};
    ///
    /// let error = ValidationError::new(
    ///     "policies[0].keep",
    ///     "must be greater than 0",
    ///     ValidationErrorKind::Range,
    /// );
    /// assert_eq!(error.kind, ValidationErrorKind::Range);
    /// ```
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        kind: ValidationErrorKind,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind,
        }
    }

    /// Creates a validation error for a required field that is missing.
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("'{field}' is required but was not provided"),
            field,
            kind: ValidationErrorKind::Required,
        }
    }

    /// Creates a validation error for a value out of range.
    pub fn range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, ValidationErrorKind::Range)
    }

    /// Creates a validation error for a reference to something that does not exist.
    pub fn reference(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, ValidationErrorKind::Reference)
    }

    /// Creates a validation error for a uniqueness violation.
    pub fn duplicate(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, ValidationErrorKind::Duplicate)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The category of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// A required field was not provided.
    Required,
    /// The value is outside the allowed range.
    Range,
    /// The value names something that is not defined.
    Reference,
    /// The value must be unique but is not.
    Duplicate,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Range => write!(f, "range"),
            Self::Reference => write!(f, "reference"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// A collection of validation errors.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty validation errors collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a validation error to the collection.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of validation errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns an iterator over the validation errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Converts the collection into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the whole collection if it holds at least one error.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = ValidationError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "no validation errors"),
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "{} validation errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Trait for types that can be validated.
pub trait Validate {
    /// Validates this instance and returns every violation found.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if any constraint is violated.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_required() {
        let error = ValidationError::required("registries[0].host");
        assert_eq!(error.kind, ValidationErrorKind::Required);
        assert!(error.message.contains("registries[0].host"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError::range("policies[0].keep", "must be greater than 0");
        assert_eq!(error.to_string(), "policies[0].keep: must be greater than 0");
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::required("a"));
        errors.add(ValidationError::required("b"));
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_validation_errors_display_multiple() {
        let errors: ValidationErrors = vec![
            ValidationError::required("a"),
            ValidationError::reference("b", "no such registry"),
        ]
        .into_iter()
        .collect();

        let display = errors.to_string();
        assert!(display.starts_with("2 validation errors:"));
        assert!(display.contains("b: no such registry"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValidationErrorKind::Duplicate.to_string(), "duplicate");
        assert_eq!(ValidationErrorKind::Reference.to_string(), "reference");
    }
}
