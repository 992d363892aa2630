// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Admission error types.

use std::fmt;
use thiserror::Error;

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// AdmissionError represents errors that can occur during admission.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// BadRequest indicates a malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Forbidden indicates the request violates a policy.
    #[error("{0}")]
    Forbidden(ForbiddenError),

    /// Invalid indicates the object carries invalid field values.
    #[error("{0}")]
    Invalid(InvalidError),

    /// Aggregate represents multiple errors.
    #[error("{0}")]
    Aggregate(AggregateError),

    /// Internal represents an internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// NotFound indicates a referenced resource was not found.
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// NotReady indicates the plugin cannot decide yet because its caches
    /// have not been synchronised.
    #[error("{0} not yet ready to handle request")]
    NotReady(String),
}

impl AdmissionError {
    /// Create a new BadRequest error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AdmissionError::BadRequest(msg.into())
    }

    /// Create a Forbidden error caused by a single field.
    pub fn forbidden(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: impl Into<String>,
        field_error: FieldError,
    ) -> Self {
        Self::forbidden_fields(name, namespace, resource, vec![field_error])
    }

    /// Create a Forbidden error caused by several fields.
    pub fn forbidden_fields(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: impl Into<String>,
        field_errors: Vec<FieldError>,
    ) -> Self {
        AdmissionError::Forbidden(ForbiddenError {
            name: name.into(),
            namespace: namespace.into(),
            resource: resource.into(),
            reason: None,
            field_errors,
        })
    }

    /// Create a Forbidden error with a free-form reason.
    pub fn forbidden_reason(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AdmissionError::Forbidden(ForbiddenError {
            name: name.into(),
            namespace: namespace.into(),
            resource: resource.into(),
            reason: Some(reason.into()),
            field_errors: Vec::new(),
        })
    }

    /// Create an Invalid error from a list of field errors.
    pub fn invalid(
        kind: impl Into<String>,
        name: impl Into<String>,
        errors: Vec<FieldError>,
    ) -> Self {
        AdmissionError::Invalid(InvalidError {
            kind: kind.into(),
            name: name.into(),
            errors,
        })
    }

    /// Create an aggregate error from multiple errors.
    pub fn aggregate(errors: Vec<AdmissionError>) -> Self {
        AdmissionError::Aggregate(AggregateError { errors })
    }

    /// Create a NotFound error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        AdmissionError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal_error(msg: impl Into<String>) -> Self {
        AdmissionError::Internal(msg.into())
    }

    /// Create a NotReady error for the named plugin.
    pub fn not_ready(plugin: impl Into<String>) -> Self {
        AdmissionError::NotReady(plugin.into())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, AdmissionError::Forbidden(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, AdmissionError::Invalid(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AdmissionError::NotFound { .. })
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, AdmissionError::NotReady(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, AdmissionError::Internal(_))
    }

    /// Field errors carried by a Forbidden or Invalid error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AdmissionError::Forbidden(e) => &e.field_errors,
            AdmissionError::Invalid(e) => &e.errors,
            _ => &[],
        }
    }
}

/// ForbiddenError represents a forbidden admission error with field details.
#[derive(Debug)]
pub struct ForbiddenError {
    pub name: String,
    pub namespace: String,
    pub resource: String,
    pub reason: Option<String>,
    pub field_errors: Vec<FieldError>,
}

impl fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" is forbidden: ", self.resource, self.name)?;
        if let Some(reason) = &self.reason {
            return f.write_str(reason);
        }
        write_field_errors(f, &self.field_errors)
    }
}

/// InvalidError lists the invalid fields of an object.
#[derive(Debug)]
pub struct InvalidError {
    pub kind: String,
    pub name: String,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for InvalidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" is invalid: ", self.kind, self.name)?;
        write_field_errors(f, &self.errors)
    }
}

fn write_field_errors(f: &mut fmt::Formatter<'_>, errors: &[FieldError]) -> fmt::Result {
    match errors {
        [single] => write!(f, "{}", single),
        many => {
            let joined: Vec<String> = many.iter().map(|e| e.to_string()).collect();
            write!(f, "[{}]", joined.join(", "))
        }
    }
}

/// FieldError represents a field-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub error_type: FieldErrorType,
    pub value: String,
    pub supported_values: Vec<String>,
    pub detail: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_type {
            FieldErrorType::NotSupported => {
                write!(
                    f,
                    "{}: Unsupported value: \"{}\": supported values: {}",
                    self.field,
                    self.value,
                    self.supported_values
                        .iter()
                        .map(|s| format!("\"{}\"", s))
                        .collect::<Vec<_>>()
                        .join(", ")
                )?;
            }
            FieldErrorType::Required => write!(f, "{}: Required value", self.field)?,
            FieldErrorType::Invalid => {
                write!(f, "{}: Invalid value: \"{}\"", self.field, self.value)?
            }
            FieldErrorType::Forbidden => write!(f, "{}: Forbidden", self.field)?,
            FieldErrorType::Duplicate => {
                write!(f, "{}: Duplicate value: \"{}\"", self.field, self.value)?
            }
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// FieldErrorType represents the type of field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorType {
    /// NotSupported indicates the value is not in the list of supported values.
    NotSupported,
    /// Required indicates a required field is missing.
    Required,
    /// Invalid indicates an invalid value.
    Invalid,
    /// Forbidden indicates the field may not be set or changed.
    Forbidden,
    /// Duplicate indicates a value that must be unique is repeated.
    Duplicate,
}

/// AggregateError represents multiple errors.
#[derive(Debug)]
pub struct AggregateError {
    pub errors: Vec<AdmissionError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let error_strings: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", error_strings.join(", "))
    }
}

fn field_error(field: &str, error_type: FieldErrorType, value: &str, detail: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        error_type,
        value: value.to_string(),
        supported_values: Vec::new(),
        detail: detail.to_string(),
    }
}

/// Helper function to create a "not supported" field error.
pub fn field_not_supported(field: &str, value: &str, supported: Vec<&str>) -> FieldError {
    FieldError {
        supported_values: supported.into_iter().map(String::from).collect(),
        ..field_error(field, FieldErrorType::NotSupported, value, "")
    }
}

pub fn field_required(field: &str, detail: &str) -> FieldError {
    field_error(field, FieldErrorType::Required, "", detail)
}

pub fn field_invalid(field: &str, value: &str, detail: &str) -> FieldError {
    field_error(field, FieldErrorType::Invalid, value, detail)
}

pub fn field_forbidden(field: &str, detail: &str) -> FieldError {
    field_error(field, FieldErrorType::Forbidden, "", detail)
}

pub fn field_duplicate(field: &str, value: &str) -> FieldError {
    field_error(field, FieldErrorType::Duplicate, value, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_error_display() {
        let err = AdmissionError::forbidden(
            "sh",
            "garden-dev",
            "shoots",
            field_not_supported("spec.purpose", "production", vec!["evaluation"]),
        );
        let msg = err.to_string();
        assert!(msg.contains("shoots \"sh\" is forbidden"));
        assert!(msg.contains("spec.purpose"));
        assert!(msg.contains("Unsupported value: \"production\""));
        assert!(msg.contains("\"evaluation\""));
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_forbidden_multiple_fields() {
        let err = AdmissionError::forbidden_fields(
            "sh",
            "garden-dev",
            "shoots",
            vec![
                field_forbidden("spec.tolerations[0]", "toleration \"a\" is not allowed"),
                field_forbidden("spec.tolerations[2]", "toleration \"c\" is not allowed"),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("[spec.tolerations[0]: Forbidden: toleration \"a\" is not allowed, "));
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_forbidden_reason() {
        let err = AdmissionError::forbidden_reason("sh", "garden-dev", "shoots", "no way");
        assert_eq!(err.to_string(), "shoots \"sh\" is forbidden: no way");
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn test_invalid_error_display() {
        let err = AdmissionError::invalid(
            "Shoot",
            "sh",
            vec![field_invalid("spec.dns.domain", "a.b", "must end with x")],
        );
        assert_eq!(
            err.to_string(),
            "Shoot \"sh\" is invalid: spec.dns.domain: Invalid value: \"a.b\": must end with x"
        );
        assert!(err.is_invalid());
    }

    #[test]
    fn test_not_ready_display() {
        let err = AdmissionError::not_ready("ShootQuotaValidator");
        assert_eq!(
            err.to_string(),
            "ShootQuotaValidator not yet ready to handle request"
        );
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_aggregate_error_display() {
        let errors = vec![
            AdmissionError::bad_request("error 1"),
            AdmissionError::bad_request("error 2"),
        ];
        let err = AdmissionError::aggregate(errors);
        let msg = err.to_string();
        assert!(msg.starts_with('['));
        assert!(msg.ends_with(']'));
        assert!(msg.contains("error 1"));
        assert!(msg.contains("error 2"));
    }

    #[test]
    fn test_field_required_and_duplicate() {
        assert_eq!(
            field_required("spec.owner", "").to_string(),
            "spec.owner: Required value"
        );
        assert_eq!(
            field_duplicate("spec.shoot.name", "sh").to_string(),
            "spec.shoot.name: Duplicate value: \"sh\""
        );
    }
}
