//! Structured failure model shared by every pipeline stage and handler.
//!
//! An [`ErrorResult`] maps error codes to human-readable messages and field
//! names to validation messages. Every construction path normalizes into the
//! same shape, which is what a transport layer serializes back to a caller:
//!
//! ```json
//! {
//!   "errors": { "COMMON_INVALID_MODEL": ["One or more validation errors occurred."] },
//!   "validationErrors": { "Quantity": ["'Quantity' must be greater than '0'."] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Error codes produced by the pipeline itself.
///
/// Handlers are free to raise their own string codes (e.g. `PRODUCT_NOT_FOUND`);
/// these are the ones every consumer can rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The request requires an authenticated caller and none was resolved.
    #[serde(rename = "COMMON_UNAUTHORIZED")]
    Unauthorized,
    /// The caller is authenticated but holds none of the required roles.
    #[serde(rename = "COMMON_FORBIDDEN")]
    Forbidden,
    /// One or more validation rules failed.
    #[serde(rename = "COMMON_INVALID_MODEL")]
    InvalidModel,
    /// An unexpected failure was translated; details are withheld.
    #[serde(rename = "COMMON_INTERNAL_ERROR")]
    InternalError,
    /// The caller cancelled the call before it completed.
    #[serde(rename = "COMMON_CANCELLED")]
    Cancelled,
    /// The referenced resource does not exist.
    #[serde(rename = "COMMON_NOT_FOUND")]
    NotFound,
    /// The request conflicts with the current state of a resource.
    #[serde(rename = "COMMON_CONFLICT")]
    Conflict,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "COMMON_UNAUTHORIZED",
            Self::Forbidden => "COMMON_FORBIDDEN",
            Self::InvalidModel => "COMMON_INVALID_MODEL",
            Self::InternalError => "COMMON_INTERNAL_ERROR",
            Self::Cancelled => "COMMON_CANCELLED",
            Self::NotFound => "COMMON_NOT_FOUND",
            Self::Conflict => "COMMON_CONFLICT",
        }
    }

    /// Message used when a code is raised without an explicit one.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unauthorized => "Authentication is required to perform this action.",
            Self::Forbidden => "You do not have permission to perform this action.",
            Self::InvalidModel => "One or more validation errors occurred.",
            Self::InternalError => "An unexpected error occurred.",
            Self::Cancelled => "The request was cancelled.",
            Self::NotFound => "The requested resource was not found.",
            Self::Conflict => "The request conflicts with the current state of the resource.",
        }
    }

    /// Looks up a well-known code by its wire string.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        [
            Self::Unauthorized,
            Self::Forbidden,
            Self::InvalidModel,
            Self::InternalError,
            Self::Cancelled,
            Self::NotFound,
            Self::Conflict,
        ]
        .into_iter()
        .find(|known| known.as_str() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// Default message for an arbitrary code string: the catalogue message for
/// well-known codes, otherwise the code itself.
fn default_message_for(code: &str) -> String {
    ErrorCode::parse(code).map_or_else(|| code.to_string(), |c| c.default_message().to_string())
}

// ---------------------------------------------------------------------------
// ValidationFailure
// ---------------------------------------------------------------------------

/// A single field-scoped rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Name of the offending field, as exposed to API clients (e.g. `"Quantity"`).
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorResult
// ---------------------------------------------------------------------------

/// Keyed failure returned to callers.
///
/// Code and field keys use `BTreeMap` for deterministic serialization order;
/// messages keep insertion order within each key. Collection-based
/// constructors return `None` when given nothing, so an `ErrorResult` always
/// carries at least one error code or validation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    errors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    validation_errors: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_data: Option<serde_json::Value>,
}

impl ErrorResult {
    /// Single code with its default message.
    #[must_use]
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        let message = default_message_for(&code);
        Self::with_message(code, message)
    }

    /// Single code with an explicit message.
    #[must_use]
    pub fn with_message(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(code.into(), vec![message.into()]);
        Self {
            errors,
            validation_errors: BTreeMap::new(),
            custom_data: None,
        }
    }

    /// Single code with its default message plus opaque auxiliary data.
    #[must_use]
    pub fn with_custom_data(code: impl Into<String>, data: serde_json::Value) -> Self {
        let mut result = Self::from_code(code);
        result.custom_data = Some(data);
        result
    }

    /// Several codes, each with its default message. Repeated codes collapse
    /// into one key.
    pub fn from_codes<I, C>(codes: I) -> Option<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for code in codes {
            let code = code.into();
            let message = default_message_for(&code);
            let messages = errors.entry(code).or_default();
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
        Self::from_map(errors)
    }

    /// A pre-built code → messages map. Codes with no messages get their
    /// default message so that every key carries at least one entry.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, Vec<String>>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }
        let errors = map
            .into_iter()
            .map(|(code, messages)| {
                if messages.is_empty() {
                    let message = default_message_for(&code);
                    (code, vec![message])
                } else {
                    (code, messages)
                }
            })
            .collect();
        Some(Self {
            errors,
            validation_errors: BTreeMap::new(),
            custom_data: None,
        })
    }

    /// Validation failures grouped by field under `COMMON_INVALID_MODEL`.
    ///
    /// Fields are keyed by name; messages keep the order in which the
    /// failures were reported.
    #[must_use]
    pub fn from_validation_failures(failures: Vec<ValidationFailure>) -> Option<Self> {
        if failures.is_empty() {
            return None;
        }
        let mut validation_errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for failure in failures {
            validation_errors
                .entry(failure.field)
                .or_default()
                .push(failure.message);
        }
        let mut result = Self::from_code(ErrorCode::InvalidModel);
        result.validation_errors = validation_errors;
        Some(result)
    }

    /// Appends a message under `code`, creating the key if needed.
    pub fn add_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(code.into()).or_default().push(message.into());
    }

    /// Error code → messages.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Field name → validation messages.
    #[must_use]
    pub fn validation_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.validation_errors
    }

    #[must_use]
    pub fn custom_data(&self) -> Option<&serde_json::Value> {
        self.custom_data.as_ref()
    }

    /// Whether the result carries `code` at the top level.
    #[must_use]
    pub fn has_code(&self, code: impl AsRef<str>) -> bool {
        self.errors.contains_key(code.as_ref())
    }

    /// Iterates over the top-level codes in key order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.codes().collect();
        write!(f, "request failed: {}", codes.join(", "))?;
        if !self.validation_errors.is_empty() {
            let fields: Vec<&str> = self.validation_errors.keys().map(String::as_str).collect();
            write!(f, " (invalid fields: {})", fields.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorResult {}

impl From<ErrorCode> for ErrorResult {
    fn from(code: ErrorCode) -> Self {
        Self::from_code(code)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
