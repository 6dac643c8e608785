//! Validation engine boundary.
//!
//! The engine is a black box: given a [`Schema`] and a value it returns either
//! a (possibly coerced) value or a non-empty list of [`ErrorDetail`]s. It
//! never fails in any other way.

use crate::schema::Schema;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

bitflags! {
    /// Engine behavior switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidationFlags: u8 {
        /// Drop undeclared object keys instead of rejecting them.
        const STRIP_UNKNOWN = 0b0001;
        /// Convert compatible values (`"12"` to `12`, `"true"` to `true`).
        const COERCE = 0b0010;
        /// Stop at the first error.
        const ABORT_EARLY = 0b0100;
    }
}

impl Default for ValidationFlags {
    fn default() -> Self {
        ValidationFlags::COERCE | ValidationFlags::ABORT_EARLY
    }
}

/// One step of the path to an invalid value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

/// Template variables of an [`ErrorDetail`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetailContext {
    /// Key of the invalid value, when it sits in an object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Label used in messages.
    pub label: String,
    /// The violated limit, for range errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    /// The offending value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Formatted message.
    pub message: String,
    /// Path from the argument root to the invalid value.
    pub path: Vec<PathSegment>,
    /// Machine-readable kind, such as `number.base` or `any.required`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Template variables.
    pub context: DetailContext,
}

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// The validated (and possibly coerced) value; `None` if it was absent.
    pub value: Option<Value>,
    /// All messages joined, present exactly when `errors` is.
    pub error_message: Option<String>,
    /// Non-empty when validation failed.
    pub errors: Option<Vec<ErrorDetail>>,
}

impl ValidationResult {
    /// A successful result.
    pub fn valid(value: Option<Value>) -> Self {
        Self {
            value,
            error_message: None,
            errors: None,
        }
    }

    /// A failed result. An empty `errors` list yields a successful result.
    pub fn invalid(value: Option<Value>, errors: Vec<ErrorDetail>) -> Self {
        if errors.is_empty() {
            return Self::valid(value);
        }
        Self {
            value,
            error_message: Some(join_messages(&errors)),
            errors: Some(errors),
        }
    }

    /// Whether validation succeeded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_none()
    }
}

/// Join detail messages the way engines format their summary message.
pub fn join_messages(errors: &[ErrorDetail]) -> String {
    errors
        .iter()
        .map(|detail| detail.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// A schema-validation engine.
pub trait ValidationEngine: Send + Sync + 'static {
    /// Validate `value` (absent when `None`) against `schema`.
    fn validate(
        &self,
        schema: &Schema,
        value: Option<Value>,
        flags: ValidationFlags,
    ) -> ValidationResult;
}

/// Lookup of translated validation messages.
pub trait Translations: Send + Sync + 'static {
    /// Translated message for `detail` in `language`, if one exists.
    fn translate(&self, language: &str, detail: &ErrorDetail) -> Option<String>;
}
