//! # Schema Descriptors
//!
//! A [`Schema`] is a declarative validation rule for one event argument. It is
//! plain data: building one does not validate anything, a
//! [`ValidationEngine`] interprets it.
//!
//! ```rust,ignore
//! let answer = Schema::object()
//!     .field("questionId", Schema::integer().min(1).required())
//!     .field("choice", Schema::string().valid(["A", "B", "C", "D"]).required());
//! ```
//!
//! `min`/`max` bound the value of numbers and the length of strings and arrays.
//!
//! [`ValidationEngine`]: crate::ValidationEngine

use serde_json::Value;

/// Type of the value a [`Schema`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Any JSON value.
    Any,
    /// `true` / `false`.
    Boolean,
    /// A number without fractional part.
    Integer,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An array, optionally with an item schema.
    Array(Option<Box<Schema>>),
    /// An object with declared fields, in declaration order.
    Object {
        /// Declared fields.
        fields: Vec<(String, Schema)>,
        /// Whether undeclared keys are accepted as-is.
        allow_unknown: bool,
    },
}

/// Declarative validation rule for one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    kind: SchemaKind,
    required: bool,
    nullable: bool,
    min: Option<f64>,
    max: Option<f64>,
    allowed: Option<Vec<Value>>,
    label: Option<String>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
            min: None,
            max: None,
            allowed: None,
            label: None,
        }
    }

    /// Accepts any value.
    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// Accepts booleans.
    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// Accepts integral numbers.
    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer)
    }

    /// Accepts numbers.
    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    /// Accepts strings.
    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    /// Accepts arrays of anything.
    pub fn array() -> Self {
        Self::of(SchemaKind::Array(None))
    }

    /// Accepts arrays whose items match `items`.
    pub fn array_of(items: Schema) -> Self {
        Self::of(SchemaKind::Array(Some(Box::new(items))))
    }

    /// Accepts objects. Add fields with [`Schema::field`].
    pub fn object() -> Self {
        Self::of(SchemaKind::Object {
            fields: Vec::new(),
            allow_unknown: false,
        })
    }

    /// Declare an object field. Ignored for non-object schemas.
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object { fields, .. } = &mut self.kind {
            fields.push((name.into(), schema));
        }
        self
    }

    /// Accept undeclared object keys unchanged.
    pub fn allow_unknown(mut self) -> Self {
        if let SchemaKind::Object { allow_unknown, .. } = &mut self.kind {
            *allow_unknown = true;
        }
        self
    }

    /// The value must be present.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// `null` is accepted.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Lower bound (value for numbers, length for strings and arrays).
    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Upper bound (value for numbers, length for strings and arrays).
    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Restrict the value to an allow-list.
    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Name used in error messages instead of the key.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The accepted type.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Whether the value must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether `null` is accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Lower bound.
    pub fn min_bound(&self) -> Option<f64> {
        self.min
    }

    /// Upper bound.
    pub fn max_bound(&self) -> Option<f64> {
        self.max
    }

    /// Allow-list, if any.
    pub fn allowed(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }

    /// Explicit label, if any.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
