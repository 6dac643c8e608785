//! Built-in declarative validation engine.
//!
//! Interprets [`Schema`] descriptors over `serde_json` values. Error details
//! follow the `kind` / `"label" message` conventions clients already parse:
//!
//! | kind | message |
//! |---|---|
//! | `any.required` | `"x" is required` |
//! | `number.base` | `"x" must be a number` |
//! | `object.unknown` | `"x" is not allowed` |
//!
//! Object keys are visited in declaration order, then undeclared keys in
//! sorted order, so identical input always yields identical details.

use serde_json::{Map, Number, Value};
use sockwire_core::{
    DetailContext, ErrorDetail, PathSegment, Schema, SchemaKind, ValidationEngine,
    ValidationFlags, ValidationResult,
};

/// The default [`ValidationEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeEngine;

impl ValidationEngine for DeclarativeEngine {
    fn validate(
        &self,
        schema: &Schema,
        value: Option<Value>,
        flags: ValidationFlags,
    ) -> ValidationResult {
        let mut walk = Walk {
            flags,
            errors: Vec::new(),
        };
        let mut path = Vec::new();
        let value = walk.check(schema, value, &mut path);
        ValidationResult::invalid(value, walk.errors)
    }
}

/// Default message template of an error kind.
pub fn default_template(kind: &str) -> Option<&'static str> {
    let template = match kind {
        "any.required" => "\"{{#label}}\" is required",
        "any.only" => "\"{{#label}}\" must be one of {{#limit}}",
        "boolean.base" => "\"{{#label}}\" must be a boolean",
        "number.base" => "\"{{#label}}\" must be a number",
        "number.integer" => "\"{{#label}}\" must be an integer",
        "number.min" => "\"{{#label}}\" must be greater than or equal to {{#limit}}",
        "number.max" => "\"{{#label}}\" must be less than or equal to {{#limit}}",
        "string.base" => "\"{{#label}}\" must be a string",
        "string.min" => "\"{{#label}}\" length must be at least {{#limit}} characters long",
        "string.max" => {
            "\"{{#label}}\" length must be less than or equal to {{#limit}} characters long"
        }
        "array.base" => "\"{{#label}}\" must be an array",
        "array.min" => "\"{{#label}}\" must contain at least {{#limit}} items",
        "array.max" => "\"{{#label}}\" must contain less than or equal to {{#limit}} items",
        "object.base" => "\"{{#label}}\" must be of type object",
        "object.unknown" => "\"{{#label}}\" is not allowed",
        _ => return None,
    };
    Some(template)
}

/// Fill `{{#label}}`, `{{#key}}`, `{{#limit}}` and `{{#value}}` in a template.
pub fn render_template(template: &str, context: &DetailContext) -> String {
    template
        .replace("{{#label}}", &context.label)
        .replace("{{#key}}", context.key.as_deref().unwrap_or(""))
        .replace(
            "{{#limit}}",
            &context.limit.as_ref().map(render_value).unwrap_or_default(),
        )
        .replace(
            "{{#value}}",
            &context.value.as_ref().map(render_value).unwrap_or_default(),
        )
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn path_label(path: &[PathSegment]) -> String {
    let mut label = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !label.is_empty() {
                    label.push('.');
                }
                label.push_str(key);
            }
            PathSegment::Index(index) => {
                label.push_str(&format!("[{index}]"));
            }
        }
    }
    if label.is_empty() {
        "value".to_owned()
    } else {
        label
    }
}

struct Walk {
    flags: ValidationFlags,
    errors: Vec<ErrorDetail>,
}

impl Walk {
    fn halted(&self) -> bool {
        self.flags.contains(ValidationFlags::ABORT_EARLY) && !self.errors.is_empty()
    }

    fn coerce(&self) -> bool {
        self.flags.contains(ValidationFlags::COERCE)
    }

    fn fail(
        &mut self,
        label: Option<&str>,
        path: &[PathSegment],
        kind: &'static str,
        limit: Option<Value>,
        value: Option<&Value>,
    ) {
        if self.halted() {
            return;
        }
        let key = match path.last() {
            Some(PathSegment::Key(key)) => Some(key.clone()),
            _ => None,
        };
        let context = DetailContext {
            key,
            label: label.map_or_else(|| path_label(path), str::to_owned),
            limit,
            value: value.cloned(),
        };
        let message = default_template(kind)
            .map(|template| render_template(template, &context))
            .unwrap_or_else(|| kind.to_owned());
        self.errors.push(ErrorDetail {
            message,
            path: path.to_vec(),
            kind: kind.to_owned(),
            context,
        });
    }

    fn check(
        &mut self,
        schema: &Schema,
        value: Option<Value>,
        path: &mut Vec<PathSegment>,
    ) -> Option<Value> {
        if self.halted() {
            return value;
        }
        let Some(value) = value else {
            if schema.is_required() {
                self.fail(schema.label_text(), path, "any.required", None, None);
            }
            return None;
        };
        if value.is_null() && (schema.is_nullable() || *schema.kind() == SchemaKind::Any) {
            return Some(value);
        }

        let checked = match schema.kind() {
            SchemaKind::Any => Ok(value),
            SchemaKind::Boolean => self.boolean(schema, value, path),
            SchemaKind::Integer => self.number(schema, value, path, true),
            SchemaKind::Number => self.number(schema, value, path, false),
            SchemaKind::String => self.string(schema, value, path),
            SchemaKind::Array(items) => self.array(schema, items.as_deref(), value, path),
            SchemaKind::Object {
                fields,
                allow_unknown,
            } => self.object(schema, fields, *allow_unknown, value, path),
        };

        match checked {
            Ok(value) => {
                if let Some(allowed) = schema.allowed() {
                    if !allowed.contains(&value) {
                        self.fail(
                            schema.label_text(),
                            path,
                            "any.only",
                            Some(Value::Array(allowed.to_vec())),
                            Some(&value),
                        );
                    }
                }
                Some(value)
            }
            Err(value) => Some(value),
        }
    }

    fn boolean(
        &mut self,
        schema: &Schema,
        value: Value,
        path: &[PathSegment],
    ) -> Result<Value, Value> {
        if value.is_boolean() {
            return Ok(value);
        }
        if self.coerce() {
            match value.as_str() {
                Some("true") => return Ok(Value::Bool(true)),
                Some("false") => return Ok(Value::Bool(false)),
                _ => {}
            }
        }
        self.fail(schema.label_text(), path, "boolean.base", None, Some(&value));
        Err(value)
    }

    fn number(
        &mut self,
        schema: &Schema,
        value: Value,
        path: &[PathSegment],
        integer: bool,
    ) -> Result<Value, Value> {
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if self.coerce() => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        };
        let Some(n) = parsed else {
            self.fail(schema.label_text(), path, "number.base", None, Some(&value));
            return Err(value);
        };
        if integer && n.fract() != 0.0 {
            self.fail(schema.label_text(), path, "number.integer", None, Some(&value));
            return Err(value);
        }
        if let Some(min) = schema.min_bound() {
            if n < min {
                self.fail(
                    schema.label_text(),
                    path,
                    "number.min",
                    Some(number_value(min)),
                    Some(&value),
                );
                return Err(value);
            }
        }
        if let Some(max) = schema.max_bound() {
            if n > max {
                self.fail(
                    schema.label_text(),
                    path,
                    "number.max",
                    Some(number_value(max)),
                    Some(&value),
                );
                return Err(value);
            }
        }
        if value.is_number() {
            Ok(value)
        } else {
            Ok(number_value(n))
        }
    }

    fn string(
        &mut self,
        schema: &Schema,
        value: Value,
        path: &[PathSegment],
    ) -> Result<Value, Value> {
        let Some(len) = value.as_str().map(|s| s.chars().count()) else {
            self.fail(schema.label_text(), path, "string.base", None, Some(&value));
            return Err(value);
        };
        self.length(schema, value, len, path, "string.min", "string.max")
    }

    fn length(
        &mut self,
        schema: &Schema,
        value: Value,
        len: usize,
        path: &[PathSegment],
        min_kind: &'static str,
        max_kind: &'static str,
    ) -> Result<Value, Value> {
        let len = len as f64;
        if let Some(min) = schema.min_bound() {
            if len < min {
                self.fail(
                    schema.label_text(),
                    path,
                    min_kind,
                    Some(number_value(min)),
                    Some(&value),
                );
                return Err(value);
            }
        }
        if let Some(max) = schema.max_bound() {
            if len > max {
                self.fail(
                    schema.label_text(),
                    path,
                    max_kind,
                    Some(number_value(max)),
                    Some(&value),
                );
                return Err(value);
            }
        }
        Ok(value)
    }

    fn array(
        &mut self,
        schema: &Schema,
        items_schema: Option<&Schema>,
        value: Value,
        path: &mut Vec<PathSegment>,
    ) -> Result<Value, Value> {
        let len = match value.as_array() {
            Some(items) => items.len(),
            None => {
                self.fail(schema.label_text(), path, "array.base", None, Some(&value));
                return Err(value);
            }
        };
        let value = self.length(schema, value, len, path, "array.min", "array.max")?;
        let (Some(items_schema), Value::Array(items)) = (items_schema, &value) else {
            return Ok(value);
        };
        let items = items.clone();
        let mut checked = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            path.push(PathSegment::Index(index));
            if let Some(item) = self.check(items_schema, Some(item), path) {
                checked.push(item);
            }
            path.pop();
        }
        Ok(Value::Array(checked))
    }

    fn object(
        &mut self,
        schema: &Schema,
        fields: &[(String, Schema)],
        allow_unknown: bool,
        value: Value,
        path: &mut Vec<PathSegment>,
    ) -> Result<Value, Value> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                self.fail(schema.label_text(), path, "object.base", None, Some(&other));
                return Err(other);
            }
        };

        let mut checked = Map::new();
        for (name, field) in fields {
            path.push(PathSegment::Key(name.clone()));
            let value = self.check(field, map.remove(name.as_str()), path);
            path.pop();
            if let Some(value) = value {
                checked.insert(name.clone(), value);
            }
        }

        let strip = self.flags.contains(ValidationFlags::STRIP_UNKNOWN);
        for (key, value) in map {
            if allow_unknown {
                checked.insert(key, value);
                continue;
            }
            if strip {
                continue;
            }
            path.push(PathSegment::Key(key.clone()));
            self.fail(None, path, "object.unknown", None, Some(&value));
            path.pop();
            checked.insert(key, value);
        }

        Ok(Value::Object(checked))
    }
}
