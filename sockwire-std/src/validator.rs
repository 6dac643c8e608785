//! Validation adapter.
//!
//! [`Validator`] pairs a [`Schema`] with a [`ValidationEngine`] and rewrites
//! error messages through the process-wide [`Translator`] when one has been
//! installed. [`PayloadValidator`] turns a failed result into the `400`
//! client error the pipeline emits.

use crate::engine::{DeclarativeEngine, render_template};
use serde::Deserialize;
use serde_json::Value;
use sockwire_core::{
    ClientError, ErrorDetail, Schema, Translations, ValidationEngine, ValidationFlags,
    ValidationResult, join_messages,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// Message prefix of payload validation failures.
pub const BAD_PAYLOAD: &str = "Bad payload: ";

/// Options applied with a schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorConfig {
    /// Language used when the context names none.
    pub locale: Option<String>,
    /// Engine switches.
    pub flags: ValidationFlags,
}

/// Per-call validation context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// Preferred message language.
    pub language: Option<&'a str>,
}

impl<'a> ValidationContext<'a> {
    /// Context preferring `language`.
    pub fn in_language(language: &'a str) -> Self {
        Self {
            language: Some(language),
        }
    }
}

struct Installed {
    catalog: Arc<dyn Translations>,
    main_language: String,
}

/// Shared, late-bound translation catalog.
///
/// Clones share the same slot, so translations installed after validators
/// were created are visible to all of them.
#[derive(Clone, Default)]
pub struct Translator {
    installed: Arc<RwLock<Option<Installed>>>,
}

impl Translator {
    /// A translator with nothing installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the catalog and its fallback language.
    pub fn install<T: Translations>(&self, translations: T, main_language: impl Into<String>) {
        let installed = Installed {
            catalog: Arc::new(translations),
            main_language: main_language.into(),
        };
        *self
            .installed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(installed);
    }

    /// Whether a catalog is installed.
    pub fn is_ready(&self) -> bool {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Translate `detail`, falling back from `language` to the main language.
    pub fn translate(&self, language: Option<&str>, detail: &ErrorDetail) -> Option<String> {
        let guard = self
            .installed
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let installed = guard.as_ref()?;
        language
            .and_then(|language| installed.catalog.translate(language, detail))
            .or_else(|| {
                installed
                    .catalog
                    .translate(&installed.main_language, detail)
            })
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Message templates keyed by language, then by error kind.
///
/// Templates use the engine placeholders (`{{#label}}`, `{{#limit}}`, ...).
/// Deserializes from `{"fr": {"number.base": "..."}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TranslationCatalog {
    languages: HashMap<String, HashMap<String, String>>,
}

impl TranslationCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template.
    pub fn insert(
        &mut self,
        language: impl Into<String>,
        kind: impl Into<String>,
        template: impl Into<String>,
    ) {
        self.languages
            .entry(language.into())
            .or_default()
            .insert(kind.into(), template.into());
    }

    /// Builder form of [`TranslationCatalog::insert`].
    pub fn with(
        mut self,
        language: impl Into<String>,
        kind: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.insert(language, kind, template);
        self
    }

    /// Whether `language` has any template.
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }
}

impl Translations for TranslationCatalog {
    fn translate(&self, language: &str, detail: &ErrorDetail) -> Option<String> {
        self.languages
            .get(language)?
            .get(&detail.kind)
            .map(|template| render_template(template, &detail.context))
    }
}

/// Validates one value against a schema.
pub struct Validator<E = DeclarativeEngine> {
    engine: E,
    schema: Option<Schema>,
    config: ValidatorConfig,
    translator: Translator,
}

impl Validator {
    /// A validator on the built-in engine.
    pub fn new() -> Self {
        Self::with_engine(DeclarativeEngine)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ValidationEngine> Validator<E> {
    /// A validator on a custom engine.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            schema: None,
            config: ValidatorConfig::default(),
            translator: Translator::new(),
        }
    }

    /// Set the schema and its options.
    pub fn set_schema(&mut self, schema: Schema, config: ValidatorConfig) {
        self.schema = Some(schema);
        self.config = config;
    }

    /// Builder form of [`Validator::set_schema`].
    pub fn schema(mut self, schema: Schema, config: ValidatorConfig) -> Self {
        self.set_schema(schema, config);
        self
    }

    /// Share a translator handle.
    pub fn translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Install translations on this validator's translator handle.
    pub fn set_translations<T: Translations>(
        &self,
        translations: T,
        main_language: impl Into<String>,
    ) {
        self.translator.install(translations, main_language);
    }

    /// Validate `value`. Without a schema every value is valid.
    pub fn validate(&self, value: Option<Value>, context: &ValidationContext<'_>) -> ValidationResult {
        let Some(schema) = &self.schema else {
            return ValidationResult::valid(value);
        };
        let mut result = self.engine.validate(schema, value, self.config.flags);

        if let Some(errors) = result.errors.as_mut() {
            let language = context.language.or(self.config.locale.as_deref());
            let mut translated = false;
            for detail in errors.iter_mut() {
                if let Some(message) = self.translator.translate(language, detail) {
                    detail.message = message;
                    translated = true;
                }
            }
            if translated {
                result.error_message = Some(join_messages(errors));
            }
        }
        result
    }
}

impl<E> fmt::Debug for Validator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Turns validation failures into `400` client errors.
#[derive(Debug)]
pub struct PayloadValidator<E = DeclarativeEngine> {
    validator: Validator<E>,
    prefix: String,
    replace: bool,
}

impl<E: ValidationEngine> PayloadValidator<E> {
    /// Wrap `validator`; failure messages start with `prefix`.
    pub fn new(validator: Validator<E>, prefix: impl Into<String>) -> Self {
        Self {
            validator,
            prefix: prefix.into(),
            replace: true,
        }
    }

    /// Whether a successful check returns the validated value (default) or
    /// the original one.
    pub fn replace_content(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Check `value`. The descriptor of the error is the list of details.
    pub fn check(
        &self,
        value: Option<Value>,
        context: &ValidationContext<'_>,
    ) -> Result<Option<Value>, ClientError> {
        let original = if self.replace { None } else { value.clone() };
        let result = self.validator.validate(value, context);

        if let Some(errors) = result.errors {
            let descriptor = serde_json::to_value(&errors).unwrap_or_default();
            let message = format!(
                "{}{}",
                self.prefix,
                result.error_message.unwrap_or_default()
            );
            return Err(ClientError::bad_request(message).with_descriptor(descriptor));
        }

        Ok(if self.replace { result.value } else { original })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer_schema() -> Schema {
        Schema::object().field("questionId", Schema::integer().required())
    }

    fn catalog() -> TranslationCatalog {
        TranslationCatalog::new()
            .with("fr", "number.base", "\"{{#label}}\" doit être un nombre")
            .with("en", "number.base", "\"{{#label}}\" has to be numeric")
    }

    #[test]
    fn test_no_schema_accepts_everything() {
        let validator = Validator::new();
        let result = validator.validate(Some(json!("anything")), &ValidationContext::default());
        assert!(result.is_valid());
        assert_eq!(result.value, Some(json!("anything")));
    }

    #[test]
    fn test_untranslated_messages_are_engine_messages() {
        let validator = Validator::new().schema(answer_schema(), ValidatorConfig::default());
        let result = validator.validate(
            Some(json!({"questionId": "x"})),
            &ValidationContext::in_language("fr"),
        );
        assert_eq!(
            result.error_message.as_deref(),
            Some("\"questionId\" must be a number")
        );
    }

    #[test]
    fn test_translations_follow_context_language() {
        let validator = Validator::new().schema(answer_schema(), ValidatorConfig::default());
        validator.set_translations(catalog(), "en");

        let fr = validator.validate(
            Some(json!({"questionId": "x"})),
            &ValidationContext::in_language("fr"),
        );
        assert_eq!(
            fr.error_message.as_deref(),
            Some("\"questionId\" doit être un nombre")
        );

        let fallback = validator.validate(
            Some(json!({"questionId": "x"})),
            &ValidationContext::in_language("de"),
        );
        assert_eq!(
            fallback.error_message.as_deref(),
            Some("\"questionId\" has to be numeric")
        );
    }

    #[test]
    fn test_translations_installed_later_are_visible() {
        let translator = Translator::new();
        let validator = Validator::new()
            .schema(answer_schema(), ValidatorConfig::default())
            .translator(translator.clone());
        assert!(!translator.is_ready());

        translator.install(catalog(), "en");
        let result = validator.validate(Some(json!({"questionId": "x"})), &ValidationContext::default());
        assert_eq!(
            result.errors.unwrap()[0].message,
            "\"questionId\" has to be numeric"
        );
    }

    #[test]
    fn test_config_locale_used_without_context_language() {
        let config = ValidatorConfig {
            locale: Some("fr".into()),
            ..ValidatorConfig::default()
        };
        let validator = Validator::new().schema(answer_schema(), config);
        validator.set_translations(catalog(), "en");
        let result = validator.validate(Some(json!({"questionId": "x"})), &ValidationContext::default());
        assert_eq!(
            result.error_message.as_deref(),
            Some("\"questionId\" doit être un nombre")
        );
    }

    #[test]
    fn test_catalog_deserializes_from_json() {
        let catalog: TranslationCatalog =
            serde_json::from_value(json!({"fr": {"any.required": "\"{{#label}}\" est requis"}}))
                .unwrap();
        assert!(catalog.has_language("fr"));
        assert!(!catalog.has_language("en"));
    }

    #[test]
    fn test_payload_validator_builds_bad_request() {
        let validator = Validator::new().schema(answer_schema(), ValidatorConfig::default());
        let checker = PayloadValidator::new(validator, BAD_PAYLOAD);
        let err = checker
            .check(Some(json!({"questionId": "x"})), &ValidationContext::default())
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.message(), "Bad payload: \"questionId\" must be a number");
        let descriptor = err.descriptor().unwrap();
        assert_eq!(descriptor[0]["path"], json!(["questionId"]));
        assert_eq!(descriptor[0]["type"], json!("number.base"));
    }

    #[test]
    fn test_payload_validator_replace_switch() {
        let schema = Schema::object().field("n", Schema::integer());
        let coerced = PayloadValidator::new(
            Validator::new().schema(schema.clone(), ValidatorConfig::default()),
            BAD_PAYLOAD,
        );
        assert_eq!(
            coerced.check(Some(json!({"n": "7"})), &ValidationContext::default()).unwrap(),
            Some(json!({"n": 7}))
        );

        let original = PayloadValidator::new(
            Validator::new().schema(schema, ValidatorConfig::default()),
            BAD_PAYLOAD,
        )
        .replace_content(false);
        assert_eq!(
            original.check(Some(json!({"n": "7"})), &ValidationContext::default()).unwrap(),
            Some(json!({"n": "7"}))
        );
    }
}
