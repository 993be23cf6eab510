//! Scalar mappings.

use crate::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a custom scalar is represented in generated code.
///
/// In a config file this is written as
/// `{ "type": "Instant", "import": "kotlinx.datetime.Instant" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarMapping {
    /// Target-language type expression.
    #[serde(rename = "type")]
    pub target_type: String,
    /// Function (or serializer object, for Kotlin) that encodes a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serializer: Option<String>,
    /// Function that decodes a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deserializer: Option<String>,
    /// Module, crate path or class to import the type (and hooks) from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
}

impl ScalarMapping {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            serializer: None,
            deserializer: None,
            import: None,
        }
    }

    #[must_use]
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.import = Some(import.into());
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, serializer: impl Into<String>, deserializer: impl Into<String>) -> Self {
        self.serializer = Some(serializer.into());
        self.deserializer = Some(deserializer.into());
        self
    }

    pub(crate) fn has_hooks(&self) -> bool {
        self.serializer.is_some() || self.deserializer.is_some()
    }
}

/// The resolved representation of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarTarget<'a> {
    /// A built-in scalar with a fixed native type.
    Builtin(&'static str),
    Mapped(&'a ScalarMapping),
    /// A custom scalar without a mapping, carried as raw JSON.
    Json,
}

pub(crate) fn resolve<'a>(
    language: Language,
    name: &str,
    scalars: &'a BTreeMap<String, ScalarMapping>,
) -> ScalarTarget<'a> {
    if let Some(native) = builtin(language, name) {
        return ScalarTarget::Builtin(native);
    }
    scalars.get(name).map_or(ScalarTarget::Json, ScalarTarget::Mapped)
}

/// Native types of the five built-in scalars.
pub(crate) fn builtin(language: Language, name: &str) -> Option<&'static str> {
    let native = match (language, name) {
        (Language::TypeScript, "String" | "ID") => "string",
        (Language::TypeScript, "Int" | "Float") => "number",
        (Language::TypeScript, "Boolean") => "boolean",
        (Language::Rust, "String" | "ID") => "String",
        (Language::Rust, "Int") => "i32",
        (Language::Rust, "Float") => "f64",
        (Language::Rust, "Boolean") => "bool",
        (Language::Kotlin, "String" | "ID") => "String",
        (Language::Kotlin, "Int") => "Int",
        (Language::Kotlin, "Float") => "Double",
        (Language::Kotlin, "Boolean") => "Boolean",
        _ => return None,
    };
    Some(native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        assert_eq!(builtin(Language::TypeScript, "ID"), Some("string"));
        assert_eq!(builtin(Language::Rust, "Int"), Some("i32"));
        assert_eq!(builtin(Language::Kotlin, "Float"), Some("Double"));
        assert_eq!(builtin(Language::Rust, "DateTime"), None);
    }

    #[test]
    fn test_resolve_falls_back_to_json() {
        let mut scalars = BTreeMap::new();
        scalars.insert("DateTime".to_string(), ScalarMapping::new("Date"));

        assert_eq!(
            resolve(Language::TypeScript, "DateTime", &scalars),
            ScalarTarget::Mapped(&ScalarMapping::new("Date"))
        );
        assert_eq!(resolve(Language::TypeScript, "Json", &scalars), ScalarTarget::Json);
        assert_eq!(
            resolve(Language::TypeScript, "Boolean", &scalars),
            ScalarTarget::Builtin("boolean")
        );
    }

    #[test]
    fn test_mapping_from_json() {
        let mapping: ScalarMapping = serde_json::from_str(
            r#"{ "type": "chrono::NaiveDate", "deserializer": "crate::dates::parse" }"#,
        )
        .unwrap();
        assert_eq!(mapping.target_type, "chrono::NaiveDate");
        assert_eq!(mapping.deserializer.as_deref(), Some("crate::dates::parse"));
        assert!(mapping.has_hooks());

        let unknown = serde_json::from_str::<ScalarMapping>(r#"{ "type": "X", "module": "y" }"#);
        assert!(unknown.is_err());
    }
}
