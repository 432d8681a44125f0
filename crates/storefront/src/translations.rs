//! Message catalog lookups.
//!
//! Messages are loaded from a JSON file. Nested objects are flattened into
//! dotted keys, so `{"checkout": {"title": "Caja"}}` answers `checkout.title`.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use vinoteca_core::ShippingMethod;

/// Errors loading a message catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read message catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid message catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Looks up localized strings.
pub trait Translate: Send + Sync + 'static {
    /// The message for `key`, or `fallback` if there is none.
    fn t(&self, key: &str, fallback: &str) -> String;
}

/// Flat key/message map.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// A catalog with no messages; every lookup returns its fallback.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let root: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut messages = HashMap::new();
        flatten(None, root, &mut messages);
        Ok(Self { messages })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn flatten(
    prefix: Option<&str>,
    object: serde_json::Map<String, serde_json::Value>,
    out: &mut HashMap<String, String>,
) {
    for (key, value) in object {
        let key = prefix.map_or_else(|| key.clone(), |prefix| format!("{prefix}.{key}"));
        match value {
            serde_json::Value::String(message) => {
                out.insert(key, message);
            }
            serde_json::Value::Object(nested) => flatten(Some(&key), nested, out),
            // Numbers, arrays and the like are not messages
            _ => {}
        }
    }
}

impl From<HashMap<String, String>> for MessageCatalog {
    fn from(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }
}

impl Translate for MessageCatalog {
    fn t(&self, key: &str, fallback: &str) -> String {
        self.messages
            .get(key)
            .map_or_else(|| fallback.to_string(), Clone::clone)
    }
}

/// Replace a method's name and description with their translations.
pub fn localize_method<T: Translate + ?Sized>(translator: &T, method: ShippingMethod) -> ShippingMethod {
    ShippingMethod {
        name: translator.t(&method.name_key(), &method.name),
        description: translator.t(&method.description_key(), &method.description),
        ..method
    }
}
