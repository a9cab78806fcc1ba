use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use concierge_protocol::{JsonPointer, ProtocolError};

#[derive(Debug, Error)]
/// Failures raised while collecting a value from the user or script.
pub enum PromptError {
    #[error("prompt aborted: {0}")]
    Aborted(String),
    #[error("prompt read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pointer-addressed values supplied up front (`--set`), consumed on the
/// first turn so those locations are never prompted for.
#[derive(Debug, Clone, Default)]
pub struct SeedValues {
    entries: BTreeMap<String, Value>,
}

impl SeedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the pointer before storing; later lookups use the exact
    /// pointer string.
    pub fn insert(&mut self, pointer: &str, value: Value) -> Result<(), ProtocolError> {
        JsonPointer::parse(pointer)?;
        self.entries.insert(pointer.to_string(), value);
        Ok(())
    }

    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.entries.get(pointer)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Collects a value conforming to a JSON Schema, blocking on human or
/// scripted input. Seeded pointer locations must be taken as-is instead of
/// prompting.
pub trait SchemaPrompter {
    fn prompt(&mut self, schema: &Value, seed: &SeedValues) -> Result<Value, PromptError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unit_seed_values_validate_pointers_on_insert() {
        let mut seed = SeedValues::new();
        seed.insert("/name", json!("Bob")).expect("valid pointer");
        seed.insert("", json!({"whole": true})).expect("root pointer");
        assert!(seed.insert("name", json!("x")).is_err());
        assert_eq!(seed.get("/name"), Some(&json!("Bob")));
        assert_eq!(seed.get("/missing"), None);
    }
}
