use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{Map, Number, Value};

use concierge_client::{PromptError, SchemaPrompter, SeedValues};

/// Collects schema-conforming values by asking the user one question per
/// field on the terminal. Seeded pointer locations are taken verbatim and
/// never asked for.
pub struct InteractivePrompter {
    editor: DefaultEditor,
}

impl InteractivePrompter {
    pub fn new() -> Result<Self, PromptError> {
        let editor = DefaultEditor::new().map_err(map_readline)?;
        Ok(Self { editor })
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.editor.readline(prompt).map_err(map_readline)
    }

    fn collect(
        &mut self,
        schema: &Value,
        pointer: &str,
        label: &str,
        seed: &SeedValues,
    ) -> Result<Option<Value>, PromptError> {
        if let Some(value) = seed.get(pointer) {
            println!("{label}: {value} (preset)");
            return Ok(Some(value.clone()));
        }
        if let Some(options) = schema.get("enum").and_then(Value::as_array) {
            return self.collect_enum(options, label);
        }
        match schema_type(schema) {
            Some("object") => self.collect_object(schema, pointer, seed).map(Some),
            Some("array") => self.collect_array(schema, pointer, label, seed).map(Some),
            _ => self.collect_scalar(schema, label),
        }
    }

    fn collect_object(
        &mut self,
        schema: &Value,
        pointer: &str,
        seed: &SeedValues,
    ) -> Result<Value, PromptError> {
        let empty = Map::new();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut collected = Map::new();
        for (name, property) in properties {
            if let Some(description) = property.get("description").and_then(Value::as_str) {
                println!("{name}: {description}");
            }
            let child_pointer = format!("{pointer}/{}", escape_token(name));
            let is_required = required.contains(&name.as_str());
            loop {
                let value = self.collect(property, &child_pointer, name, seed)?;
                match value {
                    Some(value) => {
                        collected.insert(name.clone(), value);
                        break;
                    }
                    None if is_required => {
                        println!("{name} is required.");
                    }
                    None => break,
                }
            }
        }
        Ok(Value::Object(collected))
    }

    fn collect_array(
        &mut self,
        schema: &Value,
        pointer: &str,
        label: &str,
        seed: &SeedValues,
    ) -> Result<Value, PromptError> {
        let items_schema = schema.get("items").cloned().unwrap_or(Value::Null);
        let mut items = Vec::new();
        println!("{label}: enter items, blank line to finish");
        loop {
            let child_pointer = format!("{pointer}/{}", items.len());
            let entry_label = format!("{label}[{}]", items.len());
            match self.collect(&items_schema, &child_pointer, &entry_label, seed)? {
                Some(value) => items.push(value),
                None => break,
            }
        }
        Ok(Value::Array(items))
    }

    fn collect_enum(
        &mut self,
        options: &[Value],
        label: &str,
    ) -> Result<Option<Value>, PromptError> {
        println!("{label}:");
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {}", index + 1, display_value(option));
        }
        loop {
            let raw = self.read_line(&format!("{label} (1-{}): ", options.len()))?;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(choice) = trimmed.parse::<usize>() {
                if (1..=options.len()).contains(&choice) {
                    return Ok(Some(options[choice - 1].clone()));
                }
            }
            if let Some(matched) = options
                .iter()
                .find(|option| display_value(option) == trimmed)
            {
                return Ok(Some(matched.clone()));
            }
            println!("Pick one of the listed options.");
        }
    }

    fn collect_scalar(
        &mut self,
        schema: &Value,
        label: &str,
    ) -> Result<Option<Value>, PromptError> {
        let default = schema.get("default");
        let hint = match (schema_type(schema), default) {
            (Some(kind), Some(default)) => format!(" ({kind}, default {})", display_value(default)),
            (Some(kind), None) => format!(" ({kind})"),
            (None, Some(default)) => format!(" (default {})", display_value(default)),
            (None, None) => String::new(),
        };
        loop {
            let raw = self.read_line(&format!("{label}{hint}: "))?;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(default.cloned());
            }
            match coerce_scalar(trimmed, schema_type(schema)) {
                Ok(value) => return Ok(Some(value)),
                Err(reason) => println!("{reason}"),
            }
        }
    }
}

impl SchemaPrompter for InteractivePrompter {
    fn prompt(&mut self, schema: &Value, seed: &SeedValues) -> Result<Value, PromptError> {
        loop {
            if let Some(value) = self.collect(schema, "", "value", seed)? {
                return Ok(value);
            }
            println!("A value is required.");
        }
    }
}

fn map_readline(error: ReadlineError) -> PromptError {
    match error {
        ReadlineError::Interrupted => PromptError::Aborted("interrupted".to_string()),
        ReadlineError::Eof => PromptError::Aborted("end of input".to_string()),
        other => PromptError::Aborted(other.to_string()),
    }
}

fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// Strings display bare so enum menus and defaults read naturally.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// JSON-Pointer token escaping for property names used in seed lookups.
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Turns one line of input into a typed value according to the schema's
/// declared type. Without a declared type the input is JSON-parsed when
/// possible and kept as a string otherwise.
fn coerce_scalar(raw: &str, declared: Option<&str>) -> Result<Value, String> {
    match declared {
        Some("string") => Ok(Value::String(raw.to_string())),
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{raw}' is not an integer")),
        Some("number") => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{raw}' is not a number")),
        Some("boolean") => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(Value::Bool(true)),
            "false" | "no" | "n" => Ok(Value::Bool(false)),
            _ => Err(format!("'{raw}' is not a boolean (try true/false)")),
        },
        Some("null") => Ok(Value::Null),
        _ => Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
    }
}
