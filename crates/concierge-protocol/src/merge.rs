use serde_json::{Map, Value};

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// An RFC 6901 JSON Pointer, parsed into unescaped reference tokens.
pub struct JsonPointer {
    raw: String,
    tokens: Vec<String>,
}

impl JsonPointer {
    /// Parses pointer syntax: empty string is the root; otherwise the
    /// pointer must start with `/` and `~` may only appear as `~0` or `~1`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        if raw.is_empty() {
            return Ok(Self {
                raw: String::new(),
                tokens: Vec::new(),
            });
        }
        if !raw.starts_with('/') {
            return Err(ProtocolError::InvalidPointer {
                pointer: raw.to_string(),
                reason: "pointer must be empty or start with '/'".to_string(),
            });
        }
        let mut tokens = Vec::new();
        for segment in raw.split('/').skip(1) {
            tokens.push(unescape_token(raw, segment)?);
        }
        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Follows the pointer through `doc`, returning the referenced value if
    /// every token resolves.
    pub fn resolve<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut current = doc;
        for token in &self.tokens {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => {
                    let index = parse_index(token)?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns `doc` with `value` placed at the pointer location, creating
    /// intermediate objects for missing tokens. Array tokens set in place
    /// for valid indices and append for the one-past-the-end index or `-`;
    /// anything else replaces the obstructing value with fresh objects.
    pub fn set(&self, doc: Value, value: Value) -> Value {
        set_at(doc, &self.tokens, value)
    }
}

fn unescape_token(pointer: &str, segment: &str) -> Result<String, ProtocolError> {
    let mut token = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            token.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => token.push('~'),
            Some('1') => token.push('/'),
            _ => {
                return Err(ProtocolError::InvalidPointer {
                    pointer: pointer.to_string(),
                    reason: "'~' must be followed by '0' or '1'".to_string(),
                })
            }
        }
    }
    Ok(token)
}

/// RFC 6901 array indices: no leading zeros, digits only.
fn parse_index(token: &str) -> Option<usize> {
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn set_at(doc: Value, tokens: &[String], value: Value) -> Value {
    let Some((first, rest)) = tokens.split_first() else {
        return value;
    };
    match doc {
        Value::Object(mut map) => {
            let child = map.remove(first).unwrap_or(Value::Null);
            map.insert(first.clone(), set_at(child, rest, value));
            Value::Object(map)
        }
        Value::Array(mut items) => {
            if let Some(index) = parse_index(first) {
                if index < items.len() {
                    let child = items[index].take();
                    items[index] = set_at(child, rest, value);
                    return Value::Array(items);
                }
                if index == items.len() {
                    items.push(set_at(Value::Null, rest, value));
                    return Value::Array(items);
                }
            }
            if first == "-" {
                items.push(set_at(Value::Null, rest, value));
                return Value::Array(items);
            }
            scaffold(tokens, value)
        }
        _ => scaffold(tokens, value),
    }
}

/// Builds the nested object structure for tokens that have nothing to
/// attach to yet.
fn scaffold(tokens: &[String], value: Value) -> Value {
    tokens.iter().rev().fold(value, |inner, token| {
        let mut map = Map::new();
        map.insert(token.clone(), inner);
        Value::Object(map)
    })
}

/// Recursively merges `b` into `a`. Two objects merge key by key; any
/// non-object on either side means `b` wins outright, arrays included.
pub fn deep_merge(a: &Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            let mut merged = left.clone();
            for (key, incoming) in right {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(&existing, incoming),
                    None => incoming,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, other) => other,
    }
}

/// Folds a newly collected `payload` into the accumulated `base` document.
///
/// Without a base the payload stands alone. Otherwise `path` (root when
/// absent) locates the merge point: a resolvable location deep-merges with
/// the payload, an unresolvable one is created and set. `base` is never
/// mutated.
pub fn combine(
    base: Option<&Value>,
    path: Option<&str>,
    payload: Value,
) -> Result<Value, ProtocolError> {
    let Some(base) = base else {
        return Ok(payload);
    };
    let pointer = JsonPointer::parse(path.unwrap_or(""))?;
    let next = match pointer.resolve(base) {
        Some(existing) => {
            let merged = deep_merge(existing, payload);
            pointer.set(base.clone(), merged)
        }
        None => pointer.set(base.clone(), payload),
    };
    Ok(next)
}
