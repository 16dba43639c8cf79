//! Cache Key Module
//!
//! Derives deterministic keys from an operation identifier and its
//! arguments. Arguments go through serde_json and every object is rebuilt
//! with sorted keys, so field order in option structs or JSON literals never
//! changes the key.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

// == Cache Key ==
/// Canonical cache key: `"<operation>:<json array of arguments>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key for `operation`.
    pub fn builder(operation: &str) -> KeyBuilder {
        KeyBuilder {
            operation: operation.to_string(),
            args: Vec::new(),
        }
    }

    /// Derives a key from a single serializable argument list.
    pub fn derive<A: Serialize + ?Sized>(operation: &str, args: &A) -> Result<Self> {
        CacheKey::builder(operation).arg(args)?.build()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

// == Key Builder ==
/// Accumulates positional arguments for a `CacheKey`.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    operation: String,
    args: Vec<Value>,
}

impl KeyBuilder {
    /// Appends one positional argument.
    pub fn arg<A: Serialize + ?Sized>(mut self, value: &A) -> Result<Self> {
        self.args.push(canonicalize(serde_json::to_value(value)?));
        Ok(self)
    }

    /// Appends an optional argument; `None` is encoded as `null`.
    pub fn opt<A: Serialize>(self, value: Option<&A>) -> Result<Self> {
        match value {
            Some(v) => self.arg(v),
            None => self.arg(&Value::Null),
        }
    }

    pub fn build(self) -> Result<CacheKey> {
        let args = serde_json::to_string(&Value::Array(self.args))?;
        Ok(CacheKey(format!("{}:{}", self.operation, args)))
    }
}

// == Canonicalize ==
/// Rebuilds every object in `value` with keys in sorted order and folds
/// `-0.0` into `0.0`.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f == 0.0 && f.is_sign_negative()) => {
            Value::from(0.0)
        }
        other => other,
    }
}
