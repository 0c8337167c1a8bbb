use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Pairing of a sequencing run, inferred from the source file names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadType {
    Single,
    PairedEnd,
    Unknown,
}

impl ReadType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadType::Single => "single",
            ReadType::PairedEnd => "paired-end",
            ReadType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table cell: qcML values are numeric where they parse as such.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric coercion with a string fallback.
    pub fn parse(raw: &str) -> Value {
        match raw.trim().parse::<f64>() {
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered key/value row for one sample. Keys keep their insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Per-sample rows, sorted by sample name.
pub type SampleTable = BTreeMap<String, Row>;

/// Result of running a report module.
#[derive(Debug, Eq, PartialEq)]
pub enum ModuleOutcome {
    Report { samples: usize },
    NoData,
}
