use serde::Serialize;
use serde_json::{Map, Value};

/// Data handed to a template: context name -> JSON value.
///
/// Built fresh for every render and only read once it reaches the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the context, replacing any previous value for `key`
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Copy of `self` with every entry of `other` layered on top.
    pub fn merged_with(&self, other: RenderContext) -> Self {
        let mut merged = self.clone();
        merged.values.extend(other.values);
        merged
    }

    pub fn to_tera(&self) -> tera::Context {
        let mut context = tera::Context::new();
        for (key, value) in &self.values {
            context.insert(key.as_str(), value);
        }
        context
    }
}

impl FromIterator<(String, Value)> for RenderContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}
