//! Effect metadata values.

use std::collections::BTreeMap;

use crate::ecs::{EntityId, EntityRemap};

/// One metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Whole number.
    Int(i64),
    /// Fractional number.
    Float(f64),
    /// Free text, such as a reason string or a tile type.
    Text(String),
    /// Boolean flag.
    Flag(bool),
    /// Reference to another entity; rewritten when the world is forked.
    Entity(EntityId),
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Flag(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

/// Keyed metadata of an effect or effect spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    /// Empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Numeric value as an integer; floats are rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Float(v) => Some(v.round() as i64),
            _ => None,
        }
    }

    /// Numeric value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            MetaValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Flag value; absent reads as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(MetaValue::Flag(true)))
    }

    /// Entity reference.
    #[must_use]
    pub fn entity(&self, key: &str) -> Option<EntityId> {
        match self.0.get(key)? {
            MetaValue::Entity(v) => Some(*v),
            _ => None,
        }
    }

    /// Overwrite with every entry of `other`.
    pub fn merge(&mut self, other: &Metadata) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn remap(&mut self, remap: &EntityRemap) {
        for value in self.0.values_mut() {
            if let MetaValue::Entity(id) = value {
                *id = remap.apply(*id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_reads_cross_types() {
        let meta = Metadata::new().with("a", 3_i64).with("b", 2.6);
        assert_eq!(meta.int("a"), Some(3));
        assert_eq!(meta.int("b"), Some(3));
        assert_eq!(meta.float("a"), Some(3.0));
        assert_eq!(meta.text("a"), None);
        assert!(!meta.flag("missing"));
    }

    #[test]
    fn test_merge_overwrites() {
        let mut meta = Metadata::new().with("reason", "venom").with("amount", 1_i64);
        meta.merge(&Metadata::new().with("amount", 4_i64));
        assert_eq!(meta.int("amount"), Some(4));
        assert_eq!(meta.text("reason"), Some("venom"));
    }
}
