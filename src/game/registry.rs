//! Resource-type registry.

use serde::{Deserialize, Serialize};

fn spawnable_default() -> bool {
    true
}

/// One tile/resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Type tag carried by tiles and bank entries.
    pub name: String,
    /// Display color for presentation layers.
    pub color: String,
    /// Whether refills may draw this type.
    #[serde(default = "spawnable_default")]
    pub spawnable: bool,
}

impl ResourceType {
    /// A spawnable type.
    #[must_use]
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            spawnable: true,
        }
    }
}

/// Read-only table of tile types, queried when refilling the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRegistry {
    types: Vec<ResourceType>,
}

impl ResourceRegistry {
    /// Build from configuration entries, keeping their order.
    #[must_use]
    pub fn new(types: Vec<ResourceType>) -> Self {
        Self { types }
    }

    /// Look up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Every type name, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    /// Names refills may draw from, in registration order.
    #[must_use]
    pub fn spawnable(&self) -> Vec<&str> {
        self.types
            .iter()
            .filter(|t| t.spawnable)
            .map(|t| t.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawnable_filter_keeps_order() {
        let mut stone = ResourceType::new("stone", "#777");
        stone.spawnable = false;
        let registry = ResourceRegistry::new(vec![
            ResourceType::new("fire", "#f00"),
            stone,
            ResourceType::new("water", "#00f"),
        ]);
        assert_eq!(registry.spawnable(), vec!["fire", "water"]);
        assert_eq!(registry.names().count(), 3);
        assert_eq!(registry.get("stone").map(|t| t.spawnable), Some(false));
    }
}
