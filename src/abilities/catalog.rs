//! Ability catalog and the built-in ability set.

use std::collections::BTreeMap;

use crate::abilities::{AbilityDefinition, EffectSpec, TargetKind};
use crate::error::{EngineError, EngineResult};
use crate::events::EventKind;

/// Ability definitions by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityCatalog {
    defs: BTreeMap<String, AbilityDefinition>,
}

impl AbilityCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition; returns the one it replaced.
    pub fn register(&mut self, def: AbilityDefinition) -> Option<AbilityDefinition> {
        self.defs.insert(def.name.clone(), def)
    }

    /// Look up a definition.
    ///
    /// # Errors
    ///
    /// Unknown names are a data mistake and return
    /// [`EngineError::UnknownAbility`].
    pub fn get(&self, name: &str) -> EngineResult<&AbilityDefinition> {
        self.defs
            .get(name)
            .ok_or_else(|| EngineError::UnknownAbility(name.to_string()))
    }

    /// Whether a name is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The stock ability set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for def in builtin_defs() {
            catalog.register(def);
        }
        catalog
    }
}

fn builtin_defs() -> Vec<AbilityDefinition> {
    vec![
        AbilityDefinition::new("fireball")
            .describe("Hurl fire at the opponent.")
            .cost("fire", 5)
            .param("damage", 6.0)
            .effect(
                EffectSpec::new("damage", TargetKind::Opponent)
                    .meta("reason", "fireball")
                    .param("amount", "damage"),
            ),
        AbilityDefinition::new("verdant_surge")
            .describe("Grow nature tiles and heal for each one.")
            .cost("nature", 4)
            .cooldown(1)
            .param("tiles", 3.0)
            .param("heal_per_tile", 2.0)
            .effect(
                EffectSpec::new("transform_tiles", TargetKind::Board)
                    .meta("kind", "nature")
                    .param("count", "tiles"),
            )
            .effect(
                EffectSpec::new("heal_per_transformed", TargetKind::SelfTarget)
                    .param("per_tile", "heal_per_tile"),
            ),
        AbilityDefinition::new("hex_blast")
            .describe("Blast a patch of the board and sting the opponent.")
            .cost("hex", 5)
            .cooldown(1)
            .targets_tile()
            .param("damage", 3.0)
            .effect(EffectSpec::new("clear_area", TargetKind::PendingTarget).meta("radius", 1_i64))
            .effect(
                EffectSpec::new("damage", TargetKind::Opponent)
                    .meta("reason", "hex_blast")
                    .param("amount", "damage"),
            ),
        AbilityDefinition::new("venom")
            .describe("Poison the opponent; stacks.")
            .cost("hex", 3)
            .cost("nature", 2)
            .param("stacks", 3.0)
            .effect(
                EffectSpec::new("poison", TargetKind::Opponent)
                    .cumulative(3)
                    .count_param("stacks")
                    .meta("amount", 1_i64),
            ),
        AbilityDefinition::new("battle_cry")
            .describe("Boost damage for two turns without ending the turn.")
            .cost("fire", 3)
            .cost("light", 2)
            .cooldown(3)
            .keeps_turn()
            .param("bonus", 2.0)
            .effect(
                EffectSpec::new("damage_bonus", TargetKind::SelfTarget)
                    .turns(2)
                    .param("amount", "bonus"),
            ),
        AbilityDefinition::new("aegis")
            .describe("Ward against the next hit.")
            .cost("light", 4)
            .cost("water", 2)
            .cooldown(2)
            .effect(
                EffectSpec::new("ward", TargetKind::SelfTarget)
                    .exclusive()
                    .expire_on(EventKind::DamagePrevented, true),
            ),
        AbilityDefinition::new("tidal_tap")
            .describe("Wash away afflictions and regenerate.")
            .cost("water", 4)
            .cooldown(2)
            .param("regen", 2.0)
            .effect(EffectSpec::new("cleanse", TargetKind::SelfTarget))
            .effect(
                EffectSpec::new("regen", TargetKind::SelfTarget)
                    .turns(3)
                    .refresh()
                    .param("amount", "regen"),
            ),
        AbilityDefinition::new("siphon")
            .describe("Steal light from the opponent.")
            .cost("water", 2)
            .cost("hex", 2)
            .param("drain", 3.0)
            .effect(
                EffectSpec::new("drain_resource", TargetKind::Opponent)
                    .meta("resource", "light")
                    .meta("to_caster", true)
                    .param("amount", "drain"),
            )
            .effect(EffectSpec::new("damage", TargetKind::Opponent).meta("amount", 2_i64)),
        AbilityDefinition::new("kindle")
            .describe("Set the opponent burning.")
            .cost("fire", 4)
            .param("burn", 2.0)
            .effect(
                EffectSpec::new("burn", TargetKind::Opponent)
                    .turns(3)
                    .exclusive()
                    .meta("harmful", true)
                    .param("amount", "burn"),
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let catalog = AbilityCatalog::builtin();
        assert_eq!(catalog.len(), 9);
        assert!(catalog.contains("battle_cry"));
        assert!(!catalog.get("battle_cry").unwrap().ends_turn);
    }

    #[test]
    fn test_unknown_ability_is_an_error() {
        let catalog = AbilityCatalog::builtin();
        assert!(matches!(
            catalog.get("meteor"),
            Err(EngineError::UnknownAbility(name)) if name == "meteor"
        ));
    }

    #[test]
    fn test_builtin_overrides_name_real_params() {
        for name in AbilityCatalog::builtin().names() {
            let catalog = AbilityCatalog::builtin();
            let def = catalog.get(name).unwrap();
            for spec in &def.effects {
                for o in &spec.overrides {
                    assert!(def.params.contains_key(&o.param), "{name}: {}", o.param);
                }
                if let Some(param) = &spec.count_param {
                    assert!(def.params.contains_key(param), "{name}: {param}");
                }
            }
        }
    }
}
