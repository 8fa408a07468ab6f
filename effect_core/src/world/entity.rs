//! Entity state

use crate::effect::EffectStore;
use crate::types::{EntityId, Faction, Position};
use serde::{Deserialize, Serialize};

/// One combatant in a world.
///
/// Dead entities stay in the world with `alive == false` so that effect
/// attribution (who applied what) keeps resolving after the applier falls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub faction: Faction,
    pub position: Position,
    pub max_hp: f64,
    pub current_hp: f64,
    pub attack_power: f64,
    pub armor: f64,
    pub alive: bool,
    pub effects: EffectStore,
}

impl Entity {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        faction: Faction,
        position: Position,
        max_hp: f64,
        attack_power: f64,
        armor: f64,
    ) -> Self {
        Entity {
            id,
            name: name.into(),
            faction,
            position,
            max_hp,
            current_hp: max_hp,
            attack_power,
            armor,
            alive: true,
            effects: EffectStore::new(),
        }
    }

    pub fn hp_fraction(&self) -> f64 {
        if self.max_hp <= 0.0 {
            return 0.0;
        }
        (self.current_hp / self.max_hp).clamp(0.0, 1.0)
    }
}
