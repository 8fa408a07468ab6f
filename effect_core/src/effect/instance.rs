//! Active effect instances attached to an entity

use super::{DurationPolicy, EffectDefinition, EffectKind};
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// One live effect on one entity.
///
/// At most one instance of a given kind exists per entity; re-application
/// goes through the owner store's stacking resolution instead of creating
/// duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectInstance {
    pub kind: EffectKind,
    /// Current stack count; an instance at zero stacks is removed the same
    /// tick that is detected
    pub stacks: u32,
    /// Ticks since application (or since the last duration reset)
    pub age_ticks: u32,
    /// Ticks since the last periodic callback fired
    pub tick_counter: u32,
    /// Who applied this effect. Attribution only, never ownership; the
    /// source may die or despawn while the effect lives on.
    pub source: Option<EntityId>,
    /// Applier attack power captured at apply time
    pub source_attack: f64,
    /// Remaining absorption for shield effects
    pub shield_points: f64,
}

impl EffectInstance {
    pub fn new(def: &EffectDefinition, source: Option<EntityId>, source_attack: f64, stacks: u32) -> Self {
        EffectInstance {
            kind: def.kind,
            stacks: stacks.max(1).min(def.max_stacks()),
            age_ticks: 0,
            tick_counter: 0,
            source,
            source_attack,
            shield_points: def.shield_points,
        }
    }

    /// Whether this instance has outlived its duration policy
    pub fn expired(&self, def: &EffectDefinition) -> bool {
        match def.duration {
            DurationPolicy::Ticks { ticks } => self.age_ticks >= ticks,
            DurationPolicy::Permanent => false,
            DurationPolicy::UntilConsumed => self.stacks == 0,
        }
    }

    /// Add stacks, clamped to the definition's cap
    pub fn add_stacks(&mut self, amount: u32, def: &EffectDefinition) {
        self.stacks = self.stacks.saturating_add(amount).min(def.max_stacks());
    }

    /// Remove up to `amount` stacks, returning how many were actually spent
    pub fn consume_stacks(&mut self, amount: u32) -> u32 {
        let consumed = amount.min(self.stacks);
        self.stacks -= consumed;
        consumed
    }

    /// Restart the duration clock (stacking rules decide when this happens)
    pub fn reset_age(&mut self) {
        self.age_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectRegistry;

    #[test]
    fn test_new_instance_clamps_stacks() {
        let registry = EffectRegistry::with_defaults();
        let rend = registry.get(EffectKind::Rend).unwrap();

        let inst = EffectInstance::new(rend, None, 0.0, 0);
        assert_eq!(inst.stacks, 1, "minimum one stack");

        let inst = EffectInstance::new(rend, None, 0.0, 99);
        assert_eq!(inst.stacks, 8, "clamped to max");
    }

    #[test]
    fn test_consume_stacks_never_negative() {
        let registry = EffectRegistry::with_defaults();
        let gash = registry.get(EffectKind::Gash).unwrap();
        let mut inst = EffectInstance::new(gash, None, 10.0, 3);

        assert_eq!(inst.consume_stacks(2), 2);
        assert_eq!(inst.stacks, 1);
        assert_eq!(inst.consume_stacks(5), 1);
        assert_eq!(inst.stacks, 0);
        assert_eq!(inst.consume_stacks(5), 0);
    }

    #[test]
    fn test_until_consumed_expiry() {
        let registry = EffectRegistry::with_defaults();
        let gash = registry.get(EffectKind::Gash).unwrap();
        let mut inst = EffectInstance::new(gash, None, 10.0, 2);
        assert!(!inst.expired(gash));

        inst.consume_stacks(2);
        assert!(inst.expired(gash));

        // Age never expires an UntilConsumed effect
        let mut aged = EffectInstance::new(gash, None, 10.0, 2);
        aged.age_ticks = 1_000_000;
        assert!(!aged.expired(gash));
    }
}
