//! Pre-damage interception hooks
//!
//! Incoming damage runs through a fixed hook order before it touches health:
//! shields absorb first, then flat reductions, then vulnerability
//! multipliers. Armor mitigation applies after all hooks. The order is part
//! of the engine contract; shields always see the raw amount.

use super::DamageEvent;
use crate::effect::{EffectKind, EffectRegistry, EffectStore};

/// What the hooks did to one event
#[derive(Debug, Clone, Default)]
pub struct PreDamageReport {
    pub absorbed_by_shield: f64,
    /// Set on the hit that empties a shield, never again for that shield
    pub shield_broken: bool,
    /// Product of the reduction and vulnerability factors applied
    pub multiplier: f64,
}

/// Run every pre-damage hook on the target's effect store, rewriting
/// `event.amount` in place.
///
/// A broken shield is removed from the store here, before the event
/// resolves, so nothing later this tick sees a zero-point shield.
pub fn run_pre_damage_hooks(
    store: &mut EffectStore,
    registry: &EffectRegistry,
    event: &mut DamageEvent,
) -> PreDamageReport {
    let mut report = PreDamageReport {
        multiplier: 1.0,
        ..Default::default()
    };

    // 1. Shield absorption
    if let Some(barrier) = store.get_mut(EffectKind::FrostBarrier) {
        if barrier.shield_points > 0.0 && event.amount > 0.0 {
            let absorbed = event.amount.min(barrier.shield_points);
            barrier.shield_points -= absorbed;
            event.amount -= absorbed;
            report.absorbed_by_shield = absorbed;

            if barrier.shield_points <= 0.0 {
                report.shield_broken = true;
                store.remove(EffectKind::FrostBarrier);
                tracing::debug!(target = %event.target, "shield broken");
            }
        }
    }

    // 2. Flat reductions
    if store.contains(EffectKind::FortifiedStance) {
        if let Some(def) = registry.get(EffectKind::FortifiedStance) {
            event.amount *= def.damage_taken_multiplier;
            report.multiplier *= def.damage_taken_multiplier;
        }
    }

    // 3. Vulnerability multipliers (physical damage only)
    if event.kind.is_physical() {
        let stacks = store.stacks(EffectKind::Rend);
        if stacks > 0 {
            if let Some(def) = registry.get(EffectKind::Rend) {
                let factor = 1.0 + def.per_stack_bonus * stacks as f64;
                event.amount *= factor;
                report.multiplier *= factor;
            }
        }
    }

    report
}

/// Armor mitigation: `armor / (armor + 5 * damage)` of the damage is
/// absorbed. Returns the damage that gets through.
pub fn apply_armor(armor: f64, damage: f64) -> f64 {
    if damage <= 0.0 || armor <= 0.0 {
        return damage.max(0.0);
    }
    let fraction = armor / (armor + 5.0 * damage);
    damage * (1.0 - fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DamageKind, EntityId};

    fn event(amount: f64, kind: DamageKind) -> DamageEvent {
        DamageEvent::new(EntityId(1), amount, kind, None)
    }

    fn setup(kinds: &[(EffectKind, u32)]) -> (EffectStore, EffectRegistry) {
        let registry = EffectRegistry::with_defaults();
        let mut store = EffectStore::new();
        for (kind, stacks) in kinds {
            let def = registry.get(*kind).unwrap().clone();
            store.apply(&def, None, 0.0, *stacks);
        }
        (store, registry)
    }

    #[test]
    fn test_shield_absorbs_fully() {
        let (mut store, registry) = setup(&[(EffectKind::FrostBarrier, 1)]);
        let mut ev = event(50.0, DamageKind::Physical);

        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!((ev.amount).abs() < f64::EPSILON);
        assert!((report.absorbed_by_shield - 50.0).abs() < f64::EPSILON);
        assert!(!report.shield_broken);
        assert!((store.get(EffectKind::FrostBarrier).unwrap().shield_points - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shield_breaks_once_and_is_removed() {
        let (mut store, registry) = setup(&[(EffectKind::FrostBarrier, 1)]);
        let mut ev = event(95.0, DamageKind::Physical);

        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!((ev.amount - 15.0).abs() < 1e-9);
        assert!((report.absorbed_by_shield - 80.0).abs() < f64::EPSILON);
        assert!(report.shield_broken);
        assert!(!store.contains(EffectKind::FrostBarrier), "broken shield removed immediately");

        // A second hit finds no shield at all
        let mut ev = event(10.0, DamageKind::Physical);
        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!(!report.shield_broken);
        assert!((ev.amount - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fortified_stance_reduction() {
        let (mut store, registry) = setup(&[(EffectKind::FortifiedStance, 1)]);
        let mut ev = event(100.0, DamageKind::Fire);

        run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!((ev.amount - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_rend_amplifies_physical_only() {
        let (mut store, registry) = setup(&[(EffectKind::Rend, 4)]);

        let mut physical = event(100.0, DamageKind::Physical);
        run_pre_damage_hooks(&mut store, &registry, &mut physical);
        assert!((physical.amount - 220.0).abs() < 1e-9, "1 + 4 * 0.30");

        let mut fire = event(100.0, DamageKind::Fire);
        run_pre_damage_hooks(&mut store, &registry, &mut fire);
        assert!((fire.amount - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hook_order_shield_before_multiplier() {
        // The shield sees the raw 100, not the Rend-amplified amount
        let (mut store, registry) = setup(&[(EffectKind::FrostBarrier, 1), (EffectKind::Rend, 8)]);
        let mut ev = event(100.0, DamageKind::Physical);

        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!((report.absorbed_by_shield - 80.0).abs() < f64::EPSILON);
        // Remaining 20 amplified by 1 + 8 * 0.30 = 3.4
        assert!((ev.amount - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_reduction_and_vulnerability_compose() {
        let (mut store, registry) = setup(&[(EffectKind::FortifiedStance, 1), (EffectKind::Rend, 2)]);
        let mut ev = event(100.0, DamageKind::Physical);

        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        // 100 * 0.8 * 1.6
        assert!((ev.amount - 128.0).abs() < 1e-9);
        assert!((report.multiplier - 1.28).abs() < 1e-9);
    }

    #[test]
    fn test_armor_mitigation() {
        // 50 armor vs 100 damage: 50/(50+500) absorbed
        let through = apply_armor(50.0, 100.0);
        assert!((through - (100.0 * (1.0 - 50.0 / 550.0))).abs() < 1e-9);

        assert!((apply_armor(0.0, 100.0) - 100.0).abs() < f64::EPSILON);
        assert!(apply_armor(50.0, 0.0).abs() < f64::EPSILON);
        assert!(apply_armor(50.0, -5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_damage_leaves_shield_intact() {
        let (mut store, registry) = setup(&[(EffectKind::FrostBarrier, 1)]);
        let mut ev = event(0.0, DamageKind::Physical);

        let report = run_pre_damage_hooks(&mut store, &registry, &mut ev);
        assert!(report.absorbed_by_shield.abs() < f64::EPSILON);
        assert!((store.get(EffectKind::FrostBarrier).unwrap().shield_points - 80.0).abs() < f64::EPSILON);
    }
}
