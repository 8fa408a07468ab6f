//! Ability casts
//!
//! Each cast follows the same shape: validate the target, resolve the base
//! value from the caster's attack, enumerate affected entities (filtered
//! before any side effect runs), deal damage through the pipeline, apply
//! effects. Validation failures reject the cast before anything mutates.

use crate::combat::{DamageEvent, DamageOutcome};
use crate::effect::EffectKind;
use crate::types::{DamageKind, EntityId, Faction, Position, TurretId};
use crate::world::World;
use thiserror::Error;

pub const EXECUTE_RANGE: f64 = 35.0;
pub const SUPPORT_RANGE: f64 = 25.0;
pub const MARK_RANGE: f64 = 35.0;
pub const BURST_RANGE: f64 = 30.0;
pub const SUMMON_RANGE: f64 = 10.0;

/// Rend stacks spent (and required) for the execute bonus
const EXECUTE_REND_THRESHOLD: u32 = 6;
/// Bonus multiplier when the threshold is met
const EXECUTE_BONUS: f64 = 1.20;
/// Base execute damage as a fraction of caster attack
const EXECUTE_FRACTION: f64 = 1.60;
/// Radius around the (pre-hit) target position that catches the bleed spread
const GASH_SPREAD_RADIUS: f64 = 6.0;
/// Corrosion burst sizing
const BURST_RADIUS: f64 = 3.0;
const BURST_FRACTION: f64 = 1.20;
/// Firelight shot: full attack, feeds the momentum counter on a landed hit
const FIRELIGHT_FRACTION: f64 = 1.0;
/// Boil-and-reduce: fire AoE scaled by spent momentum
const BOIL_RADIUS: f64 = 3.0;
const BOIL_FRACTION: f64 = 1.0;
/// Damage bonus per momentum point spent
const MOMENTUM_BONUS: f64 = 0.05;
/// Radiance shot fraction (electric)
const RADIANCE_FRACTION: f64 = 0.80;

#[derive(Debug, Error, PartialEq)]
pub enum CastError {
    #[error("caster {0} is dead or missing")]
    DeadCaster(EntityId),
    #[error("target {0} is dead, missing, or on the wrong side")]
    InvalidTarget(EntityId),
    #[error("target is {distance:.1} tiles away, ability reaches {range:.1}")]
    OutOfRange { distance: f64, range: f64 },
    #[error("cell ({}, {}) is blocked", .0.x, .0.z)]
    BlockedCell(Position),
}

/// Position, faction, and attack of a living entity
fn caster_stats(world: &World, caster: EntityId) -> Result<(Position, Faction, f64), CastError> {
    world
        .entity(caster)
        .filter(|e| e.alive)
        .map(|e| (e.position, e.faction, e.attack_power))
        .ok_or(CastError::DeadCaster(caster))
}

fn check_range(from: Position, to: Position, range: f64) -> Result<(), CastError> {
    let distance = from.distance_to(to);
    if distance > range {
        return Err(CastError::OutOfRange { distance, range });
    }
    Ok(())
}

/// A living target on the required side of the caster
fn validate_target(
    world: &World,
    caster_faction: Faction,
    target: EntityId,
    want_hostile: bool,
) -> Result<Position, CastError> {
    let entity = world
        .entity(target)
        .filter(|e| e.alive)
        .ok_or(CastError::InvalidTarget(target))?;
    let side_ok = if want_hostile {
        entity.faction.hostile_to(caster_faction)
    } else {
        entity.faction.allied_with(caster_faction)
    };
    if !side_ok {
        return Err(CastError::InvalidTarget(target));
    }
    Ok(entity.position)
}

/// Execute shot: 160% attack, and if the target carries at least six Rend
/// stacks, six are consumed for a further +120%. The target's pre-cast Rend
/// count then spreads as Gash to every other Rend carrier near where the
/// target stood (position captured before the hit, which may kill and
/// relocate nothing but does invalidate the target's transform).
pub fn cast_no_survivors(
    world: &mut World,
    caster: EntityId,
    target: EntityId,
) -> Result<DamageOutcome, CastError> {
    let (caster_pos, caster_faction, attack) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, true)?;
    check_range(caster_pos, target_pos, EXECUTE_RANGE)?;

    let pre_rend = world.entity(target).map(|e| e.effects.stacks(EffectKind::Rend)).unwrap_or(0);
    let mut amount = attack * EXECUTE_FRACTION;
    if pre_rend >= EXECUTE_REND_THRESHOLD {
        if let Some(entity) = world.entity_mut(target) {
            entity.effects.consume_stacks(EffectKind::Rend, EXECUTE_REND_THRESHOLD);
        }
        amount *= 1.0 + EXECUTE_BONUS;
        tracing::debug!(target = %target, "execute threshold met");
    }

    let outcome = world.apply_damage(DamageEvent::new(target, amount, DamageKind::Physical, Some(caster)));

    if pre_rend > 0 {
        let carriers: Vec<EntityId> = world
            .living()
            .filter(|e| {
                e.id != target
                    && e.faction.hostile_to(caster_faction)
                    && e.effects.contains(EffectKind::Rend)
                    && e.position.distance_to(target_pos) <= GASH_SPREAD_RADIUS
            })
            .map(|e| e.id)
            .collect();
        for id in carriers {
            world.apply_effect(id, EffectKind::Gash, Some(caster), pre_rend);
        }
    }

    Ok(outcome)
}

/// Shield an ally (or the caster)
pub fn cast_frost_barrier(world: &mut World, caster: EntityId, target: EntityId) -> Result<(), CastError> {
    let (caster_pos, caster_faction, _) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, false)?;
    check_range(caster_pos, target_pos, SUPPORT_RANGE)?;

    world.apply_effect(target, EffectKind::FrostBarrier, Some(caster), 1);
    Ok(())
}

/// Summon a turret at an open cell near the caster
pub fn cast_gentle_offensive(
    world: &mut World,
    caster: EntityId,
    cell: Position,
) -> Result<TurretId, CastError> {
    let (caster_pos, _, _) = caster_stats(world, caster)?;
    check_range(caster_pos, cell, SUMMON_RANGE)?;
    if world.cell_blocked(cell) {
        return Err(CastError::BlockedCell(cell));
    }
    world.summon_turret(caster, cell).ok_or(CastError::DeadCaster(caster))
}

/// Corrosion burst around a point: 120% attack to every hostile in range,
/// survivors are infected. Returns how many entities were hit.
pub fn cast_corrosion_burst(
    world: &mut World,
    caster: EntityId,
    center: Position,
) -> Result<usize, CastError> {
    let (caster_pos, caster_faction, attack) = caster_stats(world, caster)?;
    check_range(caster_pos, center, BURST_RANGE)?;

    // Hostility filter runs before any damage; the hit list must not shift
    // under the iteration when someone dies mid-burst
    let victims: Vec<EntityId> = world
        .living()
        .filter(|e| e.faction.hostile_to(caster_faction))
        .filter(|e| e.position.distance_to(center) <= BURST_RADIUS)
        .map(|e| e.id)
        .collect();

    let amount = attack * BURST_FRACTION;
    let hit = victims.len();
    for id in victims {
        let outcome = world.apply_damage(DamageEvent::new(id, amount, DamageKind::Corrosion, Some(caster)));
        if !outcome.killing_blow {
            world.apply_effect(id, EffectKind::ToxicInfiltration, Some(caster), 1);
        }
    }
    Ok(hit)
}

/// Mark a hostile with the tracker; the caster's attack is snapshotted into
/// the mark for counterattack scaling.
pub fn cast_target_victory(world: &mut World, caster: EntityId, target: EntityId) -> Result<(), CastError> {
    let (caster_pos, caster_faction, _) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, true)?;
    check_range(caster_pos, target_pos, MARK_RANGE)?;

    world.apply_effect(target, EffectKind::TaryzTracker, Some(caster), 1);
    Ok(())
}

/// Firelight shot: a plain fire hit that builds one momentum point on the
/// caster whenever it actually lands.
pub fn cast_fissioned_firelight(
    world: &mut World,
    caster: EntityId,
    target: EntityId,
) -> Result<DamageOutcome, CastError> {
    let (caster_pos, caster_faction, attack) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, true)?;
    check_range(caster_pos, target_pos, EXECUTE_RANGE)?;

    let outcome = world.apply_damage(DamageEvent::new(
        target,
        attack * FIRELIGHT_FRACTION,
        DamageKind::Fire,
        Some(caster),
    ));
    if outcome.final_amount > 0.0 {
        world.apply_effect(caster, EffectKind::ConfectanceIndex, Some(caster), 1);
    }
    Ok(outcome)
}

/// Boil-and-reduce: vents every momentum point the caster holds into a fire
/// burst, +5% damage per point spent. Survivors are left scorched. Returns
/// how many entities were hit.
///
/// Momentum is only consumed after validation passes; a rejected cast keeps
/// the counter intact.
pub fn cast_boil_and_reduce(
    world: &mut World,
    caster: EntityId,
    center: Position,
) -> Result<usize, CastError> {
    let (caster_pos, caster_faction, attack) = caster_stats(world, caster)?;
    check_range(caster_pos, center, BURST_RANGE)?;

    let points = world
        .entity_mut(caster)
        .map(|e| e.effects.consume_all(EffectKind::ConfectanceIndex))
        .unwrap_or(0);
    let amount = attack * BOIL_FRACTION * (1.0 + MOMENTUM_BONUS * points as f64);
    if points > 0 {
        tracing::debug!(caster = %caster, points, "momentum vented");
    }

    let victims: Vec<EntityId> = world
        .living()
        .filter(|e| e.faction.hostile_to(caster_faction))
        .filter(|e| e.position.distance_to(center) <= BOIL_RADIUS)
        .map(|e| e.id)
        .collect();

    let hit = victims.len();
    for id in victims {
        let outcome = world.apply_damage(DamageEvent::new(id, amount, DamageKind::Fire, Some(caster)));
        if !outcome.killing_blow {
            world.apply_effect(id, EffectKind::ScorchMark, Some(caster), 1);
        }
    }
    Ok(hit)
}

/// Radiance shot: electric damage that leaves the target charged, so later
/// electric hits arc between charged targets.
pub fn cast_radiance(
    world: &mut World,
    caster: EntityId,
    target: EntityId,
) -> Result<DamageOutcome, CastError> {
    let (caster_pos, caster_faction, attack) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, true)?;
    check_range(caster_pos, target_pos, EXECUTE_RANGE)?;

    let outcome = world.apply_damage(DamageEvent::new(
        target,
        attack * RADIANCE_FRACTION,
        DamageKind::Electric,
        Some(caster),
    ));
    if !outcome.killing_blow {
        world.apply_effect(target, EffectKind::NegativeCharge, Some(caster), 1);
    }
    Ok(outcome)
}

/// Brace an ally (or the caster): incoming damage is reduced while the
/// stance holds.
pub fn cast_fortified_stance(world: &mut World, caster: EntityId, target: EntityId) -> Result<(), CastError> {
    let (caster_pos, caster_faction, _) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, false)?;
    check_range(caster_pos, target_pos, SUPPORT_RANGE)?;

    world.apply_effect(target, EffectKind::FortifiedStance, Some(caster), 1);
    Ok(())
}

/// Bond an ally: heals them when the bond runs out
pub fn cast_path_of_bonds(world: &mut World, caster: EntityId, target: EntityId) -> Result<(), CastError> {
    let (caster_pos, caster_faction, _) = caster_stats(world, caster)?;
    let target_pos = validate_target(world, caster_faction, target, false)?;
    check_range(caster_pos, target_pos, SUPPORT_RANGE)?;

    world.apply_effect(target, EffectKind::DeepRootedBonds, Some(caster), 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectRegistry;

    fn world() -> World {
        World::with_seed(EffectRegistry::with_defaults(), 7)
    }

    fn duel() -> (World, EntityId, EntityId) {
        let mut world = world();
        let caster = world.spawn("operative", Faction::Player, Position::new(0, 0), 200.0, 100.0, 0.0);
        let enemy = world.spawn("raider", Faction::Hostile, Position::new(5, 0), 600.0, 40.0, 0.0);
        (world, caster, enemy)
    }

    #[test]
    fn test_execute_without_stacks() {
        let (mut world, caster, enemy) = duel();
        let outcome = cast_no_survivors(&mut world, caster, enemy).unwrap();
        assert!((outcome.final_amount - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_execute_threshold_scenario() {
        let (mut world, caster, enemy) = duel();
        world.apply_effect(enemy, EffectKind::Rend, Some(caster), 6);

        let outcome = cast_no_survivors(&mut world, caster, enemy).unwrap();
        // Stacks are spent before the hit, so the vulnerability multiplier
        // never sees them: 100 * 1.6 * 2.2
        assert!((outcome.final_amount - 352.0).abs() < 1e-9);
        assert_eq!(world.entity(enemy).unwrap().effects.stacks(EffectKind::Rend), 0);
    }

    #[test]
    fn test_execute_below_threshold_keeps_stacks() {
        let (mut world, caster, enemy) = duel();
        world.apply_effect(enemy, EffectKind::Rend, Some(caster), 5);

        let outcome = cast_no_survivors(&mut world, caster, enemy).unwrap();
        // 5 stacks stay and amplify instead: 160 * (1 + 5 * 0.30)
        assert!((outcome.final_amount - 400.0).abs() < 1e-9);
        assert_eq!(world.entity(enemy).unwrap().effects.stacks(EffectKind::Rend), 5);
    }

    #[test]
    fn test_execute_spreads_gash_to_other_carriers() {
        let (mut world, caster, enemy) = duel();
        let near = world.spawn("raider b", Faction::Hostile, Position::new(7, 0), 600.0, 40.0, 0.0);
        let far = world.spawn("raider c", Faction::Hostile, Position::new(30, 0), 600.0, 40.0, 0.0);
        let unmarked = world.spawn("raider d", Faction::Hostile, Position::new(6, 0), 600.0, 40.0, 0.0);
        world.apply_effect(enemy, EffectKind::Rend, Some(caster), 4);
        world.apply_effect(near, EffectKind::Rend, Some(caster), 1);
        world.apply_effect(far, EffectKind::Rend, Some(caster), 1);

        cast_no_survivors(&mut world, caster, enemy).unwrap();
        assert_eq!(world.entity(near).unwrap().effects.stacks(EffectKind::Gash), 4);
        assert_eq!(world.entity(far).unwrap().effects.stacks(EffectKind::Gash), 0, "outside spread radius");
        assert_eq!(world.entity(unmarked).unwrap().effects.stacks(EffectKind::Gash), 0, "no Rend, no spread");
        assert_eq!(world.entity(enemy).unwrap().effects.stacks(EffectKind::Gash), 0, "target itself excluded");
    }

    #[test]
    fn test_execute_rejects_ally_target() {
        let (mut world, caster, _) = duel();
        let ally = world.spawn("scout", Faction::Player, Position::new(1, 0), 200.0, 20.0, 0.0);
        assert_eq!(cast_no_survivors(&mut world, caster, ally), Err(CastError::InvalidTarget(ally)));
        assert!((world.entity(ally).unwrap().current_hp - 200.0).abs() < f64::EPSILON, "rejected cast mutates nothing");
    }

    #[test]
    fn test_execute_rejects_out_of_range() {
        let (mut world, caster, _) = duel();
        let distant = world.spawn("raider z", Faction::Hostile, Position::new(50, 0), 600.0, 40.0, 0.0);
        assert!(matches!(
            cast_no_survivors(&mut world, caster, distant),
            Err(CastError::OutOfRange { .. })
        ));
        assert!((world.entity(distant).unwrap().current_hp - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_execute_rejects_dead_caster() {
        let (mut world, caster, enemy) = duel();
        world.apply_damage(DamageEvent::new(caster, 9999.0, DamageKind::Physical, Some(enemy)));
        assert_eq!(cast_no_survivors(&mut world, caster, enemy), Err(CastError::DeadCaster(caster)));
    }

    #[test]
    fn test_frost_barrier_targets_allies_only() {
        let (mut world, caster, enemy) = duel();
        assert_eq!(cast_frost_barrier(&mut world, caster, enemy), Err(CastError::InvalidTarget(enemy)));

        cast_frost_barrier(&mut world, caster, caster).unwrap();
        assert!(world.entity(caster).unwrap().effects.contains(EffectKind::FrostBarrier));
    }

    #[test]
    fn test_summon_rejects_blocked_cell() {
        let (mut world, caster, _) = duel();
        let cell = Position::new(2, 0);
        world.obstacles.insert(cell);
        assert_eq!(cast_gentle_offensive(&mut world, caster, cell), Err(CastError::BlockedCell(cell)));

        let open = Position::new(3, 0);
        let id = cast_gentle_offensive(&mut world, caster, open).unwrap();
        assert_eq!(world.turrets.get(id).unwrap().position, open);
    }

    #[test]
    fn test_corrosion_burst_hits_hostiles_only() {
        let (mut world, caster, enemy) = duel();
        let ally = world.spawn("scout", Faction::Player, Position::new(5, 1), 200.0, 20.0, 0.0);
        let hit = cast_corrosion_burst(&mut world, caster, Position::new(5, 0)).unwrap();

        assert_eq!(hit, 1);
        assert!((world.entity(enemy).unwrap().current_hp - 480.0).abs() < 1e-9, "120 corrosion dealt");
        assert!((world.entity(ally).unwrap().current_hp - 200.0).abs() < f64::EPSILON);
        assert!(world.entity(enemy).unwrap().effects.contains(EffectKind::ToxicInfiltration));
    }

    #[test]
    fn test_corrosion_burst_does_not_infect_the_dead() {
        let (mut world, caster, _) = duel();
        let frail = world.spawn("raider f", Faction::Hostile, Position::new(6, 0), 50.0, 10.0, 0.0);
        cast_corrosion_burst(&mut world, caster, Position::new(6, 0)).unwrap();

        let frail_ref = world.entity(frail).unwrap();
        assert!(!frail_ref.alive);
        assert!(!frail_ref.effects.contains(EffectKind::ToxicInfiltration));
    }

    #[test]
    fn test_target_victory_snapshots_attack() {
        let (mut world, caster, enemy) = duel();
        cast_target_victory(&mut world, caster, enemy).unwrap();

        let mark = world.entity(enemy).unwrap().effects.get(EffectKind::TaryzTracker).unwrap();
        assert_eq!(mark.source, Some(caster));
        assert!((mark.source_attack - 100.0).abs() < f64::EPSILON);

        // Later stat changes must not affect the snapshot
        world.entity_mut(caster).unwrap().attack_power = 999.0;
        let mark = world.entity(enemy).unwrap().effects.get(EffectKind::TaryzTracker).unwrap();
        assert!((mark.source_attack - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_firelight_builds_momentum_per_landed_hit() {
        let (mut world, caster, enemy) = duel();
        cast_fissioned_firelight(&mut world, caster, enemy).unwrap();
        cast_fissioned_firelight(&mut world, caster, enemy).unwrap();

        assert!((world.entity(enemy).unwrap().current_hp - 400.0).abs() < 1e-9);
        assert_eq!(world.entity(caster).unwrap().effects.stacks(EffectKind::ConfectanceIndex), 2);
    }

    #[test]
    fn test_firelight_absorbed_hit_grants_nothing() {
        let (mut world, caster, enemy) = duel();
        let rival = world.spawn("rival", Faction::Hostile, Position::new(6, 0), 300.0, 200.0, 0.0);
        world.apply_effect(enemy, EffectKind::FrostBarrier, Some(rival), 1);
        world.entity_mut(enemy).unwrap().effects.get_mut(EffectKind::FrostBarrier).unwrap().shield_points = 500.0;

        cast_fissioned_firelight(&mut world, caster, enemy).unwrap();
        assert_eq!(world.entity(caster).unwrap().effects.stacks(EffectKind::ConfectanceIndex), 0);
    }

    #[test]
    fn test_boil_spends_momentum_and_scales() {
        let (mut world, caster, enemy) = duel();
        world.apply_effect(caster, EffectKind::ConfectanceIndex, Some(caster), 4);

        let hit = cast_boil_and_reduce(&mut world, caster, Position::new(5, 0)).unwrap();
        assert_eq!(hit, 1);
        // 100 * (1 + 4 * 0.05) = 120 fire
        assert!((world.entity(enemy).unwrap().current_hp - 480.0).abs() < 1e-9);
        assert_eq!(world.entity(caster).unwrap().effects.stacks(EffectKind::ConfectanceIndex), 0, "every point spent");
        assert_eq!(world.entity(enemy).unwrap().effects.stacks(EffectKind::ScorchMark), 1);
    }

    #[test]
    fn test_boil_without_momentum_is_unscaled() {
        let (mut world, caster, enemy) = duel();
        cast_boil_and_reduce(&mut world, caster, Position::new(5, 0)).unwrap();
        assert!((world.entity(enemy).unwrap().current_hp - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_boil_rejection_keeps_momentum() {
        let (mut world, caster, _) = duel();
        world.apply_effect(caster, EffectKind::ConfectanceIndex, Some(caster), 3);

        assert!(matches!(
            cast_boil_and_reduce(&mut world, caster, Position::new(99, 0)),
            Err(CastError::OutOfRange { .. })
        ));
        assert_eq!(world.entity(caster).unwrap().effects.stacks(EffectKind::ConfectanceIndex), 3);
    }

    #[test]
    fn test_boil_does_not_scorch_the_dead() {
        let (mut world, caster, _) = duel();
        let frail = world.spawn("raider f", Faction::Hostile, Position::new(6, 0), 80.0, 10.0, 0.0);
        cast_boil_and_reduce(&mut world, caster, Position::new(6, 0)).unwrap();

        let frail_ref = world.entity(frail).unwrap();
        assert!(!frail_ref.alive);
        assert!(!frail_ref.effects.contains(EffectKind::ScorchMark));
    }

    #[test]
    fn test_radiance_charges_then_arcs() {
        let (mut world, caster, a) = duel();
        let b = world.spawn("raider b", Faction::Hostile, Position::new(7, 0), 600.0, 40.0, 0.0);

        cast_radiance(&mut world, caster, a).unwrap();
        cast_radiance(&mut world, caster, b).unwrap();
        // First hits charge without arcing (the charge lands after the hit)
        assert!((world.entity(a).unwrap().current_hp - 520.0).abs() < 1e-9);
        assert!((world.entity(b).unwrap().current_hp - 520.0).abs() < 1e-9);

        // Third shot arcs 30% of 80 to the other charged target
        cast_radiance(&mut world, caster, a).unwrap();
        assert!((world.entity(a).unwrap().current_hp - 440.0).abs() < 1e-9);
        assert!((world.entity(b).unwrap().current_hp - 496.0).abs() < 1e-9);
    }

    #[test]
    fn test_fortified_stance_blunts_incoming() {
        let (mut world, caster, enemy) = duel();
        cast_fortified_stance(&mut world, caster, caster).unwrap();

        world.apply_damage(DamageEvent::new(caster, 100.0, DamageKind::Physical, Some(enemy)));
        assert!((world.entity(caster).unwrap().current_hp - 120.0).abs() < 1e-9);
        assert_eq!(cast_fortified_stance(&mut world, caster, enemy), Err(CastError::InvalidTarget(enemy)));
    }

    #[test]
    fn test_path_of_bonds_applies_to_ally() {
        let (mut world, caster, _) = duel();
        let ally = world.spawn("scout", Faction::Player, Position::new(1, 0), 200.0, 20.0, 0.0);
        cast_path_of_bonds(&mut world, caster, ally).unwrap();
        assert!(world.entity(ally).unwrap().effects.contains(EffectKind::DeepRootedBonds));
    }
}
