//! World state and the simulation loop
//!
//! The world owns every entity, turret, active effect, and the deferred
//! action queue, and drives them all from `tick`. Entity iteration is always
//! in id order (`BTreeMap`), so a given seed and script replay identically.

mod entity;

pub use entity::Entity;

use crate::combat::{apply_armor, run_pre_damage_hooks, DamageEvent, DamageOutcome};
use crate::effect::{ApplyResult, EffectInstance, EffectKind, EffectRegistry};
use crate::queue::{DeferredAction, DeferredQueue, CHAIN_EXPLOSION_CAP};
use crate::turret::{DestroyReason, InheritedStats, TurretRoster};
use crate::types::{DamageKind, EntityId, Faction, Position, TurretId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Recursion cap for damage triggered by other damage
const MAX_DAMAGE_DEPTH: u32 = 4;

/// Fraction of the snapshotted attack dealt by a chain explosion
const CHAIN_DAMAGE_FRACTION: f64 = 0.30;

fn default_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    pub turrets: TurretRoster,
    deferred: DeferredQueue,
    pub registry: EffectRegistry,
    pub obstacles: BTreeSet<Position>,
    pub tick: u64,
    next_id: u32,
    /// Not part of saved state; reseed after load for replays
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
    /// Visited set of the chain currently being drained, if any.
    /// Transient by construction: drains never cross a tick boundary.
    #[serde(skip)]
    active_chain_visited: Option<BTreeSet<Position>>,
}

impl World {
    pub fn new(registry: EffectRegistry) -> Self {
        Self::with_seed(registry, 0)
    }

    pub fn with_seed(registry: EffectRegistry, seed: u64) -> Self {
        World {
            entities: BTreeMap::new(),
            turrets: TurretRoster::new(),
            deferred: DeferredQueue::new(),
            registry,
            obstacles: BTreeSet::new(),
            tick: 0,
            next_id: 0,
            rng: StdRng::seed_from_u64(seed),
            active_chain_visited: None,
        }
    }

    /// Reseed the RNG, for deterministic replay after a load
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // --- entities ---

    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        faction: Faction,
        position: Position,
        max_hp: f64,
        attack_power: f64,
        armor: f64,
    ) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities
            .insert(id, Entity::new(id, name, faction, position, max_hp, attack_power, armor));
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// All entities, dead ones included, in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn living(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.alive)
    }

    /// Living entities within `radius` of `center`, in id order
    pub fn entities_in_radius(&self, center: Position, radius: f64) -> Vec<EntityId> {
        self.living()
            .filter(|e| e.position.distance_to(center) <= radius)
            .map(|e| e.id)
            .collect()
    }

    /// Whether a cell is unusable for placement (obstacle or occupied)
    pub fn cell_blocked(&self, position: Position) -> bool {
        self.obstacles.contains(&position)
            || self.living().any(|e| e.position == position)
            || self.turrets.iter().any(|t| t.position == position)
    }

    // --- effects ---

    /// Apply an effect, snapshotting the source's current attack power.
    /// Unregistered kinds and dead targets are skipped with a warning.
    pub fn apply_effect(
        &mut self,
        target: EntityId,
        kind: EffectKind,
        source: Option<EntityId>,
        stacks: u32,
    ) -> Option<ApplyResult> {
        let attack = source
            .and_then(|id| self.entities.get(&id))
            .map(|e| e.attack_power)
            .unwrap_or(0.0);
        self.apply_effect_snapshot(target, kind, source, attack, stacks)
    }

    /// Apply an effect with an explicit attack snapshot (used when the
    /// source is already gone and its power was captured earlier).
    pub fn apply_effect_snapshot(
        &mut self,
        target: EntityId,
        kind: EffectKind,
        source: Option<EntityId>,
        source_attack: f64,
        stacks: u32,
    ) -> Option<ApplyResult> {
        let def = self.registry.get(kind)?.clone();
        let entity = self.entities.get_mut(&target)?;
        if !entity.alive {
            tracing::warn!(target = %target, kind = kind.name(), "effect on dead target skipped");
            return None;
        }
        let result = entity.effects.apply(&def, source, source_attack, stacks);
        tracing::debug!(target = %target, kind = kind.name(), ?result, "effect applied");
        Some(result)
    }

    /// Remove an effect and run its on-remove consequences exactly once.
    /// Removing an absent kind is a no-op.
    pub fn remove_effect(&mut self, target: EntityId, kind: EffectKind) {
        let Some(entity) = self.entities.get_mut(&target) else {
            return;
        };
        let Some(_removed) = entity.effects.remove(kind) else {
            return;
        };
        if let Some(def) = self.registry.get(kind) {
            let heal = def.heal_on_expire;
            if heal > 0.0 {
                self.heal(target, heal);
            }
        }
        tracing::debug!(target = %target, kind = kind.name(), "effect removed");
    }

    pub fn heal(&mut self, target: EntityId, amount: f64) -> f64 {
        let Some(entity) = self.entities.get_mut(&target) else {
            return 0.0;
        };
        if !entity.alive || amount <= 0.0 {
            return 0.0;
        }
        let healed = amount.min(entity.max_hp - entity.current_hp);
        entity.current_hp += healed;
        healed
    }

    // --- damage ---

    /// Resolve one damage event against its target: pre-damage hooks, armor,
    /// health deduction, then post hooks (splash, counterattack, death).
    pub fn apply_damage(&mut self, event: DamageEvent) -> DamageOutcome {
        self.apply_damage_inner(event, 0)
    }

    fn apply_damage_inner(&mut self, mut event: DamageEvent, depth: u32) -> DamageOutcome {
        if depth >= MAX_DAMAGE_DEPTH {
            tracing::warn!(target = %event.target, "damage recursion cap hit, dropping event");
            return DamageOutcome::none();
        }

        let mut outcome = DamageOutcome::new(event.amount);
        let target_pos;
        let had_negative_charge;
        {
            let World { entities, registry, .. } = self;
            let Some(target) = entities.get_mut(&event.target) else {
                return DamageOutcome::none();
            };
            if !target.alive {
                return DamageOutcome::none();
            }
            target_pos = target.position;

            let report = run_pre_damage_hooks(&mut target.effects, registry, &mut event);
            outcome.absorbed_by_shield = report.absorbed_by_shield;
            outcome.shield_broken = report.shield_broken;
            outcome.multiplier = report.multiplier;

            let through = apply_armor(target.armor, event.amount);
            outcome.mitigated_by_armor = event.amount - through;
            outcome.final_amount = through;

            target.current_hp -= through;
            had_negative_charge = target.effects.contains(EffectKind::NegativeCharge);
            if target.current_hp <= 0.0 {
                outcome.killing_blow = true;
            }
        }

        tracing::debug!(
            target = %event.target,
            kind = ?event.kind,
            amount = outcome.final_amount,
            "damage resolved"
        );

        if outcome.killing_blow {
            self.handle_death(event.target);
        }

        // Post hooks run only for direct hits that landed, never for
        // damage they create
        if depth == 0 && outcome.final_amount > 0.0 {
            if event.kind == DamageKind::Electric && had_negative_charge {
                self.splash_negative_charge(&event, target_pos, outcome.final_amount, depth);
            }
            self.counterattack_if_marked(&event, depth);
        }

        outcome
    }

    /// Negative Charge: a share of electric damage taken jumps to every
    /// other charged entity in range.
    fn splash_negative_charge(&mut self, event: &DamageEvent, origin: Position, dealt: f64, depth: u32) {
        let Some(def) = self.registry.get(EffectKind::NegativeCharge) else {
            return;
        };
        let amount = dealt * def.splash_fraction;
        let radius = def.aoe_radius;
        if amount <= 0.0 {
            return;
        }
        let targets: Vec<EntityId> = self
            .living()
            .filter(|e| {
                e.id != event.target
                    && e.effects.contains(EffectKind::NegativeCharge)
                    && e.position.distance_to(origin) <= radius
            })
            .map(|e| e.id)
            .collect();
        for id in targets {
            tracing::debug!(from = %event.target, to = %id, amount, "charge splash");
            self.apply_damage_inner(
                DamageEvent::new(id, amount, DamageKind::Electric, event.instigator),
                depth + 1,
            );
        }
    }

    /// Taryz tracker: when a marked entity damages an ally of the mark's
    /// caster, the mark strikes back at the marked entity and mends the
    /// victim.
    fn counterattack_if_marked(&mut self, event: &DamageEvent, depth: u32) {
        let Some(instigator_id) = event.instigator else {
            return;
        };
        let Some(mark) = self
            .entities
            .get(&instigator_id)
            .filter(|e| e.alive)
            .and_then(|e| e.effects.get(EffectKind::TaryzTracker))
            .cloned()
        else {
            return;
        };
        let Some(caster_faction) = mark
            .source
            .and_then(|id| self.entities.get(&id))
            .map(|e| e.faction)
        else {
            return;
        };
        let victim_allied = self
            .entities
            .get(&event.target)
            .map(|e| e.faction.allied_with(caster_faction))
            .unwrap_or(false);
        if !victim_allied {
            return;
        }

        let counter = self.rng.gen_range(10.0..=20.0) * mark.source_attack / 20.0;
        tracing::debug!(marked = %instigator_id, amount = counter, "tracker counterattack");
        self.apply_damage_inner(
            DamageEvent::new(instigator_id, counter, DamageKind::Hydro, mark.source),
            depth + 1,
        );
        self.heal(event.target, mark.source_attack * 0.3);
    }

    fn handle_death(&mut self, id: EntityId) {
        let (position, faction, toxic, mark) = {
            let Some(entity) = self.entities.get_mut(&id) else {
                return;
            };
            entity.alive = false;
            entity.current_hp = 0.0;
            let toxic = entity.effects.get(EffectKind::ToxicInfiltration).cloned();
            let mark = entity.effects.get(EffectKind::TaryzTracker).cloned();
            // Dead entities carry no effects; on-remove consequences do not
            // fire for them (there is nothing left to heal or protect)
            entity.effects = Default::default();
            (entity.position, entity.faction, toxic, mark)
        };
        tracing::info!(entity = %id, "entity died");

        if let Some(toxic) = toxic {
            self.enqueue_chain_explosion(position, faction, &toxic);
        }
        if let Some(mark) = mark {
            self.retarget_tracker(&mark);
        }

        // A dead summoner's turrets despawn without granting anything
        let orphaned = self.turrets.remove_for_summoner(id);
        if !orphaned.is_empty() {
            tracing::debug!(summoner = %id, count = orphaned.len(), "orphaned turrets despawned");
        }
    }

    /// Queue the corrosion burst for a dead Toxic Infiltration carrier.
    /// Positions already detonated by the active chain never re-explode,
    /// and one chain spawns at most `CHAIN_EXPLOSION_CAP` secondaries.
    fn enqueue_chain_explosion(&mut self, position: Position, victim_faction: Faction, toxic: &EffectInstance) {
        let visited = self.active_chain_visited.clone().unwrap_or_default();
        if visited.contains(&position) {
            tracing::debug!(?position, "chain already detonated here, skipping");
            return;
        }
        if visited.len() >= CHAIN_EXPLOSION_CAP {
            tracing::debug!(?position, "chain explosion cap reached, skipping");
            return;
        }
        // Sibling carriers dying on the same tile in one tick fold into a
        // single detonation
        let already_pending = self.deferred.iter().any(|action| {
            let DeferredAction::ChainExplosion { position: pending, .. } = action;
            *pending == position
        });
        if already_pending {
            tracing::debug!(?position, "explosion already pending here, folding");
            return;
        }
        let attacker_faction = toxic
            .source
            .and_then(|id| self.entities.get(&id))
            .map(|e| e.faction)
            .unwrap_or(match victim_faction {
                Faction::Hostile => Faction::Player,
                _ => Faction::Hostile,
            });
        self.deferred.enqueue(DeferredAction::ChainExplosion {
            position,
            attacker: toxic.source,
            attacker_faction,
            attack_power: toxic.source_attack,
            visited,
        });
    }

    /// A dead tracker carrier passes the mark to the healthiest remaining
    /// enemy of the caster.
    fn retarget_tracker(&mut self, mark: &EffectInstance) {
        let Some(caster_faction) = mark
            .source
            .and_then(|id| self.entities.get(&id))
            .filter(|e| e.alive)
            .map(|e| e.faction)
        else {
            return;
        };
        let next = self
            .living()
            .filter(|e| e.faction.hostile_to(caster_faction))
            .max_by(|a, b| {
                a.current_hp
                    .partial_cmp(&b.current_hp)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.id.cmp(&a.id))
            })
            .map(|e| e.id);
        if let Some(next) = next {
            tracing::debug!(next = %next, "tracker retargeted");
            self.apply_effect_snapshot(next, EffectKind::TaryzTracker, mark.source, mark.source_attack, 1);
        }
    }

    // --- turrets ---

    /// Summon a turret with stats frozen from the summoner. Evicts the
    /// summoner's oldest turret past the cap; eviction counts as a
    /// destruction and grants momentum like any other.
    pub fn summon_turret(&mut self, summoner: EntityId, position: Position) -> Option<TurretId> {
        let inherited = {
            let entity = self.entities.get(&summoner).filter(|e| e.alive)?;
            InheritedStats::from_summoner(entity.max_hp, entity.attack_power, entity.armor)
        };
        let (id, evicted) = self.turrets.summon(summoner, position, self.tick, inherited);
        if evicted.is_some() {
            self.grant_confectance(summoner);
        }
        Some(id)
    }

    pub fn damage_turret(&mut self, id: TurretId, amount: f64) {
        let destroyed = {
            let Some(turret) = self.turrets.get_mut(id) else {
                return;
            };
            turret.hit_points -= apply_armor(turret.inherited.armor, amount);
            turret.is_destroyed()
        };
        if destroyed {
            if let Some(turret) = self.turrets.destroy(id, DestroyReason::Killed) {
                self.grant_confectance(turret.summoner);
            }
        }
    }

    /// Every turret destruction feeds the summoner's momentum counter,
    /// as long as the summoner still lives.
    fn grant_confectance(&mut self, summoner: EntityId) {
        if self.entities.get(&summoner).map(|e| e.alive).unwrap_or(false) {
            self.apply_effect(summoner, EffectKind::ConfectanceIndex, Some(summoner), 1);
        }
    }

    // --- simulation loop ---

    /// Advance the world one tick: drain last tick's deferred actions, then
    /// run every entity's effect timers, periodic behaviors, and expiries in
    /// id order.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        self.drain_deferred();
        self.run_effect_phase();
    }

    fn drain_deferred(&mut self) {
        for action in self.deferred.take_batch() {
            match action {
                DeferredAction::ChainExplosion {
                    position,
                    attacker,
                    attacker_faction,
                    attack_power,
                    visited,
                } => self.execute_chain_explosion(position, attacker, attacker_faction, attack_power, visited),
            }
        }
    }

    fn execute_chain_explosion(
        &mut self,
        position: Position,
        attacker: Option<EntityId>,
        attacker_faction: Faction,
        attack_power: f64,
        mut visited: BTreeSet<Position>,
    ) {
        if !visited.insert(position) {
            return;
        }
        let radius = self
            .registry
            .get(EffectKind::ToxicInfiltration)
            .map(|d| d.aoe_radius)
            .unwrap_or(6.0);
        let amount = attack_power * CHAIN_DAMAGE_FRACTION;
        let victims: Vec<EntityId> = self
            .living()
            .filter(|e| e.faction.hostile_to(attacker_faction))
            .filter(|e| e.position.distance_to(position) <= radius)
            .map(|e| e.id)
            .collect();
        tracing::info!(?position, victims = victims.len(), "chain explosion");

        self.active_chain_visited = Some(visited);
        for id in victims {
            let outcome =
                self.apply_damage_inner(DamageEvent::new(id, amount, DamageKind::Corrosion, attacker), 1);
            if !outcome.killing_blow {
                // Survivors are re-infected and can feed the chain later
                self.apply_effect_snapshot(id, EffectKind::ToxicInfiltration, attacker, attack_power, 1);
            }
        }
        self.active_chain_visited = None;
    }

    fn run_effect_phase(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let mut fired: Vec<EffectInstance> = Vec::new();
            let mut expired: Vec<EffectKind> = Vec::new();
            {
                let World { entities, registry, .. } = self;
                let Some(entity) = entities.get_mut(&id) else {
                    continue;
                };
                if !entity.alive {
                    continue;
                }
                for inst in entity.effects.iter_mut() {
                    let Some(def) = registry.get(inst.kind) else {
                        continue;
                    };
                    inst.age_ticks += 1;
                    if def.tick_interval > 0 {
                        inst.tick_counter += 1;
                        if inst.tick_counter >= def.tick_interval {
                            inst.tick_counter = 0;
                            fired.push(inst.clone());
                        }
                    }
                    if inst.expired(def) {
                        expired.push(inst.kind);
                    }
                }
            }
            for inst in fired {
                self.run_periodic(id, &inst);
            }
            for kind in expired {
                self.remove_effect(id, kind);
            }
        }
    }

    fn run_periodic(&mut self, owner: EntityId, inst: &EffectInstance) {
        let Some(def) = self.registry.get(inst.kind).cloned() else {
            return;
        };
        match inst.kind {
            EffectKind::Gash => {
                let amount = inst.source_attack * def.damage_per_stack * inst.stacks as f64;
                self.apply_damage_inner(DamageEvent::new(owner, amount, def.damage_kind, inst.source), 1);
                if let Some(entity) = self.entities.get_mut(&owner) {
                    entity.effects.consume_stacks(inst.kind, def.stacks_consumed_per_interval);
                }
            }
            EffectKind::ScorchMark => {
                // Each stack past the first adds a multiplicative 7%
                let factor = 1.0 + def.damage_per_stack * (inst.stacks.saturating_sub(1)) as f64;
                let amount = inst.source_attack * def.damage_per_stack * factor;
                self.apply_damage_inner(DamageEvent::new(owner, amount, def.damage_kind, inst.source), 1);
            }
            EffectKind::FrostBarrier => {
                self.heal(owner, def.heal_per_interval);
            }
            EffectKind::ToxicInfiltration => {
                self.apply_effect_snapshot(
                    owner,
                    EffectKind::CorrosiveInfusion,
                    inst.source,
                    inst.source_attack,
                    1,
                );
            }
            EffectKind::CorrosiveInfusion => {
                self.corrosion_aura(owner, inst, &def);
            }
            _ => {}
        }
    }

    /// Corrosive Infusion gnaws at its carrier and anything standing next
    /// to it on the carrier's side.
    fn corrosion_aura(&mut self, owner: EntityId, inst: &EffectInstance, def: &crate::effect::EffectDefinition) {
        let Some(center) = self.entities.get(&owner).map(|e| e.position) else {
            return;
        };
        let attacker_faction = inst
            .source
            .and_then(|id| self.entities.get(&id))
            .map(|e| e.faction);
        let owner_faction = self.entities.get(&owner).map(|e| e.faction);
        let amount = inst.source_attack * def.damage_per_stack * inst.stacks as f64;
        let victims: Vec<EntityId> = self
            .living()
            .filter(|e| e.position.distance_to(center) <= def.aoe_radius)
            .filter(|e| match attacker_faction {
                Some(f) => e.faction.hostile_to(f),
                None => owner_faction.map(|f| e.faction == f).unwrap_or(false),
            })
            .map(|e| e.id)
            .collect();
        for id in victims {
            self.apply_damage_inner(DamageEvent::new(id, amount, def.damage_kind, inst.source), 1);
        }
    }
}
