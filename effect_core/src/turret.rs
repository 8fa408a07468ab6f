//! Summoned turrets
//!
//! Turrets are lightweight units owned by a summoner. Their stats are
//! inherited from the summoner at spawn time and never change afterwards,
//! even if the summoner's own stats do. Each summoner keeps at most two
//! turrets alive; summoning a third evicts the oldest.

use crate::types::{EntityId, Position, TurretId};
use serde::{Deserialize, Serialize};

/// How many turrets one summoner may have alive at once
pub const TURRETS_PER_SUMMONER: usize = 2;

/// Stats copied from the summoner at spawn, frozen for the turret's lifetime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InheritedStats {
    pub max_hp: f64,
    pub attack_power: f64,
    pub armor: f64,
}

impl InheritedStats {
    /// Spawn-time snapshot: half the summoner's health and attack, full armor
    pub fn from_summoner(max_hp: f64, attack_power: f64, armor: f64) -> Self {
        InheritedStats {
            max_hp: max_hp * 0.5,
            attack_power: attack_power * 0.5,
            armor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turret {
    pub id: TurretId,
    pub summoner: EntityId,
    pub position: Position,
    /// World tick at spawn; decides eviction order
    pub created_tick: u64,
    pub hit_points: f64,
    pub inherited: InheritedStats,
}

impl Turret {
    pub fn is_destroyed(&self) -> bool {
        self.hit_points <= 0.0
    }
}

/// Why a turret left the roster. Every variant grants the summoner momentum;
/// the distinction is for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Reduced to zero hit points
    Killed,
    /// Evicted to make room for a newer turret
    Evicted,
    /// Timed out or otherwise despawned
    Despawned,
}

/// All live turrets in a world, in spawn order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurretRoster {
    turrets: Vec<Turret>,
    next_id: u32,
}

impl TurretRoster {
    pub fn new() -> Self {
        TurretRoster {
            turrets: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.turrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turrets.is_empty()
    }

    pub fn get(&self, id: TurretId) -> Option<&Turret> {
        self.turrets.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TurretId) -> Option<&mut Turret> {
        self.turrets.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turret> {
        self.turrets.iter()
    }

    pub fn owned_by(&self, summoner: EntityId) -> impl Iterator<Item = &Turret> {
        self.turrets.iter().filter(move |t| t.summoner == summoner)
    }

    pub fn count_for(&self, summoner: EntityId) -> usize {
        self.owned_by(summoner).count()
    }

    /// Spawn a turret for a summoner. If the summoner is already at the cap,
    /// its oldest turret is evicted and returned; the caller runs the
    /// destruction consequences (the momentum grant included) for it.
    pub fn summon(
        &mut self,
        summoner: EntityId,
        position: Position,
        tick: u64,
        inherited: InheritedStats,
    ) -> (TurretId, Option<Turret>) {
        let evicted = if self.count_for(summoner) >= TURRETS_PER_SUMMONER {
            let oldest = self
                .turrets
                .iter()
                .enumerate()
                .filter(|(_, t)| t.summoner == summoner)
                .min_by_key(|(_, t)| (t.created_tick, t.id))
                .map(|(idx, _)| idx);
            oldest.map(|idx| self.remove_at(idx, DestroyReason::Evicted))
        } else {
            None
        };

        let id = TurretId(self.next_id);
        self.next_id += 1;
        self.turrets.push(Turret {
            id,
            summoner,
            position,
            created_tick: tick,
            hit_points: inherited.max_hp,
            inherited,
        });
        tracing::debug!(turret = id.0, summoner = %summoner, "turret summoned");

        (id, evicted)
    }

    /// Remove a turret from the roster, returning it for consequence handling
    pub fn destroy(&mut self, id: TurretId, reason: DestroyReason) -> Option<Turret> {
        let idx = self.turrets.iter().position(|t| t.id == id)?;
        Some(self.remove_at(idx, reason))
    }

    /// Remove every turret belonging to a dead summoner, in spawn order.
    /// These despawn without consequences; there is nobody left to reward.
    pub fn remove_for_summoner(&mut self, summoner: EntityId) -> Vec<Turret> {
        let mut gone = Vec::new();
        while let Some(idx) = self.turrets.iter().position(|t| t.summoner == summoner) {
            gone.push(self.remove_at(idx, DestroyReason::Despawned));
        }
        gone
    }

    fn remove_at(&mut self, idx: usize, reason: DestroyReason) -> Turret {
        let turret = self.turrets.remove(idx);
        tracing::debug!(turret = turret.id.0, ?reason, "turret destroyed");
        turret
    }
}
