//! Transient damage event and its resolved outcome

use crate::types::{DamageKind, EntityId};
use serde::{Deserialize, Serialize};

/// A damage application in flight.
///
/// Created when a damage source resolves, mutated by the pre-damage hooks,
/// consumed exactly once by the health deduction, then discarded.
#[derive(Debug, Clone)]
pub struct DamageEvent {
    /// Current amount; pre-damage hooks rewrite this in place
    pub amount: f64,
    pub kind: DamageKind,
    /// Who caused the damage (attribution, may be dead or despawned)
    pub instigator: Option<EntityId>,
    pub target: EntityId,
}

impl DamageEvent {
    pub fn new(target: EntityId, amount: f64, kind: DamageKind, instigator: Option<EntityId>) -> Self {
        DamageEvent {
            amount,
            kind,
            instigator,
            target,
        }
    }
}

/// What one damage application actually did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// Amount before any interception
    pub raw_amount: f64,
    /// Amount soaked by a shield effect
    pub absorbed_by_shield: f64,
    /// Whether a shield broke on this hit (fires at most once per shield)
    pub shield_broken: bool,
    /// Combined multiplier from reduction and vulnerability hooks
    pub multiplier: f64,
    /// Amount removed by armor after the hooks ran
    pub mitigated_by_armor: f64,
    /// Amount actually deducted from health
    pub final_amount: f64,
    pub killing_blow: bool,
}

impl DamageOutcome {
    pub fn new(raw_amount: f64) -> Self {
        DamageOutcome {
            raw_amount,
            multiplier: 1.0,
            ..Default::default()
        }
    }

    /// No-op outcome for damage against a dead or missing target
    pub fn none() -> Self {
        DamageOutcome::new(0.0)
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{:.0} dealt", self.final_amount)];
        if self.absorbed_by_shield > 0.0 {
            parts.push(format!("{:.0} absorbed", self.absorbed_by_shield));
        }
        if self.shield_broken {
            parts.push("shield broken".to_string());
        }
        if self.mitigated_by_armor > 0.0 {
            parts.push(format!("{:.0} mitigated", self.mitigated_by_armor));
        }
        if self.killing_blow {
            parts.push("FATAL".to_string());
        }
        parts.join(", ")
    }
}
