//! Deferred world actions
//!
//! Side effects that must not run inside the mutation that triggered them
//! (chain explosions fired by a death mid-damage-resolution) are queued here
//! and drained once per tick. Draining snapshots the queue first, so an
//! action enqueued while the batch runs waits for the next tick.

use crate::types::{EntityId, Faction, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Cap on secondary explosions spawned by one chain
pub const CHAIN_EXPLOSION_CAP: usize = 10;

/// An action postponed to the start of a later tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Corrosion burst at a dead carrier's last position.
    ///
    /// Attack power is snapshotted at enqueue time; the attacker entity may
    /// be gone by the time this runs. `visited` carries every position this
    /// chain has already detonated, which is what terminates the chain.
    ChainExplosion {
        position: Position,
        attacker: Option<EntityId>,
        attacker_faction: Faction,
        attack_power: f64,
        visited: BTreeSet<Position>,
    },
}

/// FIFO queue of deferred actions, owned by the world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredQueue {
    pending: Vec<DeferredAction>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        DeferredQueue { pending: Vec::new() }
    }

    pub fn enqueue(&mut self, action: DeferredAction) {
        self.pending.push(action);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredAction> {
        self.pending.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take everything currently queued, leaving the queue empty.
    ///
    /// Callers drain the returned batch; anything enqueued during that drain
    /// lands in the (now empty) queue and runs next tick.
    pub fn take_batch(&mut self) -> Vec<DeferredAction> {
        std::mem::take(&mut self.pending)
    }
}
