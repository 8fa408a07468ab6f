//! Per-entity collection of active effect instances

use super::{EffectDefinition, EffectInstance, EffectKind, StackingPolicy};
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// How an application resolved against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// No instance of this kind existed; a new one was installed
    Added,
    /// Stacks were added to the existing instance
    Stacked,
    /// The existing instance was discarded and replaced
    Replaced,
    /// The existing instance was refreshed without gaining stacks
    Refreshed,
}

/// All active effects on one entity, in insertion order.
///
/// Owned exclusively by that entity; created lazily on first application.
/// Insertion order is the tick order, which is sufficient because no effect
/// here depends on inter-effect ordering within a tick (the damage pipeline
/// imposes its own fixed hook order separately).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectStore {
    instances: Vec<EffectInstance>,
}

impl EffectStore {
    pub fn new() -> Self {
        EffectStore { instances: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn get(&self, kind: EffectKind) -> Option<&EffectInstance> {
        self.instances.iter().find(|i| i.kind == kind)
    }

    pub fn get_mut(&mut self, kind: EffectKind) -> Option<&mut EffectInstance> {
        self.instances.iter_mut().find(|i| i.kind == kind)
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.get(kind).is_some()
    }

    /// Stack count for a kind, zero if absent
    pub fn stacks(&self, kind: EffectKind) -> u32 {
        self.get(kind).map(|i| i.stacks).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EffectInstance> {
        self.instances.iter_mut()
    }

    /// Apply an effect, resolving against any existing instance of the same
    /// kind per the definition's stacking policy. Never produces duplicates.
    pub fn apply(
        &mut self,
        def: &EffectDefinition,
        source: Option<EntityId>,
        source_attack: f64,
        initial_stacks: u32,
    ) -> ApplyResult {
        let Some(idx) = self.instances.iter().position(|i| i.kind == def.kind) else {
            self.instances.push(EffectInstance::new(def, source, source_attack, initial_stacks));
            return ApplyResult::Added;
        };
        let existing = &mut self.instances[idx];

        match def.stacking {
            StackingPolicy::Replace => {
                *existing = EffectInstance::new(def, source, source_attack, initial_stacks);
                ApplyResult::Replaced
            }
            StackingPolicy::AdditiveStack { .. } => {
                existing.add_stacks(initial_stacks.max(1), def);
                existing.reset_age();
                ApplyResult::Stacked
            }
            StackingPolicy::Merge => Self::merge(existing, def, source, initial_stacks),
        }
    }

    /// Kind-specific merge rules. The differences that matter:
    /// Gash keeps its age and DoT phase, ScorchMark resets its duration,
    /// ToxicInfiltration only refreshes, CorrosiveInfusion caps at 10
    /// without a duration reset.
    fn merge(
        existing: &mut EffectInstance,
        def: &EffectDefinition,
        source: Option<EntityId>,
        initial_stacks: u32,
    ) -> ApplyResult {
        match def.kind {
            EffectKind::Gash => {
                existing.add_stacks(initial_stacks.max(1), def);
                ApplyResult::Stacked
            }
            EffectKind::ScorchMark => {
                existing.add_stacks(1, def);
                existing.reset_age();
                ApplyResult::Stacked
            }
            EffectKind::ToxicInfiltration => {
                existing.reset_age();
                if source.is_some() {
                    existing.source = source;
                }
                ApplyResult::Refreshed
            }
            EffectKind::CorrosiveInfusion => {
                existing.add_stacks(initial_stacks.max(1), def);
                if source.is_some() {
                    existing.source = source;
                }
                ApplyResult::Stacked
            }
            // Default merge: add stacks and reset duration
            _ => {
                existing.add_stacks(initial_stacks.max(1), def);
                existing.reset_age();
                ApplyResult::Stacked
            }
        }
    }

    /// Remove an instance by kind, returning it so the caller can run the
    /// effect's on-remove consequences exactly once.
    pub fn remove(&mut self, kind: EffectKind) -> Option<EffectInstance> {
        let idx = self.instances.iter().position(|i| i.kind == kind)?;
        Some(self.instances.remove(idx))
    }

    /// Consume stacks from an instance; the instance is removed when it hits
    /// zero. Returns how many stacks were actually spent.
    pub fn consume_stacks(&mut self, kind: EffectKind, amount: u32) -> u32 {
        let Some(inst) = self.get_mut(kind) else {
            return 0;
        };
        let consumed = inst.consume_stacks(amount);
        if inst.stacks == 0 {
            self.remove(kind);
        }
        consumed
    }

    /// Consume every stack of a kind (resource counters), removing it
    pub fn consume_all(&mut self, kind: EffectKind) -> u32 {
        self.remove(kind).map(|i| i.stacks).unwrap_or(0)
    }
}
