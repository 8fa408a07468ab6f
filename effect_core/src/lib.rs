//! Status-effect resolution engine for a tick-driven skirmish simulation.
//!
//! The engine tracks stacking, time-limited, mutually-interacting effects on
//! entities: shields that absorb damage, vulnerability stacks that amplify
//! it, damage-over-time bleeds and burns, death-triggered chain explosions,
//! counterattack marks, and summoned turrets. Everything runs on a single
//! logical thread driven by [`World::advance_tick`]; deferred consequences
//! are queued and drained once per tick so chains can never recurse
//! unboundedly within one tick.

pub mod ability;
pub mod combat;
pub mod config;
pub mod effect;
pub mod queue;
pub mod turret;
pub mod types;
pub mod world;

pub use ability::CastError;
pub use combat::{DamageEvent, DamageOutcome};
pub use effect::{
    ApplyResult, DurationPolicy, EffectDefinition, EffectInstance, EffectKind, EffectRegistry,
    EffectStore, StackingPolicy,
};
pub use queue::{DeferredAction, DeferredQueue};
pub use turret::{InheritedStats, Turret, TurretRoster, TURRETS_PER_SUMMONER};
pub use types::{DamageKind, EntityId, Faction, Position, TurretId};
pub use world::{Entity, World};
