//! Effect definitions and the per-entity effect system

mod instance;
mod store;

pub use instance::EffectInstance;
pub use store::{ApplyResult, EffectStore};

use crate::types::DamageKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every effect kind the engine knows about.
///
/// Kinds are resolved from string names once, at config-load time; runtime
/// code only ever handles the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Stackable physical-damage vulnerability, max 8 stacks
    Rend,
    /// Stack-consuming bleed, 2 stacks spent per damage tick
    Gash,
    /// Fire damage over time with multiplicative stacking
    ScorchMark,
    /// Absorbing shield with a slow heal while active
    FrostBarrier,
    /// Combat-momentum resource counter, consumed by abilities
    ConfectanceIndex,
    /// Seeds CorrosiveInfusion on its owner; explodes on owner death
    ToxicInfiltration,
    /// Corrosion aura damaging nearby hostiles each interval
    CorrosiveInfusion,
    /// Mark that counterattacks when its owner strikes the caster's allies
    TaryzTracker,
    /// Protective bond that heals its owner when it expires
    DeepRootedBonds,
    /// Splashes a share of electric damage to other charged targets
    NegativeCharge,
    /// Flat incoming-damage reduction stance
    FortifiedStance,
}

impl EffectKind {
    pub fn all() -> &'static [EffectKind] {
        &[
            EffectKind::Rend,
            EffectKind::Gash,
            EffectKind::ScorchMark,
            EffectKind::FrostBarrier,
            EffectKind::ConfectanceIndex,
            EffectKind::ToxicInfiltration,
            EffectKind::CorrosiveInfusion,
            EffectKind::TaryzTracker,
            EffectKind::DeepRootedBonds,
            EffectKind::NegativeCharge,
            EffectKind::FortifiedStance,
        ]
    }

    /// Canonical config-file name for this kind
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Rend => "rend",
            EffectKind::Gash => "gash",
            EffectKind::ScorchMark => "scorch_mark",
            EffectKind::FrostBarrier => "frost_barrier",
            EffectKind::ConfectanceIndex => "confectance_index",
            EffectKind::ToxicInfiltration => "toxic_infiltration",
            EffectKind::CorrosiveInfusion => "corrosive_infusion",
            EffectKind::TaryzTracker => "taryz_tracker",
            EffectKind::DeepRootedBonds => "deep_rooted_bonds",
            EffectKind::NegativeCharge => "negative_charge",
            EffectKind::FortifiedStance => "fortified_stance",
        }
    }

    /// Resolve a config-file name. Unknown names return `None`; callers log
    /// and skip rather than fail (missing definitions must never crash).
    pub fn from_name(name: &str) -> Option<EffectKind> {
        EffectKind::all().iter().copied().find(|k| k.name() == name)
    }
}

/// How re-application interacts with an existing instance of the same kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StackingPolicy {
    /// Discard the old instance, install the new one
    Replace,
    /// Add stacks up to `max`, duration reset to full
    AdditiveStack { max: u32 },
    /// Kind-specific merge rule (see `EffectStore::apply`)
    Merge,
}

/// When an instance leaves its owner on its own
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Expires after this many ticks
    Ticks { ticks: u32 },
    /// Never expires by age
    Permanent,
    /// Lives until its stacks are consumed to zero
    UntilConsumed,
}

/// Immutable template for one effect kind.
///
/// Numeric knobs are shared across kinds; each kind reads the ones its
/// behavior needs and ignores the rest. All knobs are overridable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub kind: EffectKind,
    pub stacking: StackingPolicy,
    pub duration: DurationPolicy,
    /// Ticks between periodic callbacks; 0 means no periodic behavior
    #[serde(default)]
    pub tick_interval: u32,
    /// Damage kind dealt by this effect's own damage
    #[serde(default = "default_damage_kind")]
    pub damage_kind: DamageKind,
    /// Fraction of the applier's attack dealt per stack per interval
    #[serde(default)]
    pub damage_per_stack: f64,
    /// Incoming-damage bonus per stack (vulnerability multiplier)
    #[serde(default)]
    pub per_stack_bonus: f64,
    /// Multiplier on incoming damage while active (1.0 = no change)
    #[serde(default = "default_one")]
    pub damage_taken_multiplier: f64,
    /// Shield hit points granted on application
    #[serde(default)]
    pub shield_points: f64,
    /// HP healed on the owner each interval
    #[serde(default)]
    pub heal_per_interval: f64,
    /// HP healed on the owner when the effect expires or is removed
    #[serde(default)]
    pub heal_on_expire: f64,
    /// Stacks consumed after each periodic callback
    #[serde(default)]
    pub stacks_consumed_per_interval: u32,
    /// Share of received damage splashed to matching targets
    #[serde(default)]
    pub splash_fraction: f64,
    /// Radius for this effect's own area behavior
    #[serde(default)]
    pub aoe_radius: f64,
}

fn default_damage_kind() -> DamageKind {
    DamageKind::Physical
}

fn default_one() -> f64 {
    1.0
}

impl EffectDefinition {
    fn base(kind: EffectKind, stacking: StackingPolicy, duration: DurationPolicy) -> Self {
        EffectDefinition {
            kind,
            stacking,
            duration,
            tick_interval: 0,
            damage_kind: DamageKind::Physical,
            damage_per_stack: 0.0,
            per_stack_bonus: 0.0,
            damage_taken_multiplier: 1.0,
            shield_points: 0.0,
            heal_per_interval: 0.0,
            heal_on_expire: 0.0,
            stacks_consumed_per_interval: 0,
            splash_fraction: 0.0,
            aoe_radius: 0.0,
        }
    }

    /// Maximum stack count this definition permits
    pub fn max_stacks(&self) -> u32 {
        match self.stacking {
            StackingPolicy::AdditiveStack { max } => max,
            StackingPolicy::Merge if self.kind == EffectKind::CorrosiveInfusion => 10,
            _ => u32::MAX,
        }
    }
}

/// Registry of effect definitions, keyed by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectRegistry {
    definitions: HashMap<EffectKind, EffectDefinition>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        EffectRegistry {
            definitions: HashMap::new(),
        }
    }

    pub fn register(&mut self, def: EffectDefinition) {
        self.definitions.insert(def.kind, def);
    }

    /// Look up a definition. Absent definitions are a soft failure: the
    /// caller logs a warning and skips the operation.
    pub fn get(&self, kind: EffectKind) -> Option<&EffectDefinition> {
        let def = self.definitions.get(&kind);
        if def.is_none() {
            tracing::warn!(kind = kind.name(), "effect definition not registered, skipping");
        }
        def
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.definitions.contains_key(&kind)
    }

    /// Registry with the built-in definitions for every kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Rend: +30% physical damage taken per stack, max 8, 15s
        let mut rend = EffectDefinition::base(
            EffectKind::Rend,
            StackingPolicy::AdditiveStack { max: 8 },
            DurationPolicy::Ticks { ticks: 900 },
        );
        rend.per_stack_bonus = 0.30;
        registry.register(rend);

        // Gash: 8% applier attack per stack every second, spends 2 stacks per tick
        let mut gash = EffectDefinition::base(
            EffectKind::Gash,
            StackingPolicy::Merge,
            DurationPolicy::UntilConsumed,
        );
        gash.tick_interval = 60;
        gash.damage_per_stack = 0.08;
        gash.stacks_consumed_per_interval = 2;
        registry.register(gash);

        // ScorchMark: fire DoT, multiplicative stacking, 30s
        let mut scorch = EffectDefinition::base(
            EffectKind::ScorchMark,
            StackingPolicy::Merge,
            DurationPolicy::Ticks { ticks: 1800 },
        );
        scorch.tick_interval = 60;
        scorch.damage_kind = DamageKind::Fire;
        scorch.damage_per_stack = 0.07;
        registry.register(scorch);

        // FrostBarrier: 80 HP shield, heals 1 HP per second, 30s
        let mut barrier = EffectDefinition::base(
            EffectKind::FrostBarrier,
            StackingPolicy::Replace,
            DurationPolicy::Ticks { ticks: 1800 },
        );
        barrier.tick_interval = 60;
        barrier.shield_points = 80.0;
        barrier.heal_per_interval = 1.0;
        registry.register(barrier);

        // ConfectanceIndex: unbounded momentum counter, 60s
        registry.register(EffectDefinition::base(
            EffectKind::ConfectanceIndex,
            StackingPolicy::AdditiveStack { max: u32::MAX },
            DurationPolicy::Ticks { ticks: 3600 },
        ));

        // ToxicInfiltration: seeds 1 CorrosiveInfusion stack per second, 20s
        let mut toxic = EffectDefinition::base(
            EffectKind::ToxicInfiltration,
            StackingPolicy::Merge,
            DurationPolicy::Ticks { ticks: 1200 },
        );
        toxic.tick_interval = 60;
        toxic.aoe_radius = 6.0; // death-explosion radius
        registry.register(toxic);

        // CorrosiveInfusion: 12% applier attack per stack to hostiles within 1.5 tiles, 10s
        let mut infusion = EffectDefinition::base(
            EffectKind::CorrosiveInfusion,
            StackingPolicy::Merge,
            DurationPolicy::Ticks { ticks: 600 },
        );
        infusion.tick_interval = 60;
        infusion.damage_kind = DamageKind::Corrosion;
        infusion.damage_per_stack = 0.12;
        infusion.aoe_radius = 1.5;
        registry.register(infusion);

        // TaryzTracker: counterattack mark, 25s
        registry.register(EffectDefinition::base(
            EffectKind::TaryzTracker,
            StackingPolicy::Replace,
            DurationPolicy::Ticks { ticks: 1500 },
        ));

        // DeepRootedBonds: heals 30 HP when it expires, 30s
        let mut bonds = EffectDefinition::base(
            EffectKind::DeepRootedBonds,
            StackingPolicy::Replace,
            DurationPolicy::Ticks { ticks: 1800 },
        );
        bonds.heal_on_expire = 30.0;
        registry.register(bonds);

        // NegativeCharge: splashes 30% of electric damage within 8 tiles, 20s
        let mut charge = EffectDefinition::base(
            EffectKind::NegativeCharge,
            StackingPolicy::Replace,
            DurationPolicy::Ticks { ticks: 1200 },
        );
        charge.splash_fraction = 0.30;
        charge.aoe_radius = 8.0;
        registry.register(charge);

        // FortifiedStance: -20% incoming damage, 15s
        let mut stance = EffectDefinition::base(
            EffectKind::FortifiedStance,
            StackingPolicy::Replace,
            DurationPolicy::Ticks { ticks: 900 },
        );
        stance.damage_taken_multiplier = 0.80;
        registry.register(stance);

        registry
    }
}
