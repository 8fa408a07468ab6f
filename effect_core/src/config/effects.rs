//! Effect definition overrides
//!
//! Balance tuning happens here: a TOML file keyed by effect name patches the
//! built-in definitions. Unknown effect names are logged and skipped so an
//! outdated config never crashes a load.

use super::ConfigError;
use crate::effect::{DurationPolicy, EffectKind, EffectRegistry, StackingPolicy};
use crate::types::DamageKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Partial definition: only the listed knobs are changed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectOverride {
    pub stacking: Option<StackingPolicy>,
    pub duration: Option<DurationPolicy>,
    pub tick_interval: Option<u32>,
    pub damage_kind: Option<DamageKind>,
    pub damage_per_stack: Option<f64>,
    pub per_stack_bonus: Option<f64>,
    pub damage_taken_multiplier: Option<f64>,
    pub shield_points: Option<f64>,
    pub heal_per_interval: Option<f64>,
    pub heal_on_expire: Option<f64>,
    pub stacks_consumed_per_interval: Option<u32>,
    pub splash_fraction: Option<f64>,
    pub aoe_radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EffectsFile {
    #[serde(default)]
    effects: HashMap<String, EffectOverride>,
}

/// Parse a TOML override document and patch the registry in place.
/// Returns how many definitions were changed.
pub fn parse_effect_overrides(text: &str, registry: &mut EffectRegistry) -> Result<usize, ConfigError> {
    let file: EffectsFile = toml::from_str(text)?;
    let mut applied = 0;

    for (name, patch) in &file.effects {
        let Some(kind) = EffectKind::from_name(name) else {
            tracing::warn!(name = %name, "unknown effect name in config, skipping");
            continue;
        };
        let Some(mut def) = registry.get(kind).cloned() else {
            continue;
        };

        if let Some(v) = patch.stacking {
            def.stacking = v;
        }
        if let Some(v) = patch.duration {
            def.duration = v;
        }
        if let Some(v) = patch.tick_interval {
            def.tick_interval = v;
        }
        if let Some(v) = patch.damage_kind {
            def.damage_kind = v;
        }
        if let Some(v) = patch.damage_per_stack {
            def.damage_per_stack = v;
        }
        if let Some(v) = patch.per_stack_bonus {
            def.per_stack_bonus = v;
        }
        if let Some(v) = patch.damage_taken_multiplier {
            def.damage_taken_multiplier = v;
        }
        if let Some(v) = patch.shield_points {
            def.shield_points = v;
        }
        if let Some(v) = patch.heal_per_interval {
            def.heal_per_interval = v;
        }
        if let Some(v) = patch.heal_on_expire {
            def.heal_on_expire = v;
        }
        if let Some(v) = patch.stacks_consumed_per_interval {
            def.stacks_consumed_per_interval = v;
        }
        if let Some(v) = patch.splash_fraction {
            def.splash_fraction = v;
        }
        if let Some(v) = patch.aoe_radius {
            def.aoe_radius = v;
        }

        registry.register(def);
        applied += 1;
    }

    Ok(applied)
}

pub fn load_effect_overrides(
    path: impl AsRef<Path>,
    registry: &mut EffectRegistry,
) -> Result<usize, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_effect_overrides(&text, registry)
}
