//! Damage events and the interception pipeline

mod event;
mod pipeline;

pub use event::{DamageEvent, DamageOutcome};
pub use pipeline::{apply_armor, run_pre_damage_hooks, PreDamageReport};
