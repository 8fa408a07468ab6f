//! TOML configuration loading

mod effects;

pub use effects::{load_effect_overrides, parse_effect_overrides, EffectOverride};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
