//! Core types shared across the engine

use serde::{Deserialize, Serialize};

/// Stable handle for an entity in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle for a summoned turret
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurretId(pub u32);

/// Which side an entity fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Hostile,
    Neutral,
}

impl Faction {
    /// Whether two factions attack each other. Neutral fights nobody.
    pub fn hostile_to(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Player, Faction::Hostile) | (Faction::Hostile, Faction::Player)
        )
    }

    pub fn allied_with(self, other: Faction) -> bool {
        self == other
    }
}

/// Integer tile position on a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, z: i32) -> Self {
        Position { x, z }
    }

    /// Euclidean tile distance
    pub fn distance_to(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Damage classification used by the interception pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Physical,
    Fire,
    Corrosion,
    Hydro,
    Electric,
}

impl DamageKind {
    /// Matching set for physical-only vulnerability multipliers
    pub fn is_physical(self) -> bool {
        matches!(self, DamageKind::Physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_hostility() {
        assert!(Faction::Player.hostile_to(Faction::Hostile));
        assert!(Faction::Hostile.hostile_to(Faction::Player));
        assert!(!Faction::Player.hostile_to(Faction::Player));
        assert!(!Faction::Neutral.hostile_to(Faction::Hostile));
        assert!(!Faction::Hostile.hostile_to(Faction::Neutral));
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert!((a.distance_to(b) - 5.0).abs() < f64::EPSILON);
        assert!((b.distance_to(a) - 5.0).abs() < f64::EPSILON);
    }
}
