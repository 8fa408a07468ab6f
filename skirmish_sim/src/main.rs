//! Skirmish simulator - a scripted battle demonstrating effect_core
//!
//! The sim shows:
//! - Building up Rend stacks and cashing them in with the execute shot
//! - Shields, bonds, and the counterattack mark protecting the squad
//! - Corrosion infections chain-detonating through a raider pack
//! - Turret summoning with cap eviction feeding the momentum counter

use effect_core::ability::{
    cast_boil_and_reduce, cast_corrosion_burst, cast_fissioned_firelight, cast_fortified_stance,
    cast_frost_barrier, cast_gentle_offensive, cast_no_survivors, cast_path_of_bonds,
    cast_radiance, cast_target_victory,
};
use effect_core::config::load_effect_overrides;
use effect_core::{
    DamageEvent, DamageKind, EffectKind, EffectRegistry, EntityId, Faction, Position, World,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

const SEED: u64 = 0xC0FFEE;
const ROUNDS: usize = 12;
const TICKS_PER_ROUND: u64 = 60;

struct Squad {
    operative: EntityId,
    medic: EntityId,
    engineer: EntityId,
}

fn spawn_squad(world: &mut World) -> Squad {
    Squad {
        operative: world.spawn("Operative", Faction::Player, Position::new(0, 0), 220.0, 100.0, 20.0),
        medic: world.spawn("Medic", Faction::Player, Position::new(-1, 1), 160.0, 45.0, 10.0),
        engineer: world.spawn("Engineer", Faction::Player, Position::new(-1, -1), 180.0, 70.0, 15.0),
    }
}

fn spawn_raiders(world: &mut World, rng: &mut ChaCha8Rng, count: usize) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            let x = rng.gen_range(5..9);
            let z = rng.gen_range(-2..3);
            let hp = rng.gen_range(90.0..160.0);
            world.spawn(format!("Raider {}", i + 1), Faction::Hostile, Position::new(x, z), hp, 35.0, 5.0)
        })
        .collect()
}

/// Raiders swing at the nearest living squad member every round
fn raider_turn(world: &mut World, squad: &Squad, log: &mut Vec<String>) {
    let raiders: Vec<EntityId> = world
        .living()
        .filter(|e| e.faction == Faction::Hostile)
        .map(|e| e.id)
        .collect();
    for raider in raiders {
        let Some(attacker) = world.entity(raider) else { continue };
        let (pos, attack) = (attacker.position, attacker.attack_power);
        let victim = [squad.operative, squad.medic, squad.engineer]
            .into_iter()
            .filter_map(|id| world.entity(id).filter(|e| e.alive))
            .min_by(|a, b| {
                a.position
                    .distance_to(pos)
                    .partial_cmp(&b.position.distance_to(pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|e| e.id);
        let Some(victim) = victim else { break };
        let outcome = world.apply_damage(DamageEvent::new(victim, attack, DamageKind::Physical, Some(raider)));
        log.push(format!(
            "{} hits {}: {}",
            world.entity(raider).map(|e| e.name.clone()).unwrap_or_default(),
            world.entity(victim).map(|e| e.name.clone()).unwrap_or_default(),
            outcome.summary()
        ));
    }
}

fn squad_turn(world: &mut World, squad: &Squad, round: usize, log: &mut Vec<String>) {
    let target = world
        .living()
        .filter(|e| e.faction == Faction::Hostile)
        .max_by(|a, b| a.current_hp.partial_cmp(&b.current_hp).unwrap_or(std::cmp::Ordering::Equal))
        .map(|e| (e.id, e.position));
    let Some((target, target_pos)) = target else {
        return;
    };

    match round {
        0 => {
            if cast_frost_barrier(world, squad.medic, squad.operative).is_ok() {
                log.push("Medic shields the Operative".into());
            }
            if cast_path_of_bonds(world, squad.medic, squad.engineer).is_ok() {
                log.push("Medic bonds the Engineer".into());
            }
            if cast_fortified_stance(world, squad.medic, squad.medic).is_ok() {
                log.push("Medic braces for the charge".into());
            }
        }
        1 => {
            if let Ok(hit) = cast_corrosion_burst(world, squad.operative, target_pos) {
                log.push(format!("Operative's corrosion burst catches {hit} raiders"));
            }
        }
        2 | 3 => {
            // Four summons against a cap of two: the first pair gets evicted
            let z = if round == 2 { 1 } else { -1 };
            for spot in [Position::new(1, z), Position::new(2, z)] {
                if cast_gentle_offensive(world, squad.engineer, spot).is_ok() {
                    log.push(format!("Engineer deploys a turret at ({}, {})", spot.x, spot.z));
                }
            }
        }
        4 => {
            if cast_target_victory(world, squad.medic, target).is_ok() {
                log.push("Medic marks the healthiest raider".into());
            }
            if cast_radiance(world, squad.operative, target).is_ok() {
                log.push("Operative charges the mark".into());
            }
        }
        _ => {
            // Stack Rend, then spend it
            let stacks = world.entity(target).map(|e| e.effects.stacks(EffectKind::Rend)).unwrap_or(0);
            if stacks >= 6 {
                if let Ok(outcome) = cast_no_survivors(world, squad.operative, target) {
                    log.push(format!("Operative executes: {}", outcome.summary()));
                }
            } else {
                world.apply_effect(target, EffectKind::Rend, Some(squad.operative), 2);
                let outcome =
                    world.apply_damage(DamageEvent::new(target, 60.0, DamageKind::Physical, Some(squad.operative)));
                log.push(format!("Operative rends and fires: {}", outcome.summary()));
            }

            // The Engineer banks momentum with firelight, then vents it
            let momentum = world
                .entity(squad.engineer)
                .map(|e| e.effects.stacks(EffectKind::ConfectanceIndex))
                .unwrap_or(0);
            if momentum >= 3 {
                if let Ok(hit) = cast_boil_and_reduce(world, squad.engineer, target_pos) {
                    log.push(format!("Engineer vents {momentum} momentum, scorching {hit} raiders"));
                }
            } else if let Ok(outcome) = cast_fissioned_firelight(world, squad.engineer, target) {
                log.push(format!("Engineer's firelight: {}", outcome.summary()));
            }
        }
    }
}

fn print_report(world: &World, log: &[String]) {
    println!("=== battle log ===");
    for line in log {
        println!("  {line}");
    }
    println!("=== after {} ticks ===", world.tick);
    for entity in world.entities() {
        let state = if entity.alive {
            format!("{:>5.1}/{:.0} hp", entity.current_hp, entity.max_hp)
        } else {
            "down".to_string()
        };
        let effects: Vec<&str> = entity.effects.iter().map(|i| i.kind.name()).collect();
        println!("  {:<12} {:<16} [{}]", entity.name, state, effects.join(", "));
    }
    println!("  turrets standing: {}", world.turrets.len());
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = EffectRegistry::with_defaults();
    if let Some(path) = std::env::args().nth(1) {
        match load_effect_overrides(&path, &mut registry) {
            Ok(n) => tracing::info!(n, path = %path, "applied effect overrides"),
            Err(err) => {
                tracing::error!(%err, path = %path, "could not load overrides");
                std::process::exit(1);
            }
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut world = World::with_seed(registry, SEED);
    let squad = spawn_squad(&mut world);
    spawn_raiders(&mut world, &mut rng, 6);

    let mut log = Vec::new();
    for round in 0..ROUNDS {
        squad_turn(&mut world, &squad, round, &mut log);
        raider_turn(&mut world, &squad, &mut log);
        for _ in 0..TICKS_PER_ROUND {
            world.advance_tick();
        }
        if world.living().all(|e| e.faction != Faction::Hostile) {
            log.push(format!("raiders wiped in round {}", round + 1));
            break;
        }
    }

    print_report(&world, &log);
}
