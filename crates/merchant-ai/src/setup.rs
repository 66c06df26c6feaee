//! Merchant Setup
//!
//! Spawns agents for each archetype with randomized names and starting funds,
//! and wires up an initial relationship graph.

use rand::Rng;

use crate::agent::Agent;
use crate::config::SimulationConfig;
use crate::network::RelationshipType;
use crate::personality::Archetype;
use crate::system::{MerchantSystem, SystemError};

/// Name lists for each archetype
const AGGRESSIVE_NAMES: &[&str] = &[
    "Blaze", "Brand", "Crag", "Flint", "Hawk", "Pike", "Raven", "Spear", "Storm", "Talon",
    "Vex", "Wolf", "Axel", "Drake", "Fang", "Grimm", "Rook", "Slate", "Thorne", "Viper",
];

const CONSERVATIVE_NAMES: &[&str] = &[
    "Prudence", "Aldous", "Bertram", "Constance", "Edith", "Godfrey", "Harriet", "Ingram", "Mabel", "Osric",
    "Agnes", "Baldwin", "Cuthbert", "Eleanor", "Frideswide", "Gilbert", "Hilda", "Matilda", "Walter", "Winifred",
];

const BALANCED_NAMES: &[&str] = &[
    "Alder", "Brook", "Clover", "Dale", "Elm", "Fern", "Glen", "Hazel", "Linden", "Meadow",
    "Oak", "Reed", "Rowan", "Sage", "Vale", "Willow", "Wren", "Yarrow", "Aster", "Birch",
];

const OPPORTUNISTIC_NAMES: &[&str] = &[
    "Fox", "Magpie", "Jack", "Ferret", "Quill", "Sly", "Tinker", "Weasel", "Jinx", "Pip",
    "Mercer", "Chandler", "Haggle", "Copper", "Penny", "Ledger", "Broker", "Monger", "Dealer", "Trader",
];

/// Spread of starting funds around the configured amount
const FUNDS_VARIATION: f64 = 0.2;

/// Relationship roll thresholds, checked in order
const ALLIED_CHANCE: f64 = 0.1;
const FRIENDLY_CHANCE: f64 = 0.3;
const RIVAL_CHANCE: f64 = 0.4;

fn name_list(archetype: Archetype) -> &'static [&'static str] {
    match archetype {
        Archetype::Aggressive => AGGRESSIVE_NAMES,
        Archetype::Conservative => CONSERVATIVE_NAMES,
        Archetype::Opportunistic => OPPORTUNISTIC_NAMES,
        Archetype::Balanced | Archetype::Custom => BALANCED_NAMES,
    }
}

fn generate_name<R: Rng + ?Sized>(archetype: Archetype, index: usize, rng: &mut R) -> String {
    let names = name_list(archetype);
    let name_index = (index + rng.gen_range(0..names.len())) % names.len();
    format!("{} the {}", names[name_index], archetype)
}

fn generate_agent_id(archetype: Archetype, index: usize) -> String {
    format!("merchant_{}_{:03}", archetype.name().to_lowercase(), index)
}

fn generate_funds<R: Rng + ?Sized>(base: u64, rng: &mut R) -> u64 {
    let factor = 1.0 + rng.gen_range(-FUNDS_VARIATION..=FUNDS_VARIATION);
    (base as f64 * factor).round().max(0.0) as u64
}

/// Spawns `agents_per_archetype` agents of each built-in archetype.
///
/// Returns the ids in spawn order.
pub fn spawn_agents<R: Rng + ?Sized>(
    system: &mut MerchantSystem,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<Vec<String>, SystemError> {
    let mut ids = Vec::new();
    for &archetype in Archetype::all() {
        for index in 0..config.agents_per_archetype {
            let agent = Agent::with_archetype(
                generate_agent_id(archetype, index),
                generate_name(archetype, index, rng),
                generate_funds(config.starting_funds, rng),
                archetype,
            );
            ids.push(system.add_agent(agent)?.id().to_string());
        }
    }
    Ok(ids)
}

/// Rolls a relationship for every pair of agents. Returns how many were made.
pub fn connect_agents<R: Rng + ?Sized>(system: &MerchantSystem, rng: &mut R) -> Result<usize, SystemError> {
    let ids: Vec<String> = system.agents().iter().map(|a| a.id().to_string()).collect();
    let mut created = 0;

    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            let roll: f64 = rng.gen();
            let relationship_type = if roll < ALLIED_CHANCE {
                RelationshipType::Allied
            } else if roll < FRIENDLY_CHANCE {
                RelationshipType::Friendly
            } else if roll < RIVAL_CHANCE {
                RelationshipType::Rival
            } else {
                continue;
            };
            system.network().add_relationship(a, b, relationship_type)?;
            created += 1;
        }
    }

    Ok(created)
}
