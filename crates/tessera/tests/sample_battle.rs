//! # Sample Battle Tests
//!
//! Run with: cargo test --package tessera --test sample_battle

use std::path::Path;

use tessera::core::MsgRouting;
use tessera::gameplay::{Damage, Ship};
use tessera::{SampleConfig, Simulation};

#[test]
fn shipped_config_loads_and_runs() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("sample_sim.toml");
    let mut config = SampleConfig::from_toml_file(path).unwrap();
    assert_eq!(config.ships, 6);
    assert_eq!(config.world.max_hierarchy_depth, 8);

    config.ticks = 120;
    let report = Simulation::new(config).unwrap().run().unwrap();
    assert!(report.ticks <= 120);
    assert_eq!(report.kills.len(), 6);
    assert!(report.peak_objects >= 7);
}

#[test]
fn battle_ends_with_at_most_one_survivor() {
    let config = SampleConfig {
        ships: 4,
        ticks: 6_000,
        ship_speed: 0.0,
        projectile_lifetime_ticks: 200,
        ..SampleConfig::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    let report = sim.run().unwrap();

    // The last two may trade fatal shots on the same tick.
    assert!(report.ticks < 6_000);
    assert!(report.survivors.len() <= 1);
    let lost = 4 - report.survivors.len();
    assert_eq!(report.kills.iter().sum::<u32>() as usize, lost);
    let board = sim.scoreboard().unwrap();
    assert_eq!(board.destroyed().len(), lost);
    for survivor in &report.survivors {
        assert!(!board.destroyed().contains(survivor));
    }
}

#[test]
fn destroyed_ship_leaves_the_arena() {
    let config = SampleConfig {
        ships: 2,
        ship_health: 100,
        ..SampleConfig::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    let arena = sim.arena();
    let world = sim.world_mut();
    let victim = world.children(arena).unwrap().next().unwrap();

    world
        .send_message(
            victim,
            Damage {
                amount: 100,
                from_player: 1,
            },
            MsgRouting::DEFAULT,
        )
        .unwrap();
    assert!(!world.is_alive(victim));
    assert!(world.try_get_component_of_type::<Ship>(victim).is_err());
    assert_eq!(world.children(arena).unwrap().count(), 1);
    assert_eq!(sim.survivors().len(), 1);
    assert_eq!(sim.scoreboard().unwrap().kills(1), 1);
}
