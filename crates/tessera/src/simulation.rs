//! # Headless Simulation
//!
//! Drives the sample game on a plain [`World`]:
//!
//! ```text
//! Tick N:
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. world.tick()                                              │
//! │    ├─ ships drift and fire (spawn commands)                  │
//! │    ├─ projectiles fly, expired ones delete themselves        │
//! │    └─ queued Damage from tick N-1 is delivered               │
//! │                                                              │
//! │ 2. resolve_collisions()                                      │
//! │    ├─ every damaging projectile vs. every collidable         │
//! │    ├─ hit: queue Damage to the ship, delete the projectile   │
//! │    └─ wrecks report ShipDestroyed up to the arena            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ship placement is the only random input, drawn from a seeded `ChaCha8`
//! generator, so a seed always replays the same battle.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{
    ComponentHandle, GameObjectDesc, GameObjectHandle, MsgRouting, Quat, Vec3, World,
};

use crate::config::SampleConfig;
use crate::error::SampleResult;
use crate::gameplay::{Collidable, Damage, Projectile, Scoreboard, Ship, Weapon};

/// Totals over a whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimReport {
    /// Ticks simulated.
    pub ticks: u32,
    /// Projectiles that hit a ship.
    pub hits: u64,
    /// Queued messages delivered at drain points.
    pub messages_delivered: u64,
    /// Queued messages dropped because their target was gone.
    pub messages_dropped: u64,
    /// Component updates run.
    pub components_updated: u64,
    /// Most objects alive at the end of any tick.
    pub peak_objects: usize,
    /// Players still flying, in player order.
    pub survivors: Vec<u8>,
    /// Kills per player, indexed by player.
    pub kills: Vec<u32>,
}

/// One sample battle.
pub struct Simulation {
    world: World,
    config: SampleConfig,
    arena: GameObjectHandle,
    scoreboard: ComponentHandle,
    ships: Vec<GameObjectHandle>,
    report: SimReport,
}

impl Simulation {
    /// Builds the arena and places one ship per player on a ring.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the world runs
    /// out of room.
    pub fn new(config: SampleConfig) -> SampleResult<Self> {
        config.validate()?;
        let mut world = World::new(config.world.clone())?;
        world.register_component_type::<Ship>()?;
        world.register_component_type::<Projectile>()?;
        world.register_component_type::<Collidable>()?;

        let arena = world.create_object(GameObjectDesc::new("arena").with_persistent_id(1))?;
        let scoreboard = world.create_component(Scoreboard::new(config.ships))?;
        world.add_component(arena, scoreboard)?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut ships = Vec::with_capacity(usize::from(config.ships));
        for player in 0..config.ships {
            ships.push(spawn_ship(&mut world, &config, &mut rng, arena, player)?);
        }
        for (i, &ship) in ships.iter().enumerate() {
            let rivals = ships
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &rival)| rival)
                .collect();
            if let Some(component) = world.try_get_component_of_type::<Ship>(ship)? {
                world.try_get_component_mut::<Ship>(component)?.set_rivals(rivals);
            }
        }

        tracing::info!(
            "Arena ready: {} ships, seed {}",
            config.ships,
            config.seed
        );

        Ok(Self {
            world,
            config,
            arena,
            scoreboard,
            ships,
            report: SimReport::default(),
        })
    }

    /// The simulated world.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for scripted events between steps.
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The arena root every ship hangs under.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> GameObjectHandle {
        self.arena
    }

    /// Kill tally.
    ///
    /// # Errors
    ///
    /// Returns an error if the arena was removed from the world.
    pub fn scoreboard(&self) -> SampleResult<&Scoreboard> {
        Ok(self.world.try_get_component::<Scoreboard>(self.scoreboard)?)
    }

    /// Players whose ships are still in the world.
    #[must_use]
    pub fn survivors(&self) -> Vec<u8> {
        self.ships
            .iter()
            .filter_map(|&ship| {
                let component = self.world.try_get_component_of_type::<Ship>(ship).ok()??;
                let ship = self.world.try_get_component::<Ship>(component).ok()?;
                Some(ship.player())
            })
            .collect()
    }

    /// Runs one tick followed by collision resolution. Returns the hits.
    ///
    /// # Errors
    ///
    /// Returns an error if the world rejects a collision response.
    pub fn step(&mut self) -> SampleResult<usize> {
        let stats = self.world.tick(self.config.delta_seconds);
        let hits = self.resolve_collisions()?;

        self.report.ticks += 1;
        self.report.hits += hits as u64;
        self.report.messages_delivered += stats.drain.delivered as u64;
        self.report.messages_dropped += stats.drain.dropped as u64;
        self.report.components_updated += stats.components_updated as u64;
        self.report.peak_objects = self.report.peak_objects.max(self.world.object_count());
        Ok(hits)
    }

    /// Runs the configured number of ticks, stopping early once at most one
    /// ship is left and every projectile has settled.
    ///
    /// # Errors
    ///
    /// Propagates the first error of [`Simulation::step`].
    pub fn run(&mut self) -> SampleResult<SimReport> {
        for _ in 0..self.config.ticks {
            self.step()?;
            if self.survivors().len() <= 1 && self.projectile_count() == 0 {
                break;
            }
        }
        Ok(self.report())
    }

    /// Report of the ticks run so far.
    #[must_use]
    pub fn report(&self) -> SimReport {
        let mut report = self.report.clone();
        report.survivors = self.survivors();
        report.kills = self
            .scoreboard()
            .map(|board| (0..self.config.ships).map(|p| board.kills(p)).collect())
            .unwrap_or_default();
        report
    }

    fn projectile_count(&self) -> usize {
        self.world
            .component_manager::<Projectile>()
            .map_or(0, |manager| manager.len())
    }

    /// Tests every damaging projectile against every collidable of another
    /// player. A projectile hits at most one ship.
    fn resolve_collisions(&mut self) -> SampleResult<usize> {
        let world = &self.world;

        let targets: Vec<(GameObjectHandle, Collidable, Vec3, Option<u8>)> = world
            .component_manager::<Collidable>()?
            .components()
            .filter_map(|(handle, collidable)| {
                let owner = world.component_owner(handle).ok()??;
                let position = world.global_transform(owner).ok()?.position;
                let player = world
                    .try_get_component_of_type::<Ship>(owner)
                    .ok()
                    .flatten()
                    .and_then(|ship| world.try_get_component::<Ship>(ship).ok())
                    .filter(|ship| !ship.is_destroyed())
                    .map(Ship::player);
                Some((owner, *collidable, position, player))
            })
            .collect();

        let mut hits = Vec::new();
        for (handle, projectile) in world.component_manager::<Projectile>()?.components() {
            let Some(amount) = projectile.damage() else {
                continue;
            };
            let Some(owner) = world.component_owner(handle).ok().flatten() else {
                continue;
            };
            let Ok(transform) = world.global_transform(owner) else {
                continue;
            };
            let hit = targets.iter().find(|(_, collidable, center, player)| {
                *player != Some(projectile.player())
                    && collidable.contains(*center, transform.position)
            });
            if let Some(&(target, ..)) = hit {
                let damage = Damage {
                    amount,
                    from_player: projectile.player(),
                };
                hits.push((owner, target, damage));
            }
        }

        let count = hits.len();
        for (projectile, target, damage) in hits {
            self.world.queue_message(target, damage, MsgRouting::DEFAULT)?;
            self.world.delete_object(projectile)?;
        }
        Ok(count)
    }
}

#[allow(clippy::cast_precision_loss)]
fn spawn_ship(
    world: &mut World,
    config: &SampleConfig,
    rng: &mut ChaCha8Rng,
    arena: GameObjectHandle,
    player: u8,
) -> SampleResult<GameObjectHandle> {
    let slot = TAU * f32::from(player) / f32::from(config.ships);
    let jitter: f32 = rng.gen_range(-0.2..0.2);
    let on_ring = Quat::from_axis_angle(Vec3::Z, slot + jitter).rotate(Vec3::X);
    let heading: f32 = rng.gen_range(0.0..TAU);
    let drift = Quat::from_axis_angle(Vec3::Z, heading).rotate(Vec3::X);

    let desc = GameObjectDesc::new(format!("ship_{player}"))
        .dynamic()
        .with_parent(arena)
        .with_persistent_id(100 + u64::from(player))
        .with_position(on_ring * config.arena_radius);
    let object = world.create_object(desc)?;

    let ship = Ship::new(player, config.ship_health)
        .with_velocity(drift * config.ship_speed)
        .with_weapon(Weapon {
            speed: config.projectile_speed,
            lifetime_ticks: config.projectile_lifetime_ticks,
            damage: config.projectile_damage,
        })
        .with_fire_interval(config.fire_interval_ticks)
        .with_debris(config.debris_per_wreck);
    let ship = world.create_component(ship)?;
    world.add_component(object, ship)?;
    let hull = world.create_component(Collidable::new(config.collision_radius))?;
    world.add_component(object, hull)?;
    Ok(object)
}
