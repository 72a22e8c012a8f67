//! # Ship
//!
//! A player's ship. Every tick it drifts, and once its cooldown runs out it
//! fires at the nearest rival still in the world.
//!
//! ```text
//!   Damage ──> health -= amount
//!                 │
//!                 └─ 0 ─> ShipDestroyed (TO_PARENT) ─> debris ─> delete self
//! ```

use std::f32::consts::TAU;

use tessera_core::{
    Component, GameObjectDesc, GameObjectHandle, Message, MsgRouting, Quat, Vec3, WorldContext,
    WorldView,
};

use super::messages::{Damage, ShipDestroyed};
use super::projectile::Projectile;

/// What a ship fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weapon {
    /// Projectile speed, units per second.
    pub speed: f32,
    /// Ticks before a shot disappears.
    pub lifetime_ticks: u32,
    /// Health removed per hit.
    pub damage: u32,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            speed: 40.0,
            lifetime_ticks: 90,
            damage: 100,
        }
    }
}

/// A player's ship.
#[derive(Clone, Debug)]
pub struct Ship {
    player: u8,
    health: u32,
    velocity: Vec3,
    weapon: Weapon,
    fire_interval: u32,
    cooldown: u32,
    debris: u32,
    rivals: Vec<GameObjectHandle>,
}

impl Ship {
    /// A stationary ship that fires every 20 ticks.
    #[must_use]
    pub fn new(player: u8, health: u32) -> Self {
        Self {
            player,
            health,
            velocity: Vec3::ZERO,
            weapon: Weapon::default(),
            fire_interval: 20,
            cooldown: 0,
            debris: 0,
            rivals: Vec::new(),
        }
    }

    /// Sets the drift velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = weapon;
        self
    }

    /// Sets the ticks between two shots. The first shot leaves at once.
    #[must_use]
    pub fn with_fire_interval(mut self, ticks: u32) -> Self {
        self.fire_interval = ticks.max(1);
        self
    }

    /// Sets how many fragments the wreck spawns.
    #[must_use]
    pub fn with_debris(mut self, pieces: u32) -> Self {
        self.debris = pieces;
        self
    }

    /// Replaces the ships this one fires at.
    pub fn set_rivals(&mut self, rivals: Vec<GameObjectHandle>) {
        self.rivals = rivals;
    }

    /// Owning player.
    #[inline]
    #[must_use]
    pub const fn player(&self) -> u8 {
        self.player
    }

    /// Remaining health.
    #[inline]
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Returns `true` once health reached zero.
    #[inline]
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.health == 0
    }

    fn nearest_rival(&self, view: WorldView<'_>, from: Vec3) -> Option<Vec3> {
        self.rivals
            .iter()
            .filter_map(|&rival| view.global_transform(rival).ok())
            .map(|transform| transform.position)
            .min_by(|a, b| from.distance_squared(*a).total_cmp(&from.distance_squared(*b)))
    }

    fn fire(&self, ctx: &mut WorldContext<'_>, from: Vec3, at: Vec3) {
        let offset = at - from;
        let distance = offset.length();
        if distance < 1e-4 {
            return;
        }
        let shot = Projectile::shot(
            offset * (self.weapon.speed / distance),
            self.weapon.lifetime_ticks,
            self.player,
            self.weapon.damage,
        );
        let desc = GameObjectDesc::new("shot").dynamic().with_position(from);
        ctx.spawn(desc, move |world, object| {
            let projectile = world.create_component(shot)?;
            world.add_component(object, projectile)
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn wreck(&self, ctx: &mut WorldContext<'_>, by_player: u8) {
        let owner = ctx.owner();
        ctx.send_message(
            owner,
            ShipDestroyed {
                player: self.player,
                by_player,
            },
            MsgRouting::TO_PARENT,
        );

        let origin = ctx
            .view()
            .global_transform(owner)
            .map_or(Vec3::ZERO, |transform| transform.position);
        for i in 0..self.debris {
            let angle = TAU * i as f32 / self.debris as f32;
            let direction = Quat::from_axis_angle(Vec3::Z, angle).rotate(Vec3::X);
            let piece = Projectile::debris(
                direction * (self.weapon.speed * 0.25),
                self.weapon.lifetime_ticks / 3,
                self.player,
            );
            let desc = GameObjectDesc::new("debris").dynamic().with_position(origin);
            ctx.spawn(desc, move |world, object| {
                let projectile = world.create_component(piece)?;
                world.add_component(object, projectile)
            });
        }

        ctx.delete_object(owner);
    }
}

impl Component for Ship {
    fn is_dynamic(&self) -> bool {
        true
    }

    fn on_message(&mut self, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
        let Some(hit) = msg.downcast_ref::<Damage>() else {
            return;
        };
        if self.is_destroyed() || hit.from_player == self.player {
            return;
        }
        self.health = self.health.saturating_sub(hit.amount);
        tracing::debug!(
            "Player {} hit by player {}, health {}",
            self.player,
            hit.from_player,
            self.health
        );
        if self.is_destroyed() {
            self.wreck(ctx, hit.from_player);
        }
    }

    fn update(&mut self, ctx: &mut WorldContext<'_>) {
        if self.is_destroyed() {
            return;
        }
        let owner = ctx.owner();
        let view = ctx.view();
        let (Ok(local), Ok(global)) = (view.local_transform(owner), view.global_transform(owner))
        else {
            return;
        };
        ctx.set_local_position(owner, local.position + self.velocity * ctx.delta_seconds());

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return;
        }
        if let Some(target) = self.nearest_rival(view, global.position) {
            self.fire(ctx, global.position, target);
            self.cooldown = self.fire_interval - 1;
        }
    }

    fn duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }
}
