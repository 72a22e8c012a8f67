//! # Projectile
//!
//! Flies in a straight line and removes its owner when it runs out of
//! ticks. Hits are detected by the simulation, which deletes the owner
//! early.
//!
//! Debris uses the same component with no damage.

use tessera_core::{Component, Vec3, WorldContext};

/// A moving shot or a piece of debris.
#[derive(Clone, Debug)]
pub struct Projectile {
    velocity: Vec3,
    ticks_to_live: u32,
    player: u8,
    damage: Option<u32>,
}

impl Projectile {
    /// A shot that damages ships of other players.
    #[must_use]
    pub const fn shot(velocity: Vec3, ticks_to_live: u32, player: u8, damage: u32) -> Self {
        Self {
            velocity,
            ticks_to_live,
            player,
            damage: Some(damage),
        }
    }

    /// Harmless debris.
    #[must_use]
    pub const fn debris(velocity: Vec3, ticks_to_live: u32, player: u8) -> Self {
        Self {
            velocity,
            ticks_to_live,
            player,
            damage: None,
        }
    }

    /// Velocity in units per second.
    #[inline]
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Player that fired (or lost the ship, for debris).
    #[inline]
    #[must_use]
    pub const fn player(&self) -> u8 {
        self.player
    }

    /// Damage dealt on hit, `None` for debris.
    #[inline]
    #[must_use]
    pub const fn damage(&self) -> Option<u32> {
        self.damage
    }

    /// Ticks left before the projectile disappears.
    #[inline]
    #[must_use]
    pub const fn ticks_to_live(&self) -> u32 {
        self.ticks_to_live
    }
}

impl Component for Projectile {
    fn is_dynamic(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut WorldContext<'_>) {
        if self.ticks_to_live == 0 {
            ctx.delete_object(ctx.owner());
            return;
        }
        self.ticks_to_live -= 1;

        if self.velocity.is_zero(1e-4) {
            return;
        }
        let Ok(local) = ctx.view().local_transform(ctx.owner()) else {
            return;
        };
        let position = local.position + self.velocity * ctx.delta_seconds();
        ctx.set_local_position(ctx.owner(), position);
    }

    fn duplicate(&self) -> Option<Self> {
        Some(self.clone())
    }
}
