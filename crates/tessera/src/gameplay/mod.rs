//! # Gameplay Components
//!
//! - `ship`: drifts, fires at rivals, breaks up when destroyed
//! - `projectile`: shots and debris
//! - `collidable`: hit spheres
//! - `scoreboard`: kill tally on the arena root
//! - `messages`: `Damage` and `ShipDestroyed`

pub mod collidable;
pub mod messages;
pub mod projectile;
pub mod scoreboard;
pub mod ship;

pub use collidable::Collidable;
pub use messages::{Damage, ShipDestroyed};
pub use projectile::Projectile;
pub use scoreboard::Scoreboard;
pub use ship::{Ship, Weapon};
