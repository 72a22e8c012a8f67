//! # TESSERA
//!
//! Sample game built on `tessera_core`: ships on a ring shoot at each other
//! until one is left.
//!
//! ```text
//!   arena (Scoreboard)
//!   ├── ship_0 (Ship, Collidable)
//!   ├── ship_1 (Ship, Collidable)
//!   └── ...
//!   shot / debris (Projectile)      roots, spawned by ships
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML run settings
//! - `gameplay`: the components and their messages
//! - `simulation`: the headless tick loop and collision pass

pub mod config;
pub mod error;
pub mod gameplay;
pub mod simulation;

pub use tessera_core as core;

pub use config::SampleConfig;
pub use error::{SampleError, SampleResult};
pub use simulation::{SimReport, Simulation};
