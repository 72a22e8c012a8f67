//! # Synchronization
//!
//! Multi-threaded access to a world.
//!
//! ```text
//! Thread 1 (simulation):  write() ── tick, structural changes
//! Thread 2 (render):      read()  ── transforms, names
//! Thread N (network):     MessageSender::post ── no marker at all
//! ```
//!
//! Readers run in parallel; a writer excludes everyone. Component lifecycle
//! hooks never run under a marker when attached through [`SharedWorld`].

mod shared_world;

pub use shared_world::{ReadMarker, SharedWorld, WriteMarker};
