//! # Memory Management
//!
//! Slot storage behind every handle the world hands out.
//!
//! ## Design Philosophy
//!
//! Values never move out from under a handle:
//! - Slots are reused through a free list
//! - Reuse bumps a generation counter
//! - Stale handles fail lookups instead of aliasing new values

mod handle_table;

pub use handle_table::HandleTable;
