//! # TESSERA Core
//!
//! Game object world with handle-based identity, a parent/child transform
//! hierarchy, per-type component managers and routed messages.
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - every reference into the world is a
//!    generation-checked handle; stale handles fail with `NotFound`
//! 2. **One writer** - only the [`World`] changes hierarchy and ownership;
//!    component callbacks record deferred commands
//! 3. **Errors are values** - every rule violation is an `Err`, never a panic
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{GameObjectDesc, MsgRouting, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default())?;
//! let station = world.create_object(GameObjectDesc::new("station"))?;
//! let dock = world.create_object(GameObjectDesc::new("dock").with_parent(station))?;
//!
//! world.send_message(station, Alarm, MsgRouting::TO_CHILDREN)?;
//! world.tick(1.0 / 60.0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod error;
pub mod handle;
pub mod math;
pub mod memory;
pub mod message;
pub mod object;
pub mod sync;
pub mod world;

mod names;

pub use component::{Component, ComponentContext, ComponentManager};
pub use config::WorldConfig;
pub use error::{ComponentError, InvariantViolation, WorldError, WorldResult};
pub use handle::{ComponentHandle, ComponentTypeId, GameObjectHandle, Handle, HandleKind, RawHandle};
pub use math::{Quat, Transform, Vec3};
pub use memory::HandleTable;
pub use message::{Message, MessageType, MessageTypeId, MsgRouting};
pub use object::{GameObject, GameObjectDesc, ObjectFlags};
pub use sync::{ReadMarker, SharedWorld, WriteMarker};
pub use world::{
    AppliedCommands, ChildIter, Command, CommandBuffer, DrainStats, MessageSender, SpawnFn,
    TickStats, World, WorldContext, WorldView,
};
