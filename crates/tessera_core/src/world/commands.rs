//! # Deferred Commands
//!
//! Component callbacks run while their manager is borrowed, so they cannot
//! change the world structure directly. They record [`Command`]s instead,
//! which the world applies in recording order once the callback pass ends.
//!
//! Application points:
//!
//! - after each immediate message dispatch,
//! - after the update pass of a tick,
//! - after each message handled at the drain point.
//!
//! A command whose target died in the meantime fails with `NotFound`; the
//! failure is logged and the remaining commands still run.

use std::fmt;

use crate::error::WorldResult;
use crate::handle::{ComponentHandle, GameObjectHandle};
use crate::math::{Quat, Transform, Vec3};
use crate::message::{Message, MsgRouting};
use crate::object::GameObjectDesc;
use crate::world::World;

/// Upper bound on apply passes per application point. Commands produced
/// beyond it stay buffered for the next application point.
const MAX_APPLY_PASSES: usize = 64;

/// Builder run against a freshly spawned object.
pub type SpawnFn = Box<dyn FnOnce(&mut World, GameObjectHandle) -> WorldResult<()> + Send + Sync>;

/// A deferred structural change.
pub enum Command {
    /// Deletes an object and its subtree.
    DeleteObject(GameObjectHandle),
    /// Detaches and destroys a component.
    DeleteComponent(ComponentHandle),
    /// Attaches an unowned component.
    AddComponent {
        /// Receiving object.
        object: GameObjectHandle,
        /// Component to attach.
        component: ComponentHandle,
    },
    /// Detaches a component without destroying it.
    RemoveComponent {
        /// Current owner.
        object: GameObjectHandle,
        /// Component to detach.
        component: ComponentHandle,
    },
    /// Promotes an object to dynamic.
    MakeDynamic(GameObjectHandle),
    /// Replaces the local transform.
    SetLocalTransform(GameObjectHandle, Transform),
    /// Replaces the local position.
    SetLocalPosition(GameObjectHandle, Vec3),
    /// Replaces the local rotation.
    SetLocalRotation(GameObjectHandle, Quat),
    /// Reparents an object, `None` makes it a root.
    SetParent {
        /// Object to move.
        child: GameObjectHandle,
        /// New parent.
        parent: Option<GameObjectHandle>,
    },
    /// Creates an object and runs a builder on it.
    Spawn {
        /// Object description.
        desc: GameObjectDesc,
        /// Runs once the object exists.
        build: SpawnFn,
    },
    /// Sends a message, immediately or queued depending on `routing`.
    SendMessage {
        /// Receiving object.
        target: GameObjectHandle,
        /// Payload.
        message: Box<dyn Message>,
        /// Routing policy.
        routing: MsgRouting,
    },
}

impl Command {
    fn apply(self, world: &mut World) -> WorldResult<()> {
        match self {
            Self::DeleteObject(object) => world.delete_object(object),
            Self::DeleteComponent(component) => world.delete_component(component),
            Self::AddComponent { object, component } => world.add_component(object, component),
            Self::RemoveComponent { object, component } => {
                world.remove_component(object, component)
            }
            Self::MakeDynamic(object) => world.make_dynamic(object),
            Self::SetLocalTransform(object, transform) => {
                world.set_local_transform(object, transform)
            }
            Self::SetLocalPosition(object, position) => world.set_local_position(object, position),
            Self::SetLocalRotation(object, rotation) => world.set_local_rotation(object, rotation),
            Self::SetParent { child, parent } => world.set_parent(child, parent),
            Self::Spawn { desc, build } => {
                let object = world.create_object(desc)?;
                let built = build(world, object);
                if built.is_err() && world.is_alive(object) {
                    world.delete_object(object)?;
                }
                built
            }
            Self::SendMessage {
                target,
                message,
                routing,
            } => world.post_boxed(target, message, routing),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteObject(object) => f.debug_tuple("DeleteObject").field(object).finish(),
            Self::DeleteComponent(component) => {
                f.debug_tuple("DeleteComponent").field(component).finish()
            }
            Self::AddComponent { object, component } => f
                .debug_struct("AddComponent")
                .field("object", object)
                .field("component", component)
                .finish(),
            Self::RemoveComponent { object, component } => f
                .debug_struct("RemoveComponent")
                .field("object", object)
                .field("component", component)
                .finish(),
            Self::MakeDynamic(object) => f.debug_tuple("MakeDynamic").field(object).finish(),
            Self::SetLocalTransform(object, _) => {
                f.debug_tuple("SetLocalTransform").field(object).finish()
            }
            Self::SetLocalPosition(object, position) => f
                .debug_tuple("SetLocalPosition")
                .field(object)
                .field(position)
                .finish(),
            Self::SetLocalRotation(object, _) => {
                f.debug_tuple("SetLocalRotation").field(object).finish()
            }
            Self::SetParent { child, parent } => f
                .debug_struct("SetParent")
                .field("child", child)
                .field("parent", parent)
                .finish(),
            Self::Spawn { desc, .. } => f.debug_struct("Spawn").field("desc", desc).finish(),
            Self::SendMessage {
                target,
                message,
                routing,
            } => f
                .debug_struct("SendMessage")
                .field("target", target)
                .field("message", message)
                .field("routing", routing)
                .finish(),
        }
    }
}

/// Ordered list of pending commands.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a command.
    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Number of recorded commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing is recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

/// Outcome of one application point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppliedCommands {
    /// Commands that ran successfully.
    pub applied: usize,
    /// Commands that returned an error.
    pub failed: usize,
}

impl AppliedCommands {
    pub(crate) fn merge(&mut self, other: Self) {
        self.applied += other.applied;
        self.failed += other.failed;
    }
}

impl World {
    /// Applies buffered commands, including those recorded while applying.
    pub(crate) fn apply_commands(&mut self) -> AppliedCommands {
        let mut outcome = AppliedCommands::default();
        for _ in 0..MAX_APPLY_PASSES {
            if self.commands.is_empty() {
                return outcome;
            }
            for command in self.commands.take() {
                match command.apply(self) {
                    Ok(()) => outcome.applied += 1,
                    Err(e) => {
                        tracing::debug!("Deferred command failed: {}", e);
                        outcome.failed += 1;
                    }
                }
            }
        }
        if !self.commands.is_empty() {
            tracing::warn!(
                "{} commands still pending after {} passes, deferring",
                self.commands.len(),
                MAX_APPLY_PASSES
            );
        }
        outcome
    }
}
