//! Read-only world access and the context handed to component callbacks.

use std::iter::FusedIterator;

use super::commands::{Command, CommandBuffer};
use crate::error::WorldResult;
use crate::handle::{ComponentHandle, GameObjectHandle, TransformHandle};
use crate::math::{Quat, Transform, Vec3};
use crate::memory::HandleTable;
use crate::message::{MessageType, MsgRouting};
use crate::names::NameTable;
use crate::object::{GameObject, GameObjectDesc, TransformData};
use crate::world::World;

/// Shared borrow of the world's object, transform and name tables.
///
/// Component callbacks receive one of these while their manager is borrowed
/// mutably, so they can inspect the hierarchy but never change it directly.
#[derive(Clone, Copy)]
pub struct WorldView<'w> {
    pub(crate) objects: &'w HandleTable<GameObject, GameObjectHandle>,
    pub(crate) transforms: &'w HandleTable<TransformData, TransformHandle>,
    pub(crate) names: &'w NameTable,
}

impl<'w> WorldView<'w> {
    /// Returns `true` if `object` refers to a live object.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, object: GameObjectHandle) -> bool {
        self.objects.contains(object)
    }

    /// Resolves an object handle.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    #[inline]
    pub fn object(&self, object: GameObjectHandle) -> WorldResult<&'w GameObject> {
        self.objects.get(object)
    }

    /// Returns the parent of `object`.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn parent(&self, object: GameObjectHandle) -> WorldResult<Option<GameObjectHandle>> {
        Ok(self.object(object)?.parent)
    }

    /// Iterates over the direct children of `object` in sibling order.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn children(&self, object: GameObjectHandle) -> WorldResult<ChildIter<'w>> {
        let first = self.object(object)?.first_child;
        Ok(ChildIter {
            objects: self.objects,
            next: first,
        })
    }

    /// Returns the hierarchy level of `object`.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn hierarchy_level(&self, object: GameObjectHandle) -> WorldResult<u32> {
        Ok(self.object(object)?.hierarchy_level)
    }

    /// Returns `true` if `object` is dynamic.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn is_dynamic(&self, object: GameObjectHandle) -> WorldResult<bool> {
        Ok(self.object(object)?.is_dynamic())
    }

    /// Returns the components attached to `object`.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn components(&self, object: GameObjectHandle) -> WorldResult<&'w [ComponentHandle]> {
        Ok(&self.object(object)?.components)
    }

    /// Returns the name of `object`, if it has one.
    #[must_use]
    pub fn name(&self, object: GameObjectHandle) -> Option<&'w str> {
        self.names.get(object)
    }

    fn transform(&self, object: GameObjectHandle) -> WorldResult<&'w TransformData> {
        self.transforms.get(self.object(object)?.transform)
    }

    /// Returns the transform of `object` relative to its parent.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn local_transform(&self, object: GameObjectHandle) -> WorldResult<Transform> {
        Ok(self.transform(object)?.local)
    }

    /// Returns the world-space transform of `object` as of the last
    /// propagation.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn global_transform(&self, object: GameObjectHandle) -> WorldResult<Transform> {
        Ok(self.transform(object)?.global)
    }
}

/// Forward iterator over an object's direct children.
///
/// Each step is a checked lookup; a stale link ends the iteration.
#[derive(Clone)]
pub struct ChildIter<'w> {
    objects: &'w HandleTable<GameObject, GameObjectHandle>,
    next: Option<GameObjectHandle>,
}

impl Iterator for ChildIter<'_> {
    type Item = GameObjectHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let object = self.objects.get(current).ok()?;
        self.next = object.next_sibling;
        Some(current)
    }
}

impl FusedIterator for ChildIter<'_> {}

/// Context for [`Component::on_message`](crate::Component::on_message) and
/// [`Component::update`](crate::Component::update).
///
/// Reads go through [`WorldContext::view`]. Every structural change is
/// recorded as a command and applied by the world once the current dispatch
/// or update pass is over.
pub struct WorldContext<'w> {
    view: WorldView<'w>,
    commands: &'w mut CommandBuffer,
    owner: GameObjectHandle,
    component: ComponentHandle,
    delta_seconds: f32,
    routing: MsgRouting,
}

impl<'w> WorldContext<'w> {
    pub(crate) fn new(
        view: WorldView<'w>,
        commands: &'w mut CommandBuffer,
        owner: GameObjectHandle,
        component: ComponentHandle,
        delta_seconds: f32,
    ) -> Self {
        Self {
            view,
            commands,
            owner,
            component,
            delta_seconds,
            routing: MsgRouting::DEFAULT,
        }
    }

    pub(crate) fn with_routing(mut self, routing: MsgRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Object owning the component being called.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> GameObjectHandle {
        self.owner
    }

    /// Handle of the component being called.
    #[inline]
    #[must_use]
    pub const fn component(&self) -> ComponentHandle {
        self.component
    }

    /// Seconds covered by the current tick.
    #[inline]
    #[must_use]
    pub const fn delta_seconds(&self) -> f32 {
        self.delta_seconds
    }

    /// Routing of the message being delivered, without `QUEUED`. `DEFAULT`
    /// during updates.
    #[inline]
    #[must_use]
    pub const fn routing(&self) -> MsgRouting {
        self.routing
    }

    /// Read-only view of the world.
    #[inline]
    #[must_use]
    pub fn view(&self) -> WorldView<'w> {
        self.view
    }

    /// Deferred command buffer, for commands without a shortcut below.
    #[inline]
    pub fn commands(&mut self) -> &mut CommandBuffer {
        self.commands
    }

    /// Sends a message. Immediate messages are dispatched right after the
    /// current dispatch finishes; `QUEUED` ones wait for the drain point.
    pub fn send_message(
        &mut self,
        target: GameObjectHandle,
        message: impl MessageType,
        routing: MsgRouting,
    ) {
        self.commands.push(Command::SendMessage {
            target,
            message: Box::new(message),
            routing,
        });
    }

    /// Deletes an object, possibly the owner itself.
    pub fn delete_object(&mut self, object: GameObjectHandle) {
        self.commands.push(Command::DeleteObject(object));
    }

    /// Deletes a component.
    pub fn delete_component(&mut self, component: ComponentHandle) {
        self.commands.push(Command::DeleteComponent(component));
    }

    /// Moves an object relative to its parent.
    pub fn set_local_position(&mut self, object: GameObjectHandle, position: Vec3) {
        self.commands.push(Command::SetLocalPosition(object, position));
    }

    /// Rotates an object relative to its parent.
    pub fn set_local_rotation(&mut self, object: GameObjectHandle, rotation: Quat) {
        self.commands.push(Command::SetLocalRotation(object, rotation));
    }

    /// Reparents an object.
    pub fn set_parent(&mut self, child: GameObjectHandle, parent: Option<GameObjectHandle>) {
        self.commands.push(Command::SetParent { child, parent });
    }

    /// Creates an object, then runs `build` on it, e.g. to attach components.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// ctx.spawn(GameObjectDesc::new("bullet").dynamic(), |world, bullet| {
    ///     let projectile = world.create_component(Projectile::new(3.0))?;
    ///     world.add_component(bullet, projectile)
    /// });
    /// ```
    pub fn spawn<F>(&mut self, desc: GameObjectDesc, build: F)
    where
        F: FnOnce(&mut World, GameObjectHandle) -> WorldResult<()> + Send + Sync + 'static,
    {
        self.commands.push(Command::Spawn {
            desc,
            build: Box::new(build),
        });
    }
}
