//! # World
//!
//! The central container for game objects, their transforms and their
//! components. The world is the only place where hierarchy structure and
//! component ownership change.
//!
//! ## Tick
//!
//! ```text
//!  tick(dt)
//!   │
//!   ├─ 1. mailbox      cross-thread posts ──> message queue
//!   ├─ 2. update       every attached dynamic component
//!   ├─ 3. commands     deferred structural changes
//!   ├─ 4. transforms   dynamic objects, by hierarchy level
//!   ├─ 5. drain        queue snapshot, FIFO
//!   └─ 6. commands
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut world = World::new(WorldConfig::default())?;
//! let ship = world.create_object(GameObjectDesc::new("ship").dynamic())?;
//! let engine = world.create_component(Thruster::default())?;
//! world.add_component(ship, engine)?;
//!
//! world.tick(1.0 / 60.0);
//! ```

mod attach;
mod commands;
mod hierarchy;
mod messaging;
mod view;

pub use commands::{AppliedCommands, Command, CommandBuffer, SpawnFn};
pub use messaging::{DrainStats, MessageSender, TickStats};
pub use view::{ChildIter, WorldContext, WorldView};

use std::collections::{HashMap, VecDeque};

use crossbeam_channel::{Receiver, Sender};

use crate::component::ComponentRegistry;
use crate::config::WorldConfig;
use crate::error::{InvariantViolation, WorldError, WorldResult};
use crate::handle::{GameObjectHandle, HandleKind, TransformHandle};
use crate::math::Transform;
use crate::memory::HandleTable;
use crate::names::NameTable;
use crate::object::{GameObject, GameObjectDesc, TransformData};
use messaging::QueuedMessage;

/// Logs a rejected operation and passes the result through.
pub(crate) fn logged<T>(operation: &'static str, result: WorldResult<T>) -> WorldResult<T> {
    if let Err(e) = &result {
        tracing::warn!("{} rejected: {}", operation, e);
    }
    result
}

/// Owner of all game objects and components.
pub struct World {
    config: WorldConfig,

    objects: HandleTable<GameObject, GameObjectHandle>,
    transforms: HandleTable<TransformData, TransformHandle>,
    names: NameTable,
    persistent_ids: HashMap<u64, GameObjectHandle>,
    registry: ComponentRegistry,

    queue: VecDeque<QueuedMessage>,
    mailbox_tx: Sender<QueuedMessage>,
    mailbox_rx: Receiver<QueuedMessage>,
    commands: CommandBuffer,

    tick: u64,
    delta_seconds: f32,
}

impl World {
    /// Creates an empty world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the configuration is invalid.
    pub fn new(config: WorldConfig) -> WorldResult<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: WorldConfig) -> Self {
        let (mailbox_tx, mailbox_rx) = crossbeam_channel::unbounded();
        tracing::debug!(
            "Creating world: {} object slots reserved, max {}",
            config.initial_object_capacity,
            config.max_objects
        );
        Self {
            objects: HandleTable::with_capacity(config.initial_object_capacity, config.max_objects),
            transforms: HandleTable::with_capacity(
                config.initial_object_capacity,
                config.max_objects,
            ),
            names: NameTable::new(),
            persistent_ids: HashMap::new(),
            registry: ComponentRegistry::new(),
            queue: VecDeque::new(),
            mailbox_tx,
            mailbox_rx,
            commands: CommandBuffer::new(),
            tick: 0,
            delta_seconds: 0.0,
            config,
        }
    }

    /// Returns the configuration the world was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read-only view over objects, transforms and names.
    #[inline]
    #[must_use]
    pub fn view(&self) -> WorldView<'_> {
        WorldView {
            objects: &self.objects,
            transforms: &self.transforms,
            names: &self.names,
        }
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Creates an object from a description.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent is stale.
    /// - `HierarchyTooDeep` if the parent is at the maximum level.
    /// - `CapacityExceeded` if `max_objects` is reached.
    pub fn create_object(&mut self, desc: GameObjectDesc) -> WorldResult<GameObjectHandle> {
        logged("create_object", self.create_object_inner(desc))
    }

    fn create_object_inner(&mut self, desc: GameObjectDesc) -> WorldResult<GameObjectHandle> {
        let (level, parent_global) = match desc.parent {
            Some(parent) => {
                let level = self.objects.get(parent)?.hierarchy_level + 1;
                self.check_depth(level)?;
                (level, self.global_transform(parent)?)
            }
            None => (0, Transform::IDENTITY),
        };

        let local = desc.local_transform();
        let transform = self.transforms.allocate(TransformData {
            local,
            global: parent_global.compose(&local),
            owner: GameObjectHandle::NULL,
        })?;
        let handle = match self.objects.allocate(GameObject::new(
            GameObjectHandle::NULL,
            desc.persistent_id,
            desc.dynamic,
            transform,
        )) {
            Ok(handle) => handle,
            Err(e) => {
                self.transforms.free(transform)?;
                return Err(e);
            }
        };

        self.transforms.get_mut(transform)?.owner = handle;
        let object = self.objects.get_mut(handle)?;
        object.handle = handle;
        object.hierarchy_level = level;

        if let Some(parent) = desc.parent {
            self.link_child(parent, handle)?;
        }
        self.names.set(handle, &desc.name);
        if let Some(id) = desc.persistent_id {
            if let Some(previous) = self.persistent_ids.insert(id, handle) {
                tracing::warn!(
                    "Persistent id {} moved from {:?} to {:?}",
                    id,
                    previous,
                    handle
                );
            }
        }

        tracing::debug!("Created object {:?} '{}'", handle, desc.name);
        Ok(handle)
    }

    /// Deletes an object and its whole subtree, children first.
    ///
    /// Every attached component is deinitialized and destroyed. Deinitialize
    /// failures are logged and do not stop the deletion.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn delete_object(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        logged("delete_object", self.delete_object_inner(object))
    }

    fn delete_object_inner(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        self.objects.get(object)?;
        let subtree = self.subtree_pre_order(object);
        // Reverse pre-order puts every descendant before its ancestors.
        for &handle in subtree.iter().rev() {
            self.destroy_single_object(handle)?;
        }
        tracing::debug!("Deleted object {:?} ({} in subtree)", object, subtree.len());
        Ok(())
    }

    fn destroy_single_object(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        self.destroy_attached_components(object)?;
        self.unlink(object)?;

        let removed = self.objects.free(object)?;
        self.transforms.free(removed.transform)?;
        self.names.remove(object);
        if let Some(id) = removed.persistent_id {
            if self.persistent_ids.get(&id) == Some(&object) {
                self.persistent_ids.remove(&id);
            }
        }
        Ok(())
    }

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
    /// `NotFound` if the handle is stale.
    #[inline]
    pub fn try_get_object(&self, object: GameObjectHandle) -> WorldResult<&GameObject> {
        self.objects.get(object)
    }

    /// Iterates over all live objects.
    pub fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.iter().map(|(_, object)| object)
    }

    /// Number of live objects.
    #[inline]
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live components across all types, attached or not.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.total_len()
    }

    /// Number of messages waiting for the drain point, not counting posts
    /// still in the mailbox.
    #[inline]
    #[must_use]
    pub fn pending_message_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    // =========================================================================
    // Names and persistent ids
    // =========================================================================

    /// Sets the name of an object. An empty name clears it.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn set_object_name(&mut self, object: GameObjectHandle, name: &str) -> WorldResult<()> {
        logged("set_object_name", self.objects.get(object).map(|_| ()))?;
        self.names.set(object, name);
        Ok(())
    }

    /// Returns the name of an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn get_object_name(&self, object: GameObjectHandle) -> WorldResult<Option<&str>> {
        self.objects.get(object)?;
        Ok(self.names.get(object))
    }

    /// Finds an object by name. With several matches, the one in the lowest
    /// slot wins.
    #[must_use]
    pub fn find_object_by_name(&self, name: &str) -> Option<GameObjectHandle> {
        self.names.find(name).min_by_key(|handle| handle.index())
    }

    /// All objects carrying `name`, in unspecified order.
    pub fn find_objects_by_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = GameObjectHandle> + 'a {
        self.names.find(name)
    }

    /// Finds an object by its persistent id.
    #[must_use]
    pub fn find_object_by_persistent_id(&self, id: u64) -> Option<GameObjectHandle> {
        self.persistent_ids
            .get(&id)
            .copied()
            .filter(|&handle| self.objects.contains(handle))
    }

    fn check_depth(&self, level: u32) -> WorldResult<()> {
        let max = self.config.max_hierarchy_depth;
        if level > max {
            return Err(InvariantViolation::HierarchyTooDeep { depth: level, max }.into());
        }
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_valid_config(WorldConfig::default())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("objects", &self.objects.len())
            .field("components", &self.registry.total_len())
            .field("component_types", &self.registry.type_count())
            .field("pending_messages", &self.queue.len())
            .field("tick", &self.tick)
            .finish()
    }
}

impl WorldError {
    pub(crate) const fn object_not_found() -> Self {
        Self::NotFound {
            kind: HandleKind::GameObject,
        }
    }

    pub(crate) const fn component_not_found() -> Self {
        Self::NotFound {
            kind: HandleKind::Component,
        }
    }
}
