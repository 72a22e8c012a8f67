//! # Component Managers
//!
//! One manager per concrete component type. The manager owns the backing
//! storage; the world reaches it through the type-erased [`ErasedManager`]
//! surface when it only has a [`ComponentHandle`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::{Component, ComponentContext};
use crate::error::{ComponentError, InvariantViolation, WorldError, WorldResult};
use crate::handle::{
    ComponentHandle, ComponentTypeId, GameObjectHandle, Handle, HandleKind, RawHandle,
};
use crate::memory::HandleTable;
use crate::message::Message;
use crate::world::{CommandBuffer, WorldContext, WorldView};

/// Slot of a component inside its manager's table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ComponentSlot(RawHandle);

impl Handle for ComponentSlot {
    const KIND: HandleKind = HandleKind::Component;

    #[inline]
    fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    #[inline]
    fn raw(self) -> RawHandle {
        self.0
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentSlot({:?})", self.0)
    }
}

/// Storage record of one component.
struct Entry<C> {
    owner: Option<GameObjectHandle>,
    /// Cached from `Component::is_dynamic` at creation.
    dynamic: bool,
    /// `None` while checked out for an unlocked initialize/deinitialize.
    value: Option<C>,
}

/// Storage pool for all components of type `C`.
///
/// # Example
///
/// ```rust,ignore
/// let manager = world.component_manager::<Collidable>()?;
/// for (handle, collidable) in manager.components() {
///     // ...
/// }
/// ```
pub struct ComponentManager<C: Component> {
    type_id: ComponentTypeId,
    entries: HandleTable<Entry<C>, ComponentSlot>,
}

impl<C: Component> ComponentManager<C> {
    pub(crate) fn new(type_id: ComponentTypeId, capacity: usize, max_slots: usize) -> Self {
        Self {
            type_id,
            entries: HandleTable::with_capacity(capacity, max_slots),
        }
    }

    /// Registered type id of `C` in this world.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Number of live components (attached or not).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no live components.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn handle(&self, slot: ComponentSlot) -> ComponentHandle {
        ComponentHandle::new(self.type_id, slot.raw())
    }

    fn slot(&self, handle: ComponentHandle) -> WorldResult<ComponentSlot> {
        if handle.type_id() != self.type_id {
            return Err(WorldError::ComponentTypeMismatch {
                expected: std::any::type_name::<C>(),
            });
        }
        Ok(ComponentSlot::from_raw(handle.slot()))
    }

    fn entry(&self, handle: ComponentHandle) -> WorldResult<&Entry<C>> {
        self.entries.get(self.slot(handle)?)
    }

    fn entry_mut(&mut self, handle: ComponentHandle) -> WorldResult<&mut Entry<C>> {
        let slot = self.slot(handle)?;
        self.entries.get_mut(slot)
    }

    /// Resolves a handle to the component value.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotFound`] for stale handles (or a component checked out
    /// by a concurrent attach), [`WorldError::ComponentTypeMismatch`] for
    /// handles of another type.
    pub fn get(&self, handle: ComponentHandle) -> WorldResult<&C> {
        self.entry(handle)?
            .value
            .as_ref()
            .ok_or(WorldError::NotFound { kind: HandleKind::Component })
    }

    /// Resolves a handle to the component value, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentManager::get`].
    pub fn get_mut(&mut self, handle: ComponentHandle) -> WorldResult<&mut C> {
        self.entry_mut(handle)?
            .value
            .as_mut()
            .ok_or(WorldError::NotFound { kind: HandleKind::Component })
    }

    /// Returns the owning object, `None` while unattached.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentManager::get`].
    pub fn owner(&self, handle: ComponentHandle) -> WorldResult<Option<GameObjectHandle>> {
        Ok(self.entry(handle)?.owner)
    }

    /// Iterates over every component of this type.
    pub fn components(&self) -> impl Iterator<Item = (ComponentHandle, &C)> {
        let type_id = self.type_id;
        self.entries.iter().filter_map(move |(slot, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (ComponentHandle::new(type_id, slot.raw()), value))
        })
    }

    /// Iterates mutably over every component of this type.
    pub fn components_mut(&mut self) -> impl Iterator<Item = (ComponentHandle, &mut C)> {
        let type_id = self.type_id;
        self.entries.iter_mut().filter_map(move |(slot, entry)| {
            entry
                .value
                .as_mut()
                .map(|value| (ComponentHandle::new(type_id, slot.raw()), value))
        })
    }

    pub(crate) fn insert(&mut self, value: C) -> WorldResult<ComponentHandle> {
        let dynamic = value.is_dynamic();
        let slot = self.entries.allocate(Entry {
            owner: None,
            dynamic,
            value: Some(value),
        })?;
        Ok(self.handle(slot))
    }

    fn checked_in_mut(&mut self, handle: ComponentHandle) -> WorldResult<&mut C> {
        self.entry_mut(handle)?
            .value
            .as_mut()
            .ok_or(WorldError::InvariantViolation(InvariantViolation::ComponentCheckedOut))
    }
}

/// A component value taken out of its manager, so that its lifecycle hooks
/// can run while the world is not borrowed or locked.
pub(crate) trait Detached: Send {
    fn run_initialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError>;
    fn run_deinitialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError>;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<C: Component> Detached for C {
    fn run_initialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        Component::initialize(self, ctx)
    }

    fn run_deinitialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        Component::deinitialize(self, ctx)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Type-erased manager surface used by the world.
pub(crate) trait ErasedManager: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn len(&self) -> usize;
    fn contains(&self, handle: ComponentHandle) -> bool;
    fn owner(&self, handle: ComponentHandle) -> WorldResult<Option<GameObjectHandle>>;
    fn set_owner(
        &mut self,
        handle: ComponentHandle,
        owner: Option<GameObjectHandle>,
    ) -> WorldResult<()>;
    fn is_dynamic(&self, handle: ComponentHandle) -> WorldResult<bool>;
    fn initialize(
        &mut self,
        handle: ComponentHandle,
        ctx: &ComponentContext,
    ) -> WorldResult<Result<(), ComponentError>>;
    fn deinitialize(
        &mut self,
        handle: ComponentHandle,
        ctx: &ComponentContext,
    ) -> WorldResult<Result<(), ComponentError>>;
    fn on_message(&mut self, handle: ComponentHandle, msg: &dyn Message, ctx: &mut WorldContext<'_>);
    /// Updates every attached dynamic component. Returns how many ran.
    fn update_all(&mut self, view: WorldView<'_>, commands: &mut CommandBuffer, delta_seconds: f32)
        -> usize;
    /// Creates an unattached copy. `Ok(None)` if the type cannot duplicate.
    fn duplicate(&mut self, handle: ComponentHandle) -> WorldResult<Option<ComponentHandle>>;
    fn destroy(&mut self, handle: ComponentHandle) -> WorldResult<()>;
    fn check_out(&mut self, handle: ComponentHandle) -> WorldResult<Box<dyn Detached>>;
    fn check_in(&mut self, handle: ComponentHandle, value: Box<dyn Detached>) -> WorldResult<()>;
}

impl<C: Component> ErasedManager for ComponentManager<C> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, handle: ComponentHandle) -> bool {
        self.entry(handle).is_ok()
    }

    fn owner(&self, handle: ComponentHandle) -> WorldResult<Option<GameObjectHandle>> {
        Ok(self.entry(handle)?.owner)
    }

    fn set_owner(
        &mut self,
        handle: ComponentHandle,
        owner: Option<GameObjectHandle>,
    ) -> WorldResult<()> {
        self.entry_mut(handle)?.owner = owner;
        Ok(())
    }

    fn is_dynamic(&self, handle: ComponentHandle) -> WorldResult<bool> {
        Ok(self.entry(handle)?.dynamic)
    }

    fn initialize(
        &mut self,
        handle: ComponentHandle,
        ctx: &ComponentContext,
    ) -> WorldResult<Result<(), ComponentError>> {
        let value = self.checked_in_mut(handle)?;
        Ok(Component::initialize(value, ctx))
    }

    fn deinitialize(
        &mut self,
        handle: ComponentHandle,
        ctx: &ComponentContext,
    ) -> WorldResult<Result<(), ComponentError>> {
        let value = self.checked_in_mut(handle)?;
        Ok(Component::deinitialize(value, ctx))
    }

    fn on_message(&mut self, handle: ComponentHandle, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
        // Checked-out and stale components simply miss the message.
        if let Ok(value) = self.checked_in_mut(handle) {
            Component::on_message(value, msg, ctx);
        }
    }

    fn update_all(
        &mut self,
        view: WorldView<'_>,
        commands: &mut CommandBuffer,
        delta_seconds: f32,
    ) -> usize {
        let type_id = self.type_id;
        let mut updated = 0;
        for (slot, entry) in self.entries.iter_mut() {
            let (Some(owner), true, Some(value)) = (entry.owner, entry.dynamic, entry.value.as_mut())
            else {
                continue;
            };
            let component = ComponentHandle::new(type_id, slot.raw());
            let mut ctx = WorldContext::new(view, commands, owner, component, delta_seconds);
            Component::update(value, &mut ctx);
            updated += 1;
        }
        updated
    }

    fn duplicate(&mut self, handle: ComponentHandle) -> WorldResult<Option<ComponentHandle>> {
        let Some(copy) = self.get(handle)?.duplicate() else {
            return Ok(None);
        };
        self.insert(copy).map(Some)
    }

    fn destroy(&mut self, handle: ComponentHandle) -> WorldResult<()> {
        let slot = self.slot(handle)?;
        if self.entries.get(slot)?.value.is_none() {
            return Err(InvariantViolation::ComponentCheckedOut.into());
        }
        self.entries.free(slot).map(drop)
    }

    fn check_out(&mut self, handle: ComponentHandle) -> WorldResult<Box<dyn Detached>> {
        let value = self
            .entry_mut(handle)?
            .value
            .take()
            .ok_or(WorldError::InvariantViolation(InvariantViolation::ComponentCheckedOut))?;
        Ok(Box::new(value))
    }

    fn check_in(&mut self, handle: ComponentHandle, value: Box<dyn Detached>) -> WorldResult<()> {
        let value = value
            .into_any()
            .downcast::<C>()
            .map_err(|_| WorldError::ComponentTypeMismatch {
                expected: std::any::type_name::<C>(),
            })?;
        let entry = self.entry_mut(handle)?;
        entry.value = Some(*value);
        Ok(())
    }
}

/// All component managers of a world, indexed by [`ComponentTypeId`].
#[derive(Default)]
pub(crate) struct ComponentRegistry {
    managers: Vec<Box<dyn ErasedManager>>,
    by_type: HashMap<TypeId, ComponentTypeId>,
}

impl ComponentRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `C`, or returns its id if already registered.
    pub(crate) fn register<C: Component>(
        &mut self,
        capacity: usize,
        max_slots: usize,
    ) -> WorldResult<ComponentTypeId> {
        if let Some(&id) = self.by_type.get(&TypeId::of::<C>()) {
            return Ok(id);
        }
        // u16::MAX is reserved for the null handle.
        let raw = u16::try_from(self.managers.len())
            .ok()
            .filter(|&raw| raw < u16::MAX)
            .ok_or(WorldError::CapacityExceeded {
                kind: HandleKind::Component,
                capacity: u16::MAX as usize,
            })?;
        let id = ComponentTypeId(raw);
        self.managers
            .push(Box::new(ComponentManager::<C>::new(id, capacity, max_slots)));
        self.by_type.insert(TypeId::of::<C>(), id);
        tracing::debug!(
            "Registered component type {} as {}",
            std::any::type_name::<C>(),
            raw
        );
        Ok(id)
    }

    pub(crate) fn type_id_of<C: Component>(&self) -> WorldResult<ComponentTypeId> {
        self.by_type
            .get(&TypeId::of::<C>())
            .copied()
            .ok_or(WorldError::UnregisteredComponentType(std::any::type_name::<C>()))
    }

    pub(crate) fn manager(&self, id: ComponentTypeId) -> WorldResult<&dyn ErasedManager> {
        self.managers
            .get(usize::from(id.0))
            .map(AsRef::as_ref)
            .ok_or(WorldError::NotFound { kind: HandleKind::Component })
    }

    pub(crate) fn manager_mut(&mut self, id: ComponentTypeId) -> WorldResult<&mut dyn ErasedManager> {
        match self.managers.get_mut(usize::from(id.0)) {
            Some(manager) => Ok(manager.as_mut()),
            None => Err(WorldError::NotFound { kind: HandleKind::Component }),
        }
    }

    pub(crate) fn typed<C: Component>(&self) -> WorldResult<&ComponentManager<C>> {
        let id = self.type_id_of::<C>()?;
        self.manager(id)?
            .as_any()
            .downcast_ref::<ComponentManager<C>>()
            .ok_or(WorldError::ComponentTypeMismatch {
                expected: std::any::type_name::<C>(),
            })
    }

    pub(crate) fn typed_mut<C: Component>(&mut self) -> WorldResult<&mut ComponentManager<C>> {
        let id = self.type_id_of::<C>()?;
        self.manager_mut(id)?
            .as_any_mut()
            .downcast_mut::<ComponentManager<C>>()
            .ok_or(WorldError::ComponentTypeMismatch {
                expected: std::any::type_name::<C>(),
            })
    }

    pub(crate) fn managers_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ErasedManager>> {
        self.managers.iter_mut()
    }

    pub(crate) fn total_len(&self) -> usize {
        self.managers.iter().map(|manager| manager.len()).sum()
    }

    pub(crate) fn type_count(&self) -> usize {
        self.managers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(u32);

    impl Component for Marker {
        fn duplicate(&self) -> Option<Self> {
            Some(self.clone())
        }
    }

    struct Thruster;

    impl Component for Thruster {
        fn is_dynamic(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<Marker>(4, 0).unwrap();
        let b = registry.register::<Thruster>(4, 0).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.register::<Marker>(4, 0).unwrap(), a);
        assert_eq!(registry.type_count(), 2);
    }

    #[test]
    fn test_unregistered_type() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.type_id_of::<Marker>(),
            Err(WorldError::UnregisteredComponentType(_))
        ));
    }

    #[test]
    fn test_insert_get_and_type_mismatch() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Marker>(4, 0).unwrap();
        registry.register::<Thruster>(4, 0).unwrap();

        let handle = registry.typed_mut::<Marker>().unwrap().insert(Marker(9)).unwrap();
        assert_eq!(registry.typed::<Marker>().unwrap().get(handle).unwrap(), &Marker(9));
        assert!(matches!(
            registry.typed::<Thruster>().unwrap().get(handle),
            Err(WorldError::ComponentTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_dynamic_flag_is_cached() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Thruster>(4, 0).unwrap();
        let handle = registry.typed_mut::<Thruster>().unwrap().insert(Thruster).unwrap();
        let manager = registry.manager(handle.type_id()).unwrap();
        assert!(manager.is_dynamic(handle).unwrap());
        assert_eq!(manager.owner(handle).unwrap(), None);
    }

    #[test]
    fn test_check_out_and_in() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Marker>(4, 0).unwrap();
        let handle = registry.typed_mut::<Marker>().unwrap().insert(Marker(1)).unwrap();

        let manager = registry.manager_mut(handle.type_id()).unwrap();
        let detached = manager.check_out(handle).unwrap();

        // Checked out: invisible to lookups, cannot be checked out twice.
        assert!(manager.check_out(handle).is_err());
        assert!(manager.destroy(handle).is_err());
        assert!(registry.typed::<Marker>().unwrap().get(handle).is_err());

        let manager = registry.manager_mut(handle.type_id()).unwrap();
        manager.check_in(handle, detached).unwrap();
        assert_eq!(registry.typed::<Marker>().unwrap().get(handle).unwrap(), &Marker(1));
    }

    #[test]
    fn test_duplicate_and_destroy() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Marker>(4, 0).unwrap();
        registry.register::<Thruster>(4, 0).unwrap();
        let marker = registry.typed_mut::<Marker>().unwrap().insert(Marker(5)).unwrap();
        let thruster = registry.typed_mut::<Thruster>().unwrap().insert(Thruster).unwrap();

        let copy = registry
            .manager_mut(marker.type_id())
            .unwrap()
            .duplicate(marker)
            .unwrap()
            .unwrap();
        assert_ne!(copy, marker);
        assert_eq!(registry.typed::<Marker>().unwrap().get(copy).unwrap(), &Marker(5));

        assert!(registry
            .manager_mut(thruster.type_id())
            .unwrap()
            .duplicate(thruster)
            .unwrap()
            .is_none());

        registry.manager_mut(marker.type_id()).unwrap().destroy(marker).unwrap();
        assert!(!registry.manager(marker.type_id()).unwrap().contains(marker));
        assert_eq!(registry.total_len(), 2);
    }
}
