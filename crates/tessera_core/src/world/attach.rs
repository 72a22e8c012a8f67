//! Component creation, attachment and the dynamic/static classification.

use super::{logged, World};
use crate::component::{Component, ComponentContext, ComponentManager, Detached};
use crate::error::{InvariantViolation, WorldError, WorldResult};
use crate::handle::{ComponentHandle, ComponentTypeId, GameObjectHandle};
use crate::object::{GameObjectDesc, ObjectFlags};

impl World {
    // =========================================================================
    // Registration and storage
    // =========================================================================

    /// Registers a component type. Registering twice returns the same id.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` once the type id space is exhausted.
    pub fn register_component_type<C: Component>(&mut self) -> WorldResult<ComponentTypeId> {
        self.registry.register::<C>(
            self.config.initial_component_capacity,
            self.config.max_components_per_type,
        )
    }

    /// Stores a new, unattached component, registering its type on first use.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if the type's manager is full.
    pub fn create_component<C: Component>(&mut self, value: C) -> WorldResult<ComponentHandle> {
        self.register_component_type::<C>()?;
        logged(
            "create_component",
            self.registry.typed_mut::<C>()?.insert(value),
        )
    }

    /// Destroys a component, detaching it from its owner first.
    ///
    /// The slot is freed even if deinitialize fails; that failure is then
    /// returned as `DeinitializationFailed`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle is stale.
    /// - `ComponentCheckedOut` while a concurrent attach or detach holds it.
    pub fn delete_component(&mut self, component: ComponentHandle) -> WorldResult<()> {
        logged("delete_component", self.delete_component_inner(component))
    }

    fn delete_component_inner(&mut self, component: ComponentHandle) -> WorldResult<()> {
        let owner = self.registry.manager(component.type_id())?.owner(component)?;
        let detached = match owner {
            Some(owner) => {
                let listed = self
                    .objects
                    .get(owner)
                    .is_ok_and(|object| object.has_component(component));
                if !listed {
                    return Err(InvariantViolation::ComponentCheckedOut.into());
                }
                self.remove_component_inner(owner, component)
            }
            None => Ok(()),
        };
        self.registry
            .manager_mut(component.type_id())?
            .destroy(component)?;
        tracing::debug!("Deleted component {:?}", component);
        detached
    }

    /// Detaches and destroys every component of an object being deleted.
    pub(crate) fn destroy_attached_components(
        &mut self,
        object: GameObjectHandle,
    ) -> WorldResult<()> {
        // Removal swaps entries around, so always take the tail.
        while let Some(&component) = self.objects.get(object)?.components.last() {
            if let Err(e) = self.remove_component_inner(object, component) {
                tracing::warn!("Deinitialize during delete of {:?}: {}", object, e);
                if let Ok(position) = self.listed_position(object, component) {
                    self.objects.get_mut(object)?.components.swap_remove(position);
                }
            }
            self.registry
                .manager_mut(component.type_id())?
                .destroy(component)?;
        }
        Ok(())
    }

    /// Returns the manager of component type `C`.
    ///
    /// # Errors
    ///
    /// `UnregisteredComponentType` if `C` was never registered.
    pub fn component_manager<C: Component>(&self) -> WorldResult<&ComponentManager<C>> {
        self.registry.typed::<C>()
    }

    /// Returns the manager of component type `C`, mutably.
    ///
    /// # Errors
    ///
    /// `UnregisteredComponentType` if `C` was never registered.
    pub fn component_manager_mut<C: Component>(&mut self) -> WorldResult<&mut ComponentManager<C>> {
        self.registry.typed_mut::<C>()
    }

    /// Resolves a component handle to its value.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles, `ComponentTypeMismatch` if the handle
    /// belongs to another type.
    pub fn try_get_component<C: Component>(&self, component: ComponentHandle) -> WorldResult<&C> {
        self.registry.typed::<C>()?.get(component)
    }

    /// Resolves a component handle to its value, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`World::try_get_component`].
    pub fn try_get_component_mut<C: Component>(
        &mut self,
        component: ComponentHandle,
    ) -> WorldResult<&mut C> {
        self.registry.typed_mut::<C>()?.get_mut(component)
    }

    /// Returns the owner of a component, `None` while unattached.
    ///
    /// # Errors
    ///
    /// `NotFound` for stale handles.
    pub fn component_owner(
        &self,
        component: ComponentHandle,
    ) -> WorldResult<Option<GameObjectHandle>> {
        self.registry.manager(component.type_id())?.owner(component)
    }

    /// Returns the first component of type `C` attached to `object`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the object handle is stale.
    pub fn try_get_component_of_type<C: Component>(
        &self,
        object: GameObjectHandle,
    ) -> WorldResult<Option<ComponentHandle>> {
        let object = self.objects.get(object)?;
        let Ok(type_id) = self.registry.type_id_of::<C>() else {
            return Ok(None);
        };
        Ok(object
            .components
            .iter()
            .copied()
            .find(|component| component.type_id() == type_id))
    }

    // =========================================================================
    // Attach / detach
    // =========================================================================

    /// Attaches an unowned component to an object and runs its initialize.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either handle is stale.
    /// - `AlreadyOwned` if the component has an owner, this object included.
    /// - `DynamicComponentOnStaticObject` for a dynamic component on a static
    ///   object.
    /// - `InitializationFailed` if initialize fails. Nothing is attached.
    pub fn add_component(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        logged("add_component", self.add_component_inner(object, component))
    }

    fn add_component_inner(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        self.validate_attach(object, component)?;
        let ctx = ComponentContext { owner: object, component };

        let manager = self.registry.manager_mut(component.type_id())?;
        manager.set_owner(component, Some(object))?;
        if let Err(source) = manager.initialize(component, &ctx)? {
            manager.set_owner(component, None)?;
            return Err(WorldError::InitializationFailed { component, source });
        }
        self.objects.get_mut(object)?.components.push(component);
        tracing::debug!("Attached {:?} to {:?}", component, object);
        Ok(())
    }

    /// Checks everything an attach needs short of running initialize.
    pub(crate) fn validate_attach(
        &self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        let target = self.objects.get(object)?;
        let manager = self.registry.manager(component.type_id())?;
        if manager.owner(component)?.is_some() {
            return Err(InvariantViolation::AlreadyOwned.into());
        }
        if manager.is_dynamic(component)? && !target.is_dynamic() {
            return Err(InvariantViolation::DynamicComponentOnStaticObject.into());
        }
        Ok(())
    }

    /// Detaches a component from its owner and runs its deinitialize.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the object is stale or the component is not attached
    ///   to it.
    /// - `DeinitializationFailed` if deinitialize fails. The component is
    ///   detached anyway.
    pub fn remove_component(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        logged("remove_component", self.remove_component_inner(object, component))
    }

    fn remove_component_inner(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        let position = self.listed_position(object, component)?;
        let ctx = ComponentContext { owner: object, component };

        let manager = self.registry.manager_mut(component.type_id())?;
        let result = manager.deinitialize(component, &ctx)?;
        manager.set_owner(component, None)?;
        self.objects.get_mut(object)?.components.swap_remove(position);
        tracing::debug!("Detached {:?} from {:?}", component, object);

        result.map_err(|source| WorldError::DeinitializationFailed { component, source })
    }

    fn listed_position(
        &self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<usize> {
        self.objects
            .get(object)?
            .components
            .iter()
            .position(|&listed| listed == component)
            .ok_or_else(WorldError::component_not_found)
    }

    // =========================================================================
    // Split attach / detach, driven by `SharedWorld` around unlocked hooks
    // =========================================================================

    /// Validates, reserves the component for `object` and takes its value out.
    pub(crate) fn begin_attach(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<Box<dyn Detached>> {
        self.validate_attach(object, component)?;
        let manager = self.registry.manager_mut(component.type_id())?;
        let value = manager.check_out(component)?;
        manager.set_owner(component, Some(object))?;
        Ok(value)
    }

    /// Re-validates a reserved attach after initialize ran unlocked, and
    /// links the component if the object can still take it.
    pub(crate) fn complete_attach(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        let target = self.objects.get(object)?;
        if self
            .registry
            .manager(component.type_id())?
            .is_dynamic(component)?
            && !target.is_dynamic()
        {
            return Err(InvariantViolation::DynamicComponentOnStaticObject.into());
        }
        self.objects.get_mut(object)?.components.push(component);
        tracing::debug!("Attached {:?} to {:?}", component, object);
        Ok(())
    }

    /// Unlinks an attached component, keeping the owner as a reservation,
    /// and takes its value out.
    pub(crate) fn begin_detach(
        &mut self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<Box<dyn Detached>> {
        let position = self.listed_position(object, component)?;
        let value = self
            .registry
            .manager_mut(component.type_id())?
            .check_out(component)?;
        self.objects.get_mut(object)?.components.swap_remove(position);
        Ok(value)
    }

    /// Takes the value of a reserved component out again.
    pub(crate) fn check_out_component(
        &mut self,
        component: ComponentHandle,
    ) -> WorldResult<Box<dyn Detached>> {
        self.registry
            .manager_mut(component.type_id())?
            .check_out(component)
    }

    /// Puts a value taken by `begin_*` back into its slot.
    pub(crate) fn check_in_component(
        &mut self,
        component: ComponentHandle,
        value: Box<dyn Detached>,
    ) -> WorldResult<()> {
        self.registry
            .manager_mut(component.type_id())?
            .check_in(component, value)
    }

    /// Drops the reservation or ownership of a component.
    pub(crate) fn release_component(&mut self, component: ComponentHandle) -> WorldResult<()> {
        self.registry
            .manager_mut(component.type_id())?
            .set_owner(component, None)
    }

    // =========================================================================
    // Dynamic / static
    // =========================================================================

    /// Marks an object dynamic so it can hold dynamic components.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn make_dynamic(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        let target = logged("make_dynamic", self.objects.get_mut(object))?;
        target.flags.set(ObjectFlags::DYNAMIC);
        Ok(())
    }

    /// Marks an object static.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle is stale.
    /// - `DynamicComponentsAttached` while a dynamic component is attached.
    pub fn make_static(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        logged("make_static", self.make_static_inner(object))
    }

    fn make_static_inner(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        let target = self.objects.get(object)?;
        for &component in &target.components {
            if self
                .registry
                .manager(component.type_id())?
                .is_dynamic(component)?
            {
                return Err(InvariantViolation::DynamicComponentsAttached.into());
            }
        }
        self.objects.get_mut(object)?.flags.clear(ObjectFlags::DYNAMIC);
        // Static globals are kept current without waiting for a tick.
        self.refresh_subtree_globals(object)
    }

    // =========================================================================
    // Cloning
    // =========================================================================

    /// Creates a copy of `source` under `parent`.
    ///
    /// The copy gets the name, dynamic flag and local transform of the
    /// source, but no persistent id and no children. Every component whose
    /// type supports [`Component::duplicate`] is duplicated and attached to
    /// the copy; other components are skipped. If any duplicate fails to
    /// initialize, the copy is deleted again and the error returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `source` or `parent` is stale.
    /// - `InitializationFailed` from a duplicated component.
    /// - Any error of [`World::create_object`].
    pub fn clone_object(
        &mut self,
        source: GameObjectHandle,
        parent: Option<GameObjectHandle>,
    ) -> WorldResult<GameObjectHandle> {
        logged("clone_object", self.clone_object_inner(source, parent))
    }

    fn clone_object_inner(
        &mut self,
        source: GameObjectHandle,
        parent: Option<GameObjectHandle>,
    ) -> WorldResult<GameObjectHandle> {
        let original = self.objects.get(source)?;
        let components = original.components.clone();
        let local = self.local_transform(source)?;
        let desc = GameObjectDesc {
            name: self.names.get(source).unwrap_or_default().to_owned(),
            persistent_id: None,
            dynamic: original.is_dynamic(),
            parent,
            local_position: local.position,
            local_rotation: local.rotation,
            local_scale: Some(local.scale),
        };

        let copy = self.create_object(desc)?;
        for component in components {
            let manager = self.registry.manager_mut(component.type_id())?;
            let Some(duplicate) = manager.duplicate(component)? else {
                tracing::debug!(
                    "Skipping {} while cloning {:?}",
                    manager.type_name(),
                    source
                );
                continue;
            };
            if let Err(e) = self.add_component_inner(copy, duplicate) {
                // Unattached duplicates are not reached by delete_object.
                if let Ok(manager) = self.registry.manager_mut(duplicate.type_id()) {
                    let _ = manager.destroy(duplicate);
                }
                self.delete_object_inner(copy)?;
                return Err(e);
            }
        }
        tracing::debug!("Cloned {:?} into {:?}", source, copy);
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComponentError;

    #[derive(Debug, Clone, Default)]
    struct Hull {
        armor: u32,
    }

    impl Component for Hull {
        fn duplicate(&self) -> Option<Self> {
            Some(self.clone())
        }
    }

    #[derive(Debug, Default)]
    struct Engine;

    impl Component for Engine {
        fn is_dynamic(&self) -> bool {
            true
        }
    }

    struct Fragile;

    impl Component for Fragile {
        fn initialize(&mut self, _ctx: &ComponentContext) -> Result<(), ComponentError> {
            Err(ComponentError::ResourceUnavailable("mesh".to_string()))
        }
    }

    struct Stubborn;

    impl Component for Stubborn {
        fn deinitialize(&mut self, _ctx: &ComponentContext) -> Result<(), ComponentError> {
            Err(ComponentError::Failed("refusing".to_string()))
        }
    }

    #[test]
    fn test_add_and_remove() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a")).unwrap();
        let hull = world.create_component(Hull { armor: 3 }).unwrap();

        world.add_component(object, hull).unwrap();
        assert_eq!(world.component_owner(hull).unwrap(), Some(object));
        assert!(world.try_get_object(object).unwrap().has_component(hull));

        world.remove_component(object, hull).unwrap();
        assert_eq!(world.component_owner(hull).unwrap(), None);
        assert!(world.try_get_object(object).unwrap().components().is_empty());
        assert_eq!(world.try_get_component::<Hull>(hull).unwrap().armor, 3);
    }

    #[test]
    fn test_add_rejects_owned_component() {
        let mut world = World::default();
        let a = world.create_object(GameObjectDesc::new("a")).unwrap();
        let b = world.create_object(GameObjectDesc::new("b")).unwrap();
        let hull = world.create_component(Hull::default()).unwrap();
        world.add_component(a, hull).unwrap();

        for target in [a, b] {
            let err = world.add_component(target, hull).unwrap_err();
            assert_eq!(err.violation(), Some(InvariantViolation::AlreadyOwned));
        }
        assert_eq!(world.try_get_object(a).unwrap().components().len(), 1);
    }

    #[test]
    fn test_dynamic_component_needs_dynamic_object() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a")).unwrap();
        let engine = world.create_component(Engine).unwrap();

        let err = world.add_component(object, engine).unwrap_err();
        assert_eq!(
            err.violation(),
            Some(InvariantViolation::DynamicComponentOnStaticObject)
        );

        world.make_dynamic(object).unwrap();
        world.add_component(object, engine).unwrap();

        let err = world.make_static(object).unwrap_err();
        assert_eq!(err.violation(), Some(InvariantViolation::DynamicComponentsAttached));
    }

    #[test]
    fn test_initialize_failure_rolls_back() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a")).unwrap();
        let fragile = world.create_component(Fragile).unwrap();

        let err = world.add_component(object, fragile).unwrap_err();
        assert!(matches!(err, WorldError::InitializationFailed { component, .. } if component == fragile));
        assert_eq!(world.component_owner(fragile).unwrap(), None);
        assert!(world.try_get_object(object).unwrap().components().is_empty());
    }

    #[test]
    fn test_deinitialize_failure_still_detaches() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a")).unwrap();
        let stubborn = world.create_component(Stubborn).unwrap();
        world.add_component(object, stubborn).unwrap();

        let err = world.remove_component(object, stubborn).unwrap_err();
        assert!(matches!(err, WorldError::DeinitializationFailed { .. }));
        assert_eq!(world.component_owner(stubborn).unwrap(), None);
        assert!(world.try_get_object(object).unwrap().components().is_empty());
    }

    #[test]
    fn test_remove_from_wrong_object() {
        let mut world = World::default();
        let a = world.create_object(GameObjectDesc::new("a")).unwrap();
        let b = world.create_object(GameObjectDesc::new("b")).unwrap();
        let hull = world.create_component(Hull::default()).unwrap();
        world.add_component(a, hull).unwrap();

        assert!(world.remove_component(b, hull).unwrap_err().is_not_found());
        assert_eq!(world.component_owner(hull).unwrap(), Some(a));
    }

    #[test]
    fn test_delete_component_detaches_and_frees() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a")).unwrap();
        let hull = world.create_component(Hull::default()).unwrap();
        world.add_component(object, hull).unwrap();

        world.delete_component(hull).unwrap();
        assert!(world.try_get_object(object).unwrap().components().is_empty());
        assert!(world.try_get_component::<Hull>(hull).unwrap_err().is_not_found());
        assert_eq!(world.component_count(), 0);

        let reused = world.create_component(Hull::default()).unwrap();
        assert_ne!(reused, hull);
        assert!(world.try_get_component::<Hull>(hull).is_err());
    }

    #[test]
    fn test_component_of_type() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::new("a").dynamic()).unwrap();
        assert_eq!(world.try_get_component_of_type::<Hull>(object).unwrap(), None);

        let engine = world.create_component(Engine).unwrap();
        let hull = world.create_component(Hull::default()).unwrap();
        world.add_component(object, engine).unwrap();
        world.add_component(object, hull).unwrap();

        assert_eq!(world.try_get_component_of_type::<Hull>(object).unwrap(), Some(hull));
        assert_eq!(world.try_get_component_of_type::<Engine>(object).unwrap(), Some(engine));
    }

    #[test]
    fn test_clone_object_duplicates_components() {
        let mut world = World::default();
        let root = world.create_object(GameObjectDesc::new("root")).unwrap();
        let source = world
            .create_object(GameObjectDesc::new("turret").dynamic().with_persistent_id(7))
            .unwrap();
        let hull = world.create_component(Hull { armor: 9 }).unwrap();
        let engine = world.create_component(Engine).unwrap();
        world.add_component(source, hull).unwrap();
        world.add_component(source, engine).unwrap();

        let copy = world.clone_object(source, Some(root)).unwrap();
        let cloned = world.try_get_object(copy).unwrap();
        assert!(cloned.is_dynamic());
        assert_eq!(cloned.persistent_id(), None);
        assert_eq!(cloned.parent(), Some(root));
        assert_eq!(world.get_object_name(copy).unwrap(), Some("turret"));

        // Engine cannot duplicate and is skipped.
        let components = cloned.components().to_vec();
        assert_eq!(components.len(), 1);
        assert_ne!(components[0], hull);
        assert_eq!(world.component_owner(components[0]).unwrap(), Some(copy));
        assert_eq!(world.try_get_component::<Hull>(components[0]).unwrap().armor, 9);
        assert_eq!(world.component_owner(hull).unwrap(), Some(source));
    }
}
