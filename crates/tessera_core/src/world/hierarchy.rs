//! Parent/child links, hierarchy levels and transform propagation.
//!
//! Children form a doubly linked list through sibling handles, so linking
//! and unlinking are O(1). New children are appended.
//!
//! Global transforms of static objects are recomputed as soon as their local
//! transform or their parent changes. Dynamic objects only get new globals
//! at the propagation step of [`World::tick`], together with their static
//! descendants.

use super::{logged, ChildIter, World};
use crate::error::{InvariantViolation, WorldResult};
use crate::handle::GameObjectHandle;
use crate::math::{Quat, Transform, Vec3};

impl World {
    /// Returns the parent of an object, `None` for roots.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn parent(&self, object: GameObjectHandle) -> WorldResult<Option<GameObjectHandle>> {
        Ok(self.objects.get(object)?.parent)
    }

    /// Iterates over the direct children of an object in sibling order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn children(&self, object: GameObjectHandle) -> WorldResult<ChildIter<'_>> {
        self.view().children(object)
    }

    /// Moves `child` under `parent`, or makes it a root with `None`.
    ///
    /// The local transform is kept; levels and global transforms of the
    /// moved subtree are recomputed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either handle is stale.
    /// - `HierarchyCycle` if `parent` is `child` or one of its descendants.
    /// - `HierarchyTooDeep` if the moved subtree would exceed the maximum
    ///   depth.
    pub fn set_parent(
        &mut self,
        child: GameObjectHandle,
        parent: Option<GameObjectHandle>,
    ) -> WorldResult<()> {
        logged("set_parent", self.set_parent_inner(child, parent))
    }

    fn set_parent_inner(
        &mut self,
        child: GameObjectHandle,
        parent: Option<GameObjectHandle>,
    ) -> WorldResult<()> {
        let current = self.objects.get(child)?.parent;
        if let Some(parent) = parent {
            let parent_level = self.objects.get(parent)?.hierarchy_level;
            if parent == child || self.is_ancestor(child, parent) {
                return Err(InvariantViolation::HierarchyCycle.into());
            }
            self.check_depth(parent_level + 1 + self.subtree_height(child))?;
        }
        if current == parent {
            return Ok(());
        }

        self.unlink(child)?;
        if let Some(parent) = parent {
            self.link_child(parent, child)?;
        }
        self.refresh_levels(child)?;
        self.refresh_subtree_globals(child)?;

        tracing::debug!("Reparented {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Returns `true` if `ancestor` is on the parent chain of `object`.
    pub(crate) fn is_ancestor(&self, ancestor: GameObjectHandle, object: GameObjectHandle) -> bool {
        let mut current = self.objects.get(object).ok().and_then(|o| o.parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.objects.get(handle).ok().and_then(|o| o.parent);
        }
        false
    }

    /// Appends `child` to the child list of `parent`. `child` must be a root.
    pub(crate) fn link_child(
        &mut self,
        parent: GameObjectHandle,
        child: GameObjectHandle,
    ) -> WorldResult<()> {
        let last = self.objects.get(parent)?.last_child;

        let node = self.objects.get_mut(child)?;
        node.parent = Some(parent);
        node.prev_sibling = last;
        node.next_sibling = None;

        if let Some(last) = last {
            self.objects.get_mut(last)?.next_sibling = Some(child);
        }

        let parent = self.objects.get_mut(parent)?;
        if parent.first_child.is_none() {
            parent.first_child = Some(child);
        }
        parent.last_child = Some(child);
        parent.child_count += 1;
        Ok(())
    }

    /// Detaches `child` from its parent's child list. No-op for roots.
    pub(crate) fn unlink(&mut self, child: GameObjectHandle) -> WorldResult<()> {
        let node = self.objects.get_mut(child)?;
        let Some(parent) = node.parent.take() else {
            return Ok(());
        };
        let prev = node.prev_sibling.take();
        let next = node.next_sibling.take();

        if let Some(prev) = prev {
            self.objects.get_mut(prev)?.next_sibling = next;
        }
        if let Some(next) = next {
            self.objects.get_mut(next)?.prev_sibling = prev;
        }

        let parent = self.objects.get_mut(parent)?;
        if parent.first_child == Some(child) {
            parent.first_child = next;
        }
        if parent.last_child == Some(child) {
            parent.last_child = prev;
        }
        parent.child_count = parent.child_count.saturating_sub(1);
        Ok(())
    }

    /// Direct children, collected.
    pub(crate) fn child_handles(&self, object: GameObjectHandle) -> Vec<GameObjectHandle> {
        self.view()
            .children(object)
            .map(Iterator::collect)
            .unwrap_or_default()
    }

    /// `root` and all its descendants in pre-order, children in sibling order.
    pub(crate) fn subtree_pre_order(&self, root: GameObjectHandle) -> Vec<GameObjectHandle> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            order.push(handle);
            stack.extend(self.child_handles(handle).into_iter().rev());
        }
        order
    }

    /// Levels between `root` and its deepest descendant.
    fn subtree_height(&self, root: GameObjectHandle) -> u32 {
        let Ok(base) = self.objects.get(root).map(|o| o.hierarchy_level) else {
            return 0;
        };
        self.subtree_pre_order(root)
            .into_iter()
            .filter_map(|handle| self.objects.get(handle).ok())
            .map(|object| object.hierarchy_level.saturating_sub(base))
            .max()
            .unwrap_or(0)
    }

    fn refresh_levels(&mut self, root: GameObjectHandle) -> WorldResult<()> {
        for handle in self.subtree_pre_order(root) {
            let level = match self.objects.get(handle)?.parent {
                Some(parent) => self.objects.get(parent)?.hierarchy_level + 1,
                None => 0,
            };
            self.objects.get_mut(handle)?.hierarchy_level = level;
        }
        Ok(())
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Recomputes the global transform of one object from its parent's.
    fn refresh_global(&mut self, object: GameObjectHandle) -> WorldResult<()> {
        let node = self.objects.get(object)?;
        let parent_global = match node.parent {
            Some(parent) => self.global_transform(parent)?,
            None => Transform::IDENTITY,
        };
        let data = self.transforms.get_mut(node.transform)?;
        data.global = parent_global.compose(&data.local);
        Ok(())
    }

    pub(crate) fn refresh_subtree_globals(&mut self, root: GameObjectHandle) -> WorldResult<()> {
        for handle in self.subtree_pre_order(root) {
            self.refresh_global(handle)?;
        }
        Ok(())
    }

    /// Refreshes globals of every dynamic object in level order, then of
    /// its static descendants. Returns how many objects were touched.
    pub(crate) fn propagate_dynamic_transforms(&mut self) -> usize {
        let mut dynamic: Vec<(u32, GameObjectHandle)> = self
            .objects
            .iter()
            .filter(|(_, object)| object.is_dynamic())
            .map(|(handle, object)| (object.hierarchy_level, handle))
            .collect();
        dynamic.sort_unstable();

        let mut touched = 0;
        let mut stack = Vec::new();
        for (_, root) in dynamic {
            stack.push(root);
            while let Some(handle) = stack.pop() {
                if self.refresh_global(handle).is_err() {
                    continue;
                }
                touched += 1;
                // Dynamic children get their own turn one level down.
                stack.extend(self.child_handles(handle).into_iter().filter(|&child| {
                    self.objects.get(child).is_ok_and(|object| !object.is_dynamic())
                }));
            }
        }
        touched
    }

    fn update_local(
        &mut self,
        object: GameObjectHandle,
        update: impl FnOnce(&mut Transform),
    ) -> WorldResult<()> {
        let node = self.objects.get(object)?;
        let dynamic = node.is_dynamic();
        update(&mut self.transforms.get_mut(node.transform)?.local);
        if !dynamic {
            self.refresh_subtree_globals(object)?;
        }
        Ok(())
    }

    /// Replaces the local transform of an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn set_local_transform(
        &mut self,
        object: GameObjectHandle,
        transform: Transform,
    ) -> WorldResult<()> {
        logged(
            "set_local_transform",
            self.update_local(object, |local| *local = transform),
        )
    }

    /// Replaces the local position of an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn set_local_position(&mut self, object: GameObjectHandle, position: Vec3) -> WorldResult<()> {
        logged(
            "set_local_position",
            self.update_local(object, |local| local.position = position),
        )
    }

    /// Replaces the local rotation of an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn set_local_rotation(&mut self, object: GameObjectHandle, rotation: Quat) -> WorldResult<()> {
        logged(
            "set_local_rotation",
            self.update_local(object, |local| local.rotation = rotation),
        )
    }

    /// Replaces the local scale of an object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn set_local_scale(&mut self, object: GameObjectHandle, scale: Vec3) -> WorldResult<()> {
        logged(
            "set_local_scale",
            self.update_local(object, |local| local.scale = scale),
        )
    }

    /// Returns the transform of an object relative to its parent.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn local_transform(&self, object: GameObjectHandle) -> WorldResult<Transform> {
        self.view().local_transform(object)
    }

    /// Returns the world-space transform of an object. For dynamic objects
    /// this is the value from the last tick.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle is stale.
    pub fn global_transform(&self, object: GameObjectHandle) -> WorldResult<Transform> {
        self.view().global_transform(object)
    }
}
