//! # Game Objects
//!
//! A game object is a node of the world hierarchy. It owns a transform slot
//! and an ordered list of component handles, and links to its parent and
//! siblings through handles only.
//!
//! Objects are created and destroyed by the [`World`](crate::World). All
//! structural mutation goes through the world so the hierarchy and ownership
//! invariants hold.

use serde::{Deserialize, Serialize};

use crate::handle::{ComponentHandle, GameObjectHandle, TransformHandle};
use crate::math::{Quat, Transform, Vec3};

/// Per-object flag bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectFlags(u8);

impl ObjectFlags {
    /// Object is updated every tick.
    pub const DYNAMIC: u8 = 1 << 0;

    /// Checks a flag.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clears a flag.
    #[inline]
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }
}

/// Description of an object to create.
///
/// # Example
///
/// ```rust,ignore
/// let ship = world.create_object(
///     GameObjectDesc::new("ship")
///         .dynamic()
///         .with_position(Vec3::new(0.0, 10.0, 0.0)),
/// )?;
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameObjectDesc {
    /// Name, interned by the world. Empty for none.
    pub name: String,
    /// Optional stable id that survives save/load.
    pub persistent_id: Option<u64>,
    /// Start as a dynamic object.
    pub dynamic: bool,
    /// Parent to link under.
    #[serde(skip)]
    pub parent: Option<GameObjectHandle>,
    /// Initial local position.
    pub local_position: Vec3,
    /// Initial local rotation.
    pub local_rotation: Quat,
    /// Initial local scale.
    pub local_scale: Option<Vec3>,
}

impl GameObjectDesc {
    /// Creates a description with a name and defaults elsewhere.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Marks the object dynamic.
    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Sets the parent.
    #[must_use]
    pub fn with_parent(mut self, parent: GameObjectHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the persistent id.
    #[must_use]
    pub fn with_persistent_id(mut self, id: u64) -> Self {
        self.persistent_id = Some(id);
        self
    }

    /// Sets the local position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.local_position = position;
        self
    }

    /// Sets the local rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.local_rotation = rotation;
        self
    }

    /// Sets the local scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.local_scale = Some(scale);
        self
    }

    pub(crate) fn local_transform(&self) -> Transform {
        Transform::new(
            self.local_position,
            self.local_rotation,
            self.local_scale.unwrap_or(Vec3::ONE),
        )
    }
}

/// Transform payload kept in the world's transform pool.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TransformData {
    pub local: Transform,
    pub global: Transform,
    /// Back-reference to the object owning this slot.
    pub owner: GameObjectHandle,
}

/// A node in the world hierarchy.
///
/// Read access is handed out by the world; the fields are private so that
/// links, ownership and levels can only change through world operations.
#[derive(Clone, Debug)]
pub struct GameObject {
    pub(crate) handle: GameObjectHandle,
    pub(crate) persistent_id: Option<u64>,
    pub(crate) flags: ObjectFlags,

    pub(crate) parent: Option<GameObjectHandle>,
    pub(crate) first_child: Option<GameObjectHandle>,
    pub(crate) last_child: Option<GameObjectHandle>,
    pub(crate) prev_sibling: Option<GameObjectHandle>,
    pub(crate) next_sibling: Option<GameObjectHandle>,
    pub(crate) child_count: u32,
    /// Depth in the hierarchy, 0 for roots.
    pub(crate) hierarchy_level: u32,

    pub(crate) transform: TransformHandle,
    /// Insertion order is delivery order.
    pub(crate) components: Vec<ComponentHandle>,
}

impl GameObject {
    pub(crate) fn new(
        handle: GameObjectHandle,
        persistent_id: Option<u64>,
        dynamic: bool,
        transform: TransformHandle,
    ) -> Self {
        let mut flags = ObjectFlags::default();
        if dynamic {
            flags.set(ObjectFlags::DYNAMIC);
        }
        Self {
            handle,
            persistent_id,
            flags,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            child_count: 0,
            hierarchy_level: 0,
            transform,
            components: Vec::new(),
        }
    }

    /// Returns this object's handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> GameObjectHandle {
        self.handle
    }

    /// Returns the persistent id, if any.
    #[inline]
    #[must_use]
    pub const fn persistent_id(&self) -> Option<u64> {
        self.persistent_id
    }

    /// Returns `true` if the object is updated every tick.
    #[inline]
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.flags.has(ObjectFlags::DYNAMIC)
    }

    /// Returns the parent, `None` for roots.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<GameObjectHandle> {
        self.parent
    }

    /// Returns the first child.
    #[inline]
    #[must_use]
    pub const fn first_child(&self) -> Option<GameObjectHandle> {
        self.first_child
    }

    /// Returns the next sibling.
    #[inline]
    #[must_use]
    pub const fn next_sibling(&self) -> Option<GameObjectHandle> {
        self.next_sibling
    }

    /// Returns the number of direct children.
    #[inline]
    #[must_use]
    pub const fn child_count(&self) -> u32 {
        self.child_count
    }

    /// Returns the depth in the hierarchy (roots are level 0).
    #[inline]
    #[must_use]
    pub const fn hierarchy_level(&self) -> u32 {
        self.hierarchy_level
    }

    /// Returns the attached components in delivery order.
    ///
    /// Removal swaps the last entry into the removed position, so the order
    /// does not survive removals.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentHandle] {
        &self.components
    }

    /// Returns `true` if `component` is attached to this object.
    #[inline]
    #[must_use]
    pub fn has_component(&self, component: ComponentHandle) -> bool {
        self.components.contains(&component)
    }
}
