//! # Handles
//!
//! Handles are lightweight identifiers consisting of:
//! - An index into a handle table
//! - A generation counter for safe slot reuse
//!
//! A handle never owns anything. It resolves only while the slot it points at
//! still carries the same generation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw (index, generation) pair shared by every handle flavor.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the owning table
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
#[repr(transparent)]
pub struct RawHandle(u64);

impl RawHandle {
    /// Null/invalid handle. Never resolves in any table.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a raw handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("NULL")
        } else {
            write!(f, "{}v{}", self.index(), self.generation())
        }
    }
}

impl From<(u32, u32)> for RawHandle {
    fn from((index, generation): (u32, u32)) -> Self {
        Self::new(index, generation)
    }
}

impl From<RawHandle> for (u32, u32) {
    fn from(raw: RawHandle) -> Self {
        (raw.index(), raw.generation())
    }
}

/// Common surface of every typed handle stored in a
/// [`HandleTable`](crate::memory::HandleTable).
pub trait Handle: Copy + Eq + fmt::Debug {
    /// Human-readable handle kind, used in error messages.
    const KIND: HandleKind;

    /// Wraps a raw handle.
    fn from_raw(raw: RawHandle) -> Self;

    /// Returns the raw (index, generation) pair.
    fn raw(self) -> RawHandle;
}

/// What a handle refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A game object.
    GameObject,
    /// A component.
    Component,
    /// A transform slot.
    Transform,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GameObject => "game object",
            Self::Component => "component",
            Self::Transform => "transform",
        })
    }
}

/// Stable reference to a game object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameObjectHandle(RawHandle);

impl GameObjectHandle {
    /// Null object handle.
    pub const NULL: Self = Self(RawHandle::NULL);

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0.index()
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.0.generation()
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Handle for GameObjectHandle {
    const KIND: HandleKind = HandleKind::GameObject;

    #[inline]
    fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    #[inline]
    fn raw(self) -> RawHandle {
        self.0
    }
}

impl fmt::Debug for GameObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameObject({:?})", self.0)
    }
}

/// Index of a registered component type inside a [`World`](crate::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTypeId(pub u16);

/// Stable reference to a component.
///
/// Besides the slot it records the registered type, so the world can route the
/// handle to the manager that owns the storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentHandle {
    type_id: ComponentTypeId,
    slot: RawHandle,
}

impl ComponentHandle {
    /// Null component handle.
    pub const NULL: Self = Self {
        type_id: ComponentTypeId(u16::MAX),
        slot: RawHandle::NULL,
    };

    /// Builds a component handle from its type and slot.
    #[inline]
    #[must_use]
    pub const fn new(type_id: ComponentTypeId, slot: RawHandle) -> Self {
        Self { type_id, slot }
    }

    /// Returns the registered type of the component.
    #[inline]
    #[must_use]
    pub const fn type_id(self) -> ComponentTypeId {
        self.type_id
    }

    /// Returns the slot inside the type's manager.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> RawHandle {
        self.slot
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.slot.is_null()
    }
}

impl Default for ComponentHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({}:{:?})", self.type_id.0, self.slot)
    }
}

/// Slot in the world's transform pool. Exclusively owned by one game object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct TransformHandle(RawHandle);

impl Handle for TransformHandle {
    const KIND: HandleKind = HandleKind::Transform;

    #[inline]
    fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    #[inline]
    fn raw(self) -> RawHandle {
        self.0
    }
}

impl fmt::Debug for TransformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transform({:?})", self.0)
    }
}
