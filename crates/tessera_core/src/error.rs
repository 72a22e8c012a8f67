//! # World Error Types
//!
//! All errors that can occur while mutating or querying the world.
//!
//! Every failure is a return value. Callers (game logic, scripting bindings,
//! editor tooling) can recover from any of them.

use thiserror::Error;

use crate::handle::{ComponentHandle, HandleKind};

/// Failure reported by a component's `initialize` or `deinitialize` step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// A resource the component depends on is not available.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Any other component-specific failure.
    #[error("{0}")]
    Failed(String),
}

/// Structural rule that an operation would have broken.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The component is already attached to an object.
    #[error("component is already owned by an object")]
    AlreadyOwned,

    /// A dynamic component cannot live on a static object.
    #[error("cannot attach a dynamic component to a static object, call make_dynamic first")]
    DynamicComponentOnStaticObject,

    /// The object still carries dynamic components.
    #[error("object has dynamic components attached and cannot become static")]
    DynamicComponentsAttached,

    /// The new parent is the object itself or one of its descendants.
    #[error("reparenting would create a cycle in the hierarchy")]
    HierarchyCycle,

    /// The hierarchy would exceed the configured maximum depth.
    #[error("hierarchy depth {depth} exceeds maximum {max}")]
    HierarchyTooDeep {
        /// Depth the operation would produce.
        depth: u32,
        /// Configured maximum.
        max: u32,
    },

    /// The component is temporarily checked out by a concurrent attach or detach.
    #[error("component is being attached or detached by another caller")]
    ComponentCheckedOut,
}

/// Errors that can occur in the world.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Handle is stale (slot reused) or out of range.
    #[error("{kind} not found")]
    NotFound {
        /// What the handle referred to.
        kind: HandleKind,
    },

    /// The operation would break a structural invariant. Nothing was changed.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// The component's initialize step failed. The attach was rolled back.
    #[error("initialization of {component:?} failed: {source}")]
    InitializationFailed {
        /// The component that failed.
        component: ComponentHandle,
        /// The component's own error.
        source: ComponentError,
    },

    /// The component's deinitialize step failed. It was detached anyway.
    #[error("deinitialization of {component:?} failed: {source}")]
    DeinitializationFailed {
        /// The component that failed.
        component: ComponentHandle,
        /// The component's own error.
        source: ComponentError,
    },

    /// A handle table reached its configured limit.
    #[error("{kind} capacity exceeded: {capacity}")]
    CapacityExceeded {
        /// Table that is full.
        kind: HandleKind,
        /// The limit that was hit.
        capacity: usize,
    },

    /// The component type was never registered with this world.
    #[error("component type not registered: {0}")]
    UnregisteredComponentType(&'static str),

    /// The handle refers to a component of another type.
    #[error("component type mismatch: expected {expected}")]
    ComponentTypeMismatch {
        /// Type that was requested.
        expected: &'static str,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WorldError {
    /// Returns `true` for [`WorldError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the violated invariant, if this is an invariant violation.
    #[must_use]
    pub const fn violation(&self) -> Option<InvariantViolation> {
        match self {
            Self::InvariantViolation(violation) => Some(*violation),
            _ => None,
        }
    }
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
