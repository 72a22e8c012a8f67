//! # Messages
//!
//! Typed payloads that objects and components exchange through the world.
//!
//! Every message type declares a stable numeric [`MessageTypeId`]. Components
//! switch on that id (or downcast) inside their single `on_message` entry
//! point; the world treats the payload as opaque.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[derive(Clone, Debug)]
//! struct Damage {
//!     amount: u32,
//! }
//!
//! impl MessageType for Damage {
//!     const ID: MessageTypeId = MessageTypeId(100);
//! }
//!
//! world.send_message(ship, Damage { amount: 10 }, MsgRouting::TO_CHILDREN)?;
//! ```

use std::any::Any;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Stable identifier of a message type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTypeId(pub u32);

/// Object-safe message contract used by dispatch.
///
/// Implemented automatically for every [`MessageType`].
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Stable identifier of the concrete type.
    fn message_type(&self) -> MessageTypeId;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Declares a concrete message type.
pub trait MessageType: Clone + Send + Sync + fmt::Debug + 'static {
    /// Stable identifier. Must be unique among the message types of a program.
    const ID: MessageTypeId;
}

impl<M: MessageType> Message for M {
    #[inline]
    fn message_type(&self) -> MessageTypeId {
        M::ID
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Message + '_ {
    /// Returns `true` if the message is of type `M`.
    #[inline]
    #[must_use]
    pub fn is<M: MessageType>(&self) -> bool {
        self.message_type() == M::ID
    }

    /// Downcasts to the concrete message type.
    #[inline]
    #[must_use]
    pub fn downcast_ref<M: MessageType>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}

/// Routing policy bitset: delivery scope and timing.
///
/// The target itself always receives the message. The flags add the parent
/// chain, the children subtree, and deferral to the next drain point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MsgRouting(u8);

impl MsgRouting {
    /// Deliver immediately, to the target only.
    pub const DEFAULT: Self = Self(0);
    /// Also deliver to every ancestor up to the root.
    pub const TO_PARENT: Self = Self(1 << 0);
    /// Also deliver to every descendant.
    pub const TO_CHILDREN: Self = Self(1 << 1);
    /// Deliver at the next drain point instead of immediately.
    pub const QUEUED: Self = Self(1 << 2);

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with the flags of `other` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns `true` if the message must wait for the drain point.
    #[inline]
    #[must_use]
    pub const fn is_queued(self) -> bool {
        self.contains(Self::QUEUED)
    }
}

impl BitOr for MsgRouting {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MsgRouting {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MsgRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::TO_PARENT) {
            names.push("TO_PARENT");
        }
        if self.contains(Self::TO_CHILDREN) {
            names.push("TO_CHILDREN");
        }
        if self.contains(Self::QUEUED) {
            names.push("QUEUED");
        }
        if names.is_empty() {
            f.write_str("MsgRouting(DEFAULT)")
        } else {
            write!(f, "MsgRouting({})", names.join(" | "))
        }
    }
}
