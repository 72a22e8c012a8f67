//! # Component System
//!
//! Components are behavior units attached to exactly one game object.
//!
//! ## Lifecycle
//!
//! ```text
//!  create_component ──> [unowned] ──add_component──> initialize ──> [attached]
//!                          ^                            │ Err: rolled back
//!                          │                            v
//!                          └──── deinitialize <── remove_component
//!
//!  delete_component: detaches first, then frees the slot (generation bump)
//! ```
//!
//! Each concrete type is stored by its own [`ComponentManager`], registered
//! with the world on first use.

mod manager;

pub use manager::ComponentManager;
pub(crate) use manager::{ComponentRegistry, Detached, ErasedManager};

use crate::error::ComponentError;
use crate::handle::{ComponentHandle, GameObjectHandle};
use crate::message::Message;
use crate::world::WorldContext;

/// Behavior attached to a game object.
///
/// Every method has a default, so a plain data type only needs an empty
/// `impl Component for T {}`.
///
/// # Example
///
/// ```rust,ignore
/// struct Health {
///     hit_points: i32,
/// }
///
/// impl Component for Health {
///     fn on_message(&mut self, msg: &dyn Message, _ctx: &mut WorldContext<'_>) {
///         if let Some(damage) = msg.downcast_ref::<Damage>() {
///             self.hit_points -= damage.amount;
///         }
///     }
/// }
/// ```
pub trait Component: Send + Sync + Sized + 'static {
    /// Whether this component needs per-tick updates.
    ///
    /// Read once when the component is created. Dynamic components can only
    /// be attached to dynamic objects.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Runs once when the component is attached. An error rolls the attach
    /// back.
    ///
    /// # Errors
    ///
    /// Returns the component's own failure, e.g. a missing resource.
    fn initialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs once when the component is detached or destroyed.
    ///
    /// # Errors
    ///
    /// Returns the component's own failure. The component is detached anyway.
    fn deinitialize(&mut self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        let _ = ctx;
        Ok(())
    }

    /// Receives a message delivered to the owner. Unknown messages are
    /// ignored.
    fn on_message(&mut self, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
        let _ = (msg, ctx);
    }

    /// Per-tick update. Only called for dynamic components.
    fn update(&mut self, ctx: &mut WorldContext<'_>) {
        let _ = ctx;
    }

    /// Produces an unattached copy for [`World::clone_object`](crate::World::clone_object).
    /// `None` means the type cannot be duplicated.
    fn duplicate(&self) -> Option<Self> {
        None
    }
}

/// What a component learns about its attachment during initialize and
/// deinitialize.
///
/// There is no world access here: lifecycle hooks may call into external
/// systems, and the world is never borrowed across them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentContext {
    /// Object the component is being attached to or detached from.
    pub owner: GameObjectHandle,
    /// The component itself.
    pub component: ComponentHandle,
}
