//! # Message Dispatch
//!
//! ```text
//!  send_message(target, msg, routing)
//!        │
//!        ├── QUEUED ──> queue (FIFO) ──> drain point in tick()
//!        │
//!        └── immediate
//!              │
//!              ├─ target components, in list order
//!              ├─ TO_PARENT:   parent, grandparent, ... root
//!              └─ TO_CHILDREN: subtree of target, pre-order
//! ```
//!
//! Every object in scope receives a message once, whatever the routing.
//! Walks are iterative, so deep hierarchies cannot overflow the stack.

use crossbeam_channel::Sender;

use super::{logged, AppliedCommands, World, WorldContext, WorldView};
use crate::error::{WorldError, WorldResult};
use crate::handle::GameObjectHandle;
use crate::message::{Message, MessageType, MsgRouting};

/// Message waiting for the drain point.
pub(crate) struct QueuedMessage {
    pub(crate) target: GameObjectHandle,
    pub(crate) message: Box<dyn Message>,
    /// Routing without `QUEUED`.
    pub(crate) routing: MsgRouting,
}

/// Posts messages into a world from any thread.
///
/// Posted messages enter the world's queue at the start of the next tick,
/// in arrival order, and are delivered at that tick's drain point.
///
/// # Example
///
/// ```rust,ignore
/// let sender = world.message_sender();
/// std::thread::spawn(move || {
///     sender.post(station, Docked { ship_id: 4 }, MsgRouting::TO_CHILDREN);
/// });
/// ```
#[derive(Clone, Debug)]
pub struct MessageSender {
    tx: Sender<QueuedMessage>,
}

impl MessageSender {
    /// Posts a message. Returns `false` if the world no longer exists.
    pub fn post(
        &self,
        target: GameObjectHandle,
        message: impl MessageType,
        routing: MsgRouting,
    ) -> bool {
        self.tx
            .send(QueuedMessage {
                target,
                message: Box::new(message),
                routing: routing.without(MsgRouting::QUEUED),
            })
            .is_ok()
    }
}

impl std::fmt::Debug for QueuedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedMessage")
            .field("target", &self.target)
            .field("message", &self.message)
            .field("routing", &self.routing)
            .finish()
    }
}

/// Outcome of one drain point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Queued messages dispatched.
    pub delivered: usize,
    /// Queued messages whose target was deleted before the drain.
    pub dropped: usize,
    /// Objects reached by the dispatched messages.
    pub recipients: usize,
    /// Messages left for the next drain, queued while this one ran.
    pub deferred: usize,
    /// Commands recorded by receivers.
    pub commands: AppliedCommands,
}

/// Per-tick statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Messages pulled from the cross-thread mailbox.
    pub mailbox_messages: usize,
    /// Dynamic components updated.
    pub components_updated: usize,
    /// Objects whose global transform was refreshed.
    pub transforms_propagated: usize,
    /// Drain point outcome.
    pub drain: DrainStats,
    /// Commands recorded by updates and applied after them and after the
    /// drain.
    pub commands: AppliedCommands,
}

impl World {
    /// Sends a message to `target`.
    ///
    /// Without `QUEUED` the message is dispatched before this returns, and
    /// structural changes the receivers recorded are applied right after.
    ///
    /// # Errors
    ///
    /// `NotFound` if `target` is stale. Delivery itself never fails.
    pub fn send_message(
        &mut self,
        target: GameObjectHandle,
        message: impl MessageType,
        routing: MsgRouting,
    ) -> WorldResult<()> {
        logged("send_message", self.post_boxed(target, Box::new(message), routing))?;
        self.apply_commands();
        Ok(())
    }

    /// Queues a message for the next drain point, whatever `routing` says.
    ///
    /// # Errors
    ///
    /// `NotFound` if `target` is stale.
    pub fn queue_message(
        &mut self,
        target: GameObjectHandle,
        message: impl MessageType,
        routing: MsgRouting,
    ) -> WorldResult<()> {
        logged(
            "queue_message",
            self.post_boxed(target, Box::new(message), routing | MsgRouting::QUEUED),
        )
    }

    /// Queues or dispatches without applying commands.
    pub(crate) fn post_boxed(
        &mut self,
        target: GameObjectHandle,
        message: Box<dyn Message>,
        routing: MsgRouting,
    ) -> WorldResult<()> {
        if !self.objects.contains(target) {
            return Err(WorldError::object_not_found());
        }
        if routing.is_queued() {
            self.queue.push_back(QueuedMessage {
                target,
                message,
                routing: routing.without(MsgRouting::QUEUED),
            });
            return Ok(());
        }
        self.dispatch(target, &*message, routing);
        Ok(())
    }

    /// Returns a sender for posting messages from other threads.
    #[must_use]
    pub fn message_sender(&self) -> MessageSender {
        MessageSender {
            tx: self.mailbox_tx.clone(),
        }
    }

    /// Delivers a message according to `routing`. Returns the number of
    /// objects reached.
    fn dispatch(
        &mut self,
        target: GameObjectHandle,
        message: &dyn Message,
        routing: MsgRouting,
    ) -> usize {
        let mut reached = usize::from(self.deliver(target, message, routing));

        if routing.contains(MsgRouting::TO_PARENT) {
            let mut current = self.objects.get(target).ok().and_then(|o| o.parent);
            while let Some(ancestor) = current {
                reached += usize::from(self.deliver(ancestor, message, routing));
                current = self.objects.get(ancestor).ok().and_then(|o| o.parent);
            }
        }

        if routing.contains(MsgRouting::TO_CHILDREN) {
            let mut stack: Vec<GameObjectHandle> =
                self.child_handles(target).into_iter().rev().collect();
            while let Some(descendant) = stack.pop() {
                reached += usize::from(self.deliver(descendant, message, routing));
                stack.extend(self.child_handles(descendant).into_iter().rev());
            }
        }

        reached
    }

    /// Hands a message to every component of one object, in list order.
    fn deliver(
        &mut self,
        object: GameObjectHandle,
        message: &dyn Message,
        routing: MsgRouting,
    ) -> bool {
        let Self {
            ref objects,
            ref transforms,
            ref names,
            ref mut registry,
            ref mut commands,
            delta_seconds,
            ..
        } = *self;
        let Ok(receiver) = objects.get(object) else {
            return false;
        };
        let view = WorldView {
            objects,
            transforms,
            names,
        };
        // Receivers cannot change the list: structural changes are deferred.
        for &component in &receiver.components {
            let Ok(manager) = registry.manager_mut(component.type_id()) else {
                continue;
            };
            let mut ctx = WorldContext::new(view, commands, object, component, delta_seconds)
                .with_routing(routing);
            manager.on_message(component, message, &mut ctx);
        }
        true
    }

    /// Dispatches every message queued before this call, in FIFO order.
    ///
    /// Messages queued while draining stay queued for the next drain.
    /// Messages whose target was deleted are dropped.
    pub fn drain_messages(&mut self) -> DrainStats {
        let snapshot = self.queue.len();
        if snapshot > self.config.queue_warning_threshold {
            tracing::warn!(
                "Message queue holds {} entries (threshold {})",
                snapshot,
                self.config.queue_warning_threshold
            );
        }

        let mut stats = DrainStats::default();
        for _ in 0..snapshot {
            let Some(queued) = self.queue.pop_front() else {
                break;
            };
            if !self.objects.contains(queued.target) {
                tracing::debug!("Dropping {:?}: target deleted", queued);
                stats.dropped += 1;
                continue;
            }
            stats.recipients += self.dispatch(queued.target, &*queued.message, queued.routing);
            stats.delivered += 1;
            let applied = self.apply_commands();
            stats.commands.merge(applied);
        }
        stats.deferred = self.queue.len();
        stats
    }

    fn pull_mailbox(&mut self) -> usize {
        let mut pulled = 0;
        while let Ok(queued) = self.mailbox_rx.try_recv() {
            self.queue.push_back(queued);
            pulled += 1;
        }
        pulled
    }

    fn update_components(&mut self, delta_seconds: f32) -> usize {
        let Self {
            ref objects,
            ref transforms,
            ref names,
            ref mut registry,
            ref mut commands,
            ..
        } = *self;
        let view = WorldView {
            objects,
            transforms,
            names,
        };
        let mut updated = 0;
        for manager in registry.managers_mut() {
            updated += manager.update_all(view, commands, delta_seconds);
        }
        updated
    }

    /// Advances the world by one tick.
    ///
    /// See the [module docs](crate::world) for the step order.
    pub fn tick(&mut self, delta_seconds: f32) -> TickStats {
        self.tick += 1;
        self.delta_seconds = delta_seconds;

        let mailbox_messages = self.pull_mailbox();
        let components_updated = self.update_components(delta_seconds);
        let mut commands = self.apply_commands();
        let transforms_propagated = self.propagate_dynamic_transforms();
        let drain = self.drain_messages();
        commands.merge(self.apply_commands());

        tracing::debug!(
            "Tick {}: {} updated, {} delivered, {} dropped",
            self.tick,
            components_updated,
            drain.delivered,
            drain.dropped
        );

        TickStats {
            tick: self.tick,
            mailbox_messages,
            components_updated,
            transforms_propagated,
            drain,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::component::Component;
    use crate::message::MessageTypeId;
    use crate::object::GameObjectDesc;

    #[derive(Debug, Clone)]
    struct Ping;

    impl MessageType for Ping {
        const ID: MessageTypeId = MessageTypeId(1);
    }

    #[derive(Debug, Clone)]
    struct Other;

    impl MessageType for Other {
        const ID: MessageTypeId = MessageTypeId(2);
    }

    /// Records the owner of every ping it receives.
    struct Probe {
        log: Arc<Mutex<Vec<GameObjectHandle>>>,
    }

    impl Component for Probe {
        fn on_message(&mut self, msg: &dyn Message, ctx: &mut WorldContext<'_>) {
            if msg.is::<Ping>() {
                self.log.lock().unwrap().push(ctx.owner());
            }
        }
    }

    fn probed(world: &mut World, log: &Arc<Mutex<Vec<GameObjectHandle>>>) -> GameObjectHandle {
        let object = world.create_object(GameObjectDesc::default()).unwrap();
        let probe = world
            .create_component(Probe {
                log: Arc::clone(log),
            })
            .unwrap();
        world.add_component(object, probe).unwrap();
        object
    }

    #[test]
    fn test_default_routing_reaches_self_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::default();
        let parent = probed(&mut world, &log);
        let child = probed(&mut world, &log);
        world.set_parent(child, Some(parent)).unwrap();

        world.send_message(child, Ping, MsgRouting::DEFAULT).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![child]);
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::default();
        let object = probed(&mut world, &log);

        world.send_message(object, Other, MsgRouting::DEFAULT).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_send_to_stale_target() {
        let mut world = World::default();
        let object = world.create_object(GameObjectDesc::default()).unwrap();
        world.delete_object(object).unwrap();

        assert!(world.send_message(object, Ping, MsgRouting::DEFAULT).unwrap_err().is_not_found());
        assert!(world.queue_message(object, Ping, MsgRouting::DEFAULT).is_err());
        assert_eq!(world.pending_message_count(), 0);
    }

    #[test]
    fn test_to_parent_walks_to_root() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::default();
        let root = probed(&mut world, &log);
        let middle = probed(&mut world, &log);
        let leaf = probed(&mut world, &log);
        world.set_parent(middle, Some(root)).unwrap();
        world.set_parent(leaf, Some(middle)).unwrap();

        world.send_message(leaf, Ping, MsgRouting::TO_PARENT).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![leaf, middle, root]);
    }

    #[test]
    fn test_mailbox_enters_queue_on_tick() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::default();
        let object = probed(&mut world, &log);

        let sender = world.message_sender();
        let handle = std::thread::spawn(move || sender.post(object, Ping, MsgRouting::DEFAULT));
        assert!(handle.join().unwrap());
        assert!(log.lock().unwrap().is_empty());

        let stats = world.tick(0.1);
        assert_eq!(stats.mailbox_messages, 1);
        assert_eq!(stats.drain.delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec![object]);
    }

    #[test]
    fn test_queue_warning_threshold_does_not_block() {
        let mut world = World::new(crate::WorldConfig {
            queue_warning_threshold: 1,
            ..crate::WorldConfig::default()
        })
        .unwrap();
        let object = world.create_object(GameObjectDesc::default()).unwrap();
        for _ in 0..3 {
            world.queue_message(object, Ping, MsgRouting::DEFAULT).unwrap();
        }
        assert_eq!(world.drain_messages().delivered, 3);
        assert_eq!(world.pending_message_count(), 0);
    }
}
