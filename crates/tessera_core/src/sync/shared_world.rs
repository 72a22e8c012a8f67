//! # Shared World
//!
//! A [`World`] behind a reader/writer lock, for callers on several threads.
//!
//! ## Markers
//!
//! ```text
//!   read()  ──> ReadMarker   many at once, &World
//!   write() ──> WriteMarker  exclusive,    &mut World
//! ```
//!
//! Both markers are RAII guards: the lock is released on every exit path,
//! early returns and panics included.
//!
//! ## Lock release around lifecycle hooks
//!
//! `initialize` and `deinitialize` may call into systems that take their
//! own markers on this world. [`SharedWorld::add_component`] and
//! [`SharedWorld::remove_component`] therefore run those hooks with no
//! marker held:
//!
//! ```text
//!   write ─ validate, reserve, take value ─ release
//!         initialize (unlocked)
//!   write ─ put value back, re-validate ─ link or roll back ─ release
//! ```
//!
//! While reserved, the component has an owner but is in no object's list:
//! it cannot be attached elsewhere, receives no messages, and cannot be
//! deleted.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::component::ComponentContext;
use crate::error::{WorldError, WorldResult};
use crate::handle::{ComponentHandle, GameObjectHandle};
use crate::world::{logged, MessageSender, World};

/// Marker counters.
#[derive(Debug, Default)]
struct MarkerCounts {
    readers: AtomicUsize,
    writers: AtomicUsize,
}

/// Cloneable, thread-safe handle to a world.
///
/// # Example
///
/// ```rust,ignore
/// let shared = SharedWorld::new(world);
///
/// let render = shared.clone();
/// std::thread::spawn(move || {
///     let world = render.read();
///     for object in world.objects() {
///         // draw...
///     }
/// });
///
/// shared.write().tick(1.0 / 60.0);
/// ```
#[derive(Clone, Debug)]
pub struct SharedWorld {
    world: Arc<RwLock<World>>,
    counts: Arc<MarkerCounts>,
    sender: MessageSender,
}

impl SharedWorld {
    /// Wraps a world.
    #[must_use]
    pub fn new(world: World) -> Self {
        let sender = world.message_sender();
        Self {
            sender,
            world: Arc::new(RwLock::new(world)),
            counts: Arc::new(MarkerCounts::default()),
        }
    }

    /// Takes a shared read marker, blocking while a writer holds the world.
    pub fn read(&self) -> ReadMarker<'_> {
        let guard = self.world.read();
        self.counts.readers.fetch_add(1, Ordering::AcqRel);
        ReadMarker {
            guard,
            counter: &self.counts.readers,
        }
    }

    /// Takes the exclusive write marker, blocking while any marker is held.
    pub fn write(&self) -> WriteMarker<'_> {
        let guard = self.world.write();
        self.counts.writers.fetch_add(1, Ordering::AcqRel);
        WriteMarker {
            guard,
            counter: &self.counts.writers,
        }
    }

    /// Takes a read marker if no writer holds the world.
    pub fn try_read(&self) -> Option<ReadMarker<'_>> {
        let guard = self.world.try_read()?;
        self.counts.readers.fetch_add(1, Ordering::AcqRel);
        Some(ReadMarker {
            guard,
            counter: &self.counts.readers,
        })
    }

    /// Takes the write marker if no marker is held.
    pub fn try_write(&self) -> Option<WriteMarker<'_>> {
        let guard = self.world.try_write()?;
        self.counts.writers.fetch_add(1, Ordering::AcqRel);
        Some(WriteMarker {
            guard,
            counter: &self.counts.writers,
        })
    }

    /// Number of read markers currently held.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.counts.readers.load(Ordering::Acquire)
    }

    /// Number of write markers currently held (0 or 1).
    #[must_use]
    pub fn active_writers(&self) -> usize {
        self.counts.writers.load(Ordering::Acquire)
    }

    /// Returns a sender for posting messages. Takes no marker, so it can be
    /// called while this thread holds one.
    #[must_use]
    pub fn message_sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Attaches a component, running its initialize with no marker held.
    ///
    /// # Errors
    ///
    /// Same as [`World::add_component`]. If the object was deleted or made
    /// static while initialize ran, the component is deinitialized again and
    /// the corresponding error returned.
    pub fn add_component(
        &self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        let ctx = ComponentContext { owner: object, component };
        let mut value = logged("add_component", self.write().begin_attach(object, component))?;

        let initialized = value.run_initialize(&ctx);

        let mut world = self.write();
        world.check_in_component(component, value)?;
        if let Err(source) = initialized {
            world.release_component(component)?;
            return logged(
                "add_component",
                Err(WorldError::InitializationFailed { component, source }),
            );
        }
        let Err(rejected) = world.complete_attach(object, component) else {
            return Ok(());
        };

        // The object changed while initialize ran: undo it, again unlocked.
        let mut value = world.check_out_component(component)?;
        drop(world);
        if let Err(e) = value.run_deinitialize(&ctx) {
            tracing::warn!("Rollback deinitialize of {:?} failed: {}", component, e);
        }
        let mut world = self.write();
        world.check_in_component(component, value)?;
        world.release_component(component)?;
        logged("add_component", Err(rejected))
    }

    /// Detaches a component, running its deinitialize with no marker held.
    ///
    /// # Errors
    ///
    /// Same as [`World::remove_component`].
    pub fn remove_component(
        &self,
        object: GameObjectHandle,
        component: ComponentHandle,
    ) -> WorldResult<()> {
        let ctx = ComponentContext { owner: object, component };
        let mut value = logged(
            "remove_component",
            self.write().begin_detach(object, component),
        )?;

        let result = value.run_deinitialize(&ctx);

        let mut world = self.write();
        world.check_in_component(component, value)?;
        world.release_component(component)?;
        result.map_err(|source| WorldError::DeinitializationFailed { component, source })
    }

    /// Returns the world if this is the last handle to it.
    ///
    /// # Errors
    ///
    /// Gives `self` back while other handles exist.
    pub fn try_unwrap(self) -> Result<World, Self> {
        match Arc::try_unwrap(self.world) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(world) => Err(Self {
                world,
                counts: self.counts,
                sender: self.sender,
            }),
        }
    }
}

/// Shared access to the world. Released on drop.
pub struct ReadMarker<'a> {
    guard: RwLockReadGuard<'a, World>,
    counter: &'a AtomicUsize,
}

impl Deref for ReadMarker<'_> {
    type Target = World;

    #[inline]
    fn deref(&self) -> &World {
        &self.guard
    }
}

impl Drop for ReadMarker<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Exclusive access to the world. Released on drop.
pub struct WriteMarker<'a> {
    guard: RwLockWriteGuard<'a, World>,
    counter: &'a AtomicUsize,
}

impl Deref for WriteMarker<'_> {
    type Target = World;

    #[inline]
    fn deref(&self) -> &World {
        &self.guard
    }
}

impl DerefMut for WriteMarker<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut World {
        &mut self.guard
    }
}

impl Drop for WriteMarker<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
