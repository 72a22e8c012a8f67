//! # Handle Table
//!
//! Generation-tagged slot allocator. Every value lives in a slot; handing out
//! a handle records the slot index together with the slot's generation.

use std::marker::PhantomData;

use crate::error::{WorldError, WorldResult};
use crate::handle::{Handle, RawHandle};

/// A single slot of the table.
struct Slot<T> {
    /// Bumped every time the slot is freed.
    generation: u32,
    value: Option<T>,
}

/// A growable pool of values addressed by generation-checked handles.
///
/// Lookups are O(1). Freed slots go to a LIFO free list and are reused by the
/// next allocation with a bumped generation, so every handle issued for the
/// previous occupant stops resolving.
///
/// # Generation wraparound
///
/// Generations wrap after 2^32 reuses of the same slot. A handle kept alive
/// across that many reuses would resolve again. This is accepted.
///
/// # Example
///
/// ```rust,ignore
/// let mut table: HandleTable<u32, GameObjectHandle> = HandleTable::with_capacity(64, 0);
///
/// let handle = table.allocate(42)?;
/// assert_eq!(*table.get(handle)?, 42);
///
/// table.free(handle)?;
/// assert!(table.get(handle).is_err());
/// ```
pub struct HandleTable<T, H: Handle> {
    /// Slot storage. Grows on demand.
    slots: Vec<Slot<T>>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of live values.
    live_count: usize,
    /// Upper bound on slots (0 = limited only by the index width).
    max_slots: usize,
    _handle: PhantomData<fn() -> H>,
}

impl<T, H: Handle> HandleTable<T, H> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Creates a table with `capacity` slots reserved up front.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Slots to reserve (no handles are issued)
    /// * `max_slots` - Hard limit on slots, `0` for none
    #[must_use]
    pub fn with_capacity(capacity: usize, max_slots: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity),
            live_count: 0,
            max_slots,
            _handle: PhantomData,
        }
    }

    /// Returns the number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live_count
    }

    /// Returns `true` if no value is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns how many slots fit before the slot storage reallocates.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Returns the number of slots ever created (live + free).
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of free slots waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Stores `value` in a free or newly grown slot.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CapacityExceeded`] when no slot is free and the
    /// table already holds `max_slots` slots.
    pub fn allocate(&mut self, value: T) -> WorldResult<H> {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            self.live_count += 1;
            return Ok(H::from_raw(RawHandle::new(index, slot.generation)));
        }

        let limit = if self.max_slots == 0 {
            u32::MAX as usize
        } else {
            self.max_slots.min(u32::MAX as usize)
        };
        if self.slots.len() >= limit {
            return Err(WorldError::CapacityExceeded {
                kind: H::KIND,
                capacity: limit,
            });
        }

        let index = u32::try_from(self.slots.len()).map_err(|_| WorldError::CapacityExceeded {
            kind: H::KIND,
            capacity: limit,
        })?;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        self.live_count += 1;
        Ok(H::from_raw(RawHandle::new(index, 0)))
    }

    /// Frees the value behind `handle`, bumping the slot generation.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotFound`] if the handle is stale or out of range.
    pub fn free(&mut self, handle: H) -> WorldResult<T> {
        let raw = handle.raw();
        let slot = self
            .slots
            .get_mut(raw.index() as usize)
            .filter(|slot| slot.generation == raw.generation() && slot.value.is_some())
            .ok_or(WorldError::NotFound { kind: H::KIND })?;

        let value = slot.value.take().ok_or(WorldError::NotFound { kind: H::KIND })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(raw.index());
        self.live_count -= 1;
        Ok(value)
    }

    /// Checks whether `handle` resolves to a live value.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_ok()
    }

    /// Resolves a handle.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotFound`] if the handle is stale or out of range.
    #[inline]
    pub fn get(&self, handle: H) -> WorldResult<&T> {
        let raw = handle.raw();
        self.slots
            .get(raw.index() as usize)
            .filter(|slot| slot.generation == raw.generation())
            .and_then(|slot| slot.value.as_ref())
            .ok_or(WorldError::NotFound { kind: H::KIND })
    }

    /// Resolves a handle mutably.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotFound`] if the handle is stale or out of range.
    #[inline]
    pub fn get_mut(&mut self, handle: H) -> WorldResult<&mut T> {
        let raw = handle.raw();
        self.slots
            .get_mut(raw.index() as usize)
            .filter(|slot| slot.generation == raw.generation())
            .and_then(|slot| slot.value.as_mut())
            .ok_or(WorldError::NotFound { kind: H::KIND })
    }

    /// Iterates over all live values with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                #[allow(clippy::cast_possible_truncation)]
                let raw = RawHandle::new(index as u32, slot.generation);
                (H::from_raw(raw), value)
            })
        })
    }

    /// Iterates mutably over all live values with their handles.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                #[allow(clippy::cast_possible_truncation)]
                let raw = RawHandle::new(index as u32, generation);
                (H::from_raw(raw), value)
            })
        })
    }

    /// Collects the handles of every live value.
    #[must_use]
    pub fn handles(&self) -> Vec<H> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

impl<T, H: Handle> Default for HandleTable<T, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::GameObjectHandle;

    type Table = HandleTable<u32, GameObjectHandle>;

    #[test]
    fn test_allocate_free() {
        let mut table = Table::new();

        let h1 = table.allocate(42).unwrap();
        assert_eq!(*table.get(h1).unwrap(), 42);
        assert_eq!(table.len(), 1);

        let freed = table.free(h1).unwrap();
        assert_eq!(freed, 42);
        assert!(table.is_empty());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut table = Table::new();

        let h1 = table.allocate(1).unwrap();
        table.free(h1).unwrap();

        let h2 = table.allocate(2).unwrap();
        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert_ne!(h1.generation(), h2.generation());

        assert!(matches!(table.get(h1), Err(WorldError::NotFound { .. })));
        assert_eq!(*table.get(h2).unwrap(), 2);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut table = Table::new();
        let h = table.allocate(5).unwrap();
        table.free(h).unwrap();
        assert!(table.free(h).is_err());
        assert_eq!(table.free_count(), 1);
    }

    #[test]
    fn test_generation_increases_per_reuse() {
        let mut table = Table::new();
        let mut last = table.allocate(0).unwrap();
        for value in 1..10 {
            table.free(last).unwrap();
            let next = table.allocate(value).unwrap();
            assert_eq!(next.index(), last.index());
            assert!(next.generation() > last.generation());
            last = next;
        }
    }

    #[test]
    fn test_out_of_range_and_null() {
        let table = Table::new();
        assert!(table.get(GameObjectHandle::from_raw(RawHandle::new(99, 0))).is_err());
        assert!(table.get(GameObjectHandle::NULL).is_err());
    }

    #[test]
    fn test_capacity_limit() {
        let mut table: Table = HandleTable::with_capacity(2, 2);
        assert!(table.capacity() >= 2);
        let _ = table.allocate(1).unwrap();
        let h = table.allocate(2).unwrap();
        assert!(matches!(
            table.allocate(3),
            Err(WorldError::CapacityExceeded { capacity: 2, .. })
        ));

        // Freed slots are still usable under the limit.
        table.free(h).unwrap();
        assert_eq!(table.free_count(), 1);
        assert!(table.allocate(4).is_ok());
        assert_eq!(table.slot_count(), 2);
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut table = Table::new();
        let a = table.allocate(10).unwrap();
        let b = table.allocate(20).unwrap();
        let c = table.allocate(30).unwrap();
        table.free(b).unwrap();

        let live: Vec<_> = table.iter().map(|(h, v)| (h, *v)).collect();
        assert_eq!(live, vec![(a, 10), (c, 30)]);
    }
}
