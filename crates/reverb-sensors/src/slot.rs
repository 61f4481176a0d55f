//! Independently guarded snapshot slots.
//!
//! A [`SnapshotSlot`] holds the latest `Arc<T>` published for one kind of
//! pair data. Writers build the replacement outside the slot and install
//! it with a single handle swap under the write guard; readers clone the
//! handle under the read guard. Neither side ever holds the guard while
//! calling into another component.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reverb_core::Generation;

/// Latest published value of type `T`, plus a generation counter bumped on
/// every install or in-place modification.
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    value: RwLock<Option<Arc<T>>>,
    generation: AtomicU64,
}

// Compile-time assertion: slots of shareable payloads are Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SnapshotSlot<Vec<f64>>>();
};

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotSlot<T> {
    /// An empty slot at [`Generation(0)`](Generation).
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    // Every critical section is a single handle swap or clone, so a
    // poisoned guard still protects a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<T>>> {
        self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<T>>> {
        self.value.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current value and return the new generation.
    pub fn install(&self, value: Arc<T>) -> Generation {
        let mut guard = self.write();
        *guard = Some(value);
        // Bumped under the write guard so readers see value and
        // generation change together.
        Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The current value, or `None` if nothing has been installed.
    pub fn load(&self) -> Option<Arc<T>> {
        self.read().clone()
    }

    /// The current value together with the generation that installed it.
    pub fn load_with_generation(&self) -> Option<(Arc<T>, Generation)> {
        let guard = self.read();
        let value = guard.as_ref().map(Arc::clone)?;
        Some((value, Generation(self.generation.load(Ordering::Acquire))))
    }

    /// Generation of the current value; `Generation(0)` if never written.
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// True when a value has been installed.
    pub fn is_set(&self) -> bool {
        self.read().is_some()
    }
}

impl<T: Clone> SnapshotSlot<T> {
    /// Mutate the current value in place under the write guard, creating
    /// it with `init` if the slot is empty.
    ///
    /// Readers holding an earlier snapshot keep it unchanged: the value is
    /// cloned first if any snapshot is still shared. Bumps the generation.
    pub fn modify_or_insert_with<R>(
        &self,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut guard = self.write();
        let arc = guard.get_or_insert_with(|| Arc::new(init()));
        let result = f(Arc::make_mut(arc));
        self.generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Mutate the current value in place, if there is one.
    ///
    /// Returns `None` without bumping the generation when the slot is
    /// empty.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.write();
        let arc = guard.as_mut()?;
        let result = f(Arc::make_mut(arc));
        self.generation.fetch_add(1, Ordering::AcqRel);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot() {
        let slot: SnapshotSlot<u32> = SnapshotSlot::new();
        assert!(slot.load().is_none());
        assert!(slot.load_with_generation().is_none());
        assert_eq!(slot.generation(), Generation(0));
        assert!(!slot.is_set());
    }

    #[test]
    fn install_replaces_and_bumps() {
        let slot = SnapshotSlot::new();
        assert_eq!(slot.install(Arc::new(1)), Generation(1));
        assert_eq!(slot.install(Arc::new(2)), Generation(2));
        assert_eq!(*slot.load().unwrap(), 2);
        let (v, g) = slot.load_with_generation().unwrap();
        assert_eq!((*v, g), (2, Generation(2)));
    }

    #[test]
    fn install_shares_the_handle() {
        let slot = SnapshotSlot::new();
        let value = Arc::new(vec![1.0, 2.0]);
        slot.install(Arc::clone(&value));
        assert!(Arc::ptr_eq(&value, &slot.load().unwrap()));
    }

    #[test]
    fn modify_preserves_outstanding_snapshots() {
        let slot = SnapshotSlot::new();
        slot.install(Arc::new(vec![1]));
        let before = slot.load().unwrap();
        slot.modify(|v| v.push(2)).unwrap();
        assert_eq!(*before, vec![1]);
        assert_eq!(*slot.load().unwrap(), vec![1, 2]);
        assert_eq!(slot.generation(), Generation(2));
    }

    #[test]
    fn modify_on_empty_slot_is_none() {
        let slot: SnapshotSlot<Vec<i32>> = SnapshotSlot::new();
        assert!(slot.modify(|v| v.push(1)).is_none());
        assert_eq!(slot.generation(), Generation(0));
    }

    #[test]
    fn modify_or_insert_initialises_once() {
        let slot: SnapshotSlot<Vec<i32>> = SnapshotSlot::new();
        slot.modify_or_insert_with(Vec::new, |v| v.push(1));
        slot.modify_or_insert_with(|| vec![99], |v| v.push(2));
        assert_eq!(*slot.load().unwrap(), vec![1, 2]);
    }
}
