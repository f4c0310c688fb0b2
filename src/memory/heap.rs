//! Object heap bookkeeping
//!
//! Objects are reference counted; the heap keeps a weak registry of every
//! allocation so it can report live object and byte counts, and so that a
//! collection can drop the registry entries of objects nobody references
//! any more. Collections are triggered explicitly (`gc()`) or
//! opportunistically once enough allocations have happened since the last
//! one.

use super::object::{Object, ObjectRef};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Byte counts before and after a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug)]
pub struct Heap {
    registry: Vec<Weak<RefCell<Object>>>,
    /// Allocations between opportunistic collections.
    chunk_size: usize,
    allocated_since_collect: usize,
    collections: usize,
    /// Registry length at which dead entries are pruned on allocation.
    prune_mark: usize,
}

const MIN_PRUNE_MARK: usize = 1024;

impl Heap {
    pub fn new(chunk_size: usize) -> Self {
        Heap {
            registry: Vec::new(),
            chunk_size: chunk_size.max(1),
            allocated_since_collect: 0,
            collections: 0,
            prune_mark: MIN_PRUNE_MARK,
        }
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn allocate(&mut self, object: Object) -> ObjectRef {
        if self.registry.len() >= self.prune_mark {
            self.prune();
        }
        let obj = Rc::new(RefCell::new(object));
        self.registry.push(Rc::downgrade(&obj));
        self.allocated_since_collect += 1;
        obj
    }

    /// Estimated bytes held by live objects.
    pub fn bytes(&self) -> usize {
        self.registry
            .iter()
            .filter_map(Weak::upgrade)
            .map(|obj| obj.try_borrow().map(|o| o.estimated_size()).unwrap_or(0))
            .sum()
    }

    /// Bytes held by registry entries, live or not.
    fn registry_bytes(&self) -> usize {
        self.registry.len() * std::mem::size_of::<Weak<RefCell<Object>>>()
    }

    pub fn live_objects(&self) -> usize {
        self.registry.iter().filter(|w| w.strong_count() > 0).count()
    }

    pub fn collections(&self) -> usize {
        self.collections
    }

    /// Weak entries keep their allocation alive, so dead ones are dropped
    /// regularly even when no collection runs.
    fn prune(&mut self) {
        self.registry.retain(|w| w.strong_count() > 0);
        self.prune_mark = (self.registry.len() * 2).max(MIN_PRUNE_MARK);
    }

    /// Drops registry entries for unreachable objects.
    pub fn collect(&mut self) -> GcStats {
        let before = self.bytes() + self.registry_bytes();
        self.prune();
        self.registry.shrink_to(self.chunk_size);
        self.allocated_since_collect = 0;
        self.collections += 1;
        let after = self.bytes() + self.registry_bytes();
        tracing::trace!(before, after, live = self.registry.len(), "heap collection");
        GcStats { before, after }
    }

    /// Collects only if a full chunk of allocations happened since the last
    /// collection.
    pub fn maybe_collect(&mut self) -> Option<GcStats> {
        if self.allocated_since_collect >= self.chunk_size {
            Some(self.collect())
        } else {
            None
        }
    }

    /// Clears every live object, breaking closure/scope reference cycles.
    pub fn teardown(&mut self) {
        for obj in self.registry.drain(..).filter_map(|w| w.upgrade()) {
            if let Ok(mut o) = obj.try_borrow_mut() {
                o.clear();
            }
        }
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::object::ObjectKind;

    #[test]
    fn test_collect_drops_dead_entries() {
        let mut heap = Heap::new(4);
        let kept = heap.allocate(Object::new(ObjectKind::Plain));
        {
            let _dropped = heap.allocate(Object::new(ObjectKind::Array(Vec::new())));
        }
        assert_eq!(heap.live_objects(), 1);

        let stats = heap.collect();
        assert!(stats.after < stats.before);
        assert_eq!(heap.collections(), 1);
        assert!(Rc::strong_count(&kept) == 1);
    }

    #[test]
    fn test_allocation_prunes_dead_entries() {
        let mut heap = Heap::new(1 << 20);
        for _ in 0..MIN_PRUNE_MARK * 3 {
            heap.allocate(Object::new(ObjectKind::Plain));
        }
        assert!(heap.registry.len() <= MIN_PRUNE_MARK + 1);
        assert_eq!(heap.collections(), 0);
    }

    #[test]
    fn test_maybe_collect_waits_for_a_chunk() {
        let mut heap = Heap::new(3);
        let _a = heap.allocate(Object::new(ObjectKind::Plain));
        let _b = heap.allocate(Object::new(ObjectKind::Plain));
        assert!(heap.maybe_collect().is_none());
        let _c = heap.allocate(Object::new(ObjectKind::Plain));
        assert!(heap.maybe_collect().is_some());
    }

    #[test]
    fn test_huge_chunk_size_only_sets_cadence() {
        let mut heap = Heap::new(1);
        heap.set_chunk_size(usize::MAX / 2);
        assert_eq!(heap.chunk_size(), usize::MAX / 2);
        assert!(heap.registry.capacity() < 1024);
        let _a = heap.allocate(Object::new(ObjectKind::Plain));
        assert!(heap.maybe_collect().is_none());
        heap.collect();
        assert_eq!(heap.collections(), 1);
    }
}
