//! Object pool with stable handles
//!
//! Entities are built once by the pool's factory and reused in place. Each
//! slot carries a generation counter so a handle held after `release` can no
//! longer reach the slot once it has been recycled.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Opaque reference to a pooled instance
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index (stable for the lifetime of the pool)
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    value: T,
    generation: u32,
    active: bool,
}

type Factory<T> = Box<dyn FnMut() -> T>;
type Reset<T> = Box<dyn FnMut(&mut T)>;

/// Growable pool of reusable instances
///
/// `acquire` never fails: it pops a banked slot or constructs a new one.
/// `release` only acts on handles that are currently active, so double or
/// stale releases are silent no-ops.
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    active: usize,
    factory: Factory<T>,
    reset: Option<Reset<T>>,
}

impl<T> ObjectPool<T> {
    /// Create an empty pool that builds instances with `factory`
    pub fn new(factory: impl FnMut() -> T + 'static) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: 0,
            factory: Box::new(factory),
            reset: None,
        }
    }

    /// Create a pool that also runs `reset` on every released instance
    pub fn with_reset(
        factory: impl FnMut() -> T + 'static,
        reset: impl FnMut(&mut T) + 'static,
    ) -> Self {
        let mut pool = Self::new(factory);
        pool.reset = Some(Box::new(reset));
        pool
    }

    /// Total instances ever constructed by this pool
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Instances currently handed out
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Instances banked and ready for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Eagerly construct and bank `count` instances
    pub fn preallocate(&mut self, count: usize) {
        self.slots.reserve(count);
        self.free.reserve(count);
        for _ in 0..count {
            let index = self.slots.len() as u32;
            let value = (self.factory)();
            self.slots.push(Slot {
                value,
                generation: 0,
                active: false,
            });
            self.free.push(index);
        }
    }

    /// Hand out a banked instance, or construct one if none are free
    pub fn acquire(&mut self) -> Handle<T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                let value = (self.factory)();
                self.slots.push(Slot {
                    value,
                    generation: 0,
                    active: false,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.active = true;
        self.active += 1;
        Handle::new(index, slot.generation)
    }

    /// Return an instance to the pool
    ///
    /// The reset hook runs before the slot is banked. Returns `false` when the
    /// handle is unknown, stale, or already released.
    pub fn release(&mut self, handle: Handle<T>) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if !slot.active || slot.generation != handle.generation {
            return false;
        }

        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(reset) = self.reset.as_mut() {
            reset(&mut slot.value);
        }
        self.free.push(handle.index);
        self.active -= 1;
        true
    }

    /// Release every active instance
    pub fn release_all(&mut self) {
        let handles: Vec<_> = self.handles().collect();
        for handle in handles {
            self.release(handle);
        }
    }

    /// Whether `handle` refers to a live acquisition
    pub fn is_active(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    /// Handles of all active instances, in slot order
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| Handle::new(index as u32, slot.generation))
    }

    /// Active instances with their handles, in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| (Handle::new(index as u32, slot.generation), &slot.value))
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation)
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("size", &self.size())
            .field("active", &self.active)
            .field("available", &self.free.len())
            .finish()
    }
}
