//! Recycling pool for decoded messages and nested attribute arrays.
//!
//! A [`Pool`] keeps one free list per poolable type. [`Pool::acquire`]
//! pops a value (or allocates one) and wraps it in a [`Pooled`] handle;
//! dropping the handle resets the value and puts it back, as long as the
//! pool is still alive. Values of a dropped pool are simply freed.
//!
//! ```ignore
//! let pool = Pool::new();
//! let mut link = pool.acquire::<IfInfoMessage>();
//! link.set_nsid(3);
//! drop(link);
//! assert_eq!(pool.idle::<IfInfoMessage>(), 1);
//! ```

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::messages::{IfAddrMessage, IfInfoMessage, NeighborMessage, NetnsMessage, RouteMessage};
use super::value::AttrArray;

/// Idle values kept per type; releases beyond this are freed.
const MAX_IDLE: usize = 256;

mod sealed {
    use super::*;

    pub struct FreeList<T> {
        items: Mutex<Vec<Box<T>>>,
    }

    impl<T> Default for FreeList<T> {
        fn default() -> Self {
            Self {
                items: Mutex::new(Vec::new()),
            }
        }
    }

    impl<T> FreeList<T> {
        pub(super) fn take(&self) -> Option<Box<T>> {
            self.items
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop()
        }

        pub(super) fn give(&self, item: Box<T>) {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            debug_assert!(
                !items.iter().any(|idle| std::ptr::eq(&**idle, &*item)),
                "value released twice"
            );
            if items.len() < MAX_IDLE {
                items.push(item);
            }
        }

        pub(super) fn len(&self) -> usize {
            self.items
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[derive(Default)]
    pub struct Shelves {
        pub(super) link: FreeList<IfInfoMessage>,
        pub(super) addr: FreeList<IfAddrMessage>,
        pub(super) route: FreeList<RouteMessage>,
        pub(super) neigh: FreeList<NeighborMessage>,
        pub(super) netns: FreeList<NetnsMessage>,
        pub(super) array: FreeList<AttrArray>,
    }

    pub trait Shelved: Sized {
        fn shelf(shelves: &Shelves) -> &FreeList<Self>;
    }

    macro_rules! shelved {
        ($($ty:ty => $field:ident),* $(,)?) => {
            $(
                impl Shelved for $ty {
                    fn shelf(shelves: &Shelves) -> &FreeList<Self> {
                        &shelves.$field
                    }
                }
            )*
        };
    }

    shelved! {
        IfInfoMessage => link,
        IfAddrMessage => addr,
        RouteMessage => route,
        NeighborMessage => neigh,
        NetnsMessage => netns,
        AttrArray => array,
    }
}

/// A type the pool can recycle.
///
/// Only the crate's message and attribute array types implement it.
pub trait Poolable: sealed::Shelved + Default + Send + 'static {
    /// Return the value to its just-constructed state. Buffers may keep
    /// their capacity.
    fn reset(&mut self);
}

impl Poolable for AttrArray {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Shared handle to a set of free lists.
#[derive(Clone, Default)]
pub struct Pool(Arc<sealed::Shelves>);

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reset value from the pool, allocating if none is idle.
    pub fn acquire<T: Poolable>(&self) -> Pooled<T> {
        let value = T::shelf(&self.0).take().unwrap_or_default();
        Pooled {
            value: ManuallyDrop::new(value),
            home: Arc::downgrade(&self.0),
        }
    }

    /// Number of idle values of type `T`.
    pub fn idle<T: Poolable>(&self) -> usize {
        T::shelf(&self.0).len()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("link", &self.idle::<IfInfoMessage>())
            .field("addr", &self.idle::<IfAddrMessage>())
            .field("route", &self.idle::<RouteMessage>())
            .field("neigh", &self.idle::<NeighborMessage>())
            .field("netns", &self.idle::<NetnsMessage>())
            .field("array", &self.idle::<AttrArray>())
            .finish()
    }
}

/// A value borrowed from a [`Pool`]; returned to it on drop.
pub struct Pooled<T: Poolable> {
    value: ManuallyDrop<Box<T>>,
    home: Weak<sealed::Shelves>,
}

impl<T: Poolable> Pooled<T> {
    /// Wrap a value that belongs to no pool; it is freed on drop.
    pub fn detached(value: T) -> Self {
        Self {
            value: ManuallyDrop::new(Box::new(value)),
            home: Weak::new(),
        }
    }

    /// Give the value back now instead of at the end of its scope.
    pub fn release(self) {
        drop(self);
    }

    /// Whether this value goes back to a live pool when dropped.
    pub fn is_pooled(&self) -> bool {
        self.home.strong_count() > 0
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        // SAFETY: `value` is never touched again after this point.
        let mut value = unsafe { ManuallyDrop::take(&mut self.value) };
        if let Some(shelves) = self.home.upgrade() {
            value.reset();
            T::shelf(&shelves).give(value);
        }
    }
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Poolable + Clone> Clone for Pooled<T> {
    fn clone(&self) -> Self {
        match self.home.upgrade() {
            Some(shelves) => {
                let mut copy = Pool(shelves).acquire::<T>();
                T::clone_from(&mut copy, self);
                copy
            }
            None => Self::detached(T::clone(self)),
        }
    }
}

impl<T: Poolable + PartialEq> PartialEq for Pooled<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: Poolable + fmt::Display> fmt::Display for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
