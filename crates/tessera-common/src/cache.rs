//! TTL cache over mini-moka-wasm.
//!
//! Native builds use the thread-safe sync cache. The browser gets the unsync
//! cache behind `Rc<RefCell<_>>`, since everything there runs on one thread.

use std::hash::Hash;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::*;

    pub struct Inner<K, V>(mini_moka_wasm::sync::Cache<K, V>);

    impl<K, V> Clone for Inner<K, V> {
        fn clone(&self) -> Self {
            Self(self.0.clone())
        }
    }

    impl<K, V> Inner<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        pub fn new(max_capacity: u64, ttl: Duration) -> Self {
            Self(
                mini_moka_wasm::sync::Cache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(ttl)
                    .build(),
            )
        }

        pub fn get(&self, key: &K) -> Option<V> {
            self.0.get(key)
        }

        pub fn insert(&self, key: K, value: V) {
            self.0.insert(key, value);
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub struct Inner<K, V>(Rc<RefCell<mini_moka_wasm::unsync::Cache<K, V>>>);

    impl<K, V> Clone for Inner<K, V> {
        fn clone(&self) -> Self {
            Self(Rc::clone(&self.0))
        }
    }

    impl<K, V> Inner<K, V>
    where
        K: Hash + Eq + 'static,
        V: Clone + 'static,
    {
        pub fn new(max_capacity: u64, ttl: Duration) -> Self {
            Self(Rc::new(RefCell::new(
                mini_moka_wasm::unsync::Cache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(ttl)
                    .build(),
            )))
        }

        pub fn get(&self, key: &K) -> Option<V> {
            self.0.try_borrow_mut().ok()?.get(key).cloned()
        }

        pub fn insert(&self, key: K, value: V) {
            if let Ok(mut cache) = self.0.try_borrow_mut() {
                cache.insert(key, value);
            }
        }
    }
}

/// Bounded cache whose entries expire after a fixed time-to-live.
pub struct TtlCache<K, V> {
    inner: imp::Inner<K, V>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: imp::Inner::new(max_capacity, ttl),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }
}

#[cfg(target_arch = "wasm32")]
impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + 'static,
    V: Clone + 'static,
{
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: imp::Inner::new(max_capacity, ttl),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }
}
