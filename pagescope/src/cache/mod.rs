//! Bounded caches.

mod lru;
pub use lru::LruCache;
