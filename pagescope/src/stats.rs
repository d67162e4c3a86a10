use crate::util::atomic::Counter;

/// Statistics of a page source.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    /// Statistics of the raw page cache.
    pub cache: CacheStats,
    /// The number of pages read from the mapped file.
    pub page_reads: u64,
    /// The number of bytes read from the mapped file.
    pub read_bytes: u64,
}

/// Statistics of a page cache.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found an entry.
    pub lookup_hit: u64,
    /// Lookups that found nothing.
    pub lookup_miss: u64,
    /// Inserted or replaced entries.
    pub insert: u64,
    /// Entries evicted to stay within capacity.
    pub evict: u64,
}

#[derive(Default)]
pub(crate) struct AtomicCacheStats {
    pub(crate) lookup_hit: Counter,
    pub(crate) lookup_miss: Counter,
    pub(crate) insert: Counter,
    pub(crate) evict: Counter,
}

impl AtomicCacheStats {
    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookup_hit: self.lookup_hit.get(),
            lookup_miss: self.lookup_miss.get(),
            insert: self.insert.get(),
            evict: self.evict.get(),
        }
    }
}
