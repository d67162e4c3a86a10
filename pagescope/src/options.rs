use crate::{Error, Result};

/// Options to configure a page source.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct Options {
    /// The size of a page in bytes. The last page of a file may be shorter.
    ///
    /// Default: 64KB
    pub page_size: u32,

    /// The maximum number of raw pages kept in the cache.
    ///
    /// Default: 128
    pub cache_capacity: usize,

    /// The number of threads of the worker pool that reads and decodes pages.
    ///
    /// Only used when the source creates its own pool.
    ///
    /// Default: 4
    pub worker_threads: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page_size: 64 << 10,
            cache_capacity: 128,
            worker_threads: 4,
        }
    }
}

impl Options {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidArgument("page size must be positive"));
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidArgument("cache capacity must be positive"));
        }
        if self.worker_threads == 0 {
            return Err(Error::InvalidArgument("worker threads must be positive"));
        }
        Ok(())
    }
}
