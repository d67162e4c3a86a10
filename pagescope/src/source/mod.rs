//! Page-indexed random access over a memory-mapped file.

use std::{
    fmt,
    fs::File,
    io,
    ops::Range,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use log::{debug, trace};
use memmap2::Mmap;
use parking_lot::Mutex;

use crate::{
    cache::LruCache,
    env::{Env, Pool},
    stats::SourceStats,
    util::atomic::Counter,
    Error, Options, Result,
};

mod geometry;
pub use geometry::PageGeometry;

/// A read-only, page-addressed view of one file.
///
/// Pages are served from an LRU cache of raw page bytes, or read from the
/// memory-mapped file on a background task of the environment and inserted
/// into the cache. Concurrent fetches of the same page may both read it; the
/// cache converges on one copy.
///
/// Cloning a source returns another handle to the same mapping.
#[derive(Clone)]
pub struct PageSource<E: Env = Pool> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    env: E,
    path: PathBuf,
    geometry: PageGeometry,
    mapping: Mutex<Mapping>,
    closed: AtomicBool,
    cache: LruCache<u64, Bytes>,
    page_reads: Counter,
    read_bytes: Counter,
}

enum Mapping {
    Mapped(Mmap),
    // Zero-length files cannot be mapped.
    Empty,
    Closed,
}

impl PageSource<Pool> {
    /// Opens a file with a worker pool of `options.worker_threads` threads.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        options.validate()?;
        let pool = Pool::new(options.worker_threads)?;
        Self::open_with_env(pool, path, options)
    }
}

impl<E: Env> PageSource<E> {
    /// Opens a file that runs its reads on `env`.
    pub fn open_with_env<P: AsRef<Path>>(env: E, path: P, options: Options) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let (mapping, file_len) = map_file(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let geometry = PageGeometry::new(file_len, options.page_size);
        debug!(
            "Open page source {} with {} bytes in {} pages",
            path.display(),
            file_len,
            geometry.page_count()
        );
        let inner = Inner {
            env,
            path,
            geometry,
            mapping: Mutex::new(mapping),
            closed: AtomicBool::new(false),
            cache: LruCache::new(options.cache_capacity),
            page_reads: Counter::default(),
            read_bytes: Counter::default(),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the bytes of the page at `index`.
    ///
    /// Dropping the returned future before the read starts cancels the read.
    /// A read that has started completes and lands in the cache.
    pub async fn fetch_page(&self, index: u64) -> Result<Bytes> {
        self.check_open()?;
        let range = self.inner.geometry.page_range(index)?;
        if let Some(page) = self.inner.cache.get(&index) {
            trace!("Page {index} cache hit");
            return Ok(page);
        }
        trace!("Page {index} cache miss");
        let inner = self.inner.clone();
        self.inner
            .env
            .spawn_background(async move { inner.read_page(index, range) })
            .await
    }

    /// Releases the mapping and the cached pages.
    ///
    /// Any further fetch fails with [`Error::UseAfterDispose`]. Closing more
    /// than once is a no-op.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.inner.mapping.lock() = Mapping::Closed;
        self.inner.cache.clear();
        debug!("Close page source {}", self.inner.path.display());
    }

    /// Returns true if the source has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns the page layout of the file.
    pub fn geometry(&self) -> PageGeometry {
        self.inner.geometry
    }

    /// Returns the length of the file in bytes.
    pub fn file_len(&self) -> u64 {
        self.inner.geometry.file_len()
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> u32 {
        self.inner.geometry.page_size()
    }

    /// Returns the number of pages.
    pub fn page_count(&self) -> u64 {
        self.inner.geometry.page_count()
    }

    /// Returns the absolute offset of the page.
    pub fn page_offset(&self, index: u64) -> u64 {
        self.inner.geometry.page_offset(index)
    }

    /// Returns the length of the page in bytes.
    pub fn page_len(&self, index: u64) -> Result<u64> {
        self.inner.geometry.page_len(index)
    }

    /// Returns statistics of reads and of the page cache.
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            cache: self.inner.cache.stats(),
            page_reads: self.inner.page_reads.get(),
            read_bytes: self.inner.read_bytes.get(),
        }
    }

    pub(crate) fn env(&self) -> &E {
        &self.inner.env
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::UseAfterDispose);
        }
        Ok(())
    }
}

impl<E: Env> fmt::Debug for PageSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSource")
            .field("path", &self.inner.path)
            .field("geometry", &self.inner.geometry)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<E> Inner<E> {
    fn read_page(&self, index: u64, range: Range<u64>) -> Result<Bytes> {
        let mapping = self.mapping.lock();
        let map = match &*mapping {
            Mapping::Mapped(map) => map,
            Mapping::Closed => return Err(Error::UseAfterDispose),
            Mapping::Empty => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
        };
        let bytes = map
            .get(range.start as usize..range.end as usize)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let page = Bytes::copy_from_slice(bytes);
        self.page_reads.inc();
        self.read_bytes.add(page.len() as u64);
        trace!("Read page {index} at {range:?}");
        // Inserted while the mapping is held so a concurrent close never sees
        // a page land after it cleared the cache.
        self.cache.put(index, page.clone());
        Ok(page)
    }
}

fn map_file(path: &Path) -> io::Result<(Mapping, u64)> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::new(io::ErrorKind::Other, "is a directory"));
    }
    if metadata.len() == 0 {
        return Ok((Mapping::Empty, 0));
    }
    // Safety: the map is read-only and only copies of its bytes escape.
    let map = unsafe { Mmap::map(&file)? };
    let len = map.len() as u64;
    Ok((Mapping::Mapped(map), len))
}

#[cfg(test)]
mod tests {
    use std::{future::Future, thread};

    use futures::{channel::oneshot, executor::block_on, future::BoxFuture, FutureExt};

    use super::*;
    use crate::test_util::{options, random_bytes, temp_file};

    /// Runs every task on a thread of its own, so a task starts as soon as it
    /// is spawned and cannot be cancelled.
    #[derive(Clone, Default)]
    struct Threads(Arc<Mutex<Vec<thread::JoinHandle<()>>>>);

    impl Threads {
        fn spawned(&self) -> usize {
            self.0.lock().len()
        }

        fn join(&self) {
            let handles = std::mem::take(&mut *self.0.lock());
            for handle in handles {
                handle.join().unwrap();
            }
        }
    }

    impl Env for Threads {
        fn spawn_background<F>(&self, f: F) -> BoxFuture<'static, F::Output>
        where
            F: Future + Send + 'static,
            F::Output: Send,
        {
            let (tx, rx) = oneshot::channel();
            self.spawn_detached(async move {
                let _ = tx.send(f.await);
            });
            Box::pin(async move { rx.await.unwrap() })
        }

        fn spawn_detached<F>(&self, f: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            let handle = thread::spawn(move || block_on(f));
            self.0.lock().push(handle);
        }
    }

    #[test]
    fn open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let err = PageSource::open(&path, Options::default()).unwrap_err();
        assert!(matches!(err, Error::Open { path: p, .. } if p == path));

        let err = PageSource::open(dir.path(), Options::default()).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn open_invalid_options() {
        let file = temp_file(b"abc");
        let err = PageSource::open(file.path(), options(0, 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = PageSource::open(file.path(), options(16, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn empty_file() {
        let file = temp_file(b"");
        let source = PageSource::open(file.path(), Options::default()).unwrap();
        assert_eq!(source.file_len(), 0);
        assert_eq!(source.page_count(), 0);
        assert!(matches!(
            block_on(source.fetch_page(0)),
            Err(Error::IndexOutOfRange { index: 0, count: 0 })
        ));
        assert_eq!(source.stats().page_reads, 0);
    }

    #[test]
    fn pages_concatenate_to_file() {
        let content = random_bytes(200_000);
        let file = temp_file(&content);
        let source = PageSource::open(file.path(), options(65536, 8)).unwrap();
        assert_eq!(source.page_count(), 4);
        assert_eq!(source.page_size(), 65536);

        let mut all = Vec::new();
        for i in 0..source.page_count() {
            let page = block_on(source.fetch_page(i)).unwrap();
            if i + 1 < source.page_count() {
                assert_eq!(page.len(), 65536);
            }
            assert_eq!(page.len() as u64, source.page_len(i).unwrap());
            assert_eq!(source.page_offset(i), all.len() as u64);
            all.extend_from_slice(&page);
        }
        assert_eq!(all, content);
        assert_eq!(source.stats().read_bytes, 200_000);
    }

    #[test]
    fn cache_hit() {
        let file = temp_file(&random_bytes(100));
        let source = PageSource::open(file.path(), options(16, 4)).unwrap();
        let first = block_on(source.fetch_page(3)).unwrap();
        let second = block_on(source.fetch_page(3)).unwrap();
        assert_eq!(first, second);

        let stats = source.stats();
        assert_eq!(stats.page_reads, 1);
        assert_eq!(stats.cache.lookup_hit, 1);
        assert_eq!(stats.cache.lookup_miss, 1);
    }

    #[test]
    fn evict_and_refetch() {
        let content = random_bytes(200_000);
        let file = temp_file(&content);
        let source = PageSource::open(file.path(), options(65536, 2)).unwrap();
        assert_eq!(source.page_count(), 4);

        let first = block_on(source.fetch_page(0)).unwrap();
        for i in [1, 2, 3] {
            block_on(source.fetch_page(i)).unwrap();
        }
        let again = block_on(source.fetch_page(0)).unwrap();
        assert_eq!(first, again);
        assert_eq!(&again[..], &content[..65536]);

        let stats = source.stats();
        assert_eq!(stats.page_reads, 5);
        assert_eq!(stats.cache.lookup_miss, 5);
        assert_eq!(stats.cache.lookup_hit, 0);
        assert_eq!(stats.cache.evict, 3);
    }

    #[test]
    fn out_of_range() {
        let file = temp_file(&random_bytes(40));
        let source = PageSource::open(file.path(), options(16, 4)).unwrap();
        assert_eq!(source.page_count(), 3);
        assert!(matches!(
            block_on(source.fetch_page(3)),
            Err(Error::IndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(matches!(
            block_on(source.fetch_page(u64::MAX)),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert_eq!(block_on(source.fetch_page(2)).unwrap().len(), 8);
    }

    #[test]
    fn use_after_close() {
        let file = temp_file(&random_bytes(64));
        let source = PageSource::open(file.path(), options(16, 4)).unwrap();
        block_on(source.fetch_page(0)).unwrap();

        let handle = source.clone();
        source.close();
        source.close();
        assert!(handle.is_closed());
        // Cached pages are gone too.
        assert!(matches!(
            block_on(handle.fetch_page(0)),
            Err(Error::UseAfterDispose)
        ));
        assert!(matches!(
            block_on(handle.fetch_page(1)),
            Err(Error::UseAfterDispose)
        ));
        assert!(format!("{handle:?}").contains("closed: true"));
    }

    #[test]
    fn concurrent_fetch() {
        let content = random_bytes(4096);
        let file = temp_file(&content);
        let source = PageSource::open(file.path(), options(256, 4)).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let source = source.clone();
                let content = content.clone();
                thread::spawn(move || {
                    for i in 0..64u64 {
                        let index = (i * 7 + t) % 16;
                        let page = block_on(source.fetch_page(index)).unwrap();
                        let start = index as usize * 256;
                        assert_eq!(&page[..], &content[start..start + 256]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = source.stats();
        assert_eq!(stats.cache.lookup_hit + stats.cache.lookup_miss, 256);
        assert!(stats.page_reads >= 16);
    }

    #[test]
    fn dropped_fetch_lands_whole() {
        let content = random_bytes(64);
        let file = temp_file(&content);
        let env = Threads::default();
        let source =
            PageSource::open_with_env(env.clone(), file.path(), options(16, 4)).unwrap();

        let mapping = source.inner.mapping.lock();
        // The read starts on its own thread and blocks on the mapping; the
        // caller gives up on it after one poll.
        assert!(source.fetch_page(1).now_or_never().is_none());
        assert_eq!(env.spawned(), 1);
        drop(mapping);
        env.join();

        assert_eq!(
            source.inner.cache.peek(&1).as_deref(),
            Some(&content[16..32])
        );
        assert_eq!(source.stats().page_reads, 1);
        assert_eq!(&block_on(source.fetch_page(1)).unwrap()[..], &content[16..32]);
        assert_eq!(source.stats().cache.lookup_hit, 1);
    }

    #[test]
    fn close_during_read() {
        let content = random_bytes(64);
        let file = temp_file(&content);
        let env = Threads::default();
        let source =
            PageSource::open_with_env(env.clone(), file.path(), options(16, 4)).unwrap();

        let mapping = source.inner.mapping.lock();
        let fetch = {
            let source = source.clone();
            thread::spawn(move || block_on(source.fetch_page(0)))
        };
        while env.spawned() == 0 {
            thread::yield_now();
        }
        let close = {
            let source = source.clone();
            thread::spawn(move || source.close())
        };
        while !source.is_closed() {
            thread::yield_now();
        }
        drop(mapping);
        close.join().unwrap();
        let result = fetch.join().unwrap();
        env.join();

        // Either the read won the mapping or the close did.
        match result {
            Ok(page) => assert_eq!(&page[..], &content[..16]),
            Err(err) => assert!(matches!(err, Error::UseAfterDispose)),
        }
        assert!(source.inner.cache.is_empty());
        assert!(matches!(
            block_on(source.fetch_page(0)),
            Err(Error::UseAfterDispose)
        ));
    }
}
