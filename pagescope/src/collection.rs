use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{
    decode::Decoder,
    env::{Env, Pool},
    source::PageSource,
    view::PageView,
    Error, Result,
};

const SEGMENT_BITS: u32 = 10;
const SEGMENT_LEN: u64 = 1 << SEGMENT_BITS;

type Segment<E> = Box<[OnceCell<Arc<PageView<E>>>]>;

/// All pages of one [`PageSource`], addressed by index.
///
/// Views are created on first access and kept for the lifetime of the
/// collection, so the same index always yields the same view. The size is
/// fixed by the source; there is no way to insert or remove views.
pub struct PageCollection<E: Env = Pool> {
    source: PageSource<E>,
    decoder: Decoder,
    count: u64,
    // Slots are grouped in lazily allocated segments of `SEGMENT_LEN` views.
    segments: Box<[OnceCell<Segment<E>>]>,
}

impl<E: Env> PageCollection<E> {
    /// Creates a collection that renders pages with the default [`Decoder`].
    pub fn new(source: PageSource<E>) -> Self {
        Self::with_decoder(source, Decoder::default())
    }

    /// Creates a collection that renders pages with `decoder`.
    pub fn with_decoder(source: PageSource<E>, decoder: Decoder) -> Self {
        let count = source.page_count();
        // The file is mapped, so the number of segments fits the address space.
        let segments = (0..(count + SEGMENT_LEN - 1) / SEGMENT_LEN)
            .map(|_| OnceCell::new())
            .collect();
        Self {
            source,
            decoder,
            count,
            segments,
        }
    }

    /// Returns the view of the page at `index`.
    ///
    /// The first access creates the view and starts loading it in the
    /// background; the returned view may still be `Loading`.
    pub fn get(&self, index: u64) -> Result<Arc<PageView<E>>> {
        if index >= self.count {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.count,
            });
        }
        let segment = (index >> SEGMENT_BITS) as usize;
        let slot = (index & (SEGMENT_LEN - 1)) as usize;
        let segment = self.segments[segment].get_or_init(|| {
            let start = index & !(SEGMENT_LEN - 1);
            let len = SEGMENT_LEN.min(self.count - start);
            (0..len).map(|_| OnceCell::new()).collect()
        });
        let mut created = false;
        let view = segment[slot].get_or_init(|| {
            created = true;
            Arc::new(PageView::new(
                self.source.clone(),
                self.decoder.clone(),
                index,
            ))
        });
        if created {
            view.ensure_loaded();
        }
        Ok(view.clone())
    }

    /// Returns the number of pages.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns true if the source has no pages.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the source of the pages.
    pub fn source(&self) -> &PageSource<E> {
        &self.source
    }

    /// Returns the decoder that renders the pages.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Returns an iterator over the views of all pages in ascending order.
    ///
    /// Each step behaves like [`get`](PageCollection::get).
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            pages: self,
            next: 0,
        }
    }
}

impl<E: Env> fmt::Debug for PageCollection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCollection")
            .field("source", &self.source)
            .field("count", &self.count)
            .finish()
    }
}

impl<'a, E: Env> IntoIterator for &'a PageCollection<E> {
    type Item = Arc<PageView<E>>;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the views of a [`PageCollection`].
pub struct Iter<'a, E: Env = Pool> {
    pages: &'a PageCollection<E>,
    next: u64,
}

impl<'a, E: Env> Iterator for Iter<'a, E> {
    type Item = Arc<PageView<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.pages.get(self.next).ok()?;
        self.next += 1;
        Some(view)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.pages.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}
