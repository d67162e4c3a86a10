use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use futures::future::{AbortHandle, Abortable};
use log::{trace, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::{
    decode::{Decoder, Rendered},
    env::{Env, Pool},
    source::PageSource,
    util::signal::Signal,
    Error, Result,
};

const UNLOADED: u8 = 0;
const LOADING: u8 = 1;
const LOADED: u8 = 2;
const FAILED: u8 = 3;

/// The load state of a [`PageView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// No load has been requested.
    Unloaded,
    /// The page is being fetched or decoded.
    Loading,
    /// The hex dump and text preview are available.
    Loaded,
    /// The text preview holds the error; there is no hex dump.
    Failed,
}

/// A published field of a [`PageView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// See [`PageView::hex_dump`].
    HexDump,
    /// See [`PageView::text_preview`].
    TextPreview,
}

type Observer = Box<dyn Fn(u64, Field) + Send + Sync>;

/// The rendering of one page, loaded at most once.
///
/// A view moves from `Unloaded` to `Loading` on the first
/// [`ensure_loaded`](PageView::ensure_loaded), then to `Loaded` or `Failed`.
/// Only the first completion is published; the content never changes after.
pub struct PageView<E: Env = Pool> {
    index: u64,
    offset: u64,
    source: PageSource<E>,
    decoder: Decoder,
    state: AtomicU8,
    content: OnceCell<Content>,
    abort: Mutex<Option<AbortHandle>>,
    observers: Mutex<Observers>,
    settled: Signal,
}

struct Content {
    hex_dump: Option<String>,
    text_preview: String,
}

#[derive(Default)]
struct Observers {
    published: bool,
    pending: Vec<Observer>,
}

impl<E: Env> PageView<E> {
    pub(crate) fn new(source: PageSource<E>, decoder: Decoder, index: u64) -> Self {
        Self {
            index,
            offset: source.page_offset(index),
            source,
            decoder,
            state: AtomicU8::new(UNLOADED),
            content: OnceCell::new(),
            abort: Mutex::new(None),
            observers: Mutex::default(),
            settled: Signal::new(),
        }
    }

    /// Starts loading the page in the background unless a load was already
    /// started.
    pub fn ensure_loaded(self: &Arc<Self>) {
        let (handle, registration) = AbortHandle::new_pair();
        {
            let mut abort = self.abort.lock();
            if self
                .state
                .compare_exchange(UNLOADED, LOADING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            *abort = Some(handle);
        }
        trace!("Load page {}", self.index);
        let view = self.clone();
        self.source.env().spawn_detached(async move {
            let result = match Abortable::new(view.load(), registration).await {
                Ok(result) => result,
                Err(_) => Err(Error::Cancelled),
            };
            view.finish(result);
        });
    }

    /// Aborts an in-flight load.
    ///
    /// A load whose read has not started yet never reads the page. A started
    /// read still completes into the page cache. If the abort wins, the view
    /// fails with [`Error::Cancelled`].
    pub fn cancel(&self) {
        if let Some(handle) = self.abort.lock().take() {
            trace!("Cancel page {}", self.index);
            handle.abort();
        }
    }

    /// Registers an observer of published fields.
    ///
    /// The observer is called once per published field after the view is
    /// `Loaded` or `Failed`, immediately if that already happened. A failed
    /// view publishes only [`Field::TextPreview`].
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(u64, Field) + Send + Sync + 'static,
    {
        let observer: Observer = Box::new(observer);
        let mut observers = self.observers.lock();
        if !observers.published {
            observers.pending.push(observer);
            return;
        }
        drop(observers);
        self.notify(&observer);
    }

    /// Resolves once the view is `Loaded` or `Failed`.
    pub fn settled(&self) -> impl Future<Output = ()> + '_ {
        self.settled.fired()
    }

    /// Returns true if the view is `Loaded` or `Failed`.
    pub fn is_settled(&self) -> bool {
        self.settled.is_fired()
    }

    /// Returns the page index.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Returns the absolute offset of the page in the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the load state.
    pub fn state(&self) -> LoadState {
        match self.state.load(Ordering::Acquire) {
            UNLOADED => LoadState::Unloaded,
            LOADING => LoadState::Loading,
            LOADED => LoadState::Loaded,
            _ => LoadState::Failed,
        }
    }

    /// Returns the hex dump once loaded.
    pub fn hex_dump(&self) -> Option<&str> {
        self.content.get().and_then(|c| c.hex_dump.as_deref())
    }

    /// Returns the decoded text, or the error text of a failed load.
    pub fn text_preview(&self) -> Option<&str> {
        self.content.get().map(|c| c.text_preview.as_str())
    }

    /// Returns a label such as `Page 2 (offset 0x20000)`.
    pub fn display_header(&self) -> String {
        format!("Page {} (offset 0x{:X})", self.index, self.offset)
    }

    async fn load(&self) -> Result<Rendered> {
        let bytes = self.source.fetch_page(self.index).await?;
        Ok(self.decoder.render(&bytes, self.offset))
    }

    fn finish(&self, result: Result<Rendered>) {
        let (state, content) = match result {
            Ok(rendered) => (
                LOADED,
                Content {
                    hex_dump: Some(rendered.hex_dump),
                    text_preview: rendered.text,
                },
            ),
            Err(err) => {
                warn!("Load page {} failed: {err}", self.index);
                (
                    FAILED,
                    Content {
                        hex_dump: None,
                        text_preview: format!("[Error reading page: {err}]"),
                    },
                )
            }
        };
        if self.content.set(content).is_err() {
            return;
        }
        self.abort.lock().take();
        self.state.store(state, Ordering::Release);
        self.publish();
    }

    fn publish(&self) {
        let pending = {
            let mut observers = self.observers.lock();
            observers.published = true;
            std::mem::take(&mut observers.pending)
        };
        for observer in &pending {
            self.notify(observer);
        }
        self.settled.fire();
    }

    fn notify(&self, observer: &Observer) {
        if self.hex_dump().is_some() {
            observer(self.index, Field::HexDump);
        }
        observer(self.index, Field::TextPreview);
    }
}

impl<E: Env> fmt::Debug for PageView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("index", &self.index)
            .field("offset", &self.offset)
            .field("state", &self.state())
            .finish()
    }
}
