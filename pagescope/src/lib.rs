//! A paged viewer core for large files.
//!
//! PageScope maps a file into memory and exposes it as fixed-size pages that
//! are loaded lazily, off the caller's thread, and rendered as a hex dump and
//! a charset-detected text preview.
//!
//! The main types are:
//!
//! - [`PageSource`]: page-addressed reads over the mapping, backed by an LRU
//!   cache of raw pages.
//! - [`PageCollection`]: one [`PageView`] per page index, created on first
//!   access and kept for the lifetime of the collection.
//! - [`PageView`]: the rendering of one page, loaded at most once, with
//!   observers notified when its fields are published.
//!
//! [`strings()`] streams every page of a source and reports the runs of
//! printable ASCII it contains.
//!
//! ```no_run
//! use pagescope::{Options, PageCollection};
//!
//! # async fn example() -> pagescope::Result<()> {
//! let source = pagescope::open("data.bin", Options::default())?;
//! let pages = PageCollection::new(source);
//! let page = pages.get(0)?;
//! page.settled().await;
//! println!("{}\n{}", page.display_header(), page.hex_dump().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, unreachable_pub)]

use std::path::Path;

pub mod cache;
pub mod decode;
pub mod env;

mod error;
pub use error::{Error, Result};

mod options;
pub use options::Options;

mod stats;
pub use stats::{CacheStats, SourceStats};

mod source;
pub use source::{PageGeometry, PageSource};

mod view;
pub use view::{Field, LoadState, PageView};

mod collection;
pub use collection::{Iter, PageCollection};

mod export;
pub use export::{export, export_to_path};

mod strings;
pub use strings::{for_each_string, strings, PrintableString, StringsOptions};

mod util;

/// Opens a file as a [`PageSource`] with its own worker pool.
///
/// This is a shortcut for [`PageSource::open`].
pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<PageSource> {
    PageSource::open(path, options)
}
