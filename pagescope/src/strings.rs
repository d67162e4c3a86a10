//! Runs of printable ASCII, found by streaming every page of a source.

use std::mem;

use log::debug;

use crate::{
    decode::is_printable,
    env::Env,
    source::PageSource,
    Error, Result,
};

/// Options to extract printable strings.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct StringsOptions {
    /// The minimum number of printable bytes a run needs to be reported.
    ///
    /// Default: 4
    pub min_len: usize,
}

impl Default for StringsOptions {
    fn default() -> Self {
        Self { min_len: 4 }
    }
}

/// A run of printable ASCII bytes (0x20..=0x7E).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrintableString {
    /// The absolute offset of the first byte of the run.
    pub offset: u64,
    /// The bytes of the run.
    pub text: String,
}

/// Calls `f` with every printable run of the source, in file order.
///
/// Pages are fetched one by one through the page cache; a run that crosses a
/// page boundary is reported once. Stops at the first error of `f` or of a
/// fetch.
pub async fn for_each_string<E, F>(
    source: &PageSource<E>,
    options: &StringsOptions,
    mut f: F,
) -> Result<()>
where
    E: Env,
    F: FnMut(PrintableString) -> Result<()>,
{
    if options.min_len == 0 {
        return Err(Error::InvalidArgument("minimum string length must be positive"));
    }
    let mut scanner = Scanner::new(options.min_len);
    for index in 0..source.page_count() {
        let page = source.fetch_page(index).await?;
        scanner.feed(&page, source.page_offset(index), &mut f)?;
    }
    scanner.flush(&mut f)
}

/// Collects every printable run of the source, in file order.
pub async fn strings<E: Env>(
    source: &PageSource<E>,
    options: &StringsOptions,
) -> Result<Vec<PrintableString>> {
    let mut found = Vec::new();
    for_each_string(source, options, |s| {
        found.push(s);
        Ok(())
    })
    .await?;
    debug!(
        "Found {} strings in {}",
        found.len(),
        source.path().display()
    );
    Ok(found)
}

struct Scanner {
    min_len: usize,
    start: u64,
    run: String,
}

impl Scanner {
    fn new(min_len: usize) -> Self {
        Self {
            min_len,
            start: 0,
            run: String::new(),
        }
    }

    fn feed<F>(&mut self, bytes: &[u8], offset: u64, f: &mut F) -> Result<()>
    where
        F: FnMut(PrintableString) -> Result<()>,
    {
        for (i, &b) in bytes.iter().enumerate() {
            if is_printable(b) {
                if self.run.is_empty() {
                    self.start = offset + i as u64;
                }
                self.run.push(b as char);
            } else {
                self.flush(f)?;
            }
        }
        Ok(())
    }

    fn flush<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(PrintableString) -> Result<()>,
    {
        if self.run.len() < self.min_len {
            self.run.clear();
            return Ok(());
        }
        f(PrintableString {
            offset: self.start,
            text: mem::take(&mut self.run),
        })
    }
}
