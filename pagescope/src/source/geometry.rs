use std::ops::Range;

use crate::{Error, Result};

/// The page layout of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageGeometry {
    file_len: u64,
    page_size: u32,
}

impl PageGeometry {
    pub(crate) fn new(file_len: u64, page_size: u32) -> Self {
        assert!(page_size > 0);
        Self {
            file_len,
            page_size,
        }
    }

    /// Returns the length of the file in bytes.
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns `ceil(file_len / page_size)`.
    pub fn page_count(&self) -> u64 {
        let page_size = self.page_size as u64;
        self.file_len / page_size + u64::from(self.file_len % page_size != 0)
    }

    /// Returns the absolute offset of the first byte of the page.
    ///
    /// The index is not checked against the page count.
    pub fn page_offset(&self, index: u64) -> u64 {
        index.saturating_mul(self.page_size as u64)
    }

    /// Returns the byte range of the page in the file.
    pub fn page_range(&self, index: u64) -> Result<Range<u64>> {
        let count = self.page_count();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }
        let start = self.page_offset(index);
        let end = start + (self.page_size as u64).min(self.file_len - start);
        Ok(start..end)
    }

    /// Returns the length of the page in bytes.
    pub fn page_len(&self, index: u64) -> Result<u64> {
        self.page_range(index).map(|r| r.end - r.start)
    }
}
