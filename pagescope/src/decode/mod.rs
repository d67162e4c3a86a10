//! Turns raw page bytes into a hex dump and a best-effort text preview.

use std::{borrow::Cow, fmt, fmt::Write, sync::Arc};

mod hex;
pub(crate) use hex::is_printable;
pub use hex::hex_dump;

mod text;
pub use text::{Chardet, CharsetDetector, Detection};

/// Options to bound the size of text previews.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewOptions {
    /// The maximum number of characters of decoded text kept.
    ///
    /// Default: 2000
    pub max_chars: usize,

    /// If true, a cut preview ends with `...(truncated, length N)` where `N`
    /// is the decoded length in characters.
    ///
    /// Default: false
    pub mark_truncation: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            mark_truncation: false,
        }
    }
}

impl PreviewOptions {
    /// Options for terminal output: a longer preview that says when it was cut.
    pub fn console() -> Self {
        Self {
            max_chars: 10_000,
            mark_truncation: true,
        }
    }

    pub(crate) fn truncate<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some((cut, _)) = text.char_indices().nth(self.max_chars) else {
            return Cow::Borrowed(text);
        };
        let mut out = text[..cut].to_owned();
        if self.mark_truncation {
            let _ = write!(out, "\n...(truncated, length {})", text.chars().count());
        }
        Cow::Owned(out)
    }
}

/// The renderings of one page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// The hex dump, see [`hex_dump`].
    pub hex_dump: String,
    /// The decoded text, prefixed with `[Detected: <name>]` when an encoding
    /// was detected.
    pub text: String,
}

/// The decode pipeline: hex rendering, charset detection and text decoding.
#[derive(Clone)]
pub struct Decoder {
    detector: Arc<dyn CharsetDetector>,
    preview: PreviewOptions,
}

impl Decoder {
    /// Creates a decoder that detects charsets with [`Chardet`].
    pub fn new(preview: PreviewOptions) -> Self {
        Self::with_detector(Chardet, preview)
    }

    /// Creates a decoder with a custom charset detector.
    pub fn with_detector<D>(detector: D, preview: PreviewOptions) -> Self
    where
        D: CharsetDetector + 'static,
    {
        Self {
            detector: Arc::new(detector),
            preview,
        }
    }

    /// Returns the preview options.
    pub fn preview(&self) -> &PreviewOptions {
        &self.preview
    }

    /// Renders a page whose first byte is at `offset` in the file.
    pub fn render(&self, bytes: &[u8], offset: u64) -> Rendered {
        Rendered {
            hex_dump: hex_dump(bytes, offset),
            text: self.decode_text(bytes),
        }
    }

    /// Decodes the whole buffer with the detected charset.
    ///
    /// Falls back to ASCII, with non-ASCII bytes shown as `?`, when nothing
    /// usable is detected or the detected encoding is unknown.
    pub fn decode_text(&self, bytes: &[u8]) -> String {
        text::decode_text(bytes, self.detector.as_ref(), &self.preview)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(PreviewOptions::default())
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("preview", &self.preview)
            .finish_non_exhaustive()
    }
}
