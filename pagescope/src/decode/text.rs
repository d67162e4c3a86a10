use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use log::{debug, trace};
use thiserror::Error;

use super::PreviewOptions;

/// The best guess of a charset detector.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// The encoding label, e.g. `UTF-8` or `windows-1252`.
    pub name: String,
    /// How likely the guess is right, from 0 to 1.
    pub confidence: f32,
}

/// Infers the character encoding of a byte buffer.
pub trait CharsetDetector: Send + Sync {
    /// Returns the best guess, or `None` if no encoding is usable.
    fn detect(&self, bytes: &[u8]) -> Option<Detection>;
}

/// A [`CharsetDetector`] backed by `chardetng`.
///
/// A byte order mark wins outright. Otherwise empty buffers and buffers
/// containing NUL bytes yield no guess, and any other guess is reported with
/// confidence 1 if it beat at least one other candidate and 0 otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct Chardet;

impl CharsetDetector for Chardet {
    fn detect(&self, bytes: &[u8]) -> Option<Detection> {
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Some(Detection {
                name: encoding.name().to_owned(),
                confidence: 1.0,
            });
        }
        if bytes.is_empty() || bytes.contains(&0) {
            return None;
        }
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let (encoding, assessed) = detector.guess_assess(None, true);
        Some(Detection {
            name: encoding.name().to_owned(),
            confidence: if assessed { 1.0 } else { 0.0 },
        })
    }
}

#[derive(Error, Debug)]
enum DecodeError {
    #[error("Unknown encoding {0}")]
    UnknownEncoding(String),
}

/// Decodes a whole page with the detected encoding, or as ASCII if nothing
/// usable was detected.
pub(super) fn decode_text(
    bytes: &[u8],
    detector: &dyn CharsetDetector,
    preview: &PreviewOptions,
) -> String {
    if let Some(detection) = detector.detect(bytes) {
        trace!(
            "Detected {} with confidence {}",
            detection.name,
            detection.confidence
        );
        match decode_with(&detection.name, bytes) {
            Ok(text) => {
                return format!(
                    "[Detected: {}]\n{}",
                    detection.name,
                    preview.truncate(&text)
                )
            }
            Err(err) => debug!("Fall back to ASCII: {err}"),
        }
    }
    preview.truncate(&ascii(bytes)).into_owned()
}

fn decode_with(label: &str, bytes: &[u8]) -> Result<String, DecodeError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| DecodeError::UnknownEncoding(label.to_owned()))?;
    let (text, _) = encoding.decode_with_bom_removal(bytes);
    Ok(text.into_owned())
}

/// Maps ASCII bytes to themselves and everything else to `?`.
pub(super) fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
