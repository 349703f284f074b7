//! Removal of invalid UTF-8 from raw response bodies.
//!
//! The certificate service stores some legacy text fields in a single-byte
//! encoding and sends them unconverted inside an otherwise UTF-8 document.
//! Invalid sequences are deleted, not replaced, so words on either side of a
//! bad byte end up joined ("Jos\xE9 Silva" becomes "Jos Silva", while
//! "S\xE3o" becomes "So").

use std::borrow::Cow;

/// Return `raw` as text with every invalid UTF-8 sequence dropped.
///
/// Borrows when the input is already valid, which is the common case.
/// A correctly encoded U+FFFD is kept as is.
pub fn sanitize(raw: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    Cow::Owned(out)
}
