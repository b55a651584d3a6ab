//! RAII wrapper for engine strings and text conversion

use std::ffi::c_char;
use std::fmt;

use jscore_sys::*;

use crate::error::{BridgeError, BridgeResult};

/// Owned `JSStringRef`, released on drop.
pub struct JscString {
    raw: JSStringRef,
}

// SAFETY: engine strings are immutable and reference counted with atomic
// operations; they carry no context affinity.
unsafe impl Send for JscString {}

impl JscString {
    /// Create an engine string from Rust text.
    ///
    /// The string is built from UTF-16 code units so text containing NUL
    /// survives intact.
    pub fn new(text: &str) -> BridgeResult<Self> {
        let units: Vec<JSChar> = text.encode_utf16().collect();
        // SAFETY: units is a live buffer of units.len() code units
        let raw = unsafe { JSStringCreateWithCharacters(units.as_ptr(), units.len()) };
        if raw.is_null() {
            return Err(BridgeError::Encoding(format!(
                "engine could not allocate a string of {} code units",
                units.len()
            )));
        }
        Ok(Self { raw })
    }

    /// Take ownership of a string returned by a `*Copy`/`*Create` call.
    ///
    /// # Safety
    /// `raw` must be null or a string the caller owns one reference to
    pub unsafe fn adopt(raw: JSStringRef) -> Option<Self> {
        if raw.is_null() {
            None
        } else {
            Some(Self { raw })
        }
    }

    /// Get the raw JSStringRef
    pub fn raw(&self) -> JSStringRef {
        self.raw
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        // SAFETY: self.raw is valid
        unsafe { JSStringGetLength(self.raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode into Rust text
    pub fn to_text(&self) -> BridgeResult<String> {
        // SAFETY: self.raw is valid
        unsafe { text_from_script_string(self.raw) }
    }
}

impl Drop for JscString {
    fn drop(&mut self) {
        // SAFETY: we own one reference to self.raw
        unsafe { JSStringRelease(self.raw) };
    }
}

impl fmt::Debug for JscString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(text) => write!(f, "JscString({:?})", text),
            Err(_) => write!(f, "JscString(<undecodable>)"),
        }
    }
}

/// Convert an engine string to Rust text, decoding strictly.
///
/// # Safety
/// `raw` must be a valid JSStringRef
pub unsafe fn text_from_script_string(raw: JSStringRef) -> BridgeResult<String> {
    // SAFETY: raw is valid per caller contract
    let capacity = unsafe { JSStringGetMaximumUTF8CStringSize(raw) };
    let mut buffer: Vec<u8> = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| BridgeError::OutOfMemory)?;
    buffer.resize(capacity, 0);

    // SAFETY: buffer holds `capacity` writable bytes
    let written =
        unsafe { JSStringGetUTF8CString(raw, buffer.as_mut_ptr() as *mut c_char, capacity) };

    // written includes the NUL terminator
    buffer.truncate(written.saturating_sub(1));
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_creation() {
        let s = JscString::new("hello").unwrap();
        assert_eq!(s.to_text().unwrap(), "hello");
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_empty_string() {
        let s = JscString::new("").unwrap();
        assert!(s.is_empty());
        assert_eq!(s.to_text().unwrap(), "");
    }

    #[test]
    fn test_multibyte_string() {
        let text = "\u{263a} caf\u{e9} \u{1f600}";
        let s = JscString::new(text).unwrap();
        // the emoji is a surrogate pair
        assert_eq!(s.len(), text.encode_utf16().count());
        assert_eq!(s.to_text().unwrap(), text);
    }

    #[test]
    fn test_embedded_nul() {
        let s = JscString::new("a\0b").unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.to_text().unwrap(), "a\0b");
    }

    #[test]
    fn test_adopt_null() {
        assert!(unsafe { JscString::adopt(std::ptr::null_mut()) }.is_none());
    }
}
