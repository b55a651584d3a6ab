//! Per-object capability flags read from `__jsflags__`

use bitflags::bitflags;
use jscore_sys::*;
use pyo3::intern;
use pyo3::prelude::*;
use tracing::trace;

/// Leading character of attribute names hidden from scripts by default
pub const PRIVATE_MARKER: char = '_';

bitflags! {
    /// Opt-ins a Python object grants to script code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JsFlags: u32 {
        /// Expose attributes whose names start with `_`
        const ALLOW_PRIVATE_ATTR = 1 << 0;
        /// Let scripts assign and delete attributes
        const ALLOW_MODIFY_ATTR = 1 << 1;
    }
}

impl JsFlags {
    /// Interpret a raw `__jsflags__` value. Negative values grant nothing.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            return Self::empty();
        }
        Self::from_bits_truncate(raw as u32)
    }

    /// Read the flags of `object`.
    ///
    /// A missing attribute, a non-integer value or any error raised while
    /// reading it all count as no flags. The error is discarded.
    pub fn of(object: &Bound<'_, PyAny>) -> Self {
        let py = object.py();
        match object
            .getattr(intern!(py, "__jsflags__"))
            .and_then(|flags| flags.extract::<i64>())
        {
            Ok(raw) => Self::from_raw(raw),
            Err(err) => {
                trace!(error = %err, "no usable __jsflags__");
                Self::empty()
            }
        }
    }

    pub fn allows_private(self) -> bool {
        self.contains(Self::ALLOW_PRIVATE_ATTR)
    }

    pub fn allows_modify(self) -> bool {
        self.contains(Self::ALLOW_MODIFY_ATTR)
    }
}

/// Whether an engine property name starts with the private marker.
///
/// # Safety
/// `name` must be a valid JSStringRef
pub unsafe fn is_private_name(name: JSStringRef) -> bool {
    // SAFETY: name is valid per caller contract; the pointer covers `len` units
    unsafe {
        if JSStringGetLength(name) == 0 {
            return false;
        }
        let chars = JSStringGetCharactersPtr(name);
        !chars.is_null() && *chars == PRIVATE_MARKER as JSChar
    }
}
