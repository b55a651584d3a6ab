//! Ownership handles for engine-side resources
//!
//! Every engine reference the bridge keeps across a call is held by exactly
//! one of these types. Construction performs the acquire, `Drop` performs the
//! matching release.
//!
//! # Thread Safety
//!
//! The handles are `Send + Sync` so they can live inside Python classes.
//! Every engine call the bridge makes happens with the GIL held, and the
//! engine takes its own API lock per call.

use jscore_sys::*;
use tracing::{debug, trace};

/// A value shielded from the engine's garbage collector.
pub struct Protected {
    ctx: JSContextRef,
    value: JSValueRef,
}

// SAFETY: see module docs
unsafe impl Send for Protected {}
unsafe impl Sync for Protected {}

impl Protected {
    /// Protect `value` until the handle is dropped.
    ///
    /// # Safety
    /// `value` must be a non-null value of `ctx`, and `ctx` must outlive the
    /// handle.
    pub unsafe fn new(ctx: JSContextRef, value: JSValueRef) -> Self {
        // SAFETY: ctx and value are valid per caller contract
        unsafe { JSValueProtect(ctx, value) };
        Self { ctx, value }
    }

    pub fn raw(&self) -> JSValueRef {
        self.value
    }

    /// The handle as an object reference. Only meaningful for objects.
    pub fn as_object(&self) -> JSObjectRef {
        self.value
    }
}

impl Drop for Protected {
    fn drop(&mut self) {
        // SAFETY: the value was protected against self.ctx in new()
        unsafe { JSValueUnprotect(self.ctx, self.value) };
    }
}

/// Snapshot of an object's enumerable property names.
pub struct PropertyNames {
    raw: JSPropertyNameArrayRef,
    count: usize,
}

// SAFETY: see module docs
unsafe impl Send for PropertyNames {}
unsafe impl Sync for PropertyNames {}

impl PropertyNames {
    /// Copy the current property names of `object`.
    ///
    /// # Safety
    /// `object` must be a live object of `ctx`
    pub unsafe fn copy(ctx: JSContextRef, object: JSObjectRef) -> Self {
        // SAFETY: ctx and object are valid per caller contract
        unsafe {
            let raw = JSObjectCopyPropertyNames(ctx, object);
            let count = JSPropertyNameArrayGetCount(raw);
            Self { raw, count }
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    /// Borrowed name at `index`, valid while `self` lives.
    pub fn name_at(&self, index: usize) -> Option<JSStringRef> {
        if index >= self.count {
            return None;
        }
        // SAFETY: index is in bounds
        Some(unsafe { JSPropertyNameArrayGetNameAtIndex(self.raw, index) })
    }
}

impl Drop for PropertyNames {
    fn drop(&mut self) {
        // SAFETY: the array was returned by JSObjectCopyPropertyNames
        unsafe { JSPropertyNameArrayRelease(self.raw) };
    }
}

/// An owned global context.
pub struct GlobalContext {
    raw: JSGlobalContextRef,
}

// SAFETY: see module docs
unsafe impl Send for GlobalContext {}
unsafe impl Sync for GlobalContext {}

impl GlobalContext {
    /// Create a context with the default global object class.
    pub fn create() -> Option<Self> {
        // SAFETY: a null class selects the default global object
        let raw = unsafe { JSGlobalContextCreate(std::ptr::null_mut()) };
        if raw.is_null() {
            return None;
        }
        debug!(context = ?raw, "created global context");
        Some(Self { raw })
    }

    pub fn raw(&self) -> JSGlobalContextRef {
        self.raw
    }

    /// Run a garbage collection pass.
    pub fn collect(&self) {
        // SAFETY: self.raw is a live context
        unsafe { JSGarbageCollect(self.raw) };
    }
}

impl Drop for GlobalContext {
    fn drop(&mut self) {
        debug!(context = ?self.raw, "releasing global context");
        // SAFETY: we own the reference returned by JSGlobalContextCreate
        unsafe { JSGlobalContextRelease(self.raw) };
    }
}

/// An engine class definition.
pub struct ClassRef {
    raw: JSClassRef,
}

// SAFETY: classes are immutable once created and shared by all contexts
unsafe impl Send for ClassRef {}
unsafe impl Sync for ClassRef {}

impl ClassRef {
    /// Register a class. The definition is copied by the engine.
    pub fn create(definition: &JSClassDefinition) -> Self {
        // SAFETY: definition points to a fully initialised struct
        let raw = unsafe { JSClassCreate(definition) };
        trace!(class = ?raw, "created engine class");
        Self { raw }
    }

    pub fn raw(&self) -> JSClassRef {
        self.raw
    }
}

impl Drop for ClassRef {
    fn drop(&mut self) {
        // SAFETY: we own the reference returned by JSClassCreate
        unsafe { JSClassRelease(self.raw) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::{JscString, text_from_script_string};

    #[test]
    fn test_context_lifecycle() {
        let ctx = GlobalContext::create().unwrap();
        assert!(!ctx.raw().is_null());
        ctx.collect();
    }

    #[test]
    fn test_property_names_snapshot() {
        let ctx = GlobalContext::create().unwrap();
        let source = JscString::new("({a: 1, b: 2, c: 3})").unwrap();
        unsafe {
            let mut exception = std::ptr::null_mut();
            let value = JSEvaluateScript(
                ctx.raw(),
                source.raw(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                1,
                &mut exception,
            );
            assert!(!value.is_null());
            let object = Protected::new(ctx.raw(), value);
            let names = PropertyNames::copy(ctx.raw(), object.as_object());
            assert_eq!(names.len(), 3);

            let key = JscString::new("d").unwrap();
            JSObjectSetProperty(
                ctx.raw(),
                object.as_object(),
                key.raw(),
                JSValueMakeNumber(ctx.raw(), 4.0),
                K_JS_PROPERTY_ATTRIBUTE_NONE,
                std::ptr::null_mut(),
            );

            let collected: Vec<String> = (0..names.len())
                .map(|i| text_from_script_string(names.name_at(i).unwrap()).unwrap())
                .collect();
            assert_eq!(collected, ["a", "b", "c"]);
            assert!(names.name_at(3).is_none());
        }
    }
}
