//! Value conversion between Python objects and engine values
//!
//! Script to Python:
//!
//! | engine      | Python                                  |
//! |-------------|-----------------------------------------|
//! | boolean     | `bool`                                  |
//! | number      | `float` (NaN and infinities preserved)  |
//! | undefined   | `None`                                  |
//! | null        | `jscore.null`                           |
//! | string      | `str`                                   |
//! | PythonObject| the wrapped Python object itself        |
//! | object      | new `ScriptObject`                      |
//!
//! Python to script goes the other way, with `bool` checked before the number
//! protocol and anything without a simpler representation wrapped by the
//! host-object adapter.

use std::ptr;

use jscore_sys::*;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyString};
use tracing::trace;

use crate::adapter;
use crate::context::Context;
use crate::error::BridgeError;
use crate::exception::raise_script_exception;
use crate::object::{self, ScriptObject};
use crate::string::JscString;

/// The context and optional `this` proxy a converted value is bound to.
///
/// Function proxies created through a receiver with a proxy remember that
/// proxy as their `this`. The dummy receiver has none, so results of top-level
/// calls and evaluation are unbound.
pub struct Receiver<'a, 'py> {
    pub context: &'a Bound<'py, Context>,
    pub this: Option<&'a Bound<'py, ScriptObject>>,
}

impl<'a, 'py> Receiver<'a, 'py> {
    /// Receiver for values with no natural `this`.
    pub fn dummy(context: &'a Bound<'py, Context>) -> Self {
        Self {
            context,
            this: None,
        }
    }

    /// Receiver bound to `this`, which must wrap an engine object.
    pub fn bound(context: &'a Bound<'py, Context>, this: &'a Bound<'py, ScriptObject>) -> Self {
        Self {
            context,
            this: Some(this),
        }
    }
}

/// Convert an engine value to a Python object.
pub fn host_from_script(
    py: Python<'_>,
    value: JSValueRef,
    receiver: &Receiver<'_, '_>,
) -> PyResult<PyObject> {
    let context = receiver.context;
    let ctx = context.get().raw();

    // SAFETY: value belongs to ctx, which the receiver keeps alive
    match unsafe { JSValueGetType(ctx, value) } {
        K_JS_TYPE_BOOLEAN => Ok(unsafe { JSValueToBoolean(ctx, value) }.into_py(py)),
        K_JS_TYPE_NUMBER => {
            let mut exception = ptr::null_mut();
            let number = unsafe { JSValueToNumber(ctx, value, &mut exception) };
            if !exception.is_null() {
                return Err(raise_script_exception(context, exception));
            }
            Ok(number.into_py(py))
        }
        K_JS_TYPE_UNDEFINED => Ok(py.None()),
        K_JS_TYPE_NULL => Ok(object::null(py)?.clone_ref(py).into_any()),
        K_JS_TYPE_STRING => Ok(script_value_text(context, value)?.into_py(py)),
        _ => {
            let mut exception = ptr::null_mut();
            let object = unsafe { JSValueToObject(ctx, value, &mut exception) };
            if object.is_null() {
                return Err(raise_script_exception(context, exception));
            }
            // SAFETY: object is a live object of ctx
            if let Some(host) = unsafe { adapter::host_object(ctx, object) } {
                return Ok(host.object.clone_ref(py));
            }
            let this = receiver.this.map(|this| this.clone().unbind());
            Ok(ScriptObject::bound(context, object, this)?.into_any())
        }
    }
}

/// Convert a Python object to an engine value of `context`.
///
/// The returned value is unprotected; callers that keep it beyond the current
/// stack frame must protect it.
pub fn script_from_host(value: &Bound<'_, PyAny>, context: &Bound<'_, Context>) -> PyResult<JSValueRef> {
    let ctx = context.get().raw();

    if value.is_none() {
        // SAFETY: ctx is live
        return Ok(unsafe { JSValueMakeUndefined(ctx) });
    }
    if let Ok(proxy) = value.downcast::<ScriptObject>() {
        return Ok(match proxy.get().binding() {
            Some(binding) => {
                assert!(
                    binding.context.as_ptr() == context.as_ptr(),
                    "ScriptObject passed to a different Context"
                );
                binding.object.raw()
            }
            None => unsafe { JSValueMakeNull(ctx) },
        });
    }
    if let Ok(flag) = value.downcast::<PyBool>() {
        return Ok(unsafe { JSValueMakeBoolean(ctx, flag.is_true()) });
    }
    // SAFETY: value is a live object and we hold the GIL
    if unsafe { ffi::PyNumber_Check(value.as_ptr()) } != 0 {
        match value.extract::<f64>() {
            Ok(number) => return Ok(unsafe { JSValueMakeNumber(ctx, number) }),
            Err(err) => trace!(error = %err, "float coercion failed, trying text and object"),
        }
    }
    if let Some(text) = source_string(value)? {
        return Ok(unsafe { JSValueMakeString(ctx, text.raw()) });
    }
    adapter::wrap(context, value)
}

/// Engine string for a `str` or UTF-8 `bytes` object.
///
/// Returns `None` for any other type. Undecodable bytes are an error.
pub fn source_string(value: &Bound<'_, PyAny>) -> PyResult<Option<JscString>> {
    if let Ok(text) = value.downcast::<PyString>() {
        return Ok(Some(JscString::new(&text.to_cow()?)?));
    }
    if let Ok(bytes) = value.downcast::<PyBytes>() {
        let text = String::from_utf8(bytes.as_bytes().to_vec()).map_err(BridgeError::from)?;
        return Ok(Some(JscString::new(&text)?));
    }
    Ok(None)
}

/// Engine string for a property key. Non-`str` keys go through `str()`.
pub fn key_string(key: &Bound<'_, PyAny>) -> PyResult<JscString> {
    let text = match key.downcast::<PyString>() {
        Ok(text) => text.clone(),
        Err(_) => key.str()?,
    };
    Ok(JscString::new(&text.to_cow()?)?)
}

/// Python index for integer keys in `[0, u32::MAX)`, which use indexed access.
pub fn index_key(key: &Bound<'_, PyAny>) -> Option<u32> {
    if !key.is_instance_of::<pyo3::types::PyLong>() {
        return None;
    }
    let index = key.extract::<i64>().ok()?;
    if (0..i64::from(u32::MAX)).contains(&index) {
        Some(index as u32)
    } else {
        None
    }
}

/// Stringify an engine value the way `String(value)` would.
pub fn script_value_text(context: &Bound<'_, Context>, value: JSValueRef) -> PyResult<String> {
    let ctx = context.get().raw();
    let mut exception = ptr::null_mut();
    // SAFETY: value belongs to ctx; a non-null result is owned by us
    let text = unsafe { JscString::adopt(JSValueToStringCopy(ctx, value, &mut exception)) };
    match text {
        Some(text) => Ok(text.to_text()?),
        None => Err(raise_script_exception(context, exception)),
    }
}
