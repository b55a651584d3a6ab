//! Exception translation between Python and the engine
//!
//! Script exceptions surface in Python as `jscore.error`, which keeps the
//! original engine value so rethrowing it into a script produces the same
//! object again. Python exceptions thrown into scripts are wrapped in a
//! `PythonException` object so they come back out with their type, value and
//! traceback untouched.

use std::ptr;

use jscore_sys::*;
use pyo3::exceptions::PyException;
use pyo3::ffi;
use pyo3::prelude::*;
use tracing::warn;

use crate::adapter;
use crate::context::Context;
use crate::convert::{Receiver, host_from_script};
use crate::handle::Protected;
use crate::string::JscString;

/// Message used when a script exception cannot be stringified.
pub const UNPRINTABLE: &str = "unprintable script exception";

/// An engine value kept alive by a `jscore.error`.
///
/// Field order is drop order.
struct Retained {
    exception: Protected,
    context: Py<Context>,
}

/// Errors raised by script code, and by the bridge itself.
#[pyclass(extends = PyException, module = "jscore", name = "error", subclass)]
pub struct ScriptError {
    retained: Option<Retained>,
}

#[pymethods]
impl ScriptError {
    #[new]
    #[pyo3(signature = (*_args))]
    fn new(_args: &Bound<'_, pyo3::types::PyTuple>) -> Self {
        Self { retained: None }
    }

    /// The engine value that was thrown, or `None`.
    #[getter]
    fn exception(&self, py: Python<'_>) -> PyResult<PyObject> {
        match &self.retained {
            Some(retained) => host_from_script(
                py,
                retained.exception.raw(),
                &Receiver::dummy(retained.context.bind(py)),
            ),
            None => Ok(py.None()),
        }
    }
}

/// Turn an engine exception into a Python error.
///
/// A `PythonException` restores the Python exception it carries. Anything
/// else becomes a `jscore.error` holding the engine value.
pub fn raise_script_exception(context: &Bound<'_, Context>, exception: JSValueRef) -> PyErr {
    let py = context.py();
    let ctx = context.get().raw();

    // SAFETY: exception, when non-null, is a live value of ctx
    if let Some(carrier) = unsafe { adapter::host_error(ctx, exception) } {
        if let Some(parts) = &carrier.error {
            let ptype = parts.ptype.clone_ref(py);
            let value = carrier.object.clone_ref(py);
            let traceback = parts
                .traceback
                .as_ref()
                .map_or(ptr::null_mut(), |tb| tb.clone_ref(py).into_ptr());
            // SAFETY: PyErr_Restore steals the three references
            unsafe { ffi::PyErr_Restore(ptype.into_ptr(), value.into_ptr(), traceback) };
            return PyErr::fetch(py);
        }
    }

    let message = describe(ctx, exception);
    let instance = match py.get_type_bound::<ScriptError>().call1((message,)) {
        Ok(instance) => instance,
        Err(err) => return err,
    };
    if !exception.is_null() {
        match instance.downcast::<ScriptError>() {
            Ok(error) => {
                error.borrow_mut().retained = Some(Retained {
                    // SAFETY: exception is a live value of ctx, kept alive by context
                    exception: unsafe { Protected::new(ctx, exception) },
                    context: context.clone().unbind(),
                });
            }
            Err(err) => return err.into(),
        }
    }
    PyErr::from_value_bound(instance)
}

/// Turn a Python error raised inside a callback into an engine exception.
///
/// A `jscore.error` from this context yields the engine value it was built
/// from. Every other error is wrapped in a new `PythonException`.
pub fn script_exception(context: &Bound<'_, Context>, err: PyErr) -> JSValueRef {
    let py = context.py();
    let ctx = context.get().raw();
    let value = err.value_bound(py);

    if let Ok(error) = value.downcast::<ScriptError>() {
        if let Some(retained) = &error.borrow().retained {
            assert!(
                retained.context.as_ptr() == context.as_ptr(),
                "jscore.error raised into a different Context"
            );
            return retained.exception.raw();
        }
    }

    let ptype = err.get_type_bound(py).unbind();
    let traceback = err.traceback_bound(py).map(|tb| tb.into_any().unbind());
    match adapter::wrap_error(context, value.as_any(), ptype, traceback) {
        Ok(carrier) => carrier,
        Err(wrap_err) => {
            warn!(error = %wrap_err, "could not wrap Python exception, throwing its text");
            let text = JscString::new(&err.to_string()).or_else(|_| JscString::new(UNPRINTABLE));
            match text {
                // SAFETY: ctx is live
                Ok(text) => unsafe { JSValueMakeString(ctx, text.raw()) },
                Err(_) => unsafe { JSValueMakeUndefined(ctx) },
            }
        }
    }
}

fn describe(ctx: JSContextRef, exception: JSValueRef) -> String {
    if exception.is_null() {
        return UNPRINTABLE.to_string();
    }
    let mut nested = ptr::null_mut();
    // SAFETY: exception is a live value of ctx; the result is owned by us
    let text = unsafe { JscString::adopt(JSValueToStringCopy(ctx, exception, &mut nested)) };
    match text.map(|text| text.to_text()) {
        Some(Ok(text)) => text,
        Some(Err(err)) => {
            warn!(error = %err, "script exception text is not valid UTF-8");
            UNPRINTABLE.to_string()
        }
        None => {
            warn!("script exception could not be converted to a string");
            UNPRINTABLE.to_string()
        }
    }
}
