//! Script contexts exposed to Python as `jscore.Context`

use std::ptr;

use jscore_sys::*;
use pyo3::prelude::*;
use tracing::debug;

use crate::adapter;
use crate::convert::{Receiver, host_from_script, source_string};
use crate::error::BridgeError;
use crate::exception::raise_script_exception;
use crate::handle::GlobalContext;
use crate::object::ScriptObject;

/// A JavaScriptCore global context.
///
/// Values converted from this context hold a reference to it, so the engine
/// context lives until the last of them is gone.
#[pyclass(module = "jscore", frozen)]
pub struct Context {
    global: GlobalContext,
}

impl Context {
    pub(crate) fn raw(&self) -> JSGlobalContextRef {
        self.global.raw()
    }
}

#[pymethods]
impl Context {
    #[new]
    pub(crate) fn new() -> PyResult<Self> {
        let global = GlobalContext::create()
            .ok_or_else(|| BridgeError::context_creation("engine returned no context"))?;
        Ok(Self { global })
    }

    /// Evaluate `source` and return the converted result.
    #[pyo3(name = "eval")]
    fn evaluate(slf: &Bound<'_, Self>, source: &Bound<'_, PyAny>) -> PyResult<PyObject> {
        let py = slf.py();
        adapter::release_pending(py);

        let Some(script) = source_string(source)? else {
            let type_name = source.get_type().name()?.to_string();
            return Err(BridgeError::InvalidSource(type_name).into());
        };
        let ctx = slf.get().raw();
        let mut exception = ptr::null_mut();
        // SAFETY: ctx is live while slf is borrowed; script is a valid string
        let value = unsafe {
            JSEvaluateScript(
                ctx,
                script.raw(),
                ptr::null_mut(),
                ptr::null_mut(),
                1,
                &mut exception,
            )
        };
        if value.is_null() {
            return Err(raise_script_exception(slf, exception));
        }
        host_from_script(py, value, &Receiver::dummy(slf))
    }

    /// Run the engine's garbage collector.
    #[pyo3(name = "gc")]
    fn garbage_collect(&self, py: Python<'_>) {
        debug!(context = ?self.raw(), "garbage collection requested");
        self.global.collect();
        adapter::release_pending(py);
    }

    /// The global object, not bound to any `this`.
    #[getter(globalObject)]
    fn global_object(slf: &Bound<'_, Self>) -> PyResult<Py<ScriptObject>> {
        let ctx = slf.get().raw();
        // SAFETY: ctx is a live context
        let global = unsafe { JSContextGetGlobalObject(ctx) };
        ScriptObject::bound(slf, global, None)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        debug!(context = ?self.raw(), "tearing down context");
        self.global.collect();
        Python::with_gil(adapter::release_pending);
    }
}
