//! Python-side proxies for engine objects

use std::ptr;

use jscore_sys::*;
use pyo3::prelude::*;
use pyo3::sync::GILOnceCell;
use pyo3::types::{PyDict, PyString, PyTuple};
use tracing::trace;

use crate::adapter;
use crate::context::Context;
use crate::convert::{Receiver, host_from_script, index_key, key_string, script_from_host};
use crate::error::BridgeError;
use crate::exception::raise_script_exception;
use crate::handle::{PropertyNames, Protected};
use crate::string::{JscString, text_from_script_string};

static JS_NULL: GILOnceCell<Py<ScriptObject>> = GILOnceCell::new();

/// The process-wide proxy standing for script `null`.
pub fn null(py: Python<'_>) -> PyResult<&Py<ScriptObject>> {
    JS_NULL.get_or_try_init(py, || Py::new(py, ScriptObject { binding: None }))
}

/// Everything a non-null proxy owns.
///
/// Field order is drop order: the engine handle is unprotected while the
/// context that owns it is still referenced.
pub(crate) struct Binding {
    pub(crate) object: Protected,
    pub(crate) this: Option<Py<ScriptObject>>,
    pub(crate) context: Py<Context>,
}

impl Drop for Binding {
    fn drop(&mut self) {
        trace!(object = ?self.object.raw(), "releasing script object");
    }
}

/// A wrapper for a JavaScript object.
///
/// Attribute access, item access, `in`, iteration and calls are forwarded to
/// the engine object. The `null` proxy has no engine object.
#[pyclass(module = "jscore", name = "ScriptObject", frozen)]
pub struct ScriptObject {
    binding: Option<Binding>,
}

impl ScriptObject {
    /// Wrap `object`, protecting it for the lifetime of the proxy.
    pub(crate) fn bound(
        context: &Bound<'_, Context>,
        object: JSObjectRef,
        this: Option<Py<ScriptObject>>,
    ) -> PyResult<Py<Self>> {
        let ctx = context.get().raw();
        // SAFETY: object is a live object of ctx; the binding keeps ctx alive
        let object = unsafe { Protected::new(ctx, object) };
        trace!(object = ?object.raw(), bound = this.is_some(), "wrapping script object");
        Py::new(
            context.py(),
            Self {
                binding: Some(Binding {
                    object,
                    this,
                    context: context.clone().unbind(),
                }),
            },
        )
    }

    pub(crate) fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    fn require(&self) -> Result<&Binding, BridgeError> {
        self.binding.as_ref().ok_or(BridgeError::NullObject)
    }

    /// Indexed or named property store; `None` deletes.
    fn store(
        &self,
        py: Python<'_>,
        key: &Bound<'_, PyAny>,
        value: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        adapter::release_pending(py);
        let binding = self.require()?;
        let context = binding.context.bind(py);
        let ctx = context.get().raw();
        let object = binding.object.as_object();

        let value = value.map(|v| script_from_host(v, context)).transpose()?;
        let mut exception = ptr::null_mut();

        if let (Some(value), Some(index)) = (value, index_key(key)) {
            // SAFETY: object and value belong to ctx
            unsafe { JSObjectSetPropertyAtIndex(ctx, object, index, value, &mut exception) };
            if !exception.is_null() {
                return Err(raise_script_exception(context, exception));
            }
            return Ok(());
        }

        let name = key_string(key)?;
        let mut deleted = false;
        // SAFETY: object, name and value belong to ctx
        unsafe {
            match value {
                Some(value) => JSObjectSetProperty(
                    ctx,
                    object,
                    name.raw(),
                    value,
                    K_JS_PROPERTY_ATTRIBUTE_NONE,
                    &mut exception,
                ),
                None => deleted = JSObjectDeleteProperty(ctx, object, name.raw(), &mut exception),
            }
        }
        if !deleted && !exception.is_null() {
            return Err(raise_script_exception(context, exception));
        }
        Ok(())
    }
}

#[pymethods]
impl ScriptObject {
    fn __getitem__(slf: &Bound<'_, Self>, key: &Bound<'_, PyAny>) -> PyResult<PyObject> {
        let py = slf.py();
        adapter::release_pending(py);
        let binding = slf.get().require()?;
        let context = binding.context.bind(py);
        let ctx = context.get().raw();
        let object = binding.object.as_object();
        let mut exception = ptr::null_mut();

        // SAFETY: object belongs to ctx
        let value = match index_key(key) {
            Some(index) => unsafe { JSObjectGetPropertyAtIndex(ctx, object, index, &mut exception) },
            None => {
                let name = key_string(key)?;
                unsafe { JSObjectGetProperty(ctx, object, name.raw(), &mut exception) }
            }
        };
        if value.is_null() {
            return Err(raise_script_exception(context, exception));
        }
        host_from_script(py, value, &Receiver::bound(context, slf))
    }

    fn __setitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>, value: &Bound<'_, PyAny>) -> PyResult<()> {
        self.store(py, key, Some(value))
    }

    fn __delitem__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<()> {
        self.store(py, key, None)
    }

    /// Only reached once normal attribute lookup has failed.
    fn __getattr__(slf: &Bound<'_, Self>, name: &Bound<'_, PyString>) -> PyResult<PyObject> {
        let py = slf.py();
        adapter::release_pending(py);
        let name = name.to_cow()?;
        let Some(binding) = slf.get().binding() else {
            return Err(BridgeError::MissingProperty(name.into_owned()).into());
        };
        let context = binding.context.bind(py);
        let ctx = context.get().raw();
        let object = binding.object.as_object();
        let key = JscString::new(&name)?;

        // SAFETY: object belongs to ctx
        if !unsafe { JSObjectHasProperty(ctx, object, key.raw()) } {
            return Err(BridgeError::MissingProperty(name.into_owned()).into());
        }
        let mut exception = ptr::null_mut();
        let value = unsafe { JSObjectGetProperty(ctx, object, key.raw(), &mut exception) };
        if value.is_null() {
            return Err(raise_script_exception(context, exception));
        }
        host_from_script(py, value, &Receiver::bound(context, slf))
    }

    fn __setattr__(&self, py: Python<'_>, name: &Bound<'_, PyString>, value: &Bound<'_, PyAny>) -> PyResult<()> {
        self.store(py, name.as_any(), Some(value))
    }

    fn __delattr__(&self, py: Python<'_>, name: &Bound<'_, PyString>) -> PyResult<()> {
        self.store(py, name.as_any(), None)
    }

    fn __contains__(&self, py: Python<'_>, key: &Bound<'_, PyAny>) -> PyResult<bool> {
        adapter::release_pending(py);
        let binding = self.require()?;
        let ctx = binding.context.bind(py).get().raw();
        let name = key_string(key)?;
        // SAFETY: the object belongs to ctx
        Ok(unsafe { JSObjectHasProperty(ctx, binding.object.as_object(), name.raw()) })
    }

    fn __iter__(slf: &Bound<'_, Self>) -> PyResult<ScriptObjectIterator> {
        let py = slf.py();
        adapter::release_pending(py);
        let binding = slf.get().require()?;
        let ctx = binding.context.bind(py).get().raw();
        // SAFETY: the object belongs to ctx
        let names = unsafe { PropertyNames::copy(ctx, binding.object.as_object()) };
        trace!(count = names.len(), "snapshot of property names");
        Ok(ScriptObjectIterator {
            names,
            index: 0,
            owner: slf.clone().unbind(),
        })
    }

    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(
        &self,
        py: Python<'_>,
        args: &Bound<'_, PyTuple>,
        kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<PyObject> {
        if kwargs.is_some_and(|kwargs| !kwargs.is_empty()) {
            return Err(BridgeError::KeywordArguments.into());
        }
        adapter::release_pending(py);
        let binding = self.require()?;
        let context = binding.context.bind(py);
        let ctx = context.get().raw();
        let function = binding.object.as_object();

        // SAFETY: function belongs to ctx
        if !unsafe { JSObjectIsFunction(ctx, function) } {
            return Err(BridgeError::NotCallable.into());
        }

        // protected until the call returns; a later conversion may collect
        let arguments = args
            .iter()
            .map(|arg| {
                let value = script_from_host(&arg, context)?;
                // SAFETY: value was just produced for ctx
                Ok(unsafe { Protected::new(ctx, value) })
            })
            .collect::<PyResult<Vec<_>>>()?;
        let raw: Vec<JSValueRef> = arguments.iter().map(Protected::raw).collect();

        let this_object = binding
            .this
            .as_ref()
            .and_then(|this| this.get().binding().map(|b| b.object.as_object()))
            .unwrap_or(ptr::null_mut());

        let mut exception = ptr::null_mut();
        let value = unsafe {
            JSObjectCallAsFunction(
                ctx,
                function,
                this_object,
                raw.len(),
                raw.as_ptr(),
                &mut exception,
            )
        };
        drop(arguments);
        if value.is_null() {
            return Err(raise_script_exception(context, exception));
        }
        host_from_script(py, value, &Receiver::dummy(context))
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        match &self.binding {
            None => "<ScriptObject [null]>".to_string(),
            Some(binding) => {
                let ctx = binding.context.bind(py).get().raw();
                let object = binding.object.as_object();
                // SAFETY: object belongs to ctx
                let kind = if unsafe { JSObjectIsFunction(ctx, object) } {
                    "function"
                } else {
                    "object"
                };
                format!("<ScriptObject [{}] at {:p}>", kind, object)
            }
        }
    }
}

/// Iterator over the property names a `ScriptObject` had when iteration
/// started.
#[pyclass(module = "jscore")]
pub struct ScriptObjectIterator {
    names: PropertyNames,
    index: usize,
    owner: Py<ScriptObject>,
}

#[pymethods]
impl ScriptObjectIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(&mut self) -> PyResult<Option<String>> {
        let Some(name) = self.names.name_at(self.index) else {
            return Ok(None);
        };
        self.index += 1;
        // SAFETY: name is borrowed from self.names, which is still alive
        Ok(Some(unsafe { text_from_script_string(name) }?))
    }

    fn __length_hint__(&self) -> usize {
        self.names.len().saturating_sub(self.index)
    }
}

impl Drop for ScriptObjectIterator {
    fn drop(&mut self) {
        trace!(owner = ?self.owner.as_ptr(), "releasing property iterator");
    }
}
