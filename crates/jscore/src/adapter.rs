//! Engine class that makes Python objects usable from scripts
//!
//! Instances of `PythonObject` carry a boxed [`HostObject`] as private data.
//! Property lookups, assignments, deletions and calls are forwarded to the
//! Python object under the GIL. `PythonException` derives from it and
//! additionally carries the type and traceback of a Python exception so the
//! exception can be restored exactly when it comes back.

use std::ffi::c_void;
use std::ptr;
use std::slice;
use std::sync::{LazyLock, OnceLock};

use jscore_sys::*;
use parking_lot::Mutex;
use pyo3::exceptions::PyAttributeError;
use pyo3::prelude::*;
use pyo3::types::{PyTuple, PyType};
use tracing::trace;

use crate::context::Context;
use crate::convert::{Receiver, host_from_script, script_from_host};
use crate::error::BridgeError;
use crate::exception::script_exception;
use crate::flags::{JsFlags, is_private_name};
use crate::handle::ClassRef;
use crate::string::text_from_script_string;

/// Private data of a `PythonObject` instance.
pub(crate) struct HostObject {
    pub(crate) context: Py<Context>,
    pub(crate) object: PyObject,
    pub(crate) error: Option<ErrorParts>,
}

/// The parts of a Python exception not stored in [`HostObject::object`].
pub(crate) struct ErrorParts {
    pub(crate) ptype: Py<PyType>,
    pub(crate) traceback: Option<PyObject>,
}

pub(crate) struct HostClasses {
    pub(crate) object: ClassRef,
    pub(crate) exception: ClassRef,
}

static CLASSES: OnceLock<HostClasses> = OnceLock::new();

/// Private data of finalized wrappers, released at the next bridge entry.
static RELEASED: LazyLock<Mutex<Vec<HostObject>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// The `PythonObject` and `PythonException` classes, created on first use.
pub(crate) fn classes() -> &'static HostClasses {
    CLASSES.get_or_init(|| {
        let object = ClassRef::create(&JSClassDefinition {
            class_name: c"PythonObject".as_ptr(),
            finalize: Some(finalize),
            has_property: Some(has_property),
            get_property: Some(get_property),
            set_property: Some(set_property),
            delete_property: Some(delete_property),
            call_as_function: Some(call_as_function),
            ..JSClassDefinition::default()
        });
        // the base finalizer releases the whole private block
        let exception = ClassRef::create(&JSClassDefinition {
            class_name: c"PythonException".as_ptr(),
            parent_class: object.raw(),
            ..JSClassDefinition::default()
        });
        HostClasses { object, exception }
    })
}

/// Wrap a Python object for use by scripts of `context`.
pub(crate) fn wrap(context: &Bound<'_, Context>, object: &Bound<'_, PyAny>) -> PyResult<JSObjectRef> {
    let data = HostObject {
        context: context.clone().unbind(),
        object: object.clone().unbind(),
        error: None,
    };
    make(context, &classes().object, data)
}

/// Wrap a Python exception so it can be thrown into scripts and restored
/// unchanged when it propagates back out.
pub(crate) fn wrap_error(
    context: &Bound<'_, Context>,
    value: &Bound<'_, PyAny>,
    ptype: Py<PyType>,
    traceback: Option<PyObject>,
) -> PyResult<JSObjectRef> {
    let data = HostObject {
        context: context.clone().unbind(),
        object: value.clone().unbind(),
        error: Some(ErrorParts { ptype, traceback }),
    };
    make(context, &classes().exception, data)
}

fn make(context: &Bound<'_, Context>, class: &ClassRef, data: HostObject) -> PyResult<JSObjectRef> {
    let ctx = context.get().raw();
    let data = Box::into_raw(Box::new(data));
    // SAFETY: class is live for the process; the engine owns data from here
    let object = unsafe { JSObjectMake(ctx, class.raw(), data as *mut c_void) };
    if object.is_null() {
        // SAFETY: the engine did not take ownership
        drop(unsafe { Box::from_raw(data) });
        return Err(BridgeError::OutOfMemory.into());
    }
    trace!(object = ?object, "wrapped host object");
    Ok(object)
}

/// Borrow the private data if `object` is a `PythonObject` (or subclass).
///
/// # Safety
/// `object` must be a live object of `ctx`. The reference is valid while the
/// object is.
pub(crate) unsafe fn host_object<'a>(ctx: JSContextRef, object: JSObjectRef) -> Option<&'a HostObject> {
    // SAFETY: ctx and object are valid per caller contract
    unsafe {
        if !JSValueIsObjectOfClass(ctx, object, classes().object.raw()) {
            return None;
        }
        private_data(object)
    }
}

/// Like [`host_object`], restricted to `PythonException` instances.
///
/// # Safety
/// Same as [`host_object`]
pub(crate) unsafe fn host_error<'a>(ctx: JSContextRef, value: JSValueRef) -> Option<&'a HostObject> {
    // SAFETY: ctx and value are valid per caller contract
    unsafe {
        if value.is_null() || !JSValueIsObjectOfClass(ctx, value, classes().exception.raw()) {
            return None;
        }
        private_data(value)
    }
}

unsafe fn private_data<'a>(object: JSObjectRef) -> Option<&'a HostObject> {
    // SAFETY: only our classes store a HostObject as private data
    unsafe { (JSObjectGetPrivate(object) as *const HostObject).as_ref() }
}

/// Queue the private data of a finalized wrapper.
pub(crate) fn defer_release(data: HostObject) {
    RELEASED.lock().push(data);
}

/// Drop the private data of wrappers the engine has finalized.
///
/// Called on every entry into the bridge that holds the GIL. Takes the GIL
/// token because dropping may run arbitrary Python code.
pub(crate) fn release_pending(_py: Python<'_>) {
    let released = std::mem::take(&mut *RELEASED.lock());
    if released.is_empty() {
        return;
    }
    trace!(count = released.len(), "releasing finalized host objects");
    drop(released);
}

fn store_exception(exception: *mut JSValueRef, value: JSValueRef) {
    if !exception.is_null() {
        // SAFETY: the engine passes a writable slot
        unsafe { *exception = value };
    }
}

unsafe extern "C" fn finalize(object: JSObjectRef) {
    // SAFETY: the private data was created by make() and is finalized once
    let data = unsafe { JSObjectGetPrivate(object) } as *mut HostObject;
    if data.is_null() {
        return;
    }
    // Never touch the interpreter here: the collector may run at any point.
    let data = unsafe { Box::from_raw(data) };
    defer_release(*data);
}

unsafe extern "C" fn call_as_function(
    _ctx: JSContextRef,
    function: JSObjectRef,
    _this_object: JSObjectRef,
    argument_count: usize,
    arguments: *const JSValueRef,
    exception: *mut JSValueRef,
) -> JSValueRef {
    let Some(data) = (unsafe { private_data(function) }) else {
        return ptr::null_mut();
    };
    let arguments = if argument_count == 0 || arguments.is_null() {
        &[][..]
    } else {
        // SAFETY: the engine passes argument_count values
        unsafe { slice::from_raw_parts(arguments, argument_count) }
    };

    Python::with_gil(|py| {
        release_pending(py);
        let context = data.context.bind(py);
        match call(py, data, arguments) {
            Ok(value) => value,
            Err(err) => {
                store_exception(exception, script_exception(context, err));
                ptr::null_mut()
            }
        }
    })
}

fn call(py: Python<'_>, data: &HostObject, arguments: &[JSValueRef]) -> PyResult<JSValueRef> {
    let context = data.context.bind(py);
    let receiver = Receiver::dummy(context);
    let arguments = arguments
        .iter()
        .map(|value| host_from_script(py, *value, &receiver))
        .collect::<PyResult<Vec<_>>>()?;
    let result = data.object.bind(py).call1(PyTuple::new_bound(py, arguments))?;
    script_from_host(&result, context)
}

unsafe extern "C" fn has_property(
    _ctx: JSContextRef,
    object: JSObjectRef,
    property_name: JSStringRef,
) -> bool {
    let Some(data) = (unsafe { private_data(object) }) else {
        return false;
    };
    Python::with_gil(|py| {
        release_pending(py);
        let target = data.object.bind(py);
        if unsafe { is_private_name(property_name) } && !JsFlags::of(target).allows_private() {
            return false;
        }
        let result = unsafe { text_from_script_string(property_name) }
            .map_err(PyErr::from)
            .and_then(|name| target.hasattr(name.as_str()));
        match result {
            Ok(found) => found,
            Err(err) => {
                trace!(error = %err, "hasattr failed, reporting property as missing");
                false
            }
        }
    })
}

unsafe extern "C" fn get_property(
    ctx: JSContextRef,
    object: JSObjectRef,
    property_name: JSStringRef,
    exception: *mut JSValueRef,
) -> JSValueRef {
    let Some(data) = (unsafe { private_data(object) }) else {
        return ptr::null_mut();
    };
    Python::with_gil(|py| {
        release_pending(py);
        let context = data.context.bind(py);
        let target = data.object.bind(py);
        // a null result lets the engine continue with the prototype chain
        if unsafe { is_private_name(property_name) } && !JsFlags::of(target).allows_private() {
            return ptr::null_mut();
        }
        let result = unsafe { text_from_script_string(property_name) }
            .map_err(PyErr::from)
            .and_then(|name| target.getattr(name.as_str()));
        match result {
            Ok(value) => match script_from_host(&value, context) {
                Ok(value) => value,
                Err(err) => {
                    store_exception(exception, script_exception(context, err));
                    ptr::null_mut()
                }
            },
            Err(err) if err.is_instance_of::<PyAttributeError>(py) => {
                // SAFETY: ctx is the calling context
                unsafe { JSValueMakeUndefined(ctx) }
            }
            Err(err) => {
                store_exception(exception, script_exception(context, err));
                ptr::null_mut()
            }
        }
    })
}

/// Always reports the write as handled so the engine never stores it itself.
unsafe extern "C" fn set_property(
    _ctx: JSContextRef,
    object: JSObjectRef,
    property_name: JSStringRef,
    value: JSValueRef,
    exception: *mut JSValueRef,
) -> bool {
    let Some(data) = (unsafe { private_data(object) }) else {
        return false;
    };
    Python::with_gil(|py| {
        release_pending(py);
        let context = data.context.bind(py);
        let result = modify(py, data, property_name, |target, name| {
            let value = host_from_script(py, value, &Receiver::dummy(context))?;
            target.setattr(name.as_str(), value)
        });
        if let Err(err) = result {
            store_exception(exception, script_exception(context, err));
        }
        true
    })
}

unsafe extern "C" fn delete_property(
    _ctx: JSContextRef,
    object: JSObjectRef,
    property_name: JSStringRef,
    exception: *mut JSValueRef,
) -> bool {
    let Some(data) = (unsafe { private_data(object) }) else {
        return false;
    };
    Python::with_gil(|py| {
        release_pending(py);
        let context = data.context.bind(py);
        let result = modify(py, data, property_name, |target, name| target.delattr(name.as_str()));
        if let Err(err) = result {
            store_exception(exception, script_exception(context, err));
        }
        true
    })
}

/// Shared gate for writes and deletes.
///
/// Without `ALLOW_MODIFY_ATTR`, or for a private name without
/// `ALLOW_PRIVATE_ATTR`, nothing happens. An `AttributeError` from the
/// operation itself is swallowed.
fn modify<'py, F>(py: Python<'py>, data: &HostObject, property_name: JSStringRef, op: F) -> PyResult<()>
where
    F: FnOnce(&Bound<'py, PyAny>, String) -> PyResult<()>,
{
    let target = data.object.bind(py);
    let flags = JsFlags::of(target);
    if !flags.allows_modify() {
        return Ok(());
    }
    // SAFETY: property_name is valid for the duration of the callback
    if unsafe { is_private_name(property_name) } && !flags.allows_private() {
        return Ok(());
    }
    let name = unsafe { text_from_script_string(property_name) }?;
    match op(target, name) {
        Err(err) if err.is_instance_of::<PyAttributeError>(py) => {
            trace!(error = %err, "ignoring AttributeError from script write");
            Ok(())
        }
        result => result,
    }
}
