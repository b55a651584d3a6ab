//! Bidirectional bridge between CPython and JavaScriptCore.
//!
//! The `jscore` Python module lets Python evaluate scripts and use script
//! objects as ordinary Python objects, while scripts can call Python callables
//! and read Python attributes.
//!
//! ```python
//! import jscore
//!
//! ctx = jscore.Context()
//! g = ctx.globalObject
//! g.double = lambda x: x * 2
//! assert ctx.eval("double(21)") == 42.0
//! ```
//!
//! # Ownership
//!
//! Each side keeps the other's objects alive while it refers to them. Python
//! proxies protect engine objects from collection; engine wrappers hold a
//! strong reference to their Python object until the engine finalizes them.
//! Finalizers never call into Python: released references are queued and
//! dropped at the next `eval`, `gc` or context teardown.
//!
//! # Threads
//!
//! All engine calls happen with the GIL held. Python callbacks invoked by
//! scripts re-acquire it, so nesting script and Python calls is safe to any
//! depth.

mod adapter;
pub mod config;
mod context;
mod convert;
pub mod error;
mod exception;
pub mod flags;
mod handle;
mod object;
pub mod string;

use pyo3::prelude::*;

pub use config::{BridgeConfig, init_logging};
pub use context::Context;
pub use error::{BridgeError, BridgeResult};
pub use exception::ScriptError;
pub use flags::JsFlags;
pub use object::{ScriptObject, ScriptObjectIterator};
pub use string::JscString;

// Re-export jscore-sys for direct FFI access when needed
pub use jscore_sys;

/// Add the bridge's classes and constants to `module`.
///
/// Used by the extension entry point, and by embedders that want the same
/// members under a different module.
pub fn register(module: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = module.py();
    module.add_class::<Context>()?;
    module.add_class::<ScriptObject>()?;
    module.add("JSObject", py.get_type_bound::<ScriptObject>())?;
    module.add_class::<ScriptObjectIterator>()?;
    module.add("error", py.get_type_bound::<ScriptError>())?;
    module.add("null", object::null(py)?.clone_ref(py))?;
    module.add("ALLOW_PRIVATE_ATTR", JsFlags::ALLOW_PRIVATE_ATTR.bits())?;
    module.add("ALLOW_MODIFY_ATTR", JsFlags::ALLOW_MODIFY_ATTR.bits())?;
    Ok(())
}

/// PyJSCore embeds a JavaScript interpreter into Python, and allows objects to
/// be passed between the two environments.
#[pymodule]
fn jscore(module: &Bound<'_, PyModule>) -> PyResult<()> {
    init_logging(&BridgeConfig::from_env());
    tracing::debug!("jscore module initialised");
    register(module)
}
