//! Shared helpers: an embedded interpreter with `jscore` importable.

#![allow(dead_code)]

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

/// Globals for a snippet, with `jscore` registered in `sys.modules`.
pub fn globals(py: Python<'_>) -> Bound<'_, PyDict> {
    let module = PyModule::new_bound(py, "jscore").unwrap();
    jscore::register(&module).unwrap();
    py.import_bound("sys")
        .unwrap()
        .getattr("modules")
        .unwrap()
        .set_item("jscore", &module)
        .unwrap();

    let globals = PyDict::new_bound(py);
    globals.set_item("jscore", module).unwrap();
    globals
}

/// Run Python statements, printing the traceback before failing the test.
pub fn run(code: &str) {
    Python::with_gil(|py| {
        let globals = globals(py);
        if let Err(err) = py.run_bound(code, Some(&globals), None) {
            err.print(py);
            panic!("python snippet failed: {err}");
        }
    });
}

/// Evaluate a Python expression after running `setup`.
pub fn eval<T>(setup: &str, expr: &str) -> T
where
    T: for<'py> FromPyObject<'py>,
{
    Python::with_gil(|py| {
        let globals = globals(py);
        if let Err(err) = py.run_bound(setup, Some(&globals), None) {
            err.print(py);
            panic!("python setup failed: {err}");
        }
        match py.eval_bound(expr, Some(&globals), None) {
            Ok(value) => value.extract::<T>().unwrap(),
            Err(err) => {
                err.print(py);
                panic!("python expression failed: {err}");
            }
        }
    })
}
