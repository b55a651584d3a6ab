//! Integration tests for ScriptObject proxies

mod common;

use common::{eval, run};
use serial_test::serial;

#[test]
#[serial]
fn test_properties() {
    run(r#"
g = jscore.Context().globalObject
g.eval('a = {b: 1}')
assert g.a.b == 1
try:
    g.a.c
except AttributeError:
    pass
else:
    raise AssertionError('expected AttributeError')
g.a.c = 2
assert g.a.c == 2
assert g.eval('a.c') == 2
assert g.eval('a.c == 2')
del g.a.c
assert not hasattr(g.a, 'c')
assert g.eval('a.c == undefined')
"#);
}

#[test]
#[serial]
fn test_functions() {
    run(r#"
g = jscore.Context().globalObject
assert g.parseFloat('1.5') == 1.5
assert g.String('1.5') == '1.5'
assert g.Math.max(3, 9, 4) == 9
"#);
}

#[test]
#[serial]
fn test_methods_keep_this() {
    run(r#"
g = jscore.Context().globalObject
g.eval('foo = { bar: function() { return this.baz }, baz: 42 };')
assert g.foo.bar() == 42
assert g.foo['bar']() == 42
unbound = g.eval('foo.bar')
assert unbound() is None
"#);
}

#[test]
#[serial]
fn test_iteration() {
    run(r#"
g = jscore.Context().globalObject
g.eval('foo = {a:1, b:2, c:3}; bar = ["a", "b", "c"]; baz = Object()')
assert list(g.foo) == ['a', 'b', 'c']
assert set(g.bar) == {'0', '1', '2'}
assert not set(g.baz)
"#);
}

#[test]
#[serial]
fn test_iteration_is_a_snapshot() {
    run(r#"
g = jscore.Context().globalObject
g.eval('foo = {a:1, b:2, c:3}')
seen = []
for name in g.foo:
    if name == 'a':
        g.foo.d = 4
    seen.append(name)
assert seen == ['a', 'b', 'c']
assert 'd' in g.foo
assert iter(g.foo).__length_hint__() == 4
"#);
}

#[test]
#[serial]
fn test_mapping() {
    run(r#"
g = jscore.Context().globalObject
g.eval('a=1')
assert 'a' in g
assert g['a'] == 1
g.a = 2
assert g['a'] == 2
g['a'] = 3
assert g.a == 3
del g['a']
assert 'a' not in g
assert g['a'] is None
"#);
}

#[test]
#[serial]
fn test_indexed_and_named_keys_agree() {
    run(r#"
g = jscore.Context().globalObject
arr = g.eval('arr = [10, 20, 30]')
assert arr[0] == 10
assert arr[0] == arr['0']
arr[1] = 'x'
assert arr['1'] == 'x'
arr['2'] = 'y'
assert arr[2] == 'y'
arr[5] = 1
assert arr.length == 6
assert 0 in arr
assert 7 not in arr
assert arr[-1] is None
"#);
}

#[test]
#[serial]
fn test_call_errors() {
    run(r#"
g = jscore.Context().globalObject
g.eval('obj = {}; fn = function (a) { return a; }')
try:
    g.obj()
except TypeError as e:
    assert 'not callable' in str(e)
else:
    raise AssertionError('expected TypeError')
try:
    g.fn(a=1)
except TypeError as e:
    assert 'Keyword arguments' in str(e)
else:
    raise AssertionError('expected TypeError')
assert g.fn(1, **{}) == 1
"#);
}

#[test]
#[serial]
fn test_repr() {
    run(r#"
import re
g = jscore.Context().globalObject
assert repr(jscore.null) == '<ScriptObject [null]>'
assert re.fullmatch(r'<ScriptObject \[object\] at 0x[0-9a-f]+>', repr(g.eval('({})')))
assert re.fullmatch(r'<ScriptObject \[function\] at 0x[0-9a-f]+>', repr(g.parseInt))
"#);
}

#[test]
#[serial]
fn test_null_proxy() {
    run(r#"
null = jscore.null
assert isinstance(null, jscore.ScriptObject)
assert jscore.JSObject is jscore.ScriptObject
for op in (lambda: null['x'], lambda: null(), lambda: 'x' in null, lambda: iter(null)):
    try:
        op()
    except TypeError:
        pass
    else:
        raise AssertionError('expected TypeError')
assert not hasattr(null, 'anything')
"#);
}

#[test]
#[serial]
fn test_global_object_is_unbound_proxy() {
    let kind: String = eval(
        "g = jscore.Context().globalObject",
        "g.eval('typeof this')",
    );
    assert_eq!(kind, "object");
}

#[test]
#[serial]
fn test_proxies_cannot_cross_contexts() {
    run(r#"
a, b = jscore.Context(), jscore.Context()
foreign = a.globalObject
target = b.globalObject
for op in (lambda: setattr(target, 'x', foreign),
           lambda: target.__setitem__('x', foreign),
           lambda: target.parseInt(foreign)):
    try:
        op()
    except Exception:
        raise AssertionError('expected a panic, not an ordinary exception')
    except BaseException as e:
        assert type(e).__name__ == 'PanicException', type(e)
    else:
        raise AssertionError('expected a panic')
assert b.eval('typeof x') == 'undefined'
assert target.parseInt('7') == 7
"#);
}
