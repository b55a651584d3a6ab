//! Integration tests for Python objects exposed to scripts

mod common;

use common::{eval, run};
use serial_test::serial;

#[test]
#[serial]
fn test_python_functions() {
    run(r#"
ctx = jscore.Context()
g = ctx.globalObject
g.foo = lambda: 42
g.add = lambda a, b: a + b
g.f = lambda x: x * 2
assert g.foo() == 42
assert g.eval('foo()') == 42
assert g.eval('add(40, 2)') == 42
assert g.eval('add("4", "2")') == '42'
assert ctx.eval('f(21)') == 42
assert ctx.eval('f(21) === 42')
"#);
}

#[test]
#[serial]
fn test_host_object_identity() {
    run(r#"
ctx = jscore.Context()
g = ctx.globalObject
class Thing:
    pass
t = Thing()
g.t = t
assert g.t is t
assert ctx.eval('t') is t
assert ctx.eval('(function (x) { return x; })')(t) is t
seen = []
g.keep = seen.append
ctx.eval('keep(t)')
assert seen[0] is t
"#);
}

#[test]
#[serial]
fn test_script_values_passed_to_python() {
    run(r#"
ctx = jscore.Context()
g = ctx.globalObject
received = []
g.collect = lambda *args: received.extend(args)
ctx.eval('collect(1, "two", true, null, undefined, {k: 3})')
assert received[:5] == [1.0, 'two', True, jscore.null, None]
assert received[5].k == 3
"#);
}

#[test]
#[serial]
fn test_attribute_gating() {
    run(r#"
g = jscore.Context().globalObject

class C(object):
    def __init__(self):
        self.a = 42
        self._p = 42
o = g.o = C()

assert g.eval('o.a == 42')
assert g.eval('o.b == undefined')
assert g.eval('o._p == undefined')
assert g.eval('"a" in o')
assert g.eval('!("b" in o)')
assert g.eval('!("_p" in o)')

g.eval('o.a = 1')
assert o.a == 42
assert g.eval('o.a == 42')

g.eval('delete o.a')
assert o.a == 42
assert g.eval('o.a == 42')

C.__jsflags__ = jscore.ALLOW_PRIVATE_ATTR
assert g.eval('o._p == 42')

C.__jsflags__ = jscore.ALLOW_MODIFY_ATTR
g.eval('o.a = 1')
assert g.eval('o.a == 1')
assert o.a == 1
g.eval('delete o.a')
assert g.eval('o.a == undefined')
assert g.eval('!("a" in o)')
assert not hasattr(o, 'a')
g.eval('o._p = 1')
assert g.eval('o._p == undefined')
assert o._p == 42

C.__jsflags__ = jscore.ALLOW_PRIVATE_ATTR
assert g.eval('o._p == 42')

C.__jsflags__ = jscore.ALLOW_PRIVATE_ATTR | jscore.ALLOW_MODIFY_ATTR
g.eval('o._p = 1')
assert g.eval('o._p == 1')
assert o._p == 1
"#);
}

#[test]
#[serial]
fn test_invalid_flags_grant_nothing() {
    run(r#"
g = jscore.Context().globalObject
class C:
    __jsflags__ = 'everything'
    _p = 1
    a = 1
o = g.o = C()
assert g.eval('o._p === undefined')
g.eval('o.a = 5')
assert o.a == 1

C.__jsflags__ = -1
assert g.eval('o._p === undefined')

class Raising:
    @property
    def __jsflags__(self):
        raise RuntimeError('flags unavailable')
    _hidden = 1
g.r = Raising()
assert g.eval('r._hidden === undefined')
"#);
}

#[test]
#[serial]
fn test_attribute_errors_on_write_are_swallowed() {
    run(r#"
ctx = jscore.Context()
g = ctx.globalObject
class ReadOnly:
    __jsflags__ = jscore.ALLOW_MODIFY_ATTR
    __slots__ = ()
g.ro = ReadOnly()
ctx.eval('ro.x = 1; delete ro.y')

class Loud:
    __jsflags__ = jscore.ALLOW_MODIFY_ATTR
    def __setattr__(self, name, value):
        raise ValueError('no writes')
g.loud = Loud()
assert ctx.eval('(function () { try { loud.x = 1; return "no"; } catch (e) { return "caught"; } })()') == 'caught'
"#);
}

#[test]
#[serial]
fn test_getattr_errors_become_script_exceptions() {
    run(r#"
ctx = jscore.Context()
g = ctx.globalObject
class Exploding:
    reads = 0
    @property
    def boom(self):
        # the first read is the engine's hasattr probe
        Exploding.reads += 1
        if Exploding.reads > 1:
            raise KeyError('inner')
        return 1
g.e = Exploding()
try:
    ctx.eval('e.boom')
except KeyError as err:
    assert err.args == ('inner',)
else:
    raise AssertionError('expected KeyError')
"#);
}

#[test]
#[serial]
fn test_reentrant_calls() {
    let depth: f64 = eval(
        r#"
ctx = jscore.Context()
g = ctx.globalObject
def descend(n):
    if n == 0:
        return 0
    return ctx.eval('descend(%d)' % (n - 1)) + 1
g.descend = descend
"#,
        "ctx.eval('descend(25)')",
    );
    assert_eq!(depth, 25.0);
}
