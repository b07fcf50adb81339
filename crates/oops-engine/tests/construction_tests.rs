//! Construction protocol tests
//!
//! Covers address uniqueness, chain contents for single, multiple and
//! diamond inheritance, weak types, rollback and concurrent construction.

use oops_engine::builtins::OBJECT;
use oops_engine::{Construct, OopsError, OopsResult, Runtime, TypeDef, TypeToken, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn define(runtime: &Runtime, def: TypeDef) -> TypeToken {
    runtime.define(def).unwrap()
}

#[test]
fn test_addresses_are_unique() {
    let runtime = Runtime::new();
    let plain = define(&runtime, TypeDef::new("Plain"));

    let addresses: HashSet<_> = (0..100)
        .map(|_| runtime.new_object(plain).unwrap().address().unwrap())
        .collect();

    assert_eq!(addresses.len(), 100);
    assert_eq!(runtime.num_addresses(), 100);
}

#[test]
fn test_single_inheritance_chain() {
    let runtime = Runtime::new();
    let a = define(&runtime, TypeDef::new("A"));
    let b = define(&runtime, TypeDef::new("B").extends(a));
    let c = define(&runtime, TypeDef::new("C").extends(b));

    let obj = runtime.new_object(c).unwrap();
    let chain = obj.chain().unwrap();

    assert_eq!(chain.as_slice(), &[c, b, a, OBJECT]);
    for token in [a, b, c, OBJECT] {
        assert!(obj.is_instance_of(token).unwrap());
    }
}

#[test]
fn test_multiple_inheritance_chain() {
    let runtime = Runtime::new();
    let b1 = define(&runtime, TypeDef::new("B1"));
    let b2 = define(&runtime, TypeDef::new("B2"));
    let widget = define(&runtime, TypeDef::new("Widget").extends(b1).extends(b2));

    let obj = runtime.new_object(widget).unwrap();

    assert_eq!(obj.chain().unwrap().as_slice(), &[widget, b1, OBJECT, b2]);
    assert_eq!(runtime.num_addresses(), 1);
}

fn logging(
    runs: &Arc<Mutex<Vec<&'static str>>>,
    name: &'static str,
) -> impl Fn(&mut Construct<'_>) -> OopsResult<()> + Send + Sync + 'static {
    let runs = Arc::clone(runs);
    move |_| {
        runs.lock().unwrap().push(name);
        Ok(())
    }
}

#[test]
fn test_diamond_runs_shared_base_once() {
    let runtime = Runtime::new();
    let runs = Arc::new(Mutex::new(Vec::new()));

    let log = |name: &'static str| logging(&runs, name);

    let root = define(&runtime, TypeDef::new("Root").init(log("Root")));
    let left = define(&runtime, TypeDef::new("Left").extends(root).init(log("Left")));
    let right = define(&runtime, TypeDef::new("Right").extends(root).init(log("Right")));
    let bottom = define(
        &runtime,
        TypeDef::new("Bottom").extends(left).extends(right).init(log("Bottom")),
    );

    let obj = runtime.new_object(bottom).unwrap();

    assert_eq!(*runs.lock().unwrap(), vec!["Root", "Left", "Right", "Bottom"]);
    assert_eq!(obj.chain().unwrap().as_slice(), &[bottom, left, root, OBJECT, right]);
}

#[test]
fn test_base_args_are_mapped() {
    let runtime = Runtime::new();
    let base = define(
        &runtime,
        TypeDef::new("Labelled").init(|cx| {
            let label = cx.arg(0)?.clone();
            cx.set_field("label", label);
            Ok(())
        }),
    );
    let derived = define(
        &runtime,
        TypeDef::new("Prefixed")
            .extends_with(base, |args| {
                let name = args.first().and_then(Value::as_str).unwrap_or_default();
                vec![Value::from(format!("item:{}", name))]
            })
            .init(|cx| {
                let raw = cx.arg(0)?.clone();
                cx.set_field("raw", raw);
                Ok(())
            }),
    );

    let obj = runtime.construct(derived, &[Value::from("box")]).unwrap();

    assert_eq!(obj.get_field("label"), Some(Value::from("item:box")));
    assert_eq!(obj.get_field("raw"), Some(Value::from("box")));
}

#[test]
fn test_missing_argument_rolls_back() {
    let runtime = Runtime::new();
    let needy = define(
        &runtime,
        TypeDef::new("Needy").init(|cx| {
            cx.arg(0)?;
            Ok(())
        }),
    );

    let err = runtime.new_object(needy).unwrap_err();

    assert!(matches!(err, OopsError::IndexOutOfRange { .. }));
    assert_eq!(err.to_string(), "argument 0 of Needy is out of range.");
    assert_eq!(runtime.num_addresses(), 0);
}

#[test]
fn test_failing_base_rolls_back() {
    let runtime = Runtime::new();
    let broken = define(
        &runtime,
        TypeDef::new("Broken").init(|_| Err(OopsError::argument_missing("config"))),
    );
    let derived = define(&runtime, TypeDef::new("Derived").extends(broken));

    let err = runtime.new_object(derived).unwrap_err();

    assert_eq!(err.to_string(), "Missing argument, config is undefined.");
    assert_eq!(runtime.num_addresses(), 0);
}

#[test]
fn test_weak_type_has_no_address() {
    let runtime = Runtime::new();
    let weak = define(&runtime, TypeDef::new("Value").weak());
    let other = define(&runtime, TypeDef::new("Other"));

    let obj = runtime.new_object(weak).unwrap();

    assert!(obj.is_weak());
    assert_eq!(obj.address(), None);
    assert_eq!(runtime.num_addresses(), 0);
    assert!(obj.is_instance_of(weak).unwrap());
    assert!(!obj.is_instance_of(OBJECT).unwrap());
    assert!(!obj.is_instance_of(other).unwrap());
    assert!(!obj.dispose());
}

#[test]
fn test_nested_construction_inside_body() {
    let runtime = Runtime::new();
    let part = define(&runtime, TypeDef::new("Part"));
    let whole = define(
        &runtime,
        TypeDef::new("Whole").init(move |cx| {
            let inner = cx.runtime().new_object(part)?;
            let address = inner.address().map(|a| a.as_u64()).unwrap_or_default();
            cx.set_field("part", Value::from(address));
            Ok(())
        }),
    );

    let obj = runtime.new_object(whole).unwrap();

    assert_eq!(runtime.num_addresses(), 2);
    assert_eq!(obj.chain().unwrap().as_slice(), &[whole, OBJECT]);
    let part_address = obj.get_field("part").and_then(|v| v.as_u64()).unwrap();
    assert_ne!(Some(part_address), obj.address().map(|a| a.as_u64()));
}

#[test]
fn test_same_name_types_are_distinct() {
    let runtime = Runtime::new();
    let first = define(&runtime, TypeDef::new("Shape"));
    let second = define(&runtime, TypeDef::new("Shape"));

    let obj = runtime.new_object(first).unwrap();

    assert_ne!(first, second);
    assert!(obj.is_instance_of(first).unwrap());
    assert!(!obj.is_instance_of(second).unwrap());
    assert_eq!(runtime.type_by_name("Shape"), Some(first));
}

#[test]
fn test_parallel_construction() {
    let runtime = Runtime::new();
    let base = define(&runtime, TypeDef::new("Base"));
    let derived = define(&runtime, TypeDef::new("Derived").extends(base));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let runtime = runtime.clone();
            std::thread::spawn(move || {
                (0..50)
                    .map(|_| {
                        let obj = runtime.new_object(derived).unwrap();
                        assert_eq!(obj.chain().unwrap().as_slice(), &[derived, base, OBJECT]);
                        obj.address().unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for address in handle.join().unwrap() {
            assert!(seen.insert(address));
        }
    }
    assert_eq!(seen.len(), 400);
    assert_eq!(runtime.num_addresses(), 400);
}

#[test]
fn test_independent_runtimes() {
    let first = Runtime::new();
    let second = Runtime::new();
    let a = define(&first, TypeDef::new("A"));
    let b = define(&second, TypeDef::new("B"));

    first.new_object(a).unwrap();
    second.new_object(b).unwrap();
    second.new_object(b).unwrap();

    assert_eq!(first.num_addresses(), 1);
    assert_eq!(second.num_addresses(), 2);
}
