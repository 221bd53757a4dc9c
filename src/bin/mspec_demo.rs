// mspec demo harness: a small in-process suite driven by the mspec-run CLI.
// Usage: cargo run --bin mspec-demo -- [options] [files]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

use mspec::prelude::*;

fn should_eq<T: PartialEq + Debug>(m: &mut MSpec, actual: T, expected: T) -> Result<(), Fault> {
    m.expectation()?;
    if actual == expected {
        Ok(())
    } else {
        Err(Fault::expectation(format!(
            "Expected {actual:?}\n to equal {expected:?}"
        )))
    }
}

fn suite() -> Suite {
    Suite::new()
        .file("spec/core/array/push_spec.rs", |m| {
            m.describe("Array#push", |m| {
                m.it("appends an element", |m| {
                    let mut items = vec![1];
                    items.push(2);
                    should_eq(m, items, vec![1, 2])
                })?;
                m.it("grows the length by one", |m| {
                    let mut items = vec![1, 2];
                    items.push(3);
                    should_eq(m, items.len(), 3)
                })
            })
        })
        .file("spec/core/string/upcase_spec.rs", |m| {
            m.describe("String#upcase", |m| {
                m.it("upcases ASCII letters", |m| {
                    should_eq(m, "hello".to_uppercase(), "HELLO".to_string())
                })?;
                m.it("keeps the length of every string", |m| {
                    should_eq(m, "ß".to_uppercase().chars().count(), 1)
                })
            })
        })
        .file("spec/core/hash/fetch_spec.rs", |m| {
            m.describe("HashMap#get", |m| {
                let map: Rc<RefCell<HashMap<&str, i32>>> = Rc::default();

                let setup = Rc::clone(&map);
                m.before(Scope::Each, move |_| {
                    setup.borrow_mut().insert("a", 1);
                    Ok(())
                })?;
                let teardown = Rc::clone(&map);
                m.after(Scope::Each, move |_| {
                    teardown.borrow_mut().clear();
                    Ok(())
                })?;

                let present = Rc::clone(&map);
                m.it("returns the value for a key", move |m| {
                    let value = present.borrow().get("a").copied();
                    should_eq(m, value, Some(1))
                })?;
                let missing = Rc::clone(&map);
                m.it("indexes a missing key", move |m| {
                    let value = missing.borrow()["missing"];
                    should_eq(m, value, 0)
                })
            })
        })
        .file("spec/library/broken_spec.rs", |_| {
            Err(Fault::error("LoadError", "cannot load such file -- set"))
        })
}

fn main() -> miette::Result<()> {
    mspec::cli::init_tracing();
    let code = mspec::cli::run(&suite())?;
    std::process::exit(code);
}
