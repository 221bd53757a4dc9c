// A harness's own panic hook must keep working around a kernel run. Runs in
// its own test binary because panic hooks are process-wide.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};

use mspec::prelude::*;

static HARNESS_PANICS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn harness_hook_sees_only_panics_outside_spec_code() {
    panic::set_hook(Box::new(|_| {
        HARNESS_PANICS.fetch_add(1, Ordering::SeqCst);
    }));

    let suite = Suite::new().file("spec/a_spec.rs", |m| {
        m.describe("Foo", |m| m.it("explodes", |_| panic!("in spec code")))
    });
    let mut mspec = MSpec::new();
    mspec.register_diagnostics(Box::new(std::io::sink()));
    mspec.register_files(["spec/a_spec.rs"]);
    mspec.process(&suite);

    assert_eq!(mspec.exit_code(), 1);
    assert_eq!(HARNESS_PANICS.load(Ordering::SeqCst), 0);

    let outside = panic::catch_unwind(|| panic!("in the harness"));
    assert!(outside.is_err());
    assert_eq!(HARNESS_PANICS.load(Ordering::SeqCst), 1);
}
