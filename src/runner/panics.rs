//! Panic capture for protected blocks.
//!
//! A process-wide hook is installed on first use. It chains whatever hook was
//! in place before it: panics outside a protected block still reach that hook,
//! while panics inside one are recorded (location and backtrace) for the
//! block's fault instead of being printed.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use tracing::debug;

use crate::errors::Fault;

thread_local! {
    /// Number of protected blocks active on this thread.
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };

    /// Where the last captured panic happened, with its backtrace.
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let location = info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown location>".to_string());
            debug!(%location, "panic captured in protected block");
            let site = format!("{location}\n{}", Backtrace::force_capture());
            PANIC_SITE.with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

/// Runs `block`, turning a panic into a [`Fault::Panic`] that carries the
/// panic location and backtrace.
pub(crate) fn catch<R>(block: impl FnOnce() -> R) -> Result<R, Fault> {
    install_hook();
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(block));
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    result.map_err(into_fault)
}

fn into_fault(payload: Box<dyn Any + Send>) -> Fault {
    let fault = Fault::from_panic(payload);
    match PANIC_SITE.with(|slot| slot.borrow_mut().take()) {
        Some(site) => fault.with_trace(site),
        None => fault,
    }
}
