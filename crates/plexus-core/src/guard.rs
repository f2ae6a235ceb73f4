use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, optionally containing a panic raised inside it.
///
/// With `isolate == false` the closure runs unguarded and a panic unwinds
/// through the caller. With `isolate == true` the panic is caught and its
/// message returned as `Err`; the caller reports it with [`report`] and
/// carries on with the next module or subscriber.
pub(crate) fn run_hook<F: FnOnce()>(isolate: bool, f: F) -> Result<(), String> {
    if !isolate {
        f();
        return Ok(());
    }

    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Log a contained hook panic against its owner.
pub(crate) fn report(owner: &str, hook: &'static str, reason: &str) {
    tracing::error!(
        owner = %owner,
        hook,
        reason = %reason,
        "hook panicked; continuing with the rest of the pass"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
