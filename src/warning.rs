//! Warning collection mechanism for document processing.
//!
//! Soft anomalies found while normalizing (an unparseable timestamp, a
//! non-numeric gauge value) are worth reporting next to the document that
//! produced them without failing it. Normalization is synchronous and
//! single-threaded by design, so a thread-local collector is enough.

use std::cell::RefCell;

thread_local! {
    static WARNINGS: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Collect a warning message for the current document.
/// If called outside a collection scope, the warning is ignored.
pub fn collect(message: impl Into<String>) {
    WARNINGS.with(|warnings| {
        if let Some(buffer) = warnings.borrow_mut().as_mut() {
            buffer.push(message.into());
        }
    });
}

/// Run a closure with warning collection enabled, returning the collected
/// warnings. Not reentrant: a nested scope would swallow the outer one's
/// warnings.
pub fn scoped<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    WARNINGS.with(|warnings| *warnings.borrow_mut() = Some(Vec::new()));
    let result = f();
    let collected = WARNINGS
        .with(|warnings| warnings.borrow_mut().take())
        .unwrap_or_default();
    (result, collected)
}

/// Emit a warning that will be collected for the current document.
#[macro_export]
macro_rules! warn_document {
    ($($arg:tt)*) => {
        $crate::warning::collect(format!($($arg)*))
    };
}
