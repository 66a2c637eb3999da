// Copyright 2026 the Vantage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subscriber faults and dispatch-boundary isolation.
//!
//! Every callback handed to a Vantage service returns a [`CallbackResult`].
//! Returning `Err` is how a subscriber reports that it failed; the service
//! catches the error at the dispatch boundary, logs it together with the
//! subscriber's identifier, and carries on with the remaining subscribers.
//!
//! With the `std` feature enabled, [`isolate`] also catches panics and turns
//! them into [`CallbackError::Panicked`]. Without `std` (and on
//! `panic = "abort"` targets) a panic cannot be contained.

use alloc::borrow::Cow;
use alloc::string::String;

/// Result type returned by every subscriber callback.
pub type CallbackResult = Result<(), CallbackError>;

/// Error a subscriber callback reports back to the dispatching service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    /// The callback failed with a message of its own.
    #[error("subscriber failed: {0}")]
    Failed(Cow<'static, str>),
    /// The callback panicked; carries the panic payload when it was a string.
    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Creates a [`CallbackError::Failed`] from any message.
    #[must_use]
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Failed(message.into())
    }
}

/// Which service a fault or trace event originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The shared observer registry.
    Observer,
    /// The frame scheduler.
    Frame,
    /// The scroll broadcaster.
    Scroll,
    /// A lazy mount slot.
    Mount,
}

impl Origin {
    /// Short lowercase name used in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Observer => "observer",
            Self::Frame => "frame",
            Self::Scroll => "scroll",
            Self::Mount => "mount",
        }
    }
}

/// Runs one subscriber callback, containing panics when `std` is available.
pub(crate) fn isolate<F>(f: F) -> CallbackResult
where
    F: FnOnce() -> CallbackResult,
{
    #[cfg(feature = "std")]
    {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(payload) => Err(CallbackError::Panicked(panic_message(&*payload))),
        }
    }
    #[cfg(not(feature = "std"))]
    {
        f()
    }
}

#[cfg(feature = "std")]
fn panic_message(payload: &(dyn core::any::Any + Send)) -> String {
    use alloc::string::ToString;

    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}

/// Logs a subscriber fault at the dispatch boundary.
pub(crate) fn report_fault(origin: Origin, subscriber: &str, error: &CallbackError) {
    log::warn!(
        "vantage: {} subscriber `{subscriber}` faulted: {error}",
        origin.as_str()
    );
}
