//! Single-shot delayed call.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

/// One pending `(callback, fire time)` pair.
///
/// Scheduling again while armed moves the deadline; cancelling disarms.
/// The callback itself is bound when the owning task calls [`run`].
///
/// [`run`]: DeferredCall::run
pub struct DeferredCall {
    command: Signal<CriticalSectionRawMutex, Option<Duration>>,
}

impl Default for DeferredCall {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredCall {
    pub const fn new() -> Self {
        DeferredCall {
            command: Signal::new(),
        }
    }

    /// Arm, or re-arm, to fire `delay` from now.
    pub fn schedule(&self, delay: Duration) {
        self.command.signal(Some(delay));
    }

    pub fn cancel(&self) {
        self.command.signal(None);
    }

    /// Schedule in milliseconds; a negative delay cancels.
    pub fn defer(&self, delay_ms: i64) {
        if delay_ms < 0 {
            self.cancel();
        } else {
            self.schedule(Duration::from_millis(delay_ms as u64));
        }
    }

    /// Drive the timer, calling `callback` each time a deadline passes.
    /// Never returns.
    pub async fn run<F: FnMut()>(&self, mut callback: F) {
        let mut pending: Option<Duration> = None;
        loop {
            match pending.take() {
                None => pending = self.command.wait().await,
                Some(delay) => match select(Timer::after(delay), self.command.wait()).await {
                    Either::First(()) => {
                        trace!("deferred call fired");
                        callback();
                    }
                    Either::Second(command) => pending = command,
                },
            }
        }
    }
}
