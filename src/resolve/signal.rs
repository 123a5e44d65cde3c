//! A one-shot event flag with a bounded wait.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::dispatch::PoolCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

//------------ OneShotSignal -------------------------------------------------

/// A single-use event flag.
///
/// The flag starts unset. One task waits for it with [`wait`][Self::wait]
/// while some other execution context eventually sets it with
/// [`fire`][Self::fire]. Firing is idempotent, only the first call has any
/// effect. Waiting is bounded by a timeout and can be interrupted through
/// a shutdown channel, so a waiter is never stuck on a signal that will
/// not come.
///
/// A wait that returns [`SignalWait::Signaled`] observes everything the
/// firing context wrote before calling `fire`.
#[derive(Debug, Default)]
pub struct OneShotSignal {
    /// Whether the signal has been fired.
    fired: AtomicBool,

    /// Wakes the waiting task once the flag is set.
    notify: Notify,
}

impl OneShotSignal {
    /// Creates a new, unfired signal.
    pub fn new() -> Self {
        Default::default()
    }

    /// Fires the signal.
    ///
    /// The first call wakes the waiter, if there is one, or lets a later
    /// wait return immediately. Any further call is a no-op.
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// Returns whether the signal has been fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Waits for the signal to fire.
    ///
    /// Returns [`SignalWait::Signaled`] once the signal fires,
    /// [`SignalWait::TimedOut`] if `timeout` elapses first, and
    /// [`SignalWait::Interrupted`] if the `interrupt` channel switches to
    /// [`PoolCommand::Shutdown`] or its sender goes away. If the signal
    /// was already fired when this method is called, it returns
    /// `Signaled` without suspending.
    pub async fn wait(
        &self,
        timeout: Duration,
        interrupt: &mut watch::Receiver<PoolCommand>,
    ) -> SignalWait {
        let deadline = Instant::now() + timeout;
        loop {
            if self.fired.load(Ordering::Acquire) {
                return SignalWait::Signaled;
            }
            if matches!(*interrupt.borrow(), PoolCommand::Shutdown) {
                return SignalWait::Interrupted;
            }
            tokio::select! {
                // A permit stored by a fire() that raced us is consumed
                // here; the flag check at the top of the loop settles it.
                _ = self.notify.notified() => {}
                _ = sleep_until(deadline) => return SignalWait::TimedOut,
                _ = interrupt.changed() => return SignalWait::Interrupted,
            }
        }
    }
}

//------------ SignalWait ----------------------------------------------------

/// How a wait on a [`OneShotSignal`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignalWait {
    /// The signal fired.
    Signaled,

    /// The timeout elapsed before the signal fired.
    TimedOut,

    /// The wait was interrupted by shutdown.
    Interrupted,
}

//============ Tests =========================================================
