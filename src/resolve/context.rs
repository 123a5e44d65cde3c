//! Per-phase resolution state and event translation.

use crate::resolve::signal::OneShotSignal;
use crate::stack::StackEvent;
use parking_lot::Mutex;
use std::sync::Arc;

//------------ Outcome -------------------------------------------------------

/// The result of a resolution phase or of a whole job.
///
/// A phase starts out as `Pending` and moves to exactly one of the other
/// variants. For a whole job, the outcome of the phase that ended the job
/// becomes the outcome of the job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// No terminal event has arrived yet.
    Pending,

    /// The phase completed successfully.
    Success,

    /// Address resolution failed.
    AddressError,

    /// Route resolution failed.
    RouteError,

    /// The phase did not complete within its timeout.
    Timeout,

    /// The job was abandoned because of shutdown.
    Cancelled,
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Pending
    }
}

//------------ ResolutionContext ---------------------------------------------

/// The state of a single resolution phase.
///
/// A context pairs the outcome of a phase with the signal that announces
/// its arrival. The task driving the job creates a fresh context for each
/// phase, hands it to the event translator, and waits on the signal. The
/// stack's execution context stores the outcome and fires the signal.
///
/// The signal's memory ordering guarantees that a waiter woken by
/// [`OneShotSignal::wait`] sees the outcome stored before the fire.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    /// The outcome of the phase.
    outcome: Mutex<Outcome>,

    /// Fired once the outcome has been stored.
    signal: OneShotSignal,
}

impl ResolutionContext {
    /// Creates a new context with a pending outcome.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the current outcome of the phase.
    pub fn outcome(&self) -> Outcome {
        *self.outcome.lock()
    }

    /// Stores the outcome of the phase.
    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock() = outcome;
    }

    /// Returns the signal announcing the outcome.
    pub fn signal(&self) -> &OneShotSignal {
        &self.signal
    }
}

//------------ EventTranslator -----------------------------------------------

/// Translates stack events into phase outcomes.
///
/// A translator is created once per job and handed to the connection
/// manager when the job's handle is made. The driving task points it at
/// the context of the current phase with [`arm`][Self::arm] before issuing
/// each request. Events delivered while no context is armed, as well as
/// events that do not concern resolution, are ignored.
///
/// [`deliver`][Self::deliver] may be called from any thread.
#[derive(Debug, Default)]
pub struct EventTranslator {
    /// The context of the phase currently awaiting an event.
    current: Mutex<Option<Arc<ResolutionContext>>>,
}

impl EventTranslator {
    /// Creates a translator with no armed context.
    pub fn new() -> Self {
        Default::default()
    }

    /// Arms the translator with the context of the next phase.
    pub fn arm(&self, context: Arc<ResolutionContext>) {
        *self.current.lock() = Some(context);
    }

    /// Delivers a stack event.
    ///
    /// Resolution events store their outcome in the armed context and fire
    /// its signal. All other events are dropped.
    pub fn deliver(&self, event: StackEvent) {
        let outcome = match event {
            StackEvent::AddressResolved | StackEvent::RouteResolved => {
                Outcome::Success
            }
            StackEvent::AddressError => Outcome::AddressError,
            StackEvent::RouteError => Outcome::RouteError,
            _ => return,
        };
        // Clone the context out so the lock is not held across fire().
        let context = self.current.lock().clone();
        if let Some(context) = context {
            context.set_outcome(outcome);
            context.signal().fire();
        }
    }
}

//============ Tests =========================================================
