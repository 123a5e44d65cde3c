//! Running a resolution job to completion.

use crate::dispatch::CommandReceiver;
use crate::endpoint::Endpoint;
use crate::metrics::ResolverMetrics;
use crate::resolve::context::{EventTranslator, Outcome, ResolutionContext};
use crate::resolve::signal::SignalWait;
use crate::stack::{ConnectionManager, ResolverHandle};
use std::sync::Arc;
use std::time::Duration;

//------------ ResolutionJob -------------------------------------------------

/// A single resolution request.
///
/// A job carries the endpoint pair to resolve and the timeout that applies
/// to each of its phases. The timeout is fixed when the job is created, so
/// a later change of the configured timeout does not affect jobs already
/// admitted.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionJob {
    /// The local endpoint.
    local: Endpoint,

    /// The remote endpoint.
    remote: Endpoint,

    /// The per-phase timeout.
    timeout: Duration,
}

impl ResolutionJob {
    /// Creates a new job.
    pub fn new(local: Endpoint, remote: Endpoint, timeout: Duration) -> Self {
        Self { local, remote, timeout }
    }

    /// Returns the local endpoint.
    pub fn local(&self) -> &Endpoint {
        &self.local
    }

    /// Returns the remote endpoint.
    pub fn remote(&self) -> &Endpoint {
        &self.remote
    }

    /// Returns the per-phase timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

//------------ ResolutionMachine ---------------------------------------------

/// Drives resolution jobs through their two phases.
///
/// Each worker of the pool owns one machine. For every job, the machine
/// creates a resolution handle, runs address resolution and then route
/// resolution, and maps whatever ends a phase onto a terminal [`Outcome`].
/// The handle is dropped before the job is accounted for, so stack
/// resources are released on every path, including errors, timeouts and
/// shutdown.
pub struct ResolutionMachine<CM> {
    /// The connection manager providing resolution handles.
    manager: Arc<CM>,

    /// The metrics jobs are accounted against.
    metrics: Arc<ResolverMetrics>,
}

impl<CM: ConnectionManager> ResolutionMachine<CM> {
    /// Creates a machine resolving through the given manager.
    pub fn new(manager: Arc<CM>, metrics: Arc<ResolverMetrics>) -> Self {
        Self { manager, metrics }
    }

    /// Runs a job to completion and returns its outcome.
    ///
    /// The job must have been counted as pending when it was admitted.
    /// On return it has been counted as completed and is pending no more.
    pub async fn run(
        &self,
        job: ResolutionJob,
        interrupt: &mut CommandReceiver,
    ) -> Outcome {
        let outcome = self.resolve(&job, interrupt).await;
        match outcome {
            Outcome::Success => {
                tracing::debug!(
                    local = %job.local(), remote = %job.remote(),
                    "resolve successful"
                );
            }
            _ => {
                tracing::debug!(
                    local = %job.local(), remote = %job.remote(),
                    ?outcome, "resolve error"
                );
            }
        }
        self.metrics.inc_completed();
        self.metrics.dec_pending();
        outcome
    }

    /// Runs the two phases of a job.
    async fn resolve(
        &self,
        job: &ResolutionJob,
        interrupt: &mut CommandReceiver,
    ) -> Outcome {
        let translator = Arc::new(EventTranslator::new());
        let mut handle = match self.manager.create_handle(translator.clone())
        {
            Ok(handle) => handle,
            Err(err) => {
                tracing::debug!(%err, "failed to create resolution handle");
                return Outcome::AddressError;
            }
        };

        // Phase one, address resolution.
        let context = Arc::new(ResolutionContext::new());
        translator.arm(context.clone());
        if let Err(err) = handle.resolve_address(
            job.local(), job.remote(), job.timeout(),
        ) {
            tracing::debug!(%err, "address resolution not issued");
            return Outcome::AddressError;
        }
        match context.signal().wait(job.timeout(), interrupt).await {
            SignalWait::TimedOut => return Outcome::Timeout,
            SignalWait::Interrupted => return Outcome::Cancelled,
            SignalWait::Signaled => {}
        }
        if context.outcome() != Outcome::Success {
            return Outcome::AddressError;
        }

        // Phase two, route resolution.
        let context = Arc::new(ResolutionContext::new());
        translator.arm(context.clone());
        if let Err(err) = handle.resolve_route(job.timeout()) {
            tracing::debug!(%err, "route resolution not issued");
            return Outcome::RouteError;
        }
        match context.signal().wait(job.timeout(), interrupt).await {
            SignalWait::TimedOut => return Outcome::Timeout,
            SignalWait::Interrupted => return Outcome::Cancelled,
            SignalWait::Signaled => {}
        }
        if context.outcome() != Outcome::Success {
            return Outcome::RouteError;
        }
        Outcome::Success
    }
}

//============ Tests =========================================================
