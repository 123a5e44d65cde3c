//! The textual control surface of the resolver.
//!
//! The resolver is driven by writing command lines of the form
//! `local,remote` where both sides are endpoint text. The control surface
//! parses such lines, stamps the currently configured timeout onto the
//! resulting job, and hands it to the dispatcher. It also exposes the
//! counters, the runtime-adjustable timeout, and a broadcast channel for
//! neighbor reachability events.

use crate::dispatch::{self, Dispatcher, NoCapacity};
use crate::endpoint::EndpointParser;
use crate::metrics::ResolverMetrics;
use crate::resolve::machine::ResolutionJob;
use crate::stack::ConnectionManager;
use crate::utils::config::DefMinMax;
use std::error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

//------------ Configuration Constants ---------------------------------------

/// The longest accepted endpoint text, in bytes.
const MAX_ENDPOINT_LEN: usize = 63;

/// The per-phase resolution timeout.
const RESOLUTION_TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(1),
    Duration::from_secs(600),
);

/// The capacity of the neighbor event channel.
const NEIGHBOR_CHANNEL_CAP: usize = 8;

//------------ SubmitError ---------------------------------------------------

/// A command line was not turned into a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitError {
    /// The line did not contain a comma separating the two endpoints.
    MalformedInput,

    /// One of the endpoint texts exceeded the permitted length.
    AddressTooLong,

    /// One of the endpoint texts did not parse as an endpoint.
    ParseFailure,

    /// A resource for the job could not be allocated.
    ///
    /// Kept for control surfaces that allocate per job. The library
    /// itself does not produce this value.
    OutOfMemory,

    /// The worker pool had no room for the job.
    CapacityExceeded,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::MalformedInput => {
                write!(f, "malformed command line")
            }
            SubmitError::AddressTooLong => {
                write!(f, "endpoint text too long")
            }
            SubmitError::ParseFailure => {
                write!(f, "invalid endpoint text")
            }
            SubmitError::OutOfMemory => {
                write!(f, "out of memory")
            }
            SubmitError::CapacityExceeded => {
                write!(f, "no capacity to accept the job")
            }
        }
    }
}

impl error::Error for SubmitError {}

//------------ NeighborEvent -------------------------------------------------

/// A change in neighbor reachability.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NeighborEvent {
    /// A neighbor has become reachable.
    Reachable,
}

//------------ ControlSurface ------------------------------------------------

/// The entry point for driving the resolver.
///
/// A surface owns the dispatcher and with it the worker pool. It is
/// parameterized over the endpoint parser so an environment can plug in
/// its own notation.
pub struct ControlSurface<P> {
    /// The parser turning endpoint text into endpoints.
    parser: P,

    /// The dispatcher feeding the worker pool.
    dispatcher: Dispatcher,

    /// The counters shared with the pool.
    metrics: Arc<ResolverMetrics>,

    /// The per-phase timeout for new jobs, in milliseconds.
    timeout_ms: AtomicU64,

    /// Whether the pool requests memory-pressure service.
    reclaim: AtomicBool,

    /// The sending end of the neighbor event channel.
    neighbor_tx: broadcast::Sender<NeighborEvent>,
}

impl<P: EndpointParser> ControlSurface<P> {
    /// Creates a control surface over the given connection manager.
    pub fn new<CM: ConnectionManager + 'static>(
        parser: P,
        manager: Arc<CM>,
        config: dispatch::Config,
    ) -> Self {
        let reclaim = config.reclaim();
        let metrics = Arc::new(ResolverMetrics::new());
        let dispatcher = Dispatcher::new(manager, config, metrics.clone());
        let (neighbor_tx, _) = broadcast::channel(NEIGHBOR_CHANNEL_CAP);
        Self {
            parser,
            dispatcher,
            metrics,
            timeout_ms: AtomicU64::new(
                RESOLUTION_TIMEOUT.default().as_millis() as u64,
            ),
            reclaim: AtomicBool::new(reclaim),
            neighbor_tx,
        }
    }

    /// Submits a command line.
    ///
    /// The line must consist of the local endpoint text, a comma, and the
    /// remote endpoint text, optionally followed by trailing newlines. On
    /// success a job with the currently configured timeout has been
    /// admitted to the pool.
    pub fn submit_line(&self, line: &str) -> Result<(), SubmitError> {
        let (local, remote) = split_command(line)?;
        tracing::debug!(local, remote, "resolution requested");
        let local = self
            .parser
            .parse_endpoint(local)
            .map_err(|_| SubmitError::ParseFailure)?;
        let remote = self
            .parser
            .parse_endpoint(remote)
            .map_err(|_| SubmitError::ParseFailure)?;
        let job = ResolutionJob::new(local, remote, self.timeout());
        self.dispatcher
            .submit(job)
            .map_err(|NoCapacity| SubmitError::CapacityExceeded)
    }

    /// Returns the number of jobs admitted but not yet finished.
    pub fn pending_count(&self) -> usize {
        self.metrics.num_pending()
    }

    /// Returns the number of jobs that reached a terminal state.
    pub fn completed_count(&self) -> usize {
        self.metrics.num_completed()
    }

    /// Renders the pending count the way the control surface reports it.
    pub fn render_pending(&self) -> String {
        format!("{}\n", self.pending_count())
    }

    /// Returns the per-phase timeout stamped onto new jobs.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    /// Sets the per-phase timeout for jobs admitted from now on.
    ///
    /// Jobs already admitted keep the timeout they were created with.
    pub fn set_timeout(&self, timeout: Duration) {
        let timeout = RESOLUTION_TIMEOUT.clamp(timeout);
        self.timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    /// Returns whether the pool requests memory-pressure service.
    pub fn reclaim(&self) -> bool {
        self.reclaim.load(Ordering::Relaxed)
    }

    /// Sets the memory-pressure service flag.
    ///
    /// The flag is read when a worker pool is created, so changing it
    /// here only affects pools created later.
    pub fn set_reclaim(&self, reclaim: bool) {
        self.reclaim.store(reclaim, Ordering::Relaxed)
    }

    /// Broadcasts a neighbor reachability event.
    ///
    /// Nothing happens if nobody is subscribed.
    pub fn trigger_neighbor_event(&self) {
        let _ = self.neighbor_tx.send(NeighborEvent::Reachable);
    }

    /// Subscribes to neighbor reachability events.
    pub fn neighbor_events(&self) -> broadcast::Receiver<NeighborEvent> {
        self.neighbor_tx.subscribe()
    }

    /// Shuts the resolver down.
    ///
    /// Every line submitted afterwards is refused with
    /// [`SubmitError::CapacityExceeded`].
    pub fn shutdown(&self) {
        self.dispatcher.shutdown()
    }
}

//------------ Command Parsing -----------------------------------------------

/// Splits a command line into local and remote endpoint text.
///
/// The length of each side is checked before any trimming, so an
/// over-long remote text is refused even when only trailing newlines
/// push it over the limit.
fn split_command(line: &str) -> Result<(&str, &str), SubmitError> {
    let (local, remote) = match line.split_once(',') {
        Some(parts) => parts,
        None => return Err(SubmitError::MalformedInput),
    };
    if local.len() > MAX_ENDPOINT_LEN || remote.len() > MAX_ENDPOINT_LEN {
        return Err(SubmitError::AddressTooLong);
    }
    Ok((local, remote.trim_end_matches('\n')))
}

//============ Tests =========================================================
