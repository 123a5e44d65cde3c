//! The resolution worker pool.
//!
//! Jobs enter through a bounded queue and are picked up by a fixed set of
//! worker tasks, each driving one job at a time through a
//! [`ResolutionMachine`]. A watch channel broadcasts the pool command to
//! every worker; switching it to [`PoolCommand::Shutdown`] stops
//! admission, interrupts jobs in flight, and drains whatever is still
//! queued as cancelled.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::metrics::ResolverMetrics;
use crate::resolve::context::Outcome;
use crate::resolve::machine::{ResolutionJob, ResolutionMachine};
use crate::stack::ConnectionManager;
use crate::utils::config::DefMinMax;
use std::error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

//------------ Configuration Constants ---------------------------------------

/// The number of worker tasks in the pool.
const WORKER_COUNT: DefMinMax<usize> = DefMinMax::new(4, 1, 64);

/// The capacity of the job queue.
const QUEUE_DEPTH: DefMinMax<usize> = DefMinMax::new(64, 1, 4096);

//------------ Config --------------------------------------------------------

/// Resolution pool configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of worker tasks in the pool.
    workers: usize,

    /// The capacity of the job queue.
    queue_depth: usize,

    /// Whether the pool should be kept serviceable under memory pressure.
    reclaim: bool,
}

impl Config {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of worker tasks.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Sets the number of worker tasks.
    pub fn set_workers(&mut self, workers: usize) {
        self.workers = WORKER_COUNT.clamp(workers)
    }

    /// Returns the capacity of the job queue.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Sets the capacity of the job queue.
    pub fn set_queue_depth(&mut self, depth: usize) {
        self.queue_depth = QUEUE_DEPTH.clamp(depth)
    }

    /// Returns whether the pool requests memory-pressure service.
    pub fn reclaim(&self) -> bool {
        self.reclaim
    }

    /// Sets whether the pool requests memory-pressure service.
    pub fn set_reclaim(&mut self, reclaim: bool) {
        self.reclaim = reclaim
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: WORKER_COUNT.default(),
            queue_depth: QUEUE_DEPTH.default(),
            reclaim: true,
        }
    }
}

//------------ PoolCommand ---------------------------------------------------

/// The command currently in force for the worker pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolCommand {
    /// Process jobs normally.
    Run,

    /// Stop processing and wind down.
    Shutdown,
}

/// The receiving end of the pool command channel.
pub type CommandReceiver = watch::Receiver<PoolCommand>;

//------------ NoCapacity ----------------------------------------------------

/// The pool could not accept a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NoCapacity;

impl fmt::Display for NoCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no capacity to accept the job")
    }
}

impl error::Error for NoCapacity {}

//------------ Dispatcher ----------------------------------------------------

/// Admits resolution jobs and hands them to the worker pool.
///
/// The dispatcher owns the sending ends of the job queue and the command
/// channel. The workers it spawns at creation run until shutdown. Once
/// [`shutdown`][Self::shutdown] has been called, every further submission
/// is refused.
#[derive(Debug)]
pub struct Dispatcher {
    /// The sending end of the job queue.
    queue: mpsc::Sender<ResolutionJob>,

    /// The sending end of the pool command channel.
    command_tx: watch::Sender<PoolCommand>,

    /// The metrics jobs are accounted against.
    metrics: Arc<ResolverMetrics>,
}

impl Dispatcher {
    /// Creates a dispatcher and spawns its worker pool.
    ///
    /// The workers resolve through the given connection manager and
    /// account their jobs against the given metrics.
    pub fn new<CM: ConnectionManager + 'static>(
        manager: Arc<CM>,
        config: Config,
        metrics: Arc<ResolverMetrics>,
    ) -> Self {
        tracing::debug!(
            workers = config.workers(),
            queue_depth = config.queue_depth(),
            reclaim = config.reclaim(),
            "starting resolution worker pool"
        );
        let (queue, rx) = mpsc::channel(config.queue_depth());
        let (command_tx, _) = watch::channel(PoolCommand::Run);
        let rx = Arc::new(Mutex::new(rx));
        for _ in 0..config.workers() {
            let machine =
                ResolutionMachine::new(manager.clone(), metrics.clone());
            tokio::spawn(run_worker(
                machine,
                rx.clone(),
                command_tx.subscribe(),
                metrics.clone(),
            ));
        }
        Self { queue, command_tx, metrics }
    }

    /// Submits a job to the pool.
    ///
    /// On success the job has been counted as pending and will reach a
    /// terminal state eventually. An error means the job was not taken,
    /// either because the queue is full or because the pool is shutting
    /// down, and the counters are untouched.
    pub fn submit(&self, job: ResolutionJob) -> Result<(), NoCapacity> {
        if *self.command_tx.borrow() == PoolCommand::Shutdown {
            return Err(NoCapacity);
        }
        match self.queue.try_send(job) {
            Ok(()) => {
                self.metrics.inc_pending();
                Ok(())
            }
            Err(_) => Err(NoCapacity),
        }
    }

    /// Shuts the pool down.
    ///
    /// Admission stops at once. Workers interrupt the job they are on and
    /// mark everything still queued as cancelled. Calling this more than
    /// once has no further effect.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(PoolCommand::Shutdown);
    }
}

//------------ Worker --------------------------------------------------------

/// The main loop of a single pool worker.
async fn run_worker<CM: ConnectionManager>(
    machine: ResolutionMachine<CM>,
    queue: Arc<Mutex<mpsc::Receiver<ResolutionJob>>>,
    mut command_rx: CommandReceiver,
    metrics: Arc<ResolverMetrics>,
) {
    loop {
        let job = {
            let mut rx = queue.lock().await;
            // A command switch while nobody was at the select below
            // would otherwise go unseen.
            if *command_rx.borrow() == PoolCommand::Shutdown {
                drain_cancelled(&mut rx, &metrics);
                None
            }
            else {
                tokio::select! {
                    job = rx.recv() => job,
                    _ = command_rx.changed() => {
                        drain_cancelled(&mut rx, &metrics);
                        None
                    }
                }
            }
        };
        match job {
            Some(job) => {
                machine.run(job, &mut command_rx).await;
            }
            None => break,
        }
    }
    tracing::trace!("resolution worker exiting");
}

/// Marks every job still queued as cancelled.
///
/// Closes the queue first so nothing can slip in behind the drain.
fn drain_cancelled(
    rx: &mut mpsc::Receiver<ResolutionJob>,
    metrics: &ResolverMetrics,
) {
    rx.close();
    while let Ok(job) = rx.try_recv() {
        tracing::debug!(
            local = %job.local(), remote = %job.remote(),
            outcome = ?Outcome::Cancelled, "resolution cancelled"
        );
        metrics.inc_completed();
        metrics.dec_pending();
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::resolve::context::EventTranslator;
    use crate::stack::{ResolverHandle, StackError, StackEvent};
    use std::time::Duration;

    /// A stack that resolves everything immediately.
    struct InstantStack;

    impl ConnectionManager for InstantStack {
        type Handle = InstantHandle;

        fn create_handle(
            &self,
            events: Arc<EventTranslator>,
        ) -> Result<Self::Handle, StackError> {
            Ok(InstantHandle { events })
        }
    }

    struct InstantHandle {
        events: Arc<EventTranslator>,
    }

    impl ResolverHandle for InstantHandle {
        fn resolve_address(
            &mut self,
            _local: &Endpoint,
            _remote: &Endpoint,
            _timeout: Duration,
        ) -> Result<(), StackError> {
            let events = self.events.clone();
            std::thread::spawn(move || {
                events.deliver(StackEvent::AddressResolved)
            });
            Ok(())
        }

        fn resolve_route(
            &mut self,
            _timeout: Duration,
        ) -> Result<(), StackError> {
            let events = self.events.clone();
            std::thread::spawn(move || {
                events.deliver(StackEvent::RouteResolved)
            });
            Ok(())
        }
    }

    /// A stack that accepts every request and never answers.
    struct SilentStack;

    impl ConnectionManager for SilentStack {
        type Handle = SilentHandle;

        fn create_handle(
            &self,
            _events: Arc<EventTranslator>,
        ) -> Result<Self::Handle, StackError> {
            Ok(SilentHandle)
        }
    }

    struct SilentHandle;

    impl ResolverHandle for SilentHandle {
        fn resolve_address(
            &mut self,
            _local: &Endpoint,
            _remote: &Endpoint,
            _timeout: Duration,
        ) -> Result<(), StackError> {
            Ok(())
        }

        fn resolve_route(
            &mut self,
            _timeout: Duration,
        ) -> Result<(), StackError> {
            Ok(())
        }
    }

    fn job() -> ResolutionJob {
        ResolutionJob::new(
            "127.0.0.1:5000"
                .parse::<std::net::SocketAddr>()
                .unwrap()
                .into(),
            "127.0.0.1:6000"
                .parse::<std::net::SocketAddr>()
                .unwrap()
                .into(),
            Duration::from_secs(30),
        )
    }

    async fn wait_for_idle(metrics: &ResolverMetrics) {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(5);
        while metrics.num_pending() > 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "jobs did not finish"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn config_clamps() {
        let mut config = Config::new();
        config.set_workers(0);
        assert_eq!(config.workers(), 1);
        config.set_workers(1000);
        assert_eq!(config.workers(), 64);
        config.set_queue_depth(0);
        assert_eq!(config.queue_depth(), 1);
        config.set_queue_depth(1_000_000);
        assert_eq!(config.queue_depth(), 4096);
        assert!(config.reclaim());
        config.set_reclaim(false);
        assert!(!config.reclaim());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submitted_jobs_complete() {
        let metrics = Arc::new(ResolverMetrics::new());
        let dispatcher = Dispatcher::new(
            Arc::new(InstantStack),
            Config::new(),
            metrics.clone(),
        );
        for _ in 0..10 {
            dispatcher.submit(job()).expect("test failed");
        }
        wait_for_idle(&metrics).await;
        assert_eq!(metrics.num_completed(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_refuses_submission() {
        let metrics = Arc::new(ResolverMetrics::new());
        let dispatcher = Dispatcher::new(
            Arc::new(InstantStack),
            Config::new(),
            metrics.clone(),
        );
        dispatcher.shutdown();
        assert_eq!(dispatcher.submit(job()), Err(NoCapacity));
        assert_eq!(metrics.num_pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_drains_queue() {
        let metrics = Arc::new(ResolverMetrics::new());
        let mut config = Config::new();
        config.set_workers(1);
        config.set_queue_depth(8);
        let dispatcher = Dispatcher::new(
            Arc::new(SilentStack),
            config,
            metrics.clone(),
        );
        // The single worker takes one job and then blocks on the silent
        // stack, so the queue fills after at most depth plus one accepts.
        let mut accepted = 0;
        while dispatcher.submit(job()).is_ok() {
            accepted += 1;
            if accepted > 100 {
                panic!("queue never filled");
            }
            tokio::task::yield_now().await;
        }
        dispatcher.shutdown();
        wait_for_idle(&metrics).await;
        assert_eq!(metrics.num_completed(), accepted);
    }
}
