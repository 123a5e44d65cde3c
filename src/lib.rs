//! A small framework for resolving network paths.
//!
//! This crate drives pairs of endpoints through two-phase path
//! resolution, address resolution followed by route resolution, against
//! an external resolution stack. The stack itself is abstracted away
//! behind a trait, so the crate contains the orchestration only: a
//! textual control surface, a bounded worker pool, and the machinery
//! that turns the stack's asynchronous events into per-job outcomes.
//!
//! The crate is organized in the following modules:
//!
//! * [`control`] with the textual control surface,
//! * [`dispatch`] with the job queue and worker pool,
//! * [`endpoint`] with endpoints and endpoint parsing,
//! * [`metrics`] with the counters shared across jobs,
//! * [`resolve`] with the per-job resolution machinery,
//! * [`stack`] with the interface towards the resolution stack.
//!
//! To use the crate, implement [`stack::ConnectionManager`] for your
//! resolution stack, build a [`dispatch::Config`], and create a
//! [`control::ControlSurface`]. Feed it command lines of the form
//! `local,remote` and watch the counters.

pub mod control;
pub mod dispatch;
pub mod endpoint;
pub mod metrics;
pub mod resolve;
pub mod stack;

mod utils;
