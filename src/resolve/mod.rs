//! Driving a resolution job through its phases.
//!
//! Resolving a path consists of two phases, address resolution followed by
//! route resolution. Each phase is a request to the resolution stack that
//! completes through an event delivered on a foreign execution context.
//! The modules here bridge that gap: [`signal`] provides the one-shot
//! event flag a task can wait on with a timeout, [`context`] carries the
//! per-phase outcome and translates stack events into it, and [`machine`]
//! runs the phases in order and maps every way a phase can end onto a
//! terminal [`Outcome`][context::Outcome].

pub mod context;
pub mod machine;
pub mod signal;
