//! The interface towards the resolution stack.
//!
//! The actual work of resolving an address and a route towards it is done
//! by an external connection manager. This module defines the small
//! interface the resolver core needs from it: a way to create a per-job
//! resolution handle, a way to issue the two resolution requests on that
//! handle, and the set of events the stack may deliver in return.
//!
//! Requests are asynchronous in the stack's own sense: issuing one merely
//! hands it to the stack, which later reports progress by calling
//! [`EventTranslator::deliver`] on the translator given at handle creation.
//! Delivery happens on whatever execution context the stack uses
//! internally, never on the task that issued the request. Dropping a handle
//! releases all stack resources attached to it.

use crate::endpoint::Endpoint;
use crate::resolve::context::EventTranslator;
use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

//------------ ConnectionManager ---------------------------------------------

/// A stack that can resolve addresses and routes.
pub trait ConnectionManager: Send + Sync {
    /// The per-job resolution handle produced by this manager.
    type Handle: ResolverHandle;

    /// Creates a new resolution handle.
    ///
    /// All events concerning the handle are delivered through `events`.
    /// The handle owns whatever stack resources the manager allocates for
    /// it; dropping the handle releases them.
    fn create_handle(
        &self,
        events: Arc<EventTranslator>,
    ) -> Result<Self::Handle, StackError>;
}

//------------ ResolverHandle ------------------------------------------------

/// A single job's window into the resolution stack.
///
/// Both methods only issue a request. The result arrives later as a
/// [`StackEvent`] through the translator the handle was created with. An
/// error return means the request could not even be issued.
pub trait ResolverHandle: Send {
    /// Asks the stack to resolve the local address towards the remote one.
    fn resolve_address(
        &mut self,
        local: &Endpoint,
        remote: &Endpoint,
        timeout: Duration,
    ) -> Result<(), StackError>;

    /// Asks the stack to resolve a route to the previously resolved address.
    fn resolve_route(&mut self, timeout: Duration) -> Result<(), StackError>;
}

//------------ StackEvent ----------------------------------------------------

/// An event delivered by the resolution stack.
///
/// Only the four resolution events are meaningful to the resolver core.
/// The remaining variants exist because a connection manager typically
/// shares one event channel across all connection phases; the core ignores
/// them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackEvent {
    /// The address of the local endpoint was resolved.
    AddressResolved,

    /// Address resolution failed.
    AddressError,

    /// A route towards the remote endpoint was resolved.
    RouteResolved,

    /// Route resolution failed.
    RouteError,

    /// A remote peer asked to connect.
    ConnectRequest,

    /// A connection was established.
    Established,

    /// A connection was torn down.
    Disconnected,

    /// A connection attempt was rejected by the peer.
    Rejected,
}

//------------ StackError ----------------------------------------------------

/// A request could not be handed to the resolution stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackError {
    /// The manager refused to create a resolution handle.
    HandleCreation,

    /// The stack rejected an address resolution request.
    AddressRequest,

    /// The stack rejected a route resolution request.
    RouteRequest,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::HandleCreation => {
                write!(f, "failed to create resolution handle")
            }
            StackError::AddressRequest => {
                write!(f, "address resolution request rejected")
            }
            StackError::RouteRequest => {
                write!(f, "route resolution request rejected")
            }
        }
    }
}

impl error::Error for StackError {}
