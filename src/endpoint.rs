//! Endpoints and turning text into them.
//!
//! A resolution job works on a pair of [`Endpoint`]s, the local and the
//! remote end of the path to be resolved. Endpoints are plain values
//! wrapping a socket address of either address family. They are produced
//! by parsing text received over the control surface and are never
//! modified afterwards.
//!
//! Parsing itself is a seam: an environment may need to interpret endpoint
//! text relative to a particular network namespace or naming scheme, so the
//! actual conversion lives behind the [`EndpointParser`] trait. The
//! [`SystemParser`] implementation covers the common case of standard
//! `address:port` notation resolved in the process's own namespace.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

//------------ Endpoint ------------------------------------------------------

/// A network address and port pair, IPv4 or IPv6.
///
/// Endpoints are immutable and compare by value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    /// The underlying socket address.
    addr: SocketAddr,
}

impl Endpoint {
    /// Creates an endpoint from a socket address.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Returns the socket address of the endpoint.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the IP address portion of the endpoint.
    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    /// Returns the port of the endpoint.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

//------------ EndpointParser ------------------------------------------------

/// Conversion of endpoint text into an [`Endpoint`].
///
/// Implementations may be aware of network namespaces or use their own
/// notation. The control surface only requires that valid text produces an
/// endpoint and anything else produces a [`ParseError`].
pub trait EndpointParser {
    /// Parses the given text into an endpoint.
    fn parse_endpoint(&self, text: &str) -> Result<Endpoint, ParseError>;
}

//------------ SystemParser --------------------------------------------------

/// An endpoint parser for standard `address:port` notation.
///
/// Addresses are interpreted in the network namespace of the current
/// process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemParser;

impl EndpointParser for SystemParser {
    fn parse_endpoint(&self, text: &str) -> Result<Endpoint, ParseError> {
        text.parse::<SocketAddr>()
            .map(Endpoint::new)
            .map_err(|_| ParseError)
    }
}

//------------ ParseError ----------------------------------------------------

/// The text was not a valid endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseError;

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid endpoint text")
    }
}

impl std::error::Error for ParseError {}

//============ Tests =========================================================
