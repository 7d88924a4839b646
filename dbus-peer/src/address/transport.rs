use std::collections::HashMap;

use super::percent_decode;
use crate::error::{Error, ErrorKind, Result};

/// A Unix domain socket transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unix {
    path: UnixPath,
}

impl Unix {
    /// Construct a Unix transport from an already-resolved path.
    pub fn new(path: UnixPath) -> Self {
        Self { path }
    }

    /// The socket path.
    pub fn path(&self) -> &UnixPath {
        &self.path
    }

    pub(super) fn from_options(opts: &HashMap<&str, &str>) -> Result<Self> {
        let path = opts.get("path");
        let abstract_name = opts.get("abstract");

        let path = match (path, abstract_name) {
            (Some(p), None) => UnixPath::File(percent_decode(p)?),
            (None, Some(p)) => UnixPath::Abstract(percent_decode(p)?),
            (Some(_), Some(_)) => {
                return Err(Error::from(ErrorKind::InvalidAddress(
                    "unix: 'path' and 'abstract' are mutually exclusive",
                )))
            }
            (None, None) => {
                return Err(Error::from(ErrorKind::InvalidAddress(
                    "unix: missing 'path' or 'abstract' key",
                )))
            }
        };

        Ok(Self::new(path))
    }
}

/// Where a Unix transport's socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnixPath {
    /// A filesystem path.
    File(String),
    /// An abstract socket name (Linux-only at the kernel level, accepted
    /// here regardless of host platform since the address grammar doesn't
    /// vary by it).
    Abstract(String),
}

/// The address family to prefer when resolving a `tcp:` transport's host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpFamily {
    /// Resolve either IPv4 or IPv6.
    Unspecified,
    /// Resolve IPv4 only.
    Ipv4,
    /// Resolve IPv6 only.
    Ipv6,
}

/// A TCP/IP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tcp {
    host: String,
    port: u16,
    family: TcpFamily,
}

impl Tcp {
    /// Construct a TCP transport.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            family: TcpFamily::Unspecified,
        }
    }

    /// Builder: set the address family.
    #[must_use]
    pub fn with_family(mut self, family: TcpFamily) -> Self {
        self.family = family;
        self
    }

    /// The host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The preferred address family.
    pub fn family(&self) -> TcpFamily {
        self.family
    }

    pub(super) fn from_options(opts: &HashMap<&str, &str>) -> Result<Self> {
        let host = opts
            .get("host")
            .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("tcp: missing 'host' key")))?;
        let port = opts
            .get("port")
            .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("tcp: missing 'port' key")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Error::from(ErrorKind::InvalidAddress("tcp: invalid 'port' value")))?;

        let family = match opts.get("family").copied() {
            None => TcpFamily::Unspecified,
            Some("ipv4") => TcpFamily::Ipv4,
            Some("ipv6") => TcpFamily::Ipv6,
            Some(_) => {
                return Err(Error::from(ErrorKind::InvalidAddress(
                    "tcp: invalid 'family' value",
                )))
            }
        };

        Ok(Self::new(percent_decode(host)?, port).with_family(family))
    }
}
