//! The duplex byte stream a [`crate::bus::MessageBus`] speaks over, plus the
//! `SCM_RIGHTS` ancillary-data plumbing needed to pass Unix file descriptors
//! alongside a message.
//!
//! This is deliberately thin: address *resolution* lives in
//! [`crate::address`], the SASL line protocol in [`crate::sasl`], and
//! message framing in [`crate::message`]. This module only turns a resolved
//! [`Address`](crate::address::Address) into something that implements
//! [`AsyncRead`]/[`AsyncWrite`], with an extra pair of methods for fd
//! passing on the Unix variant.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{self, AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UnixStream};

use crate::address::{Address, Tcp, TcpFamily, Unix, UnixPath};
use crate::error::{Error, ErrorKind, Result};

#[cfg(unix)]
mod fds;

#[cfg(unix)]
use std::os::fd::OwnedFd;

/// A connected transport: either the Unix domain socket or the TCP stream
/// underlying a [`Address`] entry.
pub struct Transport {
    inner: Inner,
}

enum Inner {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Transport {
    /// Connect to a single resolved address.
    ///
    /// `Address::Launchd` must already have been resolved to
    /// `Address::Unix` by [`crate::address::resolve_all`]; passing one
    /// through unresolved is a programmer error and returns
    /// `InvalidAddressError`.
    pub async fn connect(address: &Address) -> Result<Self> {
        match address {
            Address::Unix(unix) => Self::connect_unix(unix).await,
            Address::Tcp(tcp) => Self::connect_tcp(tcp).await,
            Address::Launchd { .. } => Err(Error::from(ErrorKind::InvalidAddress(
                "launchd address must be resolved before connecting",
            ))),
        }
    }

    /// Try each address in turn, returning the first that connects. Does
    /// not attempt authentication; that is the caller's responsibility, so
    /// that a transport-level connection that then fails to authenticate
    /// can fall through to the next address too.
    pub async fn connect_any(addresses: &[Address]) -> Result<Self> {
        let mut last_err = None;

        for address in addresses {
            match Self::connect(address).await {
                Ok(transport) => return Ok(transport),
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::from(ErrorKind::MissingBus)))
    }

    async fn connect_unix(unix: &Unix) -> Result<Self> {
        let stream = match unix.path() {
            UnixPath::File(path) => UnixStream::connect(path).await.map_err(Error::from)?,
            UnixPath::Abstract(name) => connect_abstract(name)?,
        };

        Ok(Self {
            inner: Inner::Unix(stream),
        })
    }

    async fn connect_tcp(tcp: &Tcp) -> Result<Self> {
        let candidates = tokio::net::lookup_host((tcp.host(), tcp.port()))
            .await
            .map_err(Error::from)?;

        let mut last_err = None;

        for candidate in candidates {
            let matches_family = match tcp.family() {
                TcpFamily::Unspecified => true,
                TcpFamily::Ipv4 => candidate.is_ipv4(),
                TcpFamily::Ipv6 => candidate.is_ipv6(),
            };

            if !matches_family {
                continue;
            }

            match TcpStream::connect(candidate).await {
                Ok(stream) => {
                    return Ok(Self {
                        inner: Inner::Tcp(stream),
                    })
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err
            .map(Error::from)
            .unwrap_or_else(|| Error::from(ErrorKind::InvalidAddress("tcp: host resolved to no addresses"))))
    }

    /// Whether this transport can carry `SCM_RIGHTS` ancillary data
    /// (Unix domain sockets only).
    pub fn supports_fd_passing(&self) -> bool {
        matches!(self.inner, Inner::Unix(_))
    }

    /// Wrap an already-connected Unix stream, bypassing address resolution.
    /// Used by tests to drive a [`super::bus::MessageBus`] over a
    /// [`UnixStream::pair`] instead of a real daemon socket.
    #[cfg(test)]
    pub(crate) fn from_unix_stream(stream: UnixStream) -> Self {
        Self {
            inner: Inner::Unix(stream),
        }
    }

    /// Write the whole of `buf`, attaching `fds` as `SCM_RIGHTS` ancillary
    /// data on the first chunk sent. A stream socket's `sendmsg`/`try_write`
    /// may accept fewer bytes than offered when its send buffer is nearly
    /// full, so this loops, advancing past whatever was actually written and
    /// retaining the remainder, until every byte has gone out. Returns the
    /// total number of payload bytes written, which is always `buf.len()` on
    /// success.
    #[cfg(unix)]
    pub async fn send_with_fds(&self, buf: &[u8], fds: &[std::os::fd::RawFd]) -> Result<usize> {
        match &self.inner {
            Inner::Unix(stream) => {
                let mut written = 0;

                while written < buf.len() {
                    let chunk_fds = if written == 0 { fds } else { &[] };
                    let n = self::fds::send_with_fds(stream, &buf[written..], chunk_fds)
                        .await
                        .map_err(Error::from)?;

                    if n == 0 {
                        return Err(Error::from(ErrorKind::ConnectionClosed));
                    }

                    written += n;
                }

                Ok(written)
            }
            Inner::Tcp(stream) => {
                if !fds.is_empty() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "cannot pass file descriptors over a TCP transport",
                    )));
                }

                let mut written = 0;

                while written < buf.len() {
                    stream.writable().await.map_err(Error::from)?;

                    match stream.try_write(&buf[written..]) {
                        Ok(0) => return Err(Error::from(ErrorKind::ConnectionClosed)),
                        Ok(n) => written += n,
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                        Err(e) => return Err(Error::from(e)),
                    }
                }

                Ok(written)
            }
        }
    }

    /// Receive into `buf`, decoding up to `max_fds` descriptors from any
    /// `SCM_RIGHTS` ancillary data attached to the datagram that produced
    /// the bytes read.
    #[cfg(unix)]
    pub async fn recv_with_fds(&self, buf: &mut [u8], max_fds: usize) -> Result<(usize, Vec<OwnedFd>)> {
        match &self.inner {
            Inner::Unix(stream) => self::fds::recv_with_fds(stream, buf, max_fds)
                .await
                .map_err(Error::from),
            Inner::Tcp(stream) => loop {
                stream.readable().await.map_err(Error::from)?;

                match stream.try_read(buf) {
                    Ok(n) => return Ok((n, Vec::new())),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(e) => return Err(Error::from(e)),
                }
            },
        }
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            Inner::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            Inner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            Inner::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Unix(stream) => Pin::new(stream).poll_flush(cx),
            Inner::Tcp(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            Inner::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(all(unix, target_os = "linux"))]
fn connect_abstract(name: &str) -> Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

    let addr = SocketAddr::from_abstract_name(name.as_bytes())
        .map_err(|_| Error::from(ErrorKind::InvalidAddress("invalid abstract socket name")))?;
    let std_stream = StdUnixStream::connect_addr(&addr).map_err(Error::from)?;
    std_stream.set_nonblocking(true).map_err(Error::from)?;
    UnixStream::from_std(std_stream).map_err(Error::from)
}

#[cfg(not(all(unix, target_os = "linux")))]
fn connect_abstract(_name: &str) -> Result<UnixStream> {
    Err(Error::from(ErrorKind::InvalidAddress(
        "abstract Unix sockets are only supported on Linux",
    )))
}
