//! The SASL line-protocol handshake that precedes any D-Bus message.
//!
//! [`Authenticator`] drives the exchange over anything that implements
//! `AsyncRead + AsyncWrite`: a single leading NUL byte, then `AUTH`/`DATA`/
//! `BEGIN` lines alternating with the server's `OK`/`REJECTED`/`DATA`/
//! `ERROR` replies, optionally followed by Unix-fd-passing negotiation.

pub use self::mechanism::{Anonymous, External, Mechanism};
mod mechanism;

mod line;

use self::line::{hex_decode, hex_encode, split_command, trim_eol};
use crate::error::{Error, ErrorKind, Result};

#[cfg(feature = "tokio")]
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// The maximum length, in bytes, of a single SASL line. The handshake is
/// small and fixed-shape; anything longer than this is either a malformed
/// peer or an attempt to exhaust memory reading an unterminated line.
const MAX_LINE: usize = 16 * 1024;

/// The server's identity, taken from the `OK <guid>` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guid(String);

impl Guid {
    /// The GUID as a lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The outcome of a successful handshake: the server's GUID and whether it
/// agreed to pass Unix file descriptors out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    guid: Guid,
    unix_fd: bool,
}

impl Authenticated {
    /// The server's GUID.
    pub fn guid(&self) -> &Guid {
        &self.guid
    }

    /// Whether the server agreed to `NEGOTIATE_UNIX_FD`.
    pub fn unix_fd(&self) -> bool {
        self.unix_fd
    }
}

/// Drives the SASL handshake over a transport, trying each mechanism in
/// order until one is accepted.
pub struct Authenticator {
    mechanisms: Vec<Box<dyn Mechanism + Send + Sync>>,
    negotiate_unix_fd: bool,
}

impl Authenticator {
    /// An authenticator with no mechanisms configured; add at least one
    /// with [`Authenticator::with_mechanism`] before calling
    /// [`Authenticator::authenticate`].
    pub fn new() -> Self {
        Self {
            mechanisms: Vec::new(),
            negotiate_unix_fd: false,
        }
    }

    /// The default authenticator: `EXTERNAL` for the current Unix user,
    /// falling back to `ANONYMOUS`.
    #[cfg(all(unix, feature = "tokio"))]
    pub fn default_mechanisms() -> Self {
        Self::new()
            .with_mechanism(External::current_uid())
            .with_mechanism(Anonymous::default())
    }

    /// Builder: append a mechanism to the set tried, in order, during
    /// [`Authenticator::authenticate`].
    #[must_use]
    pub fn with_mechanism(mut self, mechanism: impl Mechanism + Send + Sync + 'static) -> Self {
        self.mechanisms.push(Box::new(mechanism));
        self
    }

    /// Builder: request Unix file descriptor passing via
    /// `NEGOTIATE_UNIX_FD`. The server may still refuse; refusal does not
    /// fail the handshake.
    #[must_use]
    pub fn with_unix_fd_negotiation(mut self, enabled: bool) -> Self {
        self.negotiate_unix_fd = enabled;
        self
    }

    /// Run the handshake to completion, ending with `BEGIN`. The stream is
    /// ready to carry D-Bus messages as soon as this returns `Ok`.
    #[cfg(feature = "tokio")]
    pub async fn authenticate<S>(&self, stream: &mut S) -> Result<Authenticated>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.mechanisms.is_empty() {
            return Err(Error::from(ErrorKind::Auth("no mechanisms configured")));
        }

        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(&[0]).await?;

        let guid = self.negotiate_mechanism(&mut reader).await?;

        let unix_fd = if self.negotiate_unix_fd {
            self.negotiate_unix_fd(&mut reader).await?
        } else {
            false
        };

        reader.get_mut().write_all(b"BEGIN\r\n").await?;

        Ok(Authenticated { guid, unix_fd })
    }

    #[cfg(feature = "tokio")]
    async fn negotiate_mechanism<S>(&self, reader: &mut BufReader<S>) -> Result<Guid>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut last_reason = "server rejected every mechanism";

        for mechanism in &self.mechanisms {
            let initial = hex_encode(&mechanism.initial_response());
            let mut line = Vec::with_capacity(b"AUTH ".len() + mechanism.name().len() + 1 + initial.len() + 2);
            line.extend_from_slice(b"AUTH ");
            line.extend_from_slice(mechanism.name().as_bytes());
            line.push(b' ');
            line.extend_from_slice(&initial);
            line.extend_from_slice(b"\r\n");
            reader.get_mut().write_all(&line).await?;

            match self.read_auth_reply(reader, mechanism.as_ref()).await? {
                Some(guid) => return Ok(guid),
                None => {
                    last_reason = "mechanism rejected";
                    continue;
                }
            }
        }

        Err(Error::from(ErrorKind::Auth(last_reason)))
    }

    /// Read replies for a single mechanism attempt until it either
    /// succeeds (`Ok(Some(guid))`), is rejected and the caller should try
    /// the next mechanism (`Ok(None)`), or the line protocol itself is
    /// violated (`Err`).
    #[cfg(feature = "tokio")]
    async fn read_auth_reply<S>(
        &self,
        reader: &mut BufReader<S>,
        mechanism: &(dyn Mechanism + Send + Sync),
    ) -> Result<Option<Guid>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = read_line(reader).await?;
            let line = trim_eol(&line);
            let (command, rest) = split_command(line);

            match command {
                b"OK" => {
                    let guid = std::str::from_utf8(rest)
                        .map_err(|_| Error::from(ErrorKind::Auth("non-UTF-8 guid")))?
                        .to_owned();
                    return Ok(Some(Guid(guid)));
                }
                b"REJECTED" => return Ok(None),
                b"ERROR" => return Ok(None),
                b"DATA" => {
                    let challenge = hex_decode(rest)
                        .ok_or_else(|| Error::from(ErrorKind::Auth("malformed DATA line")))?;

                    match mechanism.handle_data(&challenge) {
                        Some(response) => {
                            let mut line = Vec::with_capacity(5 + response.len() * 2 + 2);
                            line.extend_from_slice(b"DATA ");
                            line.extend_from_slice(&hex_encode(&response));
                            line.extend_from_slice(b"\r\n");
                            reader.get_mut().write_all(&line).await?;
                        }
                        None => {
                            reader.get_mut().write_all(b"CANCEL\r\n").await?;
                        }
                    }
                }
                _ => return Err(Error::from(ErrorKind::Auth("malformed server line"))),
            }
        }
    }

    #[cfg(feature = "tokio")]
    async fn negotiate_unix_fd<S>(&self, reader: &mut BufReader<S>) -> Result<bool>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        reader
            .get_mut()
            .write_all(b"NEGOTIATE_UNIX_FD\r\n")
            .await?;

        let line = read_line(reader).await?;
        let (command, _) = split_command(trim_eol(&line));

        match command {
            b"AGREE_UNIX_FD" => Ok(true),
            b"ERROR" => Ok(false),
            _ => Err(Error::from(ErrorKind::Auth(
                "malformed NEGOTIATE_UNIX_FD reply",
            ))),
        }
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tokio")]
async fn read_line<S>(reader: &mut BufReader<S>) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut limited = reader.take(MAX_LINE as u64);
    let n = limited.read_until(b'\n', &mut line).await?;

    if n == 0 {
        return Err(Error::from(ErrorKind::ConnectionClosed));
    }

    if !line.ends_with(b"\n") {
        return Err(Error::from(ErrorKind::Auth("line too long")));
    }

    Ok(line)
}

#[cfg(test)]
mod tests;
