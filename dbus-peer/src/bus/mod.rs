//! The connected message bus: a single background dispatch task plus the
//! handle type, [`MessageBus`], that every public operation funnels through
//! an `mpsc` command channel.
//!
//! Centralizing all mutable state (the pending-reply table, the match-rule
//! registry, the export table) inside one task is what gives this crate the
//! single-threaded cooperative model: the task never holds a lock across an
//! await point, because it never holds a lock at all. A callback invoked
//! from inside the dispatch loop (an exported method, a signal handler) is
//! free to call back into the bus; doing so only enqueues a `Command`.

pub use self::export::ExportedInterface;
mod export;

pub use self::match_rule::{MatchRule, MatchToken};
mod match_rule;

pub use self::reply_future::ReplyFuture;
mod reply_future;

mod command;
mod dispatch;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::address;
use crate::error::{Error, ErrorKind, Result};
use crate::introspect::Node;
use crate::message::MessageBuf;
use crate::names::{BusName, InterfaceName};
use crate::object_path::{ObjectPath, ObjectPathBuf};
use crate::proto::Flags;
use crate::sasl::Authenticator;
use crate::transport::Transport;

use self::command::Command;

/// Which well-known bus to connect to, or an explicit address list.
#[derive(Debug, Clone)]
pub enum BusAddress {
    /// The per-user session bus (`DBUS_SESSION_BUS_ADDRESS`).
    Session,
    /// The system-wide bus (`DBUS_SYSTEM_BUS_ADDRESS`, falling back to the
    /// well-known system socket path).
    System,
    /// An explicit address list in D-Bus address syntax.
    Custom(String),
}

/// Flags passed to [`MessageBus::request_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestNameFlags(pub(crate) u32);

impl RequestNameFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Allow another connection to steal the name away if it also requests
    /// `REPLACE_EXISTING`.
    pub const ALLOW_REPLACEMENT: Self = Self(1);
    /// Steal the name from its current owner, if that owner allowed
    /// replacement.
    pub const REPLACE_EXISTING: Self = Self(2);
    /// Fail immediately instead of being queued as a waiting owner.
    pub const DO_NOT_QUEUE: Self = Self(4);
}

impl std::ops::BitOr for RequestNameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// The outcome of [`MessageBus::request_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestNameReply {
    /// The name is now owned by this connection.
    PrimaryOwner,
    /// The name was already owned and this connection has been queued.
    InQueue,
    /// The name is owned and `DO_NOT_QUEUE` was set.
    Exists,
    /// This connection already owns the name.
    AlreadyOwner,
}

impl RequestNameReply {
    fn from_u32(code: u32) -> Result<Self> {
        match code {
            1 => Ok(Self::PrimaryOwner),
            2 => Ok(Self::InQueue),
            3 => Ok(Self::Exists),
            4 => Ok(Self::AlreadyOwner),
            _ => Err(Error::from(ErrorKind::InvalidProtocol("unknown RequestName reply code"))),
        }
    }
}

/// The outcome of [`MessageBus::release_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseNameReply {
    /// The name was released.
    Released,
    /// The name had no owner.
    NonExistent,
    /// This connection did not own the name.
    NotOwner,
}

impl ReleaseNameReply {
    fn from_u32(code: u32) -> Result<Self> {
        match code {
            1 => Ok(Self::Released),
            2 => Ok(Self::NonExistent),
            3 => Ok(Self::NotOwner),
            _ => Err(Error::from(ErrorKind::InvalidProtocol("unknown ReleaseName reply code"))),
        }
    }
}

/// A stream of signals matched by a single [`MatchRule`], returned by
/// [`MessageBus::add_match`]. Dropping this (or calling
/// [`MessageBus::remove_match`] with its token) unsubscribes.
pub struct SignalStream {
    receiver: mpsc::UnboundedReceiver<MessageBuf>,
}

impl SignalStream {
    /// Wait for the next signal matching the rule this stream was created
    /// from. Resolves to `None` once the bus disconnects.
    pub async fn recv(&mut self) -> Option<MessageBuf> {
        self.receiver.recv().await
    }
}

/// A connected handle to a D-Bus bus or peer.
///
/// Cloning shares the same dispatch task: every clone enqueues `Command`s
/// onto the same channel, so two clones never race each other for the
/// transport.
#[derive(Clone)]
pub struct MessageBus {
    commands: mpsc::UnboundedSender<Command>,
    unique_name: Option<BusName>,
}

impl MessageBus {
    /// Connect to the session bus, authenticate, and send the mandatory
    /// `Hello` call.
    pub async fn session() -> Result<Self> {
        Self::connect(BusAddress::Session).await
    }

    /// Connect to the system bus, authenticate, and send the mandatory
    /// `Hello` call.
    pub async fn system() -> Result<Self> {
        Self::connect(BusAddress::System).await
    }

    /// Resolve `address`, connect the transport, authenticate, spawn the
    /// dispatch task, and (for [`BusAddress::Session`]/[`BusAddress::System`])
    /// send the mandatory `Hello` call to learn this connection's unique
    /// name.
    pub async fn connect(address: BusAddress) -> Result<Self> {
        let is_bus = !matches!(address, BusAddress::Custom(_));

        let addrs = match &address {
            BusAddress::Session => address::session()?,
            BusAddress::System => address::system()?,
            BusAddress::Custom(addr) => address::parse(addr)?,
        };
        let addrs = address::resolve_all(addrs).await?;

        let mut transport = Transport::connect_any(&addrs).await?;
        let supports_fd_passing = transport.supports_fd_passing();

        let authenticator = Authenticator::default_mechanisms().with_unix_fd_negotiation(supports_fd_passing);
        authenticator.authenticate(&mut transport).await?;

        let transport = Arc::new(transport);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch::run(Arc::clone(&transport), commands_tx.clone(), commands_rx));

        let mut bus = Self {
            commands: commands_tx,
            unique_name: None,
        };

        if is_bus {
            let hello = MessageBuf::method_call(ObjectPath::new_const("/org/freedesktop/DBus"), "Hello")?
                .with_interface("org.freedesktop.DBus")?
                .with_destination("org.freedesktop.DBus")?;
            let reply = bus.send(hello).await?.await?;
            if let Some(crate::value::Value::Str(name)) = reply.body().first() {
                bus.unique_name = Some(BusName::new(name.clone()).map_err(Error::from)?);
            }
        }

        Ok(bus)
    }

    /// Spawn the dispatch task directly over an already-connected transport,
    /// skipping address resolution, SASL, and the `Hello` call. Used by
    /// tests to wire up a peer-to-peer pair without a real bus daemon.
    #[cfg(test)]
    pub(crate) fn for_test(transport: Transport) -> Self {
        let transport = Arc::new(transport);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch::run(Arc::clone(&transport), commands_tx.clone(), commands_rx));

        Self {
            commands: commands_tx,
            unique_name: None,
        }
    }

    /// This connection's unique name (`:1.42`-style), learned from the
    /// `Hello` reply. `None` for a [`BusAddress::Custom`] peer-to-peer
    /// connection, which has no bus daemon to assign one.
    pub fn unique_name(&self) -> Option<&BusName> {
        self.unique_name.as_ref()
    }

    /// Send `message`, assigning it the next outgoing serial.
    ///
    /// Returns a [`ReplyFuture`] regardless of whether the message actually
    /// expects a reply; if [`Flags::NO_REPLY_EXPECTED`] is set (or the
    /// message is a `SIGNAL`), drop or [`ReplyFuture::cancel`] it rather than
    /// awaiting it.
    pub async fn send(&self, message: MessageBuf) -> Result<ReplyFuture> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (serial_tx, serial_rx) = oneshot::channel();

        self.commands
            .send(Command::Send {
                message,
                reply: Some(reply_tx),
                reply_serial: Some(serial_tx),
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        let serial = serial_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?;
        Ok(ReplyFuture::new(serial, self.commands.clone(), reply_rx))
    }

    /// Send `message` without requesting a pending-reply entry. Used for
    /// signals and for method calls sent with
    /// [`Flags::NO_REPLY_EXPECTED`](crate::proto::Flags::NO_REPLY_EXPECTED).
    pub fn send_no_reply(&self, message: MessageBuf) -> Result<()> {
        let flags = message.flags() & Flags::NO_REPLY_EXPECTED;
        let _ = flags;
        self.commands
            .send(Command::Send {
                message,
                reply: None,
                reply_serial: None,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))
    }

    /// Install `rule` as a match on the bus daemon (coalesced with any other
    /// local subscriber of an identical rule) and return a stream of the
    /// signals it matches.
    pub async fn add_match(&self, rule: MatchRule) -> Result<(MatchToken, SignalStream)> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::AddMatch {
                rule,
                sender,
                reply: reply_tx,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        let token = reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))??;
        Ok((token, SignalStream { receiver }))
    }

    /// Remove a match rule installed with [`MessageBus::add_match`],
    /// dropping the corresponding `RemoveMatch` call to the bus daemon once
    /// no other local subscriber shares the same rule.
    pub async fn remove_match(&self, token: MatchToken) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::RemoveMatch { token, reply: reply_tx })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Export `object` at `path` under `interface`. A path may have several
    /// interfaces exported simultaneously, each added independently.
    pub async fn export(
        &self,
        path: ObjectPathBuf,
        interface: InterfaceName,
        object: Arc<dyn ExportedInterface>,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Export {
                path,
                interface,
                object,
                reply: reply_tx,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Unexport `interface` at `path`, or every interface at `path` if
    /// `interface` is `None`.
    pub async fn unexport(&self, path: ObjectPathBuf, interface: Option<InterfaceName>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Unexport {
                path,
                interface,
                reply: reply_tx,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Call `org.freedesktop.DBus.RequestName`.
    pub async fn request_name(&self, name: BusName, flags: RequestNameFlags) -> Result<RequestNameReply> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::RequestName {
                name,
                flags,
                reply: reply_tx,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Call `org.freedesktop.DBus.ReleaseName`.
    pub async fn release_name(&self, name: BusName) -> Result<ReleaseNameReply> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::ReleaseName { name, reply: reply_tx })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Call `Introspectable.Introspect` on `destination`/`path` and parse
    /// the resulting XML document.
    pub async fn introspect(&self, destination: BusName, path: ObjectPathBuf) -> Result<Node> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Introspect {
                destination,
                path,
                reply: reply_tx,
            })
            .map_err(|_| Error::from(ErrorKind::NotConnected))?;

        reply_rx.await.map_err(|_| Error::from(ErrorKind::NotConnected))?
    }

    /// Disconnect, failing every outstanding pending reply with
    /// [`crate::error::ErrorKind::ConnectionClosed`].
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }
}
