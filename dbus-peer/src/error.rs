use std::io;
use std::str::Utf8Error;

use dbus_peer_core::signature::{SignatureBuf, SignatureError};

use crate::names::NameError;
use crate::object_path::ObjectPathError;

/// Result alias using [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    /// Test if this error indicates the transport would block.
    #[inline]
    pub(crate) fn would_block(&self) -> bool {
        matches!(self.kind, ErrorKind::WouldBlock)
    }

    /// Construct a [`DBusError`] carrying a remote error name and message.
    pub fn dbus(name: impl Into<String>, message: impl Into<String>) -> Error {
        Self::new(ErrorKind::DBus {
            name: name.into(),
            message: message.into(),
        })
    }

    /// If this is a remote `DBusError`, return its error name and message.
    pub fn as_dbus(&self) -> Option<(&str, &str)> {
        match &self.kind {
            ErrorKind::DBus { name, message } => Some((name.as_str(), message.as_str())),
            _ => None,
        }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<NameError> for Error {
    #[inline]
    fn from(error: NameError) -> Self {
        Self::new(ErrorKind::Name(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock => Self::new(ErrorKind::WouldBlock),
            _ => Self::new(ErrorKind::Io(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::Io(..) => write!(f, "I/O error"),
            ErrorKind::Signature(..) => write!(f, "signature error"),
            ErrorKind::ObjectPath(..) => write!(f, "object path error"),
            ErrorKind::Name(..) => write!(f, "name error"),
            ErrorKind::Utf8(..) => write!(f, "UTF-8 error"),
            ErrorKind::WouldBlock => write!(f, "would block"),
            ErrorKind::BufferUnderflow => write!(f, "buffer underflow"),
            ErrorKind::MissingBus => write!(f, "missing bus to connect to"),
            ErrorKind::InvalidAddress(reason) => write!(f, "invalid D-Bus address: {reason}"),
            ErrorKind::Auth(reason) => write!(f, "SASL authentication failed: {reason}"),
            ErrorKind::InvalidProtocol(reason) => write!(f, "invalid message: {reason}"),
            ErrorKind::SignatureMismatch => {
                write!(f, "value tree does not conform to its signature")
            }
            ErrorKind::InvalidIntrospection(reason) => {
                write!(f, "invalid introspection document: {reason}")
            }
            ErrorKind::InterfaceNotFound(name) => write!(f, "interface not found: {name}"),
            ErrorKind::SignalDisabled(name) => write!(f, "signal is not emitted: {name}"),
            ErrorKind::NotConnected => write!(f, "not connected"),
            ErrorKind::ConnectionClosed => write!(f, "connection closed"),
            ErrorKind::Timeout => write!(f, "method call timed out"),
            ErrorKind::UnsupportedVariant(signature) => {
                write!(f, "unsupported variant signature {signature:?}")
            }
            ErrorKind::DBus { name, message } => write!(f, "{name}: {message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::ObjectPath(error) => Some(error),
            ErrorKind::Name(error) => Some(error),
            ErrorKind::Utf8(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Signature(SignatureError),
    ObjectPath(ObjectPathError),
    Name(NameError),
    Utf8(Utf8Error),
    WouldBlock,
    BufferUnderflow,
    MissingBus,
    InvalidAddress(&'static str),
    Auth(&'static str),
    InvalidProtocol(&'static str),
    SignatureMismatch,
    InvalidIntrospection(&'static str),
    InterfaceNotFound(String),
    SignalDisabled(String),
    NotConnected,
    ConnectionClosed,
    Timeout,
    UnsupportedVariant(SignatureBuf),
    /// A remote peer replied with an `ERROR` message.
    DBus { name: String, message: String },
}
