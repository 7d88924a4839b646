use std::os::fd::OwnedFd;

use dbus_peer_core::signature::SignatureBuf;

use crate::error::{Error, ErrorKind, Result};
use crate::names::{BusName, ErrorName, InterfaceName, MemberName};
use crate::object_path::ObjectPath;
use crate::proto::{Flags, MessageType};
use crate::value::Value;

use super::{HeaderField, Serial};

/// An owned D-Bus message: header fields plus a body of [`Value`]s.
///
/// # Examples
///
/// ```
/// use dbus_peer::message::MessageBuf;
/// use dbus_peer::object_path::ObjectPath;
///
/// let path = ObjectPath::new("/org/freedesktop/DBus").unwrap();
/// let m = MessageBuf::method_call(path, "Hello").unwrap();
/// assert_eq!(m.member().unwrap().as_str(), "Hello");
/// ```
///
/// Attached file descriptors (referenced from the body by index via
/// [`Value::Fd`]) are not compared or preserved by [`Clone`] in a way that
/// shares the underlying descriptor: cloning duplicates each fd with
/// `dup(2)`, and equality ignores them entirely, since fd numbers are not
/// meaningful identity.
#[derive(Debug)]
pub struct MessageBuf {
    message_type: MessageType,
    serial: Serial,
    flags: Flags,
    header_fields: Vec<HeaderField>,
    body: Vec<Value>,
    fds: Vec<OwnedFd>,
}

impl PartialEq for MessageBuf {
    fn eq(&self, other: &Self) -> bool {
        self.message_type == other.message_type
            && self.serial == other.serial
            && self.flags == other.flags
            && self.header_fields == other.header_fields
            && self.body == other.body
    }
}

impl Clone for MessageBuf {
    fn clone(&self) -> Self {
        Self {
            message_type: self.message_type,
            serial: self.serial,
            flags: self.flags,
            header_fields: self.header_fields.clone(),
            body: self.body.clone(),
            fds: self
                .fds
                .iter()
                .filter_map(|fd| fd.try_clone().ok())
                .collect(),
        }
    }
}

impl MessageBuf {
    fn empty(message_type: MessageType, serial: Serial) -> Self {
        Self {
            message_type,
            serial,
            flags: Flags::EMPTY,
            header_fields: Vec::new(),
            body: Vec::new(),
            fds: Vec::new(),
        }
    }

    /// Construct a method call with a placeholder serial of `1`; callers
    /// that send a message through [`crate::bus::MessageBus`] get the real
    /// serial assigned for them.
    pub fn method_call(path: &ObjectPath, member: &str) -> Result<Self> {
        let member = MemberName::new(member)?;
        let mut m = Self::empty(MessageType::METHOD_CALL, Serial::from_u32(1).unwrap());
        m.header_fields.push(HeaderField::Path(path.to_owned()));
        m.header_fields.push(HeaderField::Member(member));
        Ok(m)
    }

    /// Construct a signal message.
    pub fn signal(path: &ObjectPath, interface: &str, member: &str) -> Result<Self> {
        let interface = InterfaceName::new(interface)?;
        let member = MemberName::new(member)?;
        let mut m = Self::empty(MessageType::SIGNAL, Serial::from_u32(1).unwrap());
        m.header_fields.push(HeaderField::Path(path.to_owned()));
        m.header_fields.push(HeaderField::Interface(interface));
        m.header_fields.push(HeaderField::Member(member));
        Ok(m)
    }

    /// Construct a method-return reply to `self`.
    pub fn method_return_to(&self) -> Self {
        let mut m = Self::empty(MessageType::METHOD_RETURN, Serial::from_u32(1).unwrap());
        m.header_fields.push(HeaderField::ReplySerial(self.serial));

        if let Some(sender) = self.sender() {
            m.header_fields
                .push(HeaderField::Destination(sender.clone()));
        }

        m
    }

    /// Construct an error reply to `self`.
    pub fn error_to(&self, error_name: &str, message: &str) -> Result<Self> {
        let error_name = ErrorName::new(error_name)?;
        let mut m = Self::empty(MessageType::ERROR, Serial::from_u32(1).unwrap());
        m.header_fields.push(HeaderField::ReplySerial(self.serial));
        m.header_fields.push(HeaderField::ErrorName(error_name));

        if let Some(sender) = self.sender() {
            m.header_fields
                .push(HeaderField::Destination(sender.clone()));
        }

        if !message.is_empty() {
            m.push_body(Value::Str(message.to_owned()));
        }

        Ok(m)
    }

    /// Set the serial. Used by the bus when assigning the next outgoing
    /// serial right before writing to the transport.
    pub(crate) fn set_serial(&mut self, serial: Serial) {
        self.serial = serial;
    }

    /// Builder: set flags.
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder: set the interface header field.
    pub fn with_interface(mut self, interface: &str) -> Result<Self> {
        let interface = InterfaceName::new(interface)?;
        self.remove_field(crate::proto::HeaderFieldCode::INTERFACE);
        self.header_fields.push(HeaderField::Interface(interface));
        Ok(self)
    }

    /// Builder: set the destination header field.
    pub fn with_destination(mut self, destination: &str) -> Result<Self> {
        let destination = BusName::new(destination)?;
        self.remove_field(crate::proto::HeaderFieldCode::DESTINATION);
        self.header_fields
            .push(HeaderField::Destination(destination));
        Ok(self)
    }

    /// Builder: set the sender header field. Normally populated by the bus
    /// daemon on receipt rather than by the application.
    pub fn with_sender(mut self, sender: &str) -> Result<Self> {
        let sender = BusName::new(sender)?;
        self.remove_field(crate::proto::HeaderFieldCode::SENDER);
        self.header_fields.push(HeaderField::Sender(sender));
        Ok(self)
    }

    fn remove_field(&mut self, code: crate::proto::HeaderFieldCode) {
        self.header_fields.retain(|f| f.code() != code);
    }

    /// Append a value to the body.
    pub fn push_body(&mut self, value: Value) {
        self.body.push(value);
    }

    /// Attach a file descriptor, returning the index to embed in the body
    /// as a [`Value::Fd`].
    pub fn push_fd(&mut self, fd: OwnedFd) -> u32 {
        let index = self.fds.len() as u32;
        self.fds.push(fd);
        index
    }

    /// Builder variant of [`MessageBuf::push_fd`]; discards the assigned
    /// index, for callers that already know fds are appended in order.
    #[must_use]
    pub fn with_fd(mut self, fd: OwnedFd) -> Self {
        self.push_fd(fd);
        self
    }

    /// The file descriptors attached to this message, in index order.
    pub fn fds(&self) -> &[OwnedFd] {
        &self.fds
    }

    /// Replace the attached file descriptors wholesale. Used by the
    /// transport layer when assembling a message received with an
    /// `SCM_RIGHTS` ancillary payload.
    pub(crate) fn set_fds(&mut self, fds: Vec<OwnedFd>) {
        self.fds = fds;
    }

    /// Take ownership of the attached file descriptors, leaving this
    /// message with none. Used when hand-delivering an incoming message to
    /// a signal handler or exported method, whose caller now owns them.
    pub fn take_fds(&mut self) -> Vec<OwnedFd> {
        std::mem::take(&mut self.fds)
    }

    /// Builder variant of [`MessageBuf::push_body`].
    #[must_use]
    pub fn with_body(mut self, value: Value) -> Self {
        self.push_body(value);
        self
    }

    /// The message type.
    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The message's serial.
    #[inline]
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// The message's flags.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The message body, in declaration order.
    #[inline]
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// The signature of the message body, computed from its values.
    pub fn signature(&self) -> SignatureBuf {
        let mut buf = SignatureBuf::empty();

        for value in &self.body {
            buf.push_signature(&value.signature());
        }

        buf
    }

    fn field<'a, T>(&'a self, pick: impl Fn(&'a HeaderField) -> Option<T>) -> Option<T> {
        self.header_fields.iter().find_map(pick)
    }

    /// The `PATH` header field.
    pub fn path(&self) -> Option<&ObjectPath> {
        self.field(|f| match f {
            HeaderField::Path(p) => Some(p.as_object_path()),
            _ => None,
        })
    }

    /// The `INTERFACE` header field.
    pub fn interface(&self) -> Option<&InterfaceName> {
        self.field(|f| match f {
            HeaderField::Interface(i) => Some(i),
            _ => None,
        })
    }

    /// The `MEMBER` header field.
    pub fn member(&self) -> Option<&MemberName> {
        self.field(|f| match f {
            HeaderField::Member(m) => Some(m),
            _ => None,
        })
    }

    /// The `ERROR_NAME` header field.
    pub fn error_name(&self) -> Option<&ErrorName> {
        self.field(|f| match f {
            HeaderField::ErrorName(e) => Some(e),
            _ => None,
        })
    }

    /// The `REPLY_SERIAL` header field.
    pub fn reply_serial(&self) -> Option<Serial> {
        self.field(|f| match f {
            HeaderField::ReplySerial(s) => Some(*s),
            _ => None,
        })
    }

    /// The `DESTINATION` header field.
    pub fn destination(&self) -> Option<&BusName> {
        self.field(|f| match f {
            HeaderField::Destination(d) => Some(d),
            _ => None,
        })
    }

    /// The `SENDER` header field.
    pub fn sender(&self) -> Option<&BusName> {
        self.field(|f| match f {
            HeaderField::Sender(s) => Some(s),
            _ => None,
        })
    }

    /// The raw header fields, in wire order.
    pub fn header_fields(&self) -> &[HeaderField] {
        &self.header_fields
    }

    pub(crate) fn push_header_field(&mut self, field: HeaderField) {
        self.header_fields.push(field);
    }

    pub(crate) fn from_parts(
        message_type: MessageType,
        serial: Serial,
        flags: Flags,
        header_fields: Vec<HeaderField>,
        body: Vec<Value>,
    ) -> Self {
        Self {
            message_type,
            serial,
            flags,
            header_fields,
            body,
            fds: Vec::new(),
        }
    }

    /// Validate the required-field invariants from the D-Bus specification
    /// for this message's type: `REPLY_SERIAL` on `METHOD_RETURN`/`ERROR`,
    /// `MEMBER` on `METHOD_CALL`/`SIGNAL`, `ERROR_NAME` on `ERROR`, and
    /// `PATH`+`INTERFACE` on `SIGNAL`.
    pub(crate) fn validate_required_fields(&self) -> Result<()> {
        match self.message_type {
            MessageType::METHOD_CALL => {
                if self.member().is_none() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "METHOD_CALL missing MEMBER header field",
                    )));
                }
            }
            MessageType::METHOD_RETURN => {
                if self.reply_serial().is_none() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "METHOD_RETURN missing REPLY_SERIAL header field",
                    )));
                }
            }
            MessageType::ERROR => {
                if self.reply_serial().is_none() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "ERROR missing REPLY_SERIAL header field",
                    )));
                }

                if self.error_name().is_none() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "ERROR missing ERROR_NAME header field",
                    )));
                }
            }
            MessageType::SIGNAL => {
                if self.path().is_none() || self.interface().is_none() || self.member().is_none() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "SIGNAL missing PATH, INTERFACE or MEMBER header field",
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }
}
