//! A typed, introspection-backed handle to a remote object.
//!
//! The teacher deliberately stays low-level ("sufficient to write efficient
//! servers... without some of the flair associated with other clients like
//! proxies generated from xml"). This module is the flair: it wraps
//! [`MessageBus`] and [`crate::introspect::Node`] in a builder/accessor API
//! so a caller doesn't hand-assemble a `METHOD_CALL` for every remote call.

use crate::bus::{MatchRule, MatchToken, MessageBus, SignalStream};
use crate::error::{Error, ErrorKind, Result};
use crate::introspect::{Direction, Interface, Node};
use crate::message::MessageBuf;
use crate::names::{BusName, InterfaceName, MemberName};
use crate::object_path::ObjectPathBuf;
use crate::proto::Flags;
use crate::value::Value;

#[cfg(test)]
mod tests;

const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// A proxy for a single interface of a single remote object.
///
/// Cheap to clone: it only holds a cloned [`MessageBus`] handle (itself
/// cheap, see [`MessageBus`]) and the destination/path/interface triple.
#[derive(Clone)]
pub struct Proxy {
    bus: MessageBus,
    destination: BusName,
    path: ObjectPathBuf,
    interface: InterfaceName,
    schema: Option<Interface>,
}

impl Proxy {
    /// Build a proxy with no cached introspection schema. Calls are sent
    /// without argument-count validation until [`Proxy::introspect`] (or
    /// [`Proxy::with_schema`]) populates one.
    pub fn new(bus: MessageBus, destination: BusName, path: ObjectPathBuf, interface: InterfaceName) -> Self {
        Self {
            bus,
            destination,
            path,
            interface,
            schema: None,
        }
    }

    /// Attach a schema obtained elsewhere (e.g. from a [`Node`] fetched once
    /// and shared across several proxies), enabling call validation without
    /// a network round trip.
    #[must_use]
    pub fn with_schema(mut self, schema: Interface) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The object path this proxy addresses.
    pub fn path(&self) -> &ObjectPathBuf {
        &self.path
    }

    /// The interface this proxy addresses.
    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    /// Call `Introspectable.Introspect` on the destination, cache this
    /// proxy's own interface's schema if present in the response, and
    /// return the full node.
    pub async fn introspect(&mut self) -> Result<Node> {
        let node = self
            .bus
            .introspect(self.destination.clone(), self.path.clone())
            .await?;
        self.schema = node.interface(self.interface.as_str()).cloned();
        Ok(node)
    }

    /// Call a method on the remote interface, awaiting its `METHOD_RETURN`
    /// body (or converting an `ERROR` reply into an `Err`).
    ///
    /// If a schema is attached (see [`Proxy::with_schema`]), validates the
    /// argument count against the method's declared `in` arguments before
    /// sending; a mismatch is rejected locally rather than round-tripped.
    pub async fn call(&self, member: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        if let Some(schema) = &self.schema {
            if let Some(method) = schema.method(member) {
                let expected = method.args().iter().filter(|a| a.direction() == Direction::In).count();
                if expected != args.len() {
                    return Err(Error::from(ErrorKind::InvalidProtocol(
                        "argument count does not match the interface's declared method signature",
                    )));
                }
            }
        }

        let mut message = MessageBuf::method_call(&self.path, member)?
            .with_interface(self.interface.as_str())?
            .with_destination(self.destination.as_str())?;
        for arg in args {
            message.push_body(arg);
        }

        let reply = self.bus.send(message).await?.await?;
        Ok(reply.body().to_vec())
    }

    /// Call a method without waiting for (or requesting) a reply.
    pub fn call_no_reply(&self, member: &str, args: Vec<Value>) -> Result<()> {
        let mut message = MessageBuf::method_call(&self.path, member)?
            .with_interface(self.interface.as_str())?
            .with_destination(self.destination.as_str())?
            .with_flags(Flags::NO_REPLY_EXPECTED);
        for arg in args {
            message.push_body(arg);
        }
        self.bus.send_no_reply(message)
    }

    /// Subscribe to `member` on this proxy's interface: installs a match
    /// rule scoped to `(sender=destination, path, interface, member)` and
    /// returns the stream of matching signals. Dropping the stream (or
    /// passing its [`MatchToken`] to [`Proxy::unsubscribe`]) releases the
    /// rule once no other local subscriber shares it.
    pub async fn subscribe(&self, member: &str) -> Result<(MatchToken, SignalStream)> {
        let member = MemberName::new(member.to_owned())?;
        let rule = MatchRule::new()
            .with_sender(self.destination.clone())
            .with_path(self.path.clone())
            .with_interface(self.interface.clone())
            .with_member(member);
        self.bus.add_match(rule).await
    }

    /// Undo a previous [`Proxy::subscribe`].
    pub async fn unsubscribe(&self, token: MatchToken) -> Result<()> {
        self.bus.remove_match(token).await
    }

    /// `org.freedesktop.DBus.Properties.Get` for this proxy's interface.
    pub async fn get_property(&self, name: &str) -> Result<Value> {
        let mut message = MessageBuf::method_call(&self.path, "Get")?
            .with_interface(PROPERTIES_INTERFACE)?
            .with_destination(self.destination.as_str())?;
        message.push_body(Value::Str(self.interface.as_str().to_owned()));
        message.push_body(Value::Str(name.to_owned()));

        let reply = self.bus.send(message).await?.await?;
        match reply.body().first() {
            Some(Value::Variant(_, inner)) => Ok((**inner).clone()),
            Some(other) => Ok(other.clone()),
            None => Err(Error::from(ErrorKind::InvalidProtocol("Properties.Get reply had no body"))),
        }
    }

    /// `org.freedesktop.DBus.Properties.Set` for this proxy's interface.
    pub async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let signature = value.signature();
        let mut message = MessageBuf::method_call(&self.path, "Set")?
            .with_interface(PROPERTIES_INTERFACE)?
            .with_destination(self.destination.as_str())?;
        message.push_body(Value::Str(self.interface.as_str().to_owned()));
        message.push_body(Value::Str(name.to_owned()));
        message.push_body(Value::Variant(signature, Box::new(value)));

        self.bus.send(message).await?.await?;
        Ok(())
    }

    /// `org.freedesktop.DBus.Properties.GetAll` for this proxy's interface.
    pub async fn get_all_properties(&self) -> Result<Vec<(String, Value)>> {
        let mut message = MessageBuf::method_call(&self.path, "GetAll")?
            .with_interface(PROPERTIES_INTERFACE)?
            .with_destination(self.destination.as_str())?;
        message.push_body(Value::Str(self.interface.as_str().to_owned()));

        let reply = self.bus.send(message).await?.await?;
        match reply.body().first() {
            Some(Value::Array(_, entries)) => entries
                .iter()
                .map(|entry| match entry {
                    Value::DictEntry(key, value) => {
                        let name = match key.as_ref() {
                            Value::Str(name) => name.clone(),
                            _ => return Err(Error::from(ErrorKind::InvalidProtocol("GetAll dict key was not a string"))),
                        };
                        let value = match value.as_ref() {
                            Value::Variant(_, inner) => (**inner).clone(),
                            other => other.clone(),
                        };
                        Ok((name, value))
                    }
                    _ => Err(Error::from(ErrorKind::InvalidProtocol("GetAll array entry was not a dict entry"))),
                })
                .collect(),
            None => Ok(Vec::new()),
            Some(_) => Err(Error::from(ErrorKind::InvalidProtocol("GetAll reply body was not an array"))),
        }
    }
}
