//! The single background task that owns the transport and every
//! correlation table: pending replies, match rules, and exported objects.
//!
//! A second task (spawned alongside it) only ever reads: it pulls complete
//! frames off the wire and forwards them down an internal channel. Keeping
//! the reader and the dispatcher separate lets a `Command::Send` go out
//! immediately even while the dispatcher is waiting on the next frame to
//! arrive, since [`crate::transport::Transport`]'s read and write halves
//! are both `&self`-based.

use std::collections::HashMap;
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::Arc;

use dbus_peer_core::proto::Endianness;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, ErrorKind, Result};
use crate::introspect::{self, Node};
use crate::message::{
    decode_message, encode_message, read_header_fields_length, read_header_prefix, HeaderPrefix,
    MessageBuf, Serial, SerialAllocator, FIXED_HEADER_LEN,
};
use crate::names::InterfaceName;
use crate::object_path::{ObjectPath, ObjectPathBuf};
use crate::proto::{Flags, MessageType};
use crate::transport::Transport;
use crate::value::Value;

use super::command::Command;
use super::export::ExportedInterface;
use super::match_rule::{MatchRule, MatchToken};
use super::{ReleaseNameReply, RequestNameFlags, RequestNameReply};

/// An incoming frame can't be decoded further than a transport-level
/// failure; a single fd cap per message keeps a misbehaving peer from
/// exhausting our fd table.
const MAX_FDS_PER_MESSAGE: usize = 64;

const DBUS_INTERFACE: &str = "org.freedesktop.DBus";
const DBUS_PATH: &str = "/org/freedesktop/DBus";
const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// A complete outgoing frame queued for the single writer task, which drains
/// this channel strictly in submission order. Serializing every transport
/// write through one task is what keeps two concurrent sends (an ordinary
/// `send_internal` call racing a spawned `call_bus_daemon` task) from
/// interleaving their bytes mid-`sendmsg`, and keeps the wire order matching
/// the order `send`/the internal bus calls were issued in (spec §5).
struct WriteJob {
    bytes: Vec<u8>,
    fds: Vec<OwnedFd>,
    reply: oneshot::Sender<Result<()>>,
}

pub(super) struct DispatchState {
    transport: Arc<Transport>,
    self_sender: mpsc::UnboundedSender<Command>,
    writer: mpsc::UnboundedSender<WriteJob>,
    serials: SerialAllocator,
    pending: HashMap<Serial, oneshot::Sender<Result<MessageBuf>>>,
    dropped_replies: u64,
    matches: HashMap<MatchToken, (MatchRule, mpsc::UnboundedSender<MessageBuf>)>,
    rule_refs: HashMap<String, u32>,
    next_token: u64,
    exports: HashMap<ObjectPathBuf, HashMap<InterfaceName, Arc<dyn ExportedInterface>>>,
}

impl DispatchState {
    fn new(
        transport: Arc<Transport>,
        self_sender: mpsc::UnboundedSender<Command>,
        writer: mpsc::UnboundedSender<WriteJob>,
    ) -> Self {
        Self {
            transport,
            self_sender,
            writer,
            serials: SerialAllocator::new(),
            pending: HashMap::new(),
            dropped_replies: 0,
            matches: HashMap::new(),
            rule_refs: HashMap::new(),
            next_token: 1,
            exports: HashMap::new(),
        }
    }

    /// Hand a fully encoded frame to the writer task and return a receiver
    /// for its eventual write outcome. Enqueuing is synchronous (an unbounded
    /// channel send never awaits), so the relative order of writes across
    /// concurrent callers is exactly the order this is called in.
    fn enqueue_write(&self, bytes: Vec<u8>, fds: Vec<OwnedFd>) -> Result<oneshot::Receiver<Result<()>>> {
        let (reply, ack) = oneshot::channel();
        self.writer
            .send(WriteJob { bytes, fds, reply })
            .map(|()| ack)
            .map_err(|_| Error::from(ErrorKind::ConnectionClosed))
    }
}

/// Drain `jobs` strictly in order, writing each frame to completion before
/// starting the next one.
async fn run_writer(transport: Arc<Transport>, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(WriteJob { bytes, fds, reply }) = jobs.recv().await {
        let raw_fds: Vec<_> = fds.iter().map(OwnedFd::as_raw_fd).collect();
        let result = transport.send_with_fds(&bytes, &raw_fds).await.map(|_| ());
        let _ = reply.send(result);
    }
}

/// Spawn the writer task, the reader task, and run the dispatch loop to
/// completion. Returns once the connection is closed or every
/// [`super::MessageBus`] handle (and therefore every `Command` sender) has
/// been dropped.
pub(super) async fn run(
    transport: Arc<Transport>,
    self_sender: mpsc::UnboundedSender<Command>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let (writer_tx, writer_rx) = mpsc::unbounded_channel();
    let writer_transport = Arc::clone(&transport);
    tokio::spawn(run_writer(writer_transport, writer_rx));

    let mut state = DispatchState::new(Arc::clone(&transport), self_sender, writer_tx);

    let (frames_tx, mut frames) = mpsc::unbounded_channel();
    let reader_transport = Arc::clone(&state.transport);
    tokio::spawn(async move {
        loop {
            let outcome = read_one_message(&reader_transport).await;
            let closed = outcome.is_err();
            if frames_tx.send(outcome).is_err() || closed {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(Ok(message)) => state.route_incoming(message).await,
                    Some(Err(error)) => {
                        state.fail_everything(error);
                        break;
                    }
                    None => break,
                }
            }
            command = commands.recv() => {
                match command {
                    Some(Command::Disconnect) | None => {
                        state.fail_everything(Error::from(ErrorKind::ConnectionClosed));
                        break;
                    }
                    Some(command) => state.handle_command(command).await,
                }
            }
        }
    }
}

impl DispatchState {
    fn fail_everything(&mut self, error: Error) {
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(clone_error(&error)));
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send {
                message,
                reply,
                reply_serial,
            } => {
                let serial = self.send_internal(message, reply).await;
                if let Some(reply_serial) = reply_serial {
                    let _ = reply_serial.send(serial);
                }
            }
            Command::CancelReply { serial } => {
                self.pending.remove(&serial);
            }
            Command::AddMatch { rule, sender, reply } => {
                self.add_match(rule, sender, reply).await;
            }
            Command::RemoveMatch { token, reply } => {
                self.remove_match(token, reply).await;
            }
            Command::Export {
                path,
                interface,
                object,
                reply,
            } => {
                self.exports.entry(path).or_default().insert(interface, object);
                let _ = reply.send(Ok(()));
            }
            Command::Unexport {
                path,
                interface,
                reply,
            } => {
                match interface {
                    Some(interface) => {
                        if let Some(interfaces) = self.exports.get_mut(&path) {
                            interfaces.remove(&interface);
                            if interfaces.is_empty() {
                                self.exports.remove(&path);
                            }
                        }
                    }
                    None => {
                        self.exports.remove(&path);
                    }
                }
                let _ = reply.send(Ok(()));
            }
            Command::RequestName { name, flags, reply } => {
                self.request_name(name, flags, reply).await;
            }
            Command::ReleaseName { name, reply } => {
                self.release_name(name, reply).await;
            }
            Command::Introspect {
                destination,
                path,
                reply,
            } => {
                self.introspect(destination, path, reply).await;
            }
            Command::Disconnect => unreachable!("handled by the caller before dispatch"),
        }
    }

    /// Serialize, assign a serial, write to the transport, and register
    /// `reply` (if given) as the pending entry fulfilled when a matching
    /// `METHOD_RETURN`/`ERROR` comes back. Writing is a normal I/O wait, not
    /// a correlation wait, so this never risks the reentrancy deadlock that
    /// awaiting our own reply inline would. On a write failure `reply` is
    /// failed immediately instead of being registered.
    async fn send_internal(
        &mut self,
        mut message: MessageBuf,
        reply: Option<oneshot::Sender<Result<MessageBuf>>>,
    ) -> Serial {
        let serial = self.serials.next_serial();
        message.set_serial(serial);

        let write_result = match encode_message(&message, Endianness::NATIVE) {
            Ok(bytes) => {
                let fds = message.take_fds();
                match self.enqueue_write(bytes, fds) {
                    Ok(ack) => match ack.await {
                        Ok(result) => result,
                        Err(_) => Err(Error::from(ErrorKind::ConnectionClosed)),
                    },
                    Err(error) => Err(error),
                }
            }
            Err(error) => Err(error),
        };

        match (write_result, reply) {
            (Ok(()), Some(reply)) => {
                self.pending.insert(serial, reply);
            }
            (Err(error), Some(reply)) => {
                let _ = reply.send(Err(error));
            }
            _ => {}
        }

        serial
    }

    /// Send a call to `org.freedesktop.DBus` on the well-known bus path and
    /// forward its eventual reply to `reply`, decoded by `decode`. The frame
    /// is encoded and handed to the single writer task synchronously, right
    /// here in the dispatch loop, so its place in the write order matches
    /// exactly where this call happens among other `Command`s; only the
    /// wait for the write to finish and for the daemon's reply to arrive
    /// runs in a spawned task, so the dispatch loop is never blocked on a
    /// round trip it is itself responsible for completing.
    fn call_bus_daemon<T: Send + 'static>(
        &mut self,
        message: MessageBuf,
        reply: oneshot::Sender<Result<T>>,
        decode: impl FnOnce(MessageBuf) -> Result<T> + Send + 'static,
    ) {
        let serial = self.serials.next_serial();
        let mut message = message;
        message.set_serial(serial);

        let bytes = match encode_message(&message, Endianness::NATIVE) {
            Ok(bytes) => bytes,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        let ack = match self.enqueue_write(bytes, Vec::new()) {
            Ok(ack) => ack,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        self.pending.insert(serial, tx);

        tokio::spawn(async move {
            let write_result = match ack.await {
                Ok(result) => result,
                Err(_) => Err(Error::from(ErrorKind::ConnectionClosed)),
            };

            if let Err(error) = write_result {
                let _ = reply.send(Err(error));
                return;
            }

            let result = match rx.await {
                Ok(result) => result,
                Err(_) => Err(Error::from(ErrorKind::ConnectionClosed)),
            };

            let _ = reply.send(result.and_then(decode));
        });
    }

    async fn add_match(
        &mut self,
        rule: MatchRule,
        sender: mpsc::UnboundedSender<MessageBuf>,
        reply: oneshot::Sender<Result<MatchToken>>,
    ) {
        let token = MatchToken(self.next_token);
        self.next_token += 1;

        let rule_string = rule.to_rule_string();
        let count = self.rule_refs.entry(rule_string.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            if let Ok(message) = bus_method_call("AddMatch", vec![Value::Str(rule_string)]) {
                let (tx, _rx) = oneshot::channel();
                self.call_bus_daemon(message, tx, |_| Ok(()));
            }
        }

        self.matches.insert(token, (rule, sender));
        let _ = reply.send(Ok(token));
    }

    async fn remove_match(&mut self, token: MatchToken, reply: oneshot::Sender<Result<()>>) {
        let Some((rule, _)) = self.matches.remove(&token) else {
            let _ = reply.send(Ok(()));
            return;
        };

        let rule_string = rule.to_rule_string();

        if let Some(count) = self.rule_refs.get_mut(&rule_string) {
            *count -= 1;

            if *count == 0 {
                self.rule_refs.remove(&rule_string);

                if let Ok(message) = bus_method_call("RemoveMatch", vec![Value::Str(rule_string)]) {
                    let (tx, _rx) = oneshot::channel();
                    self.call_bus_daemon(message, tx, |_| Ok(()));
                }
            }
        }

        let _ = reply.send(Ok(()));
    }

    async fn request_name(
        &mut self,
        name: crate::names::BusName,
        flags: RequestNameFlags,
        reply: oneshot::Sender<Result<RequestNameReply>>,
    ) {
        let message = match bus_method_call(
            "RequestName",
            vec![Value::Str(name.as_str().to_owned()), Value::U32(flags.0)],
        ) {
            Ok(message) => message,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        self.call_bus_daemon(message, reply, |reply_message| {
            let code = match reply_message.body().first() {
                Some(Value::U32(code)) => *code,
                _ => return Err(Error::from(ErrorKind::InvalidProtocol("RequestName reply missing u32"))),
            };
            RequestNameReply::from_u32(code)
        });
    }

    async fn release_name(&mut self, name: crate::names::BusName, reply: oneshot::Sender<Result<ReleaseNameReply>>) {
        let message = match bus_method_call("ReleaseName", vec![Value::Str(name.as_str().to_owned())]) {
            Ok(message) => message,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        self.call_bus_daemon(message, reply, |reply_message| {
            let code = match reply_message.body().first() {
                Some(Value::U32(code)) => *code,
                _ => return Err(Error::from(ErrorKind::InvalidProtocol("ReleaseName reply missing u32"))),
            };
            ReleaseNameReply::from_u32(code)
        });
    }

    async fn introspect(
        &mut self,
        destination: crate::names::BusName,
        path: ObjectPathBuf,
        reply: oneshot::Sender<Result<Node>>,
    ) {
        let message = match MessageBuf::method_call(path.as_object_path(), "Introspect") {
            Ok(message) => message
                .with_interface(INTROSPECTABLE_INTERFACE)
                .and_then(|m| m.with_destination(destination.as_str())),
            Err(error) => Err(error),
        };

        let message = match message {
            Ok(message) => message,
            Err(error) => {
                let _ = reply.send(Err(error));
                return;
            }
        };

        self.call_bus_daemon(message, reply, |reply_message| {
            let xml = match reply_message.body().first() {
                Some(Value::Str(xml)) => xml.clone(),
                _ => return Err(Error::from(ErrorKind::InvalidProtocol("Introspect reply missing string"))),
            };
            introspect::parse_node(&xml)
        });
    }

    async fn route_incoming(&mut self, message: MessageBuf) {
        match message.message_type() {
            MessageType::METHOD_RETURN | MessageType::ERROR => self.route_reply(message),
            MessageType::SIGNAL => self.route_signal(&message),
            MessageType::METHOD_CALL => self.handle_method_call(message).await,
            _ => {}
        }
    }

    fn route_reply(&mut self, message: MessageBuf) {
        let Some(reply_serial) = message.reply_serial() else {
            return;
        };

        let Some(tx) = self.pending.remove(&reply_serial) else {
            self.dropped_replies += 1;
            return;
        };

        let result = if message.message_type() == MessageType::ERROR {
            let name = message
                .error_name()
                .map(|n| n.as_str().to_owned())
                .unwrap_or_else(|| "org.freedesktop.DBus.Error.Failed".to_owned());
            let text = match message.body().first() {
                Some(Value::Str(text)) => text.clone(),
                _ => String::new(),
            };
            Err(Error::dbus(name, text))
        } else {
            Ok(message)
        };

        let _ = tx.send(result);
    }

    fn route_signal(&mut self, message: &MessageBuf) {
        self.matches.retain(|_, (rule, sender)| {
            if rule.matches(message) {
                sender.send(message.clone()).is_ok()
            } else {
                !sender.is_closed()
            }
        });
    }

    async fn handle_method_call(&mut self, message: MessageBuf) {
        let Some(path) = message.path().map(ToOwned::to_owned) else {
            return;
        };
        let Some(member) = message.member().map(|m| m.as_str().to_owned()) else {
            return;
        };
        let interface = message.interface().map(|i| i.as_str().to_owned());

        if interface.as_deref() == Some(INTROSPECTABLE_INTERFACE) && member == "Introspect" {
            let node = self.synthesize_introspection(path.as_object_path());
            let xml = introspect::write_node(&node);
            self.reply_method_return(&message, vec![Value::Str(xml)]).await;
            return;
        }

        if interface.as_deref() == Some(PROPERTIES_INTERFACE) {
            self.handle_properties_call(&message, &path, &member).await;
            return;
        }

        let Some(interfaces) = self.exports.get(&path) else {
            self.reply_error(
                &message,
                "org.freedesktop.DBus.Error.UnknownObject",
                &format!("Unknown object {path}"),
            )
            .await;
            return;
        };

        let object = match &interface {
            Some(name) => interfaces.get(name.as_str()),
            None => interfaces.values().find(|object| object.schema().method(&member).is_some()),
        };

        let Some(object) = object else {
            let (name, text) = if interface.is_some() {
                ("org.freedesktop.DBus.Error.UnknownInterface", "no such interface at this object")
            } else {
                ("org.freedesktop.DBus.Error.UnknownMethod", "no interface at this object implements this method")
            };
            self.reply_error(&message, name, text).await;
            return;
        };

        if object.schema().method(&member).is_none() {
            self.reply_error(
                &message,
                "org.freedesktop.DBus.Error.UnknownMethod",
                &format!("no such method {member}"),
            )
            .await;
            return;
        }

        let object = Arc::clone(object);
        let no_reply = message.flags() & Flags::NO_REPLY_EXPECTED;
        let args = message.body().to_vec();
        let commands = self.self_sender.clone();
        let original = message.clone();

        // Run the handler on its own task: it may call back into the bus
        // (e.g. to emit a signal), which only ever enqueues a `Command` and
        // never waits on this very dispatch loop to process it.
        tokio::spawn(async move {
            let result = object.call(&member, args).await;

            if no_reply {
                return;
            }

            let reply_message = match result {
                Ok(values) => {
                    let mut reply = original.method_return_to();
                    for value in values {
                        reply.push_body(value);
                    }
                    reply
                }
                Err(error) => match error.as_dbus() {
                    Some((name, text)) => make_error_reply(&original, name, text),
                    None => make_error_reply(&original, "org.freedesktop.DBus.Error.Failed", &error.to_string()),
                },
            };

            let _ = commands.send(Command::Send {
                message: reply_message,
                reply: None,
                reply_serial: None,
            });
        });
    }

    async fn handle_properties_call(&mut self, message: &MessageBuf, path: &ObjectPath, member: &str) {
        let Some(interfaces) = self.exports.get(path) else {
            self.reply_error(message, "org.freedesktop.DBus.Error.UnknownObject", "no such object").await;
            return;
        };

        match member {
            "Get" => {
                let (Some(Value::Str(iface)), Some(Value::Str(name))) =
                    (message.body().first(), message.body().get(1))
                else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.InvalidArgs", "Get expects (ss)").await;
                    return;
                };

                let Some(object) = interfaces.get(iface.as_str()) else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.UnknownInterface", iface).await;
                    return;
                };

                match object.get_property(name).await {
                    Ok(value) => {
                        let signature = value.signature();
                        self.reply_method_return(message, vec![Value::Variant(signature, Box::new(value))]).await;
                    }
                    Err(error) => self.reply_dbus_error(message, &error).await,
                }
            }
            "Set" => {
                let (Some(Value::Str(iface)), Some(Value::Str(name)), Some(Value::Variant(_, value))) =
                    (message.body().first(), message.body().get(1), message.body().get(2))
                else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.InvalidArgs", "Set expects (ssv)").await;
                    return;
                };

                let Some(object) = interfaces.get(iface.as_str()) else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.UnknownInterface", iface).await;
                    return;
                };

                match object.set_property(name, (**value).clone()).await {
                    Ok(()) => self.reply_method_return(message, Vec::new()).await,
                    Err(error) => self.reply_dbus_error(message, &error).await,
                }
            }
            "GetAll" => {
                let Some(Value::Str(iface)) = message.body().first() else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.InvalidArgs", "GetAll expects (s)").await;
                    return;
                };

                let Some(object) = interfaces.get(iface.as_str()) else {
                    self.reply_error(message, "org.freedesktop.DBus.Error.UnknownInterface", iface).await;
                    return;
                };

                let mut entries = Vec::new();
                for property in object.schema().properties() {
                    if !property.access().readable() {
                        continue;
                    }
                    if let Ok(value) = object.get_property(property.name()).await {
                        let signature = value.signature();
                        entries.push(Value::DictEntry(
                            Box::new(Value::Str(property.name().to_owned())),
                            Box::new(Value::Variant(signature, Box::new(value))),
                        ));
                    }
                }

                let dict_sig = dbus_peer_core::signature::SignatureBuf::new("{sv}".to_owned()).unwrap_or_else(|_| {
                    dbus_peer_core::signature::SignatureBuf::empty()
                });
                self.reply_method_return(message, vec![Value::Array(dict_sig, entries)]).await;
            }
            _ => {
                self.reply_error(message, "org.freedesktop.DBus.Error.UnknownMethod", member).await;
            }
        }
    }

    fn synthesize_introspection(&self, path: &ObjectPath) -> Node {
        let mut node = Node::new();

        if let Some(interfaces) = self.exports.get(path) {
            for object in interfaces.values() {
                node = node.with_interface(object.schema().clone());
            }
        }

        let prefix = if path.as_str() == "/" {
            "/".to_owned()
        } else {
            format!("{}/", path.as_str())
        };

        let mut children: Vec<String> = Vec::new();
        for other in self.exports.keys() {
            let other_str = other.as_str();
            if other_str.len() <= prefix.len() || !other_str.starts_with(&prefix) {
                continue;
            }
            let rest = &other_str[prefix.len()..];
            let child = rest.split('/').next().unwrap_or(rest).to_owned();
            if !child.is_empty() && !children.contains(&child) {
                children.push(child);
            }
        }
        children.sort();

        for child in children {
            node = node.with_child(child);
        }

        node
    }

    async fn reply_method_return(&mut self, original: &MessageBuf, values: Vec<Value>) {
        if original.flags() & Flags::NO_REPLY_EXPECTED {
            return;
        }

        let mut reply = original.method_return_to();
        for value in values {
            reply.push_body(value);
        }

        let _ = self.send_internal(reply, None).await;
    }

    async fn reply_error(&mut self, original: &MessageBuf, name: &str, text: &str) {
        if original.flags() & Flags::NO_REPLY_EXPECTED {
            return;
        }

        let reply = make_error_reply(original, name, text);
        let _ = self.send_internal(reply, None).await;
    }

    async fn reply_dbus_error(&mut self, original: &MessageBuf, error: &Error) {
        match error.as_dbus() {
            Some((name, text)) => self.reply_error(original, name, text).await,
            None => self.reply_error(original, "org.freedesktop.DBus.Error.Failed", &error.to_string()).await,
        }
    }
}

fn make_error_reply(original: &MessageBuf, name: &str, text: &str) -> MessageBuf {
    original.error_to(name, text).unwrap_or_else(|_| {
        original
            .error_to("org.freedesktop.DBus.Error.Failed", text)
            .unwrap_or_else(|_| original.method_return_to())
    })
}

fn bus_method_call(member: &str, args: Vec<Value>) -> Result<MessageBuf> {
    let path = ObjectPath::new_const(DBUS_PATH);
    let mut message = MessageBuf::method_call(path, member)?
        .with_interface(DBUS_INTERFACE)?
        .with_destination(DBUS_INTERFACE)?;
    for arg in args {
        message.push_body(arg);
    }
    Ok(message)
}

fn clone_error(error: &Error) -> Error {
    match error.as_dbus() {
        Some((name, message)) => Error::dbus(name.to_owned(), message.to_owned()),
        None => Error::from(ErrorKind::ConnectionClosed),
    }
}

async fn read_one_message(transport: &Transport) -> Result<MessageBuf> {
    let mut fds = Vec::new();

    let prefix_bytes = read_exact(transport, FIXED_HEADER_LEN, &mut fds).await?;
    let mut prefix_array = [0u8; FIXED_HEADER_LEN];
    prefix_array.copy_from_slice(&prefix_bytes);

    let prefix: HeaderPrefix = read_header_prefix(&prefix_array)?;

    let mut fields_len_bytes = [0u8; 4];
    fields_len_bytes.copy_from_slice(&prefix_array[12..16]);
    let fields_len = read_header_fields_length(&fields_len_bytes, prefix.endianness) as usize;

    let header_fields = read_exact(transport, fields_len, &mut fds).await?;

    let unpadded = FIXED_HEADER_LEN + fields_len;
    let padding = align8(unpadded) - unpadded;
    if padding > 0 {
        read_exact(transport, padding, &mut fds).await?;
    }

    let body = read_exact(transport, prefix.body_length as usize, &mut fds).await?;

    let mut message = decode_message(prefix, &header_fields, &body)?;
    message.set_fds(fds);
    Ok(message)
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}

async fn read_exact(transport: &Transport, n: usize, fds: &mut Vec<OwnedFd>) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;

    while filled < n {
        let (read, mut new_fds) = transport.recv_with_fds(&mut buf[filled..], MAX_FDS_PER_MESSAGE).await?;

        if read == 0 {
            return Err(Error::from(ErrorKind::ConnectionClosed));
        }

        fds.append(&mut new_fds);
        filled += read;
    }

    Ok(buf)
}
