use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dbus_peer_core::signature::SignatureBuf;
use tokio::net::UnixStream;

use crate::error::{Error, ErrorKind, Result};
use crate::introspect::{Argument, Direction, Interface, Method};
use crate::message::{decode_message, read_header_fields_length, read_header_prefix, HeaderPrefix, FIXED_HEADER_LEN};
use crate::names::{InterfaceName, MemberName};
use crate::object_path::{ObjectPath, ObjectPathBuf};
use crate::proto::MessageType;
use crate::transport::Transport;
use crate::value::Value;

use super::export::ExportedInterface;
use super::match_rule::MatchRule;
use super::MessageBus;

fn string_signature() -> SignatureBuf {
    SignatureBuf::new("s".to_owned()).unwrap()
}

fn pair() -> (MessageBus, MessageBus) {
    let (a, b) = UnixStream::pair().expect("unix socket pair");
    (
        MessageBus::for_test(Transport::from_unix_stream(a)),
        MessageBus::for_test(Transport::from_unix_stream(b)),
    )
}

struct Echo;

impl ExportedInterface for Echo {
    fn schema(&self) -> &Interface {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Interface> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Interface::new(InterfaceName::new("com.example.Echo").unwrap()).with_method(
                Method::new(MemberName::new("Echo").unwrap())
                    .with_arg(Argument::new(Some("input"), string_signature(), Direction::In))
                    .with_arg(Argument::new(Some("output"), string_signature(), Direction::Out)),
            )
        })
    }

    fn call<'a>(
        &'a self,
        member: &'a str,
        mut args: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>>> + Send + 'a>> {
        Box::pin(async move {
            assert_eq!(member, "Echo");
            let Some(Value::Str(text)) = args.pop() else {
                return Err(Error::from(ErrorKind::SignatureMismatch));
            };
            Ok(vec![Value::Str(text)])
        })
    }
}

struct Boom;

impl ExportedInterface for Boom {
    fn schema(&self) -> &Interface {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Interface> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Interface::new(InterfaceName::new("com.example.Boom").unwrap())
                .with_method(Method::new(MemberName::new("Detonate").unwrap()))
        })
    }

    fn call<'a>(
        &'a self,
        _member: &'a str,
        _args: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>>> + Send + 'a>> {
        Box::pin(async move { Err(Error::dbus("com.example.Boom", "nope")) })
    }
}

#[tokio::test]
async fn echo_round_trip() {
    let (server, client) = pair();

    server
        .export(ObjectPathBuf::new("/echo").unwrap(), InterfaceName::new("com.example.Echo").unwrap(), Arc::new(Echo))
        .await
        .unwrap();

    for input in ["", "hello", "\u{3bb}\u{2192}\u{3c0}"] {
        let call = crate::message::MessageBuf::method_call(ObjectPath::new("/echo").unwrap(), "Echo")
            .unwrap()
            .with_interface("com.example.Echo")
            .unwrap()
            .with_body(Value::Str(input.to_owned()));

        let reply = client.send(call).await.unwrap().await.unwrap();
        assert_eq!(reply.message_type(), MessageType::METHOD_RETURN);
        assert_eq!(reply.body(), &[Value::Str(input.to_owned())]);
    }
}

#[tokio::test]
async fn error_reply_propagates_dbus_error() {
    let (server, client) = pair();

    server
        .export(ObjectPathBuf::new("/boom").unwrap(), InterfaceName::new("com.example.Boom").unwrap(), Arc::new(Boom))
        .await
        .unwrap();

    let call = crate::message::MessageBuf::method_call(ObjectPath::new("/boom").unwrap(), "Detonate")
        .unwrap()
        .with_interface("com.example.Boom")
        .unwrap();

    let error = client.send(call).await.unwrap().await.unwrap_err();
    let (name, message) = error.as_dbus().expect("expected a DBusError");
    assert_eq!(name, "com.example.Boom");
    assert_eq!(message, "nope");
}

#[tokio::test]
async fn unknown_object_and_method_produce_standard_errors() {
    let (server, client) = pair();

    server
        .export(ObjectPathBuf::new("/echo").unwrap(), InterfaceName::new("com.example.Echo").unwrap(), Arc::new(Echo))
        .await
        .unwrap();

    let call = crate::message::MessageBuf::method_call(ObjectPath::new("/nowhere").unwrap(), "Echo").unwrap();
    let error = client.send(call).await.unwrap().await.unwrap_err();
    assert_eq!(error.as_dbus().unwrap().0, "org.freedesktop.DBus.Error.UnknownObject");

    let call = crate::message::MessageBuf::method_call(ObjectPath::new("/echo").unwrap(), "NoSuchMethod").unwrap();
    let error = client.send(call).await.unwrap().await.unwrap_err();
    assert_eq!(error.as_dbus().unwrap().0, "org.freedesktop.DBus.Error.UnknownMethod");
}

#[tokio::test]
async fn signal_routing_invokes_handler_exactly_once() {
    let (emitter, receiver) = pair();

    let rule = MatchRule::new()
        .with_interface(InterfaceName::new("com.example").unwrap())
        .with_member(MemberName::new("Ping").unwrap());
    let (_token, mut stream) = receiver.add_match(rule).await.unwrap();

    // A signal on a different member must not match the rule above.
    let other = crate::message::MessageBuf::signal(ObjectPath::new("/").unwrap(), "com.example", "Pong").unwrap();
    emitter.send_no_reply(other).unwrap();

    let ping = crate::message::MessageBuf::signal(ObjectPath::new("/").unwrap(), "com.example", "Ping")
        .unwrap()
        .with_body(Value::Str("x".to_owned()));
    emitter.send_no_reply(ping).unwrap();

    let received = stream.recv().await.expect("signal delivered");
    assert_eq!(received.member().unwrap().as_str(), "Ping");
    assert_eq!(received.body(), &[Value::Str("x".to_owned())]);

    // Nothing further should be waiting: the non-matching signal was never
    // forwarded, and no duplicate delivery happened for the matching one.
    let second = tokio::time::timeout(std::time::Duration::from_millis(50), stream.recv()).await;
    assert!(second.is_err(), "handler was invoked more than once for one matching signal");
}

#[tokio::test]
async fn add_match_refcount_dispatches_once_per_rule() {
    let (daemon_side, client) = UnixStream::pair().expect("unix socket pair");
    let client = MessageBus::for_test(Transport::from_unix_stream(client));

    let rule = MatchRule::new().with_member(MemberName::new("Ping").unwrap());

    let (token_a, _stream_a) = client.add_match(rule.clone()).await.unwrap();
    let (token_b, _stream_b) = client.add_match(rule.clone()).await.unwrap();

    let add_matches = count_bus_method_calls(&daemon_side, "AddMatch").await;
    assert_eq!(add_matches, 1, "two add_match calls for the same rule issue exactly one AddMatch");

    client.remove_match(token_a).await.unwrap();
    let remove_matches_after_first = count_bus_method_calls_nonblocking(&daemon_side, "RemoveMatch").await;
    assert_eq!(remove_matches_after_first, 0, "a shared rule survives the first remove_match");

    client.remove_match(token_b).await.unwrap();
    let remove_matches = count_bus_method_calls(&daemon_side, "RemoveMatch").await;
    assert_eq!(remove_matches, 1, "the last remove_match for a rule issues exactly one RemoveMatch");
}

/// Read exactly one framed D-Bus message off a raw stream and assert it is a
/// `METHOD_CALL` for the given member, without going through
/// [`MessageBus`]'s own dispatcher (which is what this test is verifying).
async fn count_bus_method_calls(stream: &UnixStream, member: &str) -> usize {
    let message = read_raw_message(stream).await;
    assert_eq!(message.member().map(|m| m.as_str()), Some(member));
    1
}

async fn count_bus_method_calls_nonblocking(stream: &UnixStream, member: &str) -> usize {
    match tokio::time::timeout(std::time::Duration::from_millis(50), read_raw_message(stream)).await {
        Ok(message) => {
            assert_eq!(message.member().map(|m| m.as_str()), Some(member));
            1
        }
        Err(_) => 0,
    }
}

async fn read_raw_message(stream: &UnixStream) -> crate::message::MessageBuf {
    let mut prefix = [0u8; FIXED_HEADER_LEN];
    read_exact_raw(stream, &mut prefix).await;

    let prefix_parsed: HeaderPrefix = read_header_prefix(&prefix).unwrap();
    let mut fields_len_bytes = [0u8; 4];
    fields_len_bytes.copy_from_slice(&prefix[12..16]);
    let fields_len = read_header_fields_length(&fields_len_bytes, prefix_parsed.endianness) as usize;

    let mut header_fields = vec![0u8; fields_len];
    read_exact_raw(stream, &mut header_fields).await;

    let unpadded = FIXED_HEADER_LEN + fields_len;
    let padding = (unpadded + 7) / 8 * 8 - unpadded;
    if padding > 0 {
        let mut pad = vec![0u8; padding];
        read_exact_raw(stream, &mut pad).await;
    }

    let mut body = vec![0u8; prefix_parsed.body_length as usize];
    read_exact_raw(stream, &mut body).await;

    decode_message(prefix_parsed, &header_fields, &body).unwrap()
}

async fn read_exact_raw(stream: &UnixStream, buf: &mut [u8]) {
    let mut filled = 0;
    while filled < buf.len() {
        stream.readable().await.unwrap();
        match stream.try_read(&mut buf[filled..]) {
            Ok(0) => panic!("stream closed mid-frame"),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("read error: {e}"),
        }
    }
}

#[tokio::test]
async fn disconnect_fails_pending_reply() {
    let (_server, client) = pair();

    let call = crate::message::MessageBuf::method_call(ObjectPath::new("/echo").unwrap(), "Echo").unwrap();
    let pending = client.send(call).await.unwrap();

    // Disconnecting locally must fail every pending reply on this side,
    // independent of whether the peer ever answers.
    client.disconnect();

    let error = pending.await.unwrap_err();
    assert!(error.as_dbus().is_none());
}

#[tokio::test]
async fn send_after_disconnect_fails_immediately() {
    let (_server, client) = pair();
    client.disconnect();

    // Wait for the dispatch task to process the `Disconnect` command and
    // tear itself (and the command channel receiver) down; a bare
    // `send` only fails once the receiver is gone.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    loop {
        let call = crate::message::MessageBuf::method_call(ObjectPath::new("/echo").unwrap(), "Echo").unwrap();
        if client.send(call).await.is_err() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "dispatch task never shut down");
        tokio::task::yield_now().await;
    }
}
