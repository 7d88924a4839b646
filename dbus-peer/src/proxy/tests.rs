use tokio::net::UnixStream;

use crate::bus::MessageBus;
use crate::message::MessageBuf;
use crate::names::{BusName, InterfaceName};
use crate::object_path::{ObjectPath, ObjectPathBuf};
use crate::transport::Transport;
use crate::value::Value;

use super::Proxy;

fn pair() -> (MessageBus, MessageBus) {
    let (a, b) = UnixStream::pair().expect("unix socket pair");
    (
        MessageBus::for_test(Transport::from_unix_stream(a)),
        MessageBus::for_test(Transport::from_unix_stream(b)),
    )
}

#[tokio::test]
async fn subscribe_delivers_only_signals_matching_the_proxy_scope() {
    let (emitter, receiver) = pair();

    let proxy = Proxy::new(
        receiver,
        BusName::new(":1.1".to_owned()).unwrap(),
        ObjectPathBuf::new("/com/example/Object").unwrap(),
        InterfaceName::new("com.example.Widget").unwrap(),
    );

    let (token, mut stream) = proxy.subscribe("Changed").await.unwrap();

    // Different interface at the same path/member: must not be delivered.
    let other_interface = MessageBuf::signal(ObjectPath::new("/com/example/Object").unwrap(), "com.example.Other", "Changed")
        .unwrap()
        .with_sender(":1.1")
        .unwrap()
        .with_body(Value::Str("ignored".to_owned()));
    emitter.send_no_reply(other_interface).unwrap();

    let matching = MessageBuf::signal(
        ObjectPath::new("/com/example/Object").unwrap(),
        "com.example.Widget",
        "Changed",
    )
    .unwrap()
    .with_sender(":1.1")
    .unwrap()
    .with_body(Value::Str("new-value".to_owned()));
    emitter.send_no_reply(matching).unwrap();

    let received = stream.recv().await.expect("matching signal delivered");
    assert_eq!(received.body(), &[Value::Str("new-value".to_owned())]);

    let second = tokio::time::timeout(std::time::Duration::from_millis(50), stream.recv()).await;
    assert!(second.is_err(), "the non-matching signal must not have been forwarded");

    proxy.unsubscribe(token).await.unwrap();
}
