use dbus_peer_core::proto::Endianness;

use crate::object_path::ObjectPath;
use crate::proto::Flags;
use crate::value::Value;

use super::{decode_message, encode_message, read_header_fields_length, read_header_prefix, MessageBuf, FIXED_HEADER_LEN};

/// Split a full encoded frame into its three pieces the way an incremental
/// transport reader would, then hand them to [`decode_message`].
fn roundtrip(message: &MessageBuf, endianness: Endianness) -> MessageBuf {
    let bytes = encode_message(message, endianness).unwrap();

    let prefix_bytes: [u8; FIXED_HEADER_LEN] = bytes[..FIXED_HEADER_LEN].try_into().unwrap();
    let prefix = read_header_prefix(&prefix_bytes).unwrap();

    let len_bytes: [u8; 4] = bytes[12..16].try_into().unwrap();
    let fields_len = read_header_fields_length(&len_bytes, prefix.endianness) as usize;

    let fields_start = FIXED_HEADER_LEN;
    let fields_end = fields_start + fields_len;
    let mut body_start = fields_end;

    while body_start % 8 != 0 {
        body_start += 1;
    }

    let body_end = body_start + prefix.body_length as usize;

    let header_fields = &bytes[fields_start..fields_end];
    let body = &bytes[body_start..body_end];

    decode_message(prefix, header_fields, body).unwrap()
}

#[test]
fn method_call_round_trips() {
    let path = ObjectPath::new("/org/freedesktop/DBus").unwrap();
    let mut m = MessageBuf::method_call(path, "Hello").unwrap();
    m.set_serial(super::Serial::from_u32(7).unwrap());
    let m = m.with_interface("org.freedesktop.DBus").unwrap();

    for endianness in [Endianness::Little, Endianness::Big] {
        let decoded = roundtrip(&m, endianness);
        assert_eq!(decoded.path().unwrap().as_str(), "/org/freedesktop/DBus");
        assert_eq!(decoded.interface().unwrap().as_str(), "org.freedesktop.DBus");
        assert_eq!(decoded.member().unwrap().as_str(), "Hello");
        assert_eq!(decoded.serial().get(), 7);
    }
}

#[test]
fn method_call_with_body_round_trips() {
    let path = ObjectPath::new("/com/example/Echo").unwrap();
    let mut m = MessageBuf::method_call(path, "Echo").unwrap();
    m.set_serial(super::Serial::from_u32(12).unwrap());
    m.push_body(Value::Str("hello".to_owned()));
    m.push_body(Value::I32(-7));

    let decoded = roundtrip(&m, Endianness::Little);
    assert_eq!(decoded.body(), m.body());
    assert_eq!(decoded.signature().as_str(), "si");
}

#[test]
fn method_return_carries_reply_serial() {
    let path = ObjectPath::new("/com/example/Echo").unwrap();
    let mut call = MessageBuf::method_call(path, "Echo").unwrap();
    call.set_serial(super::Serial::from_u32(3).unwrap());

    let mut reply = call.method_return_to();
    reply.set_serial(super::Serial::from_u32(4).unwrap());
    reply.push_body(Value::Str("hi".to_owned()));

    let decoded = roundtrip(&reply, Endianness::Little);
    assert_eq!(decoded.reply_serial().unwrap().get(), 3);
    assert_eq!(decoded.body(), reply.body());
}

#[test]
fn error_reply_requires_error_name() {
    let path = ObjectPath::new("/com/example/Echo").unwrap();
    let mut call = MessageBuf::method_call(path, "Echo").unwrap();
    call.set_serial(super::Serial::from_u32(9).unwrap());

    let mut err = call.error_to("com.example.Boom", "nope").unwrap();
    err.set_serial(super::Serial::from_u32(10).unwrap());

    let decoded = roundtrip(&err, Endianness::Little);
    assert_eq!(decoded.error_name().unwrap().as_str(), "com.example.Boom");
    assert_eq!(decoded.body(), &[Value::Str("nope".to_owned())]);
}

#[test]
fn signal_requires_path_interface_member() {
    let path = ObjectPath::new("/com/example/Object").unwrap();
    let mut signal = MessageBuf::signal(path, "com.example", "Ping").unwrap();
    signal.set_serial(super::Serial::from_u32(1).unwrap());
    signal.push_body(Value::Str("x".to_owned()));

    let decoded = roundtrip(&signal, Endianness::Little);
    assert_eq!(decoded.path().unwrap().as_str(), "/com/example/Object");
    assert_eq!(decoded.interface().unwrap().as_str(), "com.example");
    assert_eq!(decoded.member().unwrap().as_str(), "Ping");
}

#[test]
fn flags_round_trip() {
    let path = ObjectPath::new("/com/example/Object").unwrap();
    let mut m = MessageBuf::method_call(path, "Ping")
        .unwrap()
        .with_flags(Flags::NO_REPLY_EXPECTED);
    m.set_serial(super::Serial::from_u32(2).unwrap());

    let decoded = roundtrip(&m, Endianness::Little);
    assert!(decoded.flags() & Flags::NO_REPLY_EXPECTED);
}
