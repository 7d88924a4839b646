use dbus_peer_core::proto::Endianness;
use dbus_peer_core::signature::Signature;

use super::{decode_value, encode_value, Decoder, Value};

fn round_trip(signature: &str, value: Value, endianness: Endianness) {
    let sig = Signature::new(signature).unwrap();
    let mut buf = Vec::new();
    encode_value(&mut buf, endianness, sig, &value).unwrap();

    let mut decoder = Decoder::new(&buf, endianness);
    let decoded = decode_value(&mut decoder, sig).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoder.position(), buf.len());
}

#[test]
fn round_trips_basic_types_both_endians() {
    for endianness in [Endianness::Little, Endianness::Big] {
        round_trip("y", Value::U8(42), endianness);
        round_trip("b", Value::Bool(true), endianness);
        round_trip("n", Value::I16(-1234), endianness);
        round_trip("q", Value::U16(1234), endianness);
        round_trip("i", Value::I32(-123456), endianness);
        round_trip("u", Value::U32(123456), endianness);
        round_trip("x", Value::I64(-1234567890123), endianness);
        round_trip("t", Value::U64(1234567890123), endianness);
        round_trip("d", Value::F64(3.5), endianness);
        round_trip("h", Value::Fd(7), endianness);
        round_trip("s", Value::Str("hello".to_owned()), endianness);
        round_trip("s", Value::Str(String::new()), endianness);
        round_trip("s", Value::Str("\u{3bb}\u{2192}\u{3c0}".to_owned()), endianness);
    }
}

#[test]
fn round_trips_struct() {
    let value = Value::Struct(vec![Value::U8(1), Value::Str("x".to_owned()), Value::I32(-1)]);
    round_trip("(ysi)", value, Endianness::Little);
}

#[test]
fn round_trips_array_of_strings() {
    let value = Value::Array(
        dbus_peer_core::signature::SignatureBuf::new("s".to_owned()).unwrap(),
        vec![Value::Str("a".to_owned()), Value::Str("bb".to_owned())],
    );
    round_trip("as", value, Endianness::Little);
}

#[test]
fn round_trips_dict() {
    let entry = Value::DictEntry(
        Box::new(Value::Str("k".to_owned())),
        Box::new(Value::Variant(
            dbus_peer_core::signature::SignatureBuf::new("i".to_owned()).unwrap(),
            Box::new(Value::I32(7)),
        )),
    );
    let value = Value::Array(
        dbus_peer_core::signature::SignatureBuf::new("{sv}".to_owned()).unwrap(),
        vec![entry],
    );
    round_trip("a{sv}", value, Endianness::Little);
}

#[test]
fn empty_array_keeps_element_signature() {
    let value = Value::Array(
        dbus_peer_core::signature::SignatureBuf::new("i".to_owned()).unwrap(),
        vec![],
    );
    round_trip("ai", value, Endianness::Little);
}

#[test]
fn struct_alignment_pads_to_eight() {
    let sig = Signature::new("y(yy)").unwrap();
    let value_sig = Signature::new("(yy)").unwrap();
    let mut buf = Vec::new();
    encode_value(&mut buf, Endianness::Little, Signature::new("y").unwrap(), &Value::U8(1)).unwrap();
    let before = buf.len();
    encode_value(&mut buf, Endianness::Little, value_sig, &Value::Struct(vec![Value::U8(2), Value::U8(3)])).unwrap();
    assert_eq!(before % 8, 1);
    assert_eq!(buf.len() - before, 7 + 2);
    let _ = sig;
}

#[test]
fn rejects_non_boolean_bool_value() {
    let sig = Signature::new("b").unwrap();
    let buf = 2u32.to_le_bytes().to_vec();
    let mut decoder = Decoder::new(&buf, Endianness::Little);
    assert!(decode_value(&mut decoder, sig).is_err());
}

#[test]
fn signature_of_composes() {
    let value = Value::Struct(vec![Value::U8(1), Value::Array(
        dbus_peer_core::signature::SignatureBuf::new("s".to_owned()).unwrap(),
        vec![],
    )]);
    assert_eq!(value.signature().as_str(), "(yas)");
}

#[test]
fn as_dict_overrides_duplicate_keys() {
    let make_entry = |k: &str, v: i32| {
        Value::DictEntry(
            Box::new(Value::Str(k.to_owned())),
            Box::new(Value::I32(v)),
        )
    };

    let value = Value::Array(
        dbus_peer_core::signature::SignatureBuf::new("{si}".to_owned()).unwrap(),
        vec![make_entry("a", 1), make_entry("a", 2)],
    );

    let dict = value.as_dict().unwrap();
    assert_eq!(dict.len(), 1);
    assert_eq!(dict[0].1, &Value::I32(2));
}

/// A recursive description of a value's shape, kept separate from [`Value`]
/// itself so that generating an array or dict's *element* shape once and
/// then producing several [`Value`]s from it guarantees every element
/// conforms to the same signature — a bare `Arbitrary for Value` can't
/// promise that on its own.
#[derive(Clone, Debug)]
enum Shape {
    Basic(u8),
    Array(Box<Shape>),
    Struct(Vec<Shape>),
    Variant,
    Dict(Box<Shape>),
}

const BASIC_CODES: &[u8] = b"ybnqiuxtdsog";

fn gen_shape(g: &mut quickcheck::Gen, depth: u32) -> Shape {
    if depth >= 3 {
        return Shape::Basic(*g.choose(BASIC_CODES).unwrap());
    }

    match *g.choose(&[0u8, 1, 2, 3, 4]).unwrap() {
        0 => Shape::Basic(*g.choose(BASIC_CODES).unwrap()),
        1 => Shape::Array(Box::new(gen_shape(g, depth + 1))),
        2 => {
            let n = *g.choose(&[1usize, 2, 3]).unwrap();
            Shape::Struct((0..n).map(|_| gen_shape(g, depth + 1)).collect())
        }
        3 => Shape::Variant,
        _ => Shape::Dict(Box::new(gen_shape(g, depth + 1))),
    }
}

/// Builds the signature string for a [`Shape`] one character at a time,
/// validating the whole result once at the end — the intermediate strings
/// (a bare `(`, a bare `a{`) are not themselves complete signatures, so
/// they can't be assembled through [`dbus_peer_core::signature::SignatureBuf::push_signature`],
/// which requires each piece to already be a complete type on its own.
fn shape_signature_str(shape: &Shape, out: &mut String) {
    match shape {
        Shape::Basic(code) => out.push(*code as char),
        Shape::Array(inner) => {
            out.push('a');
            shape_signature_str(inner, out);
        }
        Shape::Struct(fields) => {
            out.push('(');
            for field in fields {
                shape_signature_str(field, out);
            }
            out.push(')');
        }
        Shape::Variant => out.push('v'),
        Shape::Dict(value_shape) => {
            out.push_str("a{s");
            shape_signature_str(value_shape, out);
            out.push('}');
        }
    }
}

fn shape_signature(shape: &Shape) -> dbus_peer_core::signature::SignatureBuf {
    let mut out = String::new();
    shape_signature_str(shape, &mut out);
    dbus_peer_core::signature::SignatureBuf::new(out).unwrap()
}

fn gen_value_of(g: &mut quickcheck::Gen, shape: &Shape) -> Value {
    use quickcheck::Arbitrary;

    match shape {
        Shape::Basic(b'y') => Value::U8(u8::arbitrary(g)),
        Shape::Basic(b'b') => Value::Bool(bool::arbitrary(g)),
        Shape::Basic(b'n') => Value::I16(i16::arbitrary(g)),
        Shape::Basic(b'q') => Value::U16(u16::arbitrary(g)),
        Shape::Basic(b'i') => Value::I32(i32::arbitrary(g)),
        Shape::Basic(b'u') => Value::U32(u32::arbitrary(g)),
        Shape::Basic(b'x') => Value::I64(i64::arbitrary(g)),
        Shape::Basic(b't') => Value::U64(u64::arbitrary(g)),
        Shape::Basic(b'd') => Value::F64(*g.choose(&[0.0, 1.0, -1.0, 3.5, -273.15, 1e100]).unwrap()),
        Shape::Basic(b's') => Value::Str(gen_string(g)),
        Shape::Basic(b'o') => {
            let path = g.choose(&["/", "/a", "/a/b", "/foo_bar/baz0"]).unwrap();
            Value::ObjectPath(crate::object_path::ObjectPathBuf::new(*path).unwrap())
        }
        Shape::Basic(b'g') => Value::Signature(shape_signature(&gen_shape(g, 3))),
        Shape::Basic(_) => unreachable!("BASIC_CODES only contains the codes handled above"),
        Shape::Array(inner) => {
            let n = *g.choose(&[0usize, 1, 2, 3]).unwrap();
            let values = (0..n).map(|_| gen_value_of(g, inner)).collect();
            Value::Array(shape_signature(inner), values)
        }
        Shape::Struct(fields) => Value::Struct(fields.iter().map(|f| gen_value_of(g, f)).collect()),
        Shape::Variant => {
            let inner_shape = gen_shape(g, 3);
            let value = gen_value_of(g, &inner_shape);
            Value::Variant(shape_signature(&inner_shape), Box::new(value))
        }
        Shape::Dict(value_shape) => {
            let n = *g.choose(&[0usize, 1, 2, 3]).unwrap();
            let entries = (0..n)
                .map(|i| {
                    Value::DictEntry(
                        Box::new(Value::Str(format!("k{i}"))),
                        Box::new(gen_value_of(g, value_shape)),
                    )
                })
                .collect();
            let mut entry_sig = String::from("{s");
            shape_signature_str(value_shape, &mut entry_sig);
            entry_sig.push('}');
            let dict_sig = dbus_peer_core::signature::SignatureBuf::new(entry_sig).unwrap();
            Value::Array(dict_sig, entries)
        }
    }
}

fn gen_string(g: &mut quickcheck::Gen) -> String {
    use quickcheck::Arbitrary;
    String::arbitrary(g).chars().filter(|c| *c != '\0').collect()
}

#[derive(Clone, Debug)]
struct ArbitraryValue(Value);

impl quickcheck::Arbitrary for ArbitraryValue {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let shape = gen_shape(g, 0);
        ArbitraryValue(gen_value_of(g, &shape))
    }
}

#[quickcheck_macros::quickcheck]
fn value_round_trips_for_any_conforming_shape(value: ArbitraryValue) -> bool {
    let value = value.0;
    let signature = value.signature();
    let sig_ref = Signature::new(signature.as_str()).unwrap();

    let mut buf = Vec::new();
    if encode_value(&mut buf, Endianness::Little, sig_ref, &value).is_err() {
        return false;
    }

    let mut decoder = Decoder::new(&buf, Endianness::Little);
    match decode_value(&mut decoder, sig_ref) {
        Ok(decoded) => decoded == value && decoder.position() == buf.len(),
        Err(_) => false,
    }
}

#[quickcheck_macros::quickcheck]
fn value_round_trips_across_endianness(value: ArbitraryValue) -> bool {
    let value = value.0;
    let signature = value.signature();
    let sig_ref = Signature::new(signature.as_str()).unwrap();

    for endianness in [Endianness::Little, Endianness::Big] {
        let mut buf = Vec::new();
        if encode_value(&mut buf, endianness, sig_ref, &value).is_err() {
            return false;
        }

        let mut decoder = Decoder::new(&buf, endianness);
        match decode_value(&mut decoder, sig_ref) {
            Ok(decoded) if decoded == value && decoder.position() == buf.len() => continue,
            _ => return false,
        }
    }

    true
}
