use dbus_peer_core::proto::{Endianness, MAX_BODY_LENGTH};
use dbus_peer_core::signature::{Signature, SignatureBuf};

use crate::error::{Error, ErrorKind, Result};
use crate::names::{BusName, ErrorName, InterfaceName, MemberName};
use crate::proto::{Flags, HeaderFieldCode, MessageType, PROTOCOL_VERSION};
use crate::value::{decode_value, encode_value, Decoder, Value};

use super::{HeaderField, MessageBuf, Serial};

/// The length, in bytes, of the fixed 16-byte header prefix.
pub const FIXED_HEADER_LEN: usize = 16;

/// What [`read_header_prefix`] learns about a message before its header
/// field array and body have necessarily arrived yet.
pub struct HeaderPrefix {
    pub endianness: Endianness,
    pub message_type: MessageType,
    pub flags: Flags,
    pub body_length: u32,
    pub serial: Serial,
}

/// Parse the fixed 16-byte header prefix. Returns `Err` if fewer than 16
/// bytes are given, the endian mark is unrecognized, or the protocol
/// version isn't `1`.
pub fn read_header_prefix(bytes: &[u8; FIXED_HEADER_LEN]) -> Result<HeaderPrefix> {
    let endianness = Endianness::from_mark(bytes[0])
        .ok_or_else(|| Error::from(ErrorKind::InvalidProtocol("unrecognized endian mark")))?;

    let message_type = MessageType(bytes[1]);
    let flags = Flags(bytes[2]);
    let version = bytes[3];

    if version != PROTOCOL_VERSION {
        return Err(ErrorKind::InvalidProtocol("unsupported protocol version").into());
    }

    let body_length = read_u32(&bytes[4..8], endianness);
    let serial_raw = read_u32(&bytes[8..12], endianness);
    let serial = Serial::from_u32(serial_raw)
        .ok_or_else(|| Error::from(ErrorKind::InvalidProtocol("zero message serial")))?;

    if body_length > MAX_BODY_LENGTH {
        return Err(ErrorKind::InvalidProtocol("body length exceeds maximum").into());
    }

    Ok(HeaderPrefix {
        endianness,
        message_type,
        flags,
        body_length,
        serial,
    })
}

/// Read the `u32` array-length of the header field array, the four bytes
/// that immediately follow the fixed prefix.
pub fn read_header_fields_length(bytes: &[u8; 4], endianness: Endianness) -> u32 {
    read_u32(bytes, endianness)
}

fn read_u32(bytes: &[u8], endianness: Endianness) -> u32 {
    let raw: [u8; 4] = bytes.try_into().unwrap();

    match endianness {
        Endianness::Little => u32::from_le_bytes(raw),
        Endianness::Big => u32::from_be_bytes(raw),
    }
}

/// Decode the full message given the already-parsed prefix, the raw header
/// field array bytes (unaligned-array contents, i.e. everything between the
/// fixed prefix's length field and the body), and the raw body bytes.
pub fn decode_message(
    prefix: HeaderPrefix,
    header_fields: &[u8],
    body: &[u8],
) -> Result<MessageBuf> {
    let mut decoder = Decoder::new(header_fields, prefix.endianness);
    let array_sig = Signature::new_const("(yv)");
    let mut fields = Vec::new();
    let mut signature: Option<SignatureBuf> = None;

    while decoder.position() < header_fields.len() {
        let entry = decode_value(&mut decoder, array_sig)?;
        let Value::Struct(parts) = entry else {
            return Err(ErrorKind::InvalidProtocol("malformed header field entry").into());
        };
        let [Value::U8(code), Value::Variant(_, inner)] = <[Value; 2]>::try_from(parts)
            .map_err(|_| Error::from(ErrorKind::InvalidProtocol("malformed header field entry")))?
        else {
            return Err(ErrorKind::InvalidProtocol("malformed header field entry").into());
        };

        match HeaderFieldCode(code) {
            HeaderFieldCode::PATH => {
                let Value::ObjectPath(p) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("PATH field has wrong type").into());
                };
                fields.push(HeaderField::Path(p));
            }
            HeaderFieldCode::INTERFACE => {
                let Value::Str(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("INTERFACE field has wrong type").into());
                };
                fields.push(HeaderField::Interface(InterfaceName::new(s)?));
            }
            HeaderFieldCode::MEMBER => {
                let Value::Str(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("MEMBER field has wrong type").into());
                };
                fields.push(HeaderField::Member(MemberName::new(s)?));
            }
            HeaderFieldCode::ERROR_NAME => {
                let Value::Str(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("ERROR_NAME field has wrong type").into());
                };
                fields.push(HeaderField::ErrorName(ErrorName::new(s)?));
            }
            HeaderFieldCode::REPLY_SERIAL => {
                let Value::U32(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("REPLY_SERIAL field has wrong type").into());
                };
                let serial = Serial::from_u32(s)
                    .ok_or_else(|| Error::from(ErrorKind::InvalidProtocol("zero REPLY_SERIAL")))?;
                fields.push(HeaderField::ReplySerial(serial));
            }
            HeaderFieldCode::DESTINATION => {
                let Value::Str(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("DESTINATION field has wrong type").into());
                };
                fields.push(HeaderField::Destination(BusName::new(s)?));
            }
            HeaderFieldCode::SENDER => {
                let Value::Str(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("SENDER field has wrong type").into());
                };
                fields.push(HeaderField::Sender(BusName::new(s)?));
            }
            HeaderFieldCode::SIGNATURE => {
                let Value::Signature(s) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("SIGNATURE field has wrong type").into());
                };
                signature = Some(s.clone());
                fields.push(HeaderField::Signature(s));
            }
            HeaderFieldCode::UNIX_FDS => {
                let Value::U32(n) = *inner else {
                    return Err(ErrorKind::InvalidProtocol("UNIX_FDS field has wrong type").into());
                };
                fields.push(HeaderField::UnixFds(n));
            }
            _ => {
                // Unknown header fields are ignored per the specification.
            }
        }
    }

    let body_signature = signature.unwrap_or_else(SignatureBuf::empty);
    let mut body_decoder = Decoder::new(body, prefix.endianness);
    let mut values = Vec::new();

    for ty in body_signature.iter() {
        values.push(decode_one_top_level(&mut body_decoder, ty)?);
    }

    let message = MessageBuf::from_parts(
        prefix.message_type,
        prefix.serial,
        prefix.flags,
        fields,
        values,
    );
    message.validate_required_fields()?;
    Ok(message)
}

fn decode_one_top_level(
    decoder: &mut Decoder<'_>,
    ty: dbus_peer_core::signature::Type<'_>,
) -> Result<Value> {
    // Re-derive a standalone signature for this single top-level type so we
    // can reuse `decode_value`'s entry point.
    let sig = match ty {
        dbus_peer_core::signature::Type::Basic(b) => {
            SignatureBuf::new(String::from(b as char)).map_err(Error::from)?
        }
        dbus_peer_core::signature::Type::Array(element) => {
            let mut buf = SignatureBuf::empty();
            buf.push_unchecked("a");
            buf.push_signature(element);
            buf
        }
        dbus_peer_core::signature::Type::Struct(fields) => {
            let mut buf = SignatureBuf::empty();
            buf.push_unchecked("(");
            buf.push_signature(fields);
            buf.push_unchecked(")");
            buf
        }
        dbus_peer_core::signature::Type::Dict(key, value) => {
            let mut buf = SignatureBuf::empty();
            buf.push_unchecked("{");
            buf.push_signature(key);
            buf.push_signature(value);
            buf.push_unchecked("}");
            buf
        }
    };

    decode_value(decoder, &sig)
}

/// Serialize `message` to bytes using `endianness`, returning the complete
/// frame (fixed header, header field array with padding, body).
pub fn encode_message(message: &MessageBuf, endianness: Endianness) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    for value in message.body() {
        encode_value(&mut body, endianness, &value.signature(), value)?;
    }

    if body.len() as u64 > MAX_BODY_LENGTH as u64 {
        return Err(ErrorKind::InvalidProtocol("encoded body exceeds maximum length").into());
    }

    let mut header_fields = Vec::new();
    let signature = message.signature();

    let mut all_fields: Vec<HeaderField> = message.header_fields().to_vec();

    if !signature.is_empty() {
        all_fields.push(HeaderField::Signature(signature));
    }

    if !message.fds().is_empty() {
        all_fields.push(HeaderField::UnixFds(message.fds().len() as u32));
    }

    for field in &all_fields {
        encode_header_field(&mut header_fields, endianness, field)?;
    }

    let mut out = Vec::with_capacity(FIXED_HEADER_LEN + header_fields.len() + body.len() + 8);
    out.push(endianness.mark());
    out.push(message.message_type().0);
    out.push(message.flags().0);
    out.push(PROTOCOL_VERSION);
    push_u32(&mut out, body.len() as u32, endianness);
    push_u32(&mut out, message.serial().get(), endianness);
    push_u32(&mut out, header_fields.len() as u32, endianness);
    out.extend_from_slice(&header_fields);

    // The body starts on an 8-byte boundary measured from the start of the
    // message, matching the struct/dict-entry alignment of the header
    // field array's own element type.
    while out.len() % 8 != 0 {
        out.push(0);
    }

    out.extend_from_slice(&body);
    Ok(out)
}

fn push_u32(out: &mut Vec<u8>, value: u32, endianness: Endianness) {
    match endianness {
        Endianness::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endianness::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn encode_header_field(
    out: &mut Vec<u8>,
    endianness: Endianness,
    field: &HeaderField,
) -> Result<()> {
    let code = field.code();

    let (signature, value) = match field {
        HeaderField::Path(p) => (Signature::OBJECT_PATH, Value::ObjectPath(p.clone())),
        HeaderField::Interface(i) => (Signature::STRING, Value::Str(i.as_str().to_owned())),
        HeaderField::Member(m) => (Signature::STRING, Value::Str(m.as_str().to_owned())),
        HeaderField::ErrorName(e) => (Signature::STRING, Value::Str(e.as_str().to_owned())),
        HeaderField::ReplySerial(s) => (Signature::UINT32, Value::U32(s.get())),
        HeaderField::Destination(d) => (Signature::STRING, Value::Str(d.as_str().to_owned())),
        HeaderField::Sender(s) => (Signature::STRING, Value::Str(s.as_str().to_owned())),
        HeaderField::Signature(s) => (Signature::SIGNATURE, Value::Signature(s.clone())),
        HeaderField::UnixFds(n) => (Signature::UINT32, Value::U32(*n)),
    };

    let entry = Value::Struct(vec![
        Value::U8(code.0),
        Value::Variant(signature.to_owned(), Box::new(value)),
    ]);

    encode_value(out, endianness, Signature::new_const("(yv)"), &entry)
}
