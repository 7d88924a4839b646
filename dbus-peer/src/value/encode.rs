use dbus_peer_core::proto::{Endianness, MAX_ARRAY_LENGTH};
use dbus_peer_core::signature::{Signature, Type as SigType};

use crate::error::{Error, ErrorKind, Result};

use super::Value;

/// Advance `buf`'s length with zero padding until it is aligned to `align`
/// bytes.
fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let rem = buf.len() % align;

    if rem != 0 {
        buf.resize(buf.len() + (align - rem), 0);
    }
}

/// Pad to `align`, then append `bytes` (given in little-endian order),
/// flipping them for a big-endian message.
fn write_scalar(buf: &mut Vec<u8>, endianness: Endianness, le_bytes: &[u8], align: usize) {
    pad_to(buf, align);

    match endianness {
        Endianness::Little => buf.extend_from_slice(le_bytes),
        Endianness::Big => buf.extend(le_bytes.iter().rev()),
    }
}

/// Append `value` to `buf`, encoded according to `signature` and
/// `endianness`.
///
/// `buf` is treated as an aligned cursor: padding is measured from its
/// current length, so this can be called repeatedly to build up a full
/// message body.
pub fn encode_value(
    buf: &mut Vec<u8>,
    endianness: Endianness,
    signature: &Signature,
    value: &Value,
) -> Result<()> {
    let mut it = signature.iter();
    let ty = it
        .next()
        .ok_or_else(|| Error::from(ErrorKind::SignatureMismatch))?;
    encode_one(buf, endianness, ty, value)
}

fn encode_one(
    buf: &mut Vec<u8>,
    endianness: Endianness,
    ty: dbus_peer_core::signature::Type<'_>,
    value: &Value,
) -> Result<()> {
    use dbus_peer_core::signature::Type as T;

    match (ty, value) {
        (T::Basic(b), Value::U8(v)) if b == SigType::BYTE.0 => {
            pad_to(buf, 1);
            buf.push(*v);
        }
        (T::Basic(b), Value::Bool(v)) if b == SigType::BOOLEAN.0 => {
            write_scalar(buf, endianness, &(*v as u32).to_le_bytes(), 4);
        }
        (T::Basic(b), Value::I16(v)) if b == SigType::INT16.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 2);
        }
        (T::Basic(b), Value::U16(v)) if b == SigType::UINT16.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 2);
        }
        (T::Basic(b), Value::I32(v)) if b == SigType::INT32.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 4);
        }
        (T::Basic(b), Value::U32(v)) if b == SigType::UINT32.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 4);
        }
        (T::Basic(b), Value::I64(v)) if b == SigType::INT64.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 8);
        }
        (T::Basic(b), Value::U64(v)) if b == SigType::UINT64.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 8);
        }
        (T::Basic(b), Value::F64(v)) if b == SigType::DOUBLE.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 8);
        }
        (T::Basic(b), Value::Fd(v)) if b == SigType::UNIX_FD.0 => {
            write_scalar(buf, endianness, &v.to_le_bytes(), 4);
        }
        (T::Basic(b), Value::Str(v)) if b == SigType::STRING.0 => {
            write_string(buf, endianness, v.as_bytes(), true)?;
        }
        (T::Basic(b), Value::ObjectPath(v)) if b == SigType::OBJECT_PATH.0 => {
            write_string(buf, endianness, v.as_str().as_bytes(), true)?;
        }
        (T::Basic(b), Value::Signature(v)) if b == SigType::SIGNATURE.0 => {
            write_string(buf, endianness, v.as_str().as_bytes(), false)?;
        }
        (T::Basic(b), Value::Variant(inner_sig, inner)) if b == SigType::VARIANT.0 => {
            write_string(buf, endianness, inner_sig.as_str().as_bytes(), false)?;
            encode_value(buf, endianness, inner_sig, inner)?;
        }
        (T::Array(element), Value::Array(element_sig, items)) => {
            if element.as_str() != element_sig.as_str() {
                return Err(ErrorKind::SignatureMismatch.into());
            }

            encode_array(buf, endianness, element, items)?;
        }
        (T::Struct(fields), Value::Struct(values)) => {
            pad_to(buf, 8);

            if fields.iter().count() != values.len() {
                return Err(ErrorKind::SignatureMismatch.into());
            }

            for (field_ty, field_value) in fields.iter().zip(values) {
                encode_one(buf, endianness, field_ty, field_value)?;
            }
        }
        (T::Dict(key_sig, value_sig), Value::DictEntry(key, value)) => {
            pad_to(buf, 8);

            let key_ty = key_sig.iter().next().ok_or(ErrorKind::SignatureMismatch)?;
            encode_one(buf, endianness, key_ty, key)?;

            let value_ty = value_sig
                .iter()
                .next()
                .ok_or(ErrorKind::SignatureMismatch)?;
            encode_one(buf, endianness, value_ty, value)?;
        }
        _ => return Err(ErrorKind::SignatureMismatch.into()),
    }

    Ok(())
}

/// Write a length-prefixed, NUL-terminated string.
///
/// `u32_len` selects a 4-byte length prefix (`s`/`o`) versus a 1-byte one
/// (`g`).
fn write_string(buf: &mut Vec<u8>, endianness: Endianness, bytes: &[u8], u32_len: bool) -> Result<()> {
    if u32_len {
        if bytes.len() > u32::MAX as usize {
            return Err(ErrorKind::SignatureMismatch.into());
        }

        write_scalar(buf, endianness, &(bytes.len() as u32).to_le_bytes(), 4);
    } else {
        if bytes.len() > 255 {
            return Err(ErrorKind::SignatureMismatch.into());
        }

        pad_to(buf, 1);
        buf.push(bytes.len() as u8);
    }

    buf.extend_from_slice(bytes);
    buf.push(0);
    Ok(())
}

fn encode_array(
    buf: &mut Vec<u8>,
    endianness: Endianness,
    element: &Signature,
    items: &[Value],
) -> Result<()> {
    pad_to(buf, 4);
    let len_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    // The length field does not count its own alignment pad, but the
    // alignment pad that precedes the first *element* does count, per the
    // D-Bus specification's array marshalling rules.
    pad_to(buf, element_alignment(element));
    let start = buf.len();

    let element_ty = element.iter().next();

    for item in items {
        match element_ty {
            Some(ty) => encode_one(buf, endianness, ty, item)?,
            None => return Err(ErrorKind::SignatureMismatch.into()),
        }
    }

    let content_len = buf.len() - start;

    if content_len as u64 > MAX_ARRAY_LENGTH as u64 {
        return Err(ErrorKind::SignatureMismatch.into());
    }

    let content_len = content_len as u32;
    let len_bytes = match endianness {
        Endianness::Little => content_len.to_le_bytes(),
        Endianness::Big => content_len.to_be_bytes(),
    };
    buf[len_pos..len_pos + 4].copy_from_slice(&len_bytes);
    Ok(())
}

/// The alignment of a type's first byte on the wire.
fn element_alignment(element: &Signature) -> usize {
    match element.as_bytes().first() {
        Some(b'a') => 4,
        Some(b'(') | Some(b'{') => 8,
        Some(b'g') => 1,
        Some(b'v') => 1,
        Some(&b) => SigType::new(b)
            .fixed_alignment()
            .map(usize::from)
            .unwrap_or(4),
        None => 1,
    }
}
