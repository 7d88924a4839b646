use dbus_peer_core::proto::{Endianness, MAX_ARRAY_LENGTH};
use dbus_peer_core::signature::{Signature, SignatureBuf, Type as SigType};

use crate::error::{Error, ErrorKind, Result};
use crate::object_path::ObjectPath;

use super::Value;

/// A cursor over a received message body, tracking position for alignment
/// purposes as values are decoded out of it.
pub struct Decoder<'de> {
    data: &'de [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'de> Decoder<'de> {
    /// Construct a decoder over `data`, starting at cursor position zero.
    pub fn new(data: &'de [u8], endianness: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endianness,
        }
    }

    /// The decoder's current byte offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn align(&mut self, align: usize) -> Result<()> {
        let rem = self.pos % align;

        if rem != 0 {
            let pad = align - rem;
            self.take(pad)?;
        }

        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'de [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::from(ErrorKind::BufferUnderflow))?;

        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.align(4)?;
        let bytes = self.take(4)?;
        let raw: [u8; 4] = bytes.try_into().unwrap();

        Ok(match self.endianness {
            Endianness::Little => u32::from_le_bytes(raw),
            Endianness::Big => u32::from_be_bytes(raw),
        })
    }

    fn read_nul_terminated(&mut self, len: usize) -> Result<&'de str> {
        let bytes = self.take(len)?;
        let nul = self.take(1)?;

        if nul != [0] {
            return Err(ErrorKind::InvalidProtocol("string is not NUL terminated").into());
        }

        std::str::from_utf8(bytes).map_err(Error::from)
    }
}

/// Decode a single value matching `signature` from `decoder`.
pub fn decode_value(decoder: &mut Decoder<'_>, signature: &Signature) -> Result<Value> {
    let ty = signature
        .iter()
        .next()
        .ok_or_else(|| Error::from(ErrorKind::SignatureMismatch))?;
    decode_one(decoder, ty)
}

fn decode_one(decoder: &mut Decoder<'_>, ty: dbus_peer_core::signature::Type<'_>) -> Result<Value> {
    use dbus_peer_core::signature::Type as T;

    Ok(match ty {
        T::Basic(b) if b == SigType::BYTE.0 => Value::U8(decoder.take(1)?[0]),
        T::Basic(b) if b == SigType::BOOLEAN.0 => {
            let raw = decoder.read_u32()?;

            match raw {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                _ => return Err(ErrorKind::InvalidProtocol("boolean not 0 or 1").into()),
            }
        }
        T::Basic(b) if b == SigType::INT16.0 => {
            decoder.align(2)?;
            let bytes: [u8; 2] = decoder.take(2)?.try_into().unwrap();
            Value::I16(read_i16(bytes, decoder.endianness))
        }
        T::Basic(b) if b == SigType::UINT16.0 => {
            decoder.align(2)?;
            let bytes: [u8; 2] = decoder.take(2)?.try_into().unwrap();
            Value::U16(read_u16(bytes, decoder.endianness))
        }
        T::Basic(b) if b == SigType::INT32.0 => Value::I32(decoder.read_u32()? as i32),
        T::Basic(b) if b == SigType::UINT32.0 => Value::U32(decoder.read_u32()?),
        T::Basic(b) if b == SigType::INT64.0 => {
            decoder.align(8)?;
            let bytes: [u8; 8] = decoder.take(8)?.try_into().unwrap();
            Value::I64(read_i64(bytes, decoder.endianness))
        }
        T::Basic(b) if b == SigType::UINT64.0 => {
            decoder.align(8)?;
            let bytes: [u8; 8] = decoder.take(8)?.try_into().unwrap();
            Value::U64(read_u64(bytes, decoder.endianness))
        }
        T::Basic(b) if b == SigType::DOUBLE.0 => {
            decoder.align(8)?;
            let bytes: [u8; 8] = decoder.take(8)?.try_into().unwrap();
            Value::F64(f64::from_bits(read_u64(bytes, decoder.endianness)))
        }
        T::Basic(b) if b == SigType::UNIX_FD.0 => Value::Fd(decoder.read_u32()?),
        T::Basic(b) if b == SigType::STRING.0 => {
            let len = decoder.read_u32()? as usize;
            Value::Str(decoder.read_nul_terminated(len)?.to_owned())
        }
        T::Basic(b) if b == SigType::OBJECT_PATH.0 => {
            let len = decoder.read_u32()? as usize;
            let s = decoder.read_nul_terminated(len)?;
            let path = ObjectPath::new(s).map_err(Error::from)?;
            Value::ObjectPath(path.to_owned())
        }
        T::Basic(b) if b == SigType::SIGNATURE.0 => {
            decoder.align(1)?;
            let len = decoder.take(1)?[0] as usize;
            let s = decoder.read_nul_terminated(len)?;
            Value::Signature(Signature::new(s).map_err(Error::from)?.to_owned())
        }
        T::Basic(b) if b == SigType::VARIANT.0 => {
            decoder.align(1)?;
            let len = decoder.take(1)?[0] as usize;
            let s = decoder.read_nul_terminated(len)?;
            let inner_sig = Signature::new(s).map_err(Error::from)?.to_owned();
            let inner = decode_value(decoder, &inner_sig)?;
            Value::Variant(inner_sig, Box::new(inner))
        }
        T::Array(element) => decode_array(decoder, element)?,
        T::Struct(fields) => {
            decoder.align(8)?;
            let mut values = Vec::new();

            for field_ty in fields.iter() {
                values.push(decode_one(decoder, field_ty)?);
            }

            Value::Struct(values)
        }
        T::Dict(key_sig, value_sig) => {
            decoder.align(8)?;

            let key_ty = key_sig
                .iter()
                .next()
                .ok_or_else(|| Error::from(ErrorKind::SignatureMismatch))?;
            let key = decode_one(decoder, key_ty)?;

            let value_ty = value_sig
                .iter()
                .next()
                .ok_or_else(|| Error::from(ErrorKind::SignatureMismatch))?;
            let value = decode_one(decoder, value_ty)?;

            Value::DictEntry(Box::new(key), Box::new(value))
        }
        _ => return Err(ErrorKind::SignatureMismatch.into()),
    })
}

fn decode_array(decoder: &mut Decoder<'_>, element: &Signature) -> Result<Value> {
    let byte_len = decoder.read_u32()?;

    if byte_len > MAX_ARRAY_LENGTH {
        return Err(ErrorKind::InvalidProtocol("array exceeds maximum length").into());
    }

    decoder.align(element_alignment(element))?;
    let end = decoder
        .pos
        .checked_add(byte_len as usize)
        .filter(|&end| end <= decoder.data.len())
        .ok_or_else(|| Error::from(ErrorKind::BufferUnderflow))?;

    let mut items = Vec::new();
    let element_ty = element
        .iter()
        .next()
        .ok_or_else(|| Error::from(ErrorKind::SignatureMismatch))?;

    while decoder.pos < end {
        items.push(decode_one(decoder, element_ty)?);
    }

    if decoder.pos != end {
        return Err(ErrorKind::InvalidProtocol("array contents misaligned with declared length").into());
    }

    Ok(Value::Array(element.to_owned(), items))
}

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

fn read_i16(bytes: [u8; 2], endianness: Endianness) -> i16 {
    match endianness {
        Endianness::Little => i16::from_le_bytes(bytes),
        Endianness::Big => i16::from_be_bytes(bytes),
    }
}

fn read_u16(bytes: [u8; 2], endianness: Endianness) -> u16 {
    match endianness {
        Endianness::Little => u16::from_le_bytes(bytes),
        Endianness::Big => u16::from_be_bytes(bytes),
    }
}

fn read_i64(bytes: [u8; 8], endianness: Endianness) -> i64 {
    match endianness {
        Endianness::Little => i64::from_le_bytes(bytes),
        Endianness::Big => i64::from_be_bytes(bytes),
    }
}

fn read_u64(bytes: [u8; 8], endianness: Endianness) -> u64 {
    match endianness {
        Endianness::Little => u64::from_le_bytes(bytes),
        Endianness::Big => u64::from_be_bytes(bytes),
    }
}
