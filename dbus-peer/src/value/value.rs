use dbus_peer_core::signature::{Signature, SignatureBuf};

use crate::object_path::ObjectPathBuf;

/// A single D-Bus value.
///
/// D-Bus values are dynamically typed: any value may appear wherever its
/// signature permits, and a message body is just a sequence of these
/// conforming to the body's declared signature. This tagged representation
/// mirrors that directly, rather than trying to recover static types at
/// compile time.
///
/// # Examples
///
/// ```
/// use dbus_peer::value::Value;
///
/// let v = Value::Str("hello".to_owned());
/// assert_eq!(v.signature().as_str(), "s");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `y`
    U8(u8),
    /// `b`
    Bool(bool),
    /// `n`
    I16(i16),
    /// `q`
    U16(u16),
    /// `i`
    I32(i32),
    /// `u`
    U32(u32),
    /// `x`
    I64(i64),
    /// `t`
    U64(u64),
    /// `d`
    F64(f64),
    /// `h`, an index into the message's attached file descriptor array.
    Fd(u32),
    /// `s`
    Str(String),
    /// `o`
    ObjectPath(ObjectPathBuf),
    /// `g`
    Signature(SignatureBuf),
    /// `a…`, with the element signature carried alongside so that empty
    /// arrays still know their element type.
    Array(SignatureBuf, Vec<Value>),
    /// `(…)`
    Struct(Vec<Value>),
    /// `v`, the signature of the contained value plus the value itself.
    Variant(SignatureBuf, Box<Value>),
    /// A single entry of a `{KV}` dict, only valid as an element of an
    /// [`Value::Array`].
    DictEntry(Box<Value>, Box<Value>),
}

impl Value {
    /// Compute the signature of this value's own shape.
    pub fn signature(&self) -> SignatureBuf {
        let mut buf = SignatureBuf::empty();
        self.push_signature(&mut buf);
        buf
    }

    fn push_signature(&self, buf: &mut SignatureBuf) {
        match self {
            Value::U8(_) => buf.push_signature(Signature::BYTE),
            Value::Bool(_) => buf.push_signature(Signature::BOOLEAN),
            Value::I16(_) => buf.push_signature(Signature::INT16),
            Value::U16(_) => buf.push_signature(Signature::UINT16),
            Value::I32(_) => buf.push_signature(Signature::INT32),
            Value::U32(_) => buf.push_signature(Signature::UINT32),
            Value::I64(_) => buf.push_signature(Signature::INT64),
            Value::U64(_) => buf.push_signature(Signature::UINT64),
            Value::F64(_) => buf.push_signature(Signature::DOUBLE),
            Value::Fd(_) => buf.push_signature(Signature::UNIX_FD),
            Value::Str(_) => buf.push_signature(Signature::STRING),
            Value::ObjectPath(_) => buf.push_signature(Signature::OBJECT_PATH),
            Value::Signature(_) => buf.push_signature(Signature::SIGNATURE),
            Value::Variant(..) => buf.push_signature(Signature::VARIANT),
            Value::Array(element, _) => {
                buf.push_unchecked("a");
                buf.push_signature(element);
            }
            Value::Struct(fields) => {
                let mut inner = SignatureBuf::empty();
                inner.push_unchecked("(");

                for field in fields {
                    field.push_signature(&mut inner);
                }

                inner.push_unchecked(")");
                buf.push_signature(&inner);
            }
            Value::DictEntry(key, value) => {
                let mut inner = SignatureBuf::empty();
                inner.push_unchecked("{");
                key.push_signature(&mut inner);
                value.push_signature(&mut inner);
                inner.push_unchecked("}");
                buf.push_signature(&inner);
            }
        }
    }

    /// Interpret an array of `{KV}` entries as a map, last value wins on
    /// duplicate keys.
    ///
    /// This does not mutate the underlying array: decoding preserves the
    /// entries bit-for-bit, and this is purely an interpretation convenience
    /// for callers that want map semantics.
    pub fn as_dict(&self) -> Option<Vec<(&Value, &Value)>> {
        let Value::Array(_, entries) = self else {
            return None;
        };

        let mut out: Vec<(&Value, &Value)> = Vec::new();

        for entry in entries {
            let Value::DictEntry(key, value) = entry else {
                return None;
            };

            if let Some(existing) = out.iter_mut().find(|(k, _)| *k == key.as_ref()) {
                existing.1 = value;
            } else {
                out.push((key, value));
            }
        }

        Some(out)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u32> for Value {
    #[inline]
    fn from(value: u32) -> Self {
        Value::U32(value)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}
