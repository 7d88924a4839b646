//! Message framing: header fields, serials, and the byte-level reader/writer
//! that sits between the transport and the dispatcher.

pub use self::serial::Serial;
pub(crate) use self::serial::SerialAllocator;
mod serial;

pub use self::header::HeaderField;
mod header;

pub use self::message_buf::MessageBuf;
mod message_buf;

pub use self::framing::{
    decode_message, encode_message, read_header_fields_length, read_header_prefix, HeaderPrefix,
    FIXED_HEADER_LEN,
};
mod framing;

#[cfg(test)]
mod tests;
