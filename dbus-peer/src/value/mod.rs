//! The dynamically typed value tree and the aligned-buffer marshaller that
//! encodes and decodes it against a [`Signature`](dbus_peer_core::signature::Signature).

pub use self::value::Value;
mod value;

pub use self::encode::encode_value;
mod encode;

pub use self::decode::{decode_value, Decoder};
mod decode;

#[cfg(test)]
mod tests;
