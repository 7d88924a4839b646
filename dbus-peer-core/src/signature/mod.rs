//! The D-Bus type signature grammar: tokenizing, validating and tree-ifying a
//! signature string.

pub use self::error::{SignatureError, SignatureErrorKind};
mod error;

pub use self::signature::Signature;
mod signature;

pub use self::signature_buf::SignatureBuf;
mod signature_buf;

pub use self::iter::{Iter, Type};
mod iter;

mod stack;
mod validation;

use self::validation::validate;

#[cfg(test)]
mod tests;
