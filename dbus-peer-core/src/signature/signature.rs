use std::fmt;

use super::{validate, Iter, SignatureBuf, SignatureError};

/// A borrowed D-Bus signature string.
///
/// This is the borrowed counterpart to [`SignatureBuf`], the same way `str`
/// relates to `String`.
///
/// # Examples
///
/// ```
/// use dbus_peer_core::signature::Signature;
///
/// assert!(Signature::new("aai").is_ok());
/// assert!(Signature::new("(").is_err());
/// ```
#[derive(Hash, PartialEq, Eq)]
#[repr(transparent)]
pub struct Signature(str);

impl Signature {
    /// The empty signature.
    pub const EMPTY: &'static Signature = Signature::new_const("");
    /// The signature of a single byte.
    pub const BYTE: &'static Signature = Signature::new_const("y");
    /// The signature of a boolean.
    pub const BOOLEAN: &'static Signature = Signature::new_const("b");
    /// The signature of a signed 16-bit integer.
    pub const INT16: &'static Signature = Signature::new_const("n");
    /// The signature of an unsigned 16-bit integer.
    pub const UINT16: &'static Signature = Signature::new_const("q");
    /// The signature of a signed 32-bit integer.
    pub const INT32: &'static Signature = Signature::new_const("i");
    /// The signature of an unsigned 32-bit integer.
    pub const UINT32: &'static Signature = Signature::new_const("u");
    /// The signature of a signed 64-bit integer.
    pub const INT64: &'static Signature = Signature::new_const("x");
    /// The signature of an unsigned 64-bit integer.
    pub const UINT64: &'static Signature = Signature::new_const("t");
    /// The signature of an IEEE-754 double.
    pub const DOUBLE: &'static Signature = Signature::new_const("d");
    /// The signature of a string.
    pub const STRING: &'static Signature = Signature::new_const("s");
    /// The signature of an object path.
    pub const OBJECT_PATH: &'static Signature = Signature::new_const("o");
    /// The signature of a signature.
    pub const SIGNATURE: &'static Signature = Signature::new_const("g");
    /// The signature of a variant.
    pub const VARIANT: &'static Signature = Signature::new_const("v");
    /// The signature of a unix-fd index.
    pub const UNIX_FD: &'static Signature = Signature::new_const("h");

    /// Construct a signature in a constant context. Panics if invalid.
    #[track_caller]
    pub const fn new_const(signature: &str) -> &Signature {
        if super::validation::validate(signature.as_bytes()).is_err() {
            panic!("invalid D-Bus signature");
        }

        unsafe { Self::new_unchecked(signature.as_bytes()) }
    }

    /// Try to construct a signature, validating it first.
    pub fn new<S>(signature: &S) -> Result<&Signature, SignatureError>
    where
        S: ?Sized + AsRef<str>,
    {
        let signature = signature.as_ref();
        validate(signature.as_bytes())?;
        Ok(unsafe { Self::new_unchecked(signature.as_bytes()) })
    }

    /// Construct a signature without validating it.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `signature` is a valid, complete D-Bus
    /// signature string.
    #[inline]
    pub const unsafe fn new_unchecked(signature: &[u8]) -> &Self {
        &*(signature as *const [u8] as *const Signature)
    }

    /// Test whether the signature is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The length of the signature string in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the complete types in this signature.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Borrow the signature as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow the signature as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AsRef<Signature> for Signature {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self
    }
}

impl ToOwned for Signature {
    type Owned = SignatureBuf;

    #[inline]
    fn to_owned(&self) -> Self::Owned {
        unsafe { SignatureBuf::from_string_unchecked(self.0.to_owned()) }
    }
}

impl PartialEq<str> for Signature {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for Signature {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0 == **other
    }
}

impl PartialEq<Signature> for &str {
    #[inline]
    fn eq(&self, other: &Signature) -> bool {
        *self == other.0
    }
}
