use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use super::{validate, Signature, SignatureError};

/// An owned, validated D-Bus signature string.
///
/// This is the owned counterpart to [`Signature`], the same way `String`
/// relates to `str`.
#[derive(Clone, Hash, PartialEq, Eq, Default)]
pub struct SignatureBuf {
    data: String,
}

impl SignatureBuf {
    /// Construct a new, empty signature.
    #[inline]
    pub fn empty() -> Self {
        Self { data: String::new() }
    }

    /// Try to construct an owned signature, validating it first.
    pub fn new<S>(signature: S) -> Result<Self, SignatureError>
    where
        S: Into<String>,
    {
        let data = signature.into();
        validate(data.as_bytes())?;
        Ok(Self { data })
    }

    /// Construct an owned signature without validating it.
    ///
    /// # Safety
    ///
    /// The caller must ensure `data` is a valid, complete D-Bus signature.
    #[inline]
    pub unsafe fn from_string_unchecked(data: String) -> Self {
        Self { data }
    }

    /// Extend this signature with the bytes of another complete signature,
    /// without re-validating the combined length against nesting rules (the
    /// caller is responsible for producing a signature that is itself valid
    /// as a sequence of complete types).
    pub fn push_signature(&mut self, other: &Signature) {
        self.data.push_str(other.as_str());
    }

    /// Append a raw signature fragment without validating it.
    ///
    /// Unlike [`push_signature`](Self::push_signature), `fragment` need not
    /// be a complete type on its own — this is what lets callers assemble a
    /// container type (`a`, `(`, `)`, `{`, `}`) one delimiter at a time.
    ///
    /// # Safety
    ///
    /// The caller must ensure the signature is valid once fully assembled;
    /// nothing checks that here.
    pub fn push_unchecked(&mut self, fragment: &str) {
        self.data.push_str(fragment);
    }

    /// Coerce into a borrowed [`Signature`].
    #[inline]
    pub fn as_signature(&self) -> &Signature {
        unsafe { Signature::new_unchecked(self.data.as_bytes()) }
    }

    /// Consume and return the inner `String`.
    #[inline]
    pub fn into_string(self) -> String {
        self.data
    }
}

impl Deref for SignatureBuf {
    type Target = Signature;

    #[inline]
    fn deref(&self) -> &Signature {
        self.as_signature()
    }
}

impl Borrow<Signature> for SignatureBuf {
    #[inline]
    fn borrow(&self) -> &Signature {
        self.as_signature()
    }
}

impl AsRef<Signature> for SignatureBuf {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self.as_signature()
    }
}

impl fmt::Debug for SignatureBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_signature(), f)
    }
}

impl fmt::Display for SignatureBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_signature(), f)
    }
}

impl TryFrom<&str> for SignatureBuf {
    type Error = SignatureError;

    #[inline]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_owned())
    }
}

impl TryFrom<String> for SignatureBuf {
    type Error = SignatureError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<Signature> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &Signature) -> bool {
        self.as_signature() == other
    }
}

impl PartialEq<&str> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.data == *other
    }
}
