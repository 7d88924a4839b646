use std::error;
use std::fmt;

use crate::proto::Type;

/// Detailed errors raised when validation of a [`Signature`] fails.
///
/// [`Signature`]: crate::signature::Signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureError {
    kind: SignatureErrorKind,
}

impl SignatureError {
    /// Construct a new signature error.
    pub(crate) const fn new(kind: SignatureErrorKind) -> Self {
        Self { kind }
    }

    /// Indicate that a signature is too long.
    pub const fn too_long() -> Self {
        Self::new(SignatureErrorKind::SignatureTooLong)
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &SignatureErrorKind {
        &self.kind
    }
}

/// The specific reason a [`SignatureError`] was raised.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureErrorKind {
    UnknownTypeCode(Type),
    SignatureTooLong,
    MissingArrayElementType,
    StructEndedButNotStarted,
    DictEndedButNotStarted,
    StructStartedButNotEnded,
    DictStartedButNotEnded,
    StructHasNoFields,
    DictKeyMustBeBasicType,
    DictEntryHasNoFields,
    DictEntryHasOnlyOneField,
    DictEntryNotInsideArray,
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
    ExceededMaximumDepth,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SignatureErrorKind::UnknownTypeCode(code) => {
                write!(f, "unknown type code: {code:?}")
            }
            SignatureErrorKind::SignatureTooLong => write!(f, "signature too long"),
            SignatureErrorKind::MissingArrayElementType => {
                write!(f, "missing array element type")
            }
            SignatureErrorKind::StructEndedButNotStarted => {
                write!(f, "struct ended but not started")
            }
            SignatureErrorKind::DictEndedButNotStarted => {
                write!(f, "dict entry ended but not started")
            }
            SignatureErrorKind::StructStartedButNotEnded => {
                write!(f, "struct started but not ended")
            }
            SignatureErrorKind::DictStartedButNotEnded => {
                write!(f, "dict entry started but not ended")
            }
            SignatureErrorKind::StructHasNoFields => write!(f, "struct has no fields"),
            SignatureErrorKind::DictKeyMustBeBasicType => {
                write!(f, "dict entry key must be a basic type")
            }
            SignatureErrorKind::DictEntryHasNoFields => write!(f, "dict entry has no fields"),
            SignatureErrorKind::DictEntryHasOnlyOneField => {
                write!(f, "dict entry has only one field")
            }
            SignatureErrorKind::DictEntryNotInsideArray => {
                write!(f, "dict entry used outside of an array")
            }
            SignatureErrorKind::ExceededMaximumArrayRecursion => {
                write!(f, "exceeded maximum array nesting depth")
            }
            SignatureErrorKind::ExceededMaximumStructRecursion => {
                write!(f, "exceeded maximum struct nesting depth")
            }
            SignatureErrorKind::ExceededMaximumDepth => {
                write!(f, "exceeded maximum combined container nesting depth")
            }
        }
    }
}

impl error::Error for SignatureError {}
