use crate::proto::{Type, MAX_CONTAINER_DEPTH, MAX_SIGNATURE};

use super::stack::{Kind, Stack};
use super::{SignatureError, SignatureErrorKind};

/// Validate a signature byte string against the D-Bus type grammar.
///
/// This is total: it either validates the whole string or fails, it never
/// stops partway through leaving an ambiguous result.
pub(super) fn validate(bytes: &[u8]) -> Result<(), SignatureError> {
    use SignatureErrorKind::*;

    if bytes.len() > MAX_SIGNATURE {
        return Err(SignatureError::new(SignatureTooLong));
    }

    let mut stack = Stack::new();
    let mut arrays = 0usize;
    let mut structs = 0usize;

    for &b in bytes {
        let t = Type::new(b);

        let mut is_basic = match t {
            Type::BYTE
            | Type::BOOLEAN
            | Type::INT16
            | Type::UINT16
            | Type::INT32
            | Type::UINT32
            | Type::INT64
            | Type::UINT64
            | Type::DOUBLE
            | Type::STRING
            | Type::OBJECT_PATH
            | Type::SIGNATURE
            | Type::VARIANT
            | Type::UNIX_FD => true,
            Type::ARRAY => {
                if arrays == MAX_CONTAINER_DEPTH || !stack.push(Kind::Array) {
                    return Err(SignatureError::new(ExceededMaximumArrayRecursion));
                }
                arrays += 1;
                continue;
            }
            Type::OPEN_PAREN => {
                if structs == MAX_CONTAINER_DEPTH || !stack.push(Kind::Struct) {
                    return Err(SignatureError::new(ExceededMaximumStructRecursion));
                }
                structs += 1;
                continue;
            }
            Type::CLOSE_PAREN => {
                let n = match stack.pop() {
                    Some((Kind::Struct, n)) => n,
                    Some((Kind::Array, _)) => {
                        return Err(SignatureError::new(MissingArrayElementType));
                    }
                    _ => return Err(SignatureError::new(StructEndedButNotStarted)),
                };

                if n == 0 {
                    return Err(SignatureError::new(StructHasNoFields));
                }

                structs -= 1;
                false
            }
            Type::OPEN_BRACE => {
                if !stack.push(Kind::Dict) {
                    return Err(SignatureError::new(ExceededMaximumDepth));
                }
                continue;
            }
            Type::CLOSE_BRACE => {
                let n = match stack.pop() {
                    Some((Kind::Dict, n)) => n,
                    Some((Kind::Array, _)) => {
                        return Err(SignatureError::new(MissingArrayElementType));
                    }
                    _ => return Err(SignatureError::new(DictEndedButNotStarted)),
                };

                match n {
                    0 => return Err(SignatureError::new(DictEntryHasNoFields)),
                    1 => return Err(SignatureError::new(DictEntryHasOnlyOneField)),
                    _ => {}
                }

                if !matches!(stack.peek(), Some((Kind::Array, _))) {
                    return Err(SignatureError::new(DictEntryNotInsideArray));
                }

                false
            }
            t => return Err(SignatureError::new(UnknownTypeCode(t))),
        };

        // An array element's own basic-ness doesn't matter to its container;
        // "aai" is a struct/dict field of kind array regardless of the fact
        // that its element is basic.
        while let Some((Kind::Array, _)) = stack.peek() {
            stack.pop();
            is_basic = false;
        }

        if let Some((Kind::Dict, 0)) = stack.peek() {
            if !is_basic {
                return Err(SignatureError::new(DictKeyMustBeBasicType));
            }
        }

        stack.bump_top();
    }

    if !stack.is_empty() {
        return match stack.pop() {
            Some((Kind::Array, _)) => Err(SignatureError::new(MissingArrayElementType)),
            Some((Kind::Struct, _)) => Err(SignatureError::new(StructStartedButNotEnded)),
            Some((Kind::Dict, _)) => Err(SignatureError::new(DictStartedButNotEnded)),
            None => unreachable!(),
        };
    }

    Ok(())
}
