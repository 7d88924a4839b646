//! Low level constants of the D-Bus wire protocol.

/// A single D-Bus type code, as it appears in a signature string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Type(pub u8);

#[allow(non_upper_case_globals, missing_docs)]
impl Type {
    pub const BYTE: Self = Self(b'y');
    pub const BOOLEAN: Self = Self(b'b');
    pub const INT16: Self = Self(b'n');
    pub const UINT16: Self = Self(b'q');
    pub const INT32: Self = Self(b'i');
    pub const UINT32: Self = Self(b'u');
    pub const INT64: Self = Self(b'x');
    pub const UINT64: Self = Self(b't');
    pub const DOUBLE: Self = Self(b'd');
    pub const STRING: Self = Self(b's');
    pub const OBJECT_PATH: Self = Self(b'o');
    pub const SIGNATURE: Self = Self(b'g');
    pub const VARIANT: Self = Self(b'v');
    pub const UNIX_FD: Self = Self(b'h');
    pub const ARRAY: Self = Self(b'a');
    pub const OPEN_PAREN: Self = Self(b'(');
    pub const CLOSE_PAREN: Self = Self(b')');
    pub const OPEN_BRACE: Self = Self(b'{');
    pub const CLOSE_BRACE: Self = Self(b'}');

    /// Construct a type code from a raw byte.
    #[inline]
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    /// Test if this type is a fixed-size basic type and return its alignment,
    /// or `None` if it is not a basic fixed-width type.
    pub const fn fixed_alignment(self) -> Option<u8> {
        match self.0 {
            b'y' => Some(1),
            b'b' | b'n' | b'q' => Some(2),
            b'i' | b'u' | b'h' => Some(4),
            b'x' | b't' | b'd' => Some(8),
            _ => None,
        }
    }
}

impl core::fmt::Debug for Type {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.0 as char).is_ascii_graphic() {
            true => write!(f, "{:?}", self.0 as char),
            false => write!(f, "0x{:02x}", self.0),
        }
    }
}

/// Maximum number of array and struct nesting levels combined, as mandated by
/// the D-Bus specification.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of array nesting levels.
pub const MAX_CONTAINER_DEPTH: usize = 32;

/// Maximum length in bytes of a signature string.
pub const MAX_SIGNATURE: usize = u8::MAX as usize;

/// Maximum length in bytes of an array's marshalled contents.
pub const MAX_ARRAY_LENGTH: u32 = 64 * 1024 * 1024;

/// Maximum length in bytes of a message body.
pub const MAX_BODY_LENGTH: u32 = 128 * 1024 * 1024;

/// The endianness of a marshalled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little-endian (`'l'` on the wire).
    Little,
    /// Big-endian (`'B'` on the wire).
    Big,
}

impl Endianness {
    /// The endianness native to the target this crate was built for.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;

    /// Decode the endian mark byte used in message headers.
    pub const fn from_mark(byte: u8) -> Option<Self> {
        match byte {
            b'l' => Some(Self::Little),
            b'B' => Some(Self::Big),
            _ => None,
        }
    }

    /// The endian mark byte used in message headers.
    pub const fn mark(self) -> u8 {
        match self {
            Self::Little => b'l',
            Self::Big => b'B',
        }
    }
}
