use std::fmt;
use std::num::NonZeroU32;

/// An opaque, nonzero message serial number, unique per connection and
/// monotonically assigned by the sender.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Serial(NonZeroU32);

impl Serial {
    #[inline]
    pub(crate) fn new(serial: NonZeroU32) -> Self {
        Self(serial)
    }

    /// Construct a serial from a raw `u32`.
    ///
    /// Returns `None` for the reserved value `0`.
    #[inline]
    pub fn from_u32(serial: u32) -> Option<Self> {
        Some(Self(NonZeroU32::new(serial)?))
    }

    /// The raw serial number.
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Serial {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// A monotonic, connection-local serial number allocator. Serial `0` is
/// reserved by the protocol, so the first serial issued is `1`.
#[derive(Debug)]
pub(crate) struct SerialAllocator {
    next: u32,
}

impl SerialAllocator {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn next_serial(&mut self) -> Serial {
        let serial = Serial::new(NonZeroU32::new(self.next).expect("serial overflowed to zero"));
        self.next = self.next.wrapping_add(1);

        if self.next == 0 {
            self.next = 1;
        }

        serial
    }
}
