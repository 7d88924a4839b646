use dbus_peer_core::signature::SignatureBuf;

use crate::names::{BusName, ErrorName, InterfaceName, MemberName};
use crate::object_path::ObjectPathBuf;

use super::Serial;

/// A single `(y,v)` header field, decoded into its concrete Rust shape
/// rather than kept as a generic [`Value`](crate::value::Value).
///
/// Messages carry these sparsely: a header is just a `Vec<HeaderField>`, in
/// contrast to the marshaller's body [`Value`](crate::value::Value) tree
/// which must mirror the wire dict-entry/variant shape exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderField {
    /// `PATH`
    Path(ObjectPathBuf),
    /// `INTERFACE`
    Interface(InterfaceName),
    /// `MEMBER`
    Member(MemberName),
    /// `ERROR_NAME`
    ErrorName(ErrorName),
    /// `REPLY_SERIAL`
    ReplySerial(Serial),
    /// `DESTINATION`
    Destination(BusName),
    /// `SENDER`
    Sender(BusName),
    /// `SIGNATURE`
    Signature(SignatureBuf),
    /// `UNIX_FDS`
    UnixFds(u32),
}

impl HeaderField {
    pub(crate) fn code(&self) -> crate::proto::HeaderFieldCode {
        use crate::proto::HeaderFieldCode as C;

        match self {
            HeaderField::Path(_) => C::PATH,
            HeaderField::Interface(_) => C::INTERFACE,
            HeaderField::Member(_) => C::MEMBER,
            HeaderField::ErrorName(_) => C::ERROR_NAME,
            HeaderField::ReplySerial(_) => C::REPLY_SERIAL,
            HeaderField::Destination(_) => C::DESTINATION,
            HeaderField::Sender(_) => C::SENDER,
            HeaderField::Signature(_) => C::SIGNATURE,
            HeaderField::UnixFds(_) => C::UNIX_FDS,
        }
    }
}
