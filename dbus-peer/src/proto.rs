//! Low level wire constants for the D-Bus protocol: message types, header
//! field codes, and the flags byte.

#[doc(inline)]
pub use dbus_peer_core::proto::Endianness;

raw_enum! {
    /// The type of a message, the third byte of the fixed header.
    #[repr(u8)]
    pub enum MessageType {
        /// Method call. May prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply; body's first argument, if present, is a human-readable
        /// error message.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags carried in a message's fixed header.
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// The sender does not expect a reply, even for a message type that
        /// can have one; the reply should be omitted.
        NO_REPLY_EXPECTED = 1,
        /// The bus must not launch an owner for the destination name in
        /// response to this message.
        NO_AUTO_START = 2,
        /// The caller is prepared to wait for interactive authorization.
        ALLOW_INTERACTIVE_AUTHORIZATION = 4,
    }
}

raw_enum! {
    /// The code of a single `(y,v)` header field.
    #[repr(u8)]
    pub enum HeaderFieldCode {
        /// The object path the call targets or the signal originates from.
        PATH = 1,
        /// The interface a method call targets or a signal is emitted from.
        INTERFACE = 2,
        /// The method or signal name.
        MEMBER = 3,
        /// The name of the error that occurred, for `ERROR` messages.
        ERROR_NAME = 4,
        /// The serial of the message this one replies to.
        REPLY_SERIAL = 5,
        /// The bus name the message is addressed to.
        DESTINATION = 6,
        /// The unique name of the sending connection.
        SENDER = 7,
        /// The signature of the message body.
        SIGNATURE = 8,
        /// The number of Unix file descriptors that accompany the message.
        UNIX_FDS = 9,
    }
}

/// Protocol version implemented, per the D-Bus specification.
pub const PROTOCOL_VERSION: u8 = 1;
