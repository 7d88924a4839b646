#[macro_use]
mod macros;

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

pub mod proto;

pub mod address;

pub mod sasl;

pub use dbus_peer_core::signature;

pub mod names;

pub mod object_path;

#[doc(inline)]
pub use self::value::Value;
pub mod value;

pub mod message;

pub mod introspect;

#[cfg(feature = "tokio")]
mod transport;

#[doc(inline)]
#[cfg(feature = "tokio")]
pub use self::bus::MessageBus;
#[cfg(feature = "tokio")]
pub mod bus;

#[doc(inline)]
#[cfg(feature = "tokio")]
pub use self::proxy::Proxy;
#[cfg(feature = "tokio")]
pub mod proxy;
