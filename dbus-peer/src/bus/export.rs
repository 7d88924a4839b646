use std::future::Future;
use std::pin::Pin;

use crate::error::{Error, ErrorKind, Result};
use crate::introspect::Interface as InterfaceSchema;
use crate::value::Value;

/// An object exported at a path via [`super::MessageBus::export`].
///
/// Method dispatch returns a boxed future rather than being an `async fn`
/// (this trait is used as `Arc<dyn ExportedInterface>`, and the crate avoids
/// pulling in an `async-trait`-style proc macro for a single trait).
pub trait ExportedInterface: Send + Sync {
    /// The interface's schema, used both for dispatch validation and to
    /// synthesize `Introspectable.Introspect` responses.
    fn schema(&self) -> &InterfaceSchema;

    /// Invoke `member` with the already-decoded `in` arguments, returning
    /// the `out` arguments of a `METHOD_RETURN`, or an [`Error::dbus`] to be
    /// sent back as an `ERROR` reply.
    fn call<'a>(
        &'a self,
        member: &'a str,
        args: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>>> + Send + 'a>>;

    /// Read a property's current value for `org.freedesktop.DBus.Properties.Get`.
    /// The default rejects every property; interfaces with properties
    /// override this.
    fn get_property<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        let name = name.to_owned();
        Box::pin(async move {
            Err(Error::from(ErrorKind::InterfaceNotFound(format!(
                "no such property: {name}"
            ))))
        })
    }

    /// Write a property's value for `org.freedesktop.DBus.Properties.Set`.
    /// The default rejects every property.
    fn set_property<'a>(
        &'a self,
        name: &'a str,
        _value: Value,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let name = name.to_owned();
        Box::pin(async move {
            Err(Error::from(ErrorKind::InterfaceNotFound(format!(
                "no such property: {name}"
            ))))
        })
    }
}
