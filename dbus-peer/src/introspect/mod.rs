//! The introspection data model (nodes, interfaces, methods, signals,
//! properties) and its XML representation, as exchanged by
//! `org.freedesktop.DBus.Introspectable.Introspect`.

pub use self::model::{
    Access, Annotation, Argument, Direction, EmitsChangedSignal, Interface, Method, Node, Property,
    Signal,
};
mod model;

pub use self::parse::parse_node;
mod parse;

pub use self::write::write_node;
mod write;

#[cfg(test)]
mod tests;
