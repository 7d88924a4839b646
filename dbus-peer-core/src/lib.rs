//! Core types for the D-Bus protocol.
//!
//! This is split out from the main `dbus-peer` crate the way the type
//! signature grammar is generally kept free of I/O and allocation policy
//! concerns, so it can be reused by tooling that only needs to validate or
//! tokenize signatures.

#![allow(clippy::module_inception)]

pub mod proto;
pub mod signature;
