//! Protocol object runtime building blocks
//!
//! This module holds everything that is independent of what a particular
//! interface means: the wire representation of messages, interface
//! descriptors, per-connection object tables, globals and the error
//! taxonomy. The [`Display`](crate::display::Display) ties these together
//! and routes decoded requests to the shell and input subsystems.
//!
//! # Object lifetime
//!
//! Every protocol object is owned by exactly one connection's
//! [`ObjectTable`]. Other parts of the server never hold an object directly;
//! they keep an [`ObjectRef`] and register a keyed destroy listener so they
//! are told, synchronously and in registration order, when the object goes
//! away. Listeners run after the object has left the table, so a listener
//! can never observe (or re-destroy) the object being destroyed.

pub mod client;
pub mod error;
pub mod global;
pub mod interface;
pub mod interfaces;
pub mod object;
pub mod wire;

pub use client::{Client, ClientId, ClientInfo, ClientState, ProtocolEvent};
pub use error::{DispatchError, ProtocolError};
pub use global::{Global, GlobalError, GlobalId};
pub use interface::{InterfaceDescriptor, InterfaceRegistry, MessageDesc};
pub use interfaces::Interface;
pub use object::{ListenerKey, ObjectId, ObjectRef};
pub use wire::{Argument, ArgumentExt, Fixed, Message};
