//! Interface descriptors and the interface registry
//!
//! Descriptors are the static `wayland_backend` tables: the name, the highest
//! version the server implements and the ordered request/event signatures.
//! The registry indexes them by name and is immutable once built, so it can
//! be shared between connections without locking.

use super::interfaces::Interface;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
pub use wayland_backend::protocol::{Interface as InterfaceDescriptor, MessageDesc, ANONYMOUS_INTERFACE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("interface {0} registered twice")]
    Duplicate(&'static str),
    #[error("interface {0} declares version 0")]
    ZeroVersion(&'static str),
}

/// Name-indexed set of known interfaces
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    by_name: HashMap<&'static str, Interface>,
}

impl InterfaceRegistry {
    pub fn builder() -> InterfaceRegistryBuilder {
        InterfaceRegistryBuilder::default()
    }

    /// Registry containing every interface this crate implements
    pub fn standard() -> Arc<InterfaceRegistry> {
        let mut builder = Self::builder();
        for interface in Interface::ALL {
            // The built-in set has unique names and non-zero versions.
            if let Err(e) = builder.register(*interface) {
                debug!("Skipping built-in interface: {}", e);
            }
        }
        builder.build()
    }

    pub fn lookup(&self, name: &str) -> Option<Interface> {
        self.by_name.get(name).copied()
    }

    pub fn descriptor(&self, name: &str) -> Option<&'static InterfaceDescriptor> {
        self.lookup(name).map(Interface::descriptor)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Default)]
pub struct InterfaceRegistryBuilder {
    registry: InterfaceRegistry,
}

impl InterfaceRegistryBuilder {
    pub fn register(&mut self, interface: Interface) -> Result<&mut Self, RegistryError> {
        let desc = interface.descriptor();
        if desc.version == 0 {
            return Err(RegistryError::ZeroVersion(desc.name));
        }
        if self.registry.by_name.contains_key(desc.name) {
            return Err(RegistryError::Duplicate(desc.name));
        }
        self.registry.by_name.insert(desc.name, interface);
        Ok(self)
    }

    /// Freezes the registry; it cannot be modified afterwards
    pub fn build(self) -> Arc<InterfaceRegistry> {
        Arc::new(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_knows_every_interface() {
        let registry = InterfaceRegistry::standard();
        assert_eq!(registry.len(), Interface::ALL.len());
        assert_eq!(registry.lookup("xdg_wm_base"), Some(Interface::XdgWmBase));
        assert_eq!(
            registry.descriptor("zwlr_layer_surface_v1").map(|d| d.requests.len()),
            Some(8)
        );
        assert!(registry.lookup("wl_shell").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut builder = InterfaceRegistry::builder();
        builder.register(Interface::WlSeat).unwrap();
        assert_eq!(
            builder.register(Interface::WlSeat).err(),
            Some(RegistryError::Duplicate("wl_seat"))
        );
    }

    #[test]
    fn test_message_versions() {
        let frame = Interface::WlPointer.event(5).unwrap();
        assert_eq!(frame.name, "frame");
        assert_eq!(frame.since, 5);
        assert!(Interface::WlPointer.request(1).unwrap().is_destructor);
        assert!(Interface::WlPointer.request(2).is_none());
    }
}
