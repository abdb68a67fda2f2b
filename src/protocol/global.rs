//! Globals advertised through `wl_registry`

use super::client::ClientInfo;
use super::error::DispatchError;
use super::interfaces::Interface;
use super::object::ObjectRef;
use crate::display::Display;
use std::fmt;
use thiserror::Error;

/// Registry name of a global, stable for the server's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(u32);

impl GlobalId {
    pub const fn new(name: u32) -> Self {
        Self(name)
    }

    pub const fn name(self) -> u32 {
        self.0
    }
}

/// Runs right after a client bound a global, e.g. to send initial state
pub type BindHook = fn(&mut Display, ObjectRef) -> Result<(), DispatchError>;

/// Decides whether a client may see and bind a global, by interface name
pub type GlobalFilter = Box<dyn Fn(&ClientInfo, &str) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Global {
    pub id: GlobalId,
    pub interface: Interface,
    pub max_version: u32,
    pub on_bind: Option<BindHook>,
}

impl Global {
    /// Version an object is bound at for a given client request
    pub fn effective_version(&self, requested: u32) -> u32 {
        requested.min(self.max_version)
    }
}

impl fmt::Debug for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Global")
            .field("id", &self.id)
            .field("interface", &self.interface.name())
            .field("max_version", &self.max_version)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GlobalError {
    #[error("global limit of {0} reached")]
    Exhausted(usize),
    #[error("{interface} supports at most version {supported}, not {requested}")]
    UnsupportedVersion {
        interface: &'static str,
        supported: u32,
        requested: u32,
    },
}

pub struct GlobalList {
    globals: Vec<Global>,
    next_name: u32,
    limit: usize,
    filter: Option<GlobalFilter>,
}

impl GlobalList {
    pub fn new(limit: usize) -> Self {
        Self {
            globals: Vec::new(),
            next_name: 1,
            limit,
            filter: None,
        }
    }

    pub fn add(
        &mut self,
        interface: Interface,
        max_version: u32,
        on_bind: Option<BindHook>,
    ) -> Result<Global, GlobalError> {
        let supported = interface.descriptor().version;
        if max_version == 0 || max_version > supported {
            return Err(GlobalError::UnsupportedVersion {
                interface: interface.name(),
                supported,
                requested: max_version,
            });
        }
        if self.globals.len() >= self.limit {
            return Err(GlobalError::Exhausted(self.limit));
        }

        let global = Global {
            id: GlobalId::new(self.next_name),
            interface,
            max_version,
            on_bind,
        };
        self.next_name += 1;
        self.globals.push(global.clone());
        Ok(global)
    }

    pub fn remove(&mut self, id: GlobalId) -> Option<Global> {
        let index = self.globals.iter().position(|g| g.id == id)?;
        Some(self.globals.remove(index))
    }

    pub fn get(&self, id: GlobalId) -> Option<&Global> {
        self.globals.iter().find(|g| g.id == id)
    }

    pub fn set_filter(&mut self, filter: GlobalFilter) {
        self.filter = Some(filter);
    }

    pub fn is_visible(&self, client: &ClientInfo, global: &Global) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter(client, global.interface.name()))
    }

    /// Globals the given client is allowed to see, in advertisement order
    pub fn visible_to<'a>(&'a self, client: &'a ClientInfo) -> impl Iterator<Item = &'a Global> + 'a {
        self.globals
            .iter()
            .filter(move |g| self.is_visible(client, g))
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Global> {
        self.globals.iter()
    }
}

impl fmt::Debug for GlobalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalList")
            .field("globals", &self.globals)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_version_is_clamped() {
        let mut list = GlobalList::new(8);
        let global = list.add(Interface::XdgWmBase, 3, None).unwrap();
        assert_eq!(global.effective_version(5), 3);
        assert_eq!(global.effective_version(2), 2);
    }

    #[test]
    fn test_names_are_not_reused_after_removal() {
        let mut list = GlobalList::new(8);
        let a = list.add(Interface::WlSeat, 5, None).unwrap();
        list.remove(a.id).unwrap();
        let b = list.add(Interface::WlSeat, 5, None).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_limit_and_version_checks() {
        let mut list = GlobalList::new(1);
        assert!(matches!(
            list.add(Interface::WlSeat, 9, None),
            Err(GlobalError::UnsupportedVersion { .. })
        ));
        list.add(Interface::WlSeat, 5, None).unwrap();
        assert_eq!(
            list.add(Interface::WlOutput, 2, None).unwrap_err(),
            GlobalError::Exhausted(1)
        );
    }

    #[test]
    fn test_filter_hides_globals() {
        let mut list = GlobalList::new(8);
        list.add(Interface::WlSeat, 5, None).unwrap();
        list.add(Interface::LayerShell, 1, None).unwrap();
        list.set_filter(Box::new(|client, interface| {
            interface != "zwlr_layer_shell_v1" || client.app_name.as_deref() == Some("panel")
        }));

        let plain = ClientInfo::named("editor");
        let panel = ClientInfo::named("panel");
        assert_eq!(list.visible_to(&plain).count(), 1);
        assert_eq!(list.visible_to(&panel).count(), 2);
    }
}
