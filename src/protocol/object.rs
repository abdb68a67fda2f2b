//! Per-connection object table and destroy listeners

use super::client::ClientId;
use super::interfaces::Interface;
use crate::display::Display;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// First id of the range allocated by the server rather than the client
pub const SERVER_ID_START: u32 = 0xff00_0000;

/// Numeric object id, unique within one connection
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// The `wl_display` singleton every connection starts with
    pub const DISPLAY: ObjectId = ObjectId(1);

    /// Null object reference in nullable object arguments
    pub const NULL: ObjectId = ObjectId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn protocol_id(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn is_server_allocated(self) -> bool {
        self.0 >= SERVER_ID_START
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique handle for an object: owning connection plus id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub client: ClientId,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(client: ClientId, id: ObjectId) -> Self {
        Self { client, id }
    }
}

/// Identifies one destroy listener so its owner can withdraw it
///
/// Registering a second listener with an equal key replaces the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub owner: ObjectRef,
    pub tag: &'static str,
}

impl ListenerKey {
    pub fn new(owner: ObjectRef, tag: &'static str) -> Self {
        Self { owner, tag }
    }
}

/// Callback fired after an object has been removed from its table
pub type DestroyListener = Box<dyn FnOnce(&mut Display, ObjectRef) + Send>;

/// A live entry in the object table
pub struct ObjectEntry {
    pub id: ObjectId,
    pub interface: Interface,
    pub version: u32,
    listeners: Vec<(ListenerKey, DestroyListener)>,
}

impl ObjectEntry {
    fn new(id: ObjectId, interface: Interface, version: u32) -> Self {
        Self {
            id,
            interface,
            version,
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("id", &self.id)
            .field("interface", &self.interface)
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Why an id could not be inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The id is zero, in the wrong range, live, or was used before
    InvalidId,
    /// The table is at its configured capacity
    Exhausted,
}

/// The objects owned by one connection
#[derive(Debug)]
pub struct ObjectTable {
    objects: HashMap<ObjectId, ObjectEntry>,
    /// Ids destroyed during this connection; never handed out again
    retired: HashSet<ObjectId>,
    next_server_id: u32,
    capacity: usize,
}

impl ObjectTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            objects: HashMap::new(),
            retired: HashSet::new(),
            next_server_id: SERVER_ID_START,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn was_retired(&self, id: ObjectId) -> bool {
        self.retired.contains(&id)
    }

    /// Inserts an object with a client-chosen id
    pub fn insert(
        &mut self,
        id: ObjectId,
        interface: Interface,
        version: u32,
    ) -> Result<(), InsertError> {
        if id.protocol_id() == 0
            || id.is_server_allocated()
            || self.objects.contains_key(&id)
            || self.retired.contains(&id)
        {
            return Err(InsertError::InvalidId);
        }
        self.insert_unchecked(id, interface, version)
    }

    /// Inserts an object in the server-allocated id range
    pub fn insert_server(
        &mut self,
        interface: Interface,
        version: u32,
    ) -> Result<ObjectId, InsertError> {
        if self.next_server_id == u32::MAX {
            return Err(InsertError::Exhausted);
        }
        let id = ObjectId::new(self.next_server_id);
        self.insert_unchecked(id, interface, version)?;
        self.next_server_id += 1;
        Ok(id)
    }

    fn insert_unchecked(
        &mut self,
        id: ObjectId,
        interface: Interface,
        version: u32,
    ) -> Result<(), InsertError> {
        if self.objects.len() >= self.capacity {
            return Err(InsertError::Exhausted);
        }
        self.objects
            .insert(id, ObjectEntry::new(id, interface, version));
        Ok(())
    }

    /// Removes an object and hands back its listeners in registration order
    pub fn remove(&mut self, id: ObjectId) -> Option<(ObjectEntry, Vec<DestroyListener>)> {
        let mut entry = self.objects.remove(&id)?;
        self.retired.insert(id);
        let listeners = entry
            .listeners
            .drain(..)
            .map(|(_, listener)| listener)
            .collect();
        Some((entry, listeners))
    }

    /// Registers a destroy listener; returns false if the object is not live
    pub fn add_listener(
        &mut self,
        id: ObjectId,
        key: ListenerKey,
        listener: DestroyListener,
    ) -> bool {
        match self.objects.get_mut(&id) {
            Some(entry) => {
                if let Some(slot) = entry.listeners.iter_mut().find(|(k, _)| *k == key) {
                    debug!("Replacing destroy listener {:?} on {}", key.tag, id);
                    slot.1 = listener;
                } else {
                    entry.listeners.push((key, listener));
                }
                true
            }
            None => false,
        }
    }

    /// Withdraws a destroy listener; returns true if one was registered
    pub fn remove_listener(&mut self, id: ObjectId, key: ListenerKey) -> bool {
        match self.objects.get_mut(&id) {
            Some(entry) => {
                let before = entry.listeners.len();
                entry.listeners.retain(|(k, _)| *k != key);
                entry.listeners.len() != before
            }
            None => false,
        }
    }

    pub fn listener_count(&self, id: ObjectId) -> usize {
        self.objects.get(&id).map_or(0, |e| e.listeners.len())
    }

    /// Ids of all live objects, in ascending order
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.objects.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: &'static str) -> ListenerKey {
        ListenerKey::new(ObjectRef::new(ClientId::new(1), ObjectId::new(50)), tag)
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut table = ObjectTable::new(16);
        table.insert(ObjectId::new(2), Interface::WlSurface, 4).unwrap();
        assert_eq!(
            table.insert(ObjectId::new(2), Interface::WlSurface, 4),
            Err(InsertError::InvalidId)
        );

        table.remove(ObjectId::new(2)).unwrap();
        assert!(table.was_retired(ObjectId::new(2)));
        assert_eq!(
            table.insert(ObjectId::new(2), Interface::WlSurface, 4),
            Err(InsertError::InvalidId)
        );
    }

    #[test]
    fn test_client_cannot_claim_server_range() {
        let mut table = ObjectTable::new(16);
        assert_eq!(
            table.insert(ObjectId::new(SERVER_ID_START + 3), Interface::WlSurface, 1),
            Err(InsertError::InvalidId)
        );
        let id = table.insert_server(Interface::WlBuffer, 1).unwrap();
        assert!(id.is_server_allocated());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut table = ObjectTable::new(1);
        table.insert(ObjectId::new(2), Interface::WlSurface, 1).unwrap();
        assert_eq!(
            table.insert(ObjectId::new(3), Interface::WlSurface, 1),
            Err(InsertError::Exhausted)
        );
    }

    #[test]
    fn test_listener_keys_replace_and_remove() {
        let mut table = ObjectTable::new(4);
        let id = ObjectId::new(2);
        table.insert(id, Interface::WlSurface, 1).unwrap();

        assert!(table.add_listener(id, key("focus"), Box::new(|_, _| {})));
        assert!(table.add_listener(id, key("focus"), Box::new(|_, _| {})));
        assert!(table.add_listener(id, key("parent"), Box::new(|_, _| {})));
        assert_eq!(table.listener_count(id), 2);

        assert!(table.remove_listener(id, key("focus")));
        assert!(!table.remove_listener(id, key("focus")));

        let (_, listeners) = table.remove(id).unwrap();
        assert_eq!(listeners.len(), 1);
        assert!(!table.add_listener(id, key("late"), Box::new(|_, _| {})));
    }
}
