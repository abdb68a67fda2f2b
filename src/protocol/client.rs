//! Per-connection client state
//!
//! A [`Client`] owns its object table, its serial counter and the queue of
//! events waiting to be flushed to the transport. Once a fatal error has
//! been posted the client is closed: no further events are queued and no
//! further requests are dispatched.

use super::error::{DisplayError, ProtocolError};
use super::interfaces::Interface;
use super::object::{ObjectId, ObjectTable};
use super::wire::{self, Argument, ArgumentExt, Message};
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::fmt;

/// Opcode of `wl_display.error`
const DISPLAY_ERROR: u16 = 0;
/// Opcode of `wl_display.delete_id`
const DISPLAY_DELETE_ID: u16 = 1;
/// Opcode of `wl_display.implementation_error`
const DISPLAY_IMPLEMENTATION_ERROR: u16 = 2;

/// First display version on which implementation errors are non-fatal
pub const IMPLEMENTATION_ERROR_SINCE: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Identity of a connected application, as reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub app_name: Option<String>,
    pub pid: Option<u32>,
}

impl ClientInfo {
    pub fn named(app_name: impl Into<String>) -> Self {
        Self {
            app_name: Some(app_name.into()),
            pid: None,
        }
    }
}

/// A typed event that can be turned into wire arguments
pub trait ProtocolEvent {
    fn opcode(&self) -> u16;
    fn into_args(self) -> Vec<Argument>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    /// Closed after a fatal error
    Closed(ProtocolError),
}

#[derive(Debug)]
pub struct Client {
    id: ClientId,
    info: ClientInfo,
    pub(crate) objects: ObjectTable,
    state: ClientState,
    serial: u32,
    implementation_errors: u32,
    outgoing: VecDeque<Message>,
}

impl Client {
    pub(crate) fn new(id: ClientId, info: ClientInfo, display_version: u32, capacity: usize) -> Self {
        let mut objects = ObjectTable::new(capacity.max(1));
        // The display object pre-exists on every connection.
        if objects
            .insert(ObjectId::DISPLAY, Interface::WlDisplay, display_version)
            .is_err()
        {
            error!("Could not seed display object for {:?}", id);
        }
        Self {
            id,
            info,
            objects,
            state: ClientState::Connected,
            serial: 0,
            implementation_errors: 0,
            outgoing: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn display_version(&self) -> u32 {
        self.objects
            .get(ObjectId::DISPLAY)
            .map_or(1, |entry| entry.version)
    }

    /// Interface and bound version of a live object
    pub fn object_info(&self, id: ObjectId) -> Option<(Interface, u32)> {
        self.objects.get(id).map(|e| (e.interface, e.version))
    }

    /// Returns the next serial for this connection
    pub fn next_serial(&mut self) -> u32 {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    /// The most recently issued serial
    pub fn last_serial(&self) -> u32 {
        self.serial
    }

    /// Queues an event; returns false if it was not sent
    ///
    /// Events the object's bound version does not know are dropped, as are
    /// events for dead objects or closed connections.
    pub fn send_event(&mut self, object: ObjectId, opcode: u16, args: Vec<Argument>) -> bool {
        if !self.is_connected() {
            return false;
        }

        let Some(entry) = self.objects.get(object) else {
            debug!("Dropping event {} for dead object {}", opcode, object);
            return false;
        };
        let Some(desc) = entry.interface.event(opcode) else {
            error!("{} has no event with opcode {}", entry.interface.name(), opcode);
            return false;
        };
        if desc.since > entry.version {
            return false;
        }
        if let Err(e) = wire::check_signature(desc.signature, &args) {
            error!("Refusing malformed {}.{} event: {}", entry.interface.name(), desc.name, e);
            return false;
        }

        self.outgoing.push_back(Message::new(object, opcode, args));
        true
    }

    pub fn send<E: ProtocolEvent>(&mut self, object: ObjectId, event: E) -> bool {
        let opcode = event.opcode();
        self.send_event(object, opcode, event.into_args())
    }

    pub(crate) fn send_delete_id(&mut self, id: ObjectId) {
        self.send_event(
            ObjectId::DISPLAY,
            DISPLAY_DELETE_ID,
            vec![Argument::Uint(id.protocol_id())],
        );
    }

    /// Sends a fatal error and closes the connection
    pub fn post_error(&mut self, error: ProtocolError) {
        if !self.is_connected() {
            return;
        }
        warn!(
            "❌ Protocol error for {:?}: object {} code {}: {}",
            self.id, error.object, error.code, error.message
        );
        self.send_event(
            ObjectId::DISPLAY,
            DISPLAY_ERROR,
            vec![
                Argument::object(error.object),
                Argument::Uint(error.code),
                Argument::string(error.message.clone()),
            ],
        );
        self.state = ClientState::Closed(error);
    }

    pub fn post_no_memory(&mut self, object: ObjectId) {
        self.post_error(ProtocolError::new(object, DisplayError::NoMemory, "no memory"));
    }

    /// Reports a server-side failure; returns true if the connection survives
    pub fn post_implementation_error(&mut self, object: ObjectId, description: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        if self.display_version() < IMPLEMENTATION_ERROR_SINCE {
            self.post_no_memory(object);
            return false;
        }

        self.implementation_errors += 1;
        let message_id = self.implementation_errors;
        self.send_event(
            ObjectId::DISPLAY,
            DISPLAY_IMPLEMENTATION_ERROR,
            vec![Argument::Uint(message_id), Argument::string(description)],
        )
    }

    /// Drains queued events
    pub fn take_events(&mut self) -> Vec<Message> {
        self.outgoing.drain(..).collect()
    }

    pub fn pending_events(&self) -> impl Iterator<Item = &Message> {
        self.outgoing.iter()
    }

    /// Drains queued events in their binary wire form
    pub fn flush_bytes(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        for message in self.outgoing.drain(..) {
            out.extend_from_slice(&wire::encode(&message));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(display_version: u32) -> Client {
        Client::new(ClientId::new(1), ClientInfo::default(), display_version, 64)
    }

    #[test]
    fn test_serials_increase_monotonically() {
        let mut c = client(2);
        let a = c.next_serial();
        let b = c.next_serial();
        assert!(b > a);
        assert_eq!(c.last_serial(), b);
    }

    #[test]
    fn test_post_error_closes_connection() {
        let mut c = client(2);
        c.post_error(ProtocolError::new(ObjectId::new(5), 3u32, "bad"));
        assert!(!c.is_connected());

        let events = c.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].opcode, DISPLAY_ERROR);

        // nothing is queued after close
        assert!(!c.send_delete_id_checked(ObjectId::new(5)));
    }

    #[test]
    fn test_implementation_error_degrades_on_old_display() {
        let mut modern = client(2);
        assert!(modern.post_implementation_error(ObjectId::new(3), "failed"));
        assert!(modern.is_connected());
        let events = modern.take_events();
        assert_eq!(events[0].opcode, DISPLAY_IMPLEMENTATION_ERROR);
        assert_eq!(events[0].args[0], Argument::Uint(1));

        let mut legacy = client(1);
        assert!(!legacy.post_implementation_error(ObjectId::new(3), "failed"));
        match legacy.state() {
            ClientState::Closed(err) => assert_eq!(err.code, DisplayError::NoMemory as u32),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_events_beyond_version_are_dropped() {
        let mut c = client(1);
        // implementation_error is a version 2 event
        assert!(!c.send_event(
            ObjectId::DISPLAY,
            DISPLAY_IMPLEMENTATION_ERROR,
            vec![Argument::Uint(1), Argument::string("x")]
        ));
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn test_malformed_events_are_refused() {
        let mut c = client(2);
        assert!(!c.send_event(ObjectId::DISPLAY, DISPLAY_DELETE_ID, vec![Argument::Int(1)]));
    }

    impl Client {
        fn send_delete_id_checked(&mut self, id: ObjectId) -> bool {
            self.send_event(
                ObjectId::DISPLAY,
                DISPLAY_DELETE_ID,
                vec![Argument::Uint(id.protocol_id())],
            )
        }
    }
}
