//! Shared helpers for the protocol integration tests
//!
//! A [`Harness`] drives one client connection through the display the way a
//! real client library would: it allocates ids, sends requests and reads
//! back the queued events.

#![allow(dead_code)]

use wayfront::geometry::{PointF, Size};
use wayfront::protocol::client::ClientState;
use wayfront::protocol::wire::{Argument, ArgumentExt, Message};
use wayfront::{ClientId, ClientInfo, DispatchError, Display, Interface, ObjectId, ObjectRef, WayfrontConfig};

pub const SURFACE_ATTACH: u16 = 1;
pub const SURFACE_COMMIT: u16 = 3;

pub struct Harness {
    pub display: Display,
    pub client: ClientId,
    next_id: u32,
}

/// The objects behind one xdg toplevel
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub surface: ObjectId,
    pub xdg_surface: ObjectId,
    pub role: ObjectId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WayfrontConfig::default())
    }

    pub fn with_config(config: WayfrontConfig) -> Self {
        let display = Display::new(&config).unwrap();
        Self::with_display(display)
    }

    pub fn with_display(mut display: Display) -> Self {
        let client = display.connect(ClientInfo::named("harness"));
        Self {
            display,
            client,
            next_id: 2,
        }
    }

    pub fn new_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn object(&self, id: ObjectId) -> ObjectRef {
        ObjectRef::new(self.client, id)
    }

    pub fn bind(&mut self, interface: Interface, version: u32) -> ObjectId {
        let id = self.new_id();
        let global = self.display.global_for(interface).unwrap();
        self.display.bind(self.client, global, version, id).unwrap();
        id
    }

    pub fn request(&mut self, object: ObjectId, opcode: u16, args: Vec<Argument>) -> Result<(), DispatchError> {
        self.display.dispatch(self.client, object, opcode, args)
    }

    pub fn events(&mut self) -> Vec<Message> {
        self.display.take_events(self.client)
    }

    pub fn is_connected(&self) -> bool {
        self.display.client(self.client).map_or(false, |c| c.is_connected())
    }

    /// Protocol error code the connection was closed with
    pub fn closed_with(&self) -> Option<u32> {
        match self.display.client(self.client)?.state() {
            ClientState::Closed(err) => Some(err.code),
            ClientState::Connected => None,
        }
    }

    pub fn create_surface(&mut self, compositor: ObjectId) -> ObjectId {
        let id = self.new_id();
        self.request(compositor, 0, vec![Argument::NewId(id)]).unwrap();
        id
    }

    pub fn xdg_surface(&mut self, wm_base: ObjectId, surface: ObjectId) -> ObjectId {
        let id = self.new_id();
        self.request(wm_base, 2, vec![Argument::NewId(id), Argument::object(surface)])
            .unwrap();
        id
    }

    /// Creates a toplevel and runs the initial commit
    pub fn toplevel(&mut self, compositor: ObjectId, wm_base: ObjectId) -> Window {
        let surface = self.create_surface(compositor);
        let xdg_surface = self.xdg_surface(wm_base, surface);
        let role = self.new_id();
        self.request(xdg_surface, 1, vec![Argument::NewId(role)]).unwrap();
        self.request(surface, SURFACE_COMMIT, vec![]).unwrap();
        Window {
            surface,
            xdg_surface,
            role,
        }
    }

    /// Acks the latest configure and commits a buffer of `size`
    pub fn map(&mut self, window: Window, size: Size) {
        let serial = self.last_configure_serial(window.xdg_surface).unwrap();
        self.request(window.xdg_surface, 4, vec![Argument::Uint(serial)]).unwrap();
        self.attach_and_commit(window.surface, size);
    }

    pub fn attach_and_commit(&mut self, surface: ObjectId, size: Size) {
        let buffer = self.display.import_buffer(self.client, size).unwrap();
        self.request(
            surface,
            SURFACE_ATTACH,
            vec![Argument::object(buffer.id), Argument::Int(0), Argument::Int(0)],
        )
        .unwrap();
        self.request(surface, SURFACE_COMMIT, vec![]).unwrap();
    }

    /// Serial of the newest queued configure on `object`; drains the queue
    pub fn last_configure_serial(&mut self, object: ObjectId) -> Option<u32> {
        self.events()
            .into_iter()
            .filter(|m| m.sender == object && m.opcode == 0)
            .filter_map(|m| match m.args.first() {
                Some(Argument::Uint(serial)) => Some(*serial),
                _ => None,
            })
            .last()
    }

    pub fn pointer_at(&mut self, x: f64, y: f64, time: u32) {
        self.display
            .pointer_input_at(wayfront::PointerInput::at(PointF::new(x, y), time));
    }
}

/// Events on one object, as `(opcode, args)`
pub fn events_on(events: &[Message], object: ObjectId) -> Vec<(u16, Vec<Argument>)> {
    events
        .iter()
        .filter(|m| m.sender == object)
        .map(|m| (m.opcode, m.args.clone()))
        .collect()
}

pub fn opcodes_on(events: &[Message], object: ObjectId) -> Vec<u16> {
    events.iter().filter(|m| m.sender == object).map(|m| m.opcode).collect()
}
