//! Protocol object runtime
//!
//! [`Display`] owns every connection, the global list and the per-interface
//! handler state. It is driven from a single thread: requests come in through
//! [`Display::dispatch`] (or [`Display::dispatch_raw`] for wire bytes),
//! platform input through [`Display::pointer_input`], and work submitted
//! from other threads through the queue returned by [`Display::work_sender`].
//!
//! Handlers return [`DispatchError`]; this module is the only place where
//! such an error turns into something a client can see.

use crate::compositor::{self, SurfaceMap};
use crate::config::WayfrontConfig;
use crate::input::{self, SeatState};
use crate::protocol::client::{Client, ClientId, ClientInfo, ClientState};
use crate::protocol::error::{DispatchError, ProtocolError};
use crate::protocol::global::{BindHook, Global, GlobalError, GlobalFilter, GlobalId, GlobalList};
use crate::protocol::interface::InterfaceRegistry;
use crate::protocol::interfaces::Interface;
use crate::protocol::object::{DestroyListener, InsertError, ListenerKey, ObjectId, ObjectRef};
use crate::protocol::interface::ANONYMOUS_INTERFACE;
use crate::protocol::wire::{self, ArgReader, Argument, ArgumentExt, ArgumentType, Message};
use crate::protocol::ProtocolEvent;
use crate::session::{HeadlessSessions, SessionLookup};
use crate::shell::{self, ShellState};
use crate::work::{WorkQueue, WorkSender};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

const REGISTRY_GLOBAL: u16 = 0;
const REGISTRY_GLOBAL_REMOVE: u16 = 1;
const CALLBACK_DONE: u16 = 0;

pub struct Display {
    registry: Arc<InterfaceRegistry>,
    pub(crate) config: WayfrontConfig,
    globals: GlobalList,
    clients: BTreeMap<ClientId, Client>,
    next_client: u64,
    /// Live `wl_registry` objects, told about globals added later
    registries: Vec<ObjectRef>,
    pub(crate) surfaces: SurfaceMap,
    pub(crate) shell: ShellState,
    pub(crate) seat: SeatState,
    pub(crate) sessions: Arc<dyn SessionLookup>,
    work: WorkQueue,
}

impl Display {
    /// Creates a display with the core globals and the configured extensions
    pub fn new(config: &WayfrontConfig) -> Result<Self> {
        Self::with_sessions(config, Arc::new(HeadlessSessions))
    }

    pub fn with_sessions(config: &WayfrontConfig, sessions: Arc<dyn SessionLookup>) -> Result<Self> {
        config.validate()?;

        let mut display = Self {
            registry: InterfaceRegistry::standard(),
            config: config.clone(),
            globals: GlobalList::new(config.limits.max_globals),
            clients: BTreeMap::new(),
            next_client: 1,
            registries: Vec::new(),
            surfaces: SurfaceMap::default(),
            shell: ShellState::default(),
            seat: SeatState::new(&config.seat.name),
            sessions,
            work: WorkQueue::new(),
        };

        display.advertise(Interface::WlCompositor, 4, None)?;
        display.advertise(Interface::WlSeat, 5, Some(input::on_seat_bind))?;
        display.advertise(Interface::WlOutput, 2, Some(compositor::on_output_bind))?;

        for name in &config.extensions.enabled {
            match display.registry.lookup(name) {
                Some(Interface::XdgWmBase) => {
                    display.advertise(Interface::XdgWmBase, 3, Some(shell::xdg::on_wm_base_bind))?;
                }
                Some(Interface::LayerShell) => {
                    display.advertise(Interface::LayerShell, 1, None)?;
                }
                _ => warn!("Extension {} is not supported, skipping", name),
            }
        }

        info!(
            "🧩 Display ready with {} globals ({} interfaces known)",
            display.globals.len(),
            display.registry.len()
        );
        Ok(display)
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &WayfrontConfig {
        &self.config
    }

    // ----------------------------------------------------------------------
    // Globals
    // ----------------------------------------------------------------------

    /// Publishes a global to all current and future clients
    pub fn advertise(
        &mut self,
        interface: Interface,
        max_version: u32,
        on_bind: Option<BindHook>,
    ) -> Result<GlobalId, GlobalError> {
        let global = self.globals.add(interface, max_version, on_bind)?;
        debug!(
            "Advertising global {} {} v{}",
            global.id.name(),
            interface.name(),
            max_version
        );

        for registry in self.registries.clone() {
            self.announce_global(registry, &global);
        }
        Ok(global.id)
    }

    /// Withdraws a global; existing bound objects are unaffected
    pub fn remove_global(&mut self, id: GlobalId) -> bool {
        let Some(global) = self.globals.remove(id) else {
            return false;
        };
        for registry in self.registries.clone() {
            let visible = self
                .clients
                .get(&registry.client)
                .map_or(false, |c| self.globals.is_visible(c.info(), &global));
            if visible {
                self.send_event(
                    registry,
                    REGISTRY_GLOBAL_REMOVE,
                    vec![Argument::Uint(global.id.name())],
                );
            }
        }
        true
    }

    /// Restricts which globals each client may see and bind
    pub fn set_global_filter(&mut self, filter: GlobalFilter) {
        self.globals.set_filter(filter);
    }

    pub fn globals(&self) -> impl Iterator<Item = &Global> {
        self.globals.iter()
    }

    /// Finds the first global implementing an interface
    pub fn global_for(&self, interface: Interface) -> Option<GlobalId> {
        self.globals
            .iter()
            .find(|g| g.interface == interface)
            .map(|g| g.id)
    }

    fn announce_global(&mut self, registry: ObjectRef, global: &Global) {
        let visible = self
            .clients
            .get(&registry.client)
            .map_or(false, |c| self.globals.is_visible(c.info(), global));
        if visible {
            self.send_event(
                registry,
                REGISTRY_GLOBAL,
                vec![
                    Argument::Uint(global.id.name()),
                    Argument::string(global.interface.name()),
                    Argument::Uint(global.max_version),
                ],
            );
        }
    }

    // ----------------------------------------------------------------------
    // Connections
    // ----------------------------------------------------------------------

    pub fn connect(&mut self, info: ClientInfo) -> ClientId {
        let id = ClientId::new(self.next_client);
        self.next_client += 1;
        let client = Client::new(
            id,
            info,
            self.config.protocol.display_version,
            self.config.limits.max_objects_per_client,
        );
        info!("🔌 Client {:?} connected ({:?})", id, client.info().app_name);
        self.clients.insert(id, client);
        id
    }

    /// Tears down a connection, destroying every object it still owns
    pub fn disconnect(&mut self, client: ClientId) {
        let Some(ids) = self.clients.get(&client).map(|c| c.objects().ids()) else {
            return;
        };

        // Children before parents: newest objects first.
        for id in ids.into_iter().rev() {
            self.destroy_object(ObjectRef::new(client, id));
        }
        self.registries.retain(|r| r.client != client);
        self.seat.forget_client(client);

        if let Some(client_state) = self.clients.remove(&client) {
            match client_state.state() {
                ClientState::Closed(err) => {
                    info!("🔌 Client {:?} disconnected after error: {}", client, err)
                }
                ClientState::Connected => info!("🔌 Client {:?} disconnected", client),
            }
        }
    }

    /// Disconnects every client that was closed by a fatal error
    pub fn flush_closed(&mut self) -> Vec<ClientId> {
        let closed: Vec<_> = self
            .clients
            .values()
            .filter(|c| !c.is_connected())
            .map(|c| c.id())
            .collect();
        for id in &closed {
            self.disconnect(*id);
        }
        closed
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn take_events(&mut self, client: ClientId) -> Vec<Message> {
        self.clients
            .get_mut(&client)
            .map(Client::take_events)
            .unwrap_or_default()
    }

    // ----------------------------------------------------------------------
    // Objects
    // ----------------------------------------------------------------------

    pub fn object_interface(&self, object: ObjectRef) -> Option<Interface> {
        self.clients
            .get(&object.client)
            .and_then(|c| c.object_info(object.id))
            .map(|(interface, _)| interface)
    }

    pub fn object_version(&self, object: ObjectRef) -> Option<u32> {
        self.clients
            .get(&object.client)
            .and_then(|c| c.object_info(object.id))
            .map(|(_, version)| version)
    }

    pub fn is_alive(&self, object: ObjectRef) -> bool {
        self.object_interface(object).is_some()
    }

    /// Inserts a client-allocated object
    pub(crate) fn create_object(
        &mut self,
        client: ClientId,
        id: ObjectId,
        interface: Interface,
        version: u32,
    ) -> Result<ObjectRef, DispatchError> {
        let conn = self
            .clients
            .get_mut(&client)
            .ok_or(DispatchError::NoMemory)?;
        match conn.objects.insert(id, interface, version) {
            Ok(()) => Ok(ObjectRef::new(client, id)),
            Err(InsertError::InvalidId) => Err(ProtocolError::invalid_object(
                id,
                format!("invalid new id {} for {}", id, interface.name()),
            )
            .into()),
            Err(InsertError::Exhausted) => Err(DispatchError::NoMemory),
        }
    }

    /// Creates an object in the server id range, e.g. for imported buffers
    ///
    /// Allocation failure is fatal to the client.
    pub fn create_server_object(
        &mut self,
        client: ClientId,
        interface: Interface,
        version: u32,
    ) -> Result<ObjectRef, DispatchError> {
        let conn = self
            .clients
            .get_mut(&client)
            .ok_or(DispatchError::NoMemory)?;
        match conn.objects.insert_server(interface, version) {
            Ok(id) => Ok(ObjectRef::new(client, id)),
            Err(_) => {
                conn.post_no_memory(ObjectId::DISPLAY);
                Err(DispatchError::NoMemory)
            }
        }
    }

    /// Destroys an object from the server side
    ///
    /// The object leaves its table first; then its destroy listeners run in
    /// registration order; then its handler state is released. Destroying an
    /// object that is already gone is a no-op.
    pub fn destroy_object(&mut self, object: ObjectRef) -> bool {
        let Some(conn) = self.clients.get_mut(&object.client) else {
            return false;
        };
        let Some((entry, listeners)) = conn.objects.remove(object.id) else {
            return false;
        };

        debug!(
            "Destroying {}@{} for {:?} ({} listeners)",
            entry.interface.name(),
            object.id,
            object.client,
            listeners.len()
        );

        for listener in listeners {
            listener(self, object);
        }

        self.release_state(object, entry.interface);

        if !object.id.is_server_allocated() {
            if let Some(conn) = self.clients.get_mut(&object.client) {
                conn.send_delete_id(object.id);
            }
        }
        true
    }

    fn release_state(&mut self, object: ObjectRef, interface: Interface) {
        match interface {
            Interface::WlRegistry => self.registries.retain(|r| *r != object),
            Interface::WlSurface => compositor::release_surface(self, object),
            Interface::WlBuffer => compositor::release_buffer(self, object),
            Interface::WlPointer => input::release_pointer(self, object),
            Interface::XdgWmBase
            | Interface::XdgPositioner
            | Interface::XdgSurface
            | Interface::XdgToplevel
            | Interface::XdgPopup
            | Interface::LayerSurface => shell::release_object(self, object, interface),
            Interface::WlDisplay
            | Interface::WlCallback
            | Interface::WlCompositor
            | Interface::WlOutput
            | Interface::WlSeat
            | Interface::LayerShell => {}
        }
    }

    /// Registers a keyed listener fired when `target` is destroyed
    pub fn add_destroy_listener(
        &mut self,
        target: ObjectRef,
        key: ListenerKey,
        listener: DestroyListener,
    ) -> bool {
        self.clients
            .get_mut(&target.client)
            .map_or(false, |c| c.objects.add_listener(target.id, key, listener))
    }

    pub fn remove_destroy_listener(&mut self, target: ObjectRef, key: ListenerKey) -> bool {
        self.clients
            .get_mut(&target.client)
            .map_or(false, |c| c.objects.remove_listener(target.id, key))
    }

    // ----------------------------------------------------------------------
    // Events and serials
    // ----------------------------------------------------------------------

    pub fn send_event(&mut self, object: ObjectRef, opcode: u16, args: Vec<Argument>) -> bool {
        self.clients
            .get_mut(&object.client)
            .map_or(false, |c| c.send_event(object.id, opcode, args))
    }

    pub fn send<E: ProtocolEvent>(&mut self, object: ObjectRef, event: E) -> bool {
        self.clients
            .get_mut(&object.client)
            .map_or(false, |c| c.send(object.id, event))
    }

    pub fn next_serial(&mut self, client: ClientId) -> u32 {
        self.clients
            .get_mut(&client)
            .map_or(0, Client::next_serial)
    }

    // ----------------------------------------------------------------------
    // Binding
    // ----------------------------------------------------------------------

    /// Binds a global for a client, creating object `new_id`
    ///
    /// The object is bound at `min(requested_version, max_version)`. Any
    /// failure is reported to the client before returning.
    pub fn bind(
        &mut self,
        client: ClientId,
        global: GlobalId,
        requested_version: u32,
        new_id: ObjectId,
    ) -> Result<ObjectRef, DispatchError> {
        let result = self.bind_inner(client, global, None, requested_version, new_id);
        if let Err(err) = &result {
            let err = clone_for_report(err);
            self.report(client, ObjectId::DISPLAY, "bind", err);
        }
        result
    }

    fn bind_inner(
        &mut self,
        client: ClientId,
        global_id: GlobalId,
        interface_name: Option<&str>,
        requested_version: u32,
        new_id: ObjectId,
    ) -> Result<ObjectRef, DispatchError> {
        let info = self
            .clients
            .get(&client)
            .map(|c| c.info().clone())
            .unwrap_or_default();

        let global = self
            .globals
            .get(global_id)
            .filter(|g| self.globals.is_visible(&info, g))
            .cloned()
            .ok_or_else(|| {
                ProtocolError::invalid_object(
                    ObjectId::DISPLAY,
                    format!("no global named {}", global_id.name()),
                )
            })?;

        if let Some(name) = interface_name {
            if name != global.interface.name() {
                return Err(ProtocolError::invalid_object(
                    new_id,
                    format!(
                        "global {} is {}, not {}",
                        global_id.name(),
                        global.interface.name(),
                        name
                    ),
                )
                .into());
            }
        }
        if requested_version == 0 {
            return Err(ProtocolError::invalid_object(
                new_id,
                format!("invalid version 0 for {}", global.interface.name()),
            )
            .into());
        }

        let version = global.effective_version(requested_version);
        let object = self.create_object(client, new_id, global.interface, version)?;
        debug!(
            "{:?} bound {} v{} (requested v{}) as {}",
            client,
            global.interface.name(),
            version,
            requested_version,
            new_id
        );

        if let Some(hook) = global.on_bind {
            hook(self, object)?;
        }
        Ok(object)
    }

    // ----------------------------------------------------------------------
    // Dispatch
    // ----------------------------------------------------------------------

    /// Decodes one request from wire bytes and dispatches it
    ///
    /// Returns the number of bytes consumed.
    pub fn dispatch_raw(&mut self, client: ClientId, bytes: &[u8]) -> Result<usize, DispatchError> {
        let (sender, opcode, size) = match wire::peek_header(bytes) {
            Ok(header) => header,
            Err(e) => {
                let err = DispatchError::malformed(ObjectId::DISPLAY, e);
                let reported = clone_for_report(&err);
                self.report(client, ObjectId::DISPLAY, "decode", reported);
                return Err(err);
            }
        };

        let signature = self
            .clients
            .get(&client)
            .and_then(|c| c.object_info(sender))
            .and_then(|(interface, _)| interface.request(opcode))
            .map(|desc| desc.signature);

        let Some(signature) = signature else {
            // Let dispatch produce the precise unknown-object / opcode error.
            self.dispatch(client, sender, opcode, Vec::new())?;
            return Ok(size);
        };

        match wire::decode(bytes, signature) {
            Ok((message, used)) => {
                self.dispatch(client, message.sender, message.opcode, message.args)?;
                Ok(used)
            }
            Err(e) => {
                let err = DispatchError::malformed(sender, e);
                let reported = clone_for_report(&err);
                self.report(client, sender, "decode", reported);
                Err(err)
            }
        }
    }

    pub fn dispatch_message(&mut self, client: ClientId, message: Message) -> Result<(), DispatchError> {
        self.dispatch(client, message.sender, message.opcode, message.args)
    }

    /// Dispatches a decoded request to the handler for the object's interface
    ///
    /// Failures have already been reported to the client when this returns
    /// an error; the error is returned for logging and tests.
    pub fn dispatch(
        &mut self,
        client: ClientId,
        object: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<(), DispatchError> {
        match self.clients.get(&client) {
            Some(conn) if conn.is_connected() => {}
            Some(_) => {
                debug!("Ignoring request from closed {:?}", client);
                return Ok(());
            }
            None => return Err(DispatchError::NoMemory),
        }

        let (interface, request_name) = match self.validate_request(client, object, opcode, &args) {
            Ok(interface) => (interface, interface.request_name(opcode)),
            Err(err) => {
                let reported = clone_for_report(&err);
                self.report(client, object, "validation", reported);
                return Err(err);
            }
        };

        let target = ObjectRef::new(client, object);
        let result = self
            .route(target, interface, opcode, &args)
            .and_then(|()| {
                let destructor = interface.request(opcode).map_or(false, |d| d.is_destructor);
                if destructor {
                    self.destroy_object(target);
                }
                Ok(())
            });

        if let Err(err) = &result {
            let reported = clone_for_report(err);
            self.report(client, object, &request_name, reported);
        }
        result
    }

    /// Checks the target, opcode, version and argument types of a request
    fn validate_request(
        &self,
        client: ClientId,
        object: ObjectId,
        opcode: u16,
        args: &[Argument],
    ) -> Result<Interface, DispatchError> {
        let conn = self.clients.get(&client).ok_or(DispatchError::NoMemory)?;
        let Some((interface, version)) = conn.object_info(object) else {
            let message = if conn.objects().was_retired(object) {
                format!("object {} was already destroyed", object)
            } else {
                format!("unknown object {}", object)
            };
            return Err(ProtocolError::invalid_object(object, message).into());
        };

        let desc = interface.request(opcode).ok_or_else(|| {
            ProtocolError::invalid_method(
                object,
                format!("{} has no request {}", interface.name(), opcode),
            )
        })?;
        if desc.since > version {
            return Err(ProtocolError::invalid_method(
                object,
                format!(
                    "{}.{} requires version {}, object is version {}",
                    interface.name(),
                    desc.name,
                    desc.since,
                    version
                ),
            )
            .into());
        }

        wire::check_signature(desc.signature, args).map_err(|e| DispatchError::malformed(object, e))?;

        // one entry per object argument, in order
        let mut object_interfaces = desc.arg_interfaces.iter();
        for (kind, arg) in desc.signature.iter().zip(args) {
            match (kind, arg) {
                (ArgumentType::Object(_), Argument::Object(id)) => {
                    let expected = object_interfaces
                        .next()
                        .map(|i| i.name)
                        .filter(|name| *name != ANONYMOUS_INTERFACE.name);
                    if id.is_null() {
                        continue;
                    }
                    let Some((found, _)) = conn.object_info(*id) else {
                        return Err(ProtocolError::invalid_object(
                            object,
                            format!("argument refers to unknown object {}", id),
                        )
                        .into());
                    };
                    if let Some(expected) = expected {
                        if found.name() != expected {
                            return Err(ProtocolError::invalid_object(
                                object,
                                format!("expected {}, got {}@{}", expected, found.name(), id),
                            )
                            .into());
                        }
                    }
                }
                (ArgumentType::NewId, Argument::NewId(id)) => {
                    let reusable = id.protocol_id() != 0
                        && !id.is_server_allocated()
                        && !conn.objects().contains(*id)
                        && !conn.objects().was_retired(*id);
                    if !reusable {
                        return Err(ProtocolError::invalid_object(
                            object,
                            format!("invalid new id {}", id),
                        )
                        .into());
                    }
                }
                _ => {}
            }
        }

        Ok(interface)
    }

    /// Routes a validated request to its interface's handler
    fn route(
        &mut self,
        object: ObjectRef,
        interface: Interface,
        opcode: u16,
        args: &[Argument],
    ) -> Result<(), DispatchError> {
        match interface {
            Interface::WlDisplay => self.handle_display_request(object, opcode, args),
            Interface::WlRegistry => self.handle_registry_request(object, opcode, args),
            Interface::WlCallback | Interface::WlOutput => Ok(()),
            Interface::WlCompositor | Interface::WlSurface | Interface::WlBuffer => {
                compositor::handle_request(self, object, interface, opcode, args)
            }
            Interface::WlSeat | Interface::WlPointer => {
                input::handle_request(self, object, interface, opcode, args)
            }
            Interface::XdgWmBase
            | Interface::XdgPositioner
            | Interface::XdgSurface
            | Interface::XdgToplevel
            | Interface::XdgPopup
            | Interface::LayerShell
            | Interface::LayerSurface => shell::handle_request(self, object, interface, opcode, args),
        }
    }

    fn handle_display_request(
        &mut self,
        object: ObjectRef,
        opcode: u16,
        args: &[Argument],
    ) -> Result<(), DispatchError> {
        let mut reader = ArgReader::new(args);
        let malformed = |e| DispatchError::malformed(object.id, e);
        match opcode {
            // sync
            0 => {
                let id = reader.new_id().map_err(malformed)?;
                let callback = self.create_object(object.client, id, Interface::WlCallback, 1)?;
                let serial = self.next_serial(object.client);
                self.send_event(callback, CALLBACK_DONE, vec![Argument::Uint(serial)]);
                self.destroy_object(callback);
                Ok(())
            }
            // get_registry
            1 => {
                let id = reader.new_id().map_err(malformed)?;
                let registry = self.create_object(object.client, id, Interface::WlRegistry, 1)?;
                self.registries.push(registry);
                let globals: Vec<Global> = self.globals.iter().cloned().collect();
                for global in &globals {
                    self.announce_global(registry, global);
                }
                Ok(())
            }
            _ => Err(ProtocolError::invalid_method(object.id, "unknown wl_display request").into()),
        }
    }

    fn handle_registry_request(
        &mut self,
        object: ObjectRef,
        opcode: u16,
        args: &[Argument],
    ) -> Result<(), DispatchError> {
        if opcode != 0 {
            return Err(ProtocolError::invalid_method(object.id, "unknown wl_registry request").into());
        }
        let mut reader = ArgReader::new(args);
        let malformed = |e| DispatchError::malformed(object.id, e);
        let name = reader.uint().map_err(malformed)?;
        let interface = reader.string().map_err(malformed)?;
        let version = reader.uint().map_err(malformed)?;
        let new_id = reader.new_id().map_err(malformed)?;

        self.bind_inner(object.client, GlobalId::new(name), Some(&interface), version, new_id)
            .map(|_| ())
    }

    /// Turns a handler failure into what the client sees
    fn report(&mut self, client: ClientId, object: ObjectId, request: &str, err: DispatchError) {
        let Some(conn) = self.clients.get_mut(&client) else {
            return;
        };
        match err {
            DispatchError::Protocol(e) => conn.post_error(e),
            DispatchError::NoMemory => {
                error!("Out of memory processing {} for {:?}", request, client);
                conn.post_no_memory(object);
            }
            DispatchError::Implementation(e) => {
                error!("Exception processing {} request: {:#}", request, e);
                let survived = conn.post_implementation_error(
                    object,
                    &format!("internal error processing {} request", request),
                );
                if !survived {
                    warn!("{:?} does not support implementation errors; closing", client);
                }
            }
        }
    }

    // ----------------------------------------------------------------------
    // Scheduled work
    // ----------------------------------------------------------------------

    /// Handle for submitting work to this display from any thread
    pub fn work_sender(&self) -> WorkSender {
        self.work.sender()
    }

    /// Runs all queued work in submission order; returns how many ran
    pub fn run_pending_work(&mut self) -> usize {
        let mut ran = 0;
        while let Some(work) = self.work.try_next() {
            work(self);
            ran += 1;
        }
        ran
    }
}

/// Errors are reported to the client and also handed back to the caller
fn clone_for_report(err: &DispatchError) -> DispatchError {
    match err {
        DispatchError::Protocol(e) => DispatchError::Protocol(e.clone()),
        DispatchError::NoMemory => DispatchError::NoMemory,
        DispatchError::Implementation(e) => DispatchError::Implementation(anyhow::anyhow!("{:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::DisplayError;

    fn display() -> Display {
        Display::new(&WayfrontConfig::default()).unwrap()
    }

    #[test]
    fn test_core_and_default_extensions_are_advertised() {
        let display = display();
        let names: Vec<_> = display.globals().map(|g| g.interface.name()).collect();
        assert!(names.contains(&"wl_compositor"));
        assert!(names.contains(&"wl_seat"));
        assert!(names.contains(&"xdg_wm_base"));
        assert!(names.contains(&"zwlr_layer_shell_v1"));
    }

    #[test]
    fn test_unknown_object_is_fatal() {
        let mut display = display();
        let client = display.connect(ClientInfo::default());
        let err = display
            .dispatch(client, ObjectId::new(40), 0, vec![])
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!display.client(client).unwrap().is_connected());
    }

    #[test]
    fn test_sync_round_trip_retires_callback() {
        let mut display = display();
        let client = display.connect(ClientInfo::default());
        display
            .dispatch(client, ObjectId::DISPLAY, 0, vec![Argument::NewId(ObjectId::new(2))])
            .unwrap();

        let events = display.take_events(client);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sender, ObjectId::new(2));
        assert_eq!(events[1].args, vec![Argument::Uint(2)]);

        // the callback id cannot be reused on this connection
        let err = display
            .dispatch(client, ObjectId::DISPLAY, 0, vec![Argument::NewId(ObjectId::new(2))])
            .unwrap_err();
        match err {
            DispatchError::Protocol(e) => assert_eq!(e.code, DisplayError::InvalidObject as u32),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_closed_clients_are_flushed() {
        let mut display = display();
        let a = display.connect(ClientInfo::named("a"));
        let b = display.connect(ClientInfo::named("b"));
        let _ = display.dispatch(a, ObjectId::new(77), 0, vec![]);

        assert_eq!(display.flush_closed(), vec![a]);
        assert!(display.client(a).is_none());
        assert!(display.client(b).unwrap().is_connected());
    }
}
