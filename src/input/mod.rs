//! Input handling: the seat global and pointer routing
//!
//! The seat only advertises a pointer. Every `wl_pointer` a client creates
//! gets its own [`PointerRouter`]; platform input is routed to the routers
//! of whichever client owns the surface under the pointer, and every other
//! client's pointers are told to leave.

pub mod pointer;

pub use pointer::{
    Axis, ButtonState, CursorImage, PointerButtons, PointerEvent, PointerHost, PointerRouter, PointerSample,
    PointerSettings,
};

use crate::compositor::{SurfaceHitTest, SurfaceTarget};
use crate::display::Display;
use crate::geometry::{Point, PointF};
use crate::protocol::client::ClientId;
use crate::protocol::error::{DispatchError, PointerError, SeatError};
use crate::protocol::interfaces::Interface;
use crate::protocol::object::{ListenerKey, ObjectId, ObjectRef};
use crate::protocol::wire::{ArgReader, Argument, ArgumentExt};
use crate::protocol::ProtocolError;
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use std::collections::HashMap;

pub const CAPABILITY_POINTER: u32 = 1;
pub const CAPABILITY_KEYBOARD: u32 = 2;
pub const CAPABILITY_TOUCH: u32 = 4;

const SEAT_CAPABILITIES: u16 = 0;
const SEAT_NAME: u16 = 1;

const FOCUS_LISTENER: &str = "pointer-focus";

/// One platform pointer event in output coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerInput {
    pub time: u32,
    pub position: PointF,
    pub buttons: PointerButtons,
    pub horizontal_scroll: f64,
    pub vertical_scroll: f64,
}

impl PointerInput {
    pub fn at(position: PointF, time: u32) -> Self {
        Self {
            time,
            position,
            ..Self::default()
        }
    }

    fn local_sample(&self, origin: Point) -> PointerSample {
        PointerSample {
            time: self.time,
            position: self.position - origin,
            buttons: self.buttons,
            horizontal_scroll: self.horizontal_scroll,
            vertical_scroll: self.vertical_scroll,
        }
    }
}

/// Seat-wide input state
#[derive(Debug)]
pub struct SeatState {
    name: String,
    pointers: HashMap<ObjectRef, PointerRouter>,
    /// Latest input serial handed to each client
    last_serials: HashMap<ClientId, u32>,
    /// Popups holding an explicit grab, innermost last
    grabs: Vec<ObjectRef>,
    focused_client: Option<ClientId>,
}

impl SeatState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pointers: HashMap::new(),
            last_serials: HashMap::new(),
            grabs: Vec::new(),
            focused_client: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_serial(&self, client: ClientId) -> Option<u32> {
        self.last_serials.get(&client).copied()
    }

    pub fn focused_client(&self) -> Option<ClientId> {
        self.focused_client
    }

    pub fn pointer(&self, pointer: ObjectRef) -> Option<&PointerRouter> {
        self.pointers.get(&pointer)
    }

    pub fn grabs(&self) -> &[ObjectRef] {
        &self.grabs
    }

    pub(crate) fn push_grab(&mut self, popup: ObjectRef) {
        self.grabs.retain(|g| *g != popup);
        self.grabs.push(popup);
    }

    pub(crate) fn release_grab(&mut self, popup: ObjectRef) {
        self.grabs.retain(|g| *g != popup);
    }

    pub(crate) fn forget_client(&mut self, client: ClientId) {
        self.last_serials.remove(&client);
        self.grabs.retain(|g| g.client != client);
        self.pointers.retain(|p, _| p.client != client);
        if self.focused_client == Some(client) {
            self.focused_client = None;
        }
    }

    /// Pointers owned by `client`, oldest id first
    fn pointers_of(&self, client: ClientId) -> Vec<ObjectRef> {
        let mut pointers: Vec<ObjectRef> = self.pointers.keys().filter(|p| p.client == client).copied().collect();
        pointers.sort_by_key(|p| p.id.protocol_id());
        pointers
    }
}

/// Binds the router of one `wl_pointer` to the display
struct DisplayPointerHost<'a> {
    display: &'a mut Display,
    pointer: ObjectRef,
}

impl PointerHost for DisplayPointerHost<'_> {
    fn next_serial(&mut self) -> u32 {
        let client = self.pointer.client;
        let serial = self.display.next_serial(client);
        self.display.seat.last_serials.insert(client, serial);
        serial
    }

    fn send(&mut self, event: PointerEvent) {
        self.display.send(self.pointer, event);
    }

    fn watch_surface(&mut self, surface: ObjectId) {
        let pointer = self.pointer;
        self.display.add_destroy_listener(
            ObjectRef::new(pointer.client, surface),
            ListenerKey::new(pointer, FOCUS_LISTENER),
            Box::new(move |display, destroyed| {
                with_router(display, pointer, |router, host| router.surface_destroyed(host, destroyed.id));
            }),
        );
    }

    fn unwatch_surface(&mut self, surface: ObjectId) {
        self.display.remove_destroy_listener(
            ObjectRef::new(self.pointer.client, surface),
            ListenerKey::new(self.pointer, FOCUS_LISTENER),
        );
    }

    fn apply_cursor(&mut self, surface: ObjectId, cursor: &CursorImage) -> anyhow::Result<()> {
        let surface = ObjectRef::new(self.pointer.client, surface);
        // only windows with a role are backed by a session surface
        if self.display.role(surface).is_none() {
            return Ok(());
        }
        let session = self
            .display
            .sessions
            .session_for(surface.client)
            .ok_or_else(|| anyhow!("no session for {:?}", surface.client))?;
        match cursor {
            CursorImage::Unset => Ok(()),
            CursorImage::Hidden => session.hide_cursor(surface),
            CursorImage::Stream { stream, hotspot } => session.set_cursor_stream(surface, *stream, *hotspot),
        }
    }
}

/// Runs `f` on a pointer's router with the router detached from the seat
///
/// Router operations call back into the display, which may in turn reach
/// the seat, so the router is taken out for the duration.
fn with_router<R>(
    display: &mut Display,
    pointer: ObjectRef,
    f: impl FnOnce(&mut PointerRouter, &mut DisplayPointerHost<'_>) -> R,
) -> Option<R> {
    let mut router = display.seat.pointers.remove(&pointer)?;
    let result = {
        let mut host = DisplayPointerHost {
            display: &mut *display,
            pointer,
        };
        f(&mut router, &mut host)
    };
    if display.is_alive(pointer) {
        display.seat.pointers.insert(pointer, router);
    }
    Some(result)
}

pub(crate) fn on_seat_bind(display: &mut Display, seat: ObjectRef) -> Result<(), DispatchError> {
    display.send_event(seat, SEAT_CAPABILITIES, vec![Argument::Uint(CAPABILITY_POINTER)]);
    if display.object_version(seat).unwrap_or(1) >= 2 {
        let name = display.seat.name.clone();
        display.send_event(seat, SEAT_NAME, vec![Argument::string(name)]);
    }
    Ok(())
}

pub(crate) fn handle_request(
    display: &mut Display,
    object: ObjectRef,
    interface: Interface,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    match interface {
        Interface::WlSeat => seat_request(display, object, opcode, args),
        _ => pointer_request(display, object, opcode, args),
    }
}

fn seat_request(display: &mut Display, object: ObjectRef, opcode: u16, args: &[Argument]) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    match opcode {
        // get_pointer
        0 => {
            let id = reader.new_id().map_err(malformed)?;
            let version = display.object_version(object).unwrap_or(1);
            let pointer = display.create_object(object.client, id, Interface::WlPointer, version)?;
            let settings = PointerSettings {
                axis_scale: display.config.pointer.axis_scale,
                frame_on_enter_leave: display.config.pointer.always_frame_on_enter_leave,
                supports_frame: version >= pointer::FRAME_SINCE,
            };
            display.seat.pointers.insert(pointer, PointerRouter::new(settings));
            debug!("Created wl_pointer {} v{} for {:?}", id, version, object.client);
            Ok(())
        }
        // get_keyboard, get_touch
        1 | 2 => {
            let what = if opcode == 1 { "keyboard" } else { "touch" };
            Err(ProtocolError::new(
                object.id,
                SeatError::MissingCapability,
                format!("seat has no {} capability", what),
            )
            .into())
        }
        // release
        3 => Ok(()),
        _ => Err(ProtocolError::invalid_method(object.id, "unknown wl_seat request").into()),
    }
}

fn pointer_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    match opcode {
        // set_cursor
        0 => {
            let _serial = reader.uint().map_err(malformed)?;
            let surface = reader.optional_object().map_err(malformed)?;
            let hotspot = Point::new(reader.int().map_err(malformed)?, reader.int().map_err(malformed)?);

            let cursor = match surface {
                None => CursorImage::Hidden,
                Some(id) => {
                    let surface = ObjectRef::new(object.client, id);
                    let state = display.surface(surface).ok_or_else(|| {
                        DispatchError::Implementation(anyhow!("no state for wl_surface {:?}", surface))
                    })?;
                    if let Some(role) = &state.role {
                        return Err(ProtocolError::new(
                            object.id,
                            PointerError::Role,
                            format!("wl_surface {} already has role {}", id, role.kind()),
                        )
                        .into());
                    }
                    CursorImage::Stream {
                        stream: state.stream,
                        hotspot,
                    }
                }
            };

            with_router(display, object, |router, host| router.set_cursor(host, cursor))
                .unwrap_or(Ok(()))
                .context("applying cursor")
                .map_err(DispatchError::Implementation)
        }
        // release
        1 => Ok(()),
        _ => Err(ProtocolError::invalid_method(object.id, "unknown wl_pointer request").into()),
    }
}

/// Drops a pointer's router and withdraws its focus watch
pub(crate) fn release_pointer(display: &mut Display, pointer: ObjectRef) {
    let Some(router) = display.seat.pointers.remove(&pointer) else {
        return;
    };
    if let Some(surface) = router.focus() {
        display.remove_destroy_listener(
            ObjectRef::new(pointer.client, surface),
            ListenerKey::new(pointer, FOCUS_LISTENER),
        );
    }
}

impl Display {
    pub fn seat(&self) -> &SeatState {
        &self.seat
    }

    /// Routes one platform pointer event to `target`
    ///
    /// Pointers of a client that loses the pointer get a leave; pointers of
    /// the target's client get the event in surface-local coordinates.
    pub fn pointer_input(&mut self, input: PointerInput, target: Option<SurfaceTarget>) {
        let target_client = target.map(|t| t.surface.client);

        if self.seat.focused_client != target_client {
            if let Some(previous) = self.seat.focused_client {
                for pointer in self.seat.pointers_of(previous) {
                    with_router(self, pointer, |router, host| router.leave(host));
                }
            }
            self.seat.focused_client = target_client;
            if let Some(client) = target_client {
                info!("🖱️ Pointer focus moved to {:?}", client);
            }
        }

        let Some(target) = target else {
            return;
        };
        if !self.is_alive(target.surface) {
            warn!("Pointer target {:?} is gone", target.surface);
            return;
        }

        let sample = input.local_sample(target.origin);
        for pointer in self.seat.pointers_of(target.surface.client) {
            with_router(self, pointer, |router, host| router.handle(host, target.surface.id, sample));
        }
    }

    /// Routes a pointer event to whatever `hit` reports under it
    pub fn pointer_input_with(&mut self, input: PointerInput, hit: &dyn SurfaceHitTest) {
        let target = hit.surface_at(input.position);
        self.pointer_input(input, target);
    }

    /// Routes a pointer event using the display's own stacking
    pub fn pointer_input_at(&mut self, input: PointerInput) {
        let target = self.surface_at(input.position);
        self.pointer_input(input, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_grab_stack() {
        let mut seat = SeatState::new("seat0");
        let client = ClientId::new(1);
        let a = ObjectRef::new(client, ObjectId::new(5));
        let b = ObjectRef::new(client, ObjectId::new(6));

        seat.push_grab(a);
        seat.push_grab(b);
        seat.push_grab(a);
        assert_eq!(seat.grabs(), &[b, a]);

        seat.release_grab(a);
        assert_eq!(seat.grabs(), &[b]);

        seat.forget_client(client);
        assert!(seat.grabs().is_empty());
    }

    #[test]
    fn test_local_sample_is_relative_to_origin() {
        let input = PointerInput {
            time: 3,
            position: PointF::new(110.5, 220.0),
            buttons: PointerButtons::PRIMARY,
            ..PointerInput::default()
        };
        let sample = input.local_sample(Point::new(100, 200));
        assert_eq!(sample.position, PointF::new(10.5, 20.0));
        assert_eq!(sample.buttons, PointerButtons::PRIMARY);
        assert_eq!(sample.time, 3);
    }
}
