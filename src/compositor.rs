//! Core surface objects: `wl_compositor`, `wl_surface`, `wl_buffer`, `wl_output`
//!
//! Surfaces carry attached buffers and an optional role. Buffer contents
//! are not interpreted; a buffer only contributes its size, which is what
//! hit testing needs.

use crate::display::Display;
use crate::geometry::{Point, PointF, Rectangle, Size};
use crate::protocol::error::DispatchError;
use crate::protocol::interfaces::Interface;
use crate::protocol::object::{ObjectId, ObjectRef};
use crate::protocol::wire::{ArgReader, Argument};
use crate::protocol::{ClientId, ProtocolError};
use crate::session::BufferStreamId;
use crate::shell::{self, Role, RoleKind};
use log::{debug, trace};
use std::collections::HashMap;

const OUTPUT_MODE: u16 = 0;
const OUTPUT_DONE: u16 = 1;
const OUTPUT_MODE_CURRENT: u32 = 0x1;
const OUTPUT_REFRESH_MHZ: i32 = 60_000;

#[derive(Debug)]
pub struct Surface {
    pub id: ObjectRef,
    pub stream: BufferStreamId,
    /// `Some(None)` means a null buffer was attached
    pending_buffer: Option<Option<ObjectId>>,
    pending_damage: Vec<Rectangle>,
    pub buffer: Option<ObjectId>,
    pub buffer_size: Size,
    pub role: Option<Role>,
    /// `xdg_surface` wrapping this surface, if any
    pub xdg_surface: Option<ObjectId>,
    /// Origin in output coordinates, decided by placement or policy
    pub position: Point,
    pub commits: u64,
    /// Increases every time the surface is mapped; newer is on top
    pub(crate) map_order: u64,
}

impl Surface {
    fn new(id: ObjectRef, stream: BufferStreamId) -> Self {
        Self {
            id,
            stream,
            pending_buffer: None,
            pending_damage: Vec::new(),
            buffer: None,
            buffer_size: Size::default(),
            role: None,
            xdg_surface: None,
            position: Point::default(),
            commits: 0,
            map_order: 0,
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn role_kind(&self) -> Option<RoleKind> {
        self.role.as_ref().map(Role::kind)
    }

    /// Area covered by the current buffer, in output coordinates
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_loc_and_size(self.position, self.buffer_size)
    }

    pub fn is_mapped(&self) -> bool {
        self.has_buffer() && self.role.as_ref().map_or(false, Role::is_mapped)
    }
}

/// Surfaces and buffer metadata of every client
#[derive(Debug, Default)]
pub struct SurfaceMap {
    surfaces: HashMap<ObjectRef, Surface>,
    buffers: HashMap<ObjectRef, Size>,
    next_stream: u64,
    next_map_order: u64,
}

impl SurfaceMap {
    pub fn get(&self, id: ObjectRef) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectRef) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    fn insert(&mut self, id: ObjectRef) {
        self.next_stream += 1;
        let stream = BufferStreamId::new(self.next_stream);
        self.surfaces.insert(id, Surface::new(id, stream));
    }

    pub(crate) fn bump_map_order(&mut self) -> u64 {
        self.next_map_order += 1;
        self.next_map_order
    }
}

/// Surface found under a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTarget {
    pub surface: ObjectRef,
    /// Surface origin in output coordinates
    pub origin: Point,
}

/// Finds the surface under a point in output coordinates
pub trait SurfaceHitTest {
    fn surface_at(&self, position: PointF) -> Option<SurfaceTarget>;
}

impl<F> SurfaceHitTest for F
where
    F: Fn(PointF) -> Option<SurfaceTarget>,
{
    fn surface_at(&self, position: PointF) -> Option<SurfaceTarget> {
        self(position)
    }
}

/// Stacking band of a mapped surface; higher bands are hit first
fn stacking_band(surface: &Surface) -> u8 {
    match surface.role.as_ref().map(Role::kind) {
        Some(RoleKind::LayerSurface(layer)) => match layer {
            shell::Layer::Background => 0,
            shell::Layer::Bottom => 1,
            shell::Layer::Top => 4,
            shell::Layer::Overlay => 5,
        },
        Some(RoleKind::Toplevel) => 2,
        Some(RoleKind::Popup) => 3,
        None => 0,
    }
}

impl Display {
    pub fn surface(&self, id: ObjectRef) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    /// Imports a client buffer of the given size as a server-side `wl_buffer`
    pub fn import_buffer(&mut self, client: ClientId, size: Size) -> Result<ObjectRef, DispatchError> {
        let buffer = self.create_server_object(client, Interface::WlBuffer, 1)?;
        self.surfaces.buffers.insert(buffer, size);
        debug!("Imported {:?} buffer as {}", size, buffer.id);
        Ok(buffer)
    }

    /// Moves a surface, e.g. when the window manager places a toplevel
    pub fn set_surface_position(&mut self, surface: ObjectRef, position: Point) -> bool {
        match self.surfaces.get_mut(surface) {
            Some(s) => {
                s.position = position;
                true
            }
            None => false,
        }
    }
}

impl SurfaceHitTest for Display {
    /// Topmost mapped surface containing `position`
    fn surface_at(&self, position: PointF) -> Option<SurfaceTarget> {
        self.surfaces
            .iter()
            .filter(|s| s.is_mapped() && s.bounds().contains(position))
            .max_by_key(|s| (stacking_band(s), s.map_order))
            .map(|s| SurfaceTarget {
                surface: s.id,
                origin: s.position,
            })
    }
}

pub(crate) fn on_output_bind(display: &mut Display, output: ObjectRef) -> Result<(), DispatchError> {
    let width = display.config.shell.output_width as i32;
    let height = display.config.shell.output_height as i32;
    display.send_event(
        output,
        OUTPUT_MODE,
        vec![
            Argument::Uint(OUTPUT_MODE_CURRENT),
            Argument::Int(width),
            Argument::Int(height),
            Argument::Int(OUTPUT_REFRESH_MHZ),
        ],
    );
    display.send_event(output, OUTPUT_DONE, vec![]);
    Ok(())
}

pub(crate) fn handle_request(
    display: &mut Display,
    object: ObjectRef,
    interface: Interface,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);

    match (interface, opcode) {
        // wl_compositor.create_surface
        (Interface::WlCompositor, 0) => {
            let id = reader.new_id().map_err(malformed)?;
            let version = display.object_version(object).unwrap_or(1);
            let surface = display.create_object(object.client, id, Interface::WlSurface, version)?;
            display.surfaces.insert(surface);
            trace!("Created surface {:?}", surface);
            Ok(())
        }
        // wl_surface.destroy and wl_buffer.destroy are plain destructors
        (Interface::WlSurface, 0) | (Interface::WlBuffer, 0) => Ok(()),
        // wl_surface.attach
        (Interface::WlSurface, 1) => {
            let buffer = reader.optional_object().map_err(malformed)?;
            let surface = surface_mut(display, object)?;
            surface.pending_buffer = Some(buffer);
            Ok(())
        }
        // wl_surface.damage
        (Interface::WlSurface, 2) => {
            let x = reader.int().map_err(malformed)?;
            let y = reader.int().map_err(malformed)?;
            let w = reader.int().map_err(malformed)?;
            let h = reader.int().map_err(malformed)?;
            surface_mut(display, object)?
                .pending_damage
                .push(Rectangle::new(x, y, w, h));
            Ok(())
        }
        // wl_surface.commit
        (Interface::WlSurface, 3) => commit(display, object),
        _ => Err(ProtocolError::invalid_method(
            object.id,
            format!("{} has no request {}", interface.name(), opcode),
        )
        .into()),
    }
}

fn surface_mut(display: &mut Display, object: ObjectRef) -> Result<&mut Surface, DispatchError> {
    display
        .surfaces
        .get_mut(object)
        .ok_or_else(|| DispatchError::Implementation(anyhow::anyhow!("no state for surface {:?}", object)))
}

/// Applies pending state, then lets the role validate and react
fn commit(display: &mut Display, object: ObjectRef) -> Result<(), DispatchError> {
    let pending = {
        let surface = surface_mut(display, object)?;
        surface.commits += 1;
        surface.pending_damage.clear();
        surface.pending_buffer.take()
    };

    if let Some(buffer) = pending {
        let size = buffer
            .and_then(|b| display.surfaces.buffers.get(&ObjectRef::new(object.client, b)).copied())
            .unwrap_or_default();
        let surface = surface_mut(display, object)?;
        surface.buffer = buffer;
        surface.buffer_size = size;
    }

    shell::on_commit(display, object)
}

pub(crate) fn release_surface(display: &mut Display, object: ObjectRef) {
    if let Some(surface) = display.surfaces.surfaces.remove(&object) {
        debug!(
            "Released surface {:?} ({} commits, role {:?})",
            object,
            surface.commits,
            surface.role_kind()
        );
    }
}

pub(crate) fn release_buffer(display: &mut Display, object: ObjectRef) {
    display.surfaces.buffers.remove(&object);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WayfrontConfig;
    use crate::protocol::{ArgumentExt, ClientInfo};

    fn setup() -> (Display, ClientId, ObjectRef) {
        let mut display = Display::new(&WayfrontConfig::default()).unwrap();
        let client = display.connect(ClientInfo::default());
        let compositor = display
            .bind(
                client,
                display.global_for(Interface::WlCompositor).unwrap(),
                4,
                ObjectId::new(2),
            )
            .unwrap();
        (display, client, compositor)
    }

    #[test]
    fn test_surface_inherits_compositor_version() {
        let (mut display, client, compositor) = setup();
        display
            .dispatch(client, compositor.id, 0, vec![Argument::NewId(ObjectId::new(3))])
            .unwrap();
        let surface = ObjectRef::new(client, ObjectId::new(3));
        assert_eq!(display.object_version(surface), Some(4));
        assert!(display.surface(surface).is_some());
    }

    #[test]
    fn test_attach_takes_effect_on_commit() {
        let (mut display, client, compositor) = setup();
        display
            .dispatch(client, compositor.id, 0, vec![Argument::NewId(ObjectId::new(3))])
            .unwrap();
        let buffer = display.import_buffer(client, Size::new(64, 32)).unwrap();

        display
            .dispatch(
                client,
                ObjectId::new(3),
                1,
                vec![Argument::object(buffer.id), Argument::Int(0), Argument::Int(0)],
            )
            .unwrap();
        let surface = ObjectRef::new(client, ObjectId::new(3));
        assert!(!display.surface(surface).unwrap().has_buffer());

        display.dispatch(client, ObjectId::new(3), 3, vec![]).unwrap();
        let state = display.surface(surface).unwrap();
        assert_eq!(state.buffer, Some(buffer.id));
        assert_eq!(state.buffer_size, Size::new(64, 32));
    }

    #[test]
    fn test_destroying_surface_releases_state() {
        let (mut display, client, compositor) = setup();
        display
            .dispatch(client, compositor.id, 0, vec![Argument::NewId(ObjectId::new(3))])
            .unwrap();
        display.dispatch(client, ObjectId::new(3), 0, vec![]).unwrap();
        assert!(display.surface(ObjectRef::new(client, ObjectId::new(3))).is_none());

        let events = display.take_events(client);
        let delete = events.last().unwrap();
        assert_eq!(delete.sender, ObjectId::DISPLAY);
        assert_eq!(delete.args, vec![Argument::Uint(3)]);
    }

    #[test]
    fn test_output_reports_configured_mode() {
        let mut display = Display::new(&WayfrontConfig::default()).unwrap();
        let client = display.connect(ClientInfo::default());
        let output = display.global_for(Interface::WlOutput).unwrap();
        display.bind(client, output, 2, ObjectId::new(2)).unwrap();

        let events = display.take_events(client);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].args[1], Argument::Int(1920));
        assert_eq!(events[0].args[2], Argument::Int(1080));
    }
}
