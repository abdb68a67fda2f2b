//! Window roles: xdg-shell toplevels and popups, wlr layer surfaces
//!
//! A `wl_surface` gets at most one role for its whole lifetime. The role
//! record lives on the [`Surface`](crate::compositor::Surface) and outlives
//! the role object: once the client destroys its `xdg_toplevel` (or popup,
//! or layer surface) the record stays behind with no object, configures
//! become no-ops, and a second role can still not be assigned.
//!
//! # Configure flow
//!
//! ```text
//! role assigned ──► first commit ──► configure(serial) ──► ack_configure(serial)
//!                    (no buffer)                              │
//!                                                             ▼
//!                                             commit with buffer = mapped
//! ```
//!
//! Submodules handle the requests of each interface; this module owns the
//! shared pieces: role records, configure emission and commit validation.

pub mod configure;
pub mod layer;
pub mod placement;
pub mod popup;
pub mod positioner;
pub mod toplevel;
pub mod xdg;

pub use configure::{ConfigureError, ConfigureState, ConfigureTracker};
pub use layer::{KeyboardInteractivity, Layer, LayerSurfaceState};
pub use placement::{ConstraintAdjustment, Edges, Margins, PlacementRules};
pub use popup::PopupState;
pub use positioner::Positioner;
pub use toplevel::{ToplevelState, ToplevelStates};

use crate::display::Display;
use crate::geometry::{Rectangle, Size};
use crate::protocol::error::{DispatchError, LayerSurfaceError, XdgSurfaceError};
use crate::protocol::interfaces::Interface;
use crate::protocol::object::{ObjectId, ObjectRef};
use crate::protocol::wire::Argument;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;

const XDG_SURFACE_CONFIGURE: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Toplevel,
    Popup,
    LayerSurface(Layer),
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Toplevel => write!(f, "xdg_toplevel"),
            RoleKind::Popup => write!(f, "xdg_popup"),
            RoleKind::LayerSurface(_) => write!(f, "zwlr_layer_surface_v1"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoleData {
    Toplevel(ToplevelState),
    Popup(PopupState),
    LayerSurface(LayerSurfaceState),
}

#[derive(Debug, Clone)]
pub struct Role {
    /// Role object; `None` once the client destroyed it
    pub object: Option<ObjectId>,
    pub configure: ConfigureTracker,
    pub data: RoleData,
}

impl Role {
    pub fn new(object: ObjectId, data: RoleData) -> Self {
        Self {
            object: Some(object),
            configure: ConfigureTracker::new(),
            data,
        }
    }

    pub fn kind(&self) -> RoleKind {
        match &self.data {
            RoleData::Toplevel(_) => RoleKind::Toplevel,
            RoleData::Popup(_) => RoleKind::Popup,
            RoleData::LayerSurface(layer) => RoleKind::LayerSurface(layer.layer),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.object.is_some() && self.configure.is_mapped()
    }

    pub fn toplevel(&self) -> Option<&ToplevelState> {
        match &self.data {
            RoleData::Toplevel(t) => Some(t),
            _ => None,
        }
    }

    pub fn popup(&self) -> Option<&PopupState> {
        match &self.data {
            RoleData::Popup(p) => Some(p),
            _ => None,
        }
    }

    pub fn layer_surface(&self) -> Option<&LayerSurfaceState> {
        match &self.data {
            RoleData::LayerSurface(l) => Some(l),
            _ => None,
        }
    }
}

/// `xdg_surface` bookkeeping
#[derive(Debug, Clone)]
pub struct XdgSurfaceData {
    pub surface: ObjectRef,
    pub wm_base: ObjectId,
    pub window_geometry: Option<Rectangle>,
}

#[derive(Debug, Default)]
pub struct ShellState {
    pub(crate) positioners: HashMap<ObjectRef, Positioner>,
    pub(crate) xdg_surfaces: HashMap<ObjectRef, XdgSurfaceData>,
    /// Role object to the `wl_surface` it gives a role to
    pub(crate) role_objects: HashMap<ObjectRef, ObjectRef>,
    /// `xdg_wm_base` objects and their outstanding ping serial
    pub(crate) wm_bases: HashMap<ObjectRef, Option<u32>>,
}

impl ShellState {
    pub fn surface_for_role(&self, role_object: ObjectRef) -> Option<ObjectRef> {
        self.role_objects.get(&role_object).copied()
    }
}

/// Gives `surface` a role; fails if it ever had one
///
/// `conflict` builds the interface-specific protocol error for a surface
/// that already has a role. A surface missing from the surface table is a
/// server bug; the new role object is destroyed and the failure reported as
/// an implementation error.
pub(crate) fn assign_role(
    display: &mut Display,
    surface: ObjectRef,
    role: Role,
    conflict: impl FnOnce(RoleKind) -> DispatchError,
) -> Result<(), DispatchError> {
    let Some(state) = display.surfaces.get_mut(surface) else {
        if let Some(object) = role.object {
            display.destroy_object(ObjectRef::new(surface.client, object));
        }
        return Err(DispatchError::Implementation(anyhow::anyhow!(
            "no surface state for {:?} while assigning role {}",
            surface,
            role.kind()
        )));
    };
    if let Some(existing) = &state.role {
        return Err(conflict(existing.kind()));
    }

    let kind = role.kind();
    if let Some(object) = role.object {
        display
            .shell
            .role_objects
            .insert(ObjectRef::new(surface.client, object), surface);
    }
    state.role = Some(role);
    debug!("Surface {:?} is now a {}", surface, kind);
    Ok(())
}

pub(crate) fn role_mut(display: &mut Display, surface: ObjectRef) -> Option<&mut Role> {
    display
        .surfaces
        .get_mut(surface)
        .and_then(|s| s.role.as_mut())
}

/// Output area roles are placed in
pub(crate) fn output_area(display: &Display) -> Rectangle {
    Rectangle::new(
        0,
        0,
        display.config.shell.output_width as i32,
        display.config.shell.output_height as i32,
    )
}

/// Sends a configure for the surface's role; returns the serial used
///
/// Nothing is sent if the surface has no role or its role object is gone.
pub(crate) fn send_configure(display: &mut Display, surface: ObjectRef) -> Option<u32> {
    let output = output_area(display).size;
    let state = display.surfaces.get(surface)?;
    let role = state.role.as_ref()?;
    let role_object = ObjectRef::new(surface.client, role.object?);
    let xdg_surface = state.xdg_surface.map(|id| ObjectRef::new(surface.client, id));

    let (role_event, size) = match &role.data {
        RoleData::Toplevel(toplevel) => {
            let size = toplevel.configure_size(output);
            (Some(toplevel::configure_event(size, toplevel.states())), size)
        }
        RoleData::Popup(popup) => (Some(popup::configure_event(popup.geometry)), popup.geometry.size),
        RoleData::LayerSurface(layer) => (None, layer.geometry.size),
    };

    let serial = display.next_serial(surface.client);
    match role_event {
        Some((opcode, args)) => {
            display.send_event(role_object, opcode, args);
            if let Some(xdg_surface) = xdg_surface {
                display.send_event(xdg_surface, XDG_SURFACE_CONFIGURE, vec![Argument::Uint(serial)]);
            }
        }
        None => {
            display.send_event(role_object, layer::CONFIGURE, layer::configure_args(serial, size));
        }
    }

    if let Some(role) = role_mut(display, surface) {
        role.configure.record_sent(serial, size);
    }
    Some(serial)
}

/// Maps a configure sequencing failure to the right protocol error
fn configure_error(
    err: ConfigureError,
    kind: RoleKind,
    xdg_surface: Option<ObjectId>,
    role_object: Option<ObjectId>,
) -> DispatchError {
    match kind {
        RoleKind::LayerSurface(_) => {
            let object = role_object.unwrap_or(ObjectId::DISPLAY);
            DispatchError::protocol(object, LayerSurfaceError::InvalidSurfaceState, err.to_string())
        }
        RoleKind::Toplevel | RoleKind::Popup => {
            let object = xdg_surface.or(role_object).unwrap_or(ObjectId::DISPLAY);
            let code = match err {
                ConfigureError::UnconfiguredBuffer => XdgSurfaceError::UnconfiguredBuffer,
                _ => XdgSurfaceError::InvalidSerial,
            };
            DispatchError::protocol(object, code, err.to_string())
        }
    }
}

/// Records an ack from the client for the surface's role
pub(crate) fn ack_configure(display: &mut Display, surface: ObjectRef, serial: u32) -> Result<(), DispatchError> {
    let Some(state) = display.surfaces.get_mut(surface) else {
        return Ok(());
    };
    let xdg_surface = state.xdg_surface;
    let Some(role) = state.role.as_mut() else {
        return Err(DispatchError::protocol(
            xdg_surface.unwrap_or(surface.id),
            XdgSurfaceError::NotConstructed,
            "ack_configure before a role was assigned",
        ));
    };
    let kind = role.kind();
    let object = role.object;
    role.configure
        .ack(serial)
        .map_err(|e| configure_error(e, kind, xdg_surface, object))
}

/// Role handling for `wl_surface.commit`, after pending state was applied
pub(crate) fn on_commit(display: &mut Display, surface: ObjectRef) -> Result<(), DispatchError> {
    let Some(state) = display.surfaces.get(surface) else {
        return Ok(());
    };
    let has_buffer = state.has_buffer();
    let xdg_surface = state.xdg_surface;

    let Some(role) = state.role.as_ref() else {
        if let Some(xdg_surface) = xdg_surface {
            return Err(DispatchError::protocol(
                xdg_surface,
                XdgSurfaceError::NotConstructed,
                "xdg_surface committed before a role was assigned",
            ));
        }
        return Ok(());
    };
    let Some(role_object) = role.object else {
        // defunct role: nothing to configure
        return Ok(());
    };
    let kind = role.kind();

    if let RoleData::LayerSurface(layer) = &role.data {
        layer::validate_commit(layer, role_object)?;
    }

    if !role.configure.initial_sent() {
        if has_buffer {
            return Err(configure_error(
                ConfigureError::UnconfiguredBuffer,
                kind,
                xdg_surface,
                Some(role_object),
            ));
        }
        send_configure(display, surface);
        return Ok(());
    }

    let was_mapped = role.is_mapped();
    let Some(role) = role_mut(display, surface) else {
        return Ok(());
    };
    role.configure
        .commit(has_buffer)
        .map_err(|e| configure_error(e, kind, xdg_surface, Some(role_object)))?;
    let now_mapped = role.is_mapped();

    if now_mapped && !was_mapped {
        let order = display.surfaces.bump_map_order();
        if let Some(state) = display.surfaces.get_mut(surface) {
            state.map_order = order;
        }
        info!("🪟 {} {:?} mapped", kind, surface);
    } else if was_mapped && !now_mapped {
        info!("🪟 {} {:?} unmapped", kind, surface);
    }
    Ok(())
}

/// Routes a shell request to the handler for its interface
pub(crate) fn handle_request(
    display: &mut Display,
    object: ObjectRef,
    interface: Interface,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    match interface {
        Interface::XdgWmBase | Interface::XdgSurface => xdg::handle_request(display, object, interface, opcode, args),
        Interface::XdgPositioner => positioner::handle_request(display, object, opcode, args),
        Interface::XdgToplevel => toplevel::handle_request(display, object, opcode, args),
        Interface::XdgPopup => popup::handle_request(display, object, opcode, args),
        Interface::LayerShell | Interface::LayerSurface => {
            layer::handle_request(display, object, interface, opcode, args)
        }
        _ => Err(DispatchError::Implementation(anyhow::anyhow!(
            "{} is not a shell interface",
            interface.name()
        ))),
    }
}

/// Frees shell state after one of its objects was destroyed
pub(crate) fn release_object(display: &mut Display, object: ObjectRef, interface: Interface) {
    match interface {
        Interface::XdgWmBase => {
            display.shell.wm_bases.remove(&object);
        }
        Interface::XdgPositioner => {
            display.shell.positioners.remove(&object);
        }
        Interface::XdgSurface => {
            if let Some(data) = display.shell.xdg_surfaces.remove(&object) {
                if let Some(surface) = display.surfaces.get_mut(data.surface) {
                    surface.xdg_surface = None;
                }
            }
        }
        Interface::XdgToplevel | Interface::XdgPopup | Interface::LayerSurface => {
            let Some(surface) = display.shell.role_objects.remove(&object) else {
                return;
            };
            if interface == Interface::XdgPopup {
                display.seat.release_grab(object);
            }
            if let Some(role) = role_mut(display, surface) {
                role.object = None;
                debug!("{} of {:?} destroyed, role kept", role.kind(), surface);
            }
        }
        _ => {}
    }
}

impl Display {
    /// Role record of a surface
    pub fn role(&self, surface: ObjectRef) -> Option<&Role> {
        self.surfaces.get(surface).and_then(|s| s.role.as_ref())
    }

    /// Surface a role object (`xdg_toplevel`, `xdg_popup`, layer surface) belongs to
    pub fn surface_for_role(&self, role_object: ObjectRef) -> Option<ObjectRef> {
        self.shell.surface_for_role(role_object)
    }

    /// Asks a toplevel to close
    pub fn request_close(&mut self, surface: ObjectRef) -> bool {
        match self.live_role_object(surface, |r| r.toplevel().is_some()) {
            Some(object) => self.send_event(object, toplevel::CLOSE, vec![]),
            None => false,
        }
    }

    /// Dismisses a popup and drops any grab it holds
    pub fn dismiss_popup(&mut self, surface: ObjectRef) -> bool {
        match self.live_role_object(surface, |r| r.popup().is_some()) {
            Some(object) => {
                self.seat.release_grab(object);
                self.send_event(object, popup::POPUP_DONE, vec![])
            }
            None => false,
        }
    }

    /// Tells a layer surface it has been closed
    pub fn close_layer_surface(&mut self, surface: ObjectRef) -> bool {
        match self.live_role_object(surface, |r| r.layer_surface().is_some()) {
            Some(object) => self.send_event(object, layer::CLOSED, vec![]),
            None => false,
        }
    }

    /// Suggests a size to a toplevel; sends a configure once the initial one went out
    pub fn suggest_toplevel_size(&mut self, surface: ObjectRef, size: Size) -> Option<u32> {
        let role = role_mut(self, surface)?;
        let RoleData::Toplevel(toplevel) = &mut role.data else {
            return None;
        };
        toplevel.suggested_size = Some(size);
        if role.configure.initial_sent() {
            send_configure(self, surface)
        } else {
            None
        }
    }

    /// Marks a toplevel as focused or not
    pub fn set_toplevel_activated(&mut self, surface: ObjectRef, activated: bool) -> Option<u32> {
        let role = role_mut(self, surface)?;
        let RoleData::Toplevel(toplevel) = &mut role.data else {
            return None;
        };
        if toplevel.states.contains(ToplevelStates::ACTIVATED) == activated {
            return None;
        }
        toplevel.states.set(ToplevelStates::ACTIVATED, activated);
        if role.configure.initial_sent() {
            send_configure(self, surface)
        } else {
            None
        }
    }

    /// Sends a ping through every `xdg_wm_base` the client bound
    pub fn ping(&mut self, client: crate::protocol::ClientId) -> Option<u32> {
        let bases: Vec<ObjectRef> = self
            .shell
            .wm_bases
            .keys()
            .filter(|b| b.client == client)
            .copied()
            .collect();
        if bases.is_empty() {
            return None;
        }
        let serial = self.next_serial(client);
        for base in bases {
            self.shell.wm_bases.insert(base, Some(serial));
            self.send_event(base, xdg::PING, vec![Argument::Uint(serial)]);
        }
        Some(serial)
    }

    /// True if the client answered every ping sent so far
    pub fn is_responsive(&self, client: crate::protocol::ClientId) -> bool {
        self.shell
            .wm_bases
            .iter()
            .filter(|(base, _)| base.client == client)
            .all(|(_, pending)| pending.is_none())
    }

    fn live_role_object(&self, surface: ObjectRef, matches: impl Fn(&Role) -> bool) -> Option<ObjectRef> {
        let role = self.role(surface).filter(|r| matches(r))?;
        role.object.map(|id| ObjectRef::new(surface.client, id))
    }
}
