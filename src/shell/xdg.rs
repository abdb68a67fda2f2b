//! `xdg_wm_base` and `xdg_surface`

use super::{
    ack_configure, assign_role, popup, Positioner, Role, RoleData, ToplevelState, XdgSurfaceData,
};
use crate::display::Display;
use crate::geometry::Rectangle;
use crate::protocol::error::{DispatchError, XdgSurfaceError, XdgWmBaseError};
use crate::protocol::interfaces::Interface;
use crate::protocol::object::ObjectRef;
use crate::protocol::wire::{ArgReader, Argument};
use crate::protocol::ProtocolError;
use log::debug;

pub(crate) const PING: u16 = 0;

/// Tracks the new `xdg_wm_base` so it can be pinged
pub(crate) fn on_wm_base_bind(display: &mut Display, wm_base: ObjectRef) -> Result<(), DispatchError> {
    display.shell.wm_bases.insert(wm_base, None);
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
        Interface::XdgWmBase => wm_base_request(display, object, opcode, args),
        _ => surface_request(display, object, opcode, args),
    }
}

fn wm_base_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);

    match opcode {
        // destroy
        0 => {
            let remaining = display
                .shell
                .xdg_surfaces
                .iter()
                .filter(|(xdg, data)| xdg.client == object.client && data.wm_base == object.id)
                .count();
            if remaining > 0 {
                return Err(DispatchError::protocol(
                    object.id,
                    XdgWmBaseError::DefunctSurfaces,
                    format!("{} xdg_surfaces still alive", remaining),
                ));
            }
            Ok(())
        }
        // create_positioner
        1 => {
            let id = reader.new_id().map_err(malformed)?;
            let version = display.object_version(object).unwrap_or(1);
            let positioner = display.create_object(object.client, id, Interface::XdgPositioner, version)?;
            display.shell.positioners.insert(positioner, Positioner::default());
            Ok(())
        }
        // get_xdg_surface
        2 => {
            let id = reader.new_id().map_err(malformed)?;
            let surface = ObjectRef::new(object.client, reader.object().map_err(malformed)?);
            let state = display.surfaces.get(surface);
            let conflict = match state {
                Some(s) if s.xdg_surface.is_some() => Some("already has an xdg_surface".to_string()),
                Some(s) => s
                    .role
                    .as_ref()
                    .filter(|r| r.layer_surface().is_some())
                    .map(|r| format!("already has role {}", r.kind())),
                None => None,
            };
            if let Some(reason) = conflict {
                return Err(DispatchError::protocol(
                    object.id,
                    XdgWmBaseError::Role,
                    format!("wl_surface {} {}", surface.id, reason),
                ));
            }
            if state.map_or(false, |s| s.has_buffer()) {
                return Err(DispatchError::protocol(
                    object.id,
                    XdgWmBaseError::InvalidSurfaceState,
                    "wl_surface already has a buffer",
                ));
            }

            let version = display.object_version(object).unwrap_or(1);
            let xdg_surface = display.create_object(object.client, id, Interface::XdgSurface, version)?;
            display.shell.xdg_surfaces.insert(
                xdg_surface,
                XdgSurfaceData {
                    surface,
                    wm_base: object.id,
                    window_geometry: None,
                },
            );
            if let Some(state) = display.surfaces.get_mut(surface) {
                state.xdg_surface = Some(id);
            }
            Ok(())
        }
        // pong
        3 => {
            let serial = reader.uint().map_err(malformed)?;
            match display.shell.wm_bases.get_mut(&object) {
                Some(pending) if *pending == Some(serial) => *pending = None,
                _ => debug!("Ignoring pong {} from {:?}", serial, object.client),
            }
            Ok(())
        }
        _ => Err(ProtocolError::invalid_method(object.id, "unknown xdg_wm_base request").into()),
    }
}

fn surface_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    let data = display
        .shell
        .xdg_surfaces
        .get(&object)
        .cloned()
        .ok_or_else(|| DispatchError::Implementation(anyhow::anyhow!("no state for xdg_surface {:?}", object)))?;
    let surface = data.surface;

    match opcode {
        // destroy
        0 => {
            let role_alive = display
                .role(surface)
                .and_then(|r| r.object)
                .map_or(false, |id| display.is_alive(ObjectRef::new(object.client, id)));
            if role_alive {
                return Err(DispatchError::protocol(
                    object.id,
                    XdgSurfaceError::DefunctRoleObject,
                    "xdg_surface destroyed before its role object",
                ));
            }
            Ok(())
        }
        // get_toplevel
        1 => {
            let id = reader.new_id().map_err(malformed)?;
            check_unconstructed(display, object, surface)?;
            let version = display.object_version(object).unwrap_or(1);
            display.create_object(object.client, id, Interface::XdgToplevel, version)?;
            let role = Role::new(id, RoleData::Toplevel(ToplevelState::default()));
            assign_role(display, surface, role, |existing| {
                DispatchError::protocol(
                    object.id,
                    XdgSurfaceError::AlreadyConstructed,
                    format!("surface already has role {}", existing),
                )
            })?;
            Ok(())
        }
        // get_popup
        2 => {
            let id = reader.new_id().map_err(malformed)?;
            let parent = reader.optional_object().map_err(malformed)?;
            let positioner = ObjectRef::new(object.client, reader.object().map_err(malformed)?);
            check_unconstructed(display, object, surface)?;

            let positioner = display
                .shell
                .positioners
                .get(&positioner)
                .copied()
                .unwrap_or_default();
            if !positioner.is_complete() {
                return Err(DispatchError::protocol(
                    data.wm_base,
                    XdgWmBaseError::InvalidPositioner,
                    "positioner needs a size and an anchor rectangle",
                ));
            }

            let parent_surface = match parent {
                Some(parent) => {
                    let parent_xdg = ObjectRef::new(object.client, parent);
                    let parent_surface = display
                        .shell
                        .xdg_surfaces
                        .get(&parent_xdg)
                        .map(|d| d.surface)
                        .filter(|s| display.role(*s).is_some())
                        .ok_or_else(|| {
                            DispatchError::protocol(
                                data.wm_base,
                                XdgWmBaseError::InvalidPopupParent,
                                format!("xdg_surface {} has no role", parent),
                            )
                        })?;
                    Some(parent_surface)
                }
                None => None,
            };

            let version = display.object_version(object).unwrap_or(1);
            display.create_object(object.client, id, Interface::XdgPopup, version)?;
            let role = Role::new(id, RoleData::Popup(popup::PopupState::new(positioner.rules)));
            assign_role(display, surface, role, |existing| {
                DispatchError::protocol(
                    object.id,
                    XdgSurfaceError::AlreadyConstructed,
                    format!("surface already has role {}", existing),
                )
            })?;

            if let Some(parent_surface) = parent_surface {
                popup::attach_to_parent(display, surface, parent_surface);
            }
            Ok(())
        }
        // set_window_geometry
        3 => {
            let x = reader.int().map_err(malformed)?;
            let y = reader.int().map_err(malformed)?;
            let width = reader.int().map_err(malformed)?;
            let height = reader.int().map_err(malformed)?;
            if width <= 0 || height <= 0 {
                return Err(DispatchError::protocol(
                    object.id,
                    XdgSurfaceError::InvalidSize,
                    format!("invalid window geometry {}x{}", width, height),
                ));
            }
            if let Some(data) = display.shell.xdg_surfaces.get_mut(&object) {
                data.window_geometry = Some(Rectangle::new(x, y, width, height));
            }
            Ok(())
        }
        // ack_configure
        4 => {
            let serial = reader.uint().map_err(malformed)?;
            ack_configure(display, surface, serial)
        }
        _ => Err(ProtocolError::invalid_method(object.id, "unknown xdg_surface request").into()),
    }
}

fn check_unconstructed(display: &Display, xdg_surface: ObjectRef, surface: ObjectRef) -> Result<(), DispatchError> {
    match display.role(surface) {
        Some(role) => Err(DispatchError::protocol(
            xdg_surface.id,
            XdgSurfaceError::AlreadyConstructed,
            format!("surface already has role {}", role.kind()),
        )),
        None => Ok(()),
    }
}

/// Window geometry of a role surface in output coordinates
///
/// Falls back to the buffer size when the client never set a geometry.
pub(crate) fn window_bounds(display: &Display, surface: ObjectRef) -> Rectangle {
    let Some(state) = display.surfaces.get(surface) else {
        return Rectangle::default();
    };
    let geometry = state
        .xdg_surface
        .and_then(|id| display.shell.xdg_surfaces.get(&ObjectRef::new(surface.client, id)))
        .and_then(|d| d.window_geometry);
    match geometry {
        Some(geometry) => geometry.translated(state.position),
        None => state.bounds(),
    }
}
