//! `xdg_popup`: transient surfaces placed relative to a parent

use super::placement::{self, PlacementRules};
use super::{output_area, role_mut, send_configure, xdg, RoleData};
use crate::display::Display;
use crate::geometry::{Point, Rectangle};
use crate::protocol::error::{DispatchError, XdgPopupError};
use crate::protocol::object::{ListenerKey, ObjectRef};
use crate::protocol::wire::{ArgReader, Argument};
use crate::protocol::ProtocolError;
use log::{debug, info};

pub(crate) const CONFIGURE: u16 = 0;
pub(crate) const POPUP_DONE: u16 = 1;

const PARENT_LISTENER: &str = "popup-parent";

#[derive(Debug, Clone)]
pub struct PopupState {
    /// Parent `wl_surface`; `None` until a layer surface adopts the popup
    pub parent: Option<ObjectRef>,
    /// Positioner rules captured when the popup was created
    pub rules: PlacementRules,
    /// Resolved geometry relative to the parent's window geometry
    pub geometry: Rectangle,
    pub grabbed: bool,
}

impl PopupState {
    pub fn new(rules: PlacementRules) -> Self {
        Self {
            parent: None,
            rules,
            geometry: Rectangle::from_loc_and_size(Point::default(), rules.size),
            grabbed: false,
        }
    }
}

pub(crate) fn configure_event(geometry: Rectangle) -> (u16, Vec<Argument>) {
    (
        CONFIGURE,
        vec![
            Argument::Int(geometry.loc.x),
            Argument::Int(geometry.loc.y),
            Argument::Int(geometry.size.width),
            Argument::Int(geometry.size.height),
        ],
    )
}

/// Sets the popup's parent and resolves its placement against it
///
/// If the popup was already configured, the new placement is sent right
/// away. The popup is dismissed if its parent goes away first.
pub(crate) fn attach_to_parent(display: &mut Display, surface: ObjectRef, parent: ObjectRef) {
    let Some(popup_object) = display.role(surface).and_then(|r| r.object) else {
        return;
    };
    let popup_ref = ObjectRef::new(surface.client, popup_object);
    let key = ListenerKey::new(popup_ref, PARENT_LISTENER);

    let previous = display
        .role(surface)
        .and_then(|r| r.popup())
        .and_then(|p| p.parent);
    if let Some(previous) = previous {
        display.remove_destroy_listener(previous, key);
    }

    let parent_bounds = xdg::window_bounds(display, parent);
    let available = output_area(display);

    let mut initial_sent = false;
    let mut resolved = None;
    if let Some(role) = role_mut(display, surface) {
        initial_sent = role.configure.initial_sent();
        if let RoleData::Popup(popup) = &mut role.data {
            popup.parent = Some(parent);
            popup.geometry = placement::resolve(&popup.rules, parent_bounds, available);
            resolved = Some(popup.geometry);
        }
    }
    let Some(geometry) = resolved else {
        return;
    };

    display.set_surface_position(surface, parent_bounds.loc + geometry.loc);
    debug!("Popup {:?} placed at {:?} under {:?}", surface, geometry, parent);

    display.add_destroy_listener(
        parent,
        key,
        Box::new(move |display, _| {
            if let Some(role) = role_mut(display, surface) {
                if let RoleData::Popup(popup) = &mut role.data {
                    popup.parent = None;
                }
            }
            display.dismiss_popup(surface);
        }),
    );

    if initial_sent {
        send_configure(display, surface);
    }
}

pub(crate) fn handle_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    let surface = display
        .surface_for_role(object)
        .ok_or_else(|| DispatchError::Implementation(anyhow::anyhow!("no surface for popup {:?}", object)))?;

    match opcode {
        // destroy
        0 => Ok(()),
        // grab
        1 => {
            let _seat = reader.object().map_err(malformed)?;
            let serial = reader.uint().map_err(malformed)?;
            grab(display, object, surface, serial)
        }
        _ => Err(ProtocolError::invalid_method(object.id, "unknown xdg_popup request").into()),
    }
}

/// Validates the grab serial before the seat is touched
fn grab(display: &mut Display, object: ObjectRef, surface: ObjectRef, serial: u32) -> Result<(), DispatchError> {
    let invalid = |message: String| -> DispatchError {
        ProtocolError::new(object.id, XdgPopupError::InvalidGrab, message).into()
    };

    if display.role(surface).map_or(false, |r| r.is_mapped()) {
        return Err(invalid("grab requested after the popup was mapped".into()));
    }
    match display.seat.last_serial(object.client) {
        Some(last) if last == serial => {}
        Some(last) => {
            return Err(invalid(format!(
                "grab serial {} is not the latest input serial {}",
                serial, last
            )))
        }
        None => return Err(invalid(format!("grab serial {} without any input", serial))),
    }

    if let Some(role) = role_mut(display, surface) {
        if let RoleData::Popup(popup) = &mut role.data {
            popup.grabbed = true;
        }
    }
    display.seat.push_grab(object);
    info!("📌 Popup {:?} grabbed the pointer", surface);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    #[test]
    fn test_new_popup_geometry_defaults_to_positioner_size() {
        let rules = PlacementRules {
            size: Size::new(120, 80),
            ..PlacementRules::default()
        };
        let popup = PopupState::new(rules);
        assert_eq!(popup.geometry, Rectangle::new(0, 0, 120, 80));
        assert!(popup.parent.is_none());
    }

    #[test]
    fn test_configure_event_arguments() {
        let (opcode, args) = configure_event(Rectangle::new(-4, 12, 50, 60));
        assert_eq!(opcode, CONFIGURE);
        assert_eq!(
            args,
            vec![
                Argument::Int(-4),
                Argument::Int(12),
                Argument::Int(50),
                Argument::Int(60)
            ]
        );
    }
}
