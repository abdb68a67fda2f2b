//! wlr layer shell: panels, backgrounds, overlays
//!
//! A layer surface is anchored to output edges instead of being placed by
//! the window manager. Every change to size, anchor or margins recomputes
//! its geometry, and once the client has seen a configure the new geometry
//! is sent straight away.

use super::placement::{self, Edges, Margins};
use super::{ack_configure, assign_role, output_area, popup, role_mut, send_configure, Role, RoleData};
use crate::display::Display;
use crate::geometry::{Rectangle, Size};
use crate::protocol::error::{DispatchError, LayerShellError, LayerSurfaceError};
use crate::protocol::interfaces::Interface;
use crate::protocol::object::{ObjectId, ObjectRef};
use crate::protocol::wire::{ArgReader, Argument};
use crate::protocol::ProtocolError;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub(crate) const CONFIGURE: u16 = 0;
pub(crate) const CLOSED: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

impl Layer {
    pub fn from_wire(value: u32) -> Option<Layer> {
        match value {
            0 => Some(Layer::Background),
            1 => Some(Layer::Bottom),
            2 => Some(Layer::Top),
            3 => Some(Layer::Overlay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardInteractivity {
    #[default]
    None,
    Exclusive,
}

#[derive(Debug, Clone)]
pub struct LayerSurfaceState {
    pub layer: Layer,
    pub namespace: String,
    pub output: Option<ObjectId>,
    /// Requested size; zero means "stretch between opposite anchors"
    pub size: Size,
    pub anchor: Edges,
    pub exclusive_zone: i32,
    pub margins: Margins,
    pub keyboard_interactivity: KeyboardInteractivity,
    /// Placement within the output
    pub geometry: Rectangle,
}

impl LayerSurfaceState {
    pub fn new(layer: Layer, namespace: String, output: Option<ObjectId>) -> Self {
        Self {
            layer,
            namespace,
            output,
            size: Size::default(),
            anchor: Edges::empty(),
            exclusive_zone: 0,
            margins: Margins::default(),
            keyboard_interactivity: KeyboardInteractivity::None,
            geometry: Rectangle::default(),
        }
    }

    /// Edge the surface is pulled towards; empty means centred
    pub fn gravity(&self) -> Edges {
        self.anchor.layer_gravity()
    }

    fn recompute(&mut self, area: Rectangle) {
        self.geometry = placement::layer_geometry(self.anchor, self.size, self.margins, area);
    }
}

pub(crate) fn configure_args(serial: u32, size: Size) -> Vec<Argument> {
    vec![
        Argument::Uint(serial),
        Argument::Uint(size.width.max(0) as u32),
        Argument::Uint(size.height.max(0) as u32),
    ]
}

/// A zero dimension is only valid when both edges on that axis are anchored
pub(crate) fn validate_commit(layer: &LayerSurfaceState, object: ObjectId) -> Result<(), DispatchError> {
    let stretch_x = layer.anchor.contains(Edges::LEFT | Edges::RIGHT);
    let stretch_y = layer.anchor.contains(Edges::TOP | Edges::BOTTOM);
    if (layer.size.width == 0 && !stretch_x) || (layer.size.height == 0 && !stretch_y) {
        return Err(ProtocolError::new(
            object,
            LayerSurfaceError::InvalidSize,
            format!(
                "size {}x{} needs opposite anchors for each zero dimension",
                layer.size.width, layer.size.height
            ),
        )
        .into());
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
        Interface::LayerShell => shell_request(display, object, opcode, args),
        _ => surface_request(display, object, opcode, args),
    }
}

fn shell_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    if opcode != 0 {
        return Err(ProtocolError::invalid_method(object.id, "unknown zwlr_layer_shell_v1 request").into());
    }
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    let id = reader.new_id().map_err(malformed)?;
    let surface = ObjectRef::new(object.client, reader.object().map_err(malformed)?);
    let output = reader.optional_object().map_err(malformed)?;
    let layer_value = reader.uint().map_err(malformed)?;
    let namespace = reader.string().map_err(malformed)?;

    let layer = Layer::from_wire(layer_value).ok_or_else(|| {
        ProtocolError::new(
            object.id,
            LayerShellError::InvalidLayer,
            format!("invalid layer {}", layer_value),
        )
    })?;

    if let Some(state) = display.surface(surface) {
        if let Some(role) = &state.role {
            return Err(ProtocolError::new(
                object.id,
                LayerShellError::Role,
                format!("wl_surface {} already has role {}", surface.id, role.kind()),
            )
            .into());
        }
        if state.xdg_surface.is_some() {
            return Err(ProtocolError::new(
                object.id,
                LayerShellError::Role,
                format!("wl_surface {} is an xdg_surface", surface.id),
            )
            .into());
        }
        if state.has_buffer() {
            return Err(ProtocolError::new(
                object.id,
                LayerShellError::AlreadyConstructed,
                "wl_surface already has a buffer",
            )
            .into());
        }
    }

    let version = display.object_version(object).unwrap_or(1);
    display.create_object(object.client, id, Interface::LayerSurface, version)?;
    let mut state = LayerSurfaceState::new(layer, namespace, output);
    state.recompute(output_area(display));
    let position = state.geometry.loc;
    assign_role(display, surface, Role::new(id, RoleData::LayerSurface(state)), |existing| {
        DispatchError::protocol(
            object.id,
            LayerShellError::Role,
            format!("surface already has role {}", existing),
        )
    })?;
    display.set_surface_position(surface, position);
    info!("🧱 Layer surface {:?} created on {:?}", surface, layer);
    Ok(())
}

fn surface_request(
    display: &mut Display,
    object: ObjectRef,
    opcode: u16,
    args: &[Argument],
) -> Result<(), DispatchError> {
    let mut reader = ArgReader::new(args);
    let malformed = |e| DispatchError::malformed(object.id, e);
    let surface = display
        .surface_for_role(object)
        .ok_or_else(|| DispatchError::Implementation(anyhow::anyhow!("no surface for layer surface {:?}", object)))?;

    match opcode {
        // set_size
        0 => {
            let width = reader.uint().map_err(malformed)?;
            let height = reader.uint().map_err(malformed)?;
            let size = Size::new(
                i32::try_from(width).unwrap_or(i32::MAX),
                i32::try_from(height).unwrap_or(i32::MAX),
            );
            reconfigure(display, surface, |l| l.size = size);
            Ok(())
        }
        // set_anchor
        1 => {
            let value = reader.uint().map_err(malformed)?;
            let anchor = Edges::from_bits(value).ok_or_else(|| {
                ProtocolError::new(
                    object.id,
                    LayerSurfaceError::InvalidAnchor,
                    format!("invalid anchor {:#x}", value),
                )
            })?;
            reconfigure(display, surface, |l| l.anchor = anchor);
            Ok(())
        }
        // set_exclusive_zone
        2 => {
            let zone = reader.int().map_err(malformed)?;
            reconfigure(display, surface, |l| l.exclusive_zone = zone);
            Ok(())
        }
        // set_margin
        3 => {
            let top = reader.int().map_err(malformed)?;
            let right = reader.int().map_err(malformed)?;
            let bottom = reader.int().map_err(malformed)?;
            let left = reader.int().map_err(malformed)?;
            reconfigure(display, surface, |l| {
                l.margins = Margins {
                    top,
                    right,
                    bottom,
                    left,
                }
            });
            Ok(())
        }
        // set_keyboard_interactivity
        4 => {
            let value = reader.uint().map_err(malformed)?;
            let interactivity = match value {
                0 => KeyboardInteractivity::None,
                1 => KeyboardInteractivity::Exclusive,
                _ => {
                    return Err(ProtocolError::new(
                        object.id,
                        LayerSurfaceError::InvalidKeyboardInteractivity,
                        format!("invalid keyboard interactivity {}", value),
                    )
                    .into())
                }
            };
            reconfigure(display, surface, |l| l.keyboard_interactivity = interactivity);
            Ok(())
        }
        // get_popup
        5 => {
            let popup_object = ObjectRef::new(object.client, reader.object().map_err(malformed)?);
            let popup_surface = display.surface_for_role(popup_object).ok_or_else(|| {
                DispatchError::Implementation(anyhow::anyhow!("no surface for popup {:?}", popup_object))
            })?;
            debug!("Layer surface {:?} adopts popup {:?}", surface, popup_surface);
            popup::attach_to_parent(display, popup_surface, surface);
            Ok(())
        }
        // ack_configure
        6 => {
            let serial = reader.uint().map_err(malformed)?;
            ack_configure(display, surface, serial)
        }
        // destroy
        7 => Ok(()),
        _ => Err(ProtocolError::invalid_method(object.id, "unknown zwlr_layer_surface_v1 request").into()),
    }
}

/// Applies a change, recomputes placement and re-sends geometry if needed
fn reconfigure(display: &mut Display, surface: ObjectRef, apply: impl FnOnce(&mut LayerSurfaceState)) {
    let area = output_area(display);
    let mut position = None;
    let mut initial_sent = false;
    if let Some(role) = role_mut(display, surface) {
        initial_sent = role.configure.initial_sent();
        if let RoleData::LayerSurface(layer) = &mut role.data {
            apply(layer);
            layer.recompute(area);
            position = Some(layer.geometry.loc);
        }
    }
    if let Some(position) = position {
        display.set_surface_position(surface, position);
        if initial_sent {
            send_configure(display, surface);
        }
    }
}

impl Display {
    /// Exclusive zones claimed by live layer surfaces, with their anchors
    pub fn exclusive_zones(&self) -> Vec<(ObjectRef, Edges, i32)> {
        self.surfaces
            .iter()
            .filter_map(|s| {
                let role = s.role.as_ref()?;
                role.object?;
                let layer = role.layer_surface()?;
                (layer.exclusive_zone > 0).then_some((s.id, layer.anchor, layer.exclusive_zone))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(anchor: Edges, size: Size) -> LayerSurfaceState {
        let mut state = LayerSurfaceState::new(Layer::Top, "panel".into(), None);
        state.anchor = anchor;
        state.size = size;
        state
    }

    #[test]
    fn test_zero_width_needs_horizontal_anchors() {
        let object = ObjectId::new(9);
        assert!(validate_commit(&layer(Edges::TOP, Size::new(0, 30)), object).is_err());
        assert!(validate_commit(
            &layer(Edges::TOP | Edges::LEFT | Edges::RIGHT, Size::new(0, 30)),
            object
        )
        .is_ok());
        assert!(validate_commit(&layer(Edges::empty(), Size::new(10, 10)), object).is_ok());
    }

    #[test]
    fn test_gravity_follows_anchor() {
        let state = layer(Edges::TOP | Edges::LEFT | Edges::RIGHT, Size::new(0, 30));
        assert_eq!(state.gravity(), Edges::TOP);
    }

    #[test]
    fn test_layer_values() {
        assert_eq!(Layer::from_wire(3), Some(Layer::Overlay));
        assert_eq!(Layer::from_wire(4), None);
    }
}
