//! `xdg_toplevel`: application windows
//!
//! Size constraints follow the configured [`SizeConstraintPolicy`]: with
//! `clamp` the most recent request wins and the other bound is pulled to
//! it, with `reject` a min larger than the max is a protocol error.

use super::{role_mut, send_configure, RoleData};
use crate::config::SizeConstraintPolicy;
use crate::display::Display;
use crate::geometry::Size;
use crate::protocol::error::{DispatchError, XdgToplevelError};
use crate::protocol::object::{ListenerKey, ObjectId, ObjectRef};
use crate::protocol::wire::{ArgReader, Argument, ArgumentExt};
use crate::protocol::ProtocolError;
use bitflags::bitflags;
use log::{debug, info};

pub(crate) const CONFIGURE: u16 = 0;
pub(crate) const CLOSE: u16 = 1;

const PARENT_LISTENER: &str = "toplevel-parent";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ToplevelStates: u32 {
        const MAXIMIZED = 1 << 0;
        const FULLSCREEN = 1 << 1;
        const RESIZING = 1 << 2;
        const ACTIVATED = 1 << 3;
    }
}

impl ToplevelStates {
    /// Wire values of the set states, in ascending order
    fn wire_values(self) -> Vec<u32> {
        [
            (ToplevelStates::MAXIMIZED, 1),
            (ToplevelStates::FULLSCREEN, 2),
            (ToplevelStates::RESIZING, 3),
            (ToplevelStates::ACTIVATED, 4),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, value)| value)
        .collect()
    }
}

/// Valid `xdg_toplevel.resize_edge` values
const RESIZE_EDGES: [u32; 9] = [0, 1, 2, 4, 5, 6, 8, 9, 10];

#[derive(Debug, Clone, Default)]
pub struct ToplevelState {
    pub title: Option<String>,
    pub app_id: Option<String>,
    /// Parent `xdg_toplevel`
    pub parent: Option<ObjectId>,
    /// Zero means unconstrained on that axis
    pub min_size: Size,
    pub max_size: Size,
    pub states: ToplevelStates,
    pub fullscreen_output: Option<ObjectId>,
    pub minimized: bool,
    pub suggested_size: Option<Size>,
}

impl ToplevelState {
    pub fn states(&self) -> ToplevelStates {
        self.states
    }

    /// Size to put in the next configure; zero lets the client decide
    pub fn configure_size(&self, output: Size) -> Size {
        if self
            .states
            .intersects(ToplevelStates::MAXIMIZED | ToplevelStates::FULLSCREEN)
        {
            return output;
        }
        let Some(size) = self.suggested_size else {
            return Size::default();
        };
        Size::new(
            constrain(size.width, self.min_size.width, self.max_size.width),
            constrain(size.height, self.min_size.height, self.max_size.height),
        )
    }
}

fn constrain(value: i32, min: i32, max: i32) -> i32 {
    if value == 0 {
        return 0;
    }
    let value = if max > 0 { value.min(max) } else { value };
    value.max(min)
}

pub(crate) fn configure_event(size: Size, states: ToplevelStates) -> (u16, Vec<Argument>) {
    let array = states
        .wire_values()
        .into_iter()
        .flat_map(u32::to_ne_bytes)
        .collect();
    (
        CONFIGURE,
        vec![
            Argument::Int(size.width),
            Argument::Int(size.height),
            Argument::array(array),
        ],
    )
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
        .ok_or_else(|| DispatchError::Implementation(anyhow::anyhow!("no surface for toplevel {:?}", object)))?;
    let policy = display.config.shell.size_constraint_policy;

    match opcode {
        // destroy
        0 => Ok(()),
        // set_parent
        1 => {
            let parent = reader.optional_object().map_err(malformed)?;
            set_parent(display, object, surface, parent)
        }
        // set_title
        2 => {
            let title = reader.string().map_err(malformed)?;
            update(display, surface, |t| t.title = Some(title));
            Ok(())
        }
        // set_app_id
        3 => {
            let app_id = reader.string().map_err(malformed)?;
            update(display, surface, |t| t.app_id = Some(app_id));
            Ok(())
        }
        // show_window_menu
        4 => {
            debug!("Window menu requested for {:?}", surface);
            Ok(())
        }
        // move
        5 => {
            let _seat = reader.object().map_err(malformed)?;
            let serial = reader.uint().map_err(malformed)?;
            debug!("Interactive move of {:?} (serial {})", surface, serial);
            Ok(())
        }
        // resize
        6 => {
            let _seat = reader.object().map_err(malformed)?;
            let serial = reader.uint().map_err(malformed)?;
            let edges = reader.uint().map_err(malformed)?;
            if !RESIZE_EDGES.contains(&edges) {
                return Err(ProtocolError::new(
                    object.id,
                    XdgToplevelError::InvalidResizeEdge,
                    format!("invalid resize edge {}", edges),
                )
                .into());
            }
            debug!("Interactive resize of {:?} edges {} (serial {})", surface, edges, serial);
            Ok(())
        }
        // set_max_size, set_min_size
        7 | 8 => {
            let width = reader.int().map_err(malformed)?;
            let height = reader.int().map_err(malformed)?;
            let requested = Size::new(width, height);
            let is_max = opcode == 7;
            let mut result = Ok(());
            update(display, surface, |t| {
                result = apply_size_constraint(t, requested, is_max, policy);
            });
            result.map_err(|message| {
                ProtocolError::new(object.id, XdgToplevelError::InvalidSize, message).into()
            })
        }
        // set_maximized, unset_maximized
        9 | 10 => {
            let maximized = opcode == 9;
            set_state(display, surface, ToplevelStates::MAXIMIZED, maximized);
            Ok(())
        }
        // set_fullscreen
        11 => {
            let output = reader.optional_object().map_err(malformed)?;
            update(display, surface, |t| t.fullscreen_output = output);
            set_state(display, surface, ToplevelStates::FULLSCREEN, true);
            Ok(())
        }
        // unset_fullscreen
        12 => {
            update(display, surface, |t| t.fullscreen_output = None);
            set_state(display, surface, ToplevelStates::FULLSCREEN, false);
            Ok(())
        }
        // set_minimized
        13 => {
            update(display, surface, |t| t.minimized = true);
            info!("🔽 {:?} minimized", surface);
            if display.role(surface).map_or(false, |r| r.configure.initial_sent()) {
                send_configure(display, surface);
            }
            Ok(())
        }
        _ => Err(ProtocolError::invalid_method(object.id, "unknown xdg_toplevel request").into()),
    }
}

fn update(display: &mut Display, surface: ObjectRef, apply: impl FnOnce(&mut ToplevelState)) {
    if let Some(role) = role_mut(display, surface) {
        if let RoleData::Toplevel(toplevel) = &mut role.data {
            apply(toplevel);
        }
    }
}

/// Changes a state flag
///
/// State requests are always answered with a configure once the client has
/// seen the initial one, even when nothing changed
fn set_state(display: &mut Display, surface: ObjectRef, flag: ToplevelStates, on: bool) {
    let mut initial_sent = false;
    if let Some(role) = role_mut(display, surface) {
        initial_sent = role.configure.initial_sent();
        if let RoleData::Toplevel(toplevel) = &mut role.data {
            toplevel.states.set(flag, on);
        }
    }
    if initial_sent {
        send_configure(display, surface);
    }
}

fn apply_size_constraint(
    toplevel: &mut ToplevelState,
    requested: Size,
    is_max: bool,
    policy: SizeConstraintPolicy,
) -> Result<(), String> {
    if requested.width < 0 || requested.height < 0 {
        return Err(format!(
            "negative size {}x{}",
            requested.width, requested.height
        ));
    }

    let (min, max) = if is_max {
        (toplevel.min_size, requested)
    } else {
        (requested, toplevel.max_size)
    };
    let width_conflict = max.width > 0 && min.width > max.width;
    let height_conflict = max.height > 0 && min.height > max.height;

    if (width_conflict || height_conflict) && policy == SizeConstraintPolicy::Reject {
        return Err(format!(
            "min size {}x{} exceeds max size {}x{}",
            min.width, min.height, max.width, max.height
        ));
    }

    if is_max {
        toplevel.max_size = requested;
        if width_conflict {
            toplevel.min_size.width = requested.width;
        }
        if height_conflict {
            toplevel.min_size.height = requested.height;
        }
    } else {
        toplevel.min_size = requested;
        if width_conflict {
            toplevel.max_size.width = requested.width;
        }
        if height_conflict {
            toplevel.max_size.height = requested.height;
        }
    }
    Ok(())
}

fn set_parent(
    display: &mut Display,
    object: ObjectRef,
    surface: ObjectRef,
    parent: Option<ObjectId>,
) -> Result<(), DispatchError> {
    if let Some(parent) = parent {
        // Walk the parent chain: no toplevel may become its own ancestor.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == object.id {
                return Err(ProtocolError::new(
                    object.id,
                    XdgToplevelError::InvalidParent,
                    format!("setting parent {} would create a cycle", parent),
                )
                .into());
            }
            cursor = display
                .surface_for_role(ObjectRef::new(object.client, current))
                .and_then(|s| display.role(s))
                .and_then(|r| r.toplevel())
                .and_then(|t| t.parent);
        }
    }

    let key = ListenerKey::new(object, PARENT_LISTENER);
    let previous = display
        .role(surface)
        .and_then(|r| r.toplevel())
        .and_then(|t| t.parent);
    if let Some(previous) = previous {
        display.remove_destroy_listener(ObjectRef::new(object.client, previous), key);
    }

    update(display, surface, |t| t.parent = parent);

    if let Some(parent) = parent {
        display.add_destroy_listener(
            ObjectRef::new(object.client, parent),
            key,
            Box::new(move |display, _| {
                update(display, surface, |t| t.parent = None);
            }),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_array_encoding() {
        let (_, args) = configure_event(
            Size::new(800, 600),
            ToplevelStates::MAXIMIZED | ToplevelStates::ACTIVATED,
        );
        assert_eq!(
            args[2],
            Argument::array(vec![1, 0, 0, 0, 4, 0, 0, 0])
        );
    }

    #[test]
    fn test_maximized_uses_output_size() {
        let toplevel = ToplevelState {
            states: ToplevelStates::MAXIMIZED,
            suggested_size: Some(Size::new(300, 200)),
            ..ToplevelState::default()
        };
        assert_eq!(
            toplevel.configure_size(Size::new(1920, 1080)),
            Size::new(1920, 1080)
        );
    }

    #[test]
    fn test_suggested_size_respects_constraints() {
        let toplevel = ToplevelState {
            min_size: Size::new(400, 0),
            max_size: Size::new(0, 500),
            suggested_size: Some(Size::new(300, 900)),
            ..ToplevelState::default()
        };
        assert_eq!(
            toplevel.configure_size(Size::new(1920, 1080)),
            Size::new(400, 500)
        );
    }

    #[test]
    fn test_clamp_policy_latest_request_wins() {
        let mut toplevel = ToplevelState::default();
        apply_size_constraint(&mut toplevel, Size::new(500, 500), false, SizeConstraintPolicy::Clamp)
            .unwrap();
        apply_size_constraint(&mut toplevel, Size::new(300, 800), true, SizeConstraintPolicy::Clamp)
            .unwrap();
        assert_eq!(toplevel.max_size, Size::new(300, 800));
        assert_eq!(toplevel.min_size, Size::new(300, 500));
    }

    #[test]
    fn test_reject_policy_refuses_inverted_bounds() {
        let mut toplevel = ToplevelState::default();
        apply_size_constraint(&mut toplevel, Size::new(500, 500), false, SizeConstraintPolicy::Reject)
            .unwrap();
        assert!(apply_size_constraint(
            &mut toplevel,
            Size::new(300, 800),
            true,
            SizeConstraintPolicy::Reject
        )
        .is_err());
        assert_eq!(toplevel.max_size, Size::default());
    }

    #[test]
    fn test_negative_sizes_are_invalid() {
        let mut toplevel = ToplevelState::default();
        assert!(apply_size_constraint(
            &mut toplevel,
            Size::new(-1, 10),
            false,
            SizeConstraintPolicy::Clamp
        )
        .is_err());
    }
}
