//! `xdg_positioner`: accumulates placement rules for a future popup

use super::placement::{ConstraintAdjustment, Edges, PlacementRules};
use crate::display::Display;
use crate::geometry::{Point, Rectangle, Size};
use crate::protocol::error::{DispatchError, XdgPositionerError};
use crate::protocol::object::ObjectRef;
use crate::protocol::wire::{ArgReader, Argument};
use crate::protocol::ProtocolError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Positioner {
    pub rules: PlacementRules,
    anchor_rect_set: bool,
}

impl Positioner {
    /// A popup needs both a size and an anchor rectangle
    pub fn is_complete(&self) -> bool {
        !self.rules.size.is_empty() && self.anchor_rect_set
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
    let invalid = |message: String| -> DispatchError {
        ProtocolError::new(object.id, XdgPositionerError::InvalidInput, message).into()
    };

    if opcode == 0 {
        return Ok(());
    }
    let positioner = display.shell.positioners.entry(object).or_default();

    match opcode {
        // set_size
        1 => {
            let width = reader.int().map_err(malformed)?;
            let height = reader.int().map_err(malformed)?;
            if width <= 0 || height <= 0 {
                return Err(invalid(format!("invalid popup size {}x{}", width, height)));
            }
            positioner.rules.size = Size::new(width, height);
        }
        // set_anchor_rect
        2 => {
            let x = reader.int().map_err(malformed)?;
            let y = reader.int().map_err(malformed)?;
            let width = reader.int().map_err(malformed)?;
            let height = reader.int().map_err(malformed)?;
            if width < 0 || height < 0 {
                return Err(invalid(format!("invalid anchor rect size {}x{}", width, height)));
            }
            positioner.rules.anchor_rect = Rectangle::new(x, y, width, height);
            positioner.anchor_rect_set = true;
        }
        // set_anchor
        3 => {
            let value = reader.uint().map_err(malformed)?;
            positioner.rules.anchor = Edges::from_positioner_value(value)
                .ok_or_else(|| invalid(format!("invalid anchor {}", value)))?;
        }
        // set_gravity
        4 => {
            let value = reader.uint().map_err(malformed)?;
            positioner.rules.gravity = Edges::from_positioner_value(value)
                .ok_or_else(|| invalid(format!("invalid gravity {}", value)))?;
        }
        // set_constraint_adjustment
        5 => {
            let value = reader.uint().map_err(malformed)?;
            positioner.rules.constraint_adjustment = ConstraintAdjustment::from_bits(value)
                .ok_or_else(|| invalid(format!("invalid constraint adjustment {:#x}", value)))?;
        }
        // set_offset
        6 => {
            let x = reader.int().map_err(malformed)?;
            let y = reader.int().map_err(malformed)?;
            positioner.rules.offset = Point::new(x, y);
        }
        _ => {
            return Err(ProtocolError::invalid_method(object.id, "unknown xdg_positioner request").into())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        let mut positioner = Positioner::default();
        assert!(!positioner.is_complete());
        positioner.rules.size = Size::new(10, 10);
        assert!(!positioner.is_complete());
        positioner.anchor_rect_set = true;
        assert!(positioner.is_complete());
    }
}
