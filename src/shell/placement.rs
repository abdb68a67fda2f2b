//! Popup and layer-surface placement
//!
//! Pure functions: nothing here touches protocol state, so the same inputs
//! always give the same rectangle.
//!
//! A popup is positioned relative to its parent's window geometry. The
//! resolver first computes the unconstrained rectangle from the anchor
//! rectangle, anchor edge, gravity and offset. If that rectangle leaves the
//! available area, the allowed constraint adjustments are tried per axis in
//! a fixed order: flip, then slide, then resize.

use crate::geometry::{Point, Rectangle, Size};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// A set of rectangle edges
    ///
    /// Used for positioner anchors and gravities (where opposite edges never
    /// combine) and for layer-surface anchors (where they may, meaning
    /// "stretch along that axis"). The bit values match the layer-shell
    /// wire encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Edges: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConstraintAdjustment: u32 {
        const SLIDE_X = 1;
        const SLIDE_Y = 2;
        const FLIP_X = 4;
        const FLIP_Y = 8;
        const RESIZE_X = 16;
        const RESIZE_Y = 32;
    }
}

impl Edges {
    /// Decodes the xdg-positioner anchor/gravity enumeration
    ///
    /// Returns `None` for values outside the enumeration.
    pub fn from_positioner_value(value: u32) -> Option<Edges> {
        Some(match value {
            0 => Edges::empty(),
            1 => Edges::TOP,
            2 => Edges::BOTTOM,
            3 => Edges::LEFT,
            4 => Edges::RIGHT,
            5 => Edges::TOP | Edges::LEFT,
            6 => Edges::BOTTOM | Edges::LEFT,
            7 => Edges::TOP | Edges::RIGHT,
            8 => Edges::BOTTOM | Edges::RIGHT,
            _ => return None,
        })
    }

    fn flipped_x(self) -> Edges {
        let mut out = self - (Edges::LEFT | Edges::RIGHT);
        if self.contains(Edges::LEFT) {
            out |= Edges::RIGHT;
        }
        if self.contains(Edges::RIGHT) {
            out |= Edges::LEFT;
        }
        out
    }

    fn flipped_y(self) -> Edges {
        let mut out = self - (Edges::TOP | Edges::BOTTOM);
        if self.contains(Edges::TOP) {
            out |= Edges::BOTTOM;
        }
        if self.contains(Edges::BOTTOM) {
            out |= Edges::TOP;
        }
        out
    }

    /// Gravity a layer surface effectively has for an anchor
    ///
    /// Opposite edges cancel out: anchoring to both means the surface is
    /// stretched or centred on that axis, not pulled to either side.
    pub fn layer_gravity(self) -> Edges {
        let mut out = self;
        if self.contains(Edges::LEFT | Edges::RIGHT) {
            out -= Edges::LEFT | Edges::RIGHT;
        }
        if self.contains(Edges::TOP | Edges::BOTTOM) {
            out -= Edges::TOP | Edges::BOTTOM;
        }
        out
    }
}

/// Everything needed to place a popup, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementRules {
    pub size: Size,
    pub anchor_rect: Rectangle,
    pub anchor: Edges,
    pub gravity: Edges,
    pub constraint_adjustment: ConstraintAdjustment,
    pub offset: Point,
}

/// Computes the popup rectangle relative to the parent's window geometry
///
/// `parent` is the parent's window geometry in output coordinates and
/// `available` the area the popup should stay within. When no adjustment
/// makes the popup fit, the best-effort rectangle after the allowed
/// adjustments is returned.
pub fn resolve(rules: &PlacementRules, parent: Rectangle, available: Rectangle) -> Rectangle {
    let origin = Span::from_rect(&parent);
    let available = Span::from_rect(&available);
    let base = unconstrained(rules, rules.anchor, rules.gravity);
    let mut global = base.translated(origin.x, origin.y);

    if global.overflows_x(&available) {
        if rules.constraint_adjustment.contains(ConstraintAdjustment::FLIP_X) {
            let flipped = unconstrained(rules, rules.anchor.flipped_x(), rules.gravity.flipped_x())
                .translated(origin.x, origin.y);
            if !flipped.overflows_x(&available) {
                global = flipped;
            }
        }
        if global.overflows_x(&available)
            && rules.constraint_adjustment.contains(ConstraintAdjustment::SLIDE_X)
        {
            global.x = slide(global.x, global.width, available.x, available.right());
        }
        if global.overflows_x(&available)
            && rules.constraint_adjustment.contains(ConstraintAdjustment::RESIZE_X)
        {
            let (x, width) = shrink(global.x, global.right(), available.x, available.right());
            if width > 0 {
                global.x = x;
                global.width = width;
            }
        }
    }

    if global.overflows_y(&available) {
        if rules.constraint_adjustment.contains(ConstraintAdjustment::FLIP_Y) {
            let mut flipped = unconstrained(rules, rules.anchor.flipped_y(), rules.gravity.flipped_y())
                .translated(origin.x, origin.y);
            // keep whatever the x pass decided
            flipped.x = global.x;
            flipped.width = global.width;
            if !flipped.overflows_y(&available) {
                global = flipped;
            }
        }
        if global.overflows_y(&available)
            && rules.constraint_adjustment.contains(ConstraintAdjustment::SLIDE_Y)
        {
            global.y = slide(global.y, global.height, available.y, available.bottom());
        }
        if global.overflows_y(&available)
            && rules.constraint_adjustment.contains(ConstraintAdjustment::RESIZE_Y)
        {
            let (y, height) = shrink(global.y, global.bottom(), available.y, available.bottom());
            if height > 0 {
                global.y = y;
                global.height = height;
            }
        }
    }

    global.translated(-origin.x, -origin.y).to_rect()
}

/// Rectangle in 64-bit coordinates
///
/// Client-supplied anchors, offsets and sizes are full-range `i32`s, so the
/// sums taken while placing can leave the `i32` range. The result is clamped
/// back when converted to a [`Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl Span {
    fn from_rect(rect: &Rectangle) -> Span {
        Span {
            x: rect.loc.x.into(),
            y: rect.loc.y.into(),
            width: rect.size.width.into(),
            height: rect.size.height.into(),
        }
    }

    fn right(&self) -> i64 {
        self.x + self.width
    }

    fn bottom(&self) -> i64 {
        self.y + self.height
    }

    fn translated(self, dx: i64, dy: i64) -> Span {
        Span {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    fn overflows_x(&self, available: &Span) -> bool {
        self.x < available.x || self.right() > available.right()
    }

    fn overflows_y(&self, available: &Span) -> bool {
        self.y < available.y || self.bottom() > available.bottom()
    }

    fn to_rect(self) -> Rectangle {
        Rectangle::new(clamp(self.x), clamp(self.y), clamp(self.width), clamp(self.height))
    }
}

fn clamp(value: i64) -> i32 {
    value.clamp(i32::MIN.into(), i32::MAX.into()) as i32
}

/// Rectangle before any constraint adjustment, relative to the parent
fn unconstrained(rules: &PlacementRules, anchor: Edges, gravity: Edges) -> Span {
    let rect = Span::from_rect(&rules.anchor_rect);
    let width = i64::from(rules.size.width);
    let height = i64::from(rules.size.height);

    let anchor_x = if anchor.contains(Edges::LEFT) {
        rect.x
    } else if anchor.contains(Edges::RIGHT) {
        rect.right()
    } else {
        rect.x + rect.width / 2
    };
    let anchor_y = if anchor.contains(Edges::TOP) {
        rect.y
    } else if anchor.contains(Edges::BOTTOM) {
        rect.bottom()
    } else {
        rect.y + rect.height / 2
    };

    let x = if gravity.contains(Edges::LEFT) {
        anchor_x - width
    } else if gravity.contains(Edges::RIGHT) {
        anchor_x
    } else {
        anchor_x - width / 2
    };
    let y = if gravity.contains(Edges::TOP) {
        anchor_y - height
    } else if gravity.contains(Edges::BOTTOM) {
        anchor_y
    } else {
        anchor_y - height / 2
    };

    Span {
        x: x + i64::from(rules.offset.x),
        y: y + i64::from(rules.offset.y),
        width,
        height,
    }
}

/// Moves a span by the smallest amount that fits it; too-large spans align
/// to the start of the range
fn slide(start: i64, length: i64, min: i64, max: i64) -> i64 {
    let mut start = start;
    if start + length > max {
        start = max - length;
    }
    if start < min {
        start = min;
    }
    start
}

/// Clips a span to the range; returns the new start and length
fn shrink(start: i64, end: i64, min: i64, max: i64) -> (i64, i64) {
    let start = start.max(min);
    let end = end.min(max);
    (start, end - start)
}

/// Margins around an anchored layer surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Places a layer surface within `area`
///
/// A zero dimension means "fill the area between the opposite anchors"; the
/// caller has already checked that both opposite edges are anchored. Edges
/// that are not anchored leave the surface centred on that axis.
pub fn layer_geometry(anchor: Edges, size: Size, margins: Margins, area: Rectangle) -> Rectangle {
    let area = Span::from_rect(&area);
    let (x, width) = layer_axis(
        anchor.contains(Edges::LEFT),
        anchor.contains(Edges::RIGHT),
        size.width.into(),
        margins.left.into(),
        margins.right.into(),
        area.x,
        area.width,
    );
    let (y, height) = layer_axis(
        anchor.contains(Edges::TOP),
        anchor.contains(Edges::BOTTOM),
        size.height.into(),
        margins.top.into(),
        margins.bottom.into(),
        area.y,
        area.height,
    );
    Span { x, y, width, height }.to_rect()
}

fn layer_axis(
    at_start: bool,
    at_end: bool,
    length: i64,
    margin_start: i64,
    margin_end: i64,
    origin: i64,
    extent: i64,
) -> (i64, i64) {
    match (at_start, at_end) {
        (true, true) if length == 0 => (
            origin + margin_start,
            (extent - margin_start - margin_end).max(0),
        ),
        (true, true) => {
            let free = extent - margin_start - margin_end - length;
            (origin + margin_start + free / 2, length)
        }
        (true, false) => (origin + margin_start, length),
        (false, true) => (origin + extent - margin_end - length, length),
        (false, false) => (origin + (extent - length) / 2, length),
    }
}
