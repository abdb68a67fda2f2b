//! Pointer focus and event routing for one `wl_pointer`
//!
//! The [`PointerRouter`] turns platform pointer samples into the protocol's
//! enter/leave/motion/button/axis events. Each public operation is one
//! batch, and a batch that sent anything ends with a single `frame` (on
//! pointers new enough to know about frames).
//!
//! Everything that touches the outside world goes through [`PointerHost`],
//! so the state machine can be exercised without a display.

use crate::geometry::{Point, PointF};
use crate::protocol::client::ProtocolEvent;
use crate::protocol::object::ObjectId;
use crate::protocol::wire::{Argument, ArgumentExt};
use crate::session::BufferStreamId;
use bitflags::bitflags;
use log::{trace, warn};

/// First `wl_pointer` version with the frame event
pub const FRAME_SINCE: u32 = 5;

bitflags! {
    /// Buttons held down, as reported by the platform
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u32 {
        const PRIMARY = 1 << 0;
        const SECONDARY = 1 << 1;
        const TERTIARY = 1 << 2;
        const SIDE = 1 << 3;
        const EXTRA = 1 << 4;
        const FORWARD = 1 << 5;
        const BACK = 1 << 6;
        const TASK = 1 << 7;
    }
}

/// Linux input event codes, in button-bit order
const BUTTON_CODES: [(PointerButtons, u32); 8] = [
    (PointerButtons::PRIMARY, 0x110),
    (PointerButtons::SECONDARY, 0x111),
    (PointerButtons::TERTIARY, 0x112),
    (PointerButtons::SIDE, 0x113),
    (PointerButtons::EXTRA, 0x114),
    (PointerButtons::FORWARD, 0x115),
    (PointerButtons::BACK, 0x116),
    (PointerButtons::TASK, 0x117),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ButtonState {
    Released = 0,
    Pressed = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Axis {
    Vertical = 0,
    Horizontal = 1,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter {
        serial: u32,
        surface: ObjectId,
        position: PointF,
    },
    Leave {
        serial: u32,
        surface: ObjectId,
    },
    Motion {
        time: u32,
        position: PointF,
    },
    Button {
        serial: u32,
        time: u32,
        button: u32,
        state: ButtonState,
    },
    Axis {
        time: u32,
        axis: Axis,
        value: f64,
    },
    Frame,
}

impl ProtocolEvent for PointerEvent {
    fn opcode(&self) -> u16 {
        match self {
            PointerEvent::Enter { .. } => 0,
            PointerEvent::Leave { .. } => 1,
            PointerEvent::Motion { .. } => 2,
            PointerEvent::Button { .. } => 3,
            PointerEvent::Axis { .. } => 4,
            PointerEvent::Frame => 5,
        }
    }

    fn into_args(self) -> Vec<Argument> {
        match self {
            PointerEvent::Enter {
                serial,
                surface,
                position,
            } => vec![
                Argument::Uint(serial),
                Argument::object(surface),
                Argument::fixed(position.x),
                Argument::fixed(position.y),
            ],
            PointerEvent::Leave { serial, surface } => {
                vec![Argument::Uint(serial), Argument::object(surface)]
            }
            PointerEvent::Motion { time, position } => vec![
                Argument::Uint(time),
                Argument::fixed(position.x),
                Argument::fixed(position.y),
            ],
            PointerEvent::Button {
                serial,
                time,
                button,
                state,
            } => vec![
                Argument::Uint(serial),
                Argument::Uint(time),
                Argument::Uint(button),
                Argument::Uint(state as u32),
            ],
            PointerEvent::Axis { time, axis, value } => vec![
                Argument::Uint(time),
                Argument::Uint(axis as u32),
                Argument::fixed(value),
            ],
            PointerEvent::Frame => vec![],
        }
    }
}

/// Cursor image requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorImage {
    /// Never set; the server's default cursor stays
    #[default]
    Unset,
    Hidden,
    Stream {
        stream: BufferStreamId,
        hotspot: Point,
    },
}

/// Everything the router needs from the outside world
pub trait PointerHost {
    /// Next serial of the pointer's connection
    fn next_serial(&mut self) -> u32;
    fn send(&mut self, event: PointerEvent);
    /// Start getting told when `surface` is destroyed
    fn watch_surface(&mut self, surface: ObjectId);
    fn unwatch_surface(&mut self, surface: ObjectId);
    /// Shows `cursor` while the pointer is over `surface`
    fn apply_cursor(&mut self, surface: ObjectId, cursor: &CursorImage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSettings {
    /// Multiplier for scroll deltas
    pub axis_scale: f64,
    /// Close enter/leave-only batches with a frame too
    pub frame_on_enter_leave: bool,
    pub supports_frame: bool,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            axis_scale: 10.0,
            frame_on_enter_leave: true,
            supports_frame: true,
        }
    }
}

/// One platform pointer event, in the focused surface's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    pub time: u32,
    pub position: PointF,
    pub buttons: PointerButtons,
    pub horizontal_scroll: f64,
    pub vertical_scroll: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Batch {
    focus_changed: bool,
    input: bool,
}

#[derive(Debug)]
pub struct PointerRouter {
    settings: PointerSettings,
    focus: Option<ObjectId>,
    last_position: Option<PointF>,
    buttons: PointerButtons,
    cursor: CursorImage,
    batch: Batch,
}

impl PointerRouter {
    pub fn new(settings: PointerSettings) -> Self {
        Self {
            settings,
            focus: None,
            last_position: None,
            buttons: PointerButtons::empty(),
            cursor: CursorImage::Unset,
            batch: Batch::default(),
        }
    }

    pub fn focus(&self) -> Option<ObjectId> {
        self.focus
    }

    pub fn last_position(&self) -> Option<PointF> {
        self.last_position
    }

    pub fn buttons(&self) -> PointerButtons {
        self.buttons
    }

    pub fn cursor(&self) -> CursorImage {
        self.cursor
    }

    /// Gives the pointer focus on `surface`
    ///
    /// Entering the focused surface again is treated as motion.
    pub fn enter(&mut self, host: &mut dyn PointerHost, surface: ObjectId, position: PointF, time: u32) {
        self.focus_or_move(host, surface, position, time);
        self.finish(host);
    }

    /// Moves the pointer; a different surface means leave then enter
    pub fn motion(&mut self, host: &mut dyn PointerHost, surface: ObjectId, position: PointF, time: u32) {
        self.focus_or_move(host, surface, position, time);
        self.finish(host);
    }

    /// Reports the full button state; only changed buttons produce events
    pub fn button(&mut self, host: &mut dyn PointerHost, buttons: PointerButtons, time: u32) {
        self.update_buttons(host, buttons, time);
        self.finish(host);
    }

    pub fn scroll(&mut self, host: &mut dyn PointerHost, horizontal: f64, vertical: f64, time: u32) {
        self.send_scroll(host, horizontal, vertical, time);
        self.finish(host);
    }

    pub fn leave(&mut self, host: &mut dyn PointerHost) {
        self.leave_focus(host, true);
        self.finish(host);
    }

    /// Applies a whole platform event over `surface` as one frame
    pub fn handle(&mut self, host: &mut dyn PointerHost, surface: ObjectId, sample: PointerSample) {
        self.focus_or_move(host, surface, sample.position, sample.time);
        self.update_buttons(host, sample.buttons, sample.time);
        self.send_scroll(host, sample.horizontal_scroll, sample.vertical_scroll, sample.time);
        self.finish(host);
    }

    /// Stores the client's cursor and shows it if a surface is focused
    pub fn set_cursor(&mut self, host: &mut dyn PointerHost, cursor: CursorImage) -> anyhow::Result<()> {
        self.cursor = cursor;
        match self.focus {
            Some(surface) => host.apply_cursor(surface, &self.cursor),
            None => Ok(()),
        }
    }

    /// The focused surface was destroyed; its destroy watch already fired
    pub fn surface_destroyed(&mut self, host: &mut dyn PointerHost, surface: ObjectId) {
        if self.focus == Some(surface) {
            self.leave_focus(host, false);
            self.finish(host);
        }
    }

    fn focus_or_move(&mut self, host: &mut dyn PointerHost, surface: ObjectId, position: PointF, time: u32) {
        if self.focus == Some(surface) {
            if self.last_position != Some(position) {
                host.send(PointerEvent::Motion { time, position });
                self.last_position = Some(position);
                self.batch.input = true;
            }
            return;
        }

        self.leave_focus(host, true);

        let serial = host.next_serial();
        host.send(PointerEvent::Enter {
            serial,
            surface,
            position,
        });
        host.watch_surface(surface);
        self.focus = Some(surface);
        self.last_position = Some(position);
        self.batch.focus_changed = true;
        trace!("pointer entered {}", surface);

        if let Err(e) = host.apply_cursor(surface, &self.cursor) {
            warn!("Failed to apply cursor on {}: {:#}", surface, e);
        }
    }

    fn leave_focus(&mut self, host: &mut dyn PointerHost, unwatch: bool) {
        let Some(surface) = self.focus.take() else {
            return;
        };
        let serial = host.next_serial();
        host.send(PointerEvent::Leave { serial, surface });
        if unwatch {
            host.unwatch_surface(surface);
        }
        self.last_position = None;
        self.batch.focus_changed = true;
        trace!("pointer left {}", surface);
    }

    fn update_buttons(&mut self, host: &mut dyn PointerHost, buttons: PointerButtons, time: u32) {
        let changed = self.buttons ^ buttons;
        self.buttons = buttons;
        if self.focus.is_none() || changed.is_empty() {
            return;
        }

        for (flag, code) in BUTTON_CODES {
            if !changed.contains(flag) {
                continue;
            }
            let state = if buttons.contains(flag) {
                ButtonState::Pressed
            } else {
                ButtonState::Released
            };
            let serial = host.next_serial();
            host.send(PointerEvent::Button {
                serial,
                time,
                button: code,
                state,
            });
        }
        self.batch.input = true;
    }

    fn send_scroll(&mut self, host: &mut dyn PointerHost, horizontal: f64, vertical: f64, time: u32) {
        if self.focus.is_none() {
            return;
        }
        for (axis, delta) in [(Axis::Horizontal, horizontal), (Axis::Vertical, vertical)] {
            if delta != 0.0 {
                host.send(PointerEvent::Axis {
                    time,
                    axis,
                    value: delta * self.settings.axis_scale,
                });
                self.batch.input = true;
            }
        }
    }

    fn finish(&mut self, host: &mut dyn PointerHost) {
        let batch = std::mem::take(&mut self.batch);
        let wants_frame = batch.input || (batch.focus_changed && self.settings.frame_on_enter_leave);
        if wants_frame && self.settings.supports_frame {
            host.send(PointerEvent::Frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        serial: u32,
        events: Vec<PointerEvent>,
        watched: Vec<ObjectId>,
        cursors: Vec<(ObjectId, CursorImage)>,
    }

    impl PointerHost for RecordingHost {
        fn next_serial(&mut self) -> u32 {
            self.serial += 1;
            self.serial
        }

        fn send(&mut self, event: PointerEvent) {
            self.events.push(event);
        }

        fn watch_surface(&mut self, surface: ObjectId) {
            self.watched.push(surface);
        }

        fn unwatch_surface(&mut self, surface: ObjectId) {
            self.watched.retain(|s| *s != surface);
        }

        fn apply_cursor(&mut self, surface: ObjectId, cursor: &CursorImage) -> anyhow::Result<()> {
            self.cursors.push((surface, *cursor));
            Ok(())
        }
    }

    fn kinds(events: &[PointerEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                PointerEvent::Enter { .. } => "enter",
                PointerEvent::Leave { .. } => "leave",
                PointerEvent::Motion { .. } => "motion",
                PointerEvent::Button { .. } => "button",
                PointerEvent::Axis { .. } => "axis",
                PointerEvent::Frame => "frame",
            })
            .collect()
    }

    const A: ObjectId = ObjectId::new(10);
    const B: ObjectId = ObjectId::new(11);

    #[test]
    fn test_enter_motion_enter_sequence() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());

        router.enter(&mut host, A, PointF::new(1.0, 1.0), 0);
        router.motion(&mut host, A, PointF::new(2.0, 2.0), 1);
        router.enter(&mut host, B, PointF::new(3.0, 3.0), 2);

        assert_eq!(
            kinds(&host.events),
            vec!["enter", "frame", "motion", "frame", "leave", "enter", "frame"]
        );
        assert_eq!(host.watched, vec![B]);
    }

    #[test]
    fn test_enter_on_focused_surface_is_motion() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.enter(&mut host, A, PointF::new(1.0, 1.0), 0);
        router.enter(&mut host, A, PointF::new(5.0, 1.0), 1);
        assert_eq!(kinds(&host.events), vec!["enter", "frame", "motion", "frame"]);
    }

    #[test]
    fn test_motion_without_movement_sends_nothing() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.enter(&mut host, A, PointF::new(1.0, 1.0), 0);
        host.events.clear();
        router.motion(&mut host, A, PointF::new(1.0, 1.0), 1);
        assert!(host.events.is_empty());
    }

    #[test]
    fn test_only_changed_buttons_are_reported() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.enter(&mut host, A, PointF::new(1.0, 1.0), 0);
        router.button(&mut host, PointerButtons::PRIMARY, 1);
        host.events.clear();

        router.button(&mut host, PointerButtons::PRIMARY | PointerButtons::SECONDARY, 2);
        assert_eq!(host.events.len(), 2);
        match host.events[0] {
            PointerEvent::Button { button, state, .. } => {
                assert_eq!(button, 0x111);
                assert_eq!(state, ButtonState::Pressed);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(host.events[1], PointerEvent::Frame);

        host.events.clear();
        router.button(&mut host, PointerButtons::empty(), 3);
        // both released, one frame
        assert_eq!(kinds(&host.events), vec!["button", "button", "frame"]);
    }

    #[test]
    fn test_scroll_is_scaled() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.enter(&mut host, A, PointF::new(0.0, 0.0), 0);
        host.events.clear();
        router.scroll(&mut host, 0.0, -1.5, 4);
        assert_eq!(
            host.events[0],
            PointerEvent::Axis {
                time: 4,
                axis: Axis::Vertical,
                value: -15.0
            }
        );
    }

    #[test]
    fn test_destroyed_focus_leaves_once() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.enter(&mut host, A, PointF::new(0.0, 0.0), 0);
        host.events.clear();

        router.surface_destroyed(&mut host, A);
        router.surface_destroyed(&mut host, A);
        assert_eq!(kinds(&host.events), vec!["leave", "frame"]);
        assert_eq!(router.focus(), None);
        assert_eq!(router.last_position(), None);
    }

    #[test]
    fn test_no_frames_before_version_five() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings {
            supports_frame: false,
            ..PointerSettings::default()
        });
        router.enter(&mut host, A, PointF::new(0.0, 0.0), 0);
        router.leave(&mut host);
        assert_eq!(kinds(&host.events), vec!["enter", "leave"]);
    }

    #[test]
    fn test_handle_coalesces_into_one_frame() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.handle(
            &mut host,
            A,
            PointerSample {
                time: 7,
                position: PointF::new(4.0, 4.0),
                buttons: PointerButtons::TERTIARY,
                horizontal_scroll: 1.0,
                vertical_scroll: 0.0,
            },
        );
        assert_eq!(kinds(&host.events), vec!["enter", "button", "axis", "frame"]);
    }

    #[test]
    fn test_cursor_follows_focus() {
        let mut host = RecordingHost::default();
        let mut router = PointerRouter::new(PointerSettings::default());
        router.set_cursor(&mut host, CursorImage::Hidden).unwrap();
        assert!(host.cursors.is_empty());

        router.enter(&mut host, A, PointF::new(0.0, 0.0), 0);
        assert_eq!(host.cursors, vec![(A, CursorImage::Hidden)]);

        let stream = CursorImage::Stream {
            stream: BufferStreamId::new(3),
            hotspot: Point::new(1, 2),
        };
        router.set_cursor(&mut host, stream).unwrap();
        assert_eq!(host.cursors.last(), Some(&(A, stream)));
    }
}
