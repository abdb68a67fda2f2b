//! Pointer focus, button and frame routing as seen by clients

mod common;

use common::{events_on, opcodes_on, Harness};
use mockall::mock;
use std::sync::Arc;
use wayfront::geometry::{Point, PointF, Size};
use wayfront::session::{BufferStreamId, Session, SessionLookup};
use wayfront::{
    Argument, ArgumentExt, ClientId, ClientInfo, Display, Interface, ObjectId, ObjectRef, PointerButtons, PointerInput,
    SurfaceTarget, WayfrontConfig,
};

const ENTER: u16 = 0;
const LEAVE: u16 = 1;
const MOTION: u16 = 2;
const BUTTON: u16 = 3;
const AXIS: u16 = 4;
const FRAME: u16 = 5;

mock! {
    pub Window {}
    impl Session for Window {
        fn set_cursor_stream(&self, surface: ObjectRef, stream: BufferStreamId, hotspot: Point) -> anyhow::Result<()>;
        fn hide_cursor(&self, surface: ObjectRef) -> anyhow::Result<()>;
    }
}

/// Hands the same session to every client
struct SharedSession(Arc<dyn Session>);

impl SessionLookup for SharedSession {
    fn session_for(&self, _client: ClientId) -> Option<Arc<dyn Session>> {
        Some(Arc::clone(&self.0))
    }
}

fn get_pointer(h: &mut Harness, seat_version: u32) -> ObjectId {
    let seat = h.bind(Interface::WlSeat, seat_version);
    let pointer = h.new_id();
    h.request(seat, 0, vec![Argument::NewId(pointer)]).unwrap();
    pointer
}

fn input(x: f64, y: f64, time: u32) -> PointerInput {
    PointerInput::at(PointF::new(x, y), time)
}

fn target(h: &Harness, surface: ObjectId, origin: Point) -> Option<SurfaceTarget> {
    Some(SurfaceTarget {
        surface: h.object(surface),
        origin,
    })
}

fn fixed(value: f64) -> Argument {
    Argument::fixed(value)
}

#[test]
fn focus_moves_between_surfaces() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let a = h.create_surface(compositor);
    let b = h.create_surface(compositor);
    h.events();

    let over_a = target(&h, a, Point::new(0, 0));
    let over_b = target(&h, b, Point::new(100, 0));
    h.display.pointer_input(input(5.0, 5.0, 1), over_a);
    h.display.pointer_input(input(6.0, 5.0, 2), over_a);
    h.display.pointer_input(input(110.0, 10.0, 3), over_b);

    let events = events_on(&h.events(), pointer);
    let opcodes: Vec<u16> = events.iter().map(|(opcode, _)| *opcode).collect();
    assert_eq!(opcodes, vec![ENTER, FRAME, MOTION, FRAME, LEAVE, ENTER, FRAME]);

    assert_eq!(&events[0].1[1..], &[Argument::object(a), fixed(5.0), fixed(5.0)]);
    assert_eq!(events[2].1, vec![Argument::Uint(2), fixed(6.0), fixed(5.0)]);
    assert_eq!(events[4].1[1], Argument::object(a));
    assert_eq!(&events[5].1[1..], &[Argument::object(b), fixed(10.0), fixed(10.0)]);

    let router = h.display.seat().pointer(h.object(pointer)).unwrap();
    assert_eq!(router.focus(), Some(b));
}

#[test]
fn unchanged_position_sends_nothing() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);
    let over = target(&h, surface, Point::new(0, 0));

    h.display.pointer_input(input(5.0, 5.0, 1), over);
    h.events();
    h.display.pointer_input(input(5.0, 5.0, 2), over);
    assert!(opcodes_on(&h.events(), pointer).is_empty());
}

#[test]
fn only_changed_buttons_are_reported() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);
    let over = target(&h, surface, Point::new(0, 0));
    h.display.pointer_input(input(1.0, 1.0, 1), over);
    h.events();

    let mut press = input(1.0, 1.0, 2);
    press.buttons = PointerButtons::PRIMARY;
    h.display.pointer_input(press, over);

    let mut both = input(1.0, 1.0, 3);
    both.buttons = PointerButtons::PRIMARY | PointerButtons::SECONDARY;
    h.display.pointer_input(both, over);

    h.display.pointer_input(input(1.0, 1.0, 4), over);

    let buttons: Vec<(u32, u32, u32)> = events_on(&h.events(), pointer)
        .into_iter()
        .filter(|(opcode, _)| *opcode == BUTTON)
        .map(|(_, args)| match args[1..] {
            [Argument::Uint(time), Argument::Uint(button), Argument::Uint(state)] => (time, button, state),
            _ => panic!("malformed button event {:?}", args),
        })
        .collect();
    assert_eq!(
        buttons,
        vec![
            (2, 0x110, 1),
            (3, 0x111, 1),
            (4, 0x110, 0),
            (4, 0x111, 0),
        ]
    );
}

#[test]
fn button_serials_become_the_latest_input_serial() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);
    let over = target(&h, surface, Point::new(0, 0));

    let mut press = input(1.0, 1.0, 1);
    press.buttons = PointerButtons::TERTIARY;
    h.display.pointer_input(press, over);

    let events = events_on(&h.events(), pointer);
    let button = events.iter().find(|(opcode, _)| *opcode == BUTTON).unwrap();
    let Argument::Uint(serial) = button.1[0] else {
        panic!("button without serial");
    };
    assert_eq!(h.display.seat().last_serial(h.client), Some(serial));
}

#[test]
fn scroll_is_scaled() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);
    let over = target(&h, surface, Point::new(0, 0));
    h.display.pointer_input(input(1.0, 1.0, 1), over);
    h.events();

    let mut scroll = input(1.0, 1.0, 2);
    scroll.vertical_scroll = 1.5;
    h.display.pointer_input(scroll, over);

    assert_eq!(
        events_on(&h.events(), pointer),
        vec![
            (AXIS, vec![Argument::Uint(2), Argument::Uint(0), fixed(15.0)]),
            (FRAME, vec![])
        ]
    );
}

#[test]
fn destroying_the_focused_surface_leaves_once() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);
    h.display
        .pointer_input(input(3.0, 3.0, 1), target(&h, surface, Point::new(0, 0)));
    h.events();

    h.request(surface, 0, vec![]).unwrap();
    h.display.pointer_input(input(3.0, 3.0, 2), None);

    let opcodes = opcodes_on(&h.events(), pointer);
    assert_eq!(opcodes.iter().filter(|op| **op == LEAVE).count(), 1);
    assert_eq!(opcodes, vec![LEAVE, FRAME]);
    assert_eq!(h.display.seat().pointer(h.object(pointer)).unwrap().focus(), None);
}

#[test]
fn old_pointers_get_no_frames() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 4);
    let surface = h.create_surface(compositor);
    let over = target(&h, surface, Point::new(0, 0));

    h.display.pointer_input(input(1.0, 1.0, 1), over);
    h.display.pointer_input(input(2.0, 1.0, 2), over);
    assert_eq!(opcodes_on(&h.events(), pointer), vec![ENTER, MOTION]);
}

#[test]
fn focus_leaving_a_client_sends_it_a_leave() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let pointer = get_pointer(&mut h, 5);
    let surface = h.create_surface(compositor);

    let other = h.display.connect(ClientInfo::named("other"));
    let seat_global = h.display.global_for(Interface::WlSeat).unwrap();
    let compositor_global = h.display.global_for(Interface::WlCompositor).unwrap();
    h.display.bind(other, seat_global, 5, ObjectId::new(2)).unwrap();
    h.display.bind(other, compositor_global, 4, ObjectId::new(3)).unwrap();
    h.display
        .dispatch(other, ObjectId::new(2), 0, vec![Argument::NewId(ObjectId::new(4))])
        .unwrap();
    h.display
        .dispatch(other, ObjectId::new(3), 0, vec![Argument::NewId(ObjectId::new(5))])
        .unwrap();
    h.events();
    h.display.take_events(other);

    h.display
        .pointer_input(input(1.0, 1.0, 1), target(&h, surface, Point::new(0, 0)));
    h.events();

    let foreign = SurfaceTarget {
        surface: ObjectRef::new(other, ObjectId::new(5)),
        origin: Point::new(0, 0),
    };
    h.display.pointer_input(input(2.0, 2.0, 2), Some(foreign));

    assert_eq!(opcodes_on(&h.events(), pointer), vec![LEAVE, FRAME]);
    assert_eq!(
        opcodes_on(&h.display.take_events(other), ObjectId::new(4)),
        vec![ENTER, FRAME]
    );
    assert_eq!(h.display.seat().focused_client(), Some(other));
}

#[test]
fn hit_testing_follows_mapped_windows() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let wm_base = h.bind(Interface::XdgWmBase, 3);
    let pointer = get_pointer(&mut h, 5);

    let below = h.toplevel(compositor, wm_base);
    h.map(below, Size::new(300, 300));
    let above = h.toplevel(compositor, wm_base);
    h.map(above, Size::new(100, 100));
    h.events();

    h.pointer_at(50.0, 50.0, 1);
    h.pointer_at(200.0, 200.0, 2);

    let events = events_on(&h.events(), pointer);
    let entered: Vec<Argument> = events
        .iter()
        .filter(|(opcode, _)| *opcode == ENTER)
        .map(|(_, args)| args[1].clone())
        .collect();
    assert_eq!(entered, vec![Argument::object(above.surface), Argument::object(below.surface)]);
}

#[test]
fn cursor_on_a_role_surface_is_a_role_error() {
    let mut h = Harness::new();
    let compositor = h.bind(Interface::WlCompositor, 4);
    let wm_base = h.bind(Interface::XdgWmBase, 3);
    let pointer = get_pointer(&mut h, 5);
    let window = h.toplevel(compositor, wm_base);

    let result = h.request(
        pointer,
        0,
        vec![
            Argument::Uint(0),
            Argument::object(window.surface),
            Argument::Int(0),
            Argument::Int(0),
        ],
    );
    assert!(result.is_err());
    // wl_pointer.role
    assert_eq!(h.closed_with(), Some(0));
}

#[test]
fn keyboard_is_a_missing_capability() {
    let mut h = Harness::new();
    let seat = h.bind(Interface::WlSeat, 5);
    let keyboard = h.new_id();
    assert!(h.request(seat, 1, vec![Argument::NewId(keyboard)]).is_err());
    // wl_seat.missing_capability
    assert_eq!(h.closed_with(), Some(0));
}

fn failing_cursor_display(display_version: u32) -> Harness {
    let mut session = MockWindow::new();
    session
        .expect_hide_cursor()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("window is gone")));
    session.expect_set_cursor_stream().never();

    let mut config = WayfrontConfig::default();
    config.protocol.display_version = display_version;
    let display = Display::with_sessions(&config, Arc::new(SharedSession(Arc::new(session)))).unwrap();
    Harness::with_display(display)
}

/// Focuses a mapped window, then hides the cursor over it
fn hide_cursor_over_window(h: &mut Harness) -> bool {
    let compositor = h.bind(Interface::WlCompositor, 4);
    let wm_base = h.bind(Interface::XdgWmBase, 3);
    let pointer = get_pointer(h, 5);
    let window = h.toplevel(compositor, wm_base);
    h.map(window, Size::new(100, 100));
    h.pointer_at(10.0, 10.0, 1);
    h.events();

    h.request(
        pointer,
        0,
        vec![
            Argument::Uint(0),
            Argument::null_object(),
            Argument::Int(0),
            Argument::Int(0),
        ],
    )
    .is_ok()
}

#[test]
fn session_failure_is_an_implementation_error() {
    let mut h = failing_cursor_display(2);
    assert!(!hide_cursor_over_window(&mut h));

    assert!(h.is_connected());
    let errors = opcodes_on(&h.events(), ObjectId::DISPLAY);
    assert_eq!(errors, vec![2]);
}

#[test]
fn session_failure_on_old_clients_is_no_memory() {
    let mut h = failing_cursor_display(1);
    assert!(!hide_cursor_over_window(&mut h));

    assert!(!h.is_connected());
    // wl_display.no_memory
    assert_eq!(h.closed_with(), Some(2));
}
