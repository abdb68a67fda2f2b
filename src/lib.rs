//! # wayfront
//!
//! Server side of a Wayland-style display protocol: the object runtime that
//! clients talk to, the window role state machine behind xdg-shell and the
//! wlr layer shell, and the pointer router that turns platform input into
//! focus-aware pointer events.
//!
//! ## Architecture
//!
//! - `protocol`: wire codec, interface descriptors, object tables, globals, errors
//! - `display`: the runtime; owns connections and dispatches requests
//! - `compositor`: `wl_compositor` and generic `wl_surface` state
//! - `shell`: role assignment, configure handshakes and placement
//! - `input`: `wl_seat`, `wl_pointer` and pointer routing
//! - `session`: seams to the platform (cursor imagery, per-client sessions)
//! - `work`: queue marshaling work from other threads onto the protocol thread
//! - `config`: configuration parsing and management
//!
//! Transport, rendering and window management policy live outside this crate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wayfront::{ClientInfo, Display, WayfrontConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut display = Display::new(&WayfrontConfig::default())?;
//!     let client = display.connect(ClientInfo::named("demo"));
//!     // feed the client's bytes to `dispatch_raw` and ship `take_events`
//!     let _ = display.take_events(client);
//!     Ok(())
//! }
//! ```

pub mod compositor;
pub mod config;
pub mod display;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod shell;
pub mod work;

// Re-export main types for easy access
pub use compositor::{Surface, SurfaceHitTest, SurfaceTarget};
pub use config::WayfrontConfig;
pub use display::Display;
pub use geometry::{Point, PointF, Rectangle, Size};
pub use input::{PointerButtons, PointerInput};
pub use protocol::{
    Argument, ArgumentExt, ClientId, ClientInfo, DispatchError, GlobalId, Interface, ObjectId, ObjectRef, ProtocolError,
};
pub use session::{BufferStreamId, Session, SessionLookup};
pub use shell::{Role, RoleKind};
pub use work::WorkSender;

/// Version information for wayfront
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
