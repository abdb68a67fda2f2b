//! Window-management session collaborator
//!
//! The protocol front-end does not draw anything itself. Whatever owns the
//! real windows (a scene graph, a test harness) implements [`SessionLookup`]
//! so the front-end can ask for the session belonging to a client and push
//! cursor changes to it.

use crate::geometry::Point;
use crate::protocol::{ClientId, ObjectRef};
use std::fmt;
use std::sync::Arc;

/// Buffer stream backing a surface's content
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferStreamId(u64);

impl BufferStreamId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for BufferStreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// A client's window-management session
#[cfg_attr(test, mockall::automock)]
pub trait Session: Send + Sync {
    /// Shows `stream` as the cursor while it is over `surface`
    fn set_cursor_stream(
        &self,
        surface: ObjectRef,
        stream: BufferStreamId,
        hotspot: Point,
    ) -> anyhow::Result<()>;

    /// Hides the cursor while it is over `surface`
    fn hide_cursor(&self, surface: ObjectRef) -> anyhow::Result<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait SessionLookup: Send + Sync {
    fn session_for(&self, client: ClientId) -> Option<Arc<dyn Session>>;
}

/// Session that accepts every request and draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSession;

impl Session for HeadlessSession {
    fn set_cursor_stream(
        &self,
        surface: ObjectRef,
        stream: BufferStreamId,
        hotspot: Point,
    ) -> anyhow::Result<()> {
        log::trace!("cursor {:?} at {:?} over {:?}", stream, hotspot, surface);
        Ok(())
    }

    fn hide_cursor(&self, surface: ObjectRef) -> anyhow::Result<()> {
        log::trace!("cursor hidden over {:?}", surface);
        Ok(())
    }
}

/// Gives every client a [`HeadlessSession`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSessions;

impl SessionLookup for HeadlessSessions {
    fn session_for(&self, _client: ClientId) -> Option<Arc<dyn Session>> {
        Some(Arc::new(HeadlessSession))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ObjectId;

    #[test]
    fn test_headless_sessions_accept_everything() {
        let lookup = HeadlessSessions;
        let session = lookup.session_for(ClientId::new(3)).unwrap();
        let surface = ObjectRef::new(ClientId::new(3), ObjectId::new(7));
        assert!(session
            .set_cursor_stream(surface, BufferStreamId::new(1), Point::new(2, 2))
            .is_ok());
        assert!(session.hide_cursor(surface).is_ok());
    }

    #[test]
    fn test_mock_session_reports_failures() {
        let mut session = MockSession::new();
        session
            .expect_hide_cursor()
            .returning(|_| Err(anyhow::anyhow!("window gone")));
        let surface = ObjectRef::new(ClientId::new(1), ObjectId::new(3));
        assert!(session.hide_cursor(surface).is_err());
    }
}
