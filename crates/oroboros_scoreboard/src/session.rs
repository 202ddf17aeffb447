//! # Session Directory
//!
//! The host's view of connected sessions. Boards use it to resolve a
//! viewer and to swap the display surface a session is looking at.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::board::BoardId;

/// Unique identifier for a viewing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved, connected session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Display name, used in logs.
    pub name: String,
}

/// What a session's sidebar currently shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Surface {
    /// The host's main surface.
    #[default]
    Default,
    /// The surface of one scoreboard.
    Board(BoardId),
}

/// Host-side session lookup and surface assignment.
///
/// Called with a board lock held: implementations must not call back
/// into the board.
pub trait SessionDirectory: Send + Sync {
    /// Resolves a connected session.
    fn resolve_session(&self, id: SessionId) -> Option<Session>;

    /// All currently connected sessions.
    fn active_sessions(&self) -> Vec<SessionId>;

    /// Puts the session back on the host's main surface.
    fn restore_default_surface(&self, session: &Session);

    /// Shows the board's surface to the session.
    fn apply_surface(&self, session: &Session, board: BoardId);
}

/// In-memory directory for hosts without their own and for tests.
#[derive(Debug, Default)]
pub struct MemorySessionDirectory {
    sessions: RwLock<HashMap<SessionId, (Session, Surface)>>,
}

impl MemorySessionDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connected session on the default surface.
    pub fn connect(&self, id: SessionId, name: impl Into<String>) -> Session {
        let session = Session {
            id,
            name: name.into(),
        };
        self.sessions
            .write()
            .insert(id, (session.clone(), Surface::Default));
        session
    }

    /// Forgets a session.
    pub fn disconnect(&self, id: SessionId) -> Option<Session> {
        self.sessions.write().remove(&id).map(|(session, _)| session)
    }

    /// Surface the session currently sees.
    #[must_use]
    pub fn surface(&self, id: SessionId) -> Option<Surface> {
        self.sessions.read().get(&id).map(|(_, surface)| *surface)
    }

    fn set_surface(&self, id: SessionId, surface: Surface) {
        if let Some(entry) = self.sessions.write().get_mut(&id) {
            entry.1 = surface;
        }
    }
}

impl SessionDirectory for MemorySessionDirectory {
    fn resolve_session(&self, id: SessionId) -> Option<Session> {
        self.sessions.read().get(&id).map(|(session, _)| session.clone())
    }

    fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn restore_default_surface(&self, session: &Session) {
        self.set_surface(session.id, Surface::Default);
    }

    fn apply_surface(&self, session: &Session, board: BoardId) {
        self.set_surface(session.id, Surface::Board(board));
    }
}
