//! # Board Registry
//!
//! Tracks every live scoreboard of one host so that global operations
//! (disconnect, shutdown) can reach them.
//!
//! ## Design
//!
//! The registry holds boards weakly. Dropping the last [`Scoreboard`]
//! handle frees the board; its dead entry is skipped by every operation
//! and removed by [`BoardRegistry::prune`].
//!
//! Global operations snapshot the live boards first and release the
//! registry lock before touching any board, so the registry lock and a
//! board lock are never held together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::board::{BoardId, BoardInner, Scoreboard};
use crate::scheduler::TickScheduler;
use crate::session::{SessionDirectory, SessionId};

/// Process-wide collection of scoreboards sharing one host.
pub struct BoardRegistry {
    boards: RwLock<Vec<Weak<BoardInner>>>,
    directory: Arc<dyn SessionDirectory>,
    scheduler: Arc<dyn TickScheduler>,
    next_id: AtomicU64,
}

impl BoardRegistry {
    /// Creates an empty registry bound to the host's sessions and clock.
    #[must_use]
    pub fn new(directory: Arc<dyn SessionDirectory>, scheduler: Arc<dyn TickScheduler>) -> Self {
        Self {
            boards: RwLock::new(Vec::new()),
            directory,
            scheduler,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn allocate_id(&self) -> BoardId {
        BoardId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn directory(&self) -> Arc<dyn SessionDirectory> {
        Arc::clone(&self.directory)
    }

    pub(crate) fn scheduler(&self) -> Arc<dyn TickScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub(crate) fn register(&self, board: &Scoreboard) {
        self.boards.write().push(board.downgrade());
    }

    /// Number of registered entries, including ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.read().is_empty()
    }

    /// Handles to every board still alive, in registration order.
    #[must_use]
    pub fn live_boards(&self) -> Vec<Scoreboard> {
        self.boards
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(Scoreboard::from_inner)
            .collect()
    }

    /// Looks up a live board by id.
    #[must_use]
    pub fn find(&self, id: BoardId) -> Option<Scoreboard> {
        self.live_boards().into_iter().find(|board| board.id() == id)
    }

    /// Drops entries of freed boards. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut boards = self.boards.write();
        let before = boards.len();
        boards.retain(|entry| entry.strong_count() > 0);
        before - boards.len()
    }

    /// Unregisters one board. It keeps running if it has viewers.
    ///
    /// Returns false if the board was not registered here.
    pub fn retire(&self, board: &Scoreboard) -> bool {
        let mut boards = self.boards.write();
        let before = boards.len();
        boards.retain(|entry| !board.is_same(entry));
        before != boards.len()
    }

    /// Stops every running board, then empties the registry.
    ///
    /// Viewers of stopped boards are put back on the default surface.
    /// Returns how many boards were stopped.
    pub fn clear_all_instances(&self) -> usize {
        let boards: Vec<Scoreboard> = std::mem::take(&mut *self.boards.write())
            .iter()
            .filter_map(Weak::upgrade)
            .map(Scoreboard::from_inner)
            .collect();

        let mut stopped = 0;
        for board in &boards {
            if board.is_running() && board.stop().is_ok() {
                stopped += 1;
            }
        }

        tracing::info!(boards = boards.len(), stopped, "cleared all scoreboards");
        stopped
    }

    /// Hides every board `session` is viewing, typically on disconnect.
    ///
    /// Returns how many boards were hidden.
    pub fn hide_from_all_instances(&self, session: SessionId) -> usize {
        let hidden = self
            .live_boards()
            .iter()
            .filter(|board| board.hide_if_viewing(session))
            .count();

        if hidden > 0 {
            tracing::debug!(session = %session, hidden, "hid scoreboards from session");
        }
        hidden
    }
}

impl std::fmt::Debug for BoardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardRegistry")
            .field("boards", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::session::{MemorySessionDirectory, Surface};
    use crate::sink::MemorySink;

    fn registry() -> (BoardRegistry, Arc<MemorySessionDirectory>) {
        let directory = Arc::new(MemorySessionDirectory::new());
        directory.connect(SessionId(1), "alice");
        directory.connect(SessionId(2), "bob");
        let registry = BoardRegistry::new(directory.clone(), Arc::new(ManualScheduler::new()));
        (registry, directory)
    }

    fn board(registry: &BoardRegistry, title: &str) -> Scoreboard {
        Scoreboard::builder(title)
            .build(registry, MemorySink::new())
            .unwrap()
    }

    #[test]
    fn test_register_and_find() {
        let (registry, _) = registry();
        let lobby = board(&registry, "Lobby");
        let arena = board(&registry, "Arena");

        assert_eq!(registry.len(), 2);
        assert_ne!(lobby.id(), arena.id());
        assert_eq!(registry.find(arena.id()).map(|b| b.title()).as_deref(), Some("Arena"));
    }

    #[test]
    fn test_dropped_boards_pruned() {
        let (registry, _) = registry();
        let kept = board(&registry, "Kept");
        drop(board(&registry, "Dropped"));

        assert_eq!(registry.live_boards().len(), 1);
        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.live_boards()[0].id(), kept.id());
    }

    #[test]
    fn test_retire() {
        let (registry, _) = registry();
        let lobby = board(&registry, "Lobby");

        assert!(registry.retire(&lobby));
        assert!(!registry.retire(&lobby));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_hide_from_all_instances() {
        let (registry, directory) = registry();
        let lobby = board(&registry, "Lobby");
        let arena = board(&registry, "Arena");
        lobby.show(SessionId(1)).unwrap();
        arena.show(SessionId(1)).unwrap();
        arena.show(SessionId(2)).unwrap();

        assert_eq!(registry.hide_from_all_instances(SessionId(1)), 2);
        assert!(!lobby.is_running());
        assert!(arena.is_running());
        assert_eq!(directory.surface(SessionId(1)), Some(Surface::Default));
        assert_eq!(registry.hide_from_all_instances(SessionId(1)), 0);
    }

    #[test]
    fn test_clear_all_instances() {
        let (registry, directory) = registry();
        let lobby = board(&registry, "Lobby");
        let idle = board(&registry, "Idle");
        lobby.show(SessionId(2)).unwrap();

        assert_eq!(registry.clear_all_instances(), 1);
        assert!(registry.is_empty());
        assert!(!lobby.is_running());
        assert!(!idle.is_running());
        assert_eq!(directory.surface(SessionId(2)), Some(Surface::Default));
    }
}
