//! # Render Sink
//!
//! The boundary to the display surface. A board owns exactly one sink and
//! drives it once per frame:
//!
//! ```text
//! unregister_objective()        (only if a prior objective exists)
//! reset_objective(title)
//! set_line(n, first row)
//! set_line(n - 1, second row)
//! ...
//! set_line(1, last row)
//! ```
//!
//! Sink calls are fire-and-forget writes and must not block.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Display surface for one board.
///
/// Called with the board lock held: implementations must not call back
/// into the board that owns them.
pub trait RenderSink: Send {
    /// Registers a fresh sidebar objective with the given header.
    fn reset_objective(&mut self, title: &str);

    /// Sets the text of the line at `rank`. Higher ranks render higher.
    fn set_line(&mut self, rank: u32, text: &str);

    /// Removes the objective registered by the previous frame.
    fn unregister_objective(&mut self);
}

/// One call recorded by [`MemorySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// `unregister_objective` was called.
    Unregister,
    /// `reset_objective` was called.
    Reset {
        /// Header text.
        title: String,
    },
    /// `set_line` was called.
    Line {
        /// Rank of the line.
        rank: u32,
        /// Rendered text.
        text: String,
    },
}

#[derive(Debug, Default)]
struct SinkLog {
    events: Vec<SinkEvent>,
    title: Option<String>,
    lines: BTreeMap<u32, String>,
    frames: usize,
}

/// In-memory sink that records every call.
///
/// Clones share the same log, so a host (or test) can keep one clone for
/// inspection after handing another to a board.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.log.lock().events.clone()
    }

    /// Number of `reset_objective` calls (one per rendered frame).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.log.lock().frames
    }

    /// Header of the current objective, if one is registered.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.log.lock().title.clone()
    }

    /// Lines of the current objective, top to bottom.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.log.lock().lines.values().rev().cloned().collect()
    }

    /// `(rank, line)` pairs of the current objective, top to bottom.
    #[must_use]
    pub fn ranked_lines(&self) -> Vec<(u32, String)> {
        self.log
            .lock()
            .lines
            .iter()
            .rev()
            .map(|(rank, text)| (*rank, text.clone()))
            .collect()
    }

    /// Forgets recorded events, keeping the current objective.
    pub fn clear_events(&self) {
        self.log.lock().events.clear();
    }
}

impl RenderSink for MemorySink {
    fn reset_objective(&mut self, title: &str) {
        let mut log = self.log.lock();
        log.events.push(SinkEvent::Reset {
            title: title.to_owned(),
        });
        log.title = Some(title.to_owned());
        log.lines.clear();
        log.frames += 1;
    }

    fn set_line(&mut self, rank: u32, text: &str) {
        let mut log = self.log.lock();
        log.events.push(SinkEvent::Line {
            rank,
            text: text.to_owned(),
        });
        log.lines.insert(rank, text.to_owned());
    }

    fn unregister_objective(&mut self) {
        let mut log = self.log.lock();
        log.events.push(SinkEvent::Unregister);
        log.title = None;
        log.lines.clear();
    }
}
