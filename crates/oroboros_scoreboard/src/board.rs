//! # Scoreboard Instance
//!
//! One sidebar: its rows, theme, viewers and render task.
//!
//! ## State Machine
//!
//! ```text
//!            show (first viewer)
//!  Stopped ─────────────────────> Running ──┐ tick: render frame
//!     ▲                              │ ◄────┘
//!     └──────────────────────────────┘
//!       hide (last viewer) | stop() | render failure
//! ```
//!
//! "Running", "has a task handle" and "has at least one viewer" always
//! change together. Every operation holds the board lock for its whole
//! duration, so a tick never observes a half-applied change.
//!
//! Each start bumps a generation number captured by the scheduled task.
//! A tick whose generation is no longer current ends itself, which covers
//! ticks that raced with `hide` on another thread.
//!
//! A hook or resolver that panics is treated like one that returns an
//! error: the panic is caught at the tick and only this board stops.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::color::{colorize, strip_codes, ChatColor};
use crate::dedup::CapabilityTier;
use crate::error::{RenderError, ScoreboardError, ScoreboardResult};
use crate::registry::BoardRegistry;
use crate::render::{render_frame, FrameContext};
use crate::rows::RowStore;
use crate::scheduler::{BoardTask, TaskHandle, TickScheduler};
use crate::session::{SessionDirectory, SessionId};
use crate::settings::BoardConfig;
use crate::sink::RenderSink;
use crate::theme::Theme;
use crate::variables::{IdentityResolver, NoopHook, UpdateHook, VariableResolver};
use crate::DEFAULT_UPDATE_INTERVAL_TICKS;

/// Unique identifier for a scoreboard within its registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardId(pub u64);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board-{}", self.0)
    }
}

/// Render timing statistics for one board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames rendered successfully.
    pub frames_rendered: u64,
    /// Lines emitted by the last frame.
    pub last_frame_lines: usize,
    /// Average frame duration (rolling).
    pub avg_render_us: u64,
    /// Maximum frame duration observed.
    pub max_render_us: u64,
    /// Frames that failed and stopped the board.
    pub failures: u64,
}

impl RenderStats {
    fn record(&mut self, lines: usize, duration: Duration) {
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.avg_render_us = if self.frames_rendered == 0 {
            duration_us
        } else {
            (self.avg_render_us * 15 + duration_us) / 16
        };
        self.max_render_us = self.max_render_us.max(duration_us);
        self.frames_rendered += 1;
        self.last_frame_lines = lines;
    }
}

/// Whether a render task is scheduled.
enum RunState {
    Stopped,
    Running {
        handle: TaskHandle,
        generation: u64,
    },
}

/// Mutable state of one board, guarded by the board lock.
struct BoardState {
    title: String,
    update_interval_ticks: u32,
    tier: CapabilityTier,
    rows: RowStore,
    theme: Option<Theme>,
    viewers: BTreeSet<SessionId>,
    run: RunState,
    generation: u64,
    objective_registered: bool,
    hook: Box<dyn UpdateHook>,
    resolver: Box<dyn VariableResolver>,
    sink: Box<dyn RenderSink>,
    rng: StdRng,
    stats: RenderStats,
}

impl BoardState {
    fn is_running(&self) -> bool {
        matches!(self.run, RunState::Running { .. })
    }

    fn running_generation(&self) -> Option<u64> {
        match self.run {
            RunState::Running { generation, .. } => Some(generation),
            RunState::Stopped => None,
        }
    }

    fn describe(&self) -> String {
        describe(&self.title)
    }

    /// Hook, objective reset, then rows. Returns the emitted line count.
    fn render(&mut self) -> Result<usize, RenderError> {
        let Self {
            title,
            tier,
            rows,
            theme,
            objective_registered,
            hook,
            resolver,
            sink,
            rng,
            ..
        } = self;

        hook.on_update(rows)?;

        if *objective_registered {
            sink.unregister_objective();
        }
        sink.reset_objective(&colorize(title));
        *objective_registered = true;

        let ctx = FrameContext {
            resolver: &**resolver,
            theme: theme.as_ref(),
            tier: *tier,
        };
        let frame = render_frame(rows, &ctx, rng, &mut **sink)?;

        Ok(frame.len())
    }
}

fn describe(title: &str) -> String {
    format!("Scoreboard{{title={title}}}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Shared part of a board. The registry and scheduled tasks hold it weakly.
pub(crate) struct BoardInner {
    id: BoardId,
    /// Operator log prefix, color codes stripped.
    prefix: String,
    state: Mutex<BoardState>,
    directory: Arc<dyn SessionDirectory>,
    scheduler: Arc<dyn TickScheduler>,
}

impl BoardInner {
    /// Schedules the render task. Caller holds the lock.
    fn start(self: &Arc<Self>, state: &mut BoardState) -> ScoreboardResult<()> {
        if state.is_running() {
            return Err(ScoreboardError::AlreadyRunning(state.describe()));
        }

        state.generation += 1;
        let generation = state.generation;
        let board = Arc::downgrade(self);
        let task: BoardTask = Box::new(move || Self::tick(&board, generation));

        let handle = self.scheduler.schedule(state.update_interval_ticks, task)?;
        state.run = RunState::Running { handle, generation };

        tracing::info!(
            prefix = %self.prefix,
            board = %self.id,
            title = %state.title,
            interval_ticks = state.update_interval_ticks,
            "scoreboard started"
        );
        Ok(())
    }

    /// Cancels the render task. Returns false if none was scheduled.
    fn cancel_task(state: &mut BoardState) -> bool {
        match std::mem::replace(&mut state.run, RunState::Stopped) {
            RunState::Running { mut handle, .. } => {
                handle.cancel();
                true
            }
            RunState::Stopped => false,
        }
    }

    /// Removes every viewer, optionally putting them back on the default surface.
    fn release_viewers(&self, state: &mut BoardState, restore: bool) {
        for session in std::mem::take(&mut state.viewers) {
            if !restore {
                continue;
            }
            match self.directory.resolve_session(session) {
                Some(resolved) => self.directory.restore_default_surface(&resolved),
                None => tracing::warn!(
                    prefix = %self.prefix,
                    board = %self.id,
                    session = %session,
                    "viewer vanished before its surface could be restored"
                ),
            }
        }
    }

    /// One scheduled tick.
    fn tick(board: &Weak<Self>, generation: u64) -> ControlFlow<()> {
        let Some(inner) = board.upgrade() else {
            return ControlFlow::Break(());
        };
        let mut state = inner.state.lock();

        if state.running_generation() != Some(generation) {
            return ControlFlow::Break(());
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| state.render()))
            .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))));

        match outcome {
            Ok(lines) => {
                state.stats.record(lines, started.elapsed());
                tracing::trace!(board = %inner.id, lines, "frame rendered");
                ControlFlow::Continue(())
            }
            Err(error) => {
                tracing::error!(
                    prefix = %inner.prefix,
                    board = %inner.id,
                    title = %state.title,
                    rows = %state.rows.as_slice().join(" "),
                    error = %error,
                    "error displaying scoreboard, stopping rendering for safety"
                );
                state.stats.failures += 1;
                // Viewers stay on whatever surface they last had.
                inner.release_viewers(&mut state, false);
                Self::cancel_task(&mut state);
                ControlFlow::Break(())
            }
        }
    }
}

/// A sidebar scoreboard.
///
/// Cheap to clone: clones are handles to the same board.
#[derive(Clone)]
pub struct Scoreboard {
    inner: Arc<BoardInner>,
}

impl Scoreboard {
    /// Starts building a board with the given title (`&` color codes allowed).
    #[must_use]
    pub fn builder(title: impl Into<String>) -> ScoreboardBuilder {
        ScoreboardBuilder::new(title)
    }

    pub(crate) fn from_inner(inner: Arc<BoardInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<BoardInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn is_same(&self, other: &Weak<BoardInner>) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner), other.as_ptr())
    }

    /// Board identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BoardId {
        self.inner.id
    }

    /// Prefix attached to this board's operator log events, uncolored.
    #[must_use]
    pub fn log_prefix(&self) -> &str {
        &self.inner.prefix
    }

    // =========================================================================
    // TITLE, INTERVAL, THEME
    // =========================================================================

    /// Current title, uncolorized.
    #[must_use]
    pub fn title(&self) -> String {
        self.inner.state.lock().title.clone()
    }

    /// Replaces the title. Visible from the next frame.
    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.state.lock().title = title.into();
    }

    /// Refresh interval in host ticks.
    #[must_use]
    pub fn update_interval_ticks(&self) -> u32 {
        self.inner.state.lock().update_interval_ticks
    }

    /// Changes the refresh interval, rescheduling a running board.
    ///
    /// # Errors
    ///
    /// Returns error if `ticks` is 0, or if a running board cannot be
    /// rescheduled. In the second case the board is stopped and its viewers
    /// are put back on the default surface.
    pub fn set_update_interval(&self, ticks: u32) -> ScoreboardResult<()> {
        if ticks == 0 {
            return Err(ScoreboardError::InvalidUpdateInterval(ticks));
        }

        let mut state = self.inner.state.lock();
        state.update_interval_ticks = ticks;

        if state.is_running() {
            BoardInner::cancel_task(&mut state);
            if let Err(error) = self.inner.start(&mut state) {
                tracing::warn!(
                    prefix = %self.inner.prefix,
                    board = %self.inner.id,
                    error = %error,
                    "scoreboard could not be rescheduled, releasing viewers"
                );
                self.inner.release_viewers(&mut state, true);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Display tier the board renders for.
    #[must_use]
    pub fn tier(&self) -> CapabilityTier {
        self.inner.state.lock().tier
    }

    /// Sets the `key: value` theme.
    pub fn set_theme(&self, primary: ChatColor, secondary: Option<ChatColor>) {
        self.inner.state.lock().theme = Some(Theme::new(primary, secondary));
    }

    /// Removes the theme.
    pub fn clear_theme(&self) {
        self.inner.state.lock().theme = None;
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.inner.state.lock().theme
    }

    // =========================================================================
    // ROWS
    // =========================================================================

    /// Appends one row.
    pub fn add_row(&self, row: impl Into<String>) {
        self.inner.state.lock().rows.add_row(row);
    }

    /// Appends rows in order.
    pub fn add_rows<I, S>(&self, rows: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.state.lock().rows.add_rows(rows);
    }

    /// Removes every row.
    pub fn clear_rows(&self) {
        self.inner.state.lock().rows.clear();
    }

    /// Removes the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is past the end.
    pub fn remove_row(&self, index: usize) -> ScoreboardResult<String> {
        self.inner.state.lock().rows.remove_at(index)
    }

    /// Removes every row containing `needle`. Returns how many were removed.
    pub fn remove_rows_containing(&self, needle: &str) -> usize {
        self.inner.state.lock().rows.remove_containing(needle)
    }

    /// Snapshot of the template rows.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.inner.state.lock().rows.as_slice().to_vec()
    }

    /// Number of template rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inner.state.lock().rows.len()
    }

    // =========================================================================
    // VIEWERS
    // =========================================================================

    /// Shows this board to a session, starting the render task if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the session already views this board, the
    /// directory cannot resolve it, or the render task cannot be scheduled.
    /// On error the session is not added.
    pub fn show(&self, session: SessionId) -> ScoreboardResult<()> {
        let mut state = self.inner.state.lock();
        self.show_locked(&mut state, session)
    }

    /// Shows this board to every active session not already viewing it.
    /// Returns how many sessions were added.
    ///
    /// Sessions that leave while this runs are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the render task cannot be scheduled.
    pub fn show_to_all(&self) -> ScoreboardResult<usize> {
        let sessions = self.inner.directory.active_sessions();
        let mut state = self.inner.state.lock();
        let mut shown = 0;

        for session in sessions {
            if state.viewers.contains(&session) {
                continue;
            }
            match self.show_locked(&mut state, session) {
                Ok(()) => shown += 1,
                Err(ScoreboardError::SessionNotFound(_)) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(shown)
    }

    fn show_locked(&self, state: &mut BoardState, session: SessionId) -> ScoreboardResult<()> {
        if state.viewers.contains(&session) {
            return Err(ScoreboardError::AlreadyViewing {
                board: state.describe(),
                session,
            });
        }

        let resolved = self
            .inner
            .directory
            .resolve_session(session)
            .ok_or(ScoreboardError::SessionNotFound(session))?;

        if !state.is_running() {
            self.inner.start(state)?;
        }

        self.inner.directory.apply_surface(&resolved, self.inner.id);
        state.viewers.insert(session);

        tracing::debug!(board = %self.inner.id, session = %session, name = %resolved.name, "showing scoreboard");
        Ok(())
    }

    /// Hides this board from a session, stopping after the last viewer.
    ///
    /// # Errors
    ///
    /// Returns error if the session does not view this board.
    pub fn hide(&self, session: SessionId) -> ScoreboardResult<()> {
        let mut state = self.inner.state.lock();

        if !state.viewers.contains(&session) {
            return Err(ScoreboardError::NotViewing {
                board: state.describe(),
                session,
            });
        }

        self.hide_locked(&mut state, session);
        Ok(())
    }

    /// Hides from `session` if it is viewing. Returns true if it was.
    pub(crate) fn hide_if_viewing(&self, session: SessionId) -> bool {
        let mut state = self.inner.state.lock();
        if !state.viewers.contains(&session) {
            return false;
        }
        self.hide_locked(&mut state, session);
        true
    }

    fn hide_locked(&self, state: &mut BoardState, session: SessionId) {
        match self.inner.directory.resolve_session(session) {
            Some(resolved) => self.inner.directory.restore_default_surface(&resolved),
            None => tracing::warn!(
                prefix = %self.inner.prefix,
                board = %self.inner.id,
                session = %session,
                "hiding from a session that already left"
            ),
        }
        state.viewers.remove(&session);
        tracing::debug!(board = %self.inner.id, session = %session, "hiding scoreboard");

        if state.viewers.is_empty() && BoardInner::cancel_task(state) {
            tracing::info!(
                prefix = %self.inner.prefix,
                board = %self.inner.id,
                "scoreboard stopped, no viewers left"
            );
        }
    }

    /// Returns true if `session` currently views this board.
    #[must_use]
    pub fn is_viewing(&self, session: SessionId) -> bool {
        self.inner.state.lock().viewers.contains(&session)
    }

    /// Current viewers in id order.
    #[must_use]
    pub fn viewers(&self) -> Vec<SessionId> {
        self.inner.state.lock().viewers.iter().copied().collect()
    }

    /// Returns true while the render task is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().is_running()
    }

    /// Puts every viewer back on the default surface and stops rendering.
    ///
    /// Viewers are cleared even when the board was not running.
    ///
    /// # Errors
    ///
    /// Returns error if no render task was scheduled.
    pub fn stop(&self) -> ScoreboardResult<()> {
        let mut state = self.inner.state.lock();
        self.inner.release_viewers(&mut state, true);

        if !BoardInner::cancel_task(&mut state) {
            return Err(ScoreboardError::NotRunning(state.describe()));
        }

        tracing::info!(prefix = %self.inner.prefix, board = %self.inner.id, "scoreboard stopped");
        Ok(())
    }

    /// Render statistics.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.inner.state.lock().stats
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.title()))
    }
}

impl fmt::Debug for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoreboard")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for [`Scoreboard`].
pub struct ScoreboardBuilder {
    title: String,
    update_interval_ticks: u32,
    tier: CapabilityTier,
    log_prefix: String,
    rows: RowStore,
    theme: Option<Theme>,
    hook: Box<dyn UpdateHook>,
    resolver: Box<dyn VariableResolver>,
    seed: Option<u64>,
}

impl ScoreboardBuilder {
    /// Creates a builder with default interval, full tier, no log prefix
    /// and no rows.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            update_interval_ticks: DEFAULT_UPDATE_INTERVAL_TICKS,
            tier: CapabilityTier::Full,
            log_prefix: String::new(),
            rows: RowStore::new(),
            theme: None,
            hook: Box::new(NoopHook),
            resolver: Box::new(IdentityResolver),
            seed: None,
        }
    }

    /// Sets the refresh interval in host ticks.
    #[must_use]
    pub const fn update_interval_ticks(mut self, ticks: u32) -> Self {
        self.update_interval_ticks = ticks;
        self
    }

    /// Sets the display tier.
    #[must_use]
    pub const fn tier(mut self, tier: CapabilityTier) -> Self {
        self.tier = tier;
        self
    }

    /// Sets the prefix of operator log events. `&` codes are stripped.
    #[must_use]
    pub fn log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    /// Creates a builder from loaded settings.
    #[must_use]
    pub fn from_config(config: BoardConfig) -> Self {
        Self::new(config.title)
            .update_interval_ticks(config.update_interval_ticks)
            .tier(config.tier)
            .log_prefix(config.log_prefix)
    }

    /// Sets the initial rows.
    #[must_use]
    pub fn rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.add_rows(rows);
        self
    }

    /// Sets the initial theme.
    #[must_use]
    pub const fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Sets the per-tick hook.
    #[must_use]
    pub fn hook(mut self, hook: impl UpdateHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    /// Sets the variable resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: impl VariableResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Seeds the marker RNG, making disambiguation reproducible.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Creates the board and registers it.
    ///
    /// The board stays stopped until its first viewer is shown.
    ///
    /// # Errors
    ///
    /// Returns error if the update interval is 0.
    pub fn build(
        self,
        registry: &BoardRegistry,
        sink: impl RenderSink + 'static,
    ) -> ScoreboardResult<Scoreboard> {
        if self.update_interval_ticks == 0 {
            return Err(ScoreboardError::InvalidUpdateInterval(0));
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let state = BoardState {
            title: self.title,
            update_interval_ticks: self.update_interval_ticks,
            tier: self.tier,
            rows: self.rows,
            theme: self.theme,
            viewers: BTreeSet::new(),
            run: RunState::Stopped,
            generation: 0,
            objective_registered: false,
            hook: self.hook,
            resolver: self.resolver,
            sink: Box::new(sink),
            rng,
            stats: RenderStats::default(),
        };

        let board = Scoreboard::from_inner(Arc::new(BoardInner {
            id: registry.allocate_id(),
            prefix: strip_codes(&self.log_prefix),
            state: Mutex::new(state),
            directory: registry.directory(),
            scheduler: registry.scheduler(),
        }));
        registry.register(&board);

        tracing::debug!(board = %board.id(), "scoreboard created");
        Ok(board)
    }
}
