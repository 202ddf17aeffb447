//! # OROBOROS Scoreboard - Sidebar Render Engine
//!
//! Tick-driven sidebar scoreboards rendered once per frame and shared by
//! every session viewing them.
//!
//! ## Architecture
//!
//! ```text
//! TickScheduler ──tick──> Scoreboard (Mutex<BoardState>)
//!                              │
//!                              ├─ UpdateHook::on_update(rows)
//!                              ├─ RenderSink::reset_objective(title)
//!                              └─ for each row, top to bottom:
//!                                   VariableResolver → Theme → FrameLines
//!                                        └─> RenderSink::set_line(rank, line)
//! ```
//!
//! ## Lifecycle
//!
//! A board starts ticking when its first viewer is added and stops when the
//! last one leaves. A render cycle that fails stops the board instead of
//! repeating the failure every interval.
//!
//! ## Collaborators
//!
//! The host supplies three capabilities:
//!
//! - [`RenderSink`]: receives `(rank, line)` pairs for one board
//! - [`SessionDirectory`]: resolves sessions and swaps their display surface
//! - [`TickScheduler`]: runs a periodic task on the host clock
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_scoreboard::{BoardRegistry, ManualScheduler, Scoreboard, ChatColor};
//!
//! let registry = BoardRegistry::new(directory, scheduler.clone());
//! let board = Scoreboard::builder("&6&lLOBBY")
//!     .update_interval_ticks(20)
//!     .build(&registry, sink)?;
//!
//! board.add_rows(["Players: 12", "Mode: waiting"]);
//! board.set_theme(ChatColor::Red, Some(ChatColor::White));
//! board.show(session_id)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
// Interior-mutating `&self` methods return counts that callers may ignore
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod board;
pub mod color;
pub mod dedup;
pub mod error;
pub mod registry;
pub mod render;
pub mod rows;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod sink;
pub mod theme;
pub mod variables;

pub use board::{BoardId, RenderStats, Scoreboard, ScoreboardBuilder};
pub use color::{colorize, strip_codes, ChatColor, COLOR_CHAR};
pub use dedup::{truncate_chars, CapabilityTier, FrameLines};
pub use error::{RenderError, ScoreboardError, ScoreboardResult};
pub use registry::BoardRegistry;
pub use render::{render_frame, FrameContext};
pub use rows::RowStore;
pub use scheduler::{BoardTask, ManualScheduler, TaskHandle, ThreadedScheduler, TickScheduler};
pub use session::{MemorySessionDirectory, Session, SessionDirectory, SessionId, Surface};
pub use settings::{BoardConfig, ScoreboardSettings};
pub use sink::{MemorySink, RenderSink, SinkEvent};
pub use theme::{apply_theme, Theme};
pub use variables::{IdentityResolver, NoopHook, PlaceholderResolver, UpdateHook, VariableResolver};

/// Maximum rendered line length on full-capability displays.
pub const MAX_LINE_LENGTH: usize = 40;

/// Maximum rendered line length on reduced-capability displays.
pub const REDUCED_LINE_LENGTH: usize = 16;

/// Default refresh interval in host ticks (1 second at 20 ticks/s).
pub const DEFAULT_UPDATE_INTERVAL_TICKS: u32 = 20;

/// Default length of one host tick in milliseconds (20Hz).
pub const HOST_TICK_MILLIS: u64 = 50;
