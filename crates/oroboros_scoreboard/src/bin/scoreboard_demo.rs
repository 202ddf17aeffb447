//! # Scoreboard Demo
//!
//! Runs one lobby scoreboard on the threaded scheduler and prints every
//! frame to the console.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=oroboros_scoreboard=debug scoreboard_demo --viewers 3 --duration 5
//! scoreboard_demo --config scoreboard.toml
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use oroboros_scoreboard::{
    strip_codes, BoardRegistry, ChatColor, MemorySessionDirectory, PlaceholderResolver,
    RenderError, RenderSink, RowStore, Scoreboard, ScoreboardBuilder, ScoreboardSettings,
    SessionId, ThreadedScheduler,
};
use tracing_subscriber::EnvFilter;

/// Prints each frame once it is complete.
struct ConsoleSink {
    title: String,
    lines: Vec<(u32, String)>,
}

impl ConsoleSink {
    fn flush(&mut self) {
        if self.title.is_empty() {
            return;
        }
        println!("┌─ {} ", self.title);
        for (rank, line) in &self.lines {
            println!("│ {rank:>2} {line}");
        }
        println!("└──────────────────────────────");
        self.lines.clear();
    }
}

impl RenderSink for ConsoleSink {
    fn reset_objective(&mut self, title: &str) {
        title.clone_into(&mut self.title);
    }

    fn set_line(&mut self, rank: u32, text: &str) {
        self.lines.push((rank, text.to_owned()));
        if rank == 1 {
            self.flush();
        }
    }

    fn unregister_objective(&mut self) {
        self.lines.clear();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         OROBOROS SCOREBOARD DEMO                                 ║");
    println!("║         SIDEBAR RENDER ENGINE                                    ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let mut viewers = 2u64;
    let mut duration_secs = 3u64;
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--viewers" | "-v" => {
                if i + 1 < args.len() {
                    viewers = args[i + 1].parse().unwrap_or(2);
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if i + 1 < args.len() {
                    duration_secs = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: scoreboard_demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -v, --viewers <NUM>        Connected sessions (default: 2)");
                println!("  -d, --duration <SECS>      Run for N seconds (default: 3)");
                println!("  -c, --config <PATH>        Settings file (TOML)");
                println!("  -h, --help                 Show this help");
                return;
            }
            _ => {}
        }
        i += 1;
    }

    let settings = match config_path {
        Some(path) => match ScoreboardSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "cannot load settings");
                std::process::exit(1);
            }
        },
        None => ScoreboardSettings::default(),
    };

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Viewers:            {viewers}");
    println!("│ Duration:           {duration_secs} seconds");
    println!("│ Update Interval:    {} ticks", settings.update_interval_ticks);
    println!("│ Tick Length:        {} ms", settings.tick_millis);
    println!("│ Tier:               {:?}", settings.capability_tier);
    println!("│ Log Prefix:         {}", strip_codes(&settings.prefix));
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let directory = Arc::new(MemorySessionDirectory::new());
    let scheduler = Arc::new(ThreadedScheduler::from_tick_millis(settings.tick_millis));
    let registry = BoardRegistry::new(directory.clone(), scheduler);

    let vars = PlaceholderResolver::new();
    vars.set("online", viewers.to_string());
    vars.set("map", "Verdant Hollow");

    let started = Instant::now();
    let hook = move |rows: &mut RowStore| -> Result<(), RenderError> {
        rows.set_row(2, format!("Uptime: {}s", started.elapsed().as_secs()))
            .map_err(|e| RenderError::Hook(e.to_string()))
    };

    let board = ScoreboardBuilder::from_config(settings.board_config("&6&lLOBBY"))
        .rows([
            "Players: {online}",
            "Map: {map}",
            "Uptime: 0s",
            "",
            "",
            "&7oroboros.example",
        ])
        .resolver(vars)
        .hook(hook)
        .build(&registry, ConsoleSink { title: String::new(), lines: Vec::new() });

    let board: Scoreboard = match board {
        Ok(board) => board,
        Err(e) => {
            tracing::error!(error = %e, "cannot create scoreboard");
            std::process::exit(1);
        }
    };
    board.set_theme(ChatColor::Gold, Some(ChatColor::White));

    for id in 1..=viewers {
        directory.connect(SessionId(id), format!("player{id}"));
    }
    match board.show_to_all() {
        Ok(shown) => tracing::info!(prefix = %board.log_prefix(), shown, "scoreboard shown"),
        Err(e) => {
            tracing::error!(prefix = %board.log_prefix(), error = %e, "cannot show scoreboard");
            std::process::exit(1);
        }
    }

    std::thread::sleep(Duration::from_secs(duration_secs));

    // Disconnect one viewer the way a host would
    registry.hide_from_all_instances(SessionId(1));
    directory.disconnect(SessionId(1));

    let stats = board.stats();
    let stopped = registry.clear_all_instances();

    println!();
    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Frames Rendered:    {}", stats.frames_rendered);
    println!("│ Last Frame Lines:   {}", stats.last_frame_lines);
    println!("│ Avg Render:         {} µs", stats.avg_render_us);
    println!("│ Max Render:         {} µs", stats.max_render_us);
    println!("│ Boards Stopped:     {stopped}");
    println!("└──────────────────────────────────────────────────────────────────┘");
}
