//! # Tick Scheduler
//!
//! Periodic render tasks on the host clock, one per running board.
//!
//! ## Design
//!
//! - Fixed-rate: deadlines advance by exactly one period, no drift correction
//! - First run on the next host tick (zero delay)
//! - Cancellation is the only way to stop a task from outside; a task stops
//!   itself by returning [`ControlFlow::Break`]
//! - [`TaskHandle`] owns the cancellation; dropping it cancels the task
//! - A driver that cannot take a task says so; no handle is returned
//!
//! Two drivers are provided:
//!
//! - [`ThreadedScheduler`]: one thread per task, sleeps on a stop channel
//! - [`ManualScheduler`]: the host advances the clock from its own tick loop

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{ScoreboardError, ScoreboardResult};
use crate::HOST_TICK_MILLIS;

/// A periodic task. Returning `Break` ends it.
pub type BoardTask = Box<dyn FnMut() -> ControlFlow<()> + Send + 'static>;

/// Host clock able to run periodic tasks.
pub trait TickScheduler: Send + Sync {
    /// Runs `task` every `period_ticks` host ticks until it breaks or the
    /// returned handle is cancelled. A period of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreboardError::SchedulerUnavailable`] if the task cannot
    /// be scheduled. The task is dropped without running.
    fn schedule(&self, period_ticks: u32, task: BoardTask) -> ScoreboardResult<TaskHandle>;
}

/// Owner side of a scheduled task.
///
/// Cancelling sets a shared flag and disconnects the stop channel so a
/// sleeping driver wakes immediately. Cancelling never waits for a tick
/// in progress.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
}

/// Driver side of a scheduled task.
#[derive(Debug, Clone)]
pub struct TaskSignal {
    cancelled: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
}

impl TaskHandle {
    /// Creates a connected handle and signal.
    #[must_use]
    pub fn pair() -> (Self, TaskSignal) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded(0);
        (
            Self {
                cancelled: Arc::clone(&cancelled),
                stop_tx: Some(stop_tx),
            },
            TaskSignal { cancelled, stop_rx },
        )
    }

    /// Cancels the task. Idempotent.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.stop_tx.take();
    }

    /// Returns true once cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl TaskSignal {
    /// Returns true once the owner cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleeps up to `timeout`. Returns false if cancelled meanwhile.
    #[must_use]
    pub fn sleep(&self, timeout: Duration) -> bool {
        match self.stop_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => !self.is_cancelled(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

// ============================================================================
// THREADED DRIVER
// ============================================================================

/// Runs each task on its own thread against the wall clock.
#[derive(Debug)]
pub struct ThreadedScheduler {
    /// Length of one host tick.
    tick_duration: Duration,
    /// Counter for thread names.
    next_task: AtomicU64,
}

impl ThreadedScheduler {
    /// Creates a scheduler with the given host tick length.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            next_task: AtomicU64::new(0),
        }
    }

    /// Creates a scheduler with a tick length in milliseconds.
    #[must_use]
    pub fn from_tick_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Length of one host tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

impl Default for ThreadedScheduler {
    fn default() -> Self {
        Self::from_tick_millis(HOST_TICK_MILLIS)
    }
}

impl TickScheduler for ThreadedScheduler {
    fn schedule(&self, period_ticks: u32, mut task: BoardTask) -> ScoreboardResult<TaskHandle> {
        let (handle, signal) = TaskHandle::pair();
        let period = self.tick_duration * period_ticks.max(1);
        let id = self.next_task.fetch_add(1, Ordering::Relaxed);

        thread::Builder::new()
            .name(format!("scoreboard-task-{id}"))
            .spawn(move || run_fixed_rate(period, &mut task, &signal))
            .map_err(|e| {
                tracing::error!(task = id, error = %e, "failed to spawn scoreboard task");
                ScoreboardError::SchedulerUnavailable(e.to_string())
            })?;

        Ok(handle)
    }
}

/// Fixed-rate loop: deadline += period, sleeping on the stop channel.
fn run_fixed_rate(period: Duration, task: &mut BoardTask, signal: &TaskSignal) {
    let mut next_tick = Instant::now();
    let mut late_ticks = 0u64;

    loop {
        let now = Instant::now();
        if now < next_tick {
            if !signal.sleep(next_tick - now) {
                break;
            }
        } else {
            if signal.is_cancelled() {
                break;
            }
            if now.duration_since(next_tick) > period {
                late_ticks += 1;
                tracing::debug!(late_ticks, "scoreboard task running behind");
            }
        }

        next_tick += period;

        if task().is_break() {
            break;
        }
    }
}

// ============================================================================
// MANUAL DRIVER
// ============================================================================

struct ManualTask {
    id: u64,
    period: u64,
    next_due: u64,
    task: BoardTask,
    signal: TaskSignal,
}

#[derive(Default)]
struct ManualClock {
    now: u64,
    next_id: u64,
    tasks: Vec<ManualTask>,
}

/// Host-driven clock: tasks run only when the host calls [`tick`](Self::tick)
/// or [`advance`](Self::advance).
///
/// Tasks run without the scheduler lock held, so they may schedule or
/// cancel other tasks.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

impl ManualScheduler {
    /// Creates a clock at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current host tick.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.lock().now
    }

    /// Number of scheduled, non-cancelled tasks.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.clock
            .lock()
            .tasks
            .iter()
            .filter(|t| !t.signal.is_cancelled())
            .count()
    }

    /// Runs one host tick.
    pub fn tick(&self) {
        let (now, due) = {
            let mut clock = self.clock.lock();
            clock.tasks.retain(|t| !t.signal.is_cancelled());
            let now = clock.now;
            let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut clock.tasks)
                .into_iter()
                .partition(|t| t.next_due <= now);
            clock.tasks = waiting;
            (now, due)
        };

        let mut survivors = Vec::with_capacity(due.len());
        for mut entry in due {
            if entry.signal.is_cancelled() {
                continue;
            }
            if (entry.task)().is_break() {
                continue;
            }
            entry.next_due = now + entry.period;
            survivors.push(entry);
        }

        let mut clock = self.clock.lock();
        clock.tasks.extend(survivors);
        clock.tasks.sort_by_key(|t| t.id);
        clock.now += 1;
    }

    /// Runs `ticks` host ticks.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&self, period_ticks: u32, task: BoardTask) -> ScoreboardResult<TaskHandle> {
        let (handle, signal) = TaskHandle::pair();
        let mut clock = self.clock.lock();
        let id = clock.next_id;
        clock.next_id += 1;
        let now = clock.now;
        clock.tasks.push(ManualTask {
            id,
            period: u64::from(period_ticks.max(1)),
            next_due: now,
            task,
            signal,
        });
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(counter: &Arc<AtomicUsize>) -> BoardTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
    }

    #[test]
    fn test_manual_fixed_rate() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule(5, counting_task(&runs)).unwrap();

        // Runs at ticks 0, 5, 10
        scheduler.advance(11);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.now(), 11);
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut handle = scheduler.schedule(1, counting_task(&runs)).unwrap();

        scheduler.advance(3);
        handle.cancel();
        assert!(handle.is_cancelled());
        scheduler.advance(3);

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[test]
    fn test_drop_cancels() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        drop(scheduler.schedule(1, counting_task(&runs)).unwrap());

        scheduler.advance(2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_task_breaks_itself() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let _handle = scheduler.schedule(
            1,
            Box::new(move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }),
        )
        .unwrap();

        scheduler.advance(5);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[test]
    fn test_zero_period_treated_as_one() {
        let scheduler = ManualScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule(0, counting_task(&runs)).unwrap();
        scheduler.advance(4);
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_signal_sleep_wakes_on_cancel() {
        let (mut handle, signal) = TaskHandle::pair();
        let sleeper = thread::spawn(move || {
            let start = Instant::now();
            let keep_going = signal.sleep(Duration::from_secs(10));
            (keep_going, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        let (keep_going, waited) = sleeper.join().unwrap();
        assert!(!keep_going);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_threaded_runs_and_stops() {
        let scheduler = ThreadedScheduler::from_tick_millis(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let mut handle = scheduler.schedule(2, counting_task(&runs)).unwrap();

        thread::sleep(Duration::from_millis(50));
        handle.cancel();
        thread::sleep(Duration::from_millis(20));

        let after_cancel = runs.load(Ordering::SeqCst);
        assert!(after_cancel >= 1);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(runs.load(Ordering::SeqCst), after_cancel);
    }
}
