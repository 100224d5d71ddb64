// SPDX-License-Identifier: GPL-3.0-only
//! Frame scheduling
//!
//! Two kinds of loops live here:
//!
//! - [`FrameLoop`]: a single-threaded cooperative scheduler keyed to the
//!   display clock. Render loops (preview thumbnails, recording composite)
//!   are [`FrameTask`]s that decide on every tick whether they run again.
//! - [`CaptureThread`]: a device worker thread with a stop signal, used by
//!   capture devices to pull frames off the hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Returned by loop bodies to decide whether they run again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Schedule another iteration
    Continue,
    /// Do not reschedule
    Stop,
}

/// One display-clock tick
#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    /// Monotonic frame counter, starting at 0
    pub index: u64,
    /// Time the tick was issued
    pub now: Instant,
}

/// A self-rescheduling render task
///
/// `on_frame` runs once per tick for as long as it keeps returning
/// [`LoopAction::Continue`]. A task checks its own liveness predicate each
/// tick; nothing cancels it from outside.
pub trait FrameTask: Send {
    /// Name used in logs and for [`FrameLoop::is_scheduled`]
    fn name(&self) -> &str;

    fn on_frame(&mut self, tick: &FrameTick) -> LoopAction;
}

/// Cooperative scheduler for [`FrameTask`]s
///
/// Every task scheduled before a call to [`FrameLoop::run_frame`] runs
/// exactly once during that call, in scheduling order. Tasks never block
/// each other; they share the frame budget.
#[derive(Default)]
pub struct FrameLoop {
    tasks: Vec<Box<dyn FrameTask>>,
    frame_index: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task for the next frame
    pub fn schedule(&mut self, task: Box<dyn FrameTask>) {
        debug!(task = task.name(), "Scheduling frame task");
        self.tasks.push(task);
    }

    /// Whether a task with this name is waiting for the next frame
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name() == name)
    }

    /// Number of scheduled tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Frames issued so far
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// Run one frame: every scheduled task once, keeping those that continue
    ///
    /// Returns the number of tasks that ran.
    pub fn run_frame(&mut self, now: Instant) -> usize {
        let tick = FrameTick {
            index: self.frame_index,
            now,
        };
        self.frame_index += 1;

        let tasks = std::mem::take(&mut self.tasks);
        let ran = tasks.len();

        for mut task in tasks {
            match task.on_frame(&tick) {
                LoopAction::Continue => self.tasks.push(task),
                LoopAction::Stop => {
                    debug!(task = task.name(), frame = tick.index, "Frame task finished");
                }
            }
        }

        ran
    }
}

/// Worker thread for a capture device
///
/// The stop signal is shared with the owning track so that stopping the
/// track ends the worker.
pub struct CaptureThread {
    handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureThread {
    /// Run `loop_fn` repeatedly until it returns [`LoopAction::Stop`] or the
    /// stop signal is raised
    pub fn start<F>(name: &str, stop_signal: Arc<AtomicBool>, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::spawn(name, stop_signal, move |stop| {
            while !stop.load(Ordering::SeqCst) {
                if loop_fn() == LoopAction::Stop {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Run `body` once on a worker thread
    ///
    /// The body owns its own loop and must watch the stop signal it is given.
    /// An `Err` is logged; the thread then exits.
    pub fn spawn<F>(name: &str, stop_signal: Arc<AtomicBool>, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<(), String> + Send + 'static,
    {
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture thread");

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = body(thread_stop) {
                    warn!(name = %thread_name, error = %e, "Capture thread failed");
                }
                debug!(name = %thread_name, "Capture thread exiting");
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to spawn capture thread");
                None
            }
        };

        Self {
            handle,
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Raise the stop signal without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Raise the stop signal and wait for the thread to exit
    pub fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(name = %self.name, "Capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct CountDown {
        remaining: u32,
        runs: Arc<AtomicU32>,
    }

    impl FrameTask for CountDown {
        fn name(&self) -> &str {
            "countdown"
        }

        fn on_frame(&mut self, _tick: &FrameTick) -> LoopAction {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.remaining -= 1;
            if self.remaining == 0 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        }
    }

    #[test]
    fn test_task_reschedules_until_stop() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut frame_loop = FrameLoop::new();
        frame_loop.schedule(Box::new(CountDown {
            remaining: 3,
            runs: Arc::clone(&runs),
        }));

        let now = Instant::now();
        assert_eq!(frame_loop.run_frame(now), 1);
        assert_eq!(frame_loop.run_frame(now), 1);
        assert!(frame_loop.is_scheduled("countdown"));
        assert_eq!(frame_loop.run_frame(now), 1);
        assert!(frame_loop.is_empty());
        assert_eq!(frame_loop.run_frame(now), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(frame_loop.frame_count(), 4);
    }

    #[test]
    fn test_capture_thread_stops_on_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let stop = Arc::new(AtomicBool::new(false));

        let mut worker = CaptureThread::start("test-worker", Arc::clone(&stop), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(30));
        worker.stop();
        assert!(stop.load(Ordering::SeqCst));
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_spawn_body_error_is_contained() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut worker = CaptureThread::spawn("failing", stop, |_| Err("no device".into()));
        worker.stop();
        assert!(!worker.is_running());
    }
}
