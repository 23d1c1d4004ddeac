//! Frame timing.
//!
//! Every stage of the render loop owns a [`Timer`]. Once per second, the [`FpsCounter`] of the
//! loop logs the frame rate along with the timers, which resets them.

use std::{
    fmt, mem,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use itertools::Itertools;

/// Statistics collected by a [`Timer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub count: u32,
    pub total: Duration,
    /// The slowest recorded run.
    pub max: Duration,
}

impl TimerStats {
    /// Returns the average time per run, or `None` if nothing was recorded.
    pub fn average(&self) -> Option<Duration> {
        self.total.checked_div(self.count)
    }
}

/// Measures how long a stage takes.
///
/// Formatting a timer with `{}` shows its statistics and resets them.
pub struct Timer {
    name: &'static str,
    stats: Mutex<TimerStats>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stats: Mutex::default(),
        }
    }

    /// Runs `stage`, recording the time it takes.
    pub fn time<T>(&self, stage: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        stage()
    }

    /// Starts timing. The time is recorded when the returned guard is dropped.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the statistics recorded since the last reset, and resets them.
    pub fn take(&self) -> TimerStats {
        mem::take(&mut *self.lock())
    }

    fn record(&self, elapsed: Duration) {
        let mut stats = self.lock();
        stats.count += 1;
        stats.total += elapsed;
        stats.max = stats.max.max(elapsed);
    }

    fn lock(&self) -> MutexGuard<'_, TimerStats> {
        // The stats stay consistent even if a holder panicked.
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.take();
        let ms = |d: Duration| d.as_secs_f32() * 1000.0;
        let avg = stats.average().map_or(0.0, ms);
        write!(
            f,
            "{}: {}x{:.1}ms (max {:.1}ms)",
            self.name,
            stats.count,
            avg,
            ms(stats.max)
        )
    }
}

/// Guard returned by [`Timer::start`].
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Counts frames and logs the frame rate once per second.
pub struct FpsCounter {
    name: String,
    window_start: Instant,
    frames: u32,
    fps: Option<u32>,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            window_start: Instant::now(),
            frames: 0,
            fps: None,
        }
    }

    /// Counts a frame.
    pub fn tick(&mut self) {
        self.tick_with(std::iter::empty::<&Timer>());
    }

    /// Counts a frame. When a second has passed, logs the frame rate followed by `stages`.
    ///
    /// `stages` is only formatted when a message is logged, so timers are reset once per second.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, stages: I) {
        self.frames += 1;
        if self.window_start.elapsed() < Duration::from_secs(1) {
            return;
        }

        let mut stages = stages.into_iter().peekable();
        match stages.peek() {
            Some(_) => log::debug!("{}: {} FPS ({})", self.name, self.frames, stages.format(", ")),
            None => log::debug!("{}: {} FPS", self.name, self.frames),
        }

        self.fps = Some(self.frames);
        self.frames = 0;
        self.window_start = Instant::now();
    }

    /// Returns the frame count of the last completed one-second window.
    pub fn fps(&self) -> Option<u32> {
        self.fps
    }
}
