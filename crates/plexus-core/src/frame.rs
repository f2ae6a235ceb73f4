use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::event::Event;

/// Anything the frame loop can drive: an update pass followed by an event
/// dispatch pass.
pub trait FrameTarget {
    /// Call `update(dt)` on every member, first to last.
    fn update_all(&mut self, dt: f32);

    /// Walk `event` from last member to first, stopping once it is handled.
    /// Returns the name of the member that consumed it.
    fn dispatch(&mut self, event: &mut Event) -> Option<String>;
}

/// Totals for one bounded run of the frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub frames: u64,
    pub events_dispatched: u64,
    pub events_handled: u64,
}

/// Measures frame deltas and paces frames to a fixed interval.
pub struct FrameClock {
    interval: Duration,
    last_start: Option<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    /// Mark the start of a frame and return seconds since the previous
    /// frame start. The first frame reports `0.0`.
    pub fn begin_frame(&mut self, now: Instant) -> f32 {
        let dt = match self.last_start {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last_start = Some(now);
        dt
    }

    /// Time left in the current frame's interval at `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_start {
            Some(start) => self
                .interval
                .saturating_sub(now.saturating_duration_since(start)),
            None => Duration::ZERO,
        }
    }

    /// Sleep away whatever is left of the current interval.
    pub fn pace(&self, now: Instant) {
        let left = self.remaining(now);
        if !left.is_zero() {
            std::thread::sleep(left);
        }
    }
}

/// Frames-per-second over a sliding time window.
pub struct RateMeter {
    stamps: VecDeque<Instant>,
    window: Duration,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RateMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            stamps: VecDeque::new(),
            window,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
        let cutoff = now.checked_sub(self.window);
        while let (Some(&front), Some(cutoff)) = (self.stamps.front(), cutoff) {
            if front >= cutoff {
                break;
            }
            self.stamps.pop_front();
        }
    }

    /// `0.0` until at least two frames were recorded.
    pub fn rate(&self) -> f64 {
        if self.stamps.len() < 2 {
            return 0.0;
        }
        self.stamps.len() as f64 / self.window.as_secs_f64()
    }
}

/// Drive `target` for exactly `frame_count` frames.
///
/// Each frame measures `dt`, runs the update pass, asks `source` for one
/// event (given the zero-based frame index), dispatches it, then sleeps out
/// the rest of `frame_interval`.
pub fn run_frames<T, S>(
    target: &mut T,
    frame_count: u64,
    frame_interval: Duration,
    mut source: S,
) -> LoopReport
where
    T: FrameTarget + ?Sized,
    S: FnMut(u64) -> Event,
{
    let mut clock = FrameClock::new(frame_interval);
    let mut meter = RateMeter::default();
    let mut report = LoopReport::default();

    for frame in 0..frame_count {
        let started = Instant::now();
        let dt = clock.begin_frame(started);
        meter.record(started);

        target.update_all(dt);

        let mut event = source(frame);
        let consumer = target.dispatch(&mut event);
        report.events_dispatched += 1;
        if event.handled {
            report.events_handled += 1;
        }
        report.frames += 1;

        tracing::debug!(
            frame,
            dt,
            fps = meter.rate(),
            event = %event.name,
            consumer = consumer.as_deref().unwrap_or("-"),
            "frame complete"
        );

        clock.pace(Instant::now());
    }

    report
}
