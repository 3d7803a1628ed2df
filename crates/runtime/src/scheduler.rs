use std::cell::Cell;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use foundation::time::Time;

use crate::frame::{DrawStatus, Frame};

/// Why a redraw was requested.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RedrawTrigger {
    Resize,
    PanZoom,
    OptionToggled,
    TileLoaded,
    Poll,
    /// Catalog or constellation data became available.
    DataReady,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    #[default]
    Interactive,
    Static,
}

impl ChartMode {
    pub fn poll_interval(self) -> Duration {
        match self {
            ChartMode::Interactive => Duration::from_millis(200),
            ChartMode::Static => Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing owed.
    Idle,
    /// A redraw is owed but the chart data is not loaded yet.
    NotReady,
    /// A draw is already running; the redraw stays owed.
    Busy,
    Drew(Frame),
}

struct DrawLock<'a>(&'a Cell<bool>);

impl<'a> DrawLock<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        DrawLock(flag)
    }
}

impl Drop for DrawLock<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Dirty-flag redraw loop for one chart.
///
/// Three flags:
/// - `ready`: chart data is loaded
/// - `refresh`: a redraw is owed
/// - `lock`: a draw is in progress
///
/// Flags live in `Cell`s so a `tick` issued from inside a running draw (for
/// example by a callback the draw triggers) sees the lock through a shared
/// reference. Such a tick never queues a second draw: it re-asserts `refresh`
/// and returns [`TickOutcome::Busy`].
#[derive(Debug, Default)]
pub struct RenderScheduler {
    ready: Cell<bool>,
    refresh: Cell<bool>,
    lock: Cell<bool>,
    drawn: Cell<u64>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn needs_redraw(&self) -> bool {
        self.refresh.get()
    }

    pub fn is_drawing(&self) -> bool {
        self.lock.get()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.drawn.get()
    }

    pub fn request_redraw(&self, trigger: RedrawTrigger) {
        trace!(?trigger, "redraw requested");
        self.refresh.set(true);
        if trigger == RedrawTrigger::DataReady {
            self.ready.set(true);
        }
    }

    /// Runs at most one draw.
    ///
    /// `refresh` is consumed before `draw` runs, so triggers fired during the
    /// draw are kept for the next tick. If the draw reports pending tiles the
    /// redraw is re-asserted.
    pub fn tick<F>(&self, now: Time, draw: F) -> TickOutcome
    where
        F: FnOnce(&Frame) -> DrawStatus,
    {
        if self.lock.get() {
            self.refresh.set(true);
            return TickOutcome::Busy;
        }
        if !self.refresh.get() {
            return TickOutcome::Idle;
        }
        if !self.ready.get() {
            return TickOutcome::NotReady;
        }

        let frame = Frame::new(self.drawn.get(), now);
        self.refresh.set(false);
        let status = {
            let _lock = DrawLock::acquire(&self.lock);
            draw(&frame)
        };
        self.drawn.set(self.drawn.get() + 1);
        if status.tiles_pending {
            self.refresh.set(true);
        }
        debug!(
            frame = frame.index,
            tiles_pending = status.tiles_pending,
            "chart drawn"
        );
        TickOutcome::Drew(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartMode, RedrawTrigger, RenderScheduler, TickOutcome};
    use crate::frame::DrawStatus;
    use foundation::time::Time;
    use std::cell::Cell;
    use std::time::Duration;

    fn ready_scheduler() -> RenderScheduler {
        let s = RenderScheduler::new();
        s.request_redraw(RedrawTrigger::DataReady);
        s
    }

    #[test]
    fn idle_without_refresh_and_waits_for_ready() {
        let s = RenderScheduler::new();
        assert_eq!(s.tick(Time::ZERO, |_| DrawStatus::default()), TickOutcome::Idle);

        s.request_redraw(RedrawTrigger::Resize);
        assert_eq!(s.tick(Time::ZERO, |_| DrawStatus::default()), TickOutcome::NotReady);
        assert!(s.needs_redraw());

        s.set_ready(true);
        assert!(matches!(
            s.tick(Time::ZERO, |_| DrawStatus::default()),
            TickOutcome::Drew(_)
        ));
        assert!(!s.needs_redraw());
    }

    #[test]
    fn nested_tick_runs_exactly_one_draw() {
        let s = ready_scheduler();
        let draws = Cell::new(0);
        let inner = Cell::new(None);

        let outer = s.tick(Time(1.0), |_| {
            draws.set(draws.get() + 1);
            // Simulates a slow draw during which another tick fires.
            inner.set(Some(s.tick(Time(1.1), |_| {
                draws.set(draws.get() + 1);
                DrawStatus::default()
            })));
            DrawStatus::default()
        });

        assert!(matches!(outer, TickOutcome::Drew(_)));
        assert_eq!(inner.get(), Some(TickOutcome::Busy));
        assert_eq!(draws.get(), 1);
        assert!(s.needs_redraw());
        assert!(!s.is_drawing());

        assert!(matches!(
            s.tick(Time(1.2), |_| DrawStatus::default()),
            TickOutcome::Drew(_)
        ));
        assert_eq!(s.frames_drawn(), 2);
    }

    #[test]
    fn pending_tiles_keep_refresh_set() {
        let s = ready_scheduler();
        s.tick(Time::ZERO, |_| DrawStatus {
            tiles_pending: true,
        });
        assert!(s.needs_redraw());
        s.tick(Time::ZERO, |_| DrawStatus::default());
        assert!(!s.needs_redraw());
    }

    #[test]
    fn lock_is_released_when_draw_panics() {
        let s = ready_scheduler();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            s.tick(Time::ZERO, |_| panic!("draw failed"))
        }));
        assert!(result.is_err());
        assert!(!s.is_drawing());
    }

    #[test]
    fn frame_indices_count_up() {
        let s = ready_scheduler();
        let mut indices = Vec::new();
        for i in 0..3 {
            s.request_redraw(RedrawTrigger::PanZoom);
            if let TickOutcome::Drew(frame) = s.tick(Time(i as f64), |_| DrawStatus::default()) {
                indices.push(frame.index);
            }
        }
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn poll_intervals() {
        assert_eq!(ChartMode::Interactive.poll_interval(), Duration::from_millis(200));
        assert_eq!(ChartMode::Static.poll_interval(), Duration::from_millis(250));
    }
}
