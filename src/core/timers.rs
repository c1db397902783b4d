//! Tick-driven interval timers.
//!
//! The scheduler has no thread and no wall clock: the host advances it once per
//! frame with the clock's elapsed time and every due callback runs inline.
//! Timers are owned through [`TimerGuard`]s; dropping the guard cancels the
//! timer, so an unmounted scene can never be called back.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Shortest accepted interval, in seconds.
pub const MIN_PERIOD: f64 = 0.001;

/// Slack when comparing due times, so `n * period` rounding does not skip a beat.
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Stop,
}

type Callback = Box<dyn FnMut() -> TimerControl>;

struct Timer {
    id: u64,
    origin: f64,
    period: f64,
    fired: u64,
    // Taken out while the callback runs.
    callback: Option<Callback>,
}

impl Timer {
    fn next_due(&self) -> f64 {
        self.origin + (self.fired + 1) as f64 * self.period
    }
}

#[derive(Default)]
struct Inner {
    now: f64,
    next_id: u64,
    timers: Vec<Timer>,
}

/// Single-threaded interval scheduler. Clones share the same timer table.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The time of the last [`Scheduler::advance_to`], in seconds.
    pub fn now(&self) -> f64 {
        self.inner.borrow().now
    }

    /// Number of live timers.
    pub fn active(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Call `callback` every `period` seconds, starting one period from now,
    /// until it returns [`TimerControl::Stop`] or the guard is dropped.
    pub fn set_interval<F>(&self, period: f64, callback: F) -> TimerGuard
    where
        F: FnMut() -> TimerControl + 'static,
    {
        let period = if period.is_finite() {
            period.max(MIN_PERIOD)
        } else {
            MIN_PERIOD
        };
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let origin = inner.now;
        inner.timers.push(Timer {
            id,
            origin,
            period,
            fired: 0,
            callback: Some(Box::new(callback)),
        });
        TimerGuard {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Move time forward to `now` and run every callback that falls due, in
    /// due-time order. Returns the number of callbacks run.
    pub fn advance_to(&self, now: f64) -> usize {
        {
            let mut inner = self.inner.borrow_mut();
            if now > inner.now {
                inner.now = now;
            }
        }
        let mut fired = 0;
        loop {
            let due = {
                let mut inner = self.inner.borrow_mut();
                let limit = inner.now + EPS;
                let next = inner
                    .timers
                    .iter_mut()
                    .filter(|t| t.callback.is_some() && t.next_due() <= limit)
                    .min_by(|a, b| a.next_due().total_cmp(&b.next_due()));
                next.and_then(|t| t.callback.take().map(|cb| (t.id, cb)))
            };
            let Some((id, mut callback)) = due else {
                break;
            };

            // No borrow is held here; callbacks may add or cancel timers.
            let control = callback();
            fired += 1;

            let mut retired = None;
            {
                let mut inner = self.inner.borrow_mut();
                match inner.timers.iter().position(|t| t.id == id) {
                    Some(pos) if control == TimerControl::Continue => {
                        let timer = &mut inner.timers[pos];
                        timer.fired += 1;
                        timer.callback = Some(callback);
                    }
                    Some(pos) => {
                        inner.timers.remove(pos);
                        retired = Some(callback);
                    }
                    None => retired = Some(callback),
                }
            }
            // Dropped outside the borrow: the closure may own guards.
            drop(retired);
        }
        fired
    }

    fn cancel(inner: &Weak<RefCell<Inner>>, id: u64) {
        let Some(shared) = inner.upgrade() else {
            return;
        };
        if let Ok(mut table) = shared.try_borrow_mut() {
            table.timers.retain(|t| t.id != id);
        };
    }
}

/// Owns one timer; dropping it cancels the timer.
#[must_use = "dropping the guard cancels the timer"]
pub struct TimerGuard {
    id: u64,
    inner: Weak<RefCell<Inner>>,
}

impl TimerGuard {
    pub fn is_active(&self) -> bool {
        let Some(shared) = self.inner.upgrade() else {
            return false;
        };
        let active = shared.borrow().timers.iter().any(|t| t.id == self.id);
        active
    }

    pub fn cancel(self) {}
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        Scheduler::cancel(&self.inner, self.id);
    }
}

impl std::fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGuard").field("id", &self.id).finish()
    }
}

/// One-shot count from a start age up to a target age.
///
/// Emits the start value immediately, then one increment per
/// `duration / (target - start)` seconds until the target is reached. When
/// there is nothing to count the target is emitted at once and no timer is
/// scheduled.
#[derive(Debug)]
pub struct CountingAnimation {
    display: Rc<Cell<u32>>,
    target: u32,
    guard: Option<TimerGuard>,
}

impl CountingAnimation {
    pub fn start<F>(
        scheduler: &Scheduler,
        start: u32,
        target: u32,
        duration: f64,
        mut on_display: F,
    ) -> Self
    where
        F: FnMut(u32) + 'static,
    {
        if target <= start {
            on_display(target);
            return Self {
                display: Rc::new(Cell::new(target)),
                target,
                guard: None,
            };
        }

        let steps = target - start;
        let display = Rc::new(Cell::new(start));
        on_display(start);

        let shared = Rc::clone(&display);
        let period = duration.max(0.0) / steps as f64;
        let guard = scheduler.set_interval(period, move || {
            let next = shared.get().saturating_add(1).min(target);
            shared.set(next);
            on_display(next);
            if next >= target {
                TimerControl::Stop
            } else {
                TimerControl::Continue
            }
        });

        Self {
            display,
            target,
            guard: Some(guard),
        }
    }

    pub fn display(&self) -> u32 {
        self.display.get()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.guard.as_ref().is_some_and(TimerGuard::is_active)
    }

    pub fn cancel(&mut self) {
        self.guard = None;
    }
}
