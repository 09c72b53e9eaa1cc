//! Device-level entry points for the alert state machine.
//!
//! The event path and the deadline path run in different execution contexts
//! (an interrupt or reader task versus a timer task). Both funnel through the
//! blocking mutex held here, so every transition observes and leaves behind a
//! consistent session.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};

use super::{
    AlertConfig, AlertController, AlertInstant, DeadlineOutcome, DeadlineTimer, DeadlineToken,
    Indicator, Session, StopReason, Transition,
};
use crate::event::{AlertEvent, ENODEV};
use crate::telemetry::TELEMETRY_RING_CAPACITY;

/// Bound or unbound alert device guarded by a blocking mutex.
pub struct AlertDevice<M, D, T, I, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    M: RawMutex,
    D: Indicator,
    T: DeadlineTimer<Instant = I>,
    I: AlertInstant,
{
    inner: Mutex<M, RefCell<Option<AlertController<D, T, I, CAPACITY>>>>,
}

impl<M, D, T, I, const CAPACITY: usize> AlertDevice<M, D, T, I, CAPACITY>
where
    M: RawMutex,
    D: Indicator,
    T: DeadlineTimer<Instant = I>,
    I: AlertInstant,
{
    /// Creates an unbound device. Events report `ENODEV` until [`Self::on_init`].
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Binds the indicator and timer. A previous binding is idled and dropped.
    pub fn on_init(&self, indicator: D, timer: T, config: AlertConfig, now: I) {
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            if let Some(previous) = slot.as_mut() {
                previous.force_idle(StopReason::Rebind, now);
            }
            *slot = Some(AlertController::new(indicator, timer, config, now));
        });
    }

    pub fn is_bound(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Event entry point. Returns the status reported to the event source.
    pub fn event(&self, event_type: u16, code: u16, value: i32, now: I) -> i32 {
        self.with_controller(|controller| controller.handle_raw(event_type, code, value, now))
            .unwrap_or_else(|| match AlertEvent::from_raw(event_type, code, value) {
                Err(err) => err.status(),
                Ok(_) => ENODEV,
            })
    }

    /// Deadline entry point. Fires for an unbound device are stale.
    pub fn on_deadline(&self, token: DeadlineToken, now: I) -> DeadlineOutcome {
        self.with_controller(|controller| controller.on_deadline(token, now))
            .unwrap_or(DeadlineOutcome::Stale)
    }

    pub fn on_suspend(&self, now: I) -> Transition {
        self.idle(StopReason::Suspend, now)
    }

    pub fn on_shutdown(&self, now: I) -> Transition {
        self.idle(StopReason::Shutdown, now)
    }

    /// Idles the indicator, then releases both collaborators. Both happen
    /// under the lock so a concurrent rebind never sees the late off.
    pub fn on_remove(&self, now: I) -> Transition {
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            let transition = slot
                .as_mut()
                .map_or(Transition::Unchanged, |controller| {
                    controller.force_idle(StopReason::Remove, now)
                });
            slot.take();
            transition
        })
    }

    /// Copy of the current session, if bound.
    pub fn snapshot(&self) -> Option<Session<I>> {
        self.inner
            .lock(|cell| cell.borrow().as_ref().map(|controller| *controller.session()))
    }

    /// Runs `f` against the bound controller without mutating it.
    pub fn inspect<R>(
        &self,
        f: impl FnOnce(&AlertController<D, T, I, CAPACITY>) -> R,
    ) -> Option<R> {
        self.inner.lock(|cell| cell.borrow().as_ref().map(f))
    }

    fn idle(&self, reason: StopReason, now: I) -> Transition {
        self.with_controller(|controller| controller.force_idle(reason, now))
            .unwrap_or(Transition::Unchanged)
    }

    fn with_controller<R>(
        &self,
        f: impl FnOnce(&mut AlertController<D, T, I, CAPACITY>) -> R,
    ) -> Option<R> {
        self.inner.lock(|cell| cell.borrow_mut().as_mut().map(f))
    }
}

impl<M, D, T, I, const CAPACITY: usize> Default for AlertDevice<M, D, T, I, CAPACITY>
where
    M: RawMutex,
    D: Indicator,
    T: DeadlineTimer<Instant = I>,
    I: AlertInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
