//! Alert state machine shared between firmware and host targets.
//!
//! [`AlertController`] owns the blink session, the indicator handle and the
//! deadline timer. Inbound events and deadline fires both mutate the same
//! session; [`device::AlertDevice`] wraps the controller in a lock so the two
//! execution contexts never interleave inside a transition.
//!
//! ```text
//!            on-range event               on-range event (cancel + re-arm)
//!   Idle ───────────────────► Blinking ◄──────────────────┐
//!    ▲                         │  │                        │
//!    │   off event / deadline  │  └────────────────────────┘
//!    └─────────────────────────┘
//!    ▲
//!    └── suspend / shutdown / remove (from any state)
//! ```

use core::{fmt, ops::Add, time::Duration};

use crate::event::{AlertCommand, AlertEvent, EventError, OutOfRangePolicy, STATUS_OK};
use crate::pattern::{BlinkCadence, BlinkPattern};
use crate::telemetry::{
    TELEMETRY_RING_CAPACITY, TelemetryEventKind, TelemetryInstant, TelemetryPayload,
    TelemetryRecorder,
};

pub mod device;

pub use device::AlertDevice;

/// Longest a single alert may keep the indicator blinking without a follow-up event.
pub const DEFAULT_BLINK_WINDOW: Duration = Duration::from_secs(3);

/// Generation number identifying one armed deadline.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadlineToken(u32);

impl DeadlineToken {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Brightness level understood by a single-brightness indicator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Brightness(pub u8);

impl Brightness {
    pub const OFF: Self = Self(0);

    #[must_use]
    pub const fn is_off(self) -> bool {
        self.0 == 0
    }
}

/// Indicator operation named in fault telemetry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorOp {
    SetBrightness,
    SetBlinkPattern,
}

impl fmt::Display for IndicatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorOp::SetBrightness => f.write_str("set-brightness"),
            IndicatorOp::SetBlinkPattern => f.write_str("set-blink-pattern"),
        }
    }
}

/// Why a blink session ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    OffEvent,
    DeadlineExpired,
    Suspend,
    Shutdown,
    Remove,
    Rebind,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::OffEvent => "off-event",
            StopReason::DeadlineExpired => "deadline",
            StopReason::Suspend => "suspend",
            StopReason::Shutdown => "shutdown",
            StopReason::Remove => "remove",
            StopReason::Rebind => "rebind",
        };
        f.write_str(label)
    }
}

/// Abstraction over the physical indicator driver.
///
/// Calls are best-effort: failures are recorded and never abort a transition.
pub trait Indicator {
    type Error: fmt::Debug;

    /// Sets a steady brightness, cancelling any blink pattern.
    fn set_brightness(&mut self, level: Brightness) -> Result<(), Self::Error>;

    /// Starts blinking with the given on/off phases.
    fn set_blink_pattern(&mut self, on_millis: u32, off_millis: u32) -> Result<(), Self::Error>;
}

/// Indicator that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopIndicator;

impl Indicator for NoopIndicator {
    type Error = core::convert::Infallible;

    fn set_brightness(&mut self, _: Brightness) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_blink_pattern(&mut self, _: u32, _: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// One-shot deadline scheduler.
///
/// When a deadline passes the runtime calls [`AlertController::on_deadline`]
/// (usually through [`AlertDevice::on_deadline`]) with the armed token.
pub trait DeadlineTimer {
    type Instant: Copy;

    /// Schedules `token` to fire at `deadline`, replacing any pending deadline.
    fn arm(&mut self, token: DeadlineToken, deadline: Self::Instant);

    /// Drops any pending deadline.
    fn cancel(&mut self);
}

/// Monotonic instant usable by the alert state machine.
pub trait AlertInstant: TelemetryInstant + Ord + Add<Duration, Output = Self> {}

impl<T> AlertInstant for T where T: TelemetryInstant + Ord + Add<Duration, Output = T> {}

/// Tunables for the alert state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AlertConfig {
    pub cadence: BlinkCadence,
    pub blink_window: Duration,
    pub out_of_range: OutOfRangePolicy,
}

impl AlertConfig {
    pub const DEFAULT: Self = Self {
        cadence: BlinkCadence::DEFAULT,
        blink_window: DEFAULT_BLINK_WINDOW,
        out_of_range: OutOfRangePolicy::Reject,
    };

    #[must_use]
    pub const fn with_blink_window(mut self, blink_window: Duration) -> Self {
        self.blink_window = blink_window;
        self
    }

    #[must_use]
    pub const fn with_cadence(mut self, cadence: BlinkCadence) -> Self {
        self.cadence = cadence;
        self
    }

    #[must_use]
    pub const fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Coarse state of the session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertState {
    Idle,
    Blinking,
}

/// Effect an inbound event or lifecycle hook had on the session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    Started(BlinkPattern),
    Restarted(BlinkPattern),
    Stopped,
    Unchanged,
}

/// Result of delivering a deadline fire to the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeadlineOutcome {
    /// The window elapsed; the indicator is off and the session idle.
    Expired,
    /// The fire arrived before the recorded deadline and was re-armed.
    Rearmed,
    /// The token was superseded or cancelled; nothing changed.
    Stale,
}

/// Mutable record of the current blink activity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Session<TInstant> {
    active: bool,
    current_pattern: Option<BlinkPattern>,
    deadline: Option<TInstant>,
    armed: Option<DeadlineToken>,
    started_at: Option<TInstant>,
    call_counter: u32,
    last_token: DeadlineToken,
}

impl<TInstant: Copy> Session<TInstant> {
    const fn new() -> Self {
        Self {
            active: false,
            current_pattern: None,
            deadline: None,
            armed: None,
            started_at: None,
            call_counter: 0,
            last_token: DeadlineToken::new(0),
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn state(&self) -> AlertState {
        if self.active {
            AlertState::Blinking
        } else {
            AlertState::Idle
        }
    }

    pub const fn current_pattern(&self) -> Option<BlinkPattern> {
        self.current_pattern
    }

    /// Absolute expiry of the current blink window.
    pub const fn deadline(&self) -> Option<TInstant> {
        self.deadline
    }

    /// Token of the deadline currently armed, if any.
    pub const fn armed_token(&self) -> Option<DeadlineToken> {
        self.armed
    }

    pub const fn started_at(&self) -> Option<TInstant> {
        self.started_at
    }

    /// Number of inbound event calls seen, accepted or not.
    pub const fn call_counter(&self) -> u32 {
        self.call_counter
    }

    fn clear(&mut self) {
        self.active = false;
        self.current_pattern = None;
        self.deadline = None;
        self.armed = None;
        self.started_at = None;
    }
}

/// Owns the blink session and drives the indicator and deadline timer.
pub struct AlertController<D, T, I, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    D: Indicator,
    T: DeadlineTimer<Instant = I>,
    I: AlertInstant,
{
    config: AlertConfig,
    indicator: D,
    timer: T,
    session: Session<I>,
    telemetry: TelemetryRecorder<I, CAPACITY>,
}

impl<D, T, I, const CAPACITY: usize> AlertController<D, T, I, CAPACITY>
where
    D: Indicator,
    T: DeadlineTimer<Instant = I>,
    I: AlertInstant,
{
    /// Binds the collaborators and forces the indicator into its off state.
    pub fn new(indicator: D, mut timer: T, config: AlertConfig, now: I) -> Self {
        timer.cancel();
        let mut controller = Self {
            config,
            indicator,
            timer,
            session: Session::new(),
            telemetry: TelemetryRecorder::new(),
        };
        controller.drive_off(now);
        controller
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn session(&self) -> &Session<I> {
        &self.session
    }

    pub fn state(&self) -> AlertState {
        self.session.state()
    }

    pub fn telemetry(&self) -> &TelemetryRecorder<I, CAPACITY> {
        &self.telemetry
    }

    pub fn indicator(&self) -> &D {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut D {
        &mut self.indicator
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Handles a raw `(type, code, value)` triple and returns the status code
    /// reported to the event source.
    pub fn handle_raw(&mut self, event_type: u16, code: u16, value: i32, now: I) -> i32 {
        self.count_call();
        let result = AlertEvent::from_raw(event_type, code, value)
            .and_then(|event| self.apply(event, now));

        match result {
            Ok(_) => STATUS_OK,
            Err(err) => {
                self.reject(err, now);
                err.status()
            }
        }
    }

    /// Handles an already-typed alert event.
    pub fn handle_event(&mut self, event: AlertEvent, now: I) -> Result<Transition, EventError> {
        self.count_call();
        self.apply(event, now).inspect_err(|err| self.reject(*err, now))
    }

    /// Delivers a deadline fire for `token`.
    pub fn on_deadline(&mut self, token: DeadlineToken, now: I) -> DeadlineOutcome {
        if self.session.armed != Some(token) {
            self.telemetry.record(
                TelemetryEventKind::DeadlineStale(token),
                TelemetryPayload::None,
                now,
            );
            return DeadlineOutcome::Stale;
        }

        match self.session.deadline {
            Some(deadline) if now < deadline => {
                self.timer.arm(token, deadline);
                self.telemetry.record(
                    TelemetryEventKind::DeadlineRearmed(token),
                    TelemetryPayload::None,
                    now,
                );
                DeadlineOutcome::Rearmed
            }
            _ => {
                // One-shot: the fired timer is already spent, nothing to cancel.
                self.session.armed = None;
                self.end_session(StopReason::DeadlineExpired, now);
                DeadlineOutcome::Expired
            }
        }
    }

    /// Cancels any deadline and forces the indicator off regardless of state.
    pub fn force_idle(&mut self, reason: StopReason, now: I) -> Transition {
        self.timer.cancel();
        self.session.armed = None;

        if self.session.active {
            self.end_session(reason, now);
            Transition::Stopped
        } else {
            self.drive_off(now);
            Transition::Unchanged
        }
    }

    fn count_call(&mut self) {
        self.session.call_counter = self.session.call_counter.wrapping_add(1);
    }

    fn apply(&mut self, event: AlertEvent, now: I) -> Result<Transition, EventError> {
        let command = event.command(&self.config.cadence, self.config.out_of_range)?;
        Ok(match command {
            AlertCommand::Blink(pattern) => self.start_blink(pattern, now),
            AlertCommand::Off if self.session.active => {
                self.timer.cancel();
                self.session.armed = None;
                self.end_session(StopReason::OffEvent, now);
                Transition::Stopped
            }
            AlertCommand::Off => Transition::Unchanged,
        })
    }

    fn start_blink(&mut self, pattern: BlinkPattern, now: I) -> Transition {
        let restarted = self.session.active;

        if self.session.armed.take().is_some() {
            self.timer.cancel();
        }

        let token = self.session.last_token.next();
        let deadline = now + self.config.blink_window;
        self.session.last_token = token;
        self.timer.arm(token, deadline);

        if let Err(err) = self
            .indicator
            .set_blink_pattern(pattern.on_millis, pattern.off_millis)
        {
            self.indicator_fault(IndicatorOp::SetBlinkPattern, &err, now);
        }

        self.session.active = true;
        self.session.current_pattern = Some(pattern);
        self.session.deadline = Some(deadline);
        self.session.armed = Some(token);
        if !restarted {
            self.session.started_at = Some(now);
        }

        log_blink(pattern, token, restarted);
        let event = if restarted {
            TelemetryEventKind::BlinkRestarted(pattern)
        } else {
            TelemetryEventKind::BlinkStarted(pattern)
        };
        self.telemetry.record(event, TelemetryPayload::None, now);

        if restarted {
            Transition::Restarted(pattern)
        } else {
            Transition::Started(pattern)
        }
    }

    fn end_session(&mut self, reason: StopReason, now: I) {
        self.drive_off(now);
        let started_at = self.session.started_at;
        self.session.clear();
        log_stop(reason);
        self.telemetry.record_stop(reason, started_at, now);
    }

    fn drive_off(&mut self, now: I) {
        if let Err(err) = self.indicator.set_brightness(Brightness::OFF) {
            self.indicator_fault(IndicatorOp::SetBrightness, &err, now);
        }
    }

    fn indicator_fault(&mut self, op: IndicatorOp, error: &D::Error, now: I) {
        log_indicator_fault(op, error);
        self.telemetry.record(
            TelemetryEventKind::IndicatorFault(op),
            TelemetryPayload::None,
            now,
        );
    }

    fn reject(&mut self, error: EventError, now: I) {
        log_rejected(error);
        self.telemetry.record(
            TelemetryEventKind::EventRejected(error),
            TelemetryPayload::None,
            now,
        );
    }
}

#[cfg(feature = "defmt")]
fn log_blink(pattern: BlinkPattern, token: DeadlineToken, restarted: bool) {
    defmt::debug!(
        "alert: blink {} on={}ms off={}ms deadline #{}",
        if restarted { "restart" } else { "start" },
        pattern.on_millis,
        pattern.off_millis,
        token.value()
    );
}

#[cfg(not(feature = "defmt"))]
fn log_blink(_: BlinkPattern, _: DeadlineToken, _: bool) {}

#[cfg(feature = "defmt")]
fn log_stop(reason: StopReason) {
    defmt::debug!("alert: indicator off ({})", reason);
}

#[cfg(not(feature = "defmt"))]
fn log_stop(_: StopReason) {}

#[cfg(feature = "defmt")]
fn log_indicator_fault<E: fmt::Debug>(op: IndicatorOp, error: &E) {
    defmt::warn!(
        "alert: indicator {} failed: {}",
        op,
        defmt::Debug2Format(error)
    );
}

#[cfg(not(feature = "defmt"))]
fn log_indicator_fault<E: fmt::Debug>(_: IndicatorOp, _: &E) {}

#[cfg(feature = "defmt")]
fn log_rejected(error: EventError) {
    defmt::info!("alert: event rejected ({})", error);
}

#[cfg(not(feature = "defmt"))]
fn log_rejected(_: EventError) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AlertKind, EINVAL, EV_SND, SND_BELL, SND_TONE};
    use heapless::Vec as HeaplessVec;

    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
    struct MockInstant(u64);

    impl MockInstant {
        fn millis(value: u64) -> Self {
            Self(value * 1_000)
        }
    }

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX))
        }
    }

    impl TelemetryInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Led {
        Level(Brightness),
        Blink(u32, u32),
    }

    #[derive(Default)]
    struct MockIndicator {
        history: HeaplessVec<Led, 32>,
        fail: bool,
    }

    impl MockIndicator {
        fn current(&self) -> Option<Led> {
            self.history.last().copied()
        }
    }

    impl Indicator for MockIndicator {
        type Error = &'static str;

        fn set_brightness(&mut self, level: Brightness) -> Result<(), Self::Error> {
            if self.fail {
                return Err("led offline");
            }
            let _ = self.history.push(Led::Level(level));
            Ok(())
        }

        fn set_blink_pattern(&mut self, on_millis: u32, off_millis: u32) -> Result<(), Self::Error> {
            if self.fail {
                return Err("led offline");
            }
            let _ = self.history.push(Led::Blink(on_millis, off_millis));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockTimer {
        pending: Option<(DeadlineToken, MockInstant)>,
        arms: usize,
        cancels: usize,
    }

    impl DeadlineTimer for MockTimer {
        type Instant = MockInstant;

        fn arm(&mut self, token: DeadlineToken, deadline: MockInstant) {
            self.pending = Some((token, deadline));
            self.arms += 1;
        }

        fn cancel(&mut self) {
            self.pending = None;
            self.cancels += 1;
        }
    }

    type Controller = AlertController<MockIndicator, MockTimer, MockInstant>;

    fn controller() -> Controller {
        AlertController::new(
            MockIndicator::default(),
            MockTimer::default(),
            AlertConfig::DEFAULT,
            MockInstant::millis(0),
        )
    }

    #[test]
    fn construction_forces_indicator_off() {
        let controller = controller();
        assert_eq!(controller.state(), AlertState::Idle);
        assert_eq!(
            controller.indicator().current(),
            Some(Led::Level(Brightness::OFF))
        );
        assert!(controller.timer().pending.is_none());
    }

    #[test]
    fn tone_starts_blinking_and_arms_window() {
        let mut controller = controller();
        let now = MockInstant::millis(10);

        let status = controller.handle_raw(EV_SND, SND_TONE, 500, now);
        assert_eq!(status, STATUS_OK);
        assert_eq!(controller.state(), AlertState::Blinking);
        assert_eq!(controller.indicator().current(), Some(Led::Blink(250, 750)));

        let session = controller.session();
        let token = session.armed_token().expect("deadline armed");
        assert_eq!(session.deadline(), Some(now + DEFAULT_BLINK_WINDOW));
        assert_eq!(
            controller.timer().pending,
            Some((token, now + DEFAULT_BLINK_WINDOW))
        );
        assert_eq!(session.call_counter(), 1);
    }

    #[test]
    fn bell_off_cancels_timer_and_turns_indicator_off() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));

        let status = controller.handle_raw(EV_SND, SND_BELL, 0, MockInstant::millis(100));
        assert_eq!(status, STATUS_OK);
        assert_eq!(controller.state(), AlertState::Idle);
        assert!(controller.timer().pending.is_none());
        assert!(controller.session().armed_token().is_none());
        assert_eq!(
            controller.indicator().current(),
            Some(Led::Level(Brightness::OFF))
        );
    }

    #[test]
    fn repeated_tone_rearms_single_timer() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        let first = controller.session().armed_token().expect("armed");

        let transition = controller
            .handle_event(AlertEvent::tone(500), MockInstant::millis(1_000))
            .expect("in range");
        assert!(matches!(transition, Transition::Restarted(_)));

        let second = controller.session().armed_token().expect("armed");
        assert_ne!(first, second);
        assert_eq!(
            controller.timer().pending,
            Some((second, MockInstant::millis(1_000) + DEFAULT_BLINK_WINDOW))
        );
        assert_eq!(controller.indicator().current(), Some(Led::Blink(250, 750)));
        assert_eq!(
            controller.session().started_at(),
            Some(MockInstant::millis(0))
        );
    }

    #[test]
    fn typed_bell_with_arbitrary_value_starts_blinking() {
        let mut controller = controller();
        let event = AlertEvent {
            kind: AlertKind::Bell,
            requested_value: 7,
        };

        let transition = controller
            .handle_event(event, MockInstant::millis(0))
            .expect("bell is always audible");
        assert_eq!(transition, Transition::Started(BlinkPattern::new(250, 250)));
        assert_eq!(controller.state(), AlertState::Blinking);
        assert_eq!(controller.indicator().current(), Some(Led::Blink(250, 250)));
    }

    #[test]
    fn out_of_range_tone_is_rejected_without_side_effects() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        let before = *controller.session();
        let led_before = controller.indicator().current();

        let status = controller.handle_raw(EV_SND, SND_TONE, 40_000, MockInstant::millis(5));
        assert_eq!(status, EINVAL);
        assert_eq!(controller.indicator().current(), led_before);
        assert_eq!(controller.session().armed_token(), before.armed_token());
        assert_eq!(controller.state(), AlertState::Blinking);
        assert_eq!(
            controller.telemetry().latest().map(|r| r.event),
            Some(TelemetryEventKind::EventRejected(EventError::OutOfRange(
                40_000
            )))
        );
    }

    #[test]
    fn turn_off_policy_treats_out_of_range_as_off() {
        let mut controller = Controller::new(
            MockIndicator::default(),
            MockTimer::default(),
            AlertConfig::DEFAULT.with_out_of_range(OutOfRangePolicy::TurnOff),
            MockInstant::millis(0),
        );
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        let status = controller.handle_raw(EV_SND, SND_TONE, 10, MockInstant::millis(1));

        assert_eq!(status, STATUS_OK);
        assert_eq!(controller.state(), AlertState::Idle);
    }

    #[test]
    fn invalid_type_counts_call_but_changes_nothing() {
        let mut controller = controller();
        let status = controller.handle_raw(0x01, SND_TONE, 500, MockInstant::millis(0));

        assert_eq!(status, EINVAL);
        assert_eq!(controller.session().call_counter(), 1);
        assert_eq!(controller.state(), AlertState::Idle);
        assert_eq!(controller.timer().arms, 0);
    }

    #[test]
    fn deadline_expiry_turns_indicator_off_once() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 750, MockInstant::millis(0));
        let token = controller.session().armed_token().expect("armed");

        let outcome = controller.on_deadline(token, MockInstant::millis(3_000));
        assert_eq!(outcome, DeadlineOutcome::Expired);
        assert_eq!(controller.state(), AlertState::Idle);
        assert_eq!(
            controller.indicator().current(),
            Some(Led::Level(Brightness::OFF))
        );

        let offs_before = controller.indicator().history.len();
        assert_eq!(
            controller.on_deadline(token, MockInstant::millis(3_001)),
            DeadlineOutcome::Stale
        );
        assert_eq!(controller.indicator().history.len(), offs_before);
    }

    #[test]
    fn superseded_deadline_is_stale() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        let stale = controller.session().armed_token().expect("armed");
        controller.handle_raw(EV_SND, SND_TONE, 600, MockInstant::millis(2_999));

        let outcome = controller.on_deadline(stale, MockInstant::millis(3_000));
        assert_eq!(outcome, DeadlineOutcome::Stale);
        assert_eq!(controller.state(), AlertState::Blinking);
        assert!(matches!(controller.indicator().current(), Some(Led::Blink(..))));
    }

    #[test]
    fn early_fire_rearms_for_remaining_window() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        let token = controller.session().armed_token().expect("armed");

        let outcome = controller.on_deadline(token, MockInstant::millis(1_000));
        assert_eq!(outcome, DeadlineOutcome::Rearmed);
        assert_eq!(controller.state(), AlertState::Blinking);
        assert_eq!(
            controller.timer().pending,
            Some((token, MockInstant::millis(3_000)))
        );
    }

    #[test]
    fn force_idle_is_idempotent() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));

        assert_eq!(
            controller.force_idle(StopReason::Suspend, MockInstant::millis(1)),
            Transition::Stopped
        );
        assert_eq!(
            controller.force_idle(StopReason::Shutdown, MockInstant::millis(2)),
            Transition::Unchanged
        );
        assert_eq!(
            controller.force_idle(StopReason::Remove, MockInstant::millis(3)),
            Transition::Unchanged
        );
        assert_eq!(controller.state(), AlertState::Idle);
        assert!(controller.timer().pending.is_none());
        assert_eq!(
            controller.indicator().current(),
            Some(Led::Level(Brightness::OFF))
        );
    }

    #[test]
    fn indicator_failure_is_absorbed() {
        let mut controller = controller();
        controller.indicator_mut().fail = true;

        let status = controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(0));
        assert_eq!(status, STATUS_OK);
        assert_eq!(controller.state(), AlertState::Blinking);
        assert!(controller.session().armed_token().is_some());
        assert_eq!(
            controller.telemetry().latest().map(|r| r.event),
            Some(TelemetryEventKind::BlinkStarted(BlinkPattern::new(250, 750)))
        );
        assert!(controller.telemetry().oldest_first().any(|r| r.event
            == TelemetryEventKind::IndicatorFault(IndicatorOp::SetBlinkPattern)));
    }

    #[test]
    fn stop_telemetry_records_lit_duration() {
        let mut controller = controller();
        controller.handle_raw(EV_SND, SND_TONE, 500, MockInstant::millis(100));
        controller.handle_raw(EV_SND, SND_TONE, 0, MockInstant::millis(350));

        let record = controller.telemetry().latest().copied().expect("recorded");
        assert_eq!(
            record.event,
            TelemetryEventKind::BlinkStopped(StopReason::OffEvent)
        );
        assert_eq!(
            record.details,
            TelemetryPayload::Session {
                lit_for: Some(Duration::from_millis(250))
            }
        );
    }
}
