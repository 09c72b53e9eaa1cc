//! Diagnostics ring shared by firmware and host targets.
//!
//! The alert state machine never reports asynchronous problems to the event
//! source, so everything worth knowing after the fact (rejected events,
//! stale deadline fires, indicator faults) lands in a fixed-size ring that
//! the console `status` command and the transcript tooling read back.

use core::{fmt, time::Duration};

use heapless::HistoryBuf;

use crate::alert::{DeadlineToken, IndicatorOp, StopReason};
use crate::event::EventError;
use crate::pattern::BlinkPattern;

/// Identifier used when tracking emitted telemetry events.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated telemetry events emitted by the alert state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryEventKind {
    EventRejected(EventError),
    BlinkStarted(BlinkPattern),
    BlinkRestarted(BlinkPattern),
    BlinkStopped(StopReason),
    DeadlineRearmed(DeadlineToken),
    DeadlineStale(DeadlineToken),
    IndicatorFault(IndicatorOp),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::EventRejected(err) => write!(f, "event-rejected ({err})"),
            TelemetryEventKind::BlinkStarted(pattern) => write!(
                f,
                "blink-started on={}ms off={}ms",
                pattern.on_millis, pattern.off_millis
            ),
            TelemetryEventKind::BlinkRestarted(pattern) => write!(
                f,
                "blink-restarted on={}ms off={}ms",
                pattern.on_millis, pattern.off_millis
            ),
            TelemetryEventKind::BlinkStopped(reason) => write!(f, "blink-stopped {reason}"),
            TelemetryEventKind::DeadlineRearmed(token) => {
                write!(f, "deadline-rearmed #{}", token.value())
            }
            TelemetryEventKind::DeadlineStale(token) => {
                write!(f, "deadline-stale #{}", token.value())
            }
            TelemetryEventKind::IndicatorFault(op) => write!(f, "indicator-fault {op}"),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// How long the indicator blinked before the session ended.
    Session { lit_for: Option<Duration> },
}

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total number of events recorded, including ones evicted from the ring.
    pub fn total_recorded(&self) -> EventId {
        self.next_event_id
    }

    /// Records a blink session ending, with the time it spent lit.
    pub fn record_stop(
        &mut self,
        reason: StopReason,
        started_at: Option<TInstant>,
        timestamp: TInstant,
    ) -> EventId {
        let lit_for = started_at.map(|start| timestamp.saturating_duration_since(start));
        self.record(
            TelemetryEventKind::BlinkStopped(reason),
            TelemetryPayload::Session { lit_for },
            timestamp,
        )
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MicrosInstant(u64);

    impl TelemetryInstant for MicrosInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn stop_records_lit_duration() {
        let mut recorder: TelemetryRecorder<MicrosInstant> = TelemetryRecorder::new();
        let id = recorder.record_stop(
            StopReason::DeadlineExpired,
            Some(MicrosInstant(1_000)),
            MicrosInstant(3_001_000),
        );

        let latest = recorder.latest().copied().expect("record stored");
        assert_eq!(latest.id, id);
        assert_eq!(
            latest.event,
            TelemetryEventKind::BlinkStopped(StopReason::DeadlineExpired)
        );
        assert_eq!(
            latest.details,
            TelemetryPayload::Session {
                lit_for: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn ring_evicts_oldest_records() {
        let mut recorder: TelemetryRecorder<MicrosInstant, 4> = TelemetryRecorder::new();
        for tick in 0..6u64 {
            recorder.record(
                TelemetryEventKind::DeadlineStale(DeadlineToken::new(tick as u32)),
                TelemetryPayload::None,
                MicrosInstant(tick),
            );
        }

        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.total_recorded(), 6);
        let ids: heapless::Vec<EventId, 4> = recorder.oldest_first().map(|r| r.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
    }

    #[test]
    fn display_is_operator_friendly() {
        let mut line: heapless::String<64> = heapless::String::new();
        core::fmt::write(
            &mut line,
            format_args!(
                "{}",
                TelemetryEventKind::BlinkStarted(BlinkPattern::new(250, 750))
            ),
        )
        .expect("fits");
        assert_eq!(line.as_str(), "blink-started on=250ms off=750ms");
    }
}
