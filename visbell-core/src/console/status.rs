//! Shared rendering for the console `status` command.

use core::fmt;
use core::time::Duration;

use crate::alert::{AlertInstant, AlertState, Session};
use crate::telemetry::{EventId, TelemetryPayload, TelemetryRecord};

/// Renders an alert session and telemetry records into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a, I> {
    session: Option<&'a Session<I>>,
    now: I,
}

impl<'a, I: AlertInstant> StatusFormatter<'a, I> {
    /// Creates a formatter; `session` is `None` while the device is unbound.
    #[must_use]
    pub const fn new(session: Option<&'a Session<I>>, now: I) -> Self {
        Self { session, now }
    }

    /// Writes the session line (e.g. `alert state=blinking pattern=250/750ms remaining=+2.5s deadline=#3 calls=4`).
    pub fn write_session_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let Some(session) = self.session else {
            return writer.write_str("alert unbound");
        };

        writer.write_str("alert state=")?;
        writer.write_str(match session.state() {
            AlertState::Idle => "idle",
            AlertState::Blinking => "blinking",
        })?;

        writer.write_str(" pattern=")?;
        match session.current_pattern() {
            Some(pattern) => write!(writer, "{}/{}ms", pattern.on_millis, pattern.off_millis)?,
            None => writer.write_str("n/a")?,
        }

        writer.write_str(" remaining=")?;
        let remaining = session
            .deadline()
            .map(|deadline| deadline.saturating_duration_since(self.now));
        write_duration(writer, remaining)?;

        writer.write_str(" deadline=")?;
        match session.armed_token() {
            Some(token) => write!(writer, "#{}", token.value())?,
            None => writer.write_str("n/a")?,
        }

        write!(writer, " calls={}", session.call_counter())
    }

    /// Writes one telemetry line (e.g. `#7 blink-stopped deadline lit=+3.0s`).
    pub fn write_record_line<W: fmt::Write>(
        &self,
        writer: &mut W,
        record: &TelemetryRecord<I>,
    ) -> fmt::Result {
        write!(writer, "#{} {}", record.id, record.event)?;
        if let TelemetryPayload::Session { lit_for } = record.details {
            writer.write_str(" lit=")?;
            write_duration(writer, lit_for)?;
        }
        Ok(())
    }

    /// Writes the history footer (e.g. `history shown=8 total=23`).
    pub fn write_history_line<W: fmt::Write>(
        &self,
        writer: &mut W,
        shown: usize,
        total: EventId,
    ) -> fmt::Result {
        write!(writer, "history shown={shown} total={total}")
    }
}

fn write_duration<W: fmt::Write>(writer: &mut W, duration: Option<Duration>) -> fmt::Result {
    match duration {
        None => writer.write_str("n/a"),
        Some(value) if value >= Duration::from_secs(1) => {
            let millis = value.as_millis();
            let seconds = millis / 1_000;
            let tenths = (millis % 1_000) / 100;
            write!(writer, "+{seconds}.{tenths}s")
        }
        Some(value) => write!(writer, "+{}ms", value.as_millis()),
    }
}
