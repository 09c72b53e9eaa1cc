//! Inbound alert events and their validation.
//!
//! Alert sources speak the Linux input-event dialect: an event type, a code
//! and a signed value. Only sound events carrying a bell or tone code are
//! accepted; everything else is rejected before the state machine sees it.

use core::fmt;

use crate::pattern::{BlinkCadence, BlinkPattern};

/// Input event type for sound requests.
pub const EV_SND: u16 = 0x12;
/// Sound code for a binary bell ring.
pub const SND_BELL: u16 = 0x01;
/// Sound code for a tone at the requested frequency in Hz.
pub const SND_TONE: u16 = 0x02;

/// Frequency substituted for a non-zero bell value.
pub const BELL_FREQUENCY_HZ: i32 = 1_000;

/// Status returned to the event source when an event was accepted.
pub const STATUS_OK: i32 = 0;
/// Status returned when the event type, code or value is unsupported.
pub const EINVAL: i32 = -22;
/// Status returned when no indicator has been bound.
pub const ENODEV: i32 = -19;

/// Bus type reported by the alert source (ISA, matching the legacy beeper).
pub const BUS_ISA: u16 = 0x10;

/// Identity and capability masks advertised by the alert source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceIdentity {
    pub name: &'static str,
    pub phys: &'static str,
    pub bus_type: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// Bit `n` set when event type `n` is accepted.
    pub event_mask: u32,
    /// Bit `n` set when sound code `n` is accepted.
    pub sound_mask: u32,
}

impl DeviceIdentity {
    /// Returns `true` when the source advertises the given type/code pair.
    #[must_use]
    pub const fn supports(&self, event_type: u16, code: u16) -> bool {
        event_type < 32
            && code < 32
            && self.event_mask & (1 << event_type) != 0
            && self.sound_mask & (1 << code) != 0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) bus={:#06x} vendor={:#06x} product={:#06x} version={:#06x}",
            self.name, self.phys, self.bus_type, self.vendor, self.product, self.version
        )
    }
}

/// Alert source registered for the visual bell.
pub const VISUAL_BELL_IDENTITY: DeviceIdentity = DeviceIdentity {
    name: "PC Speaker",
    phys: "isa0061/input0",
    bus_type: BUS_ISA,
    vendor: 0x001f,
    product: 0x0001,
    version: 0x0100,
    event_mask: 1 << EV_SND,
    sound_mask: (1 << SND_BELL) | (1 << SND_TONE),
};

/// Kind of audible alert being requested.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertKind {
    Bell,
    Tone,
}

/// Reasons an inbound event is refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventError {
    #[error("unsupported event type {0:#x}")]
    UnsupportedType(u16),
    #[error("unsupported sound code {0:#x}")]
    UnsupportedCode(u16),
    #[error("value {0} outside the audible range")]
    OutOfRange(i32),
}

impl EventError {
    /// Status code reported back to the event source.
    #[must_use]
    pub const fn status(self) -> i32 {
        EINVAL
    }
}

/// How a non-zero value outside the audible range is handled.
///
/// The legacy speaker driver silenced itself and reported success for such
/// values, which is what [`OutOfRangePolicy::TurnOff`] reproduces. The
/// default refuses them instead so a bogus tone never cuts an active blink
/// short; deployments that want the legacy behavior opt in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutOfRangePolicy {
    /// Refuse the event and leave the indicator untouched.
    #[default]
    Reject,
    /// Treat the event like an explicit off request.
    TurnOff,
}

/// Resolved instruction for the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertCommand {
    Blink(BlinkPattern),
    Off,
}

/// Validated alert request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub requested_value: i32,
}

impl AlertEvent {
    /// A tone request; the value is kept as-is.
    pub const fn tone(value: i32) -> Self {
        Self {
            kind: AlertKind::Tone,
            requested_value: value,
        }
    }

    /// A bell request; any non-zero value rings at [`BELL_FREQUENCY_HZ`].
    pub const fn bell(value: i32) -> Self {
        Self {
            kind: AlertKind::Bell,
            requested_value: if value == 0 { 0 } else { BELL_FREQUENCY_HZ },
        }
    }

    /// Validates a raw `(type, code, value)` triple against [`VISUAL_BELL_IDENTITY`].
    pub fn from_raw(event_type: u16, code: u16, value: i32) -> Result<Self, EventError> {
        if event_type != EV_SND {
            return Err(EventError::UnsupportedType(event_type));
        }
        if !VISUAL_BELL_IDENTITY.supports(event_type, code) {
            return Err(EventError::UnsupportedCode(code));
        }

        match code {
            SND_BELL => Ok(Self::bell(value)),
            SND_TONE => Ok(Self::tone(value)),
            other => Err(EventError::UnsupportedCode(other)),
        }
    }

    /// Frequency this event asks for. A non-zero bell always rings at
    /// [`BELL_FREQUENCY_HZ`], however the event was built.
    #[must_use]
    pub const fn frequency(&self) -> i32 {
        match self.kind {
            AlertKind::Bell if self.requested_value != 0 => BELL_FREQUENCY_HZ,
            _ => self.requested_value,
        }
    }

    /// Resolves the event to a blink or off instruction.
    pub fn command(
        &self,
        cadence: &BlinkCadence,
        policy: OutOfRangePolicy,
    ) -> Result<AlertCommand, EventError> {
        let frequency = self.frequency();
        if frequency == 0 {
            return Ok(AlertCommand::Off);
        }

        match cadence.map(frequency) {
            Some(pattern) => Ok(AlertCommand::Blink(pattern)),
            None => match policy {
                OutOfRangePolicy::Reject => Err(EventError::OutOfRange(frequency)),
                OutOfRangePolicy::TurnOff => Ok(AlertCommand::Off),
            },
        }
    }
}
