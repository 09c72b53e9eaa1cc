#![allow(dead_code)]

use core::ops::Add;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec as HeaplessVec;
use visbell_core::alert::{AlertDevice, Brightness, DeadlineTimer, DeadlineToken, Indicator};
use visbell_core::telemetry::TelemetryInstant;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(u64);

impl MockInstant {
    pub const fn millis(value: u64) -> Self {
        Self(value * 1_000)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_micros()).expect("duration fits in u64"))
    }
}

impl TelemetryInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedCall {
    Level(Brightness),
    Blink { on_millis: u32, off_millis: u32 },
}

impl LedCall {
    pub const OFF: Self = LedCall::Level(Brightness::OFF);

    pub const fn blink(on_millis: u32, off_millis: u32) -> Self {
        LedCall::Blink {
            on_millis,
            off_millis,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingIndicator {
    pub calls: HeaplessVec<LedCall, 64>,
}

impl RecordingIndicator {
    pub fn last(&self) -> Option<LedCall> {
        self.calls.last().copied()
    }

    pub fn is_blinking(&self) -> bool {
        matches!(self.last(), Some(LedCall::Blink { .. }))
    }
}

impl Indicator for RecordingIndicator {
    type Error = ();

    fn set_brightness(&mut self, level: Brightness) -> Result<(), Self::Error> {
        if self.calls.is_full() {
            self.calls.remove(0);
        }
        self.calls.push(LedCall::Level(level)).map_err(|_| ())
    }

    fn set_blink_pattern(&mut self, on_millis: u32, off_millis: u32) -> Result<(), Self::Error> {
        if self.calls.is_full() {
            self.calls.remove(0);
        }
        self.calls
            .push(LedCall::blink(on_millis, off_millis))
            .map_err(|_| ())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingTimer {
    pub pending: Option<(DeadlineToken, MockInstant)>,
    pub arms: usize,
    pub cancels: usize,
}

impl DeadlineTimer for RecordingTimer {
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

pub type Device = AlertDevice<CriticalSectionRawMutex, RecordingIndicator, RecordingTimer, MockInstant>;

pub fn bound_device() -> Device {
    let device = Device::new();
    device.on_init(
        RecordingIndicator::default(),
        RecordingTimer::default(),
        visbell_core::alert::AlertConfig::DEFAULT,
        MockInstant::millis(0),
    );
    device
}

pub fn indicator(device: &Device) -> RecordingIndicator {
    device
        .inspect(|controller| controller.indicator().clone())
        .expect("device bound")
}

pub fn timer(device: &Device) -> RecordingTimer {
    device
        .inspect(|controller| controller.timer().clone())
        .expect("device bound")
}
