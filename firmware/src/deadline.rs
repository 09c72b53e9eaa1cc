//! Deadline timer backed by an Embassy task.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use visbell_core::alert::{DeadlineOutcome, DeadlineTimer, DeadlineToken};

use crate::clock::FirmwareInstant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeadlineCommand {
    Arm(DeadlineToken, FirmwareInstant),
    Cancel,
}

pub type DeadlineSignal = Signal<CriticalSectionRawMutex, DeadlineCommand>;

/// Timer handle passed to the alert state machine.
#[derive(Copy, Clone)]
pub struct SignalDeadlineTimer {
    signal: &'static DeadlineSignal,
}

impl SignalDeadlineTimer {
    pub const fn new(signal: &'static DeadlineSignal) -> Self {
        Self { signal }
    }
}

impl DeadlineTimer for SignalDeadlineTimer {
    type Instant = FirmwareInstant;

    fn arm(&mut self, token: DeadlineToken, deadline: FirmwareInstant) {
        self.signal.signal(DeadlineCommand::Arm(token, deadline));
    }

    fn cancel(&mut self) {
        self.signal.signal(DeadlineCommand::Cancel);
    }
}

/// Waits for armed deadlines and reports each fire through `fire`.
///
/// A re-arm issued from inside `fire` is picked up on the next iteration.
pub async fn run<F>(signal: &DeadlineSignal, mut fire: F) -> !
where
    F: FnMut(DeadlineToken, FirmwareInstant) -> DeadlineOutcome,
{
    let mut pending: Option<(DeadlineToken, FirmwareInstant)> = None;
    loop {
        let command = match pending {
            None => signal.wait().await,
            Some((token, deadline)) => {
                match select(Timer::at(deadline.into_embassy()), signal.wait()).await {
                    Either::First(()) => {
                        pending = None;
                        let outcome = fire(token, FirmwareInstant::now());
                        log_deadline_fired(token, outcome);
                        continue;
                    }
                    Either::Second(command) => command,
                }
            }
        };

        pending = match command {
            DeadlineCommand::Arm(token, deadline) => Some((token, deadline)),
            DeadlineCommand::Cancel => None,
        };
    }
}

#[cfg(target_os = "none")]
fn log_deadline_fired(token: DeadlineToken, outcome: DeadlineOutcome) {
    let label = match outcome {
        DeadlineOutcome::Expired => "expired",
        DeadlineOutcome::Rearmed => "rearmed",
        DeadlineOutcome::Stale => "stale",
    };
    defmt::debug!("deadline: #{} {}", token.value(), label);
}

#[cfg(not(target_os = "none"))]
fn log_deadline_fired(token: DeadlineToken, outcome: DeadlineOutcome) {
    println!("deadline: #{} {:?}", token.value(), outcome);
}
