//! Host stand-ins for the indicator, the monotonic clock and the deadline timer.

use std::ops::Add;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use visbell_core::alert::{AlertDevice, Brightness, DeadlineTimer, DeadlineToken, Indicator};
use visbell_core::telemetry::TelemetryInstant;

/// Alert device as wired up by the emulator.
pub type HostDevice =
    AlertDevice<CriticalSectionRawMutex, ConsoleIndicator, HostDeadlineTimer, HostInstant>;

/// Monotonic host instant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostInstant(Instant);

impl HostInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn into_std(self) -> Instant {
        self.0
    }
}

impl Add<Duration> for HostInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl TelemetryInstant for HostInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("LED feed lock poisoned")]
pub struct FeedPoisoned;

/// Lines describing indicator activity, shared with the deadline thread.
#[derive(Clone, Debug, Default)]
pub struct LedFeed(Arc<Mutex<Vec<String>>>);

impl LedFeed {
    fn push(&self, line: String) -> Result<(), FeedPoisoned> {
        self.0.lock().map_err(|_| FeedPoisoned)?.push(line);
        Ok(())
    }

    /// Takes every line emitted since the last drain.
    pub fn drain(&self) -> Vec<String> {
        self.0
            .lock()
            .map(|mut lines| std::mem::take(&mut *lines))
            .unwrap_or_default()
    }
}

/// Indicator that narrates each instruction to the console.
#[derive(Debug)]
pub struct ConsoleIndicator {
    feed: LedFeed,
}

impl ConsoleIndicator {
    pub fn new(feed: LedFeed) -> Self {
        Self { feed }
    }
}

impl Indicator for ConsoleIndicator {
    type Error = FeedPoisoned;

    fn set_brightness(&mut self, level: Brightness) -> Result<(), Self::Error> {
        let line = if level.is_off() {
            "LED off".to_string()
        } else {
            format!("LED steady brightness={}", level.0)
        };
        self.feed.push(line)
    }

    fn set_blink_pattern(&mut self, on_millis: u32, off_millis: u32) -> Result<(), Self::Error> {
        self.feed
            .push(format!("LED blink on={on_millis}ms off={off_millis}ms"))
    }
}

enum TimerCommand {
    Arm(DeadlineToken, HostInstant),
    Cancel,
}

/// Deadline timer backed by a dedicated thread.
///
/// The thread only holds a weak handle on the device so dropping the bound
/// controller (which owns this timer) shuts the thread down.
#[derive(Debug)]
pub struct HostDeadlineTimer {
    commands: Sender<TimerCommand>,
}

impl HostDeadlineTimer {
    pub fn spawn(device: Weak<HostDevice>) -> std::io::Result<Self> {
        let (commands, inbox) = mpsc::channel();
        thread::Builder::new()
            .name("visbell-deadline".into())
            .spawn(move || {
                let mut pending: Option<(DeadlineToken, HostInstant)> = None;
                loop {
                    let command = match pending {
                        Some((_, deadline)) => {
                            let wait = deadline.into_std().saturating_duration_since(Instant::now());
                            inbox.recv_timeout(wait)
                        }
                        None => inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match command {
                        Ok(TimerCommand::Arm(token, deadline)) => pending = Some((token, deadline)),
                        Ok(TimerCommand::Cancel) => pending = None,
                        Err(RecvTimeoutError::Timeout) => {
                            let Some((token, _)) = pending.take() else {
                                continue;
                            };
                            let Some(device) = device.upgrade() else {
                                break;
                            };
                            // A re-arm lands back in the inbox before the next wait.
                            device.on_deadline(token, HostInstant::now());
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self { commands })
    }
}

impl DeadlineTimer for HostDeadlineTimer {
    type Instant = HostInstant;

    fn arm(&mut self, token: DeadlineToken, deadline: HostInstant) {
        // The thread only exits once the device is gone; nothing left to fire.
        let _ = self.commands.send(TimerCommand::Arm(token, deadline));
    }

    fn cancel(&mut self) {
        let _ = self.commands.send(TimerCommand::Cancel);
    }
}

/// Binds a fresh console indicator and deadline thread to `device`.
pub fn bind(
    device: &Arc<HostDevice>,
    feed: &LedFeed,
    config: visbell_core::alert::AlertConfig,
) -> std::io::Result<()> {
    let timer = HostDeadlineTimer::spawn(Arc::downgrade(device))?;
    device.on_init(ConsoleIndicator::new(feed.clone()), timer, config, HostInstant::now());
    Ok(())
}
