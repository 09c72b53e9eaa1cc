//! LED indicator driven from a dedicated blink task.
//!
//! The alert state machine only posts the latest instruction into a
//! [`Signal`]; the blink task owns the GPIO and the phase timing, so
//! instructions never block the caller.

use core::convert::Infallible;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use visbell_core::alert::{Brightness, Indicator};

/// Latest instruction for the blink task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum LedCommand {
    Steady(Brightness),
    Blink { on_millis: u32, off_millis: u32 },
}

pub type LedSignal = Signal<CriticalSectionRawMutex, LedCommand>;

/// Indicator handle passed to the alert state machine.
#[derive(Copy, Clone)]
pub struct SignalIndicator {
    signal: &'static LedSignal,
}

impl SignalIndicator {
    pub const fn new(signal: &'static LedSignal) -> Self {
        Self { signal }
    }
}

impl Indicator for SignalIndicator {
    type Error = Infallible;

    fn set_brightness(&mut self, level: Brightness) -> Result<(), Self::Error> {
        self.signal.signal(LedCommand::Steady(level));
        Ok(())
    }

    fn set_blink_pattern(&mut self, on_millis: u32, off_millis: u32) -> Result<(), Self::Error> {
        self.signal.signal(LedCommand::Blink {
            on_millis,
            off_millis,
        });
        Ok(())
    }
}

/// Output able to light the indicator.
pub trait LedPin {
    fn set_lit(&mut self, lit: bool);
}

#[cfg(target_os = "none")]
impl LedPin for embassy_stm32::gpio::Output<'_> {
    fn set_lit(&mut self, lit: bool) {
        if lit {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Applies LED commands forever; a new command interrupts the current phase.
pub async fn drive<P: LedPin>(signal: &LedSignal, pin: &mut P) -> ! {
    let mut command = signal.wait().await;
    loop {
        log_led_command(command);
        command = match command {
            LedCommand::Steady(level) => {
                pin.set_lit(!level.is_off());
                signal.wait().await
            }
            LedCommand::Blink {
                on_millis,
                off_millis,
            } => blink(signal, pin, on_millis, off_millis).await,
        };
    }
}

async fn blink<P: LedPin>(signal: &LedSignal, pin: &mut P, on_millis: u32, off_millis: u32) -> LedCommand {
    let phases = [
        (true, Duration::from_millis(u64::from(on_millis))),
        (false, Duration::from_millis(u64::from(off_millis))),
    ];
    loop {
        for (lit, length) in phases {
            pin.set_lit(lit);
            if let Either::Second(next) = select(Timer::after(length), signal.wait()).await {
                return next;
            }
        }
    }
}

#[cfg(target_os = "none")]
fn log_led_command(command: LedCommand) {
    defmt::debug!("led: {}", command);
}

#[cfg(not(target_os = "none"))]
fn log_led_command(command: LedCommand) {
    println!("led: {command:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    static SIGNAL: LedSignal = Signal::new();

    #[test]
    fn indicator_posts_latest_instruction() {
        let mut indicator = SignalIndicator::new(&SIGNAL);

        indicator.set_blink_pattern(250, 750).expect("infallible");
        indicator.set_brightness(Brightness::OFF).expect("infallible");

        assert_eq!(
            SIGNAL.try_take(),
            Some(LedCommand::Steady(Brightness::OFF)),
            "only the newest instruction should reach the blink task"
        );
        assert_eq!(SIGNAL.try_take(), None);
    }
}
