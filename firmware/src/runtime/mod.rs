use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_sync::signal::Signal;
use static_cell::StaticCell;
use visbell_core::alert::{AlertConfig, AlertDevice};
use visbell_core::event::VISUAL_BELL_IDENTITY;

use crate::clock::FirmwareInstant;
use crate::console::FirmwareDevice;
use crate::deadline::{DeadlineSignal, SignalDeadlineTimer};
use crate::indicator::{LedSignal, SignalIndicator};

mod console_task;
mod deadline_task;
mod led_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type Device = FirmwareDevice<SignalIndicator, SignalDeadlineTimer>;

pub(super) static LED_SIGNAL: LedSignal = Signal::new();
pub(super) static DEADLINE_SIGNAL: DeadlineSignal = Signal::new();
static DEVICE: StaticCell<Device> = StaticCell::new();

pub(super) const ALERT_CONFIG: AlertConfig = AlertConfig::DEFAULT;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA5, USART5, PB0, PB1, ..
    } = hal::init(config);

    defmt::info!(
        "visbell: {} ({}) bus={=u16:#x} vendor={=u16:#x} product={=u16:#x} version={=u16:#x} ready",
        VISUAL_BELL_IDENTITY.name,
        VISUAL_BELL_IDENTITY.phys,
        VISUAL_BELL_IDENTITY.bus_type,
        VISUAL_BELL_IDENTITY.vendor,
        VISUAL_BELL_IDENTITY.product,
        VISUAL_BELL_IDENTITY.version
    );

    let device: &'static Device = DEVICE.init(AlertDevice::new());
    device.on_init(
        SignalIndicator::new(&LED_SIGNAL),
        SignalDeadlineTimer::new(&DEADLINE_SIGNAL),
        ALERT_CONFIG,
        FirmwareInstant::now(),
    );

    let led = Output::new(PA5, Level::Low, Speed::Low);

    spawner
        .spawn(led_task::run(led))
        .expect("failed to spawn LED task");

    spawner
        .spawn(deadline_task::run(device))
        .expect("failed to spawn deadline task");

    spawner
        .spawn(console_task::run(device, USART5, PB0, PB1))
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
