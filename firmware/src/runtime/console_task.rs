use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use heapless::String;

use super::{ALERT_CONFIG, DEADLINE_SIGNAL, Device, LED_SIGNAL};
use crate::clock::FirmwareInstant;
use crate::console::{ConsoleSession, LineBuffer, MAX_LINE_LEN};
use crate::deadline::SignalDeadlineTimer;
use crate::indicator::SignalIndicator;

const CONSOLE_UART_BUFFER_SIZE: usize = MAX_LINE_LEN * 2;
const CONSOLE_UART_BAUD: u32 = 115_200;
const REPLY_CAPACITY: usize = 768;

static mut UART_TX_BUFFER: [u8; REPLY_CAPACITY] = [0; REPLY_CAPACITY];
static mut UART_RX_BUFFER: [u8; CONSOLE_UART_BUFFER_SIZE] = [0; CONSOLE_UART_BUFFER_SIZE];

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    device: &'static Device,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = CONSOLE_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let mut uart = unsafe {
        BufferedUart::new(
            usart,
            rx_pin,
            tx_pin,
            &mut UART_TX_BUFFER,
            &mut UART_RX_BUFFER,
            UartIrqs,
            config,
        )
        .expect("failed to initialize console UART")
    };

    let session = ConsoleSession::new(
        device,
        SignalIndicator::new(&LED_SIGNAL),
        SignalDeadlineTimer::new(&DEADLINE_SIGNAL),
        ALERT_CONFIG,
    );
    let mut lines = LineBuffer::new();
    let mut ingress = [0u8; 16];

    loop {
        let count = match uart.read(&mut ingress).await {
            Ok(count) => count,
            Err(_) => {
                defmt::warn!("console: UART read error");
                Timer::after(Duration::from_millis(5)).await;
                continue;
            }
        };

        for byte in &ingress[..count] {
            let mut reply: String<REPLY_CAPACITY> = String::new();
            match lines.push(*byte) {
                None => continue,
                Some(Ok(line)) => {
                    if session
                        .handle_line(&line, FirmwareInstant::now(), &mut reply)
                        .is_err()
                    {
                        defmt::warn!("console: reply truncated");
                    }
                }
                Some(Err(err)) => {
                    defmt::warn!("console: {}", defmt::Display2Format(&err));
                    let _ = core::fmt::Write::write_fmt(&mut reply, format_args!("ERR {err}\n"));
                }
            }

            if uart.write_all(reply.as_bytes()).await.is_err() || uart.flush().await.is_err() {
                defmt::warn!("console: UART write error");
            }
        }
    }
}
