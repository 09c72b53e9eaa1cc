use embassy_stm32::gpio::Output;

use super::LED_SIGNAL;
use crate::indicator;

#[embassy_executor::task]
pub async fn run(mut led: Output<'static>) -> ! {
    indicator::drive(&LED_SIGNAL, &mut led).await
}
