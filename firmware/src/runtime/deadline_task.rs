use super::{DEADLINE_SIGNAL, Device};
use crate::deadline;

#[embassy_executor::task]
pub async fn run(device: &'static Device) -> ! {
    deadline::run(&DEADLINE_SIGNAL, |token, now| device.on_deadline(token, now)).await
}
