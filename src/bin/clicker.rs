//! Clicker - RP2040 board firmware
//!
//! Spawns the LED, speaker, button and battery sequencers, then runs the
//! application supervisor on the same executor.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Executor;
use panic_halt as _;
use defmt_rtt as _;
use static_cell::StaticCell;

use clicker::hardware;
use clicker::supervisor::AppSupervisor;
use clicker::transport::LogTransport;

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let p = embassy_rp::init(Default::default());

    let supervisor = AppSupervisor::new(LogTransport);
    supervisor.print_startup_banner();

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        unwrap!(hardware::init_hardware_tasks(&spawner, p));
        unwrap!(spawner.spawn(main_task(supervisor)));
    })
}

#[embassy_executor::task]
async fn main_task(mut supervisor: AppSupervisor<'static, LogTransport>) {
    supervisor.print_init_success();
    supervisor.run().await
}
