//! Outward data path to the host link
//!
//! Button events and the battery percentage are the only data leaving the
//! core. The radio stack behind [`Transport`] lives outside this crate.

use embassy_time::{Duration, Timer};

use crate::battery::{soc_percent, BatteryLevel};
use crate::types::ButtonEvent;

#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error;

    async fn report_battery(&mut self, percent: u8) -> Result<(), Self::Error>;

    async fn report_button(&mut self, event: ButtonEvent) -> Result<(), Self::Error>;
}

/// Stand-in link for boards without a radio: reports are only logged
pub struct LogTransport;

impl Transport for LogTransport {
    type Error = core::convert::Infallible;

    async fn report_battery(&mut self, percent: u8) -> Result<(), Self::Error> {
        info!("Link: battery {}%", percent);
        Ok(())
    }

    async fn report_button(&mut self, event: ButtonEvent) -> Result<(), Self::Error> {
        info!(
            "Link: button {} long={} shift={}",
            event.button.number(),
            event.is_long_press,
            event.preceding_short_shift_presses
        );
        Ok(())
    }
}

/// Push the current state of charge once.
///
/// Returns `false` when the battery sampler has faulted, `true` otherwise
/// (including a failed report, which is only logged).
pub async fn report_battery_level<T: Transport>(transport: &mut T, level: &BatteryLevel) -> bool {
    let Some(mv) = level.voltage_mv().await else {
        return false;
    };

    let percent = soc_percent(mv);
    if transport.report_battery(percent).await.is_err() {
        error!("Link: failed to report battery level");
    }
    info!("Battery voltage: {} mV, SOC: {}%", mv, percent);
    true
}

/// Report the state of charge every `interval` while the sampler is alive
pub async fn battery_report_loop<T: Transport>(transport: &mut T, level: &BatteryLevel, interval: Duration) {
    info!("Link: battery reporting started");
    while report_battery_level(transport, level).await {
        Timer::after(interval).await;
    }
    warn!("Link: battery sampler faulted; reporting stopped");
}
