//! Battery averaging sampler
//!
//! Samples the cell voltage at a fixed interval, keeps a running mean over
//! the last [`BATTERY_HISTORY_LEN`] samples and publishes it through a
//! [`BatteryLevel`]. A sampling failure disables the sampler for good.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch::Watch;
use embassy_time::Timer;
use heapless::HistoryBuffer;

use crate::config::{BatteryConfig, BATTERY_HISTORY_LEN};

/// Raw conversion plus calibration of the voltage sense channel.
#[allow(async_fn_in_trait)]
pub trait VoltageSensor {
    type Error;

    async fn sample_raw(&mut self) -> Result<i32, Self::Error>;

    fn raw_to_millivolts(&self, raw: i32) -> Result<i32, Self::Error>;
}

/// What readers of the battery level see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryReading {
    /// No sample completed yet
    NotReady,
    /// Sampling failed; no further samples will arrive
    Faulted,
    Millivolts(i32),
}

/// Concurrent `voltage_mv` waiters
const LEVEL_READERS: usize = 2;

/// Single-writer, many-reader latest battery voltage
pub struct BatteryLevel {
    latest: Watch<CriticalSectionRawMutex, BatteryReading, LEVEL_READERS>,
}

impl BatteryLevel {
    pub const fn new() -> Self {
        Self {
            latest: Watch::new(),
        }
    }

    pub fn publish(&self, millivolts: i32) {
        self.latest.sender().send(BatteryReading::Millivolts(millivolts));
    }

    pub fn publish_fault(&self) {
        self.latest.sender().send(BatteryReading::Faulted);
    }

    /// Non-blocking read of the latest value
    pub fn reading(&self) -> BatteryReading {
        self.latest.try_get().unwrap_or(BatteryReading::NotReady)
    }

    /// Latest voltage; waits only until the first sample exists.
    ///
    /// `None` once the sampler has faulted.
    pub async fn voltage_mv(&self) -> Option<i32> {
        let reading = match self.latest.receiver() {
            Some(mut receiver) => receiver.get().await,
            None => {
                warn!("Battery: all level readers busy; not waiting");
                self.reading()
            }
        };

        match reading {
            BatteryReading::Millivolts(mv) => Some(mv),
            BatteryReading::NotReady | BatteryReading::Faulted => None,
        }
    }
}

impl Default for BatteryLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide battery level written by the board's sampler task
pub static BATTERY_LEVEL: BatteryLevel = BatteryLevel::new();

/// Coarse remaining capacity of the coin cell.
///
/// Steps at 3000 / 2900 / 2800 mV; between 2500 and 2800 mV the value
/// falls linearly from 5 to 0 (rounded down).
pub fn soc_percent(millivolts: i32) -> u8 {
    match millivolts {
        mv if mv >= 3000 => 100,
        mv if mv >= 2900 => 50,
        mv if mv >= 2800 => 5,
        mv if mv >= 2500 => ((mv - 2500) * 5 / 300) as u8,
        _ => 0,
    }
}

pub struct BatterySampler<'a, S> {
    sensor: S,
    config: BatteryConfig,
    history: HistoryBuffer<i32, BATTERY_HISTORY_LEN>,
    level: &'a BatteryLevel,
}

impl<'a, S: VoltageSensor> BatterySampler<'a, S> {
    pub fn new(sensor: S, config: BatteryConfig, level: &'a BatteryLevel) -> Self {
        Self {
            sensor,
            config,
            history: HistoryBuffer::new(),
            level,
        }
    }

    /// Take one oversampled reading, fold it into the mean and publish it.
    pub async fn sample(&mut self) -> Result<i32, S::Error> {
        let count = self.config.oversampling.max(1) as i64;
        let mut sum = 0i64;
        for _ in 0..count {
            sum += self.sensor.sample_raw().await? as i64;
        }
        let millivolts = self.sensor.raw_to_millivolts((sum / count) as i32)?;

        self.history.write(millivolts);
        let mean = mean(self.history.as_slice());
        self.level.publish(mean);

        debug!("Battery: sample {} mV, mean {} mV", millivolts, mean);
        Ok(mean)
    }

    /// Sample until the first failure, then publish the fault and return.
    pub async fn run(&mut self) {
        info!("Battery: sampler running");
        loop {
            if self.sample().await.is_err() {
                error!("Battery: sampling failed; sampler disabled");
                self.level.publish_fault();
                return;
            }
            Timer::after(self.config.interval).await;
        }
    }
}

fn mean(samples: &[i32]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: i64 = samples.iter().map(|&mv| mv as i64).sum();
    (sum / samples.len() as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soc_thresholds() {
        assert_eq!(soc_percent(3100), 100);
        assert_eq!(soc_percent(3000), 100);
        assert_eq!(soc_percent(2950), 50);
        assert_eq!(soc_percent(2850), 5);
        assert_eq!(soc_percent(2800), 5);
        assert_eq!(soc_percent(2400), 0);
    }

    #[test]
    fn soc_between_2500_and_2800_is_linear() {
        assert_eq!(soc_percent(2500), 0);
        assert_eq!(soc_percent(2559), 0);
        assert_eq!(soc_percent(2560), 1);
        assert_eq!(soc_percent(2650), 2);
        assert_eq!(soc_percent(2799), 4);
    }

    #[test]
    fn soc_is_monotonic() {
        let mut last = 0;
        for mv in (2000..3200).step_by(5) {
            let soc = soc_percent(mv);
            assert!(soc >= last, "{} mV gave {} after {}", mv, soc, last);
            last = soc;
        }
    }

    #[test]
    fn level_reports_latest_state() {
        let level = BatteryLevel::new();
        assert_eq!(level.reading(), BatteryReading::NotReady);

        level.publish(2987);
        assert_eq!(level.reading(), BatteryReading::Millivolts(2987));

        level.publish_fault();
        assert_eq!(level.reading(), BatteryReading::Faulted);
        assert_eq!(embassy_futures::block_on(level.voltage_mv()), None);
    }
}
