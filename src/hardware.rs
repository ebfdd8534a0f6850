//! Hardware abstraction and initialization
//!
//! Board wiring for the RP2040 build: pin assignments, the peripheral
//! adapters behind the crate's input/output traits, and one embassy task per
//! sequencer.
//!
//! | Function          | Pins                         |
//! |-------------------|------------------------------|
//! | LP5813 I2C0       | SDA GP4, SCL GP5             |
//! | LP5813 EN         | GP6                          |
//! | Buttons 1-5       | GP10..GP14 (active low)      |
//! | Shift             | GP15 (active low)            |
//! | Piezo             | GP18 / GP19 (PWM slice 1)    |
//! | Battery sense     | GP26 / ADC0, 1:2 divider     |

use core::convert::Infallible;

use embassy_executor::{SpawnError, Spawner};
use embassy_futures::select::select_array;
use embassy_rp::adc::{self, Adc};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::{bind_interrupts, Peripherals};
use embassy_time::Delay;
use fixed::FixedU16;

use crate::battery::{BatterySampler, VoltageSensor, BATTERY_LEVEL};
use crate::buttons::{ButtonInputs, ButtonSequencer};
use crate::channels::{BUTTON_EVENTS, LED_COMMANDS, SPEAKER_COMMANDS};
use crate::config::{BatteryConfig, ButtonConfig, BATTERY_REPORT_INTERVAL_S};
use crate::leds::{LedSequencer, Lp5813};
use crate::speaker::{SpeakerSequencer, ToneOutput};
use crate::transport::{battery_report_loop, LogTransport};
use crate::types::{Button, Error, BUTTON_COUNT};

bind_interrupts!(pub struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

const ADC_REFERENCE_MV: i32 = 3300;
const ADC_FULL_SCALE: i32 = 4096;
const BATTERY_DIVIDER: i32 = 2;

const SPEAKER_PWM_DIVIDER: u8 = 8;

// ===================================================================
// Peripheral Adapters
// ===================================================================

/// The six buttons on dedicated pull-up inputs
pub struct BoardButtons {
    pins: [Input<'static>; BUTTON_COUNT],
}

impl BoardButtons {
    pub fn new(pins: [Input<'static>; BUTTON_COUNT]) -> Self {
        Self { pins }
    }
}

impl ButtonInputs for BoardButtons {
    type Error = Infallible;

    fn is_pressed(&mut self, button: Button) -> Result<bool, Self::Error> {
        Ok(self.pins[button.index()].is_low())
    }

    async fn wait_for_change(&mut self, tracked: Option<Button>) {
        match tracked {
            Some(button) => self.pins[button.index()].wait_for_high().await,
            None => {
                select_array(self.pins.each_mut().map(|pin| pin.wait_for_low())).await;
            }
        }
    }
}

/// Piezo on both outputs of one PWM slice, B inverted for double swing
pub struct BoardSpeaker {
    pwm: Pwm<'static>,
}

impl BoardSpeaker {
    pub fn new(pwm: Pwm<'static>) -> Self {
        Self { pwm }
    }
}

impl ToneOutput for BoardSpeaker {
    type Error = Error;

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Self::Error> {
        let mut config = pwm::Config::default();

        if frequency_hz == 0 {
            config.enable = false;
            self.pwm.set_config(&config);
            return Ok(());
        }

        let counter_hz = embassy_rp::clocks::clk_sys_freq() / SPEAKER_PWM_DIVIDER as u32;
        let top = (counter_hz / frequency_hz)
            .checked_sub(1)
            .and_then(|top| u16::try_from(top).ok())
            .ok_or(Error::InvalidParameter)?;

        config.divider = FixedU16::from_num(SPEAKER_PWM_DIVIDER);
        config.top = top;
        config.compare_a = top / 2;
        config.compare_b = top / 2;
        config.invert_b = true;
        config.enable = true;
        self.pwm.set_config(&config);
        Ok(())
    }
}

/// Cell voltage through a resistive divider on ADC0
pub struct BoardBatterySense {
    adc: Adc<'static, adc::Async>,
    channel: adc::Channel<'static>,
}

impl VoltageSensor for BoardBatterySense {
    type Error = adc::Error;

    async fn sample_raw(&mut self) -> Result<i32, Self::Error> {
        self.adc.read(&mut self.channel).await.map(i32::from)
    }

    fn raw_to_millivolts(&self, raw: i32) -> Result<i32, Self::Error> {
        Ok(raw * ADC_REFERENCE_MV * BATTERY_DIVIDER / ADC_FULL_SCALE)
    }
}

// ===================================================================
// Task Initialization
// ===================================================================

/// Initialize peripherals and spawn one task per sequencer
pub fn init_hardware_tasks(spawner: &Spawner, p: Peripherals) -> Result<(), SpawnError> {
    info!("Initializing clicker hardware");

    let i2c_bus = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c::Config::default());
    let led_enable = Output::new(p.PIN_6, Level::Low);
    spawner.spawn(led_task(i2c_bus, led_enable))?;

    let speaker_pwm = Pwm::new_output_ab(p.PWM_SLICE1, p.PIN_18, p.PIN_19, pwm::Config::default());
    spawner.spawn(speaker_task(BoardSpeaker::new(speaker_pwm)))?;

    let buttons = BoardButtons::new([
        Input::new(p.PIN_10, Pull::Up),
        Input::new(p.PIN_11, Pull::Up),
        Input::new(p.PIN_12, Pull::Up),
        Input::new(p.PIN_13, Pull::Up),
        Input::new(p.PIN_14, Pull::Up),
        Input::new(p.PIN_15, Pull::Up),
    ]);
    spawner.spawn(button_task(buttons))?;

    let sense = BoardBatterySense {
        adc: Adc::new(p.ADC, Irqs, adc::Config::default()),
        channel: adc::Channel::new_pin(p.PIN_26, Pull::None),
    };
    spawner.spawn(battery_task(sense))?;
    spawner.spawn(battery_report_task())?;

    Ok(())
}

// ===================================================================
// Sequencer Tasks
// ===================================================================

#[embassy_executor::task]
pub async fn led_task(i2c: I2c<'static, I2C0, i2c::Async>, enable: Output<'static>) {
    let driver = match Lp5813::new(i2c, enable, Delay) {
        Ok(driver) => driver,
        Err(e) => {
            error!("LEDs: initialization failed ({:?}); module disabled", e);
            return;
        }
    };
    let mut sequencer = LedSequencer::new(driver, &LED_COMMANDS);
    sequencer.run().await
}

#[embassy_executor::task]
pub async fn speaker_task(output: BoardSpeaker) {
    let mut sequencer = SpeakerSequencer::new(output, &SPEAKER_COMMANDS);
    sequencer.run().await
}

#[embassy_executor::task]
pub async fn button_task(inputs: BoardButtons) {
    let mut sequencer = ButtonSequencer::new(inputs, ButtonConfig::default(), &BUTTON_EVENTS);
    sequencer.run().await
}

#[embassy_executor::task]
pub async fn battery_task(sense: BoardBatterySense) {
    let mut sampler = BatterySampler::new(sense, BatteryConfig::default(), &BATTERY_LEVEL);
    sampler.run().await
}

#[embassy_executor::task]
pub async fn battery_report_task() {
    let mut link = LogTransport;
    battery_report_loop(
        &mut link,
        &BATTERY_LEVEL,
        embassy_time::Duration::from_secs(BATTERY_REPORT_INTERVAL_S),
    )
    .await
}
