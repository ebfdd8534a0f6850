//! Application supervisor and monitoring
//!
//! Consumes button events, forwards them to the host link, gives local
//! light/sound feedback and prints a periodic status line.

use embassy_time::{Duration, Instant};

use crate::battery::{BatteryLevel, BatteryReading, BATTERY_LEVEL};
use crate::buttons::ButtonEvents;
use crate::config::{ButtonConfig, BATTERY_SAMPLE_INTERVAL_S};
use crate::leds::Leds;
use crate::speaker::{Melody, Speaker};
use crate::transport::Transport;
use crate::types::{Button, ButtonEvent, Color, Error, Led, Pattern};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const EVENT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const STATUS_INTERVAL_S: u64 = 60;

const CLICK_COLOR: Color = Color::rgb(0x40, 0x40, 0x40);
const LONG_PRESS_COLOR: Color = Color::rgb(0x00, 0x00, 0xFF);
const SHIFT_COLOR: Color = Color::rgb(0xFF, 0x60, 0x00);

/// Feedback sound over: turn the press light off again
fn lights_off(_aborted: bool) {
    if Leds::global().stop().is_err() {
        warn!("Supervisor: could not queue LED stop");
    }
}

/// Application supervisor responsible for event handling and monitoring
pub struct AppSupervisor<'a, T> {
    leds: Leds<'a>,
    speaker: Speaker<'a>,
    events: ButtonEvents<'a>,
    battery: &'a BatteryLevel,
    transport: T,
    started: Instant,
    last_status_s: u64,
    events_handled: u32,
}

impl<T: Transport> AppSupervisor<'static, T> {
    /// Supervisor wired to the process-wide queues
    pub fn new(transport: T) -> Self {
        Self::with_handles(
            Leds::global(),
            Speaker::global(),
            ButtonEvents::global(),
            &BATTERY_LEVEL,
            transport,
        )
    }
}

impl<'a, T: Transport> AppSupervisor<'a, T> {
    pub fn with_handles(
        leds: Leds<'a>,
        speaker: Speaker<'a>,
        events: ButtonEvents<'a>,
        battery: &'a BatteryLevel,
        transport: T,
    ) -> Self {
        Self {
            leds,
            speaker,
            events,
            battery,
            transport,
            started: Instant::now(),
            last_status_s: 0,
            events_handled: 0,
        }
    }

    /// Print application startup banner
    pub fn print_startup_banner(&self) {
        let buttons = ButtonConfig::default();

        info!("========================================");
        info!("Clicker v{}", APP_VERSION);
        info!("Six-button handheld presenter");
        info!("========================================");
        info!("Lighting: LP5813, 2 RGB indicators");
        info!("Speaker: piezo, 2-channel PWM");
        info!(
            "Long press: {} ms ({} ms on wake)",
            buttons.long_press.as_millis(),
            buttons.long_press_on_wake.as_millis()
        );
        info!("Battery sampling every {} s", BATTERY_SAMPLE_INTERVAL_S);
        info!("========================================");
    }

    /// Print successful initialization message
    pub fn print_init_success(&self) {
        info!("Clicker initialized successfully");
        info!("Waiting for button presses...");
    }

    /// Run the main supervisor loop
    pub async fn run(&mut self) -> ! {
        info!("Application supervisor started");

        loop {
            if let Some(event) = self.events.get_event(EVENT_POLL_TIMEOUT).await {
                self.handle_event(event).await;
            }
            self.tick(Instant::now());
        }
    }

    /// Forward one event and give feedback for it
    pub async fn handle_event(&mut self, event: ButtonEvent) {
        self.events_handled = self.events_handled.wrapping_add(1);
        info!(
            "Button: {}, long: {}, shift: {}",
            event.button.number(),
            event.is_long_press,
            event.preceding_short_shift_presses
        );

        if self.transport.report_button(event).await.is_err() {
            error!("Supervisor: failed to forward button event");
        }

        if let Err(e) = self.feedback(event) {
            warn!("Supervisor: feedback dropped: {:?}", e);
        }
    }

    fn feedback(&self, event: ButtonEvent) -> Result<(), Error> {
        match (event.button, event.is_long_press) {
            // Shift is a modifier; a short press only arms it
            (Button::Shift, false) => self.leds.play(Led::D2, Pattern::Solid, SHIFT_COLOR, 1, None),
            (_, true) => {
                self.leds.play(Led::D1, Pattern::Flash, LONG_PRESS_COLOR, 2, None)?;
                self.speaker.play(Melody::Success, None)
            }
            (_, false) => {
                self.leds.play(Led::D1, Pattern::Solid, CLICK_COLOR, 1, None)?;
                self.speaker.play(Melody::Click, Some(lights_off))
            }
        }
    }

    /// Status bookkeeping; prints a status line every minute
    pub fn tick(&mut self, now: Instant) {
        let uptime_s = now.saturating_duration_since(self.started).as_secs();
        if uptime_s.saturating_sub(self.last_status_s) >= STATUS_INTERVAL_S {
            self.print_status(uptime_s);
            self.last_status_s = uptime_s;
        }
    }

    fn print_status(&self, uptime_s: u64) {
        let minutes = uptime_s / 60;
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;

        if hours > 0 {
            info!("Status: Uptime {}h{}m", hours, remaining_minutes);
        } else {
            info!("Status: Uptime {}m", minutes);
        }

        match self.battery.reading() {
            BatteryReading::Millivolts(mv) => info!("Status: battery {} mV", mv),
            BatteryReading::NotReady => info!("Status: battery not sampled yet"),
            BatteryReading::Faulted => warn!("Status: battery sampler faulted"),
        }
        info!("Status: {} button events handled", self.events_handled);
    }

    /// Uptime in seconds
    pub fn uptime(&self) -> u64 {
        Instant::now()
            .saturating_duration_since(self.started)
            .as_secs()
    }

    pub fn events_handled(&self) -> u32 {
        self.events_handled
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
