//! Lighting pattern engine
//!
//! [`Leds`] is the command side, usable from any task. [`LedSequencer`] owns
//! the LP5813 and runs on its own task: it waits for a command or for the
//! finish deadline of the running pattern, whichever comes first.

pub mod lp5813;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::channels::{LedChannel, LED_COMMANDS};
use crate::deadline::Deadline;
use crate::types::{Color, Error, FinishedCallback, Led, Pattern, Repeat};

pub use lp5813::Lp5813;

/// One request for the lighting sequencer
#[derive(Debug, Clone, Copy)]
pub struct LedCommand {
    pub led: Led,
    pub pattern: Pattern,
    pub color: Color,
    pub repeat: Repeat,
    pub callback: Option<FinishedCallback>,
}

impl LedCommand {
    pub const fn stop() -> Self {
        Self {
            led: Led::D1,
            pattern: Pattern::Solid,
            color: Color::OFF,
            repeat: Repeat::Stop,
            callback: None,
        }
    }
}

/// Command handle for the lighting sequencer
#[derive(Clone, Copy)]
pub struct Leds<'a> {
    commands: &'a LedChannel,
}

impl Leds<'static> {
    /// Handle bound to the process-wide lighting queue
    pub fn global() -> Self {
        Self::new(&LED_COMMANDS)
    }
}

impl<'a> Leds<'a> {
    pub fn new(commands: &'a LedChannel) -> Self {
        Self { commands }
    }

    /// Play `pattern` on `led`.
    ///
    /// `reps` is `-1` for infinite, `0` to stop, or `1..=15`. Anything else
    /// is rejected and nothing is queued. `callback` runs exactly once for an
    /// accepted command.
    pub fn play(
        &self,
        led: Led,
        pattern: Pattern,
        color: Color,
        reps: i32,
        callback: Option<FinishedCallback>,
    ) -> Result<(), Error> {
        let repeat = Repeat::try_from(reps).map_err(|e| {
            warn!("LEDs: rejected repeat count {}", reps);
            e
        })?;

        self.commands
            .send(LedCommand {
                led,
                pattern,
                color,
                repeat,
                callback,
            })
            .map_err(|e| {
                error!("LEDs: command queue full");
                e
            })
    }

    /// Stop the current pattern and power the driver down
    pub fn stop(&self) -> Result<(), Error> {
        self.commands.send(LedCommand::stop())
    }
}

struct Active {
    finish: Deadline,
    callback: Option<FinishedCallback>,
}

/// Owner of the lighting driver; at most one pattern is active.
pub struct LedSequencer<'a, I2C, EN, D> {
    driver: Lp5813<I2C, EN, D>,
    commands: &'a LedChannel,
    active: Option<Active>,
}

impl<'a, I2C, EN, D> LedSequencer<'a, I2C, EN, D>
where
    I2C: I2c,
    EN: OutputPin,
    D: DelayNs,
{
    pub fn new(driver: Lp5813<I2C, EN, D>, commands: &'a LedChannel) -> Self {
        Self {
            driver,
            commands,
            active: None,
        }
    }

    /// When the running pattern ends on its own
    pub fn deadline(&self) -> Deadline {
        self.active
            .as_ref()
            .map_or(Deadline::Never, |active| active.finish)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn driver(&self) -> &Lp5813<I2C, EN, D> {
        &self.driver
    }

    pub async fn run(&mut self) -> ! {
        info!("LEDs: sequencer running; waiting for commands");
        loop {
            let command = self.commands.receive_until(self.deadline()).await;
            self.process(command, Instant::now()).await;
        }
    }

    /// One wake of the sequencer: settle the running pattern, then apply
    /// `command` if one arrived.
    pub async fn process(&mut self, command: Option<LedCommand>, now: Instant) {
        if let Some(active) = self.active.take() {
            if active.finish.expired(now) {
                debug!("LEDs: pattern finished");
                self.driver.power_down();
                resolve(active.callback, false);
            } else if command.is_some() {
                debug!("LEDs: pattern superseded");
                // Powering down follows regardless of the outcome
                if let Err(e) = self.driver.send_command(lp5813::Command::Stop).await {
                    debug!("LEDs: stop command failed ({:?}); powering down anyway", e);
                }
                self.driver.power_down();
                resolve(active.callback, true);
            } else {
                self.active = Some(active);
                return;
            }
        }

        let Some(command) = command else {
            return;
        };

        if command.repeat == Repeat::Stop {
            if self.driver.is_powered() {
                self.driver.power_down();
            }
            info!("LEDs: stopped");
            resolve(command.callback, false);
            return;
        }

        match self.start(&command).await {
            Ok(()) => {
                let finish = lp5813::play_time_ms(command.pattern, command.repeat)
                    .map_or(Deadline::Never, |ms| {
                        Deadline::after(now, Duration::from_millis(ms))
                    });
                info!(
                    "LEDs: playing {:?} on {:?} ({:?})",
                    command.pattern,
                    command.led,
                    command.repeat
                );
                self.active = Some(Active {
                    finish,
                    callback: command.callback,
                });
            }
            Err(e) => {
                error!("LEDs: failed to start the animation: {:?}", e);
                self.driver.power_down();
                resolve(command.callback, true);
            }
        }
    }

    async fn start(&mut self, command: &LedCommand) -> Result<(), Error> {
        self.driver.power_up().await?;
        self.driver
            .start_animation(command.led, command.pattern, command.color, command.repeat)
            .await
    }
}

fn resolve(callback: Option<FinishedCallback>, aborted: bool) {
    if let Some(callback) = callback {
        callback(aborted);
    }
}
