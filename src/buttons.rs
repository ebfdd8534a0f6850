//! Button gesture engine
//!
//! Classifies presses of the six buttons as short or long and counts short
//! `Shift` presses in front of the next event. Pin levels are re-read on every
//! wake; a change notification only means "look again".

use embassy_futures::select::select;
use embassy_time::{Duration, Instant, Timer};

use crate::channels::{ButtonEventChannel, BUTTON_EVENTS};
use crate::config::ButtonConfig;
use crate::deadline::Deadline;
use crate::types::{Button, ButtonEvent};

// ===================================================================
// Input Abstraction
// ===================================================================

/// Physical button levels plus a change notification.
#[allow(async_fn_in_trait)]
pub trait ButtonInputs {
    type Error;

    fn is_pressed(&mut self, button: Button) -> Result<bool, Self::Error>;

    /// Resolve once there may be something new to see: with `tracked` set,
    /// when that button is released; otherwise when any button is pressed.
    /// Spurious returns are allowed.
    async fn wait_for_change(&mut self, tracked: Option<Button>);

    /// Button that woke the device, even if it has been released since.
    ///
    /// Boards without a wake latch report whichever button is held now.
    fn pressed_at_wake(&mut self) -> Option<Button> {
        Button::ALL
            .into_iter()
            .find(|&button| self.is_pressed(button).unwrap_or(false))
    }
}

// ===================================================================
// Gesture State Machine
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    /// `button` went down; it becomes a long press at `deadline`
    Tracking { button: Button, deadline: Deadline },
    /// Long press already reported, waiting for the button to come up
    AwaitingRelease(Button),
}

pub struct GestureTracker {
    config: ButtonConfig,
    state: State,
    shift_presses: u32,
}

impl GestureTracker {
    pub fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            shift_presses: 0,
        }
    }

    /// Track the button that woke the device with the shorter wake
    /// threshold. A wake tap already released is reported as short on the
    /// next poll.
    pub fn start<I: ButtonInputs>(&mut self, inputs: &mut I, now: Instant) {
        match inputs.pressed_at_wake() {
            Some(button) => {
                info!("Buttons: button {} pressed at start-up", button.number());
                self.track(button, now, self.config.long_press_on_wake);
            }
            None => info!("Buttons: no button pressed at start-up"),
        }
    }

    /// When the tracked press turns into a long press
    pub fn deadline(&self) -> Deadline {
        match self.state {
            State::Tracking { deadline, .. } => deadline,
            _ => Deadline::Never,
        }
    }

    /// Button currently held, if any
    pub fn tracked(&self) -> Option<Button> {
        match self.state {
            State::Idle => None,
            State::Tracking { button, .. } | State::AwaitingRelease(button) => Some(button),
        }
    }

    pub fn pending_shift_presses(&self) -> u32 {
        self.shift_presses
    }

    /// Re-evaluate pin levels at `now`; returns the event completed by this
    /// poll, if any.
    pub fn poll<I: ButtonInputs>(&mut self, inputs: &mut I, now: Instant) -> Option<ButtonEvent> {
        if let State::AwaitingRelease(button) = self.state {
            if read(inputs, button) {
                return None;
            }
            debug!("Buttons: button {} released after long press", button.number());
            self.state = State::Idle;
        }

        match self.state {
            State::Idle => {
                if let Some(button) = first_pressed(inputs) {
                    self.track(button, now, self.config.long_press);
                }
                None
            }
            State::Tracking { button, deadline } => {
                // Release exactly on the threshold counts as long
                if deadline.expired(now) {
                    self.state = State::AwaitingRelease(button);
                    Some(self.emit(button, true))
                } else if !read(inputs, button) {
                    self.state = State::Idle;
                    Some(self.emit(button, false))
                } else {
                    None
                }
            }
            State::AwaitingRelease(_) => None,
        }
    }

    fn track(&mut self, button: Button, now: Instant, threshold: Duration) {
        debug!("Buttons: tracking button {}", button.number());
        self.state = State::Tracking {
            button,
            deadline: Deadline::after(now, threshold),
        };
    }

    fn emit(&mut self, button: Button, is_long_press: bool) -> ButtonEvent {
        let event = ButtonEvent {
            button,
            is_long_press,
            preceding_short_shift_presses: self.shift_presses,
        };

        if button == Button::Shift && !is_long_press {
            self.shift_presses = self.shift_presses.saturating_add(1);
        } else {
            self.shift_presses = 0;
        }

        info!(
            "Buttons: button {} {} press (shift x{})",
            button.number(),
            if is_long_press { "long" } else { "short" },
            event.preceding_short_shift_presses
        );
        event
    }
}

fn read<I: ButtonInputs>(inputs: &mut I, button: Button) -> bool {
    match inputs.is_pressed(button) {
        Ok(pressed) => pressed,
        Err(_) => {
            warn!("Buttons: failed to read button {}; treating as released", button.number());
            false
        }
    }
}

fn first_pressed<I: ButtonInputs>(inputs: &mut I) -> Option<Button> {
    Button::ALL.into_iter().find(|&button| read(inputs, button))
}

// ===================================================================
// Button Sequencer
// ===================================================================

/// Owner of the button inputs; pushes classified events outward.
pub struct ButtonSequencer<'a, I> {
    inputs: I,
    tracker: GestureTracker,
    events: &'a ButtonEventChannel,
}

impl<'a, I: ButtonInputs> ButtonSequencer<'a, I> {
    pub fn new(inputs: I, config: ButtonConfig, events: &'a ButtonEventChannel) -> Self {
        Self {
            inputs,
            tracker: GestureTracker::new(config),
            events,
        }
    }

    pub fn tracker(&self) -> &GestureTracker {
        &self.tracker
    }

    pub async fn run(&mut self) -> ! {
        self.tracker.start(&mut self.inputs, Instant::now());
        info!("Buttons: sequencer running");

        loop {
            let tracked = self.tracker.tracked();
            match self.tracker.deadline() {
                Deadline::Never => self.inputs.wait_for_change(tracked).await,
                Deadline::At(at) => {
                    select(self.inputs.wait_for_change(tracked), Timer::at(at)).await;
                }
            }
            self.step(Instant::now());
        }
    }

    /// Poll once and publish the resulting event
    pub fn step(&mut self, now: Instant) {
        if let Some(event) = self.tracker.poll(&mut self.inputs, now) {
            if self.events.send(event).is_err() {
                warn!("Buttons: event queue full; dropping button {}", event.button.number());
            }
        }
    }
}

// ===================================================================
// Event Reader
// ===================================================================

/// Reader side of the button event queue
#[derive(Clone, Copy)]
pub struct ButtonEvents<'a> {
    events: &'a ButtonEventChannel,
}

impl ButtonEvents<'static> {
    pub fn global() -> Self {
        Self::new(&BUTTON_EVENTS)
    }
}

impl<'a> ButtonEvents<'a> {
    pub fn new(events: &'a ButtonEventChannel) -> Self {
        Self { events }
    }

    /// Next event in press order, or `None` if nothing arrives within `timeout`
    pub async fn get_event(&self, timeout: Duration) -> Option<ButtonEvent> {
        self.events.receive_timeout(timeout).await
    }

    /// Wait for the next event without bound
    pub async fn wait_event(&self) -> ButtonEvent {
        loop {
            if let Some(event) = self.events.receive_until(Deadline::Never).await {
                return event;
            }
        }
    }

    pub fn try_event(&self) -> Option<ButtonEvent> {
        self.events.try_receive()
    }
}
