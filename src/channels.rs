//! Inter-task communication channels
//!
//! [`CommandChannel`] is the only handoff into a sequencer: many producers
//! may `send` without blocking, exactly one worker receives with a deadline.
//! The process-wide instances used by the board wiring are defined here too.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};

use crate::config::{BUTTON_EVENT_QUEUE_DEPTH, LED_COMMAND_QUEUE_DEPTH, SPEAKER_COMMAND_QUEUE_DEPTH};
use crate::deadline::Deadline;
use crate::leds::LedCommand;
use crate::speaker::SpeakerCommand;
use crate::types::{ButtonEvent, Error};

/// Bounded FIFO of value-typed items; no allocation in the hot path.
pub struct CommandChannel<T, const N: usize> {
    inner: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> CommandChannel<T, N> {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
        }
    }

    /// Enqueue without blocking. Safe to call from any task.
    pub fn send(&self, item: T) -> Result<(), Error> {
        self.inner.try_send(item).map_err(|_| Error::QueueFull)
    }

    /// Wait for the next item, giving up once `deadline` is reached.
    pub async fn receive_until(&self, deadline: Deadline) -> Option<T> {
        match deadline {
            Deadline::Never => Some(self.inner.receive().await),
            Deadline::At(at) => match select(self.inner.receive(), Timer::at(at)).await {
                Either::First(item) => Some(item),
                Either::Second(()) => self.inner.try_receive().ok(),
            },
        }
    }

    /// Wait at most `timeout` for the next item.
    pub async fn receive_timeout(&self, timeout: Duration) -> Option<T> {
        self.receive_until(Deadline::after(Instant::now(), timeout))
            .await
    }

    /// Take the next item if one is queued
    pub fn try_receive(&self) -> Option<T> {
        self.inner.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T, const N: usize> Default for CommandChannel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub type LedChannel = CommandChannel<LedCommand, LED_COMMAND_QUEUE_DEPTH>;
pub type SpeakerChannel = CommandChannel<SpeakerCommand, SPEAKER_COMMAND_QUEUE_DEPTH>;
pub type ButtonEventChannel = CommandChannel<ButtonEvent, BUTTON_EVENT_QUEUE_DEPTH>;

/// Commands for the lighting sequencer
/// Buffer size: 4 (a burst of UI feedback requests)
pub static LED_COMMANDS: LedChannel = CommandChannel::new();

/// Commands for the speaker sequencer
/// Buffer size: 4
pub static SPEAKER_COMMANDS: SpeakerChannel = CommandChannel::new();

/// Classified button presses from the button sequencer to the application
/// Buffer size: 8 (events queue up while the application is busy)
pub static BUTTON_EVENTS: ButtonEventChannel = CommandChannel::new();
