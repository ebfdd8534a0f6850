//! Speaker melody engine
//!
//! A melody is a list of (frequency, duration) steps. The sequencer switches
//! the tone output at each step boundary; nothing else touches the output.

pub mod melodies;

use embassy_time::{Duration, Instant};

use crate::channels::{SpeakerChannel, SPEAKER_COMMANDS};
use crate::deadline::Deadline;
use crate::types::{Error, FinishedCallback};

pub use melodies::{Melody, MelodyNote};

/// Square-wave output driving the piezo.
///
/// Implementations run at 50% duty on two phase-inverted channels.
pub trait ToneOutput {
    type Error;

    /// Switch to `frequency_hz`; 0 silences the output
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Self::Error>;
}

impl<T: ToneOutput> ToneOutput for &mut T {
    type Error = T::Error;

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Self::Error> {
        T::set_frequency(self, frequency_hz)
    }
}

/// One request for the speaker sequencer; no melody means stop.
#[derive(Debug, Clone, Copy)]
pub struct SpeakerCommand {
    pub melody: Option<&'static [MelodyNote]>,
    pub callback: Option<FinishedCallback>,
}

/// Command handle for the speaker sequencer
#[derive(Clone, Copy)]
pub struct Speaker<'a> {
    commands: &'a SpeakerChannel,
}

impl Speaker<'static> {
    /// Handle bound to the process-wide speaker queue
    pub fn global() -> Self {
        Self::new(&SPEAKER_COMMANDS)
    }
}

impl<'a> Speaker<'a> {
    pub fn new(commands: &'a SpeakerChannel) -> Self {
        Self { commands }
    }

    pub fn play(&self, melody: Melody, callback: Option<FinishedCallback>) -> Result<(), Error> {
        self.play_notes(melody.notes(), callback)
    }

    /// Play an arbitrary note list. It ends at [`MelodyNote::END`] or at the
    /// end of the slice, whichever comes first.
    pub fn play_notes(
        &self,
        notes: &'static [MelodyNote],
        callback: Option<FinishedCallback>,
    ) -> Result<(), Error> {
        self.send(SpeakerCommand {
            melody: Some(notes),
            callback,
        })
    }

    /// Silence the speaker, aborting any melody
    pub fn stop(&self) -> Result<(), Error> {
        self.send(SpeakerCommand {
            melody: None,
            callback: None,
        })
    }

    fn send(&self, command: SpeakerCommand) -> Result<(), Error> {
        self.commands.send(command).map_err(|e| {
            error!("Speaker: command queue full");
            e
        })
    }
}

struct Playing {
    /// Notes not yet started
    remaining: &'static [MelodyNote],
    callback: Option<FinishedCallback>,
}

/// Owner of the tone output; plays at most one melody at a time.
pub struct SpeakerSequencer<'a, T> {
    output: T,
    commands: &'a SpeakerChannel,
    playing: Option<Playing>,
    next_note: Deadline,
}

impl<'a, T: ToneOutput> SpeakerSequencer<'a, T> {
    pub fn new(output: T, commands: &'a SpeakerChannel) -> Self {
        Self {
            output,
            commands,
            playing: None,
            next_note: Deadline::Never,
        }
    }

    pub fn deadline(&self) -> Deadline {
        self.next_note
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    pub fn output(&self) -> &T {
        &self.output
    }

    pub async fn run(&mut self) -> ! {
        info!("Speaker: sequencer running; waiting for commands");
        loop {
            let command = self.commands.receive_until(self.next_note).await;
            self.process(command, Instant::now());
        }
    }

    /// One wake of the sequencer: advance a due note, then apply `command`.
    pub fn process(&mut self, command: Option<SpeakerCommand>, now: Instant) {
        if self.next_note.expired(now) {
            self.advance(now);
        }

        let Some(command) = command else {
            return;
        };

        if let Some(playing) = self.playing.take() {
            debug!("Speaker: melody superseded");
            self.silence();
            self.next_note = Deadline::Never;
            resolve(playing.callback, true);
        }

        match command.melody {
            Some(notes) => {
                info!("Speaker: playing {} notes", notes.len());
                self.playing = Some(Playing {
                    remaining: notes,
                    callback: command.callback,
                });
                self.advance(now);
            }
            None => {
                self.silence();
                resolve(command.callback, false);
            }
        }
    }

    /// Start the next note, or finish the melody at its terminator.
    fn advance(&mut self, now: Instant) {
        let Some(playing) = self.playing.as_mut() else {
            self.next_note = Deadline::Never;
            return;
        };

        let remaining: &'static [MelodyNote] = playing.remaining;
        match remaining.split_first() {
            Some((note, rest)) if !note.is_end() => {
                playing.remaining = rest;
                let frequency = note.frequency_hz as u32;
                let length = Duration::from_millis(note.duration_ms as u64);

                if self.output.set_frequency(frequency).is_err() {
                    error!("Speaker: failed to set frequency {} Hz", frequency);
                    self.finish(true);
                    return;
                }
                debug!("Speaker: note {} Hz for {} ms", frequency, note.duration_ms);
                self.next_note = Deadline::after(now, length);
            }
            _ => {
                debug!("Speaker: melody finished");
                self.finish(false);
            }
        }
    }

    fn finish(&mut self, aborted: bool) {
        self.silence();
        self.next_note = Deadline::Never;
        if let Some(playing) = self.playing.take() {
            resolve(playing.callback, aborted);
        }
    }

    fn silence(&mut self) {
        if self.output.set_frequency(0).is_err() {
            error!("Speaker: failed to silence output");
        }
    }
}

fn resolve(callback: Option<FinishedCallback>, aborted: bool) {
    if let Some(callback) = callback {
        callback(aborted);
    }
}
