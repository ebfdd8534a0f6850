//! Common types and data structures used across the clicker firmware
//!
//! This module contains the value types that cross sequencer boundaries:
//! the crate error, button identities and events, LED selection, patterns and
//! colors, and the completion callback signature.

use core::fmt;

/// Errors reported synchronously by the command APIs and internally by the
/// peripheral drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Peripheral absent or failed to initialize; the owning module is disabled
    DeviceNotReady,
    /// A register access or output channel update failed mid-sequence
    Protocol,
    /// Out-of-range or unknown argument; nothing was queued
    InvalidParameter,
    /// The command queue has no free slot
    QueueFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::DeviceNotReady => "device not ready",
            Error::Protocol => "peripheral protocol error",
            Error::InvalidParameter => "invalid parameter",
            Error::QueueFull => "command queue full",
        };
        f.write_str(msg)
    }
}

/// Called exactly once for every accepted lighting or speaker command.
///
/// `aborted` is `true` when the sequence was superseded or failed, `false`
/// when it ran to its natural end.
pub type FinishedCallback = fn(aborted: bool);

/// Number of physical buttons on the device
pub const BUTTON_COUNT: usize = 6;

/// The six buttons, in board order. `Shift` is the modifier button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Btn1,
    Btn2,
    Btn3,
    Btn4,
    Btn5,
    Shift,
}

impl Button {
    /// All buttons in scan order
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::Btn1,
        Button::Btn2,
        Button::Btn3,
        Button::Btn4,
        Button::Btn5,
        Button::Shift,
    ];

    /// Zero-based index of the button in [`Button::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// One-based label used in log lines, matching the silkscreen
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }
}

impl TryFrom<u8> for Button {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Button::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidParameter)
    }
}

/// A classified press, produced by the button sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    pub button: Button,
    pub is_long_press: bool,
    /// Short presses of `Shift` directly preceding this event
    pub preceding_short_shift_presses: u32,
}

/// RGB indicator selection. Only one indicator animates at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    D1,
    D2,
}

impl TryFrom<u8> for Led {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Led::D1),
            1 => Ok(Led::D2),
            _ => Err(Error::InvalidParameter),
        }
    }
}

/// The three animation kinds the lighting driver is programmed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pattern {
    Solid,
    Flash,
    Breathe,
}

impl TryFrom<u8> for Pattern {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pattern::Solid),
            1 => Ok(Pattern::Flash),
            2 => Ok(Pattern::Breathe),
            _ => Err(Error::InvalidParameter),
        }
    }
}

/// 8-bit per channel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel brightnesses in R, G, B order
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// How many times a pattern plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Repeat {
    /// Stop the current pattern and power the driver down
    Stop,
    /// Play `1..=15` times
    Times(u8),
    /// Play until superseded
    Infinite,
}

impl Repeat {
    pub const MAX_TIMES: u8 = 15;
}

impl TryFrom<i32> for Repeat {
    type Error = Error;

    /// `-1` is infinite, `0` stops, `1..=15` is a finite count.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Repeat::Infinite),
            0 => Ok(Repeat::Stop),
            1..=15 => Ok(Repeat::Times(value as u8)),
            _ => Err(Error::InvalidParameter),
        }
    }
}
