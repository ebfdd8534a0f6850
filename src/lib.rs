//! Clicker - control layer for a coin-cell handheld clicker
//!
//! Six buttons, two RGB indicators behind an LP5813 driver, a piezo speaker
//! and a battery sense channel, each owned by its own async sequencer.
//!
//! ## Architecture
//! - **Sequencers**: one task per peripheral, woken by a command or by its
//!   own deadline, whichever comes first
//! - **Channels**: bounded queues of value-typed commands and events
//! - **Hardware-agnostic core**: peripherals behind `embedded-hal` traits;
//!   RP2040 wiring lives in [`hardware`] behind the `rp2040` feature

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod battery;
pub mod buttons;
pub mod channels;
pub mod config;
pub mod deadline;
pub mod leds;
pub mod speaker;
pub mod storage;
pub mod supervisor;
pub mod transport;
pub mod types;

#[cfg(feature = "rp2040")]
pub mod hardware;

pub use types::{Button, ButtonEvent, Color, Error, FinishedCallback, Led, Pattern, Repeat};
