//! Hardware and timing configuration for the clicker
//! Coin-cell handheld with six buttons, one LP5813 lighting driver and a piezo

use embassy_time::Duration;

// ===================================================================
// Button Gesture Timing
// ===================================================================

pub const LONG_PRESS_THRESHOLD_MS: u64 = 2000; // Hold time for a long press
pub const LONG_PRESS_THRESHOLD_ON_WAKE_MS: u64 = 1500; // Wake press started before boot finished

// ===================================================================
// Queue Depths
// ===================================================================

pub const LED_COMMAND_QUEUE_DEPTH: usize = 4;
pub const SPEAKER_COMMAND_QUEUE_DEPTH: usize = 4;
pub const BUTTON_EVENT_QUEUE_DEPTH: usize = 8;

// ===================================================================
// LP5813 Lighting Driver
// ===================================================================

pub const LP5813_I2C_ADDR: u8 = 0x16; // Base address; the top 2 register bits are OR'ed in
pub const LP5813_BOOST_SETTLE_MS: u32 = 1; // Boost converter start-up (datasheet)
pub const MAX_LED_CURRENT_FRACTION: u8 = 0x2F; // Fraction (0..255) of the global max current
pub const PATTERN_UNIT_MS: u64 = 540; // On/off or fade time of Flash and Breathe

// ===================================================================
// Speaker
// ===================================================================

pub const SPEAKER_RESONANT_FREQUENCY_HZ: u32 = 4100; // Piezo resonance (datasheet)

// ===================================================================
// Battery Sense
// ===================================================================

pub const BATTERY_SAMPLE_INTERVAL_S: u64 = 30;
pub const BATTERY_OVERSAMPLING: u8 = 8; // Raw conversions averaged per sample
pub const BATTERY_HISTORY_LEN: usize = 8; // Samples in the running average
pub const BATTERY_REPORT_INTERVAL_S: u64 = 30; // Transport battery level refresh

// ===================================================================
// Runtime Configuration
// ===================================================================

/// Gesture thresholds used by the button sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonConfig {
    pub long_press: Duration,
    /// Used when the engine starts with a button already held
    pub long_press_on_wake: Duration,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(LONG_PRESS_THRESHOLD_MS),
            long_press_on_wake: Duration::from_millis(LONG_PRESS_THRESHOLD_ON_WAKE_MS),
        }
    }
}

/// Sampling cadence of the battery sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryConfig {
    pub interval: Duration,
    pub oversampling: u8,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(BATTERY_SAMPLE_INTERVAL_S),
            oversampling: BATTERY_OVERSAMPLING,
        }
    }
}
