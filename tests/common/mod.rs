//! Shared test infrastructure for clicker integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use clicker::battery::VoltageSensor;
use clicker::buttons::ButtonInputs;
use clicker::leds::lp5813::Register;
use clicker::speaker::ToneOutput;
use clicker::storage::{ConfigStore, StoreError};
use clicker::types::{Button, BUTTON_COUNT};
use embassy_futures::yield_now;
use embassy_time::Instant;
use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

// ============================================================================
// Callback Recording
// ============================================================================

thread_local! {
    // Each test runs on its own thread and callbacks fire on the calling thread
    static FINISHED: RefCell<Vec<(Instant, bool)>> = const { RefCell::new(Vec::new()) };
}

/// `FinishedCallback` that records its `aborted` argument
pub fn record_finished(aborted: bool) {
    FINISHED.with(|calls| calls.borrow_mut().push((Instant::now(), aborted)));
}

/// Recorded `aborted` arguments, oldest first
pub fn finished_calls() -> Vec<bool> {
    FINISHED.with(|calls| calls.borrow().iter().map(|&(_, aborted)| aborted).collect())
}

/// When each recorded callback ran, oldest first
pub fn finished_times() -> Vec<Instant> {
    FINISHED.with(|calls| calls.borrow().iter().map(|&(at, _)| at).collect())
}

// ============================================================================
// Mock I2C Bus
// ============================================================================

/// Bus traffic as seen by the device
#[derive(Debug, Default)]
pub struct BusLog {
    /// (register, payload) per write, register decoded from the bus address
    pub writes: Vec<(u16, Vec<u8>)>,
    /// Registers read back
    pub reads: Vec<u16>,
    /// Value returned for every read
    pub read_value: u8,
    /// Writes starting at this register fail
    pub fail_write_at: Option<u16>,
}

impl BusLog {
    pub fn registers_written(&self) -> Vec<u16> {
        self.writes.iter().map(|(reg, _)| *reg).collect()
    }

    pub fn payload_at(&self, reg: u16) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(written, _)| *written == reg)
            .map(|(_, data)| data.as_slice())
    }
}

/// Async I2C bus recording every register access into a shared [`BusLog`]
#[derive(Clone, Default)]
pub struct MockI2c {
    pub log: Rc<RefCell<BusLog>>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl embedded_hal_async::i2c::I2c for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut log = self.log.borrow_mut();
        let mut selected: Option<u16> = None;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&low, payload)) = bytes.split_first() else {
                        continue;
                    };
                    let reg = Register::from_parts(address, low).addr();
                    selected = Some(reg);
                    if payload.is_empty() {
                        continue;
                    }
                    if log.fail_write_at == Some(reg) {
                        return Err(ErrorKind::Other);
                    }
                    log.writes.push((reg, payload.to_vec()));
                }
                Operation::Read(buffer) => {
                    if let Some(reg) = selected {
                        log.reads.push(reg);
                    }
                    buffer.fill(log.read_value);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Mock Pins and Delay
// ============================================================================

/// Output pin recording every level set
#[derive(Clone, Default)]
pub struct MockPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.levels.borrow().last().copied().unwrap_or(false)
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Delay that returns immediately
pub struct NoDelay;

impl embedded_hal_async::delay::DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

// ============================================================================
// Mock Tone Output
// ============================================================================

/// Tone output recording every frequency change
#[derive(Default)]
pub struct MockTone {
    pub history: Vec<u32>,
    /// Setting this frequency fails
    pub fail_at: Option<u32>,
}

impl MockTone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.history.last().copied().unwrap_or(0)
    }
}

impl ToneOutput for MockTone {
    type Error = ();

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Self::Error> {
        if self.fail_at == Some(frequency_hz) {
            return Err(());
        }
        self.history.push(frequency_hz);
        Ok(())
    }
}

// ============================================================================
// Mock Buttons
// ============================================================================

#[derive(Default)]
pub struct ButtonLevels {
    pub pressed: [bool; BUTTON_COUNT],
    pub failing: Option<Button>,
    /// Latched wake source; falls back to the live levels when unset
    pub woke_by: Option<Button>,
}

/// Button levels shared between the test and the engine under test
#[derive(Clone, Default)]
pub struct MockButtons {
    pub levels: Rc<RefCell<ButtonLevels>>,
}

impl MockButtons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, button: Button) {
        self.levels.borrow_mut().pressed[button.index()] = true;
    }

    pub fn release(&self, button: Button) {
        self.levels.borrow_mut().pressed[button.index()] = false;
    }

    pub fn fail_reads(&self, button: Button) {
        self.levels.borrow_mut().failing = Some(button);
    }

    pub fn latch_wake(&self, button: Button) {
        self.levels.borrow_mut().woke_by = Some(button);
    }
}

impl ButtonInputs for MockButtons {
    type Error = ();

    fn is_pressed(&mut self, button: Button) -> Result<bool, Self::Error> {
        let levels = self.levels.borrow();
        if levels.failing == Some(button) {
            return Err(());
        }
        Ok(levels.pressed[button.index()])
    }

    // Levels are set by the test directly; give it a chance to run
    async fn wait_for_change(&mut self, _tracked: Option<Button>) {
        yield_now().await;
    }

    fn pressed_at_wake(&mut self) -> Option<Button> {
        let levels = self.levels.borrow();
        levels.woke_by.or_else(|| {
            Button::ALL
                .into_iter()
                .find(|button| levels.pressed[button.index()])
        })
    }
}

// ============================================================================
// Mock Voltage Sensor
// ============================================================================

/// Sensor returning scripted raw values; raw units are millivolts
pub struct ScriptedSensor {
    pub samples: VecDeque<Result<i32, ()>>,
    pub reads: usize,
}

impl ScriptedSensor {
    pub fn new(samples: impl IntoIterator<Item = Result<i32, ()>>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            reads: 0,
        }
    }
}

impl VoltageSensor for ScriptedSensor {
    type Error = ();

    async fn sample_raw(&mut self) -> Result<i32, Self::Error> {
        self.reads += 1;
        self.samples.pop_front().unwrap_or(Err(()))
    }

    fn raw_to_millivolts(&self, raw: i32) -> Result<i32, Self::Error> {
        Ok(raw)
    }
}

// ============================================================================
// Mock Config Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    pub data: Option<Vec<u8>>,
    pub error: Option<StoreError>,
}

impl ConfigStore for MemoryStore {
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let data = self.data.as_ref().ok_or(StoreError::NotFound)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn save(&mut self, data: &[u8]) -> Result<(), StoreError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.data = Some(data.to_vec());
        Ok(())
    }
}
