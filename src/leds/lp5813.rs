//! LP5813 RGB LED driver
//!
//! The chip has a 10-bit register space. The two high address bits travel in
//! the I2C device address, the low eight bits are the first payload byte.
//! Animations run autonomously on the chip's animation engine units (AEU);
//! this module only programs them.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use crate::config::{LP5813_BOOST_SETTLE_MS, LP5813_I2C_ADDR, MAX_LED_CURRENT_FRACTION};
use crate::types::{Color, Error, Led, Pattern, Repeat};

// ===================================================================
// Register Map
// ===================================================================

pub mod reg {
    pub const CHIP_EN: u16 = 0x000;
    pub const DEV_CONFIG_0: u16 = 0x001;
    pub const DEV_CONFIG_1: u16 = 0x002;
    pub const DEV_CONFIG_2: u16 = 0x003;
    pub const DEV_CONFIG_3: u16 = 0x004;
    pub const DEV_CONFIG_4: u16 = 0x005;
    pub const DEV_CONFIG_12: u16 = 0x00D;

    pub const CMD_UPDATE: u16 = 0x010;
    pub const CMD_START: u16 = 0x011;
    pub const CMD_STOP: u16 = 0x012;
    pub const CMD_PAUSE: u16 = 0x013;
    pub const CMD_CONTINUE: u16 = 0x014;

    pub const LED_EN_1: u16 = 0x020;
    pub const LED_EN_2: u16 = 0x021;
    pub const SW_RESET: u16 = 0x023;

    pub const AUTO_DC_A0: u16 = 0x054;
    pub const AUTO_DC_A1: u16 = 0x055;
    pub const AUTO_DC_A2: u16 = 0x056;
    pub const AUTO_DC_B0: u16 = 0x057;
    pub const AUTO_DC_B1: u16 = 0x058;
    pub const AUTO_DC_B2: u16 = 0x059;

    // Animation engine program blocks, one per channel
    pub const ANIM_A0: u16 = 0x0E8;
    pub const ANIM_A1: u16 = 0x102;
    pub const ANIM_A2: u16 = 0x11C;
    pub const ANIM_B0: u16 = 0x136;
    pub const ANIM_B1: u16 = 0x150;
    pub const ANIM_B2: u16 = 0x16A;

    pub const TSD_CONFIG_STATUS: u16 = 0x300;
}

// DEV_CONFIG_0
const BOOST_VOUT_3V0: u8 = 0 << 1; // +0.1 V per step up to 5.5 V
const BOOST_VOUT_3V6: u8 = BOOST_VOUT_3V0 + (6 << 1);
const GLOBAL_MAX_CURRENT_25MA5: u8 = 0x00;

// DEV_CONFIG_1
const PWM_FRE_24KHZ: u8 = 0x00;
const LED_MODE_2_SCANS: u8 = 0x2 << 4;

// DEV_CONFIG_2
const SCAN_ORDER_0_0H: u8 = 0x0;
const SCAN_ORDER_1_1H: u8 = 0x1 << 2;

// DEV_CONFIG_3 / LED_EN_1
const LED_EN_A0: u8 = 0x10;
const LED_EN_A1: u8 = 0x20;
const LED_EN_A2: u8 = 0x40;
const LED_EN_B0: u8 = 0x80;
// DEV_CONFIG_4 / LED_EN_2
const LED_EN_B1: u8 = 0x01;
const LED_EN_B2: u8 = 0x02;

const LSD_THRESHOLD_FIX: u8 = 0x0B; // Avoids false LED-short detection

// TSD_CONFIG_STATUS
pub const CONFIG_ERR_STATUS: u8 = 0x01;

// Auto playback
const ACTIVE_AEU_1: u8 = 0x00;
const PLAYBACK_TIMES_INF: u8 = 0x0F;
const AEU_PLAYBACK_TIMES_1: u8 = 0x00;

/// Bytes in one channel's animation program (auto-pause through AEU1 playback)
pub const PROGRAM_LEN: usize = 10;

const MAX_BURST: usize = PROGRAM_LEN;

/// A validated register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Register(u16);

impl Register {
    /// Highest addressable register
    pub const MAX: u16 = 0x3FF;

    pub const fn new(addr: u16) -> Result<Self, Error> {
        if addr > Self::MAX {
            Err(Error::InvalidParameter)
        } else {
            Ok(Self(addr))
        }
    }

    pub const fn addr(self) -> u16 {
        self.0
    }

    /// 7-bit bus address carrying the two high register bits
    pub const fn bus_address(self) -> u8 {
        (LP5813_I2C_ADDR << 2) | (self.0 >> 8) as u8
    }

    /// Register byte sent as the first payload byte
    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Inverse of [`Register::bus_address`] / [`Register::low_byte`]
    pub const fn from_parts(bus_address: u8, low_byte: u8) -> Self {
        Self((((bus_address & 0x03) as u16) << 8) | low_byte as u16)
    }
}

/// Writes to a command register with its fixed magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Update,
    Start,
    Stop,
    Pause,
    Continue,
    SoftwareReset,
}

impl Command {
    pub const fn register(self) -> u16 {
        match self {
            Command::Update => reg::CMD_UPDATE,
            Command::Start => reg::CMD_START,
            Command::Stop => reg::CMD_STOP,
            Command::Pause => reg::CMD_PAUSE,
            Command::Continue => reg::CMD_CONTINUE,
            Command::SoftwareReset => reg::SW_RESET,
        }
    }

    pub const fn magic(self) -> u8 {
        match self {
            Command::Update => 0x55,
            Command::Start => 0xFF,
            Command::Stop => 0xAA,
            Command::Pause => 0x33,
            Command::Continue => 0xCC,
            Command::SoftwareReset => 0x66,
        }
    }
}

/// AEU pause and segment time codes. The chip encodes a fixed table, not a
/// linear scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StepTime {
    Ms0 = 0x0,
    Ms90 = 0x1,
    Ms180 = 0x2,
    Ms360 = 0x3,
    Ms540 = 0x4,
    Ms800 = 0x5,
    Ms1070 = 0x6,
    Ms1520 = 0x7,
    Ms2060 = 0x8,
    Ms2500 = 0x9,
    Ms3040 = 0xA,
    Ms4020 = 0xB,
    Ms5010 = 0xC,
    Ms5990 = 0xD,
    Ms7060 = 0xE,
    Ms8050 = 0xF,
}

impl StepTime {
    pub const fn millis(self) -> u64 {
        match self {
            StepTime::Ms0 => 0,
            StepTime::Ms90 => 90,
            StepTime::Ms180 => 180,
            StepTime::Ms360 => 360,
            StepTime::Ms540 => 540,
            StepTime::Ms800 => 800,
            StepTime::Ms1070 => 1070,
            StepTime::Ms1520 => 1520,
            StepTime::Ms2060 => 2060,
            StepTime::Ms2500 => 2500,
            StepTime::Ms3040 => 3040,
            StepTime::Ms4020 => 4020,
            StepTime::Ms5010 => 5010,
            StepTime::Ms5990 => 5990,
            StepTime::Ms7060 => 7060,
            StepTime::Ms8050 => 8050,
        }
    }

    const fn code(self) -> u8 {
        self as u8
    }
}

/// Segment timing of one AEU cycle: fade in, hold on, fade out, hold off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub fade_in: StepTime,
    pub on: StepTime,
    pub fade_out: StepTime,
    pub off: StepTime,
}

impl Timing {
    pub const fn for_pattern(pattern: Pattern) -> Self {
        let (fade, hold) = match pattern {
            Pattern::Solid => (StepTime::Ms0, StepTime::Ms0),
            Pattern::Flash => (StepTime::Ms0, StepTime::Ms540),
            Pattern::Breathe => (StepTime::Ms540, StepTime::Ms0),
        };
        Self {
            fade_in: fade,
            on: hold,
            fade_out: fade,
            off: hold,
        }
    }

    /// Length of one cycle in milliseconds
    pub const fn cycle_ms(&self) -> u64 {
        self.fade_in.millis() + self.on.millis() + self.fade_out.millis() + self.off.millis()
    }
}

/// The two IC channel groups wired to each board indicator.
pub struct LedWiring {
    /// Animation program bases in R, G, B order
    pub program_bases: [u16; 3],
    /// Values for LED_EN_1 and LED_EN_2
    pub enable_mask: [u8; 2],
}

impl LedWiring {
    pub const fn of(led: Led) -> Self {
        match led {
            Led::D1 => Self {
                program_bases: [reg::ANIM_A0, reg::ANIM_A1, reg::ANIM_A2],
                enable_mask: [LED_EN_A0 | LED_EN_A1 | LED_EN_A2, 0],
            },
            Led::D2 => Self {
                program_bases: [reg::ANIM_B0, reg::ANIM_B1, reg::ANIM_B2],
                enable_mask: [LED_EN_B0, LED_EN_B1 | LED_EN_B2],
            },
        }
    }
}

/// Build one channel's animation program.
///
/// `repeat` must not be [`Repeat::Stop`]; a stop never programs the chip.
pub fn channel_program(
    pattern: Pattern,
    brightness: u8,
    repeat: Repeat,
) -> Result<[u8; PROGRAM_LEN], Error> {
    let playback = match repeat {
        Repeat::Infinite => PLAYBACK_TIMES_INF,
        Repeat::Times(n @ 1..=Repeat::MAX_TIMES) => n - 1,
        Repeat::Times(_) | Repeat::Stop => return Err(Error::InvalidParameter),
    };

    let timing = Timing::for_pattern(pattern);
    let on = brightness;
    let off = if pattern == Pattern::Solid { brightness } else { 0 };

    Ok([
        (StepTime::Ms0.code() << 4) | StepTime::Ms0.code(), // auto pause
        ACTIVE_AEU_1 | playback,
        off,
        on,
        on,
        off,
        off,
        (timing.on.code() << 4) | timing.fade_in.code(),
        (timing.off.code() << 4) | timing.fade_out.code(),
        AEU_PLAYBACK_TIMES_1,
    ])
}

/// How long a finite pattern plays on the chip; `None` when it never ends
pub fn play_time_ms(pattern: Pattern, repeat: Repeat) -> Option<u64> {
    match (pattern, repeat) {
        (Pattern::Solid, _) | (_, Repeat::Infinite) | (_, Repeat::Stop) => None,
        (_, Repeat::Times(n)) => Some(n as u64 * Timing::for_pattern(pattern).cycle_ms()),
    }
}

/// Register-level access to the chip plus its enable line
pub struct Lp5813<I2C, EN, D> {
    i2c: I2C,
    enable: EN,
    delay: D,
    powered: bool,
}

impl<I2C, EN, D> Lp5813<I2C, EN, D>
where
    I2C: I2c,
    EN: OutputPin,
    D: DelayNs,
{
    /// Take the bus and enable line; the driver starts powered down.
    pub fn new(i2c: I2C, mut enable: EN, delay: D) -> Result<Self, Error> {
        enable.set_low().map_err(|_| {
            error!("LP5813: failed to drive EN low");
            Error::DeviceNotReady
        })?;

        Ok(Self {
            i2c,
            enable,
            delay,
            powered: false,
        })
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Burst write starting at `start`
    pub async fn write(&mut self, start: u16, values: &[u8]) -> Result<(), Error> {
        let reg = Register::new(start).map_err(|e| {
            error!("LP5813: invalid register address {:#x}", start);
            e
        })?;

        let mut frame: Vec<u8, { MAX_BURST + 1 }> = Vec::new();
        frame.push(reg.low_byte()).map_err(|_| Error::InvalidParameter)?;
        frame
            .extend_from_slice(values)
            .map_err(|_| Error::InvalidParameter)?;

        self.i2c
            .write(reg.bus_address(), &frame)
            .await
            .map_err(|_| {
                error!("LP5813: write to register {:#x} failed", start);
                Error::Protocol
            })
    }

    pub async fn write_reg(&mut self, addr: u16, value: u8) -> Result<(), Error> {
        self.write(addr, &[value]).await
    }

    pub async fn read_reg(&mut self, addr: u16) -> Result<u8, Error> {
        let reg = Register::new(addr).map_err(|e| {
            error!("LP5813: invalid register address {:#x}", addr);
            e
        })?;

        let mut value = [0u8; 1];
        self.i2c
            .write_read(reg.bus_address(), &[reg.low_byte()], &mut value)
            .await
            .map_err(|_| {
                error!("LP5813: read from register {:#x} failed", addr);
                Error::Protocol
            })?;
        Ok(value[0])
    }

    pub async fn send_command(&mut self, command: Command) -> Result<(), Error> {
        self.write_reg(command.register(), command.magic()).await
    }

    /// Raise EN, configure the chip and verify its configuration status.
    ///
    /// On failure EN is pulled low again.
    pub async fn power_up(&mut self) -> Result<(), Error> {
        self.enable.set_high().map_err(|_| {
            error!("LP5813: failed to drive EN high");
            Error::Protocol
        })?;
        self.powered = true;

        self.delay.delay_ms(LP5813_BOOST_SETTLE_MS).await;

        match self.configure().await {
            Ok(()) => {
                debug!("LP5813: powered up");
                Ok(())
            }
            Err(e) => {
                error!("LP5813: failed to enable the driver");
                self.power_down();
                Err(e)
            }
        }
    }

    async fn configure(&mut self) -> Result<(), Error> {
        self.write_reg(reg::CHIP_EN, 0x01).await?;
        self.write_reg(reg::DEV_CONFIG_0, BOOST_VOUT_3V6 | GLOBAL_MAX_CURRENT_25MA5)
            .await?;
        self.write_reg(reg::DEV_CONFIG_1, PWM_FRE_24KHZ | LED_MODE_2_SCANS)
            .await?;
        self.write_reg(reg::DEV_CONFIG_2, SCAN_ORDER_0_0H | SCAN_ORDER_1_1H)
            .await?;
        self.write_reg(reg::DEV_CONFIG_3, LED_EN_A0 | LED_EN_A1 | LED_EN_A2 | LED_EN_B0)
            .await?;
        self.write_reg(reg::DEV_CONFIG_4, LED_EN_B1 | LED_EN_B2).await?;
        self.write_reg(reg::DEV_CONFIG_12, LSD_THRESHOLD_FIX).await?;
        self.send_command(Command::Update).await?;

        let status = self.read_reg(reg::TSD_CONFIG_STATUS).await?;
        if status & CONFIG_ERR_STATUS != 0 {
            error!("LP5813: configuration rejected (status {:#x})", status);
            return Err(Error::Protocol);
        }

        for dc in [
            reg::AUTO_DC_A0,
            reg::AUTO_DC_A1,
            reg::AUTO_DC_A2,
            reg::AUTO_DC_B0,
            reg::AUTO_DC_B1,
            reg::AUTO_DC_B2,
        ] {
            self.write_reg(dc, MAX_LED_CURRENT_FRACTION).await?;
        }
        Ok(())
    }

    /// Drop EN; the chip enters its low-power state and forgets its program.
    pub fn power_down(&mut self) {
        if self.enable.set_low().is_err() {
            error!("LP5813: failed to drive EN low");
        }
        self.powered = false;
    }

    /// Program `led`'s channels, enable only that indicator and start.
    pub async fn start_animation(
        &mut self,
        led: Led,
        pattern: Pattern,
        color: Color,
        repeat: Repeat,
    ) -> Result<(), Error> {
        let wiring = LedWiring::of(led);

        for (base, brightness) in wiring.program_bases.into_iter().zip(color.channels()) {
            let program = channel_program(pattern, brightness, repeat)?;
            self.write(base, &program).await?;
        }

        self.write(reg::LED_EN_1, &wiring.enable_mask).await?;
        self.send_command(Command::Update).await?;
        self.send_command(Command::Start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_split_round_trips() {
        for addr in [0x000, 0x0E8, 0x16A, 0x1FF, 0x200, 0x300, Register::MAX] {
            let reg = Register::new(addr).unwrap();
            let back = Register::from_parts(reg.bus_address(), reg.low_byte());
            assert_eq!(back.addr(), addr);
        }
    }

    #[test]
    fn out_of_range_register_is_rejected() {
        assert_eq!(Register::new(0x400), Err(Error::InvalidParameter));
        assert_eq!(Register::new(0xFFFF), Err(Error::InvalidParameter));
    }

    #[test]
    fn high_address_bits_go_into_bus_address() {
        let reg = Register::new(reg::TSD_CONFIG_STATUS).unwrap();
        assert_eq!(reg.bus_address(), 0x5B);
        assert_eq!(reg.low_byte(), 0x00);

        let reg = Register::new(reg::ANIM_A1).unwrap();
        assert_eq!(reg.bus_address(), 0x59);
        assert_eq!(reg.low_byte(), 0x02);
    }

    #[test]
    fn solid_program_holds_brightness() {
        let program = channel_program(Pattern::Solid, 0x80, Repeat::Times(1)).unwrap();
        assert_eq!(program, [0x00, 0x00, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn flash_program_alternates() {
        let program = channel_program(Pattern::Flash, 0xFF, Repeat::Times(3)).unwrap();
        assert_eq!(program, [0x00, 0x02, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x40, 0x40, 0x00]);
    }

    #[test]
    fn breathe_program_fades() {
        let program = channel_program(Pattern::Breathe, 0x10, Repeat::Infinite).unwrap();
        assert_eq!(program, [0x00, 0x0F, 0x00, 0x10, 0x10, 0x00, 0x00, 0x04, 0x04, 0x00]);
    }

    #[test]
    fn stop_is_not_a_program() {
        assert_eq!(
            channel_program(Pattern::Flash, 0xFF, Repeat::Stop),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            channel_program(Pattern::Flash, 0xFF, Repeat::Times(16)),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn finite_patterns_have_play_time() {
        assert_eq!(play_time_ms(Pattern::Flash, Repeat::Times(3)), Some(3 * 1080));
        assert_eq!(play_time_ms(Pattern::Breathe, Repeat::Times(1)), Some(1080));
        assert_eq!(play_time_ms(Pattern::Solid, Repeat::Times(5)), None);
        assert_eq!(play_time_ms(Pattern::Flash, Repeat::Infinite), None);
    }

    #[test]
    fn command_magic_values() {
        assert_eq!(Command::Update.magic(), 0x55);
        assert_eq!(Command::Start.magic(), 0xFF);
        assert_eq!(Command::Stop.magic(), 0xAA);
        assert_eq!(Command::Pause.magic(), 0x33);
        assert_eq!(Command::Continue.magic(), 0xCC);
        assert_eq!(Command::SoftwareReset.register(), reg::SW_RESET);
    }

    #[test]
    fn enable_mask_fits_one_burst() {
        // LED_EN_1 and LED_EN_2 are written together from LED_EN_1
        assert_eq!(reg::LED_EN_2, reg::LED_EN_1 + 1);
        assert_eq!(LedWiring::of(Led::D1).enable_mask, [0x70, 0x00]);
        assert_eq!(LedWiring::of(Led::D2).enable_mask, [0x80, 0x03]);
    }
}
