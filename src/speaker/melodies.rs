//! Note and melody tables

use crate::config::SPEAKER_RESONANT_FREQUENCY_HZ;
use crate::types::Error;

/// Note frequencies in Hz
pub mod note {
    pub const REST: u16 = 0;

    pub const C4: u16 = 262;
    pub const DB4: u16 = 277;
    pub const D4: u16 = 294;
    pub const EB4: u16 = 311;
    pub const E4: u16 = 330;
    pub const F4: u16 = 349;
    pub const GB4: u16 = 370;
    pub const G4: u16 = 392;
    pub const AB4: u16 = 415;
    pub const A4: u16 = 440;
    pub const BB4: u16 = 466;
    pub const B4: u16 = 494;

    pub const C5: u16 = 523;
    pub const DB5: u16 = 554;
    pub const D5: u16 = 587;
    pub const EB5: u16 = 622;
    pub const E5: u16 = 659;
    pub const F5: u16 = 698;
    pub const GB5: u16 = 740;
    pub const G5: u16 = 784;
    pub const AB5: u16 = 831;
    pub const A5: u16 = 880;
    pub const BB5: u16 = 932;
    pub const B5: u16 = 988;

    pub const C6: u16 = 1046;
    pub const DB6: u16 = 1109;
    pub const D6: u16 = 1175;
    pub const EB6: u16 = 1245;
    pub const E6: u16 = 1319;
    pub const F6: u16 = 1397;
    pub const GB6: u16 = 1480;
    pub const G6: u16 = 1568;
    pub const AB6: u16 = 1661;
    pub const A6: u16 = 1760;
    pub const BB6: u16 = 1865;
    pub const B6: u16 = 1976;

    pub const C7: u16 = 2093;
    pub const DB7: u16 = 2217;
    pub const D7: u16 = 2349;
    pub const EB7: u16 = 2489;
    pub const E7: u16 = 2637;
    pub const F7: u16 = 2794;
    pub const GB7: u16 = 2960;
    pub const G7: u16 = 3136;
    pub const AB7: u16 = 3322;
    pub const A7: u16 = 3520;
    pub const BB7: u16 = 3729;
    pub const B7: u16 = 3951;

    pub const C8: u16 = 4186;
    pub const DB8: u16 = 4435;
    pub const D8: u16 = 4699;
    pub const EB8: u16 = 4978;
    pub const E8: u16 = 5274;
    pub const F8: u16 = 5588;
    pub const GB8: u16 = 5920;
    pub const G8: u16 = 6272;
    pub const AB8: u16 = 6645;
    pub const A8: u16 = 7040;
    pub const BB8: u16 = 7459;
    pub const B8: u16 = 7902;
}

/// Note lengths in milliseconds
pub mod length {
    pub const SIXTEENTH: u16 = 38;
    pub const EIGHTH: u16 = 75;
    pub const QUARTER: u16 = 150;
    pub const HALF: u16 = 300;
    pub const WHOLE: u16 = 600;
}

/// One step of a melody. A frequency of 0 is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MelodyNote {
    pub frequency_hz: u16,
    pub duration_ms: u16,
}

impl MelodyNote {
    /// Terminates a melody
    pub const END: MelodyNote = MelodyNote::new(0, 0);

    pub const fn new(frequency_hz: u16, duration_ms: u16) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    pub const fn is_end(&self) -> bool {
        self.frequency_hz == 0 && self.duration_ms == 0
    }
}

use length::{EIGHTH as E, HALF as H, QUARTER as Q, SIXTEENTH as S, WHOLE as W};
use note::*;

const fn n(frequency_hz: u16, duration_ms: u16) -> MelodyNote {
    MelodyNote::new(frequency_hz, duration_ms)
}

pub static SUCCESS: [MelodyNote; 14] = [
    n(C5, Q),
    n(REST, E),
    n(C5, Q),
    n(BB4, Q),
    n(C5, Q),
    n(REST, Q),
    n(G4, Q),
    n(REST, Q),
    n(G4, Q),
    n(C5, Q),
    n(F5, Q),
    n(E5, Q),
    n(C5, Q),
    MelodyNote::END,
];

pub static ERROR: [MelodyNote; 37] = [
    n(E6, Q),
    n(REST, E),
    n(E6, Q),
    n(REST, Q),
    n(E6, Q),
    n(REST, Q),
    n(C6, Q),
    n(E6, H),
    n(G6, H),
    n(REST, Q),
    n(G4, W),
    n(REST, W),
    n(C6, H),
    n(REST, Q),
    n(G5, H),
    n(REST, Q),
    n(E5, H),
    n(REST, Q),
    n(A5, Q),
    n(REST, Q),
    n(B5, Q),
    n(REST, Q),
    n(BB5, Q),
    n(A5, H),
    n(G5, Q),
    n(E6, Q),
    n(G6, Q),
    n(A6, H),
    n(F6, Q),
    n(G6, Q),
    n(REST, Q),
    n(E6, Q),
    n(REST, Q),
    n(C6, Q),
    n(D6, Q),
    n(B5, Q),
    MelodyNote::END,
];

pub static LOW_BATTERY: [MelodyNote; 13] = [
    n(C6, Q),
    n(REST, 100),
    n(G5, 100),
    n(A5, 100),
    n(BB5, 100),
    n(REST, 100),
    n(BB5, 100),
    n(REST, Q),
    n(C5, H),
    n(REST, H),
    n(REST, Q),
    n(C6, Q),
    MelodyNote::END,
];

/// Short tick at the piezo's resonant frequency, where it is loudest
pub static CLICK: [MelodyNote; 2] = [
    n(SPEAKER_RESONANT_FREQUENCY_HZ as u16, S),
    MelodyNote::END,
];

/// The built-in melodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Melody {
    Success,
    Error,
    LowBattery,
    Click,
}

impl Melody {
    pub fn notes(self) -> &'static [MelodyNote] {
        match self {
            Melody::Success => &SUCCESS,
            Melody::Error => &ERROR,
            Melody::LowBattery => &LOW_BATTERY,
            Melody::Click => &CLICK,
        }
    }
}

impl TryFrom<u8> for Melody {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Melody::Success),
            1 => Ok(Melody::Error),
            2 => Ok(Melody::LowBattery),
            3 => Ok(Melody::Click),
            _ => Err(Error::InvalidParameter),
        }
    }
}

/// Total playing time, up to the first terminator
pub fn duration_ms(notes: &[MelodyNote]) -> u32 {
    notes
        .iter()
        .take_while(|note| !note.is_end())
        .map(|note| note.duration_ms as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_melody_is_terminated() {
        for melody in [Melody::Success, Melody::Error, Melody::LowBattery, Melody::Click] {
            assert!(melody.notes().last().is_some_and(MelodyNote::is_end));
        }
    }

    #[test]
    fn rests_are_not_terminators() {
        assert!(!MelodyNote::new(note::REST, length::QUARTER).is_end());
        assert!(MelodyNote::END.is_end());
    }

    #[test]
    fn melody_durations() {
        assert_eq!(duration_ms(&SUCCESS), 12 * 150 + 75);
        assert_eq!(duration_ms(&LOW_BATTERY), 4 * 150 + 6 * 100 + 2 * 300);
        assert_eq!(duration_ms(&CLICK), 38);
    }

    #[test]
    fn unknown_melody_id_is_rejected() {
        assert_eq!(Melody::try_from(1), Ok(Melody::Error));
        assert_eq!(Melody::try_from(4), Err(Error::InvalidParameter));
    }
}
