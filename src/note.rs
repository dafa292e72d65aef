/// A timed, pitched, duration-bearing chart event.
///
/// Times and lengths are in ticks, where [`Resolution`] ticks equal one
/// quarter note. A length of zero means the note is not sustained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub time: i64,
    pub lane: u8,
    pub length: i64,
}

impl Note {
    pub fn new(time: i64, lane: u8, length: i64) -> Self {
        Self { time, lane, length }
    }

    /// Tick position at which the note stops sounding.
    pub fn end_time(&self) -> i64 {
        self.time + self.length
    }

    pub fn is_sustained(&self) -> bool {
        self.length != 0
    }
}

/// Ticks per quarter note, with the derived tick fractions used by the
/// quantization and shortening policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution(pub u32);

impl Resolution {
    pub const DEFAULT: Resolution = Resolution(480);

    pub fn ticks_per_quarter(self) -> i64 {
        self.0 as i64
    }

    pub fn sixteenth(self) -> i64 {
        self.0 as i64 / 4
    }

    pub fn twenty_fourth(self) -> i64 {
        self.0 as i64 / 6
    }

    pub fn thirty_second(self) -> i64 {
        self.0 as i64 / 8
    }

    pub fn one_twenty_eighth(self) -> i64 {
        self.0 as i64 / 32
    }

    pub fn one_ninety_second(self) -> i64 {
        self.0 as i64 / 48
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT
    }
}
