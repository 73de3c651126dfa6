use std::{fmt::Display, ops::Deref};

/// Whole percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentage(u8);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const FULL: Percentage = Percentage(100);

    /// Floors `part / whole * 100`. An empty whole has no progress, and parts above the whole
    /// saturate at 100%.
    pub fn of(part: u32, whole: u32) -> Percentage {
        if whole == 0 {
            return Percentage::ZERO;
        }
        let value = (part as u64 * 100) / whole as u64;
        Percentage(value.min(100) as u8)
    }
}

impl Deref for Percentage {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
