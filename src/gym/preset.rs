use strum::{Display, EnumIter, EnumString};

use crate::error::{Error, Result};

/// Built-in maze layouts, named by difficulty
///
/// Layouts are grids of cell codes: `0` empty, `1` wall, `2` start, `3` goal, `4` trap, `5` bonus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum MapPreset {
    /// 5x5, walls only
    Simple,
    /// 8x8 with two traps and a bonus
    Medium,
    /// 10x10 with two traps and two bonuses
    Hard,
}

#[rustfmt::skip]
const SIMPLE: &[&[u8]] = &[
    &[0, 0, 0, 0, 3],
    &[0, 1, 0, 1, 0],
    &[0, 0, 0, 0, 0],
    &[0, 1, 0, 1, 0],
    &[2, 0, 0, 0, 0],
];

#[rustfmt::skip]
const MEDIUM: &[&[u8]] = &[
    &[0, 0, 0, 1, 0, 0, 0, 3],
    &[0, 1, 0, 1, 0, 1, 0, 1],
    &[0, 1, 0, 0, 0, 1, 0, 0],
    &[0, 0, 0, 1, 0, 0, 0, 1],
    &[1, 0, 1, 1, 0, 1, 0, 0],
    &[0, 0, 0, 0, 0, 1, 0, 1],
    &[0, 1, 4, 1, 5, 0, 0, 0],
    &[2, 0, 0, 1, 0, 1, 4, 0],
];

#[rustfmt::skip]
const HARD: &[&[u8]] = &[
    &[0, 1, 0, 0, 0, 1, 0, 0, 0, 3],
    &[0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
    &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0],
    &[1, 0, 1, 1, 0, 1, 1, 1, 0, 1],
    &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 1, 1, 1, 0, 1, 1, 1, 0, 1],
    &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0],
    &[1, 0, 1, 1, 0, 1, 1, 1, 0, 1],
    &[0, 5, 0, 0, 0, 4, 0, 0, 5, 0],
    &[2, 0, 0, 1, 0, 1, 0, 1, 0, 4],
];

impl MapPreset {
    /// Look up a preset by its lowercase name
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| Error::UnknownPreset {
            name: name.to_string(),
        })
    }

    /// The preset's grid of cell codes
    pub fn layout(self) -> &'static [&'static [u8]] {
        match self {
            MapPreset::Simple => SIMPLE,
            MapPreset::Medium => MEDIUM,
            MapPreset::Hard => HARD,
        }
    }
}
