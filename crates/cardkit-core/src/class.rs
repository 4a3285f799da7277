//! Hero class to card color table

use crate::error::CardKitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class token to color token, in canonical order
pub const CLASS_MAPPING: [(&str, &str); 12] = [
    ("DRUID", "BROWN"),
    ("HUNTER", "GREEN"),
    ("MAGE", "BLUE"),
    ("PALADIN", "GOLD"),
    ("PRIEST", "WHITE"),
    ("ROGUE", "BLACK"),
    ("SHAMAN", "SILVER"),
    ("WARLOCK", "VIOLET"),
    ("WARRIOR", "RED"),
    ("DEATHKNIGHT", "SPIRIT"),
    ("NEUTRAL", "ANY"),
    ("DREAM", "ANY"),
];

/// Look up the color token for a class token
pub fn class_color(token: &str) -> Option<&'static str> {
    CLASS_MAPPING
        .iter()
        .find(|(class, _)| *class == token)
        .map(|(_, color)| *color)
}

/// Hero classes known to the card data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeroClass {
    Druid,
    Hunter,
    Mage,
    Paladin,
    Priest,
    Rogue,
    Shaman,
    Warlock,
    Warrior,
    DeathKnight,
    Neutral,
    Dream,
}

impl HeroClass {
    /// Every class, in the same order as [`CLASS_MAPPING`]
    pub const ALL: [HeroClass; 12] = [
        HeroClass::Druid,
        HeroClass::Hunter,
        HeroClass::Mage,
        HeroClass::Paladin,
        HeroClass::Priest,
        HeroClass::Rogue,
        HeroClass::Shaman,
        HeroClass::Warlock,
        HeroClass::Warrior,
        HeroClass::DeathKnight,
        HeroClass::Neutral,
        HeroClass::Dream,
    ];

    /// Class token as it appears in card files
    pub fn as_str(self) -> &'static str {
        CLASS_MAPPING[self as usize].0
    }

    /// Color token for this class
    pub fn color(self) -> &'static str {
        CLASS_MAPPING[self as usize].1
    }
}

impl fmt::Display for HeroClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeroClass {
    type Err = CardKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeroClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| CardKitError::UnknownClass(s.to_string()))
    }
}
