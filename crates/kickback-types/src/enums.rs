//! Enumeration types for the Kickback game.

use serde::{Deserialize, Serialize};

/// Classification tag of a hit.
///
/// The same closed set is used for incoming hits and for the slots of a
/// mob's required combo sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HurtType {
    /// Red ball or red blast.
    Red,
    /// Green ball or green blast.
    Green,
    /// Blue ball or blue blast.
    Blue,
}

impl HurtType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Parse the uppercase requirement letter used in mob codes.
    pub const fn from_requirement_letter(letter: char) -> Option<Self> {
        match letter {
            'R' => Some(Self::Red),
            'G' => Some(Self::Green),
            'B' => Some(Self::Blue),
            _ => None,
        }
    }

    /// Parse the lowercase death-bomb letter used as a mob code prefix.
    pub const fn from_bomb_letter(letter: char) -> Option<Self> {
        match letter {
            'r' => Some(Self::Red),
            'g' => Some(Self::Green),
            'b' => Some(Self::Blue),
            _ => None,
        }
    }

    /// The uppercase requirement letter for this type.
    pub const fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Green => 'G',
            Self::Blue => 'B',
        }
    }
}

impl core::fmt::Display for HurtType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        };
        f.write_str(name)
    }
}
