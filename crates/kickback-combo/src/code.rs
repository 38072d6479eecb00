//! Mob codes: the compact text form of a mob's combo and death bomb.
//!
//! ```text
//! rRG,G,BB
//! |\_/ | \_ split: two distinct Blue hits
//! | |  \___ single: Green
//! | \______ split: Red and Green, either order
//! \________ death bomb: blasts Red on defeat
//! ```
//!
//! The bomb prefix is optional. Whitespace around the code is ignored.

use core::fmt;
use core::str::FromStr;

use kickback_types::{HurtRequirement, HurtType};

use crate::error::CodeError;

/// A parsed mob code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobCode {
    /// Hit type blasted at neighbours on defeat, if any.
    pub bomb: Option<HurtType>,
    /// Required hit sequence, never empty.
    pub sequence: Vec<HurtRequirement>,
}

impl MobCode {
    /// Parse a mob code.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] describing the first problem found.
    pub fn parse(code: &str) -> Result<Self, CodeError> {
        let code = code.trim();
        let mut chars = code.chars();
        let Some(first) = chars.next() else {
            return Err(CodeError::Empty);
        };

        let (bomb, body) = if first.is_ascii_lowercase() {
            let bomb = HurtType::from_bomb_letter(first).ok_or(CodeError::UnknownLetter {
                letter: first,
                slot: 0,
            })?;
            (Some(bomb), chars.as_str())
        } else {
            (None, code)
        };

        if body.is_empty() {
            return Err(CodeError::NoRequirements {
                code: code.to_owned(),
            });
        }

        let sequence = body
            .split(',')
            .enumerate()
            .map(|(slot, text)| parse_slot(slot, text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { bomb, sequence })
    }
}

fn parse_slot(slot: usize, text: &str) -> Result<HurtRequirement, CodeError> {
    let letter = |c: char| {
        HurtType::from_requirement_letter(c).ok_or(CodeError::UnknownLetter { letter: c, slot })
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (None, _, _) => Err(CodeError::EmptySlot { slot }),
        (Some(only), None, _) => Ok(HurtRequirement::Single(letter(only)?)),
        (Some(left), Some(right), None) => Ok(HurtRequirement::Split {
            left: letter(left)?,
            right: letter(right)?,
        }),
        (Some(_), Some(_), Some(_)) => Err(CodeError::SlotTooLong {
            slot,
            text: text.to_owned(),
        }),
    }
}

impl FromStr for MobCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MobCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bomb) = self.bomb {
            write!(f, "{}", bomb.letter().to_ascii_lowercase())?;
        }
        for (i, requirement) in self.sequence.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}
