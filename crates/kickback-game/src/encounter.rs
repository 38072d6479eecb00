//! Encounter scripts: timed waves of mobs laid out on a grid.
//!
//! ```text
//! 2
//!   1  2
//!
//!  3    4
//!
//! ```
//!
//! Each wave is a delay line (whole seconds, counted from the previous wave)
//! followed by exactly four grid rows. Every grid character found in the
//! object map spawns that object's mob code. Object codes are parsed once,
//! at load, so a bad entry fails the script rather than a single spawn.
//!
//! Column `c` and row `r` map to `(c * 5 - 7.5, 20 - r * 5, 120)`. Blank
//! lines between waves are skipped; blank lines inside a grid are rows.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use kickback_combo::MobCode;
use kickback_core::config::EncounterConfig;
use kickback_core::{Scope, TaskHandle};
use kickback_types::Position;
use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::error::EncounterError;

/// Grid rows per wave.
pub const GRID_ROWS: usize = 4;

/// Spacing between grid cells.
const CELL: f32 = 5.0;

/// One mob of a wave.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Grid character that placed the mob.
    pub glyph: char,
    /// Mob code from the object map.
    pub code: MobCode,
    /// Spawn position.
    pub position: Position,
}

/// A group of mobs spawned together.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    /// Seconds to wait before spawning, counted from the previous wave.
    pub delay_seconds: u64,
    /// Mobs to spawn, in row-major order.
    pub placements: Vec<Placement>,
}

/// A parsed encounter script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encounter {
    waves: Vec<Wave>,
}

/// Spawn position of grid cell (`row`, `column`).
#[allow(clippy::cast_precision_loss)]
pub fn grid_position(row: usize, column: usize) -> Position {
    let x = (column as f32).mul_add(CELL, -7.5);
    let y = (row as f32).mul_add(-CELL, 20.0);
    Position::new(x, y, 120.0)
}

/// Parse every object map entry into a mob code.
fn parse_objects(
    objects: &BTreeMap<char, String>,
) -> Result<BTreeMap<char, MobCode>, EncounterError> {
    objects
        .iter()
        .map(|(&glyph, text)| {
            MobCode::parse(text)
                .map(|code| (glyph, code))
                .map_err(|source| EncounterError::InvalidObject {
                    glyph,
                    code: text.clone(),
                    source,
                })
        })
        .collect()
}

impl Encounter {
    /// Parse a script against a grid character to mob code map.
    ///
    /// Unknown non-whitespace grid characters are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidObject`] for an object map entry
    /// whose code does not parse, [`EncounterError::InvalidDelay`] for a
    /// delay line that is not a whole number, or
    /// [`EncounterError::TruncatedWave`] if the script ends inside a grid.
    pub fn parse(script: &str, objects: &BTreeMap<char, String>) -> Result<Self, EncounterError> {
        let objects = parse_objects(objects)?;
        let mut lines = script.lines().enumerate().peekable();
        let mut waves = Vec::new();

        loop {
            while lines.next_if(|(_, line)| line.trim().is_empty()).is_some() {}
            let Some((number, delay_line)) = lines.next() else {
                break;
            };
            let delay_seconds = delay_line.trim().parse::<u64>().map_err(|e| {
                EncounterError::InvalidDelay {
                    line: number.saturating_add(1),
                    text: delay_line.to_owned(),
                    reason: e.to_string(),
                }
            })?;

            let wave_index = waves.len();
            let mut placements = Vec::new();
            for row in 0..GRID_ROWS {
                let Some((number, line)) = lines.next() else {
                    return Err(EncounterError::TruncatedWave {
                        wave: wave_index,
                        found: row,
                        expected: GRID_ROWS,
                    });
                };
                for (column, glyph) in line.chars().enumerate() {
                    if let Some(code) = objects.get(&glyph) {
                        placements.push(Placement {
                            glyph,
                            code: code.clone(),
                            position: grid_position(row, column),
                        });
                    } else if !glyph.is_whitespace() {
                        warn!(
                            line = number.saturating_add(1),
                            column,
                            glyph = %glyph,
                            "Unknown encounter object, skipped"
                        );
                    }
                }
            }
            waves.push(Wave {
                delay_seconds,
                placements,
            });
        }

        Ok(Self { waves })
    }

    /// Parse the `encounter` config section.
    ///
    /// # Errors
    ///
    /// As for [`Encounter::parse`].
    pub fn from_config(config: &EncounterConfig) -> Result<Self, EncounterError> {
        Self::parse(&config.script, &config.object_map())
    }

    /// The waves in script order.
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Total mobs across all waves.
    pub fn mob_count(&self) -> usize {
        self.waves.iter().map(|wave| wave.placements.len()).sum()
    }

    /// Run the encounter as one task in `scope`, spawning into `arena`.
    ///
    /// The task finishes after the last wave has spawned.
    pub fn start(&self, scope: &Scope, arena: Rc<RefCell<Arena>>) -> TaskHandle {
        let waves = self.waves.clone();
        scope.run(move |scope| async move {
            info!(waves = waves.len(), scope = %scope.id(), "Encounter started");
            for (index, wave) in waves.iter().enumerate() {
                scope.seconds(wave.delay_seconds).await;
                let mut roster = arena.borrow_mut();
                let mut spawned = 0_usize;
                for placement in &wave.placements {
                    match roster.spawn(placement.code.clone(), placement.position) {
                        Ok(_) => spawned = spawned.saturating_add(1),
                        Err(e) => warn!(
                            glyph = %placement.glyph,
                            code = %placement.code,
                            error = %e,
                            "Mob spawn failed"
                        ),
                    }
                }
                info!(wave = index, spawned, tick = scope.now(), "Wave spawned");
            }
            debug!(scope = %scope.id(), "Encounter finished");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn objects() -> BTreeMap<char, String> {
        BTreeMap::from([('1', "R".to_owned()), ('2', "gG,B".to_owned())])
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn parses_waves_and_positions() {
        let script = "1\n 1\n\n   2\n\n3\n1\n\n\n\n";
        let encounter = Encounter::parse(script, &objects()).unwrap();
        assert_eq!(encounter.waves().len(), 2);
        assert_eq!(encounter.mob_count(), 3);

        let first = &encounter.waves()[0];
        assert_eq!(first.delay_seconds, 1);
        assert_eq!(first.placements[0].code.to_string(), "R");
        let p = first.placements[0].position;
        assert!(close(p.x, -2.5) && close(p.y, 20.0) && close(p.z, 120.0));
        let p = first.placements[1].position;
        assert_eq!(first.placements[1].glyph, '2');
        assert!(close(p.x, 7.5) && close(p.y, 10.0));

        assert_eq!(encounter.waves()[1].delay_seconds, 3);
    }

    #[test]
    fn unknown_glyphs_are_skipped() {
        let encounter = Encounter::parse("0\nx1y\n\n\n\n", &objects()).unwrap();
        assert_eq!(encounter.mob_count(), 1);
    }

    #[test]
    fn invalid_object_code_fails_at_load() {
        let mut objects = objects();
        objects.insert('3', "R,Q".to_owned());
        // The bad object is never placed; the map itself is rejected.
        let err = Encounter::parse("0\n1\n\n\n\n", &objects).unwrap_err();
        assert!(matches!(
            err,
            EncounterError::InvalidObject { glyph: '3', ref code, .. } if code == "R,Q"
        ));

        let config = EncounterConfig {
            objects: BTreeMap::from([("1".to_owned(), "gX".to_owned())]),
            ..EncounterConfig::default()
        };
        assert!(matches!(
            Encounter::from_config(&config),
            Err(EncounterError::InvalidObject { glyph: '1', .. })
        ));
    }

    #[test]
    fn bad_delay_is_an_error() {
        let err = Encounter::parse("soon\n\n\n\n\n", &objects()).unwrap_err();
        assert!(matches!(
            err,
            EncounterError::InvalidDelay { line: 1, ref text, .. } if text == "soon"
        ));
    }

    #[test]
    fn truncated_grid_is_an_error() {
        let err = Encounter::parse("2\n1\n", &objects()).unwrap_err();
        assert_eq!(
            err,
            EncounterError::TruncatedWave {
                wave: 0,
                found: 1,
                expected: GRID_ROWS
            }
        );
    }

    #[test]
    fn empty_script_has_no_waves() {
        let encounter = Encounter::parse("\n  \n", &objects()).unwrap();
        assert!(encounter.waves().is_empty());
    }

    #[test]
    fn default_config_parses() {
        let encounter = Encounter::from_config(&EncounterConfig::default()).unwrap();
        assert!(!encounter.waves().is_empty());
        assert!(encounter.mob_count() > 0);
    }
}
